// BookBinder - Chaptered audiobook assembly
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! MP4 container output
//!
//! # Module Organization
//!
//! ## boxes
//! Builders for the individual ISO-BMFF boxes (`ftyp`, `moov` tree, sample tables).
//!
//! ## writer
//! - `Mp4Writer` - streaming writer: samples go to `mdat`, `moov` is written last
//!
//! ## tags
//! - `BookTags` - iTunes-style metadata and cover art, read and written
//!   through `mp4ameta` once the file is complete
//!
//! The [`ContainerWriter`] trait is the seam between track assembly and the
//! file format.

pub mod boxes;
pub mod tags;
pub mod writer;

pub use tags::{read_artwork, ArtworkType, BookTags};
pub use writer::Mp4Writer;

use crate::error::Result;
use boxes::FourCc;

/// Track handle returned by a [`ContainerWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub u32);

/// Major and compatible brands of the output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileType {
    pub major_brand: FourCc,
    pub compatible_brands: Vec<FourCc>,
}

impl FileType {
    /// Audiobook brand with `isom`/`mp42` compatibility (ISO 14496-14 §4)
    pub fn m4b() -> Self {
        Self {
            major_brand: *b"M4B ",
            compatible_brands: vec![*b"M4B ", *b"isom", *b"mp42"],
        }
    }
}

/// Operations the assembler needs from a container library
pub trait ContainerWriter {
    /// Movie time scale and total duration in that scale
    fn set_timing(&mut self, time_scale: u32, duration: u64) -> Result<()>;

    /// New MPEG-4 audio track; every sample must last `sample_duration` units
    fn add_audio_track(&mut self, time_scale: u32, sample_duration: u32) -> Result<TrackId>;

    /// Decoder configuration (the AudioSpecificConfig bytes)
    fn set_es_config(&mut self, track: TrackId, config: &[u8]) -> Result<()>;

    /// `tkhd.flags`
    fn set_track_flags(&mut self, track: TrackId, flags: u32) -> Result<()>;

    /// ISO 639-2/T code of the track's media
    fn set_track_language(&mut self, track: TrackId, language: &str) -> Result<()>;

    fn write_sample(&mut self, track: TrackId, data: &[u8], duration: u32) -> Result<()>;

    /// Text track holding chapter titles, referenced from `audio`
    fn add_chapter_track(&mut self, audio: TrackId) -> Result<TrackId>;

    /// Append a chapter spanning `duration` units after the previous one
    fn add_chapter(&mut self, track: TrackId, duration: u64, title: &str) -> Result<()>;

    /// Write the movie header; no further calls are accepted
    fn finish(&mut self) -> Result<()>;
}
