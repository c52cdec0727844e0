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


//! ADTS frame parser
//!
//! A cursor over an owned buffer holding a complete ADTS elementary stream
//! (one chapter file). The parser never copies payloads: [`AdtsParser::frame_data`]
//! borrows from the buffer and the borrow checker ends that borrow before the
//! cursor can move again.
//!
//! # Header layout
//!
//! The first 8 bytes at the cursor are read as one big-endian word:
//!
//! | Field | Bits |
//! |---|---|
//! | sync word (`0xFFF`) | 63-52 |
//! | MPEG version (1 = MPEG-2) | 51 |
//! | protection absent | 48 |
//! | profile (object type - 1) | 47-46 |
//! | sampling frequency index | 45-42 |
//! | channel configuration | 40-38 |
//! | frame length incl. header | 33-21 |
//! | raw data blocks - 1 | 9-8 |
//!
//! The header is 7 bytes with the protection-absent bit set and 9 bytes
//! (trailing CRC) otherwise.
//!
//! # Malformed input
//!
//! There are no parse errors. A missing sync word, a frame running past the
//! end of the buffer or a frame length shorter than its own header simply
//! ends the frame sequence.

use crate::audio::asc::AudioSpecificConfig;
use crate::error::{BinderError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

const SYNC: u64 = 0xFFF0_0000_0000_0000;
const MPEG2: u64 = 0x0008_0000_0000_0000;
const NO_PROTECTION: u64 = 0x0001_0000_0000_0000;
const AUDIO_TYPE: u64 = 0x0000_C000_0000_0000;
const FREQUENCY: u64 = 0x0000_3C00_0000_0000;
const CHANNELS: u64 = 0x0000_01C0_0000_0000;
const ADTS_LENGTH: u64 = 0x0000_0003_FFE0_0000;
const NUMBER_AAC_FRAMES: u64 = 0x0000_0000_0000_0300;

const HEADER_SIZE: usize = 7;
const HEADER_SIZE_CRC: usize = 9;

/// MPEG version signalled by the ADTS ID bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MpegVersion {
    Mpeg2,
    Mpeg4,
}

/// Snapshot of the frame under the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsFrame<'buf> {
    /// Byte offset of the ADTS header in the buffer
    pub offset: usize,
    /// Raw AAC payload following the header
    pub data: &'buf [u8],
    /// Raw data blocks packed in this ADTS unit
    pub aac_frame_count: usize,
    pub version: MpegVersion,
    /// `None` when the header carries a reserved sampling frequency index
    pub config: Option<AudioSpecificConfig>,
}

/// Stateful cursor over an ADTS stream
#[derive(Debug, Clone)]
pub struct AdtsParser {
    /// Shared so clones only copy the cursor
    buffer: Arc<[u8]>,
    offset: usize,
    header: u64,
}

impl AdtsParser {
    /// Take ownership of `buffer` and position the cursor on its first frame
    pub fn new(buffer: Vec<u8>) -> Self {
        let mut parser = Self {
            buffer: buffer.into(),
            offset: 0,
            header: 0,
        };
        parser.read_header();
        parser
    }

    /// Read a whole ADTS file into a new parser
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading ADTS file {}", path.display());
        let buffer = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BinderError::FileNotFound(path.display().to_string())
            } else {
                BinderError::file_io("Failed to read ADTS file", path, e)
            }
        })?;
        Ok(Self::new(buffer))
    }

    /// Whether a complete, well-formed frame starts at the cursor
    ///
    /// Every other accessor returns its empty value when this is false.
    pub fn has_frame(&self) -> bool {
        if !self.is_header() {
            return false;
        }
        let length = self.adts_length();
        length >= self.header_size()
            && self
                .offset
                .checked_add(length)
                .map_or(false, |end| end <= self.buffer.len())
    }

    /// Payload size of the current frame in bytes (0 without a frame)
    pub fn frame_size(&self) -> usize {
        if self.has_frame() {
            self.adts_length() - self.header_size()
        } else {
            0
        }
    }

    /// Payload of the current frame
    pub fn frame_data(&self) -> Option<&[u8]> {
        if !self.has_frame() {
            return None;
        }
        let start = self.offset + self.header_size();
        let end = self.offset + self.adts_length();
        self.buffer.get(start..end)
    }

    /// Number of raw AAC frames in the current ADTS unit (0 without a frame)
    pub fn aac_frame_count(&self) -> usize {
        if self.has_frame() {
            ((self.header & NUMBER_AAC_FRAMES) >> 8) as usize + 1
        } else {
            0
        }
    }

    pub fn is_mpeg2_frame(&self) -> bool {
        self.has_frame() && self.header & MPEG2 == MPEG2
    }

    pub fn is_mpeg4_frame(&self) -> bool {
        self.has_frame() && self.header & MPEG2 == 0
    }

    pub fn mpeg_version(&self) -> Option<MpegVersion> {
        if self.is_mpeg2_frame() {
            Some(MpegVersion::Mpeg2)
        } else if self.is_mpeg4_frame() {
            Some(MpegVersion::Mpeg4)
        } else {
            None
        }
    }

    /// AudioSpecificConfig described by the current frame's header
    pub fn mpeg4_audio_specific_config(&self) -> Option<AudioSpecificConfig> {
        if !self.has_frame() {
            return None;
        }
        let object_type = ((self.header & AUDIO_TYPE) >> 46) as u8 + 1;
        let frequency_index = ((self.header & FREQUENCY) >> 42) as u8;
        let channels = ((self.header & CHANNELS) >> 38) as u8;
        AudioSpecificConfig::encode_indexed(object_type, channels, frequency_index)
    }

    /// Snapshot of the current frame
    pub fn frame(&self) -> Option<AdtsFrame<'_>> {
        Some(AdtsFrame {
            offset: self.offset,
            data: self.frame_data()?,
            aac_frame_count: self.aac_frame_count(),
            version: self.mpeg_version()?,
            config: self.mpeg4_audio_specific_config(),
        })
    }

    /// Advance past the current frame
    ///
    /// Returns whether another frame follows. The cursor does not move when
    /// there is no current frame.
    pub fn next_frame(&mut self) -> bool {
        if !self.has_frame() {
            return false;
        }
        self.offset += self.adts_length();
        self.read_header();
        self.has_frame()
    }

    /// Rewind to the start of the buffer
    pub fn reset(&mut self) -> bool {
        self.offset = 0;
        self.read_header();
        self.has_frame()
    }

    /// Byte offset of the cursor
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Count frames from the start without disturbing the cursor
    pub fn count_frames(&self) -> usize {
        let mut walker = self.clone();
        if !walker.reset() {
            return 0;
        }
        let mut count = 1;
        while walker.next_frame() {
            count += 1;
        }
        count
    }

    fn read_header(&mut self) {
        self.header = read_header_word(&self.buffer, self.offset);
    }

    fn is_header(&self) -> bool {
        self.header & SYNC == SYNC
    }

    fn adts_length(&self) -> usize {
        if self.is_header() {
            ((self.header & ADTS_LENGTH) >> 21) as usize
        } else {
            0
        }
    }

    fn header_size(&self) -> usize {
        header_size(self.header)
    }
}

/// Header word at `offset`, 0 when fewer than 8 bytes remain
fn read_header_word(buffer: &[u8], offset: usize) -> u64 {
    offset
        .checked_add(8)
        .and_then(|end| buffer.get(offset..end))
        .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
        .map_or(0, u64::from_be_bytes)
}

fn header_size(header: u64) -> usize {
    if header & SYNC != SYNC {
        0
    } else if header & NO_PROTECTION == NO_PROTECTION {
        HEADER_SIZE
    } else {
        HEADER_SIZE_CRC
    }
}
