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


//! Track assembly
//!
//! Writes a validated book into a chaptered M4B container. Each chapter
//! contributes exactly `expected_frames` audio samples of 1024 units: the
//! first `expected_frames - 1` ADTS frames become one sample each, and every
//! remaining frame (including encoder padding) is concatenated into the last
//! sample. Declared chapter durations therefore add up exactly while no
//! encoded audio is dropped.

use super::chapter::Chapter;
use super::validate::{validate_chapters, ValidatedBook, DEFAULT_PADDING_TOLERANCE};
use crate::audio::adts::AdtsParser;
use crate::audio::format::SAMPLES_PER_AAC_FRAME;
use crate::error::{BinderError, Result};
use crate::mp4::{BookTags, ContainerWriter, FileType, Mp4Writer, TrackId};
use std::path::{Path, PathBuf};

/// `tkhd` flags for both tracks: enabled, in movie, in preview, in poster
pub const TRACK_FLAGS: u32 = 0xF;

/// Options for [`bind_book`]
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// ISO 639-2/T code for the chapter track, ignored unless 3 characters
    pub language: Option<String>,
    /// Extra trailing frames accepted per chapter
    pub padding_tolerance: u64,
    pub tags: Option<BookTags>,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            language: None,
            padding_tolerance: DEFAULT_PADDING_TOLERANCE,
            tags: None,
        }
    }
}

impl AssembleOptions {
    fn chapter_language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .filter(|code| code.chars().count() == 3)
    }
}

/// Validate `chapters` and write the book to `output`
///
/// The container is written and tagged as `<output>.part`, then renamed.
/// Nothing is created when validation fails, and the partial file is removed
/// when any later step fails.
pub fn bind_book(output: &Path, chapters: &[Chapter], options: &AssembleOptions) -> Result<ValidatedBook> {
    let book = validate_chapters(chapters, options.padding_tolerance)?;

    let part = part_path(output);
    tracing::info!("Writing \"{}\"", output.display());

    let written = Mp4Writer::create(&part, FileType::m4b())
        .and_then(|mut writer| write_book(&mut writer, &book, options))
        .and_then(|()| match &options.tags {
            Some(tags) => tags.write_to(&part),
            None => Ok(()),
        })
        .and_then(|()| {
            std::fs::rename(&part, output)
                .map_err(|e| BinderError::file_io("Failed to move output into place", output, e))
        });
    if let Err(e) = written {
        if part.exists() {
            if let Err(remove) = std::fs::remove_file(&part) {
                tracing::warn!("Failed to remove partial output {}: {}", part.display(), remove);
            }
        }
        return Err(e);
    }

    tracing::info!(
        "Wrote {} chapters, {} samples to \"{}\"",
        book.chapters.len(),
        book.total_duration(),
        output.display()
    );
    Ok(book)
}

/// Write `book` through any container backend and finish it
///
/// Tags are not part of the container contract; [`bind_book`] adds them to
/// the finished file.
pub fn write_book<W: ContainerWriter>(writer: &mut W, book: &ValidatedBook, options: &AssembleOptions) -> Result<()> {
    let frame_duration = SAMPLES_PER_AAC_FRAME;

    writer.set_timing(book.time_scale, book.total_duration())?;
    let audio = writer.add_audio_track(book.time_scale, frame_duration)?;
    writer.set_es_config(audio, &book.config.to_be_bytes())?;
    writer.set_track_flags(audio, TRACK_FLAGS)?;

    for chapter in &book.chapters {
        tracing::debug!("Muxing chapter #{} \"{}\"", chapter.position, chapter.title);
        let parser = AdtsParser::from_file(&chapter.file)?;
        write_chapter_samples(
            writer,
            audio,
            parser,
            chapter.position,
            chapter.expected_frames,
            options.padding_tolerance,
        )?;
    }

    let markers = writer.add_chapter_track(audio)?;
    writer.set_track_flags(markers, TRACK_FLAGS)?;
    if let Some(language) = options.chapter_language() {
        writer.set_track_language(markers, language)?;
    }
    for chapter in &book.chapters {
        writer.add_chapter(markers, chapter.duration, &chapter.title)?;
    }

    writer.finish()
}

/// Emit one chapter as `expected_frames` samples, folding the tail into the last
fn write_chapter_samples<W: ContainerWriter>(
    writer: &mut W,
    track: TrackId,
    mut parser: AdtsParser,
    position: usize,
    expected_frames: u64,
    tolerance: u64,
) -> Result<()> {
    let frame_duration = SAMPLES_PER_AAC_FRAME;
    let mut written = 0u64;
    let mut tail: Vec<u8> = Vec::new();
    let mut tail_frames = 0u64;

    if parser.has_frame() {
        loop {
            let data = parser.frame_data().unwrap_or_default();
            if written + 1 < expected_frames {
                writer.write_sample(track, data, frame_duration)?;
                written += 1;
            } else {
                tail.extend_from_slice(data);
                tail_frames += 1;
            }
            if !parser.next_frame() {
                break;
            }
        }
    }

    // The file may have changed since validation
    if tail_frames == 0 || tail_frames - 1 > tolerance {
        return Err(BinderError::FrameCountMismatch {
            chapter: position,
            expected: expected_frames,
            actual: written + tail_frames,
            tolerance,
        });
    }
    if tail_frames > 1 {
        tracing::debug!("Chapter #{}: folding {} frames into the last sample", position, tail_frames);
    }
    writer.write_sample(track, &tail, frame_duration)
}

fn part_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
