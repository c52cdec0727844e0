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


//! Chapter duration and validation pass
//!
//! Walks every frame of every chapter once before anything is written:
//!
//! 1. The first frame of the book sets the reference AudioSpecificConfig.
//! 2. Every frame must be a single-block ADTS unit carrying that config.
//! 3. A chapter without frames fails the whole book.
//! 4. With a target sample count, the frame count may exceed the target by
//!    at most the padding tolerance, and never fall short of it.
//!
//! Chapter buffers are released before the next chapter is read.

use super::chapter::Chapter;
use crate::audio::adts::AdtsParser;
use crate::audio::asc::AudioSpecificConfig;
use crate::audio::format::SAMPLES_PER_AAC_FRAME;
use crate::error::{BinderError, Result};
use std::path::PathBuf;

/// Trailing frames the AAC encoder has been observed to append
pub const DEFAULT_PADDING_TOLERANCE: u64 = 3;

/// Validated chapter with its timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterTiming {
    /// 1-based position in the book
    pub position: usize,
    pub title: String,
    pub file: PathBuf,
    /// ADTS frames found in the file
    pub frame_count: u64,
    /// Frames the chapter is declared to span
    pub expected_frames: u64,
    /// Declared duration in samples (time scale units)
    pub duration: u64,
}

impl ChapterTiming {
    /// Surplus frames folded into the last sample
    pub fn padding_frames(&self) -> u64 {
        self.frame_count - self.expected_frames
    }
}

/// Outcome of a successful validation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBook {
    pub config: AudioSpecificConfig,
    /// Sampling frequency of `config`
    pub time_scale: u32,
    pub chapters: Vec<ChapterTiming>,
}

impl ValidatedBook {
    /// Sum of all chapter durations
    pub fn total_duration(&self) -> u64 {
        self.chapters.iter().map(|c| c.duration).sum()
    }

    /// Log the detected format and one line per chapter
    pub fn log_summary(&self) {
        tracing::info!("Detected format: {}", self.config);
        for chapter in &self.chapters {
            tracing::info!("{}", self.describe(chapter));
        }
    }

    /// `Chapter #n: file, "title", XmYs`
    pub fn describe(&self, chapter: &ChapterTiming) -> String {
        let seconds = chapter.duration / u64::from(self.time_scale.max(1));
        let file_name = chapter
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(
            "Chapter #{}: {}, \"{}\", {}m{}s",
            chapter.position,
            file_name,
            chapter.title,
            seconds / 60,
            seconds % 60
        )
    }
}

/// Run the validation pass over `chapters` in order
pub fn validate_chapters(chapters: &[Chapter], padding_tolerance: u64) -> Result<ValidatedBook> {
    if chapters.is_empty() {
        return Err(BinderError::EmptyBook("no chapters".to_string()));
    }

    let frame_length = u64::from(SAMPLES_PER_AAC_FRAME);
    let mut reference: Option<AudioSpecificConfig> = None;
    let mut timings = Vec::with_capacity(chapters.len());

    for (index, chapter) in chapters.iter().enumerate() {
        let position = index + 1;
        tracing::info!("Reading ADTS file \"{}\"", chapter.file.display());

        let frame_count = count_chapter_frames(chapter, position, &mut reference)?;
        if frame_count == 0 {
            return Err(BinderError::EmptyChapter {
                chapter: position,
                path: chapter.file.display().to_string(),
            });
        }

        let (expected_frames, duration) = match chapter.sample_count {
            Some(sample_count) => {
                if sample_count == 0 || sample_count % frame_length != 0 {
                    return Err(BinderError::UnalignedSampleCount {
                        chapter: position,
                        sample_count,
                        frame_length,
                    });
                }
                let expected = sample_count / frame_length;
                if frame_count < expected || frame_count - expected > padding_tolerance {
                    return Err(BinderError::FrameCountMismatch {
                        chapter: position,
                        expected,
                        actual: frame_count,
                        tolerance: padding_tolerance,
                    });
                }
                (expected, sample_count)
            }
            None => (frame_count, frame_count * frame_length),
        };

        timings.push(ChapterTiming {
            position,
            title: chapter.title.clone(),
            file: chapter.file.clone(),
            frame_count,
            expected_frames,
            duration,
        });
    }

    let config = reference
        .ok_or_else(|| BinderError::EmptyBook("no AudioSpecificConfig found".to_string()))?;
    let time_scale = config
        .sample_rate_hz()
        .filter(|&rate| rate > 0)
        .ok_or_else(|| BinderError::InvalidTimeScale(config.to_string()))?;

    let book = ValidatedBook {
        config,
        time_scale,
        chapters: timings,
    };
    book.log_summary();
    Ok(book)
}

/// Count frames of one chapter, checking each against the book reference
fn count_chapter_frames(
    chapter: &Chapter,
    position: usize,
    reference: &mut Option<AudioSpecificConfig>,
) -> Result<u64> {
    let mut parser = AdtsParser::from_file(&chapter.file)?;

    let mut count = 0u64;
    if !parser.has_frame() {
        return Ok(0);
    }
    loop {
        let frame = count as usize;
        let config = parser.mpeg4_audio_specific_config().ok_or(BinderError::InvalidConfig {
            chapter: position,
            frame,
        })?;
        let expected = *reference.get_or_insert(config);

        let blocks = parser.aac_frame_count();
        if blocks != 1 {
            return Err(BinderError::MultiBlockFrame {
                chapter: position,
                frame,
                blocks,
            });
        }
        if config != expected {
            return Err(BinderError::InconsistentConfig {
                chapter: position,
                frame,
                expected: expected.to_string(),
                found: config.to_string(),
            });
        }

        count += 1;
        if !parser.next_frame() {
            break;
        }
    }
    Ok(count)
}
