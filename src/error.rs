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

//! Error types for BookBinder
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are categorized by the stage that produced them:
//!
//! ### Validation (chapter duration pass)
//! - `EmptyChapter`, `EmptyBook` - no usable ADTS frames
//! - `InconsistentConfig`, `InvalidConfig` - AudioSpecificConfig problems
//! - `MultiBlockFrame` - ADTS units packing more than one AAC frame
//! - `FrameCountMismatch` - chapter does not match its target sample count
//!
//! ### Muxing (container output)
//! - `ContainerError`, `TagError`, `FileIoError`, `Io`
//!
//! ### Jobs (per-chapter encoding)
//! - `EncoderError`, `DecoderError`, `UnsupportedFormat`, `Cancelled`
//!
//! The ADTS parser itself never produces errors; malformed input simply ends
//! the frame sequence.

use std::path::Path;
use thiserror::Error;

/// Result type alias using our BinderError type
pub type Result<T> = std::result::Result<T, BinderError>;

/// Main error type for BookBinder
#[derive(Error, Debug)]
pub enum BinderError {
    // ===== Validation Errors =====

    /// Chapter file exists but yielded no ADTS frames (empty or corrupt header)
    #[error("Empty chapter #{chapter}: no ADTS frames in '{path}'")]
    EmptyChapter { chapter: usize, path: String },

    /// The chapter list was empty or no AudioSpecificConfig could be established
    #[error("Empty book: {0}")]
    EmptyBook(String),

    /// Frame whose AudioSpecificConfig differs from the book's reference
    #[error("Inconsistent AudioSpecificConfig at chapter #{chapter}, frame #{frame}: expected {expected}, found {found}")]
    InconsistentConfig {
        chapter: usize,
        frame: usize,
        expected: String,
        found: String,
    },

    /// Frame whose header does not describe a valid AudioSpecificConfig
    #[error("Invalid AudioSpecificConfig at chapter #{chapter}, frame #{frame}")]
    InvalidConfig { chapter: usize, frame: usize },

    /// ADTS unit carrying more than one raw AAC data block
    #[error("Unsupported ADTS unit with {blocks} AAC frames at chapter #{chapter}, frame #{frame}")]
    MultiBlockFrame {
        chapter: usize,
        frame: usize,
        blocks: usize,
    },

    /// Chapter frame count outside of the tolerated encoder padding
    #[error("Chapter #{chapter} has {actual} AAC frames, expected {expected} (tolerance {tolerance})")]
    FrameCountMismatch {
        chapter: usize,
        expected: u64,
        actual: u64,
        tolerance: u64,
    },

    /// Target sample count is not a positive multiple of the AAC frame length
    #[error("Chapter #{chapter}: sample count {sample_count} is not aligned to {frame_length} samples")]
    UnalignedSampleCount {
        chapter: usize,
        sample_count: u64,
        frame_length: u64,
    },

    /// Sampling frequency could not be derived from the reference config
    #[error("Invalid time scale derived from AudioSpecificConfig {0}")]
    InvalidTimeScale(String),

    // ===== Muxing Errors =====

    /// Container writer failure (bad track state, oversized box, ...)
    #[error("Container error: {0}")]
    ContainerError(String),

    /// I/O failure with operation and path context
    #[error("File I/O error: {0}")]
    FileIoError(String),

    /// File could not be found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// iTunes metadata could not be read or written
    #[error("Tag error: {0}")]
    TagError(String),

    // ===== Job Errors =====

    /// Audio format rejected before any encoding/decoding
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Encoder backend failure
    #[error("Encoder error: {0}")]
    EncoderError(String),

    /// PCM decoder failure
    #[error("Decoder error: {0}")]
    DecoderError(String),

    /// Job skipped because the pool was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid user input (arguments, binder entries, settings)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ===== External Library Errors =====

    #[error("JSON serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Helper methods for creating common errors
impl BinderError {
    /// Create a FileIoError naming the operation and the path involved
    pub fn file_io(operation: &str, path: &Path, err: std::io::Error) -> Self {
        BinderError::FileIoError(format!("{}: {} - {}", operation, path.display(), err))
    }

    /// Create a ContainerError with a message
    pub fn container<S: Into<String>>(message: S) -> Self {
        BinderError::ContainerError(message.into())
    }

    /// Create a TagError naming the file whose metadata failed
    pub fn tag(path: &Path, err: impl std::fmt::Display) -> Self {
        BinderError::TagError(format!("{} - {}", path.display(), err))
    }

    /// Create an InvalidInput error with a message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        BinderError::InvalidInput(message.into())
    }

    /// Check if error was raised by the chapter validation pass
    ///
    /// Validation errors are reported before the output file is created.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            BinderError::EmptyChapter { .. }
                | BinderError::EmptyBook(_)
                | BinderError::InconsistentConfig { .. }
                | BinderError::InvalidConfig { .. }
                | BinderError::MultiBlockFrame { .. }
                | BinderError::FrameCountMismatch { .. }
                | BinderError::UnalignedSampleCount { .. }
                | BinderError::InvalidTimeScale(_)
        )
    }

    /// Check if error is related to file/disk operations
    pub fn is_file_error(&self) -> bool {
        matches!(
            self,
            BinderError::FileIoError(_) | BinderError::FileNotFound(_) | BinderError::Io(_)
        )
    }

    /// Chapter position (1-based) the error refers to, if any
    pub fn chapter(&self) -> Option<usize> {
        match self {
            BinderError::EmptyChapter { chapter, .. }
            | BinderError::InconsistentConfig { chapter, .. }
            | BinderError::InvalidConfig { chapter, .. }
            | BinderError::MultiBlockFrame { chapter, .. }
            | BinderError::FrameCountMismatch { chapter, .. }
            | BinderError::UnalignedSampleCount { chapter, .. } => Some(*chapter),
            _ => None,
        }
    }

    /// Get user-friendly error message suitable for display
    ///
    /// Names the invariant that broke instead of byte offsets.
    pub fn user_message(&self) -> String {
        match self {
            BinderError::EmptyChapter { chapter, path } => {
                format!("Chapter {} is empty: '{}' contains no AAC audio. Please re-encode this chapter.", chapter, path)
            }
            BinderError::InconsistentConfig { chapter, expected, found, .. } => {
                format!(
                    "Inconsistent AudioSpecificConfig at chapter {}: the book is {} but this chapter is {}. All chapters must be encoded with the same format.",
                    chapter, expected, found
                )
            }
            BinderError::MultiBlockFrame { chapter, .. } => {
                format!("Chapter {} packs several AAC frames per ADTS unit, which is not supported.", chapter)
            }
            BinderError::FrameCountMismatch { chapter, expected, actual, .. } => {
                format!(
                    "Chapter {} does not match its encoded length ({} frames found, {} expected). The chapter file may be corrupt or belong to another job.",
                    chapter, actual, expected
                )
            }
            BinderError::Cancelled => "The operation was cancelled.".to_string(),
            _ => self.to_string(),
        }
    }
}
