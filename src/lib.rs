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


//! BookBinder core
//!
//! Turns per-chapter audio into a single chaptered M4B audiobook:
//!
//! 1. `jobs` encodes each chapter's inputs into an ADTS file, in parallel.
//! 2. `binder::validate` checks that all chapters share one
//!    AudioSpecificConfig and match their encoded length.
//! 3. `binder::assemble` writes one continuous audio track plus a chapter
//!    text track into an MP4 container with the `M4B ` brand.

pub mod audio;
pub mod binder;
pub mod config;
pub mod encoder;
pub mod error;
pub mod jobs;
pub mod mp4;

pub use audio::{AacFormat, AdtsParser, AudioSpecificConfig};
pub use binder::{bind_book, validate_chapters, AssembleOptions, BookBinder, Chapter, ValidatedBook};
pub use config::Settings;
pub use encoder::{AudioEncoder, EncoderKind};
pub use error::{BinderError, Result};
pub use jobs::{EncodeJob, JobReport, JobRunner};
pub use mp4::{BookTags, ContainerWriter, Mp4Writer};
