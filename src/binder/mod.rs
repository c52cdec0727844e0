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


//! Book assembly
//!
//! # Module Organization
//!
//! ## chapter
//! - `Chapter` - title, ADTS file and optional target sample count
//! - `BookBinder` - ordered chapter list, saved as JSON
//!
//! ## validate
//! Single pass over every frame of every chapter before anything is written:
//! - `validate_chapters()` - shared AudioSpecificConfig, frame counts, durations
//! - `ValidatedBook` / `ChapterTiming` - what the assembler consumes
//!
//! ## assemble
//! - `write_book()` - audio samples and chapter markers through a `ContainerWriter`
//! - `bind_book()` - validate, then write an M4B file atomically
//!
//! Both passes are sequential; chapter buffers are released one at a time.

pub mod assemble;
pub mod chapter;
pub mod validate;

pub use assemble::{bind_book, write_book, AssembleOptions, TRACK_FLAGS};
pub use chapter::{BookBinder, Chapter};
pub use validate::{validate_chapters, ChapterTiming, ValidatedBook, DEFAULT_PADDING_TOLERANCE};
