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


//! Chapters and binder files
//!
//! A binder is the ordered chapter list of one book. Order defines track
//! position. It is stored as JSON:
//!
//! ```json
//! {"chapters":[{"title":"Prologue","file":"001_Prologue.aac","sample_count":5120}]}
//! ```
//!
//! Relative chapter paths are resolved against the binder file's directory.

use crate::audio::format::SAMPLES_PER_AAC_FRAME;
use crate::error::{BinderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One chapter of a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    /// ADTS file holding the chapter's audio
    pub file: PathBuf,
    /// PCM frames the encoder consumed for this chapter
    ///
    /// When set, the chapter's declared duration is exactly this value and
    /// surplus ADTS frames from encoder padding are folded into the last sample.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<u64>,
}

impl Chapter {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(title: S, file: P) -> Self {
        Self {
            title: title.into(),
            file: file.into(),
            sample_count: None,
        }
    }

    pub fn with_sample_count(mut self, sample_count: u64) -> Self {
        self.sample_count = Some(sample_count);
        self
    }

    /// Target frame count, when the sample count is known
    pub fn expected_frames(&self) -> Option<u64> {
        self.sample_count
            .map(|count| count / u64::from(SAMPLES_PER_AAC_FRAME))
    }

    /// File name without directories, for display
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.display().to_string())
    }
}

/// Ordered chapter list of one book
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookBinder {
    pub chapters: Vec<Chapter>,
}

impl BookBinder {
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self { chapters }
    }

    pub fn push(&mut self, chapter: Chapter) {
        self.chapters.push(chapter);
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chapter> {
        self.chapters.iter()
    }

    /// Load a binder file; entries without title or file are dropped
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BinderError::FileNotFound(path.display().to_string())
            } else {
                BinderError::file_io("Failed to read binder", path, e)
            }
        })?;
        let mut binder: BookBinder = serde_json::from_str(&json)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let before = binder.chapters.len();
        binder.chapters.retain(|c| !c.title.is_empty() && !c.file.as_os_str().is_empty());
        if binder.chapters.len() != before {
            tracing::warn!(
                "Skipped {} incomplete chapter entries in {}",
                before - binder.chapters.len(),
                path.display()
            );
        }
        for chapter in &mut binder.chapters {
            if chapter.file.is_relative() {
                chapter.file = base.join(&chapter.file);
            }
        }
        Ok(binder)
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| BinderError::file_io("Failed to write binder", path, e))
    }
}

impl<'a> IntoIterator for &'a BookBinder {
    type Item = &'a Chapter;
    type IntoIter = std::slice::Iter<'a, Chapter>;

    fn into_iter(self) -> Self::IntoIter {
        self.chapters.iter()
    }
}
