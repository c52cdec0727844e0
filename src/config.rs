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


//! User settings
//!
//! Passed explicitly to the job runner and the assembler; nothing here is
//! global. Stored as JSON, a missing file yields the defaults.

use crate::binder::{AssembleOptions, DEFAULT_PADDING_TOLERANCE};
use crate::error::{BinderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default size of the encode worker pool
pub const DEFAULT_NUM_THREADS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Concurrent encode jobs
    pub num_threads: usize,

    /// ISO 639-2/T language of the chapter track
    pub language: Option<String>,

    /// Extra trailing AAC frames accepted per chapter
    pub padding_tolerance: u64,

    /// Rename each input to `<input>.done` once encoded
    pub rename_input: bool,

    /// Directory of the last binder, job list or book worked on
    pub last_directory: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            num_threads: DEFAULT_NUM_THREADS,
            language: None,
            padding_tolerance: DEFAULT_PADDING_TOLERANCE,
            rename_input: false,
            last_directory: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(BinderError::file_io("Failed to read settings", path, e)),
        };
        let settings: Settings = serde_json::from_str(&json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| BinderError::file_io("Failed to write settings", path, e))
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(BinderError::invalid_input("num_threads must be at least 1"));
        }
        if let Some(language) = &self.language {
            if language.chars().count() != 3 {
                tracing::warn!("Ignoring chapter language '{}', expected a 3-letter code", language);
            }
        }
        Ok(())
    }

    /// Record the directory containing `path` (or `path` itself if it is one)
    ///
    /// Returns whether the stored value changed.
    pub fn remember_directory(&mut self, path: &Path) -> bool {
        let dir = if path.is_dir() {
            path
        } else {
            match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            }
        };
        let dir = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        if self.last_directory.as_deref() == Some(dir.as_path()) {
            return false;
        }
        tracing::debug!("Last directory is now {}", dir.display());
        self.last_directory = Some(dir);
        true
    }

    /// Look up a relative path that does not exist in the working directory
    /// in the last directory instead
    pub fn resolve_input(&self, path: &Path) -> PathBuf {
        if path.is_relative() && !path.exists() {
            if let Some(dir) = &self.last_directory {
                let candidate = dir.join(path);
                if candidate.exists() {
                    return candidate;
                }
            }
        }
        path.to_path_buf()
    }

    /// Assembly options carrying the language and tolerance
    pub fn assemble_options(&self) -> AssembleOptions {
        AssembleOptions {
            language: self.language.clone(),
            padding_tolerance: self.padding_tolerance,
            tags: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.num_threads, 2);
        assert_eq!(settings.padding_tolerance, 3);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"num_threads": 4, "language": "deu"}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.num_threads, 4);
        assert_eq!(settings.language.as_deref(), Some("deu"));
        assert!(!settings.rename_input);

        let options = settings.assemble_options();
        assert_eq!(options.language.as_deref(), Some("deu"));
        assert_eq!(options.padding_tolerance, 3);
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            rename_input: true,
            last_directory: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_last_directory() {
        let dir = tempfile::tempdir().unwrap();
        let binder = dir.path().join("book.json");
        std::fs::write(&binder, "{}").unwrap();
        let expected = std::fs::canonicalize(dir.path()).unwrap();

        let mut settings = Settings::default();
        assert!(settings.remember_directory(&binder));
        assert_eq!(settings.last_directory.as_deref(), Some(expected.as_path()));
        assert!(!settings.remember_directory(dir.path()));

        assert_eq!(settings.resolve_input(Path::new("book.json")), expected.join("book.json"));
        assert_eq!(
            settings.resolve_input(Path::new("not-there.json")),
            PathBuf::from("not-there.json")
        );
        assert_eq!(settings.resolve_input(&binder), binder);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"num_threads": 0}"#).unwrap();
        assert!(matches!(Settings::load(&path), Err(BinderError::InvalidInput(_))));
    }
}
