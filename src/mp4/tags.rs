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


//! iTunes-style book tags
//!
//! Tags live in `moov/udta/meta/ilst` and are handled by `mp4ameta` on a
//! finished file. Writing updates the file's existing tag: empty text fields
//! leave the stored value alone, track and disk numbers are always written.
//! Cover art is taken from a file whose extension decides the image type
//! (`.jpg`/`.jpeg` for JPEG, `.png` for PNG); other files are skipped.

use crate::error::{BinderError, Result};
use mp4ameta::{Img, ImgFmt, Tag};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Cover image types accepted in `covr`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkType {
    Jpeg,
    Png,
}

impl ArtworkType {
    /// Detect from file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    fn from_img(fmt: ImgFmt) -> Option<Self> {
        match fmt {
            ImgFmt::Jpeg => Some(Self::Jpeg),
            ImgFmt::Png => Some(Self::Png),
            _ => None,
        }
    }
}

/// Book-level metadata written into the output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookTags {
    /// Book title, stored as album
    pub title: String,
    /// Stored as track name
    pub chapter: String,
    /// Stored as artist
    pub author: String,
    pub album_artist: String,
    pub composer: String,
    pub genre: String,
    pub track_index: u16,
    pub track_total: u16,
    pub disk_index: u16,
    pub disk_total: u16,
    pub cover_image: Option<PathBuf>,
}

impl Default for BookTags {
    fn default() -> Self {
        Self {
            title: String::new(),
            chapter: String::new(),
            author: String::new(),
            album_artist: String::new(),
            composer: String::new(),
            genre: String::new(),
            track_index: 1,
            track_total: 1,
            disk_index: 1,
            disk_total: 1,
            cover_image: None,
        }
    }
}

impl BookTags {
    /// Load tags from a JSON file
    ///
    /// A relative `cover_image` is taken relative to the tags file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| BinderError::file_io("Failed to read tags", path, e))?;
        let mut tags: Self = serde_json::from_str(&json)?;
        if let Some(cover) = tags.cover_image.as_mut() {
            if cover.is_relative() {
                let base = path.parent().unwrap_or_else(|| Path::new(""));
                *cover = base.join(&*cover);
            }
        }
        Ok(tags)
    }

    /// Read the tags stored in an MP4 file
    ///
    /// The cover image stays `None`; use [`read_artwork`] for the picture.
    pub fn read_from(path: &Path) -> Result<Self> {
        let tag = Tag::read_from_path(path).map_err(|e| BinderError::tag(path, e))?;
        Ok(Self::from_tag(&tag))
    }

    /// Merge these tags into the file's existing tag and save it
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut tag = Tag::read_from_path(path).map_err(|e| BinderError::tag(path, e))?;
        self.apply_to(&mut tag);
        tag.write_to_path(path).map_err(|e| BinderError::tag(path, e))?;
        tracing::debug!("Tagged {}", path.display());
        Ok(())
    }

    pub fn from_tag(tag: &Tag) -> Self {
        let text = |value: Option<&str>| value.unwrap_or_default().to_string();
        let defaults = Self::default();
        Self {
            title: text(tag.album()),
            chapter: text(tag.title()),
            author: text(tag.artist()),
            album_artist: text(tag.album_artist()),
            composer: text(tag.composer()),
            genre: text(tag.genre()),
            track_index: tag.track_number().unwrap_or(defaults.track_index),
            track_total: tag.total_tracks().unwrap_or(defaults.track_total),
            disk_index: tag.disc_number().unwrap_or(defaults.disk_index),
            disk_total: tag.total_discs().unwrap_or(defaults.disk_total),
            cover_image: None,
        }
    }

    pub fn apply_to(&self, tag: &mut Tag) {
        if !self.title.is_empty() {
            tag.set_album(self.title.as_str());
        }
        if !self.chapter.is_empty() {
            tag.set_title(self.chapter.as_str());
        }
        if !self.author.is_empty() {
            tag.set_artist(self.author.as_str());
        }
        if !self.album_artist.is_empty() {
            tag.set_album_artist(self.album_artist.as_str());
        }
        if !self.composer.is_empty() {
            tag.set_composer(self.composer.as_str());
        }
        if !self.genre.is_empty() {
            tag.set_genre(self.genre.as_str());
        }
        tag.set_track(self.track_index, self.track_total);
        tag.set_disc(self.disk_index, self.disk_total);

        if let Some((kind, data)) = self.artwork() {
            let img = match kind {
                ArtworkType::Jpeg => Img::jpeg(data),
                ArtworkType::Png => Img::png(data),
            };
            tag.set_artwork(img);
        }
    }

    /// Read the cover image, `None` when unset, unreadable or of an unknown type
    pub fn artwork(&self) -> Option<(ArtworkType, Vec<u8>)> {
        let path = self.cover_image.as_deref()?;
        let kind = match ArtworkType::from_path(path) {
            Some(kind) => kind,
            None => {
                tracing::warn!("Skipping cover image with unsupported type: {}", path.display());
                return None;
            }
        };
        match std::fs::read(path) {
            Ok(data) if !data.is_empty() => Some((kind, data)),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Unable to read cover image {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// First JPEG or PNG cover stored in an MP4 file
pub fn read_artwork(path: &Path) -> Result<Option<(ArtworkType, Vec<u8>)>> {
    let tag = Tag::read_from_path(path).map_err(|e| BinderError::tag(path, e))?;
    let artwork = tag
        .artworks()
        .find_map(|img| ArtworkType::from_img(img.fmt).map(|kind| (kind, img.data.to_vec())));
    Ok(artwork)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4::{ContainerWriter, FileType, Mp4Writer};

    const PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    /// Small finished M4B: two audio samples and one chapter
    fn write_book(path: &Path) {
        let mut writer = Mp4Writer::create(path, FileType::m4b()).unwrap();
        writer.set_timing(44100, 2048).unwrap();
        let audio = writer.add_audio_track(44100, 1024).unwrap();
        writer.set_es_config(audio, &[0x12, 0x10]).unwrap();
        writer.write_sample(audio, &[1; 16], 1024).unwrap();
        writer.write_sample(audio, &[2; 16], 1024).unwrap();
        let chapters = writer.add_chapter_track(audio).unwrap();
        writer.add_chapter(chapters, 2048, "Prologue").unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn test_artwork_type_from_extension() {
        assert_eq!(ArtworkType::from_path(Path::new("cover.JPG")), Some(ArtworkType::Jpeg));
        assert_eq!(ArtworkType::from_path(Path::new("cover.jpeg")), Some(ArtworkType::Jpeg));
        assert_eq!(ArtworkType::from_path(Path::new("cover.png")), Some(ArtworkType::Png));
        assert_eq!(ArtworkType::from_path(Path::new("cover.gif")), None);
        assert_eq!(ArtworkType::from_path(Path::new("cover")), None);
    }

    #[test]
    fn test_tags_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("book.m4b");
        write_book(&book);
        let cover = dir.path().join("cover.png");
        std::fs::write(&cover, PNG).unwrap();

        let tags = BookTags {
            title: "The Book".to_string(),
            author: "A. Writer".to_string(),
            genre: "Audiobook".to_string(),
            track_index: 3,
            track_total: 12,
            disk_total: 2,
            cover_image: Some(cover),
            ..BookTags::default()
        };
        tags.write_to(&book).unwrap();

        let read = BookTags::read_from(&book).unwrap();
        assert_eq!(read, BookTags { cover_image: None, ..tags });
        assert_eq!(read_artwork(&book).unwrap(), Some((ArtworkType::Png, PNG.to_vec())));
    }

    #[test]
    fn test_update_keeps_unset_fields() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("book.m4b");
        write_book(&book);

        BookTags {
            title: "Old Title".to_string(),
            genre: "Audiobook".to_string(),
            ..BookTags::default()
        }
        .write_to(&book)
        .unwrap();
        BookTags {
            title: "New Title".to_string(),
            disk_total: 3,
            ..BookTags::default()
        }
        .write_to(&book)
        .unwrap();

        let read = BookTags::read_from(&book).unwrap();
        assert_eq!(read.title, "New Title");
        assert_eq!(read.genre, "Audiobook");
        assert_eq!(read.disk_total, 3);
        assert_eq!(read_artwork(&book).unwrap(), None);
    }

    #[test]
    fn test_unsupported_cover_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let gif = dir.path().join("cover.gif");
        std::fs::write(&gif, b"GIF89a").unwrap();
        let tags = BookTags {
            cover_image: Some(gif),
            ..BookTags::default()
        };
        assert_eq!(tags.artwork(), None);

        let mut tag = Tag::default();
        tags.apply_to(&mut tag);
        assert_eq!(tag.artworks().count(), 0);
        assert_eq!(tag.track_number(), Some(1));
    }

    #[test]
    fn test_load_resolves_cover_next_to_tags_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags.json");
        std::fs::write(&path, r#"{"title":"T","cover_image":"art/cover.jpg"}"#).unwrap();
        let tags = BookTags::load(&path).unwrap();
        assert_eq!(tags.cover_image, Some(dir.path().join("art/cover.jpg")));

        let absolute = dir.path().join("elsewhere.png");
        let json = serde_json::json!({ "cover_image": absolute });
        std::fs::write(&path, json.to_string()).unwrap();
        assert_eq!(BookTags::load(&path).unwrap().cover_image, Some(absolute));
    }

    #[test]
    fn test_partial_json() {
        let tags: BookTags = serde_json::from_str(r#"{"title":"T","disk_total":2}"#).unwrap();
        assert_eq!(tags.title, "T");
        assert_eq!(tags.track_index, 1);
        assert_eq!(tags.disk_total, 2);
    }
}
