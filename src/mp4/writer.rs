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


//! Streaming MP4 writer
//!
//! Layout: `ftyp`, then a 64-bit `mdat` receiving samples as they are
//! written, then `moov` built from the collected sample tables on
//! [`finish`](ContainerWriter::finish). Memory use is bounded by the sample
//! tables; payloads go straight to the output.

use super::boxes::{self, FourCc, SampleTable};
use super::{ContainerWriter, FileType, TrackId};
use crate::error::{BinderError, Result};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Default `tkhd` flags (enabled, in movie)
const DEFAULT_TRACK_FLAGS: u32 = 0x3;

#[derive(Debug)]
enum TrackKind {
    Audio {
        config: Vec<u8>,
        /// Every sample covers this many time-scale units
        sample_duration: u32,
        chapter_track: Option<u32>,
    },
    ChapterText,
}

#[derive(Debug)]
struct Track {
    id: u32,
    kind: TrackKind,
    time_scale: u32,
    flags: u32,
    language: u16,
    samples: SampleTable,
}

/// ISO-BMFF writer over any seekable output
pub struct Mp4Writer<W: Write + Seek> {
    out: W,
    file_type: FileType,
    time_scale: u32,
    duration: Option<u64>,
    tracks: Vec<Track>,
    /// Offset of the mdat header
    mdat_start: u64,
    /// Absolute write position
    position: u64,
    finished: bool,
}

impl Mp4Writer<BufWriter<File>> {
    /// Create `path` and write the file type header
    pub fn create(path: &Path, file_type: FileType) -> Result<Self> {
        let file = File::create(path)
            .map_err(|e| BinderError::file_io("Failed to create output file", path, e))?;
        Self::new(BufWriter::new(file), file_type)
    }
}

impl<W: Write + Seek> Mp4Writer<W> {
    pub fn new(mut out: W, file_type: FileType) -> Result<Self> {
        let mut head = Vec::new();
        boxes::write_ftyp(&mut head, &file_type.major_brand, &file_type.compatible_brands);
        let mdat_start = head.len() as u64;
        // size 1 announces a 64-bit largesize, patched on finish
        head.extend_from_slice(&1u32.to_be_bytes());
        head.extend_from_slice(b"mdat");
        head.extend_from_slice(&0u64.to_be_bytes());
        out.write_all(&head)?;

        Ok(Self {
            out,
            file_type,
            time_scale: 1000,
            duration: None,
            tracks: Vec::new(),
            mdat_start,
            position: head.len() as u64,
            finished: false,
        })
    }

    /// Give back the underlying output
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn file_type(&self) -> &FileType {
        &self.file_type
    }

    /// `tkhd` flags currently set on `track`
    pub fn track_flags(&self, track: TrackId) -> Option<u32> {
        self.tracks.iter().find(|t| t.id == track.0).map(|t| t.flags)
    }

    /// Elementary stream configuration of an audio track
    pub fn es_config(&self, track: TrackId) -> Option<&[u8]> {
        self.tracks.iter().find(|t| t.id == track.0).and_then(|t| match &t.kind {
            TrackKind::Audio { config, .. } => Some(config.as_slice()),
            TrackKind::ChapterText => None,
        })
    }

    /// Number of samples written to `track`
    pub fn sample_count(&self, track: TrackId) -> usize {
        self.tracks
            .iter()
            .find(|t| t.id == track.0)
            .map_or(0, |t| t.samples.len())
    }

    fn track_mut(&mut self, track: TrackId) -> Result<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == track.0)
            .ok_or_else(|| BinderError::container(format!("Unknown track {}", track.0)))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(BinderError::container("File already finished"));
        }
        Ok(())
    }

    fn add_track(&mut self, kind: TrackKind, time_scale: u32) -> TrackId {
        let id = self.tracks.len() as u32 + 1;
        self.tracks.push(Track {
            id,
            kind,
            time_scale,
            flags: DEFAULT_TRACK_FLAGS,
            language: boxes::LANGUAGE_UNDETERMINED,
            samples: SampleTable::default(),
        });
        TrackId(id)
    }

    fn build_moov(&self) -> Vec<u8> {
        let movie_duration = self
            .tracks
            .iter()
            .map(|t| scale(t.samples.duration, t.time_scale, self.time_scale))
            .max()
            .unwrap_or(0)
            .max(self.duration.unwrap_or(0));

        let mut moov = Vec::new();
        boxes::write_box(&mut moov, b"moov", |moov| {
            boxes::write_mvhd(moov, self.time_scale, movie_duration, self.tracks.len() as u32 + 1);
            for track in &self.tracks {
                self.write_trak(moov, track);
            }
        });
        moov
    }

    fn write_trak(&self, out: &mut Vec<u8>, track: &Track) {
        let (audio, handler, handler_name): (bool, &FourCc, &str) = match track.kind {
            TrackKind::Audio { .. } => (true, b"soun", "SoundHandler"),
            TrackKind::ChapterText => (false, b"text", "TextHandler"),
        };
        let movie_duration = scale(track.samples.duration, track.time_scale, self.time_scale);

        boxes::write_box(out, b"trak", |trak| {
            boxes::write_tkhd(trak, track.id, track.flags, movie_duration, audio);
            if let TrackKind::Audio {
                chapter_track: Some(chapter),
                ..
            } = track.kind
            {
                boxes::write_box(trak, b"tref", |tref| {
                    boxes::write_box(tref, b"chap", |chap| {
                        chap.extend_from_slice(&chapter.to_be_bytes());
                    });
                });
            }
            boxes::write_box(trak, b"mdia", |mdia| {
                boxes::write_mdhd(mdia, track.time_scale, track.samples.duration, track.language);
                boxes::write_hdlr(mdia, handler, handler_name);
                boxes::write_box(mdia, b"minf", |minf| {
                    if audio {
                        boxes::write_smhd(minf);
                    } else {
                        boxes::write_gmhd(minf);
                    }
                    boxes::write_dinf(minf);
                    boxes::write_box(minf, b"stbl", |stbl| {
                        match &track.kind {
                            TrackKind::Audio { config, .. } => {
                                let bitrate = average_bitrate(&track.samples, track.time_scale);
                                boxes::write_mp4a_stsd(stbl, config, track.time_scale, bitrate);
                            }
                            TrackKind::ChapterText => boxes::write_text_stsd(stbl),
                        }
                        boxes::write_sample_tables(stbl, &track.samples);
                    });
                });
            });
        });
    }
}

/// Rescale `value` from one time scale to another
fn scale(value: u64, from: u32, to: u32) -> u64 {
    if from == 0 {
        return 0;
    }
    (u128::from(value) * u128::from(to) / u128::from(from)) as u64
}

fn average_bitrate(samples: &SampleTable, time_scale: u32) -> u32 {
    if samples.duration == 0 {
        return 0;
    }
    let bits = u128::from(samples.total_bytes()) * 8 * u128::from(time_scale);
    (bits / u128::from(samples.duration)).min(u128::from(u32::MAX)) as u32
}

impl<W: Write + Seek> ContainerWriter for Mp4Writer<W> {
    fn set_timing(&mut self, time_scale: u32, duration: u64) -> Result<()> {
        if time_scale == 0 {
            return Err(BinderError::container("Time scale must not be zero"));
        }
        self.time_scale = time_scale;
        self.duration = Some(duration);
        Ok(())
    }

    fn add_audio_track(&mut self, time_scale: u32, sample_duration: u32) -> Result<TrackId> {
        self.ensure_open()?;
        if time_scale == 0 || sample_duration == 0 {
            return Err(BinderError::container("Audio time scale and sample duration must not be zero"));
        }
        Ok(self.add_track(
            TrackKind::Audio {
                config: Vec::new(),
                sample_duration,
                chapter_track: None,
            },
            time_scale,
        ))
    }

    fn set_es_config(&mut self, track: TrackId, data: &[u8]) -> Result<()> {
        if data.len() > 0x7F - 23 {
            return Err(BinderError::container("Elementary stream config too large"));
        }
        match &mut self.track_mut(track)?.kind {
            TrackKind::Audio { config, .. } => {
                *config = data.to_vec();
                Ok(())
            }
            TrackKind::ChapterText => Err(BinderError::container("Not an audio track")),
        }
    }

    fn set_track_flags(&mut self, track: TrackId, flags: u32) -> Result<()> {
        self.track_mut(track)?.flags = flags & 0x00FF_FFFF;
        Ok(())
    }

    fn set_track_language(&mut self, track: TrackId, language: &str) -> Result<()> {
        let packed = boxes::pack_language(language).ok_or_else(|| {
            BinderError::container(format!("Invalid ISO 639-2/T language code '{}'", language))
        })?;
        self.track_mut(track)?.language = packed;
        Ok(())
    }

    fn write_sample(&mut self, track: TrackId, data: &[u8], duration: u32) -> Result<()> {
        self.ensure_open()?;
        let size = u32::try_from(data.len())
            .map_err(|_| BinderError::container("Sample exceeds 4 GiB"))?;
        let offset = self.position;
        let entry = self.track_mut(track)?;
        if let TrackKind::Audio { sample_duration, .. } = entry.kind {
            if duration != sample_duration {
                return Err(BinderError::container(format!(
                    "Audio sample of {} units on a track of {}-unit samples",
                    duration, sample_duration
                )));
            }
        }
        entry.samples.push(size, offset, duration);
        self.out.write_all(data)?;
        self.position += u64::from(size);
        Ok(())
    }

    fn add_chapter_track(&mut self, audio: TrackId) -> Result<TrackId> {
        self.ensure_open()?;
        let reference = self.track_mut(audio)?;
        if !matches!(reference.kind, TrackKind::Audio { .. }) {
            return Err(BinderError::container("Chapters must reference an audio track"));
        }
        let time_scale = reference.time_scale;
        let chapter = self.add_track(TrackKind::ChapterText, time_scale);
        if let TrackKind::Audio { chapter_track, .. } = &mut self.track_mut(audio)?.kind {
            *chapter_track = Some(chapter.0);
        }
        Ok(chapter)
    }

    fn add_chapter(&mut self, track: TrackId, duration: u64, title: &str) -> Result<()> {
        let duration = u32::try_from(duration)
            .map_err(|_| BinderError::container(format!("Chapter '{}' is too long", title)))?;
        if !matches!(self.track_mut(track)?.kind, TrackKind::ChapterText) {
            return Err(BinderError::container("Not a chapter track"));
        }
        self.write_sample(track, &boxes::text_sample(title), duration)
    }

    fn finish(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.finished = true;

        let mdat_size = self.position - self.mdat_start;
        let moov = self.build_moov();
        self.out.write_all(&moov)?;

        self.out.seek(SeekFrom::Start(self.mdat_start + 8))?;
        self.out.write_all(&mdat_size.to_be_bytes())?;
        self.out.seek(SeekFrom::End(0))?;
        self.out.flush()?;
        Ok(())
    }
}
