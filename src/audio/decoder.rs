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


//! PCM decoding of chapter input files
//!
//! Wraps symphonia's probe/decode pipeline and hands out interleaved,
//! native-endian 16-bit PCM in the job's [`AacFormat`]. Channel count is
//! adapted (mono inputs are duplicated, stereo inputs are averaged down);
//! a differing sample rate is rejected since no resampler is involved.
//!
//! # Supported inputs
//! WAV, FLAC, MP3, AAC/ADTS, MP4/M4A, Ogg Vorbis (symphonia features enabled
//! in Cargo.toml).

use crate::audio::format::AacFormat;
use crate::error::{BinderError, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Properties of an input file as reported by its container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputInfo {
    pub channels: u16,
    pub sample_rate: u32,
    /// Total PCM frames when the container knows it
    pub frames: Option<u64>,
}

/// Streaming decoder producing PCM in a fixed target format
pub struct PcmDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    target: AacFormat,
    info: InputInfo,
}

impl PcmDecoder {
    /// Open `path` and prepare decoding into `target`
    pub fn open(path: &Path, target: AacFormat) -> Result<Self> {
        target.validate()?;

        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BinderError::FileNotFound(path.display().to_string())
            } else {
                BinderError::file_io("Failed to open input", path, e)
            }
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| {
                BinderError::DecoderError(format!("Failed to probe {}: {}", path.display(), e))
            })?;
        let reader = probed.format;

        let track = reader.default_track().ok_or_else(|| {
            BinderError::DecoderError(format!("No audio track in {}", path.display()))
        })?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let info = InputInfo {
            channels: params.channels.map(|c| c.count() as u16).unwrap_or(0),
            sample_rate: params.sample_rate.unwrap_or(0),
            frames: params.n_frames,
        };
        if info.sample_rate != 0 && info.sample_rate != target.sample_rate {
            return Err(BinderError::UnsupportedFormat(format!(
                "{} is {}Hz, job expects {}Hz",
                path.display(),
                info.sample_rate,
                target.sample_rate
            )));
        }

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| {
                BinderError::DecoderError(format!("Failed to create decoder for {}: {}", path.display(), e))
            })?;

        Ok(Self {
            reader,
            decoder,
            track_id,
            target,
            info,
        })
    }

    pub fn info(&self) -> InputInfo {
        self.info
    }

    /// Decode the whole input, passing interleaved PCM chunks to `sink`
    ///
    /// Returns the number of PCM frames delivered. Corrupt packets are
    /// skipped with a warning.
    pub fn decode_all<F>(&mut self, mut sink: F) -> Result<u64>
    where
        F: FnMut(&[i16]) -> Result<()>,
    {
        let mut frames = 0u64;
        let mut converted: Vec<i16> = Vec::new();

        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(BinderError::DecoderError(e.to_string())),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(BinderError::DecoderError(e.to_string())),
            };

            let spec = *decoded.spec();
            if spec.rate != self.target.sample_rate {
                return Err(BinderError::UnsupportedFormat(format!(
                    "decoded {}Hz, job expects {}Hz",
                    spec.rate, self.target.sample_rate
                )));
            }
            let source_channels = spec.channels.count();
            let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);

            converted.clear();
            remix(
                buffer.samples(),
                source_channels,
                usize::from(self.target.channels),
                &mut converted,
            );
            if converted.is_empty() {
                continue;
            }
            frames += (converted.len() / usize::from(self.target.channels)) as u64;
            sink(&converted)?;
        }

        Ok(frames)
    }
}

/// Map interleaved samples from `from` channels to `to` channels
///
/// Down-mixing averages all source channels; up-mixing repeats the average.
pub fn remix(samples: &[i16], from: usize, to: usize, out: &mut Vec<i16>) {
    if from == 0 || to == 0 {
        return;
    }
    if from == to {
        out.extend_from_slice(samples);
        return;
    }
    for frame in samples.chunks_exact(from) {
        let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
        let mixed = (sum / from as i32) as i16;
        out.extend(std::iter::repeat(mixed).take(to));
    }
}
