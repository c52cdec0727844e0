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


//! AAC-LC encoder backend (fdk-aac)
//!
//! Fixed contract: AAC-LC, 64 kbit/s CBR, 1024-sample frames, ADTS transport
//! so that the chapter file can be fed straight to the ADTS parser.

use super::{check_pcm, AudioEncoder};
use crate::audio::format::{AacFormat, SAMPLES_PER_AAC_FRAME};
use crate::error::{BinderError, Result};
use fdk_aac::enc::{AudioObjectType, BitRate, ChannelMode, Encoder, EncoderParams, Transport};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const BIT_RATE: u32 = 64_000;

/// Upper bound on silent frames fed while draining the encoder delay
const MAX_DRAIN_FRAMES: u64 = 16;

struct Session {
    encoder: Encoder,
    writer: BufWriter<File>,
    path: PathBuf,
    format: AacFormat,
    /// Encoder priming delay in PCM frames
    delay: u64,
    out_buf: Vec<u8>,
}

/// fdk-aac backed chapter encoder
#[derive(Default)]
pub struct AacEncoder {
    session: Option<Session>,
    /// Interleaved samples consumed by the encoder
    num_samples: u64,
    /// ADTS units written to the output
    num_aac_frames: u64,
}

impl AacEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `pcm` completely, writing every produced ADTS unit
    fn encode_block(&mut self, pcm: &[i16]) -> Result<u64> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| BinderError::EncoderError("Encoder not initialized".to_string()))?;

        let mut consumed_total = 0u64;
        let mut pos = 0;
        while pos < pcm.len() {
            let info = session
                .encoder
                .encode(&pcm[pos..], &mut session.out_buf)
                .map_err(|e| BinderError::EncoderError(format!("AAC encode failed: {:?}", e)))?;

            if info.output_size > 0 {
                session
                    .writer
                    .write_all(&session.out_buf[..info.output_size])
                    .map_err(|e| BinderError::file_io("Failed to write ADTS file", &session.path, e))?;
                self.num_aac_frames += 1;
            }
            if info.input_consumed == 0 && info.output_size == 0 {
                return Err(BinderError::EncoderError("AAC encoder stalled".to_string()));
            }
            pos += info.input_consumed;
            consumed_total += info.input_consumed as u64;
        }
        Ok(consumed_total)
    }
}

impl AudioEncoder for AacEncoder {
    fn initialize(&mut self, format: AacFormat, output: &Path) -> Result<()> {
        if self.session.is_some() {
            return Err(BinderError::EncoderError("Encoder already initialized".to_string()));
        }
        format.validate()?;

        let channels = match format.channels {
            1 => ChannelMode::Mono,
            2 => ChannelMode::Stereo,
            n => {
                return Err(BinderError::UnsupportedFormat(format!("{} channels", n)));
            }
        };
        let params = EncoderParams {
            bit_rate: BitRate::Cbr(BIT_RATE),
            sample_rate: format.sample_rate,
            transport: Transport::Adts,
            channels,
            audio_object_type: AudioObjectType::Mpeg4LowComplexity,
        };
        let encoder = Encoder::new(params)
            .map_err(|e| BinderError::EncoderError(format!("Failed to create AAC encoder: {:?}", e)))?;
        let info = encoder
            .info()
            .map_err(|e| BinderError::EncoderError(format!("Failed to get AAC encoder info: {:?}", e)))?;

        let file = File::create(output)
            .map_err(|e| BinderError::file_io("Failed to create ADTS file", output, e))?;
        tracing::debug!(
            "Writing ADTS file {} (delay {} samples)",
            output.display(),
            info.nDelay
        );

        self.session = Some(Session {
            encoder,
            writer: BufWriter::new(file),
            path: output.to_path_buf(),
            format,
            delay: u64::from(info.nDelay),
            out_buf: vec![0u8; (info.maxOutBufBytes as usize).max(8192)],
        });
        self.num_samples = 0;
        self.num_aac_frames = 0;
        Ok(())
    }

    fn encode(&mut self, pcm: &[i16]) -> Result<()> {
        let format = self
            .session
            .as_ref()
            .map(|s| s.format)
            .ok_or_else(|| BinderError::EncoderError("Encoder not initialized".to_string()))?;
        check_pcm(pcm, &format)?;
        let consumed = self.encode_block(pcm)?;
        self.num_samples += consumed;
        Ok(())
    }

    /// Pad the last frame with silence, then drain the encoder delay
    ///
    /// The chapter ends up with at least as many ADTS units as its PCM frame
    /// count predicts, plus the few units carrying the delayed tail.
    fn flush(&mut self) -> Result<()> {
        let (channels, delay) = match self.session.as_ref() {
            Some(session) => (u64::from(session.format.channels), session.delay),
            None => return Ok(()),
        };
        let frame_len = u64::from(SAMPLES_PER_AAC_FRAME);

        let remainder = self.num_pcm_frames() % frame_len;
        if remainder > 0 {
            let fill = vec![0i16; ((frame_len - remainder) * channels) as usize];
            let consumed = self.encode_block(&fill)?;
            self.num_samples += consumed;
        }

        let expected = self.num_pcm_frames() / frame_len;
        let drained = expected + (delay + frame_len - 1) / frame_len;
        let silence = vec![0i16; (frame_len * channels) as usize];
        let mut fed = 0;
        while self.num_aac_frames < drained && fed < MAX_DRAIN_FRAMES {
            self.encode_block(&silence)?;
            fed += 1;
        }

        if let Some(session) = self.session.as_mut() {
            session
                .writer
                .flush()
                .map_err(|e| BinderError::file_io("Failed to flush ADTS file", &session.path, e))?;
        }
        Ok(())
    }

    fn num_pcm_frames(&self) -> u64 {
        let channels = self
            .session
            .as_ref()
            .map_or(1, |s| u64::from(s.format.channels.max(1)));
        self.num_samples / channels
    }

    fn output_suffix(&self, _format: &AacFormat) -> String {
        "aac".to_string()
    }
}
