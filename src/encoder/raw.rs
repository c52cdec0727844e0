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


//! Raw PCM output backend

use super::{check_pcm, AudioEncoder};
use crate::audio::format::AacFormat;
use crate::error::{BinderError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes PCM unchanged in native byte order
#[derive(Debug, Default)]
pub struct RawEncoder {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    format: AacFormat,
    num_pcm_frames: u64,
    scratch: Vec<u8>,
}

impl RawEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioEncoder for RawEncoder {
    fn initialize(&mut self, format: AacFormat, output: &Path) -> Result<()> {
        if self.writer.is_some() {
            return Err(BinderError::EncoderError("Encoder already initialized".to_string()));
        }
        format.validate()?;

        let file = File::create(output)
            .map_err(|e| BinderError::file_io("Failed to create raw output", output, e))?;
        tracing::debug!("Writing raw PCM file {}", output.display());

        self.writer = Some(BufWriter::new(file));
        self.path = output.to_path_buf();
        self.format = format;
        self.num_pcm_frames = 0;
        Ok(())
    }

    fn encode(&mut self, pcm: &[i16]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| BinderError::EncoderError("Encoder not initialized".to_string()))?;
        check_pcm(pcm, &self.format)?;

        self.scratch.clear();
        self.scratch.extend(pcm.iter().flat_map(|s| s.to_ne_bytes()));
        writer
            .write_all(&self.scratch)
            .map_err(|e| BinderError::file_io("Failed to write raw output", &self.path, e))?;

        self.num_pcm_frames += (pcm.len() / usize::from(self.format.channels)) as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| BinderError::file_io("Failed to flush raw output", &self.path, e))?;
        }
        Ok(())
    }

    fn num_pcm_frames(&self) -> u64 {
        self.num_pcm_frames
    }

    fn output_suffix(&self, format: &AacFormat) -> String {
        if !format.is_valid() {
            return "raw".to_string();
        }
        let endian = if cfg!(target_endian = "big") { "be" } else { "le" };
        format!(
            "{}.{}ch.s{}.{}Hz.raw",
            endian, format.channels, format.bits_per_sample, format.sample_rate
        )
    }
}
