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


//! PCM/AAC format contract shared by decoders and encoders
//!
//! The AAC encoder consumes native-endian signed 16-bit PCM only, mono or
//! stereo, and produces frames of 1024 samples. Anything outside that contract
//! is rejected before a decoder or encoder is created.

use crate::audio::asc::{AudioSpecificConfig, AOT_AAC_LC};
use crate::error::{BinderError, Result};
use serde::{Deserialize, Serialize};

/// PCM samples per AAC-LC access unit
pub const SAMPLES_PER_AAC_FRAME: u32 = 1024;

/// Sampling rates accepted by the encoder backends
pub const SUPPORTED_RATES: [u32; 7] = [8000, 11025, 22050, 32000, 44100, 48000, 96000];

/// Negotiated PCM format for one encode job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AacFormat {
    /// Channel count (1 or 2)
    pub channels: u16,
    /// Always 16
    pub bits_per_sample: u16,
    /// Sampling rate in Hz
    pub sample_rate: u32,
    /// Always 1024
    pub samples_per_aac_frame: u32,
}

impl Default for AacFormat {
    fn default() -> Self {
        Self {
            channels: 2,
            bits_per_sample: 16,
            sample_rate: 44100,
            samples_per_aac_frame: SAMPLES_PER_AAC_FRAME,
        }
    }
}

impl AacFormat {
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
            ..Self::default()
        }
    }

    pub fn is_supported_rate(rate: u32) -> bool {
        SUPPORTED_RATES.contains(&rate)
    }

    pub fn is_valid(&self) -> bool {
        (self.channels == 1 || self.channels == 2)
            && self.bits_per_sample == 16
            && self.samples_per_aac_frame == SAMPLES_PER_AAC_FRAME
            && Self::is_supported_rate(self.sample_rate)
    }

    /// Fail with `UnsupportedFormat` unless [`is_valid`](Self::is_valid)
    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(BinderError::UnsupportedFormat(format!(
                "{} channel(s), {} bit, {}Hz",
                self.channels, self.bits_per_sample, self.sample_rate
            )))
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample / 8)
    }

    /// Bytes of one interleaved PCM frame (one sample for every channel)
    pub fn bytes_per_pcm_frame(&self) -> usize {
        self.bytes_per_sample() * usize::from(self.channels)
    }

    /// Bytes of PCM consumed by one AAC access unit
    pub fn bytes_per_aac_frame(&self) -> usize {
        self.bytes_per_pcm_frame() * self.samples_per_aac_frame as usize
    }

    /// AAC-LC AudioSpecificConfig for this format, `None` if invalid
    pub fn audio_specific_config(&self) -> Option<AudioSpecificConfig> {
        if !self.is_valid() {
            return None;
        }
        AudioSpecificConfig::encode(AOT_AAC_LC, self.channels as u8, self.sample_rate)
    }
}
