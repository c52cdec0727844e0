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


//! Chapter encoder backends
//!
//! An encode job streams decoded PCM into an [`AudioEncoder`], which writes
//! one output file per chapter and counts the PCM frames it consumed. That
//! count becomes the chapter's target sample count during assembly.
//!
//! # Backends
//! - [`RawEncoder`] - dumps native-endian PCM, useful to inspect decoding
//! - `AacEncoder` - AAC-LC, 64 kbit/s CBR, ADTS transport (feature `fdk`)

pub mod raw;

#[cfg(feature = "fdk")]
pub mod aac;

use crate::audio::format::AacFormat;
use crate::error::{BinderError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(feature = "fdk")]
pub use aac::AacEncoder;
pub use raw::RawEncoder;

/// Capability every chapter encoder provides
pub trait AudioEncoder {
    /// Create `output` and prepare for `format`; fails on an invalid format
    /// or when called twice
    fn initialize(&mut self, format: AacFormat, output: &Path) -> Result<()>;

    /// Consume interleaved PCM samples
    fn encode(&mut self, pcm: &[i16]) -> Result<()>;

    /// Drain buffered data to the output file
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// PCM frames consumed so far (one frame = one sample per channel)
    fn num_pcm_frames(&self) -> u64;

    /// File suffix for outputs of this backend in `format`
    fn output_suffix(&self, format: &AacFormat) -> String;
}

/// Backend selection for encode jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    Raw,
    Aac,
}

impl Default for EncoderKind {
    fn default() -> Self {
        if cfg!(feature = "fdk") {
            EncoderKind::Aac
        } else {
            EncoderKind::Raw
        }
    }
}

impl EncoderKind {
    /// Instantiate the backend
    pub fn create(self) -> Result<Box<dyn AudioEncoder>> {
        match self {
            EncoderKind::Raw => Ok(Box::new(RawEncoder::new())),
            #[cfg(feature = "fdk")]
            EncoderKind::Aac => Ok(Box::new(AacEncoder::new())),
            #[cfg(not(feature = "fdk"))]
            EncoderKind::Aac => Err(BinderError::EncoderError(
                "AAC encoding requires the `fdk` feature".to_string(),
            )),
        }
    }
}

/// Reject PCM not made of whole frames
pub(crate) fn check_pcm(pcm: &[i16], format: &AacFormat) -> Result<()> {
    let channels = usize::from(format.channels.max(1));
    if pcm.len() % channels != 0 {
        return Err(BinderError::EncoderError(format!(
            "{} samples do not form whole {}-channel frames",
            pcm.len(),
            channels
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_backend_available() {
        let encoder = EncoderKind::Raw.create().unwrap();
        assert_eq!(encoder.num_pcm_frames(), 0);
    }

    #[cfg(not(feature = "fdk"))]
    #[test]
    fn test_aac_backend_needs_feature() {
        assert_eq!(EncoderKind::default(), EncoderKind::Raw);
        assert!(matches!(EncoderKind::Aac.create(), Err(BinderError::EncoderError(_))));
    }

    #[test]
    fn test_kind_serde() {
        let kind: EncoderKind = serde_json::from_str("\"raw\"").unwrap();
        assert_eq!(kind, EncoderKind::Raw);
        assert_eq!(serde_json::to_string(&EncoderKind::Aac).unwrap(), "\"aac\"");
    }

    #[test]
    fn test_check_pcm() {
        let stereo = AacFormat::new(2, 44100);
        assert!(check_pcm(&[0; 8], &stereo).is_ok());
        assert!(check_pcm(&[0; 7], &stereo).is_err());
    }
}
