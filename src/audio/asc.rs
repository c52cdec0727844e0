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


//! MPEG-4 AudioSpecificConfig codec
//!
//! The two-byte AudioSpecificConfig (ISO/IEC 14496-3 §1.6.2.1) is what an MP4
//! audio track carries in its elementary stream descriptor. BookBinder only
//! needs the short form:
//!
//! ```text
//! [object type:5][sampling frequency index:4][channel configuration:4][reserved:3]
//! ```
//!
//! The value is compared as an opaque token when checking that every chapter
//! of a book was encoded the same way, and decomposed for display.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling frequencies addressable by the 4-bit index (index 0..=11)
pub const SAMPLE_RATES: [u32; 12] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000,
];

/// Audio object type for AAC Low Complexity
pub const AOT_AAC_LC: u8 = 2;

/// Two-byte AudioSpecificConfig
///
/// Holds the value in host order; use [`to_be_bytes`](Self::to_be_bytes) for
/// the wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioSpecificConfig(u16);

impl AudioSpecificConfig {
    /// Pack object type, channel count and sampling frequency
    ///
    /// Returns `None` when the object type is 5 or above, the channel count is
    /// 8 or above, or the rate is not one of [`SAMPLE_RATES`].
    pub fn encode(object_type: u8, channels: u8, sample_rate: u32) -> Option<Self> {
        if object_type >= 5 || channels >= 8 {
            return None;
        }
        let index = sample_rate_index(sample_rate)?;
        Self::encode_indexed(object_type, channels, index)
    }

    /// Same as [`encode`](Self::encode) with the rate given as table index,
    /// the form an ADTS header carries it in
    pub fn encode_indexed(object_type: u8, channels: u8, sample_rate_index: u8) -> Option<Self> {
        if object_type >= 5 || channels >= 8 || usize::from(sample_rate_index) >= SAMPLE_RATES.len() {
            return None;
        }
        Some(Self::from_parts(object_type, sample_rate_index, channels))
    }

    /// Pack raw fields without validating them against the rate table
    ///
    /// Fields are masked to their bit widths.
    pub fn from_parts(object_type: u8, sample_rate_index: u8, channels: u8) -> Self {
        let value = (u16::from(object_type & 0x1F) << 11)
            | (u16::from(sample_rate_index & 0x0F) << 7)
            | (u16::from(channels & 0x0F) << 3);
        Self(value)
    }

    pub fn from_be_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    /// Wire form as stored in the esds DecoderSpecificInfo
    pub fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub fn value(self) -> u16 {
        self.0
    }

    pub fn object_type(self) -> u8 {
        (self.0 >> 11) as u8 & 0x1F
    }

    pub fn sample_rate_index(self) -> u8 {
        (self.0 >> 7) as u8 & 0x0F
    }

    pub fn channel_config(self) -> u8 {
        (self.0 >> 3) as u8 & 0x0F
    }

    /// Sampling frequency in Hz, `None` for reserved or escape indices
    pub fn sample_rate_hz(self) -> Option<u32> {
        SAMPLE_RATES.get(self.sample_rate_index() as usize).copied()
    }

    /// Human-readable name of the object type
    pub fn object_type_name(self) -> &'static str {
        match self.object_type() {
            0 => "Null",
            1 => "AAC Main",
            2 => "AAC LC",
            3 => "AAC SSR",
            4 => "AAC LTP",
            _ => "???",
        }
    }
}

/// Index of `sample_rate` in [`SAMPLE_RATES`]
pub fn sample_rate_index(sample_rate: u32) -> Option<u8> {
    SAMPLE_RATES
        .iter()
        .position(|&rate| rate == sample_rate)
        .map(|index| index as u8)
}

impl fmt::Display for AudioSpecificConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, ", self.object_type_name())?;
        match self.sample_rate_hz() {
            Some(rate) => write!(f, "{}Hz, ", rate)?,
            None => write!(f, "invalid rate index {}, ", self.sample_rate_index())?,
        }
        match self.channel_config() {
            1 => write!(f, "Mono"),
            2 => write!(f, "Stereo"),
            n => write!(f, "{} channels", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aac_lc_stereo_44100() {
        let asc = AudioSpecificConfig::encode(AOT_AAC_LC, 2, 44100).unwrap();
        assert_eq!(asc.to_be_bytes(), [0x12, 0x10]);
        assert_eq!(asc.object_type(), 2);
        assert_eq!(asc.sample_rate_index(), 4);
        assert_eq!(asc.channel_config(), 2);
        assert_eq!(asc.sample_rate_hz(), Some(44100));
    }

    #[test]
    fn test_supported_rates_decode_back() {
        for &rate in &SAMPLE_RATES {
            for object_type in 0..5u8 {
                for channels in 1..=2u8 {
                    let asc = AudioSpecificConfig::encode(object_type, channels, rate).unwrap();
                    assert_eq!(asc.object_type(), object_type);
                    assert_eq!(asc.sample_rate_hz(), Some(rate));
                    assert_eq!(asc.channel_config(), channels);
                }
            }
        }
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        assert!(AudioSpecificConfig::encode(5, 2, 44100).is_none());
        assert!(AudioSpecificConfig::encode(AOT_AAC_LC, 8, 44100).is_none());
        assert!(AudioSpecificConfig::encode(AOT_AAC_LC, 2, 44000).is_none());
        assert!(AudioSpecificConfig::encode(AOT_AAC_LC, 2, 7350).is_none());
        assert!(AudioSpecificConfig::encode_indexed(AOT_AAC_LC, 2, 12).is_none());
        assert_eq!(
            AudioSpecificConfig::encode_indexed(AOT_AAC_LC, 2, 4),
            AudioSpecificConfig::encode(AOT_AAC_LC, 2, 44100)
        );
    }

    #[test]
    fn test_reserved_index_has_no_rate() {
        let asc = AudioSpecificConfig::from_parts(AOT_AAC_LC, 12, 2);
        assert_eq!(asc.sample_rate_hz(), None);
        let escape = AudioSpecificConfig::from_parts(AOT_AAC_LC, 15, 2);
        assert_eq!(escape.sample_rate_hz(), None);
    }

    #[test]
    fn test_be_bytes() {
        let asc = AudioSpecificConfig::from_be_bytes([0x11, 0x90]);
        assert_eq!(asc.object_type(), 2);
        assert_eq!(asc.sample_rate_hz(), Some(48000));
        assert_eq!(asc.channel_config(), 2);
    }

    #[test]
    fn test_display() {
        let stereo = AudioSpecificConfig::encode(AOT_AAC_LC, 2, 44100).unwrap();
        assert_eq!(stereo.to_string(), "AAC LC, 44100Hz, Stereo");
        let mono = AudioSpecificConfig::encode(1, 1, 22050).unwrap();
        assert_eq!(mono.to_string(), "AAC Main, 22050Hz, Mono");
    }
}
