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


//! Audio stream primitives
//!
//! # Module Organization
//!
//! ## asc
//! MPEG-4 AudioSpecificConfig packing and decomposition:
//! - `AudioSpecificConfig` - two-byte config token (object type, rate index, channels)
//! - `SAMPLE_RATES` - the 12 addressable sampling frequencies
//!
//! ## format
//! The PCM contract of the AAC encoder:
//! - `AacFormat` - channels, 16-bit samples, supported rate, 1024-sample frames
//!
//! ## adts
//! Zero-copy ADTS elementary stream parsing:
//! - `AdtsParser` - cursor over one chapter file
//! - `AdtsFrame` - snapshot of the frame under the cursor
//!
//! ## decoder
//! Input decoding via symphonia:
//! - `PcmDecoder` - any supported input file to interleaved i16 PCM

pub mod adts;
pub mod asc;
pub mod decoder;
pub mod format;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types for convenience
pub use adts::{AdtsFrame, AdtsParser, MpegVersion};
pub use asc::{AudioSpecificConfig, AOT_AAC_LC, SAMPLE_RATES};
pub use decoder::{InputInfo, PcmDecoder};
pub use format::{AacFormat, SAMPLES_PER_AAC_FRAME, SUPPORTED_RATES};
