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


//! Synthetic ADTS units and WAV inputs for unit tests

use bitstream_io::{BigEndian, BitWrite, BitWriter};

/// Header fields and payload of one ADTS unit
#[derive(Debug, Clone)]
pub struct AdtsUnit {
    /// ID bit: MPEG-2 instead of MPEG-4
    pub mpeg2: bool,
    /// Append a 2-byte CRC after the header
    pub crc: bool,
    /// Audio object type minus one
    pub profile: u8,
    pub frequency_index: u8,
    pub channels: u8,
    /// Raw data blocks in the unit (1..=4)
    pub blocks: u8,
    /// Declared frame length, derived from the payload when `None`
    pub length: Option<u16>,
    pub payload: Vec<u8>,
}

impl AdtsUnit {
    /// AAC-LC, no CRC, one raw data block
    pub fn new(frequency_index: u8, channels: u8, payload: Vec<u8>) -> Self {
        Self {
            mpeg2: false,
            crc: false,
            profile: 1,
            frequency_index,
            channels,
            blocks: 1,
            length: None,
            payload,
        }
    }

    pub fn crc(mut self) -> Self {
        self.crc = true;
        self
    }

    pub fn mpeg2(mut self) -> Self {
        self.mpeg2 = true;
        self
    }

    pub fn blocks(mut self, blocks: u8) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn length(mut self, length: u16) -> Self {
        self.length = Some(length);
        self
    }

    pub fn header_len(&self) -> usize {
        if self.crc {
            9
        } else {
            7
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let length = self
            .length
            .map_or(self.header_len() + self.payload.len(), usize::from);
        let mut out = Vec::with_capacity(self.header_len() + self.payload.len());
        {
            let mut w = BitWriter::endian(&mut out, BigEndian);
            w.write_var::<u32>(12, 0xFFF).unwrap(); // syncword
            w.write_bit(self.mpeg2).unwrap(); // id
            w.write_var::<u32>(2, 0).unwrap(); // layer
            w.write_bit(!self.crc).unwrap(); // protection_absent
            w.write_var::<u32>(2, u32::from(self.profile)).unwrap();
            w.write_var::<u32>(4, u32::from(self.frequency_index)).unwrap();
            w.write_bit(false).unwrap(); // private_bit
            w.write_var::<u32>(3, u32::from(self.channels)).unwrap();
            w.write_bit(false).unwrap(); // original_copy
            w.write_bit(false).unwrap(); // home
            w.write_bit(false).unwrap(); // copyright_identification_bit
            w.write_bit(false).unwrap(); // copyright_identification_start
            w.write_var::<u32>(13, length as u32).unwrap(); // frame_length
            w.write_var::<u32>(11, 0x7FF).unwrap(); // buffer_fullness
            w.write_var::<u32>(2, u32::from(self.blocks - 1)).unwrap();
            if self.crc {
                w.write_var::<u32>(16, 0xABCD).unwrap();
            }
        }
        out.extend_from_slice(&self.payload);
        out
    }
}

/// `frames` AAC-LC stereo units; frame `i` carries `payload_len` bytes of `i`
pub fn adts_stream(frequency_index: u8, frames: usize, payload_len: usize) -> Vec<u8> {
    (0..frames)
        .flat_map(|i| AdtsUnit::new(frequency_index, 2, vec![i as u8; payload_len]).to_bytes())
        .collect()
}

/// Write [`adts_stream`] to `dir/name`
pub fn write_adts_file(
    dir: &std::path::Path,
    name: &str,
    frequency_index: u8,
    frames: usize,
    payload_len: usize,
) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, adts_stream(frequency_index, frames, payload_len)).unwrap();
    path
}

/// 16-bit PCM WAV with a ramp signal
pub fn write_wav(path: &std::path::Path, channels: u16, sample_rate: u32, frames: u32) {
    let block_align = channels * 2;
    let data_len = frames * u32::from(block_align);

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for frame in 0..frames {
        for _ in 0..channels {
            out.extend_from_slice(&((frame % 2000) as i16 - 1000).to_le_bytes());
        }
    }
    std::fs::write(path, out).unwrap();
}
