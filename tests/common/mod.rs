//! Shared fixtures: synthetic ADTS streams, WAV files and box lookup

#![allow(dead_code)]

use bitstream_io::{BigEndian, BitWrite, BitWriter};
use std::path::{Path, PathBuf};

/// ADTS sampling frequency index for 44.1 kHz
pub const FREQ_44100: u8 = 4;
/// ADTS sampling frequency index for 22.05 kHz
pub const FREQ_22050: u8 = 7;

/// One MPEG-4 AAC-LC ADTS frame without CRC, payload filled with `fill`
pub fn adts_frame(frequency_index: u8, channels: u8, payload_len: usize, fill: u8) -> Vec<u8> {
    let mut frame = Vec::with_capacity(7 + payload_len);
    {
        let mut w = BitWriter::endian(&mut frame, BigEndian);
        w.write_var::<u32>(12, 0xFFF).unwrap(); // syncword
        w.write_bit(false).unwrap(); // id: MPEG-4
        w.write_var::<u32>(2, 0).unwrap(); // layer
        w.write_bit(true).unwrap(); // protection_absent
        w.write_var::<u32>(2, 1).unwrap(); // profile: AAC LC
        w.write_var::<u32>(4, u32::from(frequency_index)).unwrap();
        w.write_bit(false).unwrap(); // private_bit
        w.write_var::<u32>(3, u32::from(channels)).unwrap();
        w.write_bit(false).unwrap(); // original_copy
        w.write_bit(false).unwrap(); // home
        w.write_bit(false).unwrap(); // copyright_identification_bit
        w.write_bit(false).unwrap(); // copyright_identification_start
        w.write_var::<u32>(13, (7 + payload_len) as u32).unwrap(); // frame_length
        w.write_var::<u32>(11, 0x7FF).unwrap(); // buffer_fullness
        w.write_var::<u32>(2, 0).unwrap(); // one raw data block
    }
    frame.resize(7 + payload_len, fill);
    frame
}

/// Write `frames` stereo frames at `frequency_index`; payload bytes count up
pub fn write_adts(dir: &Path, name: &str, frequency_index: u8, frames: usize) -> PathBuf {
    let bytes: Vec<u8> = (0..frames)
        .flat_map(|i| adts_frame(frequency_index, 2, 16 + i, i as u8))
        .collect();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// 16-bit PCM WAV with a ramp signal
pub fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: u32) {
    let block_align = channels * 2;
    let data_len = frames * u32::from(block_align);

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
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

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

pub fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

pub fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes(data[at..at + 4].try_into().unwrap())
}
