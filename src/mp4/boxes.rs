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


//! ISO-BMFF box builders
//!
//! Every box is assembled in memory: the payload is written first, then
//! prefixed with its 32-bit size and four-character type. Only `mdat` is
//! streamed to disk and gets its size patched afterwards.

use crate::audio::asc::AudioSpecificConfig;

pub type FourCc = [u8; 4];

/// Sample table of one track
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    pub sizes: Vec<u32>,
    /// One chunk per sample
    pub offsets: Vec<u64>,
    /// Run-length (count, delta) pairs
    pub deltas: Vec<(u32, u32)>,
    pub duration: u64,
}

impl SampleTable {
    pub fn push(&mut self, size: u32, offset: u64, delta: u32) {
        self.sizes.push(size);
        self.offsets.push(offset);
        match self.deltas.last_mut() {
            Some((count, last)) if *last == delta => *count += 1,
            _ => self.deltas.push((1, delta)),
        }
        self.duration += u64::from(delta);
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.sizes.iter().map(|&s| u64::from(s)).sum()
    }
}

/// Append `kind` with the payload produced by `build`
pub fn write_box<F>(out: &mut Vec<u8>, kind: &FourCc, build: F)
where
    F: FnOnce(&mut Vec<u8>),
{
    let start = out.len();
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(kind);
    build(out);
    let size = (out.len() - start) as u32;
    out[start..start + 4].copy_from_slice(&size.to_be_bytes());
}

/// Version and 24-bit flags of a full box
pub fn full_box(out: &mut Vec<u8>, version: u8, flags: u32) {
    out.push(version);
    out.extend_from_slice(&flags.to_be_bytes()[1..]);
}

fn matrix(out: &mut Vec<u8>) {
    for value in [0x0001_0000u32, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000] {
        out.extend_from_slice(&value.to_be_bytes());
    }
}

/// Durations beyond 32 bits need version 1 headers
fn needs_v1(duration: u64) -> bool {
    duration > u64::from(u32::MAX)
}

fn times_and_duration(out: &mut Vec<u8>, v1: bool, before_duration: &[u8], duration: u64) {
    if v1 {
        out.extend_from_slice(&0u64.to_be_bytes()); // creation time
        out.extend_from_slice(&0u64.to_be_bytes()); // modification time
        out.extend_from_slice(before_duration);
        out.extend_from_slice(&duration.to_be_bytes());
    } else {
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(before_duration);
        out.extend_from_slice(&(duration as u32).to_be_bytes());
    }
}

pub fn write_ftyp(out: &mut Vec<u8>, major: &FourCc, compatible: &[FourCc]) {
    write_box(out, b"ftyp", |data| {
        data.extend_from_slice(major);
        data.extend_from_slice(&0u32.to_be_bytes()); // minor version
        for brand in compatible {
            data.extend_from_slice(brand);
        }
    });
}

pub fn write_mvhd(out: &mut Vec<u8>, time_scale: u32, duration: u64, next_track_id: u32) {
    let v1 = needs_v1(duration);
    write_box(out, b"mvhd", |data| {
        full_box(data, u8::from(v1), 0);
        times_and_duration(data, v1, &time_scale.to_be_bytes(), duration);
        data.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // rate (1.0)
        data.extend_from_slice(&0x0100u16.to_be_bytes()); // volume (1.0)
        data.extend_from_slice(&[0; 10]); // reserved
        matrix(data);
        data.extend_from_slice(&[0; 24]); // pre_defined
        data.extend_from_slice(&next_track_id.to_be_bytes());
    });
}

/// Track header
///
/// Flags per ISO 14496-12 §8.3.2: 0x1 enabled, 0x2 in movie, 0x4 in preview,
/// 0x8 size is aspect ratio.
pub fn write_tkhd(out: &mut Vec<u8>, track_id: u32, flags: u32, duration: u64, audio: bool) {
    let v1 = needs_v1(duration);
    write_box(out, b"tkhd", |data| {
        full_box(data, u8::from(v1), flags);
        let mut id_and_reserved = Vec::with_capacity(8);
        id_and_reserved.extend_from_slice(&track_id.to_be_bytes());
        id_and_reserved.extend_from_slice(&0u32.to_be_bytes());
        times_and_duration(data, v1, &id_and_reserved, duration);
        data.extend_from_slice(&[0; 8]); // reserved
        data.extend_from_slice(&0u16.to_be_bytes()); // layer
        data.extend_from_slice(&u16::from(audio).to_be_bytes()); // alternate group
        data.extend_from_slice(&(if audio { 0x0100u16 } else { 0 }).to_be_bytes()); // volume
        data.extend_from_slice(&0u16.to_be_bytes()); // reserved
        matrix(data);
        data.extend_from_slice(&0u32.to_be_bytes()); // width
        data.extend_from_slice(&0u32.to_be_bytes()); // height
    });
}

/// Pack an ISO 639-2/T code into the 15-bit mdhd form
pub fn pack_language(code: &str) -> Option<u16> {
    let bytes = code.as_bytes();
    if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_lowercase()) {
        return None;
    }
    Some(bytes.iter().fold(0u16, |acc, &b| (acc << 5) | u16::from(b - 0x60)))
}

/// "und"
pub const LANGUAGE_UNDETERMINED: u16 = 0x55C4;

pub fn write_mdhd(out: &mut Vec<u8>, time_scale: u32, duration: u64, language: u16) {
    let v1 = needs_v1(duration);
    write_box(out, b"mdhd", |data| {
        full_box(data, u8::from(v1), 0);
        times_and_duration(data, v1, &time_scale.to_be_bytes(), duration);
        data.extend_from_slice(&language.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes()); // pre_defined
    });
}

pub fn write_hdlr(out: &mut Vec<u8>, handler_type: &FourCc, name: &str) {
    write_box(out, b"hdlr", |data| {
        full_box(data, 0, 0);
        data.extend_from_slice(&0u32.to_be_bytes()); // pre_defined
        data.extend_from_slice(handler_type);
        data.extend_from_slice(&[0; 12]); // reserved
        data.extend_from_slice(name.as_bytes());
        data.push(0);
    });
}

pub fn write_smhd(out: &mut Vec<u8>) {
    write_box(out, b"smhd", |data| {
        full_box(data, 0, 0);
        data.extend_from_slice(&0u16.to_be_bytes()); // balance
        data.extend_from_slice(&0u16.to_be_bytes()); // reserved
    });
}

/// Base media header used by QuickTime text tracks
pub fn write_gmhd(out: &mut Vec<u8>) {
    write_box(out, b"gmhd", |gmhd| {
        write_box(gmhd, b"gmin", |data| {
            full_box(data, 0, 0);
            data.extend_from_slice(&0x0040u16.to_be_bytes()); // graphics mode (copy)
            for _ in 0..3 {
                data.extend_from_slice(&0x8000u16.to_be_bytes()); // opcolor
            }
            data.extend_from_slice(&0u16.to_be_bytes()); // balance
            data.extend_from_slice(&0u16.to_be_bytes()); // reserved
        });
        write_box(gmhd, b"text", matrix);
    });
}

pub fn write_dinf(out: &mut Vec<u8>) {
    write_box(out, b"dinf", |dinf| {
        write_box(dinf, b"dref", |dref| {
            full_box(dref, 0, 0);
            dref.extend_from_slice(&1u32.to_be_bytes()); // entry count
            write_box(dref, b"url ", |url| full_box(url, 0, 1)); // self-contained
        });
    });
}

/// Elementary stream descriptor carrying `config` as DecoderSpecificInfo
pub fn write_esds(out: &mut Vec<u8>, config: &[u8], avg_bitrate: u32) {
    let config_len = config.len() as u8;
    write_box(out, b"esds", |esds| {
        full_box(esds, 0, 0);

        // ES_Descriptor
        esds.push(0x03);
        esds.push(23 + config_len);
        esds.extend_from_slice(&0u16.to_be_bytes()); // ES_ID
        esds.push(0); // flags

        // DecoderConfigDescriptor
        esds.push(0x04);
        esds.push(15 + config_len);
        esds.push(0x40); // objectTypeIndication (MPEG-4 audio)
        esds.push(0x15); // streamType audio << 2 | reserved
        esds.extend_from_slice(&[0, 0, 0]); // bufferSizeDB
        esds.extend_from_slice(&avg_bitrate.to_be_bytes()); // maxBitrate
        esds.extend_from_slice(&avg_bitrate.to_be_bytes()); // avgBitrate

        // DecoderSpecificInfo
        esds.push(0x05);
        esds.push(config_len);
        esds.extend_from_slice(config);

        // SLConfigDescriptor
        esds.push(0x06);
        esds.push(1);
        esds.push(0x02);
    });
}

pub fn write_mp4a_stsd(out: &mut Vec<u8>, config: &[u8], sample_rate: u32, avg_bitrate: u32) {
    let channels = if config.len() >= 2 {
        AudioSpecificConfig::from_be_bytes([config[0], config[1]]).channel_config()
    } else {
        2
    };
    write_box(out, b"stsd", |stsd| {
        full_box(stsd, 0, 0);
        stsd.extend_from_slice(&1u32.to_be_bytes()); // entry count
        write_box(stsd, b"mp4a", |mp4a| {
            mp4a.extend_from_slice(&[0; 6]); // reserved
            mp4a.extend_from_slice(&1u16.to_be_bytes()); // data reference index
            mp4a.extend_from_slice(&[0; 8]); // reserved
            mp4a.extend_from_slice(&u16::from(channels).to_be_bytes());
            mp4a.extend_from_slice(&16u16.to_be_bytes()); // sample size (bits)
            mp4a.extend_from_slice(&0u16.to_be_bytes()); // pre_defined
            mp4a.extend_from_slice(&0u16.to_be_bytes()); // reserved
            // 16.16 fixed point; rates above 65535 do not fit
            let rate = if sample_rate <= 0xFFFF { sample_rate << 16 } else { 0 };
            mp4a.extend_from_slice(&rate.to_be_bytes());
            write_esds(mp4a, config, avg_bitrate);
        });
    });
}

/// QuickTime text sample description for chapter titles
pub fn write_text_stsd(out: &mut Vec<u8>) {
    write_box(out, b"stsd", |stsd| {
        full_box(stsd, 0, 0);
        stsd.extend_from_slice(&1u32.to_be_bytes());
        write_box(stsd, b"text", |text| {
            text.extend_from_slice(&[0; 6]); // reserved
            text.extend_from_slice(&1u16.to_be_bytes()); // data reference index
            text.extend_from_slice(&0u32.to_be_bytes()); // display flags
            text.extend_from_slice(&1u32.to_be_bytes()); // text justification
            text.extend_from_slice(&[0; 6]); // background color
            text.extend_from_slice(&[0; 8]); // default text box
            text.extend_from_slice(&[0; 8]); // reserved
            text.extend_from_slice(&0u16.to_be_bytes()); // font number
            text.extend_from_slice(&0u16.to_be_bytes()); // font face
            text.push(0); // reserved
            text.extend_from_slice(&0u16.to_be_bytes()); // reserved
            text.extend_from_slice(&[0; 6]); // foreground color
            text.push(0); // empty font name
        });
    });
}

/// Chapter title sample: length-prefixed UTF-8 plus an encoding atom
pub fn text_sample(title: &str) -> Vec<u8> {
    let bytes = title.as_bytes();
    let len = bytes.len().min(usize::from(u16::MAX));
    let mut sample = Vec::with_capacity(2 + len + 12);
    sample.extend_from_slice(&(len as u16).to_be_bytes());
    sample.extend_from_slice(&bytes[..len]);
    write_box(&mut sample, b"encd", |data| {
        data.extend_from_slice(&0x0000_0100u32.to_be_bytes()); // UTF-8
    });
    sample
}

pub fn write_stts(out: &mut Vec<u8>, deltas: &[(u32, u32)]) {
    write_box(out, b"stts", |data| {
        full_box(data, 0, 0);
        data.extend_from_slice(&(deltas.len() as u32).to_be_bytes());
        for &(count, delta) in deltas {
            data.extend_from_slice(&count.to_be_bytes());
            data.extend_from_slice(&delta.to_be_bytes());
        }
    });
}

pub fn write_stsc(out: &mut Vec<u8>) {
    write_box(out, b"stsc", |data| {
        full_box(data, 0, 0);
        data.extend_from_slice(&1u32.to_be_bytes()); // entry count
        data.extend_from_slice(&1u32.to_be_bytes()); // first chunk
        data.extend_from_slice(&1u32.to_be_bytes()); // samples per chunk
        data.extend_from_slice(&1u32.to_be_bytes()); // sample description index
    });
}

pub fn write_stsz(out: &mut Vec<u8>, sizes: &[u32]) {
    write_box(out, b"stsz", |data| {
        full_box(data, 0, 0);
        data.extend_from_slice(&0u32.to_be_bytes()); // sample size (0 = variable)
        data.extend_from_slice(&(sizes.len() as u32).to_be_bytes());
        for &size in sizes {
            data.extend_from_slice(&size.to_be_bytes());
        }
    });
}

/// `stco`, or `co64` once an offset no longer fits 32 bits
pub fn write_chunk_offsets(out: &mut Vec<u8>, offsets: &[u64]) {
    let wide = offsets.iter().any(|&o| o > u64::from(u32::MAX));
    let kind = if wide { b"co64" } else { b"stco" };
    write_box(out, kind, |data| {
        full_box(data, 0, 0);
        data.extend_from_slice(&(offsets.len() as u32).to_be_bytes());
        for &offset in offsets {
            if wide {
                data.extend_from_slice(&offset.to_be_bytes());
            } else {
                data.extend_from_slice(&(offset as u32).to_be_bytes());
            }
        }
    });
}

pub fn write_sample_tables(out: &mut Vec<u8>, table: &SampleTable) {
    write_stts(out, &table.deltas);
    write_stsc(out);
    write_stsz(out, &table.sizes);
    write_chunk_offsets(out, &table.offsets);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_size_prefix() {
        let mut out = Vec::new();
        write_box(&mut out, b"free", |data| data.extend_from_slice(&[1, 2, 3]));
        assert_eq!(out, vec![0, 0, 0, 11, b'f', b'r', b'e', b'e', 1, 2, 3]);
    }

    #[test]
    fn test_nested_boxes() {
        let mut out = Vec::new();
        write_box(&mut out, b"moov", |moov| {
            write_box(moov, b"udta", |_| {});
        });
        assert_eq!(&out[0..4], &16u32.to_be_bytes());
        assert_eq!(&out[8..12], &8u32.to_be_bytes());
        assert_eq!(&out[12..16], b"udta");
    }

    #[test]
    fn test_pack_language() {
        assert_eq!(pack_language("und"), Some(LANGUAGE_UNDETERMINED));
        assert_eq!(pack_language("eng"), Some(0x15C7));
        assert_eq!(pack_language("en"), None);
        assert_eq!(pack_language("ENG"), None);
    }

    #[test]
    fn test_sample_table_run_length() {
        let mut table = SampleTable::default();
        table.push(10, 100, 1024);
        table.push(11, 110, 1024);
        table.push(12, 121, 500);
        assert_eq!(table.deltas, vec![(2, 1024), (1, 500)]);
        assert_eq!(table.duration, 2548);
        assert_eq!(table.total_bytes(), 33);
    }

    #[test]
    fn test_text_sample() {
        let sample = text_sample("Intro");
        assert_eq!(&sample[0..2], &[0, 5]);
        assert_eq!(&sample[2..7], b"Intro");
        assert_eq!(&sample[11..15], b"encd");
        assert_eq!(sample.len(), 2 + 5 + 12);
    }

    #[test]
    fn test_esds_carries_config() {
        let mut out = Vec::new();
        write_esds(&mut out, &[0x12, 0x10], 64000);
        let pos = out.windows(4).position(|w| w == [0x05, 0x02, 0x12, 0x10]);
        assert!(pos.is_some());
    }

    #[test]
    fn test_wide_chunk_offsets() {
        let mut out = Vec::new();
        write_chunk_offsets(&mut out, &[8, u64::from(u32::MAX) + 1]);
        assert_eq!(&out[4..8], b"co64");
        let mut narrow = Vec::new();
        write_chunk_offsets(&mut narrow, &[8, 16]);
        assert_eq!(&narrow[4..8], b"stco");
    }
}
