// src/encoder/header.rs

pub const WAV_HEADER_LEN: usize = 44;

const PCM_FORMAT_TAG: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const FMT_CHUNK_LEN: u32 = 16;

/// Canonical 16-bit PCM RIFF/WAVE header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub data_size: u32,
}

impl PcmHeader {
    /// `None` when the channel count cannot be expressed as a 16-bit block size.
    pub fn block_align(&self) -> Option<u16> {
        self.channels.checked_mul(BITS_PER_SAMPLE / 8)
    }

    pub fn byte_rate(&self) -> Option<u32> {
        self.sample_rate.checked_mul(u32::from(self.block_align()?))
    }

    /// `None` when a derived field (byte rate, block align, RIFF size) overflows.
    pub fn to_bytes(&self) -> Option<[u8; WAV_HEADER_LEN]> {
        let riff_size = self.data_size.checked_add(36)?;
        let byte_rate = self.byte_rate()?;
        let block_align = self.block_align()?;

        let mut out = [0u8; WAV_HEADER_LEN];
        let mut at = 0usize;
        let mut put = |bytes: &[u8]| {
            out[at..at + bytes.len()].copy_from_slice(bytes);
            at += bytes.len();
        };

        put(b"RIFF");
        put(&riff_size.to_le_bytes());
        put(b"WAVE");
        put(b"fmt ");
        put(&FMT_CHUNK_LEN.to_le_bytes());
        put(&PCM_FORMAT_TAG.to_le_bytes());
        put(&self.channels.to_le_bytes());
        put(&self.sample_rate.to_le_bytes());
        put(&byte_rate.to_le_bytes());
        put(&block_align.to_le_bytes());
        put(&BITS_PER_SAMPLE.to_le_bytes());
        put(b"data");
        put(&self.data_size.to_le_bytes());
        Some(out)
    }

    /// Parse the canonical layout written by [`PcmHeader::to_bytes`].
    /// Anything else (extra chunks, other formats) yields `None`.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..WAV_HEADER_LEN)?;
        let u16_at = |i: usize| u16::from_le_bytes([header[i], header[i + 1]]);
        let u32_at = |i: usize| {
            u32::from_le_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]])
        };

        if &header[0..4] != b"RIFF"
            || &header[8..12] != b"WAVE"
            || &header[12..16] != b"fmt "
            || &header[36..40] != b"data"
        {
            return None;
        }
        if u32_at(16) != FMT_CHUNK_LEN || u16_at(20) != PCM_FORMAT_TAG || u16_at(34) != BITS_PER_SAMPLE
        {
            return None;
        }

        let parsed = Self {
            channels: u16_at(22),
            sample_rate: u32_at(24),
            data_size: u32_at(40),
        };
        let consistent = Some(u32_at(4)) == parsed.data_size.checked_add(36)
            && Some(u32_at(28)) == parsed.byte_rate()
            && Some(u16_at(32)) == parsed.block_align();
        consistent.then_some(parsed)
    }
}
