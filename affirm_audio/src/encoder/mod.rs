// src/encoder/mod.rs

pub mod header;

pub use header::{PcmHeader, WAV_HEADER_LEN};

use crate::buffer::SampleBuffer;
use thiserror::Error;

pub const WAV_MIME: &str = "audio/wav";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("empty or inverted frame range {start}..{end}")]
    Inverted { start: usize, end: usize },
    #[error("frame range {start}..{end} exceeds buffer of {frames} frames")]
    OutOfBounds {
        start: usize,
        end: usize,
        frames: usize,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{channels} channels do not fit a WAV header")]
    TooManyChannels { channels: usize },
    #[error("{bytes} bytes of PCM data do not fit a WAV header")]
    TooLarge { bytes: u64 },
    #[error("{channels} channels at {sample_rate} Hz overflow the WAV byte rate")]
    ByteRateOverflow { channels: u16, sample_rate: u32 },
}

/// Copy frames `[start, end)` of every channel into a new buffer.
pub fn extract_range(
    buffer: &SampleBuffer,
    start: usize,
    end: usize,
) -> Result<SampleBuffer, RangeError> {
    let frames = buffer.frame_count();
    if start >= end {
        return Err(RangeError::Inverted { start, end });
    }
    if end > frames {
        return Err(RangeError::OutOfBounds { start, end, frames });
    }

    let channels = buffer
        .channels()
        .iter()
        .map(|samples| samples[start..end].to_vec())
        .collect();
    Ok(SampleBuffer::from_validated(channels, buffer.sample_rate()))
}

/// Float to signed 16-bit: negative side scales by 32768, the rest by 32767.
pub fn quantize(sample: f32) -> i16 {
    if !sample.is_finite() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Inverse of [`quantize`], used by the decoder for 16-bit PCM.
pub fn dequantize(sample: i16) -> f32 {
    if sample < 0 {
        sample as f32 / 32768.0
    } else {
        sample as f32 / 32767.0
    }
}

/// Serialise the whole buffer as a 16-bit PCM WAV file.
pub fn encode(buffer: &SampleBuffer) -> Result<Vec<u8>, EncodeError> {
    let channels = buffer.channel_count();
    let channel_count = u16::try_from(channels)
        .ok()
        .filter(|c| c.checked_mul(2).is_some())
        .ok_or(EncodeError::TooManyChannels { channels })?;

    let data_bytes = buffer.frame_count() as u64 * channels as u64 * 2;
    let data_size = u32::try_from(data_bytes)
        .ok()
        .filter(|size| size.checked_add(36).is_some())
        .ok_or(EncodeError::TooLarge { bytes: data_bytes })?;

    let header = PcmHeader {
        channels: channel_count,
        sample_rate: buffer.sample_rate(),
        data_size,
    };
    let header_bytes = header.to_bytes().ok_or(EncodeError::ByteRateOverflow {
        channels: channel_count,
        sample_rate: header.sample_rate,
    })?;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_size as usize);
    out.extend_from_slice(&header_bytes);
    for frame in 0..buffer.frame_count() {
        for samples in buffer.channels() {
            out.extend_from_slice(&quantize(samples[frame]).to_le_bytes());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(samples: &[f32]) -> SampleBuffer {
        SampleBuffer::new(vec![samples.to_vec()], 44_100).unwrap()
    }

    #[test]
    fn quantize_is_asymmetric_and_truncating() {
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(-1.0), -32768);
        assert_eq!(quantize(0.5), 16383);
        assert_eq!(quantize(-0.5), -16384);
        assert_eq!(quantize(2.5), 32767);
        assert_eq!(quantize(-7.0), -32768);
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(f32::NAN), 0);
    }

    #[test]
    fn dequantize_inverts_extremes() {
        assert_eq!(dequantize(32767), 1.0);
        assert_eq!(dequantize(-32768), -1.0);
        assert_eq!(dequantize(0), 0.0);
    }

    #[test]
    fn header_and_payload_for_half_scale_pair() {
        let bytes = encode(&mono(&[0.5, -0.5])).unwrap();
        assert_eq!(bytes.len(), 48);

        let expected_header: [u8; 44] = [
            b'R', b'I', b'F', b'F', 40, 0, 0, 0, b'W', b'A', b'V', b'E', b'f', b'm', b't', b' ',
            16, 0, 0, 0, 1, 0, 1, 0, 0x44, 0xAC, 0, 0, 0x88, 0x58, 0x01, 0, 2, 0, 16, 0, b'd',
            b'a', b't', b'a', 4, 0, 0, 0,
        ];
        assert_eq!(&bytes[..44], &expected_header);
        assert_eq!(i16::from_le_bytes([bytes[44], bytes[45]]), 16383);
        assert_eq!(i16::from_le_bytes([bytes[46], bytes[47]]), -16384);
    }

    #[test]
    fn stereo_samples_are_interleaved() {
        let buffer = SampleBuffer::new(vec![vec![1.0, 0.0], vec![-1.0, 0.25]], 8_000).unwrap();
        let bytes = encode(&buffer).unwrap();
        let samples: Vec<i16> = bytes[44..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples, vec![32767, -32768, 0, 8191]);
    }

    #[test]
    fn empty_buffer_encodes_bare_header() {
        let bytes = encode(&mono(&[])).unwrap();
        assert_eq!(bytes.len(), WAV_HEADER_LEN);
        assert_eq!(PcmHeader::parse(&bytes).map(|h| h.data_size), Some(0));
    }

    #[test]
    fn huge_sample_rate_is_rejected_not_panicking() {
        let buffer = SampleBuffer::new(vec![vec![0.0; 1]], 3_000_000_000).unwrap();
        assert_eq!(
            encode(&buffer),
            Err(EncodeError::ByteRateOverflow {
                channels: 1,
                sample_rate: 3_000_000_000
            })
        );
    }

    #[test]
    fn extract_range_bounds() {
        let buffer = mono(&[0.0, 0.1, 0.2, 0.3, 0.4]);

        let slice = extract_range(&buffer, 1, 4).unwrap();
        assert_eq!(slice.channel(0), Some(&[0.1, 0.2, 0.3][..]));
        assert_eq!(slice.sample_rate(), 44_100);

        assert_eq!(extract_range(&buffer, 0, 5).unwrap(), buffer);
        assert_eq!(
            extract_range(&buffer, 3, 3),
            Err(RangeError::Inverted { start: 3, end: 3 })
        );
        assert_eq!(
            extract_range(&buffer, 4, 2),
            Err(RangeError::Inverted { start: 4, end: 2 })
        );
        assert_eq!(
            extract_range(&buffer, 2, 6),
            Err(RangeError::OutOfBounds {
                start: 2,
                end: 6,
                frames: 5
            })
        );
    }
}
