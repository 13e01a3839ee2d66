// src/decoder/wav.rs

use crate::buffer::SampleBuffer;
use crate::encoder::dequantize;
use hound::{SampleFormat, WavReader};
use std::io::Cursor;

pub(super) fn is_riff_wave(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Integer PCM is mapped back with the same asymmetric scale the encoder uses,
/// so 16-bit files written by us decode to within one step of the source.
pub(super) fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer, hound::Error> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(dequantize))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits @ 1..=32) => {
            let negative_scale = (1i64 << (bits - 1)) as f32;
            let positive_scale = ((1i64 << (bits - 1)) - 1).max(1) as f32;
            reader
                .samples::<i32>()
                .map(|s| {
                    s.map(|v| {
                        if v < 0 {
                            v as f32 / negative_scale
                        } else {
                            v as f32 / positive_scale
                        }
                    })
                })
                .collect::<Result<_, _>>()?
        }
        _ => return Err(hound::Error::Unsupported),
    };

    SampleBuffer::from_interleaved(&interleaved, spec.channels as usize, spec.sample_rate)
        .map_err(|_| hound::Error::FormatError("wav header describes an empty layout"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_bit_pcm_scales_to_unit_range() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 8,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in [-128i8, 0, 127] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        let buffer = decode_wav(cursor.get_ref()).unwrap();
        assert_eq!(buffer.channels()[0], vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn riff_sniffing() {
        assert!(is_riff_wave(b"RIFF\0\0\0\0WAVEfmt "));
        assert!(!is_riff_wave(b"RIFF\0\0\0\0AVI "));
        assert!(!is_riff_wave(b"ID3"));
    }
}
