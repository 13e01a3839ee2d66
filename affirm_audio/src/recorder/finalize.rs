// src/recorder/finalize.rs

use super::CaptureFormat;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// Write captured chunks as a 32-bit float WAV held in memory.
/// Returns the file bytes and the number of whole frames written.
pub fn encode_chunks(
    chunks: &[Vec<f32>],
    format: CaptureFormat,
) -> Result<(Vec<u8>, usize), hound::Error> {
    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let channels = format.channels.max(1) as usize;

    let total: usize = chunks.iter().map(Vec::len).sum();
    // A chunk boundary may split a frame; drop a dangling partial frame at the end.
    let whole = total - total % channels;

    let mut cursor = Cursor::new(Vec::with_capacity(64 + whole * 4));
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for &s in chunks.iter().flatten().take(whole) {
        writer.write_sample(if s.is_finite() { s } else { 0.0 })?;
    }
    writer.finalize()?;

    Ok((cursor.into_inner(), whole / channels))
}
