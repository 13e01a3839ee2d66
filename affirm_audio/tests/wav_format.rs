// tests/wav_format.rs

use affirm_audio::decoder::decode_bytes;
use affirm_audio::encoder::{encode, PcmHeader};
use affirm_audio::SampleBuffer;
use std::io::Cursor;

#[test]
fn header_matches_the_canonical_layout() {
    let buffer = SampleBuffer::new(vec![vec![0.5, -0.5]], 44_100).unwrap();
    let bytes = encode(&buffer).unwrap();

    assert_eq!(bytes.len(), 48);
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 40);
    assert_eq!(&bytes[8..16], b"WAVEfmt ");
    assert_eq!(
        PcmHeader::parse(&bytes),
        Some(PcmHeader {
            channels: 1,
            sample_rate: 44_100,
            data_size: 4,
        })
    );
    assert_eq!(i16::from_le_bytes([bytes[44], bytes[45]]), 16383);
    assert_eq!(i16::from_le_bytes([bytes[46], bytes[47]]), -16384);
}

#[test]
fn hound_reads_what_we_write() {
    let left: Vec<f32> = (0..500).map(|i| i as f32 / 500.0).collect();
    let right: Vec<f32> = left.iter().map(|s| -s).collect();
    let buffer = SampleBuffer::new(vec![left, right], 22_050).unwrap();

    let reader = hound::WavReader::new(Cursor::new(encode(&buffer).unwrap())).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 22_050);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.duration(), 500);
}

#[test]
fn samples_survive_encode_and_decode() {
    let samples: Vec<f32> = (0..2_000).map(|i| ((i as f32) * 0.37).sin() * 0.9).collect();
    let buffer = SampleBuffer::new(vec![samples.clone()], 16_000).unwrap();

    let decoded = decode_bytes(&encode(&buffer).unwrap(), Some("wav")).unwrap();
    assert_eq!(decoded.frame_count(), samples.len());
    for (a, b) in samples.iter().zip(decoded.channel(0).unwrap()) {
        assert!((a - b).abs() <= 1.0 / 32767.0 + 1e-6, "{a} vs {b}");
    }
}
