// src/buffer.rs

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("sample rate must be greater than zero")]
    ZeroSampleRate,
    #[error("a sample buffer needs at least one channel")]
    NoChannels,
    #[error("channel {channel} has {found} frames, expected {expected}")]
    RaggedChannels {
        channel: usize,
        expected: usize,
        found: usize,
    },
}

/// Decoded, immutable PCM audio. Channels are stored planar.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, BufferError> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }
        let Some(first) = channels.first() else {
            return Err(BufferError::NoChannels);
        };
        let expected = first.len();
        if let Some((channel, found)) = channels
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != expected)
        {
            return Err(BufferError::RaggedChannels {
                channel,
                expected,
                found,
            });
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Split interleaved samples into channels. A trailing partial frame is dropped.
    pub fn from_interleaved(
        samples: &[f32],
        channels: usize,
        sample_rate: u32,
    ) -> Result<Self, BufferError> {
        if channels == 0 {
            return Err(BufferError::NoChannels);
        }
        let frames = samples.len() / channels;
        let mut planar = vec![Vec::with_capacity(frames); channels];
        append_interleaved_to_planar(&samples[..frames * channels], &mut planar, channels);
        Self::new(planar, sample_rate)
    }

    /// Caller guarantees the shape: at least one channel, equal lengths, non-zero rate.
    pub(crate) fn from_validated(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        debug_assert!(sample_rate > 0 && !channels.is_empty());
        Self {
            channels,
            sample_rate,
        }
    }

    pub fn silent(channels: usize, frames: usize, sample_rate: u32) -> Result<Self, BufferError> {
        Self::new(vec![vec![0.0; frames]; channels], sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn interleaved(&self) -> Vec<f32> {
        interleave(&self.channels)
    }
}

pub(crate) fn append_interleaved_to_planar(
    interleaved: &[f32],
    planar: &mut [Vec<f32>],
    channels: usize,
) {
    for row in interleaved.chunks_exact(channels) {
        for (ch, &s) in row.iter().enumerate() {
            planar[ch].push(s);
        }
    }
}

pub(crate) fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let channels = planar.len();
    if channels == 0 {
        return Vec::new();
    }
    let frames = planar[0].len();
    let mut out = vec![0.0f32; frames * channels];
    for (ch, samples) in planar.iter().enumerate() {
        for (f, &s) in samples.iter().enumerate() {
            out[f * channels + ch] = s;
        }
    }
    out
}
