// src/waveform/mod.rs
pub mod raster;
pub mod terminal;

pub use raster::{DrawCommand, Raster, RenderTarget};

use crate::buffer::SampleBuffer;
use crate::config::StudioConfig;
use crate::trim::{TrimHandle, TrimWindow};

/// Min/max of the source frames that fall into one pixel column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeColumn {
    pub min: f32,
    pub max: f32,
}

/// `width` columns of `ceil(len / width)` samples each. Columns past the end
/// of the data are `None`.
pub fn compute_envelope(samples: &[f32], width: usize) -> Vec<Option<EnvelopeColumn>> {
    if width == 0 {
        return Vec::new();
    }
    if samples.is_empty() {
        return vec![None; width];
    }
    let step = samples.len().div_ceil(width);

    (0..width)
        .map(|i| {
            let start = i * step;
            if start >= samples.len() {
                return None;
            }
            let end = (start + step).min(samples.len());
            let (min, max) = samples[start..end]
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| {
                    (lo.min(s), hi.max(s))
                });
            // all-NaN bins
            (min <= max).then_some(EnvelopeColumn { min, max })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderMode {
    /// Editing view: envelope, dim mask outside the window, handle bars.
    Full { window: TrimWindow },
    /// Playlist row thumbnail: envelope only.
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformRenderer {
    width: u32,
    height: u32,
    handle_width: f32,
}

impl WaveformRenderer {
    pub fn new(width: u32, height: u32, handle_width: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            handle_width: handle_width.max(0.0),
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(
            config.canvas.width,
            config.canvas.height,
            config.trim.handle_width_px,
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn handle_width(&self) -> f32 {
        self.handle_width
    }

    pub fn percent_to_x(&self, percent: f64) -> f32 {
        (percent / 100.0 * self.width as f64) as f32
    }

    pub fn x_to_percent(&self, x: f32) -> f64 {
        (x as f64 / self.width as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn render(
        &self,
        buffer: &SampleBuffer,
        mode: RenderMode,
        playback_position: Option<f32>,
    ) -> Raster {
        let w = self.width as f32;
        let h = self.height as f32;
        let mut commands = Vec::with_capacity(self.width as usize + 6);
        commands.push(DrawCommand::Background);

        // Channel 0 only; stereo files draw their left side.
        let samples = buffer.channel(0).unwrap_or_default();
        for (x, column) in compute_envelope(samples, self.width as usize)
            .into_iter()
            .enumerate()
        {
            if let Some(EnvelopeColumn { min, max }) = column {
                commands.push(DrawCommand::Segment {
                    x: x as u32,
                    y_from: (1.0 + min) * h / 2.0,
                    y_to: (1.0 + max) * h / 2.0,
                });
            }
        }

        if let RenderMode::Full { window } = mode {
            let start_x = self.percent_to_x(window.start());
            let end_x = self.percent_to_x(window.end());
            if start_x > 0.0 {
                commands.push(DrawCommand::Mask {
                    x: 0.0,
                    width: start_x,
                });
            }
            if end_x < w {
                commands.push(DrawCommand::Mask {
                    x: end_x,
                    width: w - end_x,
                });
            }
            for (handle, edge) in [(TrimHandle::Start, start_x), (TrimHandle::End, end_x)] {
                commands.push(DrawCommand::Handle {
                    handle,
                    x: edge - self.handle_width / 2.0,
                    width: self.handle_width,
                });
            }
        }

        if let Some(p) = playback_position.filter(|p| p.is_finite()) {
            commands.push(DrawCommand::Marker {
                x: p.clamp(0.0, 1.0) * w,
            });
        }

        Raster {
            width: self.width,
            height: self.height,
            commands,
        }
    }
}
