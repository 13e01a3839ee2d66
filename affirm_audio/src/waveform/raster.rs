// src/waveform/raster.rs

use crate::trim::TrimHandle;

/// One drawing instruction, in canvas pixel space (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    Background,
    /// Vertical envelope line for column `x`.
    Segment { x: u32, y_from: f32, y_to: f32 },
    /// Dimmed region outside the trim window.
    Mask { x: f32, width: f32 },
    /// Trim handle bar; `x` is the left edge.
    Handle { handle: TrimHandle, x: f32, width: f32 },
    /// Playback position line.
    Marker { x: f32 },
}

/// A finished frame: everything needed to paint one W x H canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub commands: Vec<DrawCommand>,
}

impl Raster {
    pub fn segments(&self) -> impl Iterator<Item = (u32, f32, f32)> + '_ {
        self.commands.iter().filter_map(|c| match *c {
            DrawCommand::Segment { x, y_from, y_to } => Some((x, y_from, y_to)),
            _ => None,
        })
    }

    pub fn handles(&self) -> impl Iterator<Item = (TrimHandle, f32, f32)> + '_ {
        self.commands.iter().filter_map(|c| match *c {
            DrawCommand::Handle { handle, x, width } => Some((handle, x, width)),
            _ => None,
        })
    }

    pub fn masks(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.commands.iter().filter_map(|c| match *c {
            DrawCommand::Mask { x, width } => Some((x, width)),
            _ => None,
        })
    }

    pub fn marker(&self) -> Option<f32> {
        self.commands.iter().find_map(|c| match *c {
            DrawCommand::Marker { x } => Some(x),
            _ => None,
        })
    }
}

/// Anything that can show a raster: a text canvas, a test probe, a GUI surface.
pub trait RenderTarget {
    fn present(&mut self, raster: &Raster);
}

impl<F> RenderTarget for F
where
    F: FnMut(&Raster),
{
    fn present(&mut self, raster: &Raster) {
        self(raster)
    }
}
