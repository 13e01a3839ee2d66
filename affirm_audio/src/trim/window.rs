// src/trim/window.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimHandle {
    Start,
    End,
}

/// Selected region as percentages of the clip, `0 <= start < end <= 100`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    start: f64,
    end: f64,
}

impl Default for TrimWindow {
    fn default() -> Self {
        Self::full()
    }
}

impl TrimWindow {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 100.0;

    pub fn full() -> Self {
        Self {
            start: Self::MIN,
            end: Self::MAX,
        }
    }

    /// `None` unless the edges are in range and at least `min_gap` apart.
    pub fn new(start: f64, end: f64, min_gap: f64) -> Option<Self> {
        let valid = start >= Self::MIN && end <= Self::MAX && end - start >= min_gap;
        valid.then_some(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn edge(&self, handle: TrimHandle) -> f64 {
        match handle {
            TrimHandle::Start => self.start,
            TrimHandle::End => self.end,
        }
    }

    pub fn is_full(&self) -> bool {
        self.start == Self::MIN && self.end == Self::MAX
    }

    /// Move one edge toward `target`, stopping `min_gap` short of the other edge.
    /// Returns whether the window changed.
    pub fn drag(&mut self, handle: TrimHandle, target: f64, min_gap: f64) -> bool {
        if target.is_nan() {
            return false;
        }
        let target = target.clamp(Self::MIN, Self::MAX);
        let (edge, value) = match handle {
            TrimHandle::Start => (&mut self.start, target.min(self.end - min_gap).max(Self::MIN)),
            TrimHandle::End => (&mut self.end, target.max(self.start + min_gap).min(Self::MAX)),
        };
        if *edge == value {
            return false;
        }
        *edge = value;
        true
    }

    /// Frame indices `[start, end)` for a clip of `frame_count` frames, floored.
    /// Never empty for a non-empty clip.
    pub fn frame_range(&self, frame_count: usize) -> Option<(usize, usize)> {
        if frame_count == 0 {
            return None;
        }
        let n = frame_count as f64;
        let start = ((self.start * n / 100.0).floor() as usize).min(frame_count - 1);
        let end = ((self.end * n / 100.0).floor() as usize)
            .max(start + 1)
            .min(frame_count);
        Some((start, end))
    }
}
