// src/trim/mod.rs

mod window;

pub use window::{TrimHandle, TrimWindow};

use crate::buffer::SampleBuffer;
use crate::config::TrimConfig;
use crate::encoder::{encode, extract_range, EncodeError, RangeError, WAV_MIME};
use crate::resource::{ResourceStore, ResourceUrl};
use crate::waveform::{RenderMode, RenderTarget, WaveformRenderer};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging(TrimHandle),
}

#[derive(Debug, Error)]
pub enum TrimError {
    #[error("no audio loaded")]
    NoBuffer,
    #[error("audio is still loading")]
    Pending,
    #[error("loaded audio has no frames")]
    EmptyBuffer,
    #[error("trim window produced an invalid frame range")]
    Invariant(#[source] RangeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

#[derive(Debug, Clone)]
pub struct TrimOutcome {
    pub url: ResourceUrl,
    pub buffer: Arc<SampleBuffer>,
    pub start_frame: usize,
    pub end_frame: usize,
}

impl TrimOutcome {
    pub fn duration_secs(&self) -> f64 {
        self.buffer.duration_secs()
    }
}

type TrimHook = Box<dyn FnMut(&ResourceUrl) + Send>;

/// Pointer-driven trim handles over one loaded clip.
pub struct TrimController {
    renderer: WaveformRenderer,
    settings: TrimConfig,
    target: Box<dyn RenderTarget + Send>,
    buffer: Option<Arc<SampleBuffer>>,
    window: TrimWindow,
    drag: DragState,
    playback_position: Option<f32>,
    issued: Option<ResourceUrl>,
    on_trim_complete: Option<TrimHook>,
}

impl TrimController {
    pub fn new(
        renderer: WaveformRenderer,
        settings: TrimConfig,
        target: impl RenderTarget + Send + 'static,
    ) -> Self {
        Self {
            renderer,
            settings,
            target: Box::new(target),
            buffer: None,
            window: TrimWindow::full(),
            drag: DragState::Idle,
            playback_position: None,
            issued: None,
            on_trim_complete: None,
        }
    }

    pub fn on_trim_complete(&mut self, hook: impl FnMut(&ResourceUrl) + Send + 'static) {
        self.on_trim_complete = Some(Box::new(hook));
    }

    /// Start editing a new clip. Earlier trim results now belong to the caller.
    pub fn load(&mut self, buffer: Arc<SampleBuffer>) {
        self.buffer = Some(buffer);
        self.issued = None;
        self.window = TrimWindow::full();
        self.drag = DragState::Idle;
        self.redraw();
    }

    pub fn buffer(&self) -> Option<&Arc<SampleBuffer>> {
        self.buffer.as_ref()
    }

    pub fn window(&self) -> TrimWindow {
        self.window
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn playback_position(&self) -> Option<f32> {
        self.playback_position
    }

    /// Url of the most recent committed trim, if any.
    pub fn last_issued(&self) -> Option<&ResourceUrl> {
        self.issued.as_ref()
    }

    /// Which handle a press at `x` grabs. When both are within reach the nearer wins.
    pub fn hit_test(&self, x: f32) -> Option<TrimHandle> {
        let margin = self.settings.hit_margin_px;
        let distance =
            |handle: TrimHandle| (x - self.renderer.percent_to_x(self.window.edge(handle))).abs();
        let (d_start, d_end) = (distance(TrimHandle::Start), distance(TrimHandle::End));

        match (d_start < margin, d_end < margin) {
            (true, true) if d_end < d_start => Some(TrimHandle::End),
            (true, _) => Some(TrimHandle::Start),
            (false, true) => Some(TrimHandle::End),
            (false, false) => None,
        }
    }

    pub fn pointer_down(&mut self, x: f32) -> Option<TrimHandle> {
        self.buffer.as_ref()?;
        let handle = self.hit_test(x)?;
        self.drag = DragState::Dragging(handle);
        Some(handle)
    }

    /// Returns whether the window moved.
    pub fn pointer_move(&mut self, x: f32) -> bool {
        let percent = self.renderer.x_to_percent(x);
        self.drag_to_percent(percent)
    }

    pub fn pointer_up(&mut self) {
        self.drag = DragState::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Press on `handle`, move it to `percent` and release.
    pub fn drag_to(&mut self, handle: TrimHandle, percent: f64) -> bool {
        let x = self.renderer.percent_to_x(self.window.edge(handle));
        if self.pointer_down(x) != Some(handle) {
            self.pointer_up();
            return false;
        }
        let moved = self.drag_to_percent(percent);
        self.pointer_up();
        moved
    }

    fn drag_to_percent(&mut self, percent: f64) -> bool {
        let DragState::Dragging(handle) = self.drag else {
            return false;
        };
        let moved = self
            .window
            .drag(handle, percent, self.settings.min_gap_percent);
        if moved {
            self.redraw();
        }
        moved
    }

    pub fn set_playback_position(&mut self, position: Option<f32>) {
        if self.playback_position != position {
            self.playback_position = position;
            self.redraw();
        }
    }

    pub fn reset(&mut self) {
        self.window = TrimWindow::full();
        self.drag = DragState::Idle;
        self.redraw();
    }

    /// Encode the selected range into a new WAV resource and make it the loaded clip.
    pub fn apply_trim(&mut self, store: &ResourceStore) -> Result<TrimOutcome, TrimError> {
        let buffer = self.buffer.clone().ok_or(TrimError::NoBuffer)?;
        let (start_frame, end_frame) = self
            .window
            .frame_range(buffer.frame_count())
            .ok_or(TrimError::EmptyBuffer)?;

        let trimmed = extract_range(&buffer, start_frame, end_frame).map_err(|e| {
            log::error!("trim window {:?} broke the frame range: {e}", self.window);
            TrimError::Invariant(e)
        })?;
        let url = store.create(encode(&trimmed)?, WAV_MIME);
        if let Some(previous) = self.issued.replace(url.clone()) {
            store.revoke(&previous);
        }

        let trimmed = Arc::new(trimmed);
        log::info!(
            "trimmed frames {start_frame}..{end_frame} ({:.2}s) into {url}",
            trimmed.duration_secs()
        );
        self.buffer = Some(trimmed.clone());
        self.reset();
        if let Some(hook) = self.on_trim_complete.as_mut() {
            hook(&url);
        }

        Ok(TrimOutcome {
            url,
            buffer: trimmed,
            start_frame,
            end_frame,
        })
    }

    pub fn redraw(&mut self) {
        let Some(buffer) = self.buffer.as_ref() else {
            return;
        };
        let raster = self.renderer.render(
            buffer,
            RenderMode::Full {
                window: self.window,
            },
            self.playback_position,
        );
        self.target.present(&raster);
    }
}
