// src/editor.rs

use crate::buffer::SampleBuffer;
use crate::decoder::{DecodeError, SampleDecoder};
use crate::resource::ResourceUrl;
use crate::trim::{TrimController, TrimError, TrimHandle, TrimOutcome, TrimWindow};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifies one load request; only the newest one may install its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Installed,
    /// A newer load was started before this one finished.
    Superseded,
}

struct EditorState {
    controller: TrimController,
    generation: u64,
    pending: Option<u64>,
}

/// Shared handle around a [`TrimController`] that serializes asynchronous
/// loads against pointer input. The lock is never held across an await.
#[derive(Clone)]
pub struct TrimEditor {
    state: Arc<Mutex<EditorState>>,
    decoder: SampleDecoder,
}

impl TrimEditor {
    pub fn new(controller: TrimController, decoder: SampleDecoder) -> Self {
        Self {
            state: Arc::new(Mutex::new(EditorState {
                controller,
                generation: 0,
                pending: None,
            })),
            decoder,
        }
    }

    fn lock(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin_load(&self) -> LoadTicket {
        let mut state = self.lock();
        state.generation += 1;
        state.pending = Some(state.generation);
        state.controller.pointer_up();
        LoadTicket(state.generation)
    }

    /// Install a decode result if `ticket` is still current.
    /// On failure the previous clip and window stay as they were.
    pub fn finish_load(
        &self,
        ticket: LoadTicket,
        result: Result<SampleBuffer, DecodeError>,
    ) -> Result<LoadOutcome, DecodeError> {
        let mut state = self.lock();
        if state.generation != ticket.0 {
            log::debug!("discarding load {} (current {})", ticket.0, state.generation);
            return Ok(LoadOutcome::Superseded);
        }
        state.pending = None;
        match result {
            Ok(buffer) => {
                state.controller.load(Arc::new(buffer));
                Ok(LoadOutcome::Installed)
            }
            Err(e) => {
                log::warn!("load failed, keeping the previous clip: {e}");
                Err(e)
            }
        }
    }

    pub async fn load(&self, url: &ResourceUrl) -> Result<LoadOutcome, DecodeError> {
        let ticket = self.begin_load();
        let result = self.decoder.decode(url).await;
        self.finish_load(ticket, result)
    }

    pub fn is_loading(&self) -> bool {
        self.lock().pending.is_some()
    }

    pub fn pointer_down(&self, x: f32) -> Option<TrimHandle> {
        let mut state = self.lock();
        if state.pending.is_some() {
            return None;
        }
        state.controller.pointer_down(x)
    }

    pub fn pointer_move(&self, x: f32) -> bool {
        let mut state = self.lock();
        state.pending.is_none() && state.controller.pointer_move(x)
    }

    pub fn pointer_up(&self) {
        self.lock().controller.pointer_up();
    }

    pub fn pointer_leave(&self) {
        self.lock().controller.pointer_leave();
    }

    pub fn drag_to(&self, handle: TrimHandle, percent: f64) -> bool {
        let mut state = self.lock();
        state.pending.is_none() && state.controller.drag_to(handle, percent)
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        if state.pending.is_none() {
            state.controller.reset();
        }
    }

    pub fn set_playback_position(&self, position: Option<f32>) {
        self.lock().controller.set_playback_position(position);
    }

    pub fn window(&self) -> TrimWindow {
        self.lock().controller.window()
    }

    pub fn commit(&self) -> Result<TrimOutcome, TrimError> {
        let mut state = self.lock();
        if state.pending.is_some() {
            return Err(TrimError::Pending);
        }
        state.controller.apply_trim(self.decoder.store())
    }

    pub fn with_controller<R>(&self, f: impl FnOnce(&mut TrimController) -> R) -> R {
        f(&mut self.lock().controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrimConfig;
    use crate::encoder::{encode, WAV_MIME};
    use crate::resource::ResourceStore;
    use crate::waveform::{Raster, WaveformRenderer};

    fn editor(store: &ResourceStore) -> TrimEditor {
        let controller = TrimController::new(
            WaveformRenderer::new(800, 150, 16.0),
            TrimConfig::default(),
            |_: &Raster| {},
        );
        TrimEditor::new(controller, SampleDecoder::new(store.clone()))
    }

    fn clip(frames: usize) -> SampleBuffer {
        SampleBuffer::new(vec![vec![0.2; frames]], 8_000).unwrap()
    }

    fn loaded_frames(editor: &TrimEditor) -> Option<usize> {
        editor.with_controller(|c| c.buffer().map(|b| b.frame_count()))
    }

    #[test]
    fn stale_decodes_are_discarded() {
        let editor = editor(&ResourceStore::default());
        let first = editor.begin_load();
        let second = editor.begin_load();

        assert_eq!(editor.finish_load(second, Ok(clip(200))).unwrap(), LoadOutcome::Installed);
        assert_eq!(editor.finish_load(first, Ok(clip(100))).unwrap(), LoadOutcome::Superseded);
        assert_eq!(loaded_frames(&editor), Some(200));
        assert!(!editor.is_loading());
    }

    #[test]
    fn gestures_and_commits_wait_for_pending_loads() {
        let store = ResourceStore::default();
        let editor = editor(&store);
        let ticket = editor.begin_load();
        editor.finish_load(ticket, Ok(clip(800))).unwrap();

        let _pending = editor.begin_load();
        assert!(editor.is_loading());
        assert_eq!(editor.pointer_down(0.0), None);
        assert!(!editor.drag_to(TrimHandle::Start, 20.0));
        assert!(matches!(editor.commit(), Err(TrimError::Pending)));
        assert!(store.is_empty());
    }

    #[test]
    fn failed_loads_keep_the_previous_clip_and_window() {
        let editor = editor(&ResourceStore::default());
        let ticket = editor.begin_load();
        editor.finish_load(ticket, Ok(clip(800))).unwrap();
        assert!(editor.drag_to(TrimHandle::Start, 20.0));

        let ticket = editor.begin_load();
        let failed = editor.finish_load(ticket, Err(DecodeError::Malformed("truncated".into())));
        assert!(failed.is_err());
        assert_eq!(loaded_frames(&editor), Some(800));
        assert_eq!(editor.window().start(), 20.0);
        assert!(!editor.is_loading());
    }

    #[tokio::test]
    async fn load_then_commit() {
        let store = ResourceStore::default();
        let url = store.create(encode(&clip(8_000)).unwrap(), WAV_MIME);
        let editor = editor(&store);

        assert_eq!(editor.load(&url).await.unwrap(), LoadOutcome::Installed);
        assert!(editor.drag_to(TrimHandle::End, 50.0));
        let outcome = editor.commit().unwrap();
        assert_eq!(outcome.end_frame - outcome.start_frame, 4_000);
        assert!(store.contains(&outcome.url));
        assert!(editor.window().is_full());
    }
}
