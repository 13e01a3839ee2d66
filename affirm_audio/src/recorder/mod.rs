// src/recorder/mod.rs

pub mod finalize;
pub mod input;
pub mod live_waveform;
mod pump;

pub use input::CpalInput;
pub use live_waveform::LiveWaveform;

use crate::encoder::WAV_MIME;
use crate::resource::{ResourceStore, ResourceUrl};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),
    #[error("no input device: {0}")]
    DeviceNotFound(String),
    #[error("audio capture unsupported: {0}")]
    Unsupported(String),
    #[error("the microphone is already recording")]
    Busy,
    #[error("audio backend error: {0}")]
    Backend(String),
    #[error("no recording in progress")]
    NotRecording,
    #[error("failed to finalize recording")]
    Finalize(#[source] hound::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Inactive,
    RequestingPermission,
    Recording,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Where an input stream delivers interleaved f32 chunks.
#[derive(Clone)]
pub struct ChunkSink {
    tx: Sender<Vec<f32>>,
}

impl ChunkSink {
    /// Returns false once the session has gone away.
    pub fn push(&self, chunk: Vec<f32>) -> bool {
        chunk.is_empty() || self.tx.send(chunk).is_ok()
    }
}

/// An open microphone stream. Dropping it releases the device.
pub trait InputStream: Send {
    fn format(&self) -> CaptureFormat;
}

/// Opens microphone streams; the seam between the session and the audio host.
pub trait InputBackend: Send {
    fn open(&mut self, sink: ChunkSink) -> Result<Box<dyn InputStream>, CaptureError>;
}

#[derive(Debug, Clone)]
pub struct RecordingOutcome {
    pub url: ResourceUrl,
    pub duration_secs: f64,
    pub frames: usize,
    pub format: CaptureFormat,
    pub elapsed_secs: u64,
}

struct ActiveCapture {
    stream: Box<dyn InputStream>,
    format: CaptureFormat,
    incoming: Receiver<Vec<f32>>,
    chunks: Vec<Vec<f32>>,
    elapsed: Arc<AtomicU64>,
    ticker: JoinHandle<()>,
}

type RecordingHook = Box<dyn FnMut(&ResourceUrl, f64) + Send>;

pub struct CaptureSession {
    backend: Box<dyn InputBackend>,
    store: ResourceStore,
    state: CaptureState,
    active: Option<ActiveCapture>,
    preview: Arc<Mutex<LiveWaveform>>,
    on_recording_complete: Option<RecordingHook>,
}

impl CaptureSession {
    pub fn new(backend: impl InputBackend + 'static, store: ResourceStore) -> Self {
        Self::with_preview_bin(backend, store, 512)
    }

    pub fn with_preview_bin(
        backend: impl InputBackend + 'static,
        store: ResourceStore,
        preview_bin: usize,
    ) -> Self {
        Self {
            backend: Box::new(backend),
            store,
            state: CaptureState::Inactive,
            active: None,
            preview: Arc::new(Mutex::new(LiveWaveform::new(preview_bin))),
            on_recording_complete: None,
        }
    }

    pub fn on_recording_complete(&mut self, hook: impl FnMut(&ResourceUrl, f64) + Send + 'static) {
        self.on_recording_complete = Some(Box::new(hook));
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    /// Whole seconds since recording started, zero when idle.
    pub fn elapsed_secs(&self) -> u64 {
        self.active
            .as_ref()
            .map_or(0, |a| a.elapsed.load(Ordering::Relaxed))
    }

    pub fn format(&self) -> Option<CaptureFormat> {
        self.active.as_ref().map(|a| a.format)
    }

    pub fn chunk_count(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.chunks.len())
    }

    /// Shared handle to the live min/max preview.
    pub fn live_waveform(&self) -> Arc<Mutex<LiveWaveform>> {
        self.preview.clone()
    }

    /// Open the microphone. Does nothing unless the session is idle.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        if self.state != CaptureState::Inactive {
            log::debug!("start ignored while {:?}", self.state);
            return Ok(());
        }
        self.state = CaptureState::RequestingPermission;

        let (tx, incoming) = mpsc::channel();
        let stream = match self.backend.open(ChunkSink { tx }) {
            Ok(stream) => stream,
            Err(e) => {
                self.state = CaptureState::Inactive;
                log::warn!("could not start recording: {e}");
                return Err(e);
            }
        };

        let format = stream.format();
        let elapsed = Arc::new(AtomicU64::new(0));
        let ticker = tokio::spawn(count_seconds(elapsed.clone()));
        self.preview
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();

        self.active = Some(ActiveCapture {
            stream,
            format,
            incoming,
            chunks: Vec::new(),
            elapsed,
            ticker,
        });
        self.state = CaptureState::Recording;
        log::info!(
            "recording started ({} Hz, {} ch)",
            format.sample_rate,
            format.channels
        );
        Ok(())
    }

    /// Move delivered chunks into the session. Returns how many arrived.
    pub fn poll(&mut self) -> usize {
        let Some(active) = self.active.as_mut() else {
            return 0;
        };
        let mut preview = self.preview.lock().unwrap_or_else(PoisonError::into_inner);
        let before = active.chunks.len();
        while let Ok(chunk) = active.incoming.try_recv() {
            preview.add_block(&chunk, active.format.channels as usize);
            active.chunks.push(chunk);
        }
        active.chunks.len() - before
    }

    /// Release the microphone and turn everything captured into one WAV resource.
    pub async fn stop(&mut self) -> Result<RecordingOutcome, CaptureError> {
        if self.state != CaptureState::Recording {
            return Err(CaptureError::NotRecording);
        }
        self.poll();
        let Some(active) = self.active.take() else {
            self.state = CaptureState::Inactive;
            return Err(CaptureError::NotRecording);
        };
        let _settle = SettleOnDrop::stopping(&mut self.state);

        let ActiveCapture {
            stream,
            format,
            incoming,
            mut chunks,
            elapsed,
            ticker,
        } = active;
        ticker.abort();
        let elapsed_secs = elapsed.load(Ordering::Relaxed);
        let preview = self.preview.clone();

        let encoded = tokio::task::spawn_blocking(move || {
            // Joins the device thread, so every sample it captured is already queued.
            drop(stream);
            let mut preview = preview.lock().unwrap_or_else(PoisonError::into_inner);
            for chunk in incoming.try_iter() {
                preview.add_block(&chunk, format.channels as usize);
                chunks.push(chunk);
            }
            drop(preview);
            finalize::encode_chunks(&chunks, format)
        })
        .await;
        let (bytes, frames) = match encoded {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                log::error!("recording could not be finalized: {e}");
                return Err(CaptureError::Finalize(e));
            }
            Err(e) => return Err(CaptureError::Backend(format!("finalize task failed: {e}"))),
        };

        let duration_secs = frames as f64 / format.sample_rate as f64;
        let url = self.store.create(bytes, WAV_MIME);
        log::info!("recording stopped: {duration_secs:.2}s in {url}");
        if let Some(hook) = self.on_recording_complete.as_mut() {
            hook(&url, duration_secs);
        }

        Ok(RecordingOutcome {
            url,
            duration_secs,
            frames,
            format,
            elapsed_secs,
        })
    }
}

/// Holds a session in `Stopping` and returns it to `Inactive` however `stop` ends,
/// including when its future is dropped mid-finalize.
struct SettleOnDrop<'a>(&'a mut CaptureState);

impl<'a> SettleOnDrop<'a> {
    fn stopping(state: &'a mut CaptureState) -> Self {
        *state = CaptureState::Stopping;
        Self(state)
    }
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        *self.0 = CaptureState::Inactive;
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.ticker.abort();
            log::debug!("recording session dropped while active; releasing microphone");
        }
    }
}

async fn count_seconds(elapsed: Arc<AtomicU64>) {
    let period = Duration::from_secs(1);
    let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        ticks.tick().await;
        elapsed.fetch_add(1, Ordering::Relaxed);
    }
}
