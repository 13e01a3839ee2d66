// src/lib.rs

pub mod buffer;
pub mod config;
pub mod decoder;
pub mod editor;
pub mod encoder;
pub mod playback;
pub mod playlist;
pub mod recorder;
pub mod resource;
pub mod trim;
pub mod waveform;

pub use buffer::SampleBuffer;
pub use config::StudioConfig;
pub use decoder::{DecodeError, SampleDecoder};
pub use editor::{LoadOutcome, LoadTicket, TrimEditor};
pub use encoder::{encode, extract_range};
pub use playback::{PlaybackCoordinator, PositionTracker};
pub use playlist::{Playlist, Track};
pub use recorder::CaptureSession;
pub use resource::{ResourceStore, ResourceUrl};
pub use trim::{TrimController, TrimHandle, TrimWindow};
pub use waveform::WaveformRenderer;
