// src/decoder/mod.rs

mod probe;
mod wav;

use crate::buffer::SampleBuffer;
use crate::resource::{FetchError, ResourceStore, ResourceUrl};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot fetch {url}")]
    Unreachable {
        url: ResourceUrl,
        #[source]
        source: FetchError,
    },
    #[error("unsupported audio format: {0}")]
    Unsupported(String),
    #[error("malformed audio data: {0}")]
    Malformed(String),
    #[error("decode worker failed: {0}")]
    Worker(String),
}

/// Resolves resource urls into sample buffers.
#[derive(Clone)]
pub struct SampleDecoder {
    store: ResourceStore,
}

impl SampleDecoder {
    pub fn new(store: ResourceStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub async fn decode(&self, url: &ResourceUrl) -> Result<SampleBuffer, DecodeError> {
        let fetched = self
            .store
            .fetch(url)
            .await
            .map_err(|source| DecodeError::Unreachable {
                url: url.clone(),
                source,
            })?;

        let hint = url.extension().or_else(|| {
            fetched
                .mime
                .as_deref()
                .and_then(extension_for_mime)
                .map(str::to_string)
        });

        let bytes = fetched.bytes;
        let buffer = tokio::task::spawn_blocking(move || decode_shared(bytes, hint.as_deref()))
            .await
            .map_err(|e| DecodeError::Worker(e.to_string()))??;

        log::info!(
            "decoded {url}: {} ch, {} Hz, {:.2}s",
            buffer.channel_count(),
            buffer.sample_rate(),
            buffer.duration_secs()
        );
        Ok(buffer)
    }
}

/// Decode an in-memory file. `hint` is a file extension such as `"mp3"`.
pub fn decode_bytes(bytes: &[u8], hint: Option<&str>) -> Result<SampleBuffer, DecodeError> {
    decode_shared(Arc::from(bytes), hint)
}

fn decode_shared(bytes: Arc<[u8]>, hint: Option<&str>) -> Result<SampleBuffer, DecodeError> {
    if wav::is_riff_wave(&bytes) {
        match wav::decode_wav(&bytes) {
            Ok(buffer) => return Ok(buffer),
            // Extensible or exotic WAV layouts still have a chance with symphonia.
            Err(e) => log::debug!("hound rejected wav ({e}), probing with symphonia"),
        }
    }
    probe::decode_with_symphonia(bytes, hint)
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    match essence {
        "audio/wav" | "audio/wave" | "audio/x-wav" => Some("wav"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/ogg" => Some("ogg"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/mp4" | "audio/aac" | "audio/x-m4a" => Some("m4a"),
        _ => None,
    }
}
