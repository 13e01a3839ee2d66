// src/recorder/input.rs

use super::{pump, CaptureError, CaptureFormat, ChunkSink, InputBackend, InputStream};
use crate::config::CaptureConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BuildStreamError, DefaultStreamConfigError, FromSample, PlayStreamError, Sample,
    SampleFormat, SizedSample, Stream, StreamConfig,
};
use ringbuf::traits::{Producer, Split};
use ringbuf::HeapRb;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// One microphone stream per process.
static MIC_IN_USE: AtomicBool = AtomicBool::new(false);

struct MicClaim;

impl MicClaim {
    fn acquire() -> Result<Self, CaptureError> {
        MIC_IN_USE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| MicClaim)
            .map_err(|_| CaptureError::Busy)
    }
}

impl Drop for MicClaim {
    fn drop(&mut self) {
        MIC_IN_USE.store(false, Ordering::Release);
    }
}

/// Microphone capture through the default cpal host.
pub struct CpalInput {
    device_name: Option<String>,
    ring_capacity: usize,
}

impl CpalInput {
    pub fn new(device_name: Option<String>, ring_capacity: usize) -> Self {
        Self {
            device_name,
            ring_capacity: ring_capacity.max(1024),
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.device.clone(), config.ring_capacity)
    }
}

impl InputBackend for CpalInput {
    fn open(&mut self, sink: ChunkSink) -> Result<Box<dyn InputStream>, CaptureError> {
        let claim = MicClaim::acquire()?;
        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();
        let device_name = self.device_name.clone();
        let ring_capacity = self.ring_capacity;

        // The cpal stream lives and dies on this thread.
        let thread = thread::Builder::new()
            .name("affirm-capture".into())
            .spawn(move || run_capture(device_name, ring_capacity, sink, ready_tx, stop_rx))
            .map_err(|e| CaptureError::Backend(format!("cannot spawn capture thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(format)) => Ok(Box::new(CpalStream {
                format,
                stop: Some(stop_tx),
                thread: Some(thread),
                _claim: claim,
            })),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(CaptureError::Backend(
                    "capture thread exited during setup".into(),
                ))
            }
        }
    }
}

struct CpalStream {
    format: CaptureFormat,
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    _claim: MicClaim,
}

impl InputStream for CpalStream {
    fn format(&self) -> CaptureFormat {
        self.format
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("capture thread panicked");
            }
        }
    }
}

fn run_capture(
    device_name: Option<String>,
    ring_capacity: usize,
    sink: ChunkSink,
    ready: Sender<Result<CaptureFormat, CaptureError>>,
    stop: Receiver<()>,
) {
    let (producer, mut consumer) = HeapRb::<f32>::new(ring_capacity).split();
    let (stream, format) = match open_stream(device_name.as_deref(), producer) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(format)).is_err() {
        return;
    }

    // ~100 ms of audio per chunk
    let chunk_len = (format.sample_rate as usize * format.channels as usize / 10).max(256);
    pump::forward_until_stopped(&mut consumer, &sink, &stop, chunk_len);
    drop(stream);
    pump::drain(&mut consumer, &sink, chunk_len);
    log::debug!("capture thread finished");
}

fn open_stream<P>(
    device_name: Option<&str>,
    producer: P,
) -> Result<(Stream, CaptureFormat), CaptureError>
where
    P: Producer<Item = f32> + Send + 'static,
{
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::Backend(e.to_string()))?
            .find(|d| d.name().is_ok_and(|n| n == name))
            .ok_or_else(|| CaptureError::DeviceNotFound(format!("no input device named {name:?}")))?,
        None => host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceNotFound("no default input device".into()))?,
    };

    let supported = device
        .default_input_config()
        .map_err(map_config_error)?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let format = CaptureFormat {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32, _>(&device, &config, producer)?,
        SampleFormat::I16 => build_stream::<i16, _>(&device, &config, producer)?,
        SampleFormat::U16 => build_stream::<u16, _>(&device, &config, producer)?,
        other => {
            return Err(CaptureError::Unsupported(format!(
                "input sample format {other:?}"
            )));
        }
    };
    stream.play().map_err(map_play_error)?;

    log::info!(
        "🎙️ capturing from {} ({} Hz, {} ch, {sample_format:?})",
        device.name().unwrap_or_else(|_| "unknown device".into()),
        format.sample_rate,
        format.channels
    );
    Ok((stream, format))
}

/// Converts any device sample type to f32 before it enters the ring.
fn build_stream<T, P>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: P,
) -> Result<Stream, CaptureError>
where
    T: SizedSample,
    f32: FromSample<T>,
    P: Producer<Item = f32> + Send + 'static,
{
    let mut converted: Vec<f32> = Vec::new();
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                converted.clear();
                converted.extend(data.iter().map(|&s| f32::from_sample(s)));
                // ring full -> the rest of this callback is dropped
                producer.push_slice(&converted);
            },
            |err| log::error!("input stream error: {err}"),
            None,
        )
        .map_err(map_build_error)
}

fn classify_backend(description: String) -> CaptureError {
    let lower = description.to_ascii_lowercase();
    let refused = ["permission", "denied", "not authorized", "not permitted"]
        .iter()
        .any(|needle| lower.contains(needle));
    if refused {
        CaptureError::PermissionDenied(description)
    } else {
        CaptureError::Backend(description)
    }
}

fn map_config_error(e: DefaultStreamConfigError) -> CaptureError {
    match e {
        DefaultStreamConfigError::BackendSpecific { err } => classify_backend(err.description),
        DefaultStreamConfigError::DeviceNotAvailable => CaptureError::DeviceNotFound(e.to_string()),
        other => CaptureError::Unsupported(other.to_string()),
    }
}

fn map_build_error(e: BuildStreamError) -> CaptureError {
    match e {
        BuildStreamError::BackendSpecific { err } => classify_backend(err.description),
        BuildStreamError::DeviceNotAvailable => CaptureError::DeviceNotFound(e.to_string()),
        BuildStreamError::StreamConfigNotSupported => CaptureError::Unsupported(e.to_string()),
        other => CaptureError::Backend(other.to_string()),
    }
}

fn map_play_error(e: PlayStreamError) -> CaptureError {
    match e {
        PlayStreamError::BackendSpecific { err } => classify_backend(err.description),
        other => CaptureError::DeviceNotFound(other.to_string()),
    }
}
