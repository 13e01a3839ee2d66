// src/playback/player.rs

use super::tracker::PlaybackClock;
use super::{mix, resample, OutputBackend, PlaybackError, Voice};
use crate::buffer::{interleave, SampleBuffer};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Shared between the voice handle and the audio callback.
struct VoiceState {
    is_playing: AtomicBool,
    finished: AtomicBool,
    volume: AtomicU32,
    cursor_samples: AtomicU64,
}

impl VoiceState {
    fn new(volume: f32) -> Self {
        Self {
            is_playing: AtomicBool::new(true),
            finished: AtomicBool::new(false),
            volume: AtomicU32::new(volume.clamp(0.0, 1.0).to_bits()),
            cursor_samples: AtomicU64::new(0),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OutputFormat {
    sample_rate: u32,
    channels: u16,
    total_samples: u64,
}

/// Plays decoded clips on the default cpal output device.
#[derive(Default)]
pub struct CpalOutput;

impl CpalOutput {
    pub fn new() -> Self {
        Self
    }
}

impl OutputBackend for CpalOutput {
    fn open(
        &mut self,
        buffer: Arc<SampleBuffer>,
        volume: f32,
    ) -> Result<Arc<dyn Voice>, PlaybackError> {
        let state = Arc::new(VoiceState::new(volume));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();
        let thread_state = state.clone();

        let thread = thread::Builder::new()
            .name("affirm-playback".into())
            .spawn(move || run_output(buffer, thread_state, ready_tx, stop_rx))
            .map_err(|e| PlaybackError::Stream(format!("cannot spawn playback thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(format)) => Ok(Arc::new(CpalVoice {
                state,
                format,
                stop: Mutex::new(Some(stop_tx)),
                thread: Mutex::new(Some(thread)),
            })),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(PlaybackError::Stream("playback thread exited during setup".into()))
            }
        }
    }
}

pub struct CpalVoice {
    state: Arc<VoiceState>,
    format: OutputFormat,
    stop: Mutex<Option<Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl CpalVoice {
    fn samples_to_duration(&self, samples: u64) -> Duration {
        let frames = samples as f64 / self.format.channels.max(1) as f64;
        Duration::from_secs_f64(frames / self.format.sample_rate.max(1) as f64)
    }

    fn release(&self) {
        if let Some(stop) = self.stop.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = stop.send(());
        }
        let thread = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                log::error!("playback thread panicked");
            }
        }
    }
}

impl PlaybackClock for CpalVoice {
    fn current_time(&self) -> Duration {
        self.samples_to_duration(self.state.cursor_samples.load(Ordering::Relaxed))
    }

    fn duration(&self) -> Duration {
        self.samples_to_duration(self.format.total_samples)
    }

    fn is_playing(&self) -> bool {
        self.state.is_playing.load(Ordering::Relaxed)
    }
}

impl Voice for CpalVoice {
    fn pause(&self) {
        self.state.is_playing.store(false, Ordering::Relaxed);
    }

    fn resume(&self) {
        if !self.is_finished() {
            self.state.is_playing.store(true, Ordering::Relaxed);
        }
    }

    fn set_volume(&self, volume: f32) {
        self.state
            .volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.state.volume.load(Ordering::Relaxed))
    }

    fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Relaxed)
    }

    fn stop(&self) {
        self.pause();
        self.release();
    }
}

impl Drop for CpalVoice {
    fn drop(&mut self) {
        self.release();
    }
}

struct OutputDevice {
    device: cpal::Device,
    config: StreamConfig,
    sample_format: SampleFormat,
}

fn setup_output_device() -> Result<OutputDevice, PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackError::NoOutputDevice("no default output device".into()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| PlaybackError::NoOutputDevice(e.to_string()))?;
    let sample_format = supported.sample_format();
    let config = supported.config();
    log::debug!(
        "🔊 output device: {} ch, {} Hz, {sample_format:?}",
        config.channels,
        config.sample_rate.0
    );
    Ok(OutputDevice {
        device,
        config,
        sample_format,
    })
}

/// Bring a clip to the device layout: resample, then interleave and remix.
fn prepare_pcm(
    buffer: &SampleBuffer,
    out_rate: u32,
    out_channels: usize,
) -> Result<Vec<f32>, PlaybackError> {
    let planar = resample::resample_planar(buffer.channels(), buffer.sample_rate(), out_rate)?;
    let interleaved = interleave(&planar);
    Ok(mix::updown_mix_interleaved(
        &interleaved,
        buffer.channel_count(),
        out_channels,
    ))
}

fn run_output(
    buffer: Arc<SampleBuffer>,
    state: Arc<VoiceState>,
    ready: Sender<Result<OutputFormat, PlaybackError>>,
    stop: Receiver<()>,
) {
    let opened = setup_output_device().and_then(|output| {
        let pcm = prepare_pcm(&buffer, output.config.sample_rate.0, output.config.channels as usize)?;
        let format = OutputFormat {
            sample_rate: output.config.sample_rate.0,
            channels: output.config.channels,
            total_samples: pcm.len() as u64,
        };
        let stream = match output.sample_format {
            SampleFormat::F32 => build_stream::<f32>(&output, pcm, state.clone())?,
            SampleFormat::I16 => build_stream::<i16>(&output, pcm, state.clone())?,
            SampleFormat::U16 => build_stream::<u16>(&output, pcm, state.clone())?,
            other => {
                return Err(PlaybackError::Unsupported(format!(
                    "output sample format {other:?}"
                )));
            }
        };
        stream
            .play()
            .map_err(|e| PlaybackError::Stream(e.to_string()))?;
        Ok((stream, format))
    });

    let (stream, format) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(format)).is_err() {
        return;
    }

    // Blocks until the voice is stopped or dropped.
    let _ = stop.recv();
    drop(stream);
    log::debug!("playback thread finished");
}

/// Output callback: copies the prepared clip, applies volume and
/// marks the voice finished once the cursor reaches the end.
fn build_stream<T>(
    output: &OutputDevice,
    pcm: Vec<f32>,
    state: Arc<VoiceState>,
) -> Result<Stream, PlaybackError>
where
    T: SizedSample + FromSample<f32>,
{
    output
        .device
        .build_output_stream(
            &output.config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let volume = f32::from_bits(state.volume.load(Ordering::Relaxed));
                let playing = state.is_playing.load(Ordering::Relaxed);
                let mut cursor = state.cursor_samples.load(Ordering::Relaxed) as usize;

                for out in data.iter_mut() {
                    let sample = match pcm.get(cursor) {
                        Some(&s) if playing => {
                            cursor += 1;
                            s
                        }
                        _ => 0.0,
                    };
                    *out = T::from_sample(sample * volume);
                }

                state.cursor_samples.store(cursor as u64, Ordering::Relaxed);
                if playing && cursor >= pcm.len() {
                    state.is_playing.store(false, Ordering::Relaxed);
                    state.finished.store(true, Ordering::Relaxed);
                }
            },
            |err| log::error!("output stream error: {err}"),
            None,
        )
        .map_err(|e| PlaybackError::Stream(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clips_are_brought_to_the_device_layout() {
        let clip = SampleBuffer::new(vec![vec![0.5; 480]], 48_000).unwrap();
        let pcm = prepare_pcm(&clip, 48_000, 2).unwrap();
        assert_eq!(pcm.len(), 960);
        assert!(pcm.iter().all(|&s| s == 0.5));

        let stereo = SampleBuffer::new(vec![vec![0.25; 2_205], vec![0.25; 2_205]], 22_050).unwrap();
        let pcm = prepare_pcm(&stereo, 44_100, 1).unwrap();
        assert_eq!(pcm.len(), 4_410);
    }

    #[test]
    fn new_voices_start_playing_at_a_clamped_volume() {
        let state = VoiceState::new(1.7);
        assert!(state.is_playing.load(Ordering::Relaxed));
        assert_eq!(f32::from_bits(state.volume.load(Ordering::Relaxed)), 1.0);
    }
}
