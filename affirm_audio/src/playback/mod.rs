// src/playback/mod.rs

pub mod mix;
pub mod player;
pub mod resample;
pub mod tracker;

pub use player::CpalOutput;
pub use tracker::{sample_position, PlaybackClock, PositionTracker};

use crate::buffer::SampleBuffer;
use crate::decoder::{DecodeError, SampleDecoder};
use crate::playlist::{clamp_volume, effective_volume, Playlist, Track};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("no output device: {0}")]
    NoOutputDevice(String),
    #[error("unsupported output: {0}")]
    Unsupported(String),
    #[error("output stream failed: {0}")]
    Stream(String),
    #[error("resampling failed: {0}")]
    Resample(String),
    #[error("nothing is playing")]
    Idle,
}

/// A clip being played. Dropping the last handle releases the device.
pub trait Voice: PlaybackClock + Send + Sync {
    fn pause(&self);
    fn resume(&self);
    fn set_volume(&self, volume: f32);
    fn volume(&self) -> f32;
    /// Reached the end of the clip on its own.
    fn is_finished(&self) -> bool;
    /// Silence the voice and release its output stream now.
    fn stop(&self);
}

pub trait OutputBackend: Send {
    fn open(
        &mut self,
        buffer: Arc<SampleBuffer>,
        volume: f32,
    ) -> Result<Arc<dyn Voice>, PlaybackError>;
}

struct NowPlaying {
    track: Track,
    playlist: Option<Playlist>,
    voice: Arc<dyn Voice>,
}

impl NowPlaying {
    fn playlist_volume(&self) -> f32 {
        self.playlist.as_ref().map_or(1.0, |p| p.volume)
    }
}

/// Owns the single active voice; starting a track always stops the previous one.
pub struct PlaybackCoordinator {
    backend: Box<dyn OutputBackend>,
    decoder: SampleDecoder,
    global_volume: f32,
    current: Option<NowPlaying>,
}

impl PlaybackCoordinator {
    pub fn new(backend: Box<dyn OutputBackend>, decoder: SampleDecoder) -> Self {
        Self {
            backend,
            decoder,
            global_volume: 1.0,
            current: None,
        }
    }

    pub fn with_global_volume(mut self, volume: f32) -> Self {
        self.global_volume = clamp_volume(volume);
        self
    }

    pub fn global_volume(&self) -> f32 {
        self.global_volume
    }

    pub fn now_playing(&self) -> Option<&Track> {
        self.current.as_ref().map(|now| &now.track)
    }

    pub fn is_playing(&self) -> bool {
        self.current.as_ref().is_some_and(|now| now.voice.is_playing())
    }

    /// The active voice as a clock, for a `PositionTracker`.
    pub fn clock(&self) -> Option<Arc<dyn Voice>> {
        self.current.as_ref().map(|now| now.voice.clone())
    }

    /// Decode and start `track`. A decode failure leaves the current voice alone.
    pub async fn play(
        &mut self,
        track: &Track,
        playlist: Option<&Playlist>,
    ) -> Result<(), PlaybackError> {
        let buffer = Arc::new(self.decoder.decode(&track.url).await?);
        self.stop();

        let playlist_volume = playlist.map_or(1.0, |p| p.volume);
        let volume = effective_volume(self.global_volume, playlist_volume, track.volume);
        let voice = self.backend.open(buffer, volume)?;
        log::info!("▶️ playing {:?} at {:.0}%", track.name, volume * 100.0);

        self.current = Some(NowPlaying {
            track: track.clone(),
            playlist: playlist.cloned(),
            voice,
        });
        Ok(())
    }

    /// Pause or resume the current track. Returns whether it is now playing.
    pub fn toggle(&mut self) -> Result<bool, PlaybackError> {
        let now = self.current.as_ref().ok_or(PlaybackError::Idle)?;
        if now.voice.is_playing() {
            now.voice.pause();
            log::info!("⏸️ paused");
            Ok(false)
        } else if now.voice.is_finished() {
            Ok(false)
        } else {
            now.voice.resume();
            log::info!("▶️ resumed");
            Ok(true)
        }
    }

    pub fn stop(&mut self) {
        if let Some(now) = self.current.take() {
            now.voice.stop();
            log::debug!("stopped {:?}", now.track.name);
        }
    }

    pub fn set_global_volume(&mut self, volume: f32) {
        self.global_volume = clamp_volume(volume);
        if let Some(now) = &self.current {
            now.voice.set_volume(effective_volume(
                self.global_volume,
                now.playlist_volume(),
                now.track.volume,
            ));
        }
    }

    /// Once the current voice has run out, start the next track of its
    /// playlist. Returns the id of the track that was started.
    pub async fn advance(&mut self) -> Result<Option<String>, PlaybackError> {
        let Some(now) = &self.current else {
            return Ok(None);
        };
        if !now.voice.is_finished() {
            return Ok(None);
        }

        let next = now.playlist.as_ref().and_then(|playlist| {
            playlist
                .next_after(&now.track.id)
                .map(|track| (track.clone(), playlist.clone()))
        });
        match next {
            Some((track, playlist)) => {
                self.play(&track, Some(&playlist)).await?;
                Ok(Some(track.id))
            }
            None => {
                self.stop();
                Ok(None)
            }
        }
    }
}

impl Drop for PlaybackCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode, WAV_MIME};
    use crate::resource::{ResourceStore, ResourceUrl};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeVoice {
        playing: AtomicBool,
        finished: AtomicBool,
        stopped: AtomicBool,
        volume: AtomicU32,
        frames: usize,
    }

    impl PlaybackClock for FakeVoice {
        fn current_time(&self) -> Duration {
            Duration::ZERO
        }
        fn duration(&self) -> Duration {
            Duration::from_secs_f64(self.frames as f64 / 8_000.0)
        }
        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }
    }

    impl Voice for FakeVoice {
        fn pause(&self) {
            self.playing.store(false, Ordering::SeqCst);
        }
        fn resume(&self) {
            self.playing.store(true, Ordering::SeqCst);
        }
        fn set_volume(&self, volume: f32) {
            self.volume.store(volume.to_bits(), Ordering::SeqCst);
        }
        fn volume(&self) -> f32 {
            f32::from_bits(self.volume.load(Ordering::SeqCst))
        }
        fn is_finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }
        fn stop(&self) {
            self.playing.store(false, Ordering::SeqCst);
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    impl FakeVoice {
        fn run_out(&self) {
            self.playing.store(false, Ordering::SeqCst);
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Clone, Default)]
    struct FakeOutput {
        voices: Arc<Mutex<Vec<Arc<FakeVoice>>>>,
    }

    impl FakeOutput {
        fn voice(&self, index: usize) -> Arc<FakeVoice> {
            self.voices.lock().unwrap()[index].clone()
        }
    }

    impl OutputBackend for FakeOutput {
        fn open(
            &mut self,
            buffer: Arc<SampleBuffer>,
            volume: f32,
        ) -> Result<Arc<dyn Voice>, PlaybackError> {
            let voice = Arc::new(FakeVoice {
                playing: AtomicBool::new(true),
                finished: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                volume: AtomicU32::new(volume.to_bits()),
                frames: buffer.frame_count(),
            });
            self.voices.lock().unwrap().push(voice.clone());
            Ok(voice)
        }
    }

    fn clip(store: &ResourceStore, name: &str) -> Track {
        let buffer = SampleBuffer::new(vec![vec![0.1; 800]], 8_000).unwrap();
        let url = store.create(encode(&buffer).unwrap(), WAV_MIME);
        Track::new(name, url, buffer.duration_secs())
    }

    fn setup() -> (ResourceStore, FakeOutput, PlaybackCoordinator) {
        let store = ResourceStore::default();
        let output = FakeOutput::default();
        let coordinator =
            PlaybackCoordinator::new(Box::new(output.clone()), SampleDecoder::new(store.clone()));
        (store, output, coordinator)
    }

    #[tokio::test]
    async fn starting_a_track_stops_the_previous_one() {
        let (store, output, mut coordinator) = setup();
        let first = clip(&store, "first");
        let second = clip(&store, "second");

        coordinator.play(&first, None).await.unwrap();
        coordinator.play(&second, None).await.unwrap();

        assert!(output.voice(0).stopped.load(Ordering::SeqCst));
        assert!(output.voice(1).is_playing());
        assert_eq!(coordinator.now_playing().map(|t| t.name.as_str()), Some("second"));
        let clock = coordinator.clock().unwrap();
        assert!((clock.duration().as_secs_f64() - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn volume_is_global_times_playlist_times_track() {
        let (store, output, mut coordinator) = setup();
        let mut track = clip(&store, "quiet");
        track.volume = 0.8;
        let mut list = Playlist::new("list");
        list.set_volume(0.5);
        list.add_track(track.clone());

        coordinator.set_global_volume(0.5);
        coordinator.play(&track, Some(&list)).await.unwrap();
        assert!((output.voice(0).volume() - 0.2).abs() < 1e-6);

        coordinator.set_global_volume(1.0);
        assert!((output.voice(0).volume() - 0.4).abs() < 1e-6);
    }

    #[tokio::test]
    async fn advance_walks_the_playlist() {
        let (store, output, mut coordinator) = setup();
        let mut list = Playlist::new("walk");
        list.add_track(clip(&store, "a"));
        list.add_track(clip(&store, "b"));
        let first = list.tracks[0].clone();

        coordinator.play(&first, Some(&list)).await.unwrap();
        assert_eq!(coordinator.advance().await.unwrap(), None);

        output.voice(0).run_out();
        let started = coordinator.advance().await.unwrap();
        assert_eq!(started.as_deref(), Some(list.tracks[1].id.as_str()));

        output.voice(1).run_out();
        assert_eq!(coordinator.advance().await.unwrap(), None);
        assert!(coordinator.now_playing().is_none());
    }

    #[tokio::test]
    async fn looping_playlists_wrap_around() {
        let (store, output, mut coordinator) = setup();
        let mut list = Playlist::new("loop");
        list.add_track(clip(&store, "a"));
        list.add_track(clip(&store, "b"));
        list.toggle_loop();
        let last = list.tracks[1].clone();

        coordinator.play(&last, Some(&list)).await.unwrap();
        output.voice(0).run_out();
        let started = coordinator.advance().await.unwrap();
        assert_eq!(started.as_deref(), Some(list.tracks[0].id.as_str()));
    }

    #[tokio::test]
    async fn toggle_pauses_and_resumes() {
        let (store, _output, mut coordinator) = setup();
        assert!(matches!(coordinator.toggle(), Err(PlaybackError::Idle)));

        coordinator.play(&clip(&store, "a"), None).await.unwrap();
        assert!(!coordinator.toggle().unwrap());
        assert!(!coordinator.is_playing());
        assert!(coordinator.toggle().unwrap());
        assert!(coordinator.is_playing());
    }

    #[tokio::test]
    async fn failed_decode_keeps_the_current_track() {
        let (store, output, mut coordinator) = setup();
        coordinator.play(&clip(&store, "good"), None).await.unwrap();

        let missing = Track::new("gone", ResourceUrl::new("blob:affirm/missing"), 1.0);
        let err = coordinator.play(&missing, None).await.unwrap_err();
        assert!(matches!(err, PlaybackError::Decode(DecodeError::Unreachable { .. })));
        assert!(output.voice(0).is_playing());
        assert_eq!(coordinator.now_playing().map(|t| t.name.as_str()), Some("good"));
    }
}
