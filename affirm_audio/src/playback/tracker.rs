// src/playback/tracker.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Read-only view of a playing voice.
pub trait PlaybackClock {
    fn current_time(&self) -> Duration;
    fn duration(&self) -> Duration;
    fn is_playing(&self) -> bool;
}

/// Normalized playback position in [0, 1], or None for an empty clip.
pub fn sample_position<C: PlaybackClock + ?Sized>(clock: &C) -> Option<f32> {
    let total = clock.duration().as_secs_f64();
    if total <= 0.0 {
        return None;
    }
    let ratio = clock.current_time().as_secs_f64() / total;
    Some(ratio.clamp(0.0, 1.0) as f32)
}

/// Pushes the playback position to a sink once per frame while the clock plays.
pub struct PositionTracker {
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PositionTracker {
    /// Must be called from within a tokio runtime.
    pub fn spawn<C, F>(clock: Arc<C>, frame: Duration, mut sink: F) -> Self
    where
        C: PlaybackClock + Send + Sync + ?Sized + 'static,
        F: FnMut(f32) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let frame = frame.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !flag.load(Ordering::Acquire) || !clock.is_playing() {
                    break;
                }
                if let Some(position) = sample_position(clock.as_ref()) {
                    sink(position);
                }
            }
            flag.store(false, Ordering::Release);
            log::trace!("position tracker stopped");
        });

        Self { running, task }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.task.is_finished()
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeClock {
        now: Mutex<Duration>,
        total: Duration,
        playing: AtomicBool,
    }

    impl FakeClock {
        fn new(total_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Duration::ZERO),
                total: Duration::from_millis(total_ms),
                playing: AtomicBool::new(true),
            })
        }

        fn seek(&self, ms: u64) {
            *self.now.lock().unwrap() = Duration::from_millis(ms);
        }
    }

    impl PlaybackClock for FakeClock {
        fn current_time(&self) -> Duration {
            *self.now.lock().unwrap()
        }
        fn duration(&self) -> Duration {
            self.total
        }
        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }
    }

    fn collector() -> (Arc<Mutex<Vec<f32>>>, impl FnMut(f32) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            move |p| seen.lock().unwrap().push(p)
        };
        (seen, sink)
    }

    #[test]
    fn position_is_a_clamped_ratio() {
        let clock = FakeClock::new(2_000);
        clock.seek(500);
        assert_eq!(sample_position(clock.as_ref()), Some(0.25));
        clock.seek(3_000);
        assert_eq!(sample_position(clock.as_ref()), Some(1.0));
        assert_eq!(sample_position(FakeClock::new(0).as_ref()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_every_frame_until_playback_ends() {
        let clock = FakeClock::new(1_000);
        let (seen, sink) = collector();
        let tracker = PositionTracker::spawn(clock.clone(), Duration::from_millis(16), sink);

        clock.seek(100);
        tokio::time::sleep(Duration::from_millis(70)).await;
        let reported = seen.lock().unwrap().len();
        assert!(reported >= 3, "only {reported} updates");
        assert!(tracker.is_running());

        clock.playing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!tracker.is_running());

        let settled = seen.lock().unwrap().len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(seen.lock().unwrap().len(), settled);
        assert!(seen.lock().unwrap().iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_updates() {
        let clock = FakeClock::new(1_000);
        let (seen, sink) = collector();
        let tracker = PositionTracker::spawn(clock, Duration::from_millis(16), sink);

        tokio::time::sleep(Duration::from_millis(20)).await;
        tracker.stop();
        assert!(!tracker.is_running());
        let settled = seen.lock().unwrap().len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(seen.lock().unwrap().len(), settled);
    }
}
