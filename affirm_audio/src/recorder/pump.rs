// src/recorder/pump.rs

use super::ChunkSink;
use ringbuf::traits::Consumer;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// Forward ring contents to the session until a stop is requested
/// (or the requesting side disappears).
pub(super) fn forward_until_stopped<C>(
    consumer: &mut C,
    sink: &ChunkSink,
    stop: &Receiver<()>,
    chunk_len: usize,
) where
    C: Consumer<Item = f32>,
{
    let mut tmp = vec![0.0f32; chunk_len.max(1)];
    loop {
        let popped = consumer.pop_slice(&mut tmp);
        if popped > 0 && !sink.push(tmp[..popped].to_vec()) {
            return;
        }
        match stop.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => {}
        }
        if popped == 0 {
            thread::sleep(IDLE_SLEEP);
        }
    }
}

/// Flush whatever the producer left behind. Call after the stream is gone.
pub(super) fn drain<C>(consumer: &mut C, sink: &ChunkSink, chunk_len: usize)
where
    C: Consumer<Item = f32>,
{
    let mut tmp = vec![0.0f32; chunk_len.max(1)];
    loop {
        let popped = consumer.pop_slice(&mut tmp);
        if popped == 0 || !sink.push(tmp[..popped].to_vec()) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::{Producer, Split};
    use ringbuf::HeapRb;
    use std::sync::mpsc;

    #[test]
    fn forwards_then_drains_everything() {
        let (mut producer, mut consumer) = HeapRb::<f32>::new(64).split();
        let (tx, rx) = mpsc::channel();
        let sink = ChunkSink { tx };
        let (stop_tx, stop_rx) = mpsc::channel();

        assert_eq!(producer.push_slice(&[0.5; 40]), 40);
        stop_tx.send(()).unwrap();
        forward_until_stopped(&mut consumer, &sink, &stop_rx, 16);
        assert_eq!(rx.try_recv().unwrap().len(), 16);

        assert_eq!(producer.push_slice(&[0.25; 10]), 10);
        drain(&mut consumer, &sink, 16);
        drop(sink);

        let total: usize = rx.iter().map(|chunk| chunk.len()).sum();
        assert_eq!(total, 34);
    }
}
