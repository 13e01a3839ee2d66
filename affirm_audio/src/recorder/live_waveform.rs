// src/recorder/live_waveform.rs

/// Running min/max bins of channel 0 while a recording is in progress.
pub struct LiveWaveform {
    base_bin: usize,
    cur_min: f32,
    cur_max: f32,
    in_bin: usize,
    // Position inside the current interleaved frame, carried across chunks.
    frame_phase: usize,
    mins: Vec<f32>,
    maxs: Vec<f32>,
}

impl LiveWaveform {
    pub fn new(base_bin: usize) -> Self {
        Self {
            base_bin: base_bin.max(1),
            cur_min: f32::INFINITY,
            cur_max: f32::NEG_INFINITY,
            in_bin: 0,
            frame_phase: 0,
            mins: Vec::new(),
            maxs: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.base_bin);
    }

    fn add_sample(&mut self, s: f32) {
        self.cur_min = self.cur_min.min(s);
        self.cur_max = self.cur_max.max(s);
        self.in_bin += 1;
        if self.in_bin >= self.base_bin {
            self.mins.push(self.cur_min);
            self.maxs.push(self.cur_max);
            self.cur_min = f32::INFINITY;
            self.cur_max = f32::NEG_INFINITY;
            self.in_bin = 0;
        }
    }

    /// Feed an interleaved chunk. Chunks may split frames; channel 0 stays aligned.
    pub fn add_block(&mut self, samples: &[f32], channels: usize) {
        if channels == 0 {
            return;
        }
        for &s in samples {
            if self.frame_phase == 0 {
                self.add_sample(s);
            }
            self.frame_phase = (self.frame_phase + 1) % channels;
        }
    }

    /// Completed bins, cloned so callers need not hold the lock.
    pub fn snapshot(&self) -> (Vec<f32>, Vec<f32>) {
        (self.mins.clone(), self.maxs.clone())
    }

    pub fn len(&self) -> usize {
        self.mins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_frames_keep_channel_zero() {
        let mut wf = LiveWaveform::new(2);
        // Stereo frames (L, R): (0.1, -9), (0.2, -9), (0.3, -9), (0.4, -9)
        wf.add_block(&[0.1, -9.0, 0.2], 2);
        wf.add_block(&[-9.0, 0.3, -9.0, 0.4], 2);
        wf.add_block(&[-9.0], 2);

        let (mins, maxs) = wf.snapshot();
        assert_eq!(mins, vec![0.1, 0.3]);
        assert_eq!(maxs, vec![0.2, 0.4]);
    }

    #[test]
    fn reset_clears_bins() {
        let mut wf = LiveWaveform::new(1);
        wf.add_block(&[0.5, 0.5], 1);
        assert_eq!(wf.len(), 2);
        wf.reset();
        assert!(wf.is_empty());
    }
}
