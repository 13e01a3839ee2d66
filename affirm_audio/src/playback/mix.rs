// src/playback/mix.rs

/// Map interleaved audio from `in_ch` to `out_ch` channels.
/// Mono is duplicated, stereo folds down to its average, wider layouts
/// average neighbouring groups when shrinking and repeat when growing.
pub fn updown_mix_interleaved(input: &[f32], in_ch: usize, out_ch: usize) -> Vec<f32> {
    if in_ch == 0 || out_ch == 0 {
        return Vec::new();
    }
    if in_ch == out_ch {
        return input.to_vec();
    }

    let frames = input.len() / in_ch;
    let mut out = Vec::with_capacity(frames * out_ch);
    let factor = in_ch as f32 / out_ch as f32;

    for frame in input.chunks_exact(in_ch) {
        match (in_ch, out_ch) {
            (1, _) => out.extend(std::iter::repeat_n(frame[0], out_ch)),
            (2, 1) => out.push(0.5 * (frame[0] + frame[1])),
            _ if out_ch < in_ch => {
                for oc in 0..out_ch {
                    let start = (oc as f32 * factor).floor() as usize;
                    let end = (((oc + 1) as f32 * factor).ceil() as usize).min(in_ch);
                    let group = &frame[start..end];
                    let mean = if group.is_empty() {
                        0.0
                    } else {
                        group.iter().sum::<f32>() / group.len() as f32
                    };
                    out.push(mean);
                }
            }
            _ => out.extend((0..out_ch).map(|oc| frame[oc % in_ch])),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_fans_out_and_stereo_folds_down() {
        assert_eq!(updown_mix_interleaved(&[0.5, -0.5], 1, 2), vec![0.5, 0.5, -0.5, -0.5]);
        assert_eq!(updown_mix_interleaved(&[1.0, 0.0, 0.2, 0.4], 2, 1), vec![0.5, 0.3]);
    }

    #[test]
    fn wide_layouts() {
        // 4 -> 2 averages pairs
        let mixed = updown_mix_interleaved(&[1.0, 0.0, 0.5, 0.5], 4, 2);
        assert_eq!(mixed, vec![0.5, 0.5]);
        // 2 -> 4 repeats the pair
        let mixed = updown_mix_interleaved(&[0.1, 0.2], 2, 4);
        assert_eq!(mixed, vec![0.1, 0.2, 0.1, 0.2]);
    }

    #[test]
    fn partial_frames_and_empty_layouts_are_dropped() {
        assert_eq!(updown_mix_interleaved(&[0.1, 0.2, 0.3], 2, 1).len(), 1);
        assert!(updown_mix_interleaved(&[0.1], 0, 2).is_empty());
    }
}
