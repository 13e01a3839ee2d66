// src/playback/resample.rs

use super::PlaybackError;
use rubato::{
    calculate_cutoff, Resampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

const CHUNK_FRAMES: usize = 1024;

fn build_resampler(
    src_rate: u32,
    dst_rate: u32,
    channels: usize,
) -> Result<Option<SincFixedIn<f32>>, PlaybackError> {
    if src_rate == dst_rate {
        return Ok(None);
    }
    let ratio = dst_rate as f64 / src_rate as f64;
    let sinc_len = 256usize;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window,
    };
    SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_FRAMES, channels)
        .map(Some)
        .map_err(|e| PlaybackError::Resample(e.to_string()))
}

fn append_planar(out: &mut [Vec<f32>], block: Vec<Vec<f32>>) {
    for (dst, src) in out.iter_mut().zip(block) {
        dst.extend(src);
    }
}

/// Convert a whole planar clip from `src_rate` to `dst_rate`.
/// The output is aligned to the input (filter delay removed) and has
/// `round(frames * dst / src)` frames.
pub fn resample_planar(
    input: &[Vec<f32>],
    src_rate: u32,
    dst_rate: u32,
) -> Result<Vec<Vec<f32>>, PlaybackError> {
    let channels = input.len();
    let Some(mut resampler) = build_resampler(src_rate, dst_rate, channels.max(1))? else {
        return Ok(input.to_vec());
    };
    if channels == 0 {
        return Ok(Vec::new());
    }

    let frames = input.iter().map(Vec::len).min().unwrap_or(0);
    let expected = (frames as f64 * dst_rate as f64 / src_rate as f64).round() as usize;
    let mut out = vec![Vec::with_capacity(expected + CHUNK_FRAMES); channels];
    let fail = |e: rubato::ResampleError| PlaybackError::Resample(e.to_string());

    let mut pos = 0;
    loop {
        let need = resampler.input_frames_next();
        if frames - pos < need {
            break;
        }
        let block: Vec<&[f32]> = input.iter().map(|ch| &ch[pos..pos + need]).collect();
        append_planar(&mut out, resampler.process(&block, None).map_err(fail)?);
        pos += need;
    }
    if pos < frames {
        let block: Vec<&[f32]> = input.iter().map(|ch| &ch[pos..frames]).collect();
        append_planar(
            &mut out,
            resampler.process_partial(Some(&block), None).map_err(fail)?,
        );
    }

    // Flush until the delayed tail is out.
    let delay = resampler.output_delay();
    while out[0].len() < expected + delay {
        let tail = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(fail)?;
        if tail.first().is_none_or(Vec::is_empty) {
            break;
        }
        append_planar(&mut out, tail);
    }

    for ch in &mut out {
        ch.drain(..delay.min(ch.len()));
        ch.resize(expected, 0.0);
    }
    Ok(out)
}
