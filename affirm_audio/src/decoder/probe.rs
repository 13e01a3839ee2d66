// src/decoder/probe.rs

use super::DecodeError;
use crate::buffer::{append_interleaved_to_planar, SampleBuffer};
use std::io::{Cursor, ErrorKind};
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer as PacketBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

pub(super) fn decode_with_symphonia(
    bytes: Arc<[u8]>,
    extension: Option<&str>,
) -> Result<SampleBuffer, DecodeError> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Unsupported(format!("unrecognised container: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::Unsupported("no audio track".into()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Unsupported(format!("no decoder for codec: {e}")))?;

    let mut sample_rate = codec_params.sample_rate;
    let mut planar: Vec<Vec<f32>> = Vec::new();
    let mut packet_buf: Option<PacketBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DecodeError::Malformed(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("skipping corrupt packet: {e}");
                continue;
            }
            Err(e) => return Err(DecodeError::Malformed(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        if channels == 0 || decoded.frames() == 0 {
            continue;
        }
        if planar.is_empty() {
            planar = vec![Vec::new(); channels];
            sample_rate = Some(spec.rate);
        } else if planar.len() != channels {
            return Err(DecodeError::Malformed(format!(
                "channel count changed mid-stream ({} -> {channels})",
                planar.len()
            )));
        }

        if packet_buf
            .as_ref()
            .is_none_or(|b| b.capacity() < decoded.capacity())
        {
            packet_buf = Some(PacketBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }
        if let Some(buf) = packet_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            append_interleaved_to_planar(buf.samples(), &mut planar, channels);
        }
    }

    if planar.is_empty() {
        return Err(DecodeError::Malformed("stream held no decodable audio".into()));
    }
    let rate = sample_rate.ok_or_else(|| DecodeError::Unsupported("unknown sample rate".into()))?;
    SampleBuffer::new(planar, rate).map_err(|e| DecodeError::Malformed(e.to_string()))
}
