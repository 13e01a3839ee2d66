// src/main.rs

mod cli;

use affirm_audio::decoder::decode_bytes;
use affirm_audio::encoder::PcmHeader;
use affirm_audio::playback::{CpalOutput, PlaybackClock, PlaybackCoordinator, PositionTracker};
use affirm_audio::playlist::{find_playlist_mut, JsonPlaylistStore, PlaylistStore};
use affirm_audio::recorder::{CaptureSession, CpalInput};
use affirm_audio::trim::{TrimController, TrimHandle};
use affirm_audio::waveform::terminal::{render_ascii, TextCanvas};
use affirm_audio::waveform::{RenderMode, WaveformRenderer};
use affirm_audio::{
    Playlist, ResourceStore, ResourceUrl, SampleDecoder, StudioConfig, Track, TrimEditor,
    TrimWindow,
};
use anyhow::{bail, Context};
use clap::Parser;
use cli::{Args, Command, PlaylistAction};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli::init_logging(&args);

    let config = match &args.config {
        Some(path) => StudioConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StudioConfig::default(),
    };
    let store = ResourceStore::new();

    match args.command {
        Command::Record { seconds, out } => record(&config, store, seconds, &out).await,
        Command::Waveform {
            input,
            cols,
            rows,
            compact,
        } => waveform(&config, store, &input, cols, rows, compact).await,
        Command::Trim {
            input,
            start,
            end,
            out,
        } => trim(&config, store, &input, start, end, &out).await,
        Command::Play { input } => play(&config, store, &input).await,
        Command::Inspect { input } => inspect(&input),
        Command::Playlist { action } => playlist(&config, store, action).await,
    }
}

/// Peak of each preview bin as a one-line bar graph.
fn preview_line(mins: &[f32], maxs: &[f32], cols: usize) -> String {
    let skip = mins.len().saturating_sub(cols);
    mins.iter()
        .zip(maxs)
        .skip(skip)
        .map(|(lo, hi)| {
            let peak = lo.abs().max(hi.abs()).min(1.0);
            LEVELS[((peak * (LEVELS.len() - 1) as f32).round()) as usize]
        })
        .collect()
}

async fn write_resource(store: &ResourceStore, url: &ResourceUrl, out: &Path) -> anyhow::Result<()> {
    let fetched = store.fetch(url).await?;
    tokio::fs::write(out, &fetched.bytes[..])
        .await
        .with_context(|| format!("writing {}", out.display()))
}

async fn record(
    config: &StudioConfig,
    store: ResourceStore,
    seconds: u64,
    out: &Path,
) -> anyhow::Result<()> {
    let mut session = CaptureSession::with_preview_bin(
        CpalInput::from_config(&config.capture),
        store.clone(),
        config.capture.preview_bin,
    );
    session.start().await.context("starting the microphone")?;
    println!("🎙️ Recording for {seconds}s...");

    let preview = session.live_waveform();
    let began = Instant::now();
    while began.elapsed() < Duration::from_secs(seconds) {
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.poll();
        let (mins, maxs) = preview
            .lock()
            .map(|wf| wf.snapshot())
            .unwrap_or_default();
        print!(
            "\r⏺️ {:>3}s {}",
            session.elapsed_secs(),
            preview_line(&mins, &maxs, 60)
        );
        std::io::stdout().flush()?;
    }
    println!();

    let outcome = session.stop().await?;
    write_resource(&store, &outcome.url, out).await?;
    println!(
        "💾 Saved {:.2}s ({} Hz, {} ch) to {}",
        outcome.duration_secs,
        outcome.format.sample_rate,
        outcome.format.channels,
        out.display()
    );
    Ok(())
}

async fn waveform(
    config: &StudioConfig,
    store: ResourceStore,
    input: &Path,
    cols: usize,
    rows: usize,
    compact: bool,
) -> anyhow::Result<()> {
    let decoder = SampleDecoder::new(store);
    let buffer = decoder.decode(&ResourceUrl::from_path(input)).await?;
    let renderer = WaveformRenderer::from_config(config);
    let mode = if compact {
        RenderMode::Compact
    } else {
        RenderMode::Full {
            window: TrimWindow::full(),
        }
    };
    for line in render_ascii(&renderer.render(&buffer, mode, None), cols, rows) {
        println!("{line}");
    }
    Ok(())
}

async fn trim(
    config: &StudioConfig,
    store: ResourceStore,
    input: &Path,
    start: f64,
    end: f64,
    out: &Path,
) -> anyhow::Result<()> {
    if !(0.0..=100.0).contains(&start) || !(0.0..=100.0).contains(&end) || start >= end {
        bail!("trim range must satisfy 0 <= start < end <= 100 (got {start}..{end})");
    }

    let controller = TrimController::new(
        WaveformRenderer::from_config(config),
        config.trim.clone(),
        TextCanvas::new(80, 12),
    );
    let editor = TrimEditor::new(controller, SampleDecoder::new(store.clone()));
    editor.load(&ResourceUrl::from_path(input)).await?;

    editor.drag_to(TrimHandle::Start, start);
    editor.drag_to(TrimHandle::End, end);
    let window = editor.window();
    if (window.start(), window.end()) != (start, end) {
        log::warn!(
            "handles settled at {:.1}%..{:.1}% (minimum gap {}%)",
            window.start(),
            window.end(),
            config.trim.min_gap_percent
        );
    }

    let outcome = editor.commit()?;
    write_resource(&store, &outcome.url, out).await?;
    println!(
        "✂️ Kept frames {}..{} ({:.2}s) in {}",
        outcome.start_frame,
        outcome.end_frame,
        outcome.duration_secs(),
        out.display()
    );
    Ok(())
}

async fn play(config: &StudioConfig, store: ResourceStore, input: &Path) -> anyhow::Result<()> {
    let mut coordinator =
        PlaybackCoordinator::new(Box::new(CpalOutput::new()), SampleDecoder::new(store))
            .with_global_volume(config.playback.global_volume);
    let name = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    let track = Track::new(name, ResourceUrl::from_path(input), 0.0);
    coordinator.play(&track, None).await?;

    let Some(clock) = coordinator.clock() else {
        bail!("playback did not start");
    };
    let total = clock.duration().as_secs_f64();
    let tracker = PositionTracker::spawn(clock.clone(), config.tracker.frame_interval(), move |p| {
        print!("\r⏱️ {:>6.2}s / {total:.2}s", p as f64 * total);
        let _ = std::io::stdout().flush();
    });

    while clock.is_playing() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tracker.stop();
    coordinator.stop();
    println!("\n⏹️ Done");
    Ok(())
}

fn inspect(input: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    if let Some(header) = PcmHeader::parse(&bytes) {
        println!(
            "PCM header: {} ch, {} Hz, block align {}, byte rate {}, data {} bytes",
            header.channels,
            header.sample_rate,
            header.block_align().unwrap_or_default(),
            header.byte_rate().unwrap_or_default(),
            header.data_size
        );
    }

    let hint = input.extension().and_then(|e| e.to_str());
    let buffer = decode_bytes(&bytes, hint)?;
    println!(
        "{}: {} Hz, {} ch, {} frames, {:.3}s",
        input.display(),
        buffer.sample_rate(),
        buffer.channel_count(),
        buffer.frame_count(),
        buffer.duration_secs()
    );
    Ok(())
}

async fn playlist(
    config: &StudioConfig,
    store: ResourceStore,
    action: PlaylistAction,
) -> anyhow::Result<()> {
    let library = JsonPlaylistStore::new(config.library.playlists_path());
    let mut playlists = library.load()?;
    log::debug!(
        "{} playlists in {}",
        playlists.len(),
        library.path().display()
    );

    match action {
        PlaylistAction::List => {
            if playlists.is_empty() {
                println!("No playlists in {}", library.path().display());
            }
            for list in &playlists {
                println!(
                    "📃 {} ({} tracks, {:.1}s{})",
                    list.name,
                    list.tracks.len(),
                    list.total_duration_secs(),
                    if list.is_looping { ", looping" } else { "" }
                );
                for track in &list.tracks {
                    println!("   {:.1}s  {}  {}", track.duration_secs, track.name, track.url);
                }
            }
            Ok(())
        }
        PlaylistAction::Create { name, looping } => {
            if playlists.iter().any(|p| p.name == name) {
                bail!("a playlist named {name:?} already exists");
            }
            let mut list = Playlist::new(name);
            list.is_looping = looping;
            println!("📃 Created {} ({})", list.name, list.id);
            playlists.push(list);
            library.save(&playlists)
        }
        PlaylistAction::Add {
            playlist,
            input,
            volume,
        } => {
            let path = std::path::absolute(&input)
                .with_context(|| format!("resolving {}", input.display()))?;
            let url = ResourceUrl::from_path(&path);
            let buffer = SampleDecoder::new(store).decode(&url).await?;
            let Some(list) = find_playlist_mut(&mut playlists, &playlist) else {
                bail!("no playlist named {playlist:?}");
            };

            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let mut track = Track::new(name, url, buffer.duration_secs());
            track.volume = volume.clamp(0.0, 1.0);
            println!("➕ {} ({:.1}s) -> {}", track.name, track.duration_secs, list.name);
            list.add_track(track);
            library.save(&playlists)
        }
        PlaylistAction::Play { playlist } => {
            let Some(list) = find_playlist_mut(&mut playlists, &playlist) else {
                bail!("no playlist named {playlist:?}");
            };
            let list = list.clone();
            let Some(first) = list.tracks.first() else {
                bail!("playlist {:?} has no tracks", list.name);
            };

            let mut coordinator =
                PlaybackCoordinator::new(Box::new(CpalOutput::new()), SampleDecoder::new(store))
                    .with_global_volume(config.playback.global_volume);
            coordinator.play(first, Some(&list)).await?;
            let mut announced = String::new();
            while let Some(track) = coordinator.now_playing() {
                if track.id != announced {
                    println!("▶️ {}", track.name);
                    announced = track.id.clone();
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
                coordinator.advance().await?;
            }
            println!("⏹️ Done");
            Ok(())
        }
    }
}
