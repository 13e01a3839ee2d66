// src/cli.rs

use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

/// Record, trim and play spoken affirmations
#[derive(Parser, Debug)]
#[command(name = "affirm")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Studio settings (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture from the microphone into a WAV file
    Record {
        #[arg(long, default_value_t = 5)]
        seconds: u64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the waveform of an audio file
    Waveform {
        input: PathBuf,
        #[arg(long, default_value_t = 80)]
        cols: usize,
        #[arg(long, default_value_t = 12)]
        rows: usize,
        /// Envelope only, no handles or masks
        #[arg(long)]
        compact: bool,
    },
    /// Keep the part between two percentages and write it as WAV
    Trim {
        input: PathBuf,
        #[arg(long, default_value_t = 0.0)]
        start: f64,
        #[arg(long, default_value_t = 100.0)]
        end: f64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Play a file on the default output device
    Play { input: PathBuf },
    /// Show the format of a file
    Inspect { input: PathBuf },
    /// Manage the playlist library
    Playlist {
        #[command(subcommand)]
        action: PlaylistAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlaylistAction {
    /// Show every playlist and its tracks
    List,
    /// Start an empty playlist
    Create {
        name: String,
        /// Start over from the first track after the last one
        #[arg(long = "loop")]
        looping: bool,
    },
    /// Append an audio file to a playlist
    Add {
        /// Playlist name or id
        playlist: String,
        input: PathBuf,
        /// Track volume, 0 to 1
        #[arg(long, default_value_t = 1.0)]
        volume: f32,
    },
    /// Play a playlist from its first track
    Play {
        /// Playlist name or id
        playlist: String,
    },
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

pub fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    // Dependencies stay at warn.
    builder.filter_level(LevelFilter::Warn);
    builder.filter_module("affirm_audio", args.log_level());
    builder.filter_module("affirm", args.log_level());

    builder.format_timestamp_millis().init();
}
