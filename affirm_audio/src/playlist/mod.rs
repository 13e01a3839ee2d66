// src/playlist/mod.rs

pub mod store;

pub use store::{JsonPlaylistStore, PlaylistStore};

use crate::resource::ResourceUrl;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn unit_volume() -> f32 {
    1.0
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
    pub url: ResourceUrl,
    #[serde(default)]
    pub duration_secs: f64,
    #[serde(default = "unit_volume")]
    pub volume: f32,
}

impl Track {
    pub fn new(name: impl Into<String>, url: ResourceUrl, duration_secs: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            url,
            duration_secs,
            volume: 1.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub is_looping: bool,
    #[serde(default = "unit_volume")]
    pub volume: f32,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            tracks: Vec::new(),
            is_looping: false,
            volume: 1.0,
        }
    }

    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub fn remove_track(&mut self, track_id: &str) -> Option<Track> {
        let index = self.tracks.iter().position(|t| t.id == track_id)?;
        Some(self.tracks.remove(index))
    }

    pub fn track(&self, track_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.is_looping = !self.is_looping;
        self.is_looping
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }

    /// The track that follows `track_id`; wraps to the first one when looping.
    pub fn next_after(&self, track_id: &str) -> Option<&Track> {
        let index = self.tracks.iter().position(|t| t.id == track_id)?;
        match self.tracks.get(index + 1) {
            Some(next) => Some(next),
            None if self.is_looping => self.tracks.first(),
            None => None,
        }
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.tracks.iter().map(|t| t.duration_secs).sum()
    }
}

/// Look a playlist up by id first, then by name.
pub fn find_playlist_mut<'a>(
    playlists: &'a mut [Playlist],
    key: &str,
) -> Option<&'a mut Playlist> {
    let index = playlists
        .iter()
        .position(|p| p.id == key)
        .or_else(|| playlists.iter().position(|p| p.name == key))?;
    playlists.get_mut(index)
}

pub(crate) fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) }
}

/// Output gain for a track: the global, playlist and track levels multiplied.
pub fn effective_volume(global: f32, playlist: f32, track: f32) -> f32 {
    clamp_volume(global) * clamp_volume(playlist) * clamp_volume(track)
}
