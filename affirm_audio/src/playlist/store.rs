// src/playlist/store.rs

use super::Playlist;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

/// Persistence for the playlist library.
pub trait PlaylistStore {
    fn load(&self) -> Result<Vec<Playlist>>;
    fn save(&self, playlists: &[Playlist]) -> Result<()>;
}

const LIBRARY_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct LibraryManifest {
    version: u32,
    playlists: Vec<Playlist>,
}

/// Pretty-printed JSON file on disk.
pub struct JsonPlaylistStore {
    path: PathBuf,
}

impl JsonPlaylistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlaylistStore for JsonPlaylistStore {
    /// A missing file is an empty library.
    fn load(&self) -> Result<Vec<Playlist>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("opening {}", self.path.display()));
            }
        };
        let manifest: LibraryManifest = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", self.path.display()))?;
        if manifest.version > LIBRARY_VERSION {
            log::warn!(
                "{} was written by a newer version ({}); loading anyway",
                self.path.display(),
                manifest.version
            );
        }
        Ok(manifest.playlists)
    }

    fn save(&self, playlists: &[Playlist]) -> Result<()> {
        for track in playlists.iter().flat_map(|p| &p.tracks) {
            if track.url.is_blob() {
                log::warn!(
                    "track {:?} points at in-memory audio ({}); it will not resolve after a restart",
                    track.name,
                    track.url
                );
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = File::create(&self.path)
            .with_context(|| format!("creating {}", self.path.display()))?;
        let manifest = LibraryManifest {
            version: LIBRARY_VERSION,
            playlists: playlists.to_vec(),
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &manifest)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::Track;
    use crate::resource::ResourceUrl;

    #[test]
    fn library_survives_a_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPlaylistStore::new(dir.path().join("library/playlists.json"));
        assert!(store.load().unwrap().is_empty());

        let mut list = Playlist::new("Evening");
        list.is_looping = true;
        list.set_volume(0.6);
        let mut track = Track::new("I am calm", ResourceUrl::new("takes/calm.wav"), 4.5);
        track.volume = 0.8;
        list.add_track(track);

        store.save(std::slice::from_ref(&list)).unwrap();
        assert_eq!(store.load().unwrap(), vec![list]);
    }

    #[test]
    fn files_use_camel_case_and_tolerate_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlists.json");
        std::fs::write(
            &path,
            r#"{"version":1,"playlists":[{"id":"p1","name":"Focus","isLooping":true,
                "tracks":[{"id":"t1","name":"Breathe","url":"takes/breathe.wav"}]}]}"#,
        )
        .unwrap();

        let lists = JsonPlaylistStore::new(&path).load().unwrap();
        assert!(lists[0].is_looping);
        assert_eq!(lists[0].volume, 1.0);
        assert_eq!(lists[0].tracks[0].volume, 1.0);
        assert_eq!(lists[0].tracks[0].url.as_str(), "takes/breathe.wav");
    }

    #[test]
    fn corrupt_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlists.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(JsonPlaylistStore::new(path).load().is_err());
    }
}
