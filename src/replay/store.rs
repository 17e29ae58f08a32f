//! Replay storage: timestamped files in one directory.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use super::format::{read_sequence, write_sequence};
use crate::capture::FrameSequence;

/// Extension of replay files.
pub const REPLAY_EXTENSION: &str = "dat";

/// Errors from saving or loading replay files.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Replay I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Replay file {} is corrupt or incompatible: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Save task ended without reporting a result")]
    SaveAborted,
}

impl PersistError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                PersistError::Corrupt { path, source }
            }
            _ => PersistError::Io { path, source },
        }
    }
}

/// Pending result of a background save.
#[derive(Debug)]
pub struct SaveTicket {
    rx: Receiver<Result<PathBuf, PersistError>>,
}

impl SaveTicket {
    /// Block until the save finishes.
    pub fn wait(self) -> Result<PathBuf, PersistError> {
        self.rx.recv().unwrap_or(Err(PersistError::SaveAborted))
    }

    /// The result if the save has finished, without blocking.
    pub fn try_result(&self) -> Option<Result<PathBuf, PersistError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PersistError::SaveAborted)),
        }
    }
}

/// Reads and writes replay files in a single directory.
///
/// Files are named `replay_<YYYYMMDD_HHmmss>.dat` after local time; a `_N`
/// suffix is added when a file for the same second already exists.
#[derive(Debug, Clone)]
pub struct ReplayStore {
    dir: PathBuf,
    interval_secs: f32,
}

impl ReplayStore {
    /// Store writing into `dir`; `interval_secs` is recorded in file headers.
    pub fn new<P: AsRef<Path>>(dir: P, interval_secs: f32) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval_secs,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `sequence` to a new uniquely named file. Blocks.
    pub fn save(&self, sequence: &FrameSequence) -> Result<PathBuf, PersistError> {
        fs::create_dir_all(&self.dir).map_err(|e| PersistError::from_io(&self.dir, e))?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let (path, file) = self.create_unique(&stamp)?;

        let written = {
            let mut writer = BufWriter::new(file);
            write_sequence(&mut writer, sequence, self.interval_secs)
                .and_then(|_| writer.flush())
        };
        if let Err(e) = written {
            // Leave no partial replay behind.
            let _ = fs::remove_file(&path);
            return Err(PersistError::from_io(&path, e));
        }

        log::info!(
            "Saved {} frames to {}",
            sequence.len(),
            path.display()
        );
        Ok(path)
    }

    /// Save on the background pool.
    ///
    /// The caller's `Arc` is the frozen snapshot; later changes to the
    /// recording never reach this save.
    pub fn save_in_background(&self, sequence: Arc<FrameSequence>) -> SaveTicket {
        let (tx, rx) = mpsc::channel();
        let store = self.clone();
        rayon::spawn(move || {
            let result = store.save(&sequence);
            if let Err(e) = &result {
                log::error!("Failed to save recording: {e}");
            }
            // The ticket may have been dropped; the log line is enough then.
            let _ = tx.send(result);
        });
        SaveTicket { rx }
    }

    /// Read a replay file. Blocks.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<FrameSequence, PersistError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PersistError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut reader = BufReader::new(file);
        let (header, sequence) =
            read_sequence(&mut reader).map_err(|e| PersistError::from_io(path, e))?;

        if (header.interval_secs - self.interval_secs).abs() > f32::EPSILON {
            log::warn!(
                "Replay {} was recorded at {}s intervals, playing at {}s",
                path.display(),
                header.interval_secs,
                self.interval_secs
            );
        }
        log::info!("Loaded {} frames from {}", sequence.len(), path.display());
        Ok(sequence)
    }

    fn create_unique(&self, stamp: &str) -> Result<(PathBuf, File), PersistError> {
        let mut suffix = 0u32;
        loop {
            let name = if suffix == 0 {
                format!("replay_{stamp}.{REPLAY_EXTENSION}")
            } else {
                format!("replay_{stamp}_{suffix}.{REPLAY_EXTENSION}")
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(PersistError::from_io(&path, e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntitySnapshot, FrameSnapshot, Pose};
    use tempfile::tempdir;

    fn sequence(frames: usize) -> FrameSequence {
        (0..frames)
            .map(|i| FrameSnapshot {
                entities: vec![EntitySnapshot {
                    pose: Pose::at(i as f32, 0.0, 0.0),
                    ..Default::default()
                }],
                puck: Some(Pose::at(0.0, 0.0, i as f32)),
            })
            .collect()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = ReplayStore::new(dir.path().join("replays"), 1.0 / 120.0);

        let recorded = sequence(25);
        let path = store.save(&recorded).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("replay_"));
        assert!(name.ends_with(".dat"));
        // replay_YYYYMMDD_HHmmss.dat
        assert_eq!(name.len(), "replay_".len() + 15 + ".dat".len());

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded, recorded);
    }

    #[test]
    fn test_same_second_saves_get_unique_names() {
        let dir = tempdir().unwrap();
        let store = ReplayStore::new(dir.path(), 0.5);
        let paths: Vec<_> = (0..3).map(|_| store.save(&sequence(1)).unwrap()).collect();
        assert_ne!(paths[0], paths[1]);
        assert_ne!(paths[1], paths[2]);
        assert_ne!(paths[0], paths[2]);
    }

    #[test]
    fn test_background_save() {
        let dir = tempdir().unwrap();
        let store = ReplayStore::new(dir.path(), 0.5);
        let frozen = Arc::new(sequence(4));
        let ticket = store.save_in_background(Arc::clone(&frozen));
        let path = ticket.wait().unwrap();
        assert_eq!(store.load(path).unwrap(), *frozen);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let store = ReplayStore::new(dir.path(), 0.5);
        let err = store.load(dir.path().join("nope.dat")).unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempdir().unwrap();
        let store = ReplayStore::new(dir.path(), 0.5);
        let path = dir.path().join("replay_bad.dat");
        fs::write(&path, b"not a replay at all, just some bytes here").unwrap();
        let err = store.load(&path).unwrap_err();
        assert!(matches!(err, PersistError::Corrupt { .. }));
    }

    #[test]
    fn test_save_into_unwritable_location() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        // A regular file where the directory should be.
        let store = ReplayStore::new(&blocker, 0.5);
        assert!(store.save(&sequence(1)).is_err());
    }
}
