//! Command surface tying sampling, storage and playback together.
//!
//! A host owns one [`ReplayController`], forwards input commands to it and
//! calls [`ReplayController::advance`] once per update.

use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::capture::{FrameSequence, RollingBuffer, SamplingScheduler};
use crate::host::Host;
use crate::replay::{
    PersistError, PlaybackEngine, PlaybackError, PlaybackMode, ReplayStore, SaveTicket,
};
use crate::schema::{ConfigError, ReplayConfig};

/// Errors returned by controller commands.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// User-facing messages for a UI layer to show as pop-ups.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    RecordingStarted,
    RecordingSaved(PathBuf),
    ClipSaved(PathBuf),
    PlaybackStarted { frames: usize },
    PlaybackFinished,
    NoFrames,
    LoadFailed(String),
    SaveFailed(String),
}

/// Read-only status for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStatus {
    pub mode: PlaybackMode,
    pub cursor: usize,
    pub frame_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveKind {
    Recording,
    Clip,
}

#[derive(Debug)]
struct PendingSave {
    kind: SaveKind,
    ticket: SaveTicket,
}

/// Recorder and player for one host scene.
///
/// Usage:
/// ```ignore
/// let mut replay = ReplayController::new(ReplayConfig::default(), host)?;
/// replay.start_recording();
///
/// // Once per host update
/// replay.advance(now);
/// for notice in replay.take_notices() {
///     ui.popup(notice);
/// }
/// ```
pub struct ReplayController<H: Host> {
    config: ReplayConfig,
    host: H,
    scheduler: SamplingScheduler,
    session: Arc<FrameSequence>,
    engine: PlaybackEngine<H::Entity>,
    store: ReplayStore,
    saves: Vec<PendingSave>,
    notices: Vec<Notice>,
    now: Duration,
}

impl<H: Host> ReplayController<H> {
    /// Create a controller after validating `config`.
    pub fn new(config: ReplayConfig, host: H) -> Result<Self, ConfigError> {
        config.validate()?;
        log::info!(
            "Replay controller ready: {} frame buffer, saving to {}",
            config.buffer_capacity(),
            config.replay_dir.display()
        );
        Ok(Self {
            scheduler: SamplingScheduler::new(&config),
            session: Arc::default(),
            engine: PlaybackEngine::new(&config),
            store: ReplayStore::new(&config.replay_dir, config.recording_interval_secs as f32),
            saves: Vec::new(),
            notices: Vec::new(),
            now: Duration::ZERO,
            config,
            host,
        })
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn store(&self) -> &ReplayStore {
        &self.store
    }

    /// The session recording, retained after recording stops.
    pub fn session(&self) -> &FrameSequence {
        &self.session
    }

    pub fn buffer(&self) -> &RollingBuffer {
        self.scheduler.buffer()
    }

    pub fn status(&self) -> ReplayStatus {
        let mode = self.engine.mode();
        let frame_count = if mode.has_playback() {
            self.engine.frame_count()
        } else {
            self.session.len()
        };
        ReplayStatus {
            mode,
            cursor: self.engine.cursor(),
            frame_count,
        }
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        mem::take(&mut self.notices)
    }

    /// Number of background saves still running.
    pub fn pending_saves(&self) -> usize {
        self.saves.len()
    }

    /// Begin a fresh session recording, abandoning any playback.
    pub fn start_recording(&mut self) {
        if self.engine.mode() == PlaybackMode::Recording {
            log::debug!("Already recording, restarting session");
        }
        // A save still holding the old session keeps its own copy.
        self.session = Arc::new(FrameSequence::new());
        self.scheduler.start_session();
        self.engine.begin_recording();
        self.notices.push(Notice::RecordingStarted);
        log::info!("Recording started");
    }

    /// Stop recording and save the session in the background.
    ///
    /// The session stays in memory for [`play_recording`](Self::play_recording).
    /// Returns `false` if not recording.
    pub fn stop_recording(&mut self) -> bool {
        if !self.engine.end_recording() {
            return false;
        }
        log::info!("Recording stopped with {} frames", self.session.len());
        self.save(SaveKind::Recording);
        true
    }

    /// Copy the rolling buffer into the session recording and save it.
    ///
    /// Playback of the clip follows if the config asks for it.
    pub fn dump_buffer(&mut self) -> Result<(), ReplayError> {
        let clip = self.scheduler.buffer().to_sequence();
        if clip.is_empty() {
            log::warn!("Rolling buffer is empty, nothing to dump");
            self.notices.push(Notice::NoFrames);
            return Err(PlaybackError::NoFrames.into());
        }

        self.stop_recording();
        log::info!("Dumping {} buffered frames", clip.len());
        self.session = Arc::new(clip);
        self.save(SaveKind::Clip);

        if self.config.play_after_dump {
            self.play(Arc::clone(&self.session))?;
        }
        Ok(())
    }

    /// Load a replay file and start playing it.
    ///
    /// On failure nothing in memory changes.
    pub fn load_replay<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ReplayError> {
        let frames = match self.store.load(path) {
            Ok(frames) => frames,
            Err(e) => {
                log::error!("Failed to load replay: {e}");
                self.notices.push(Notice::LoadFailed(e.to_string()));
                return Err(e.into());
            }
        };

        // An empty replay is refused without ending a recording in progress.
        if !frames.is_empty() {
            self.stop_recording();
        }
        self.play(Arc::new(frames))
    }

    /// Play the in-memory session recording.
    pub fn play_recording(&mut self) -> Result<(), ReplayError> {
        if !self.session.is_empty() {
            self.stop_recording();
        }
        self.play(Arc::clone(&self.session))
    }

    /// Returns the new paused state, or `None` outside playback.
    pub fn toggle_pause(&mut self) -> Option<bool> {
        self.engine.toggle_pause()
    }

    pub fn seek(&mut self, delta_secs: f64) -> bool {
        self.engine.seek(delta_secs)
    }

    pub fn seek_forward(&mut self) -> bool {
        self.engine.seek(self.config.seek_step_secs)
    }

    pub fn seek_back(&mut self) -> bool {
        self.engine.seek(-self.config.seek_step_secs)
    }

    /// Return to `Idle` from any state.
    ///
    /// A recording in progress is ended without saving; its frames remain
    /// available to [`play_recording`](Self::play_recording).
    pub fn stop_and_reset(&mut self) {
        if self.engine.mode() == PlaybackMode::Recording {
            log::warn!(
                "Recording of {} frames ended without saving",
                self.session.len()
            );
        }
        self.engine.stop();
    }

    /// Per-update entry point: sample, advance playback, collect saves.
    pub fn advance(&mut self, now: Duration) {
        self.now = now;

        let session = if self.engine.mode() == PlaybackMode::Recording {
            Some(Arc::make_mut(&mut self.session))
        } else {
            None
        };
        self.scheduler.advance(&self.host, now, session);

        if self.engine.advance(&mut self.host, now) {
            self.notices.push(Notice::PlaybackFinished);
        }

        self.poll_saves();
    }

    /// Turn finished background saves into notices. Returns how many finished.
    pub fn poll_saves(&mut self) -> usize {
        let mut finished = 0;
        let mut i = 0;
        while i < self.saves.len() {
            match self.saves[i].ticket.try_result() {
                Some(result) => {
                    let save = self.saves.swap_remove(i);
                    self.report_save(save.kind, &result);
                    finished += 1;
                }
                None => i += 1,
            }
        }
        finished
    }

    /// Block until every background save has finished.
    pub fn wait_for_saves(&mut self) -> Vec<Result<PathBuf, PersistError>> {
        let saves = mem::take(&mut self.saves);
        saves
            .into_iter()
            .map(|save| {
                let result = save.ticket.wait();
                self.report_save(save.kind, &result);
                result
            })
            .collect()
    }

    fn save(&mut self, kind: SaveKind) {
        let ticket = self.store.save_in_background(Arc::clone(&self.session));
        self.saves.push(PendingSave { kind, ticket });
    }

    fn play(&mut self, frames: Arc<FrameSequence>) -> Result<(), ReplayError> {
        let count = frames.len();
        match self.engine.start(frames, &mut self.host, self.now) {
            Ok(()) => {
                self.notices.push(Notice::PlaybackStarted { frames: count });
                Ok(())
            }
            Err(e) => {
                self.notices.push(Notice::NoFrames);
                Err(e.into())
            }
        }
    }

    fn report_save(&mut self, kind: SaveKind, result: &Result<PathBuf, PersistError>) {
        let notice = match (kind, result) {
            (SaveKind::Recording, Ok(path)) => Notice::RecordingSaved(path.clone()),
            (SaveKind::Clip, Ok(path)) => Notice::ClipSaved(path.clone()),
            (_, Err(e)) => Notice::SaveFailed(e.to_string()),
        };
        self.notices.push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryHost, Scene};
    use crate::schema::Pose;
    use tempfile::{TempDir, tempdir};

    fn tick(i: u32) -> Duration {
        Duration::from_millis(10) * i
    }

    fn controller(dir: &TempDir) -> ReplayController<MemoryHost> {
        let config = ReplayConfig {
            recording_interval_secs: 0.01,
            playback_interval_secs: 0.01,
            buffer_duration_secs: 0.1,
            respawn_delay_secs: 0.0,
            replay_dir: dir.path().to_path_buf(),
            ..ReplayConfig::default()
        };
        let mut host = MemoryHost::with_template("player(Clone)", "Player", &[]);
        for i in 0..4 {
            host.add_player("player(Clone)", "Player", Pose::at(i as f32, 0.0, 0.0));
        }
        ReplayController::new(config, host).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ReplayConfig {
            recording_interval_secs: 0.0,
            ..ReplayConfig::default()
        };
        assert!(ReplayController::new(config, MemoryHost::new()).is_err());
    }

    #[test]
    fn test_record_stop_and_save() {
        let dir = tempdir().unwrap();
        let mut replay = controller(&dir);
        replay.start_recording();
        for i in 0..20 {
            replay.advance(tick(i));
        }
        assert_eq!(replay.status().frame_count, 20);
        assert!(replay.stop_recording());
        assert!(!replay.stop_recording());
        assert_eq!(replay.status().mode, PlaybackMode::Idle);

        let results = replay.wait_for_saves();
        assert_eq!(results.len(), 1);
        let path = results[0].as_ref().unwrap();
        assert_eq!(replay.store().load(path).unwrap(), *replay.session());

        let notices = replay.take_notices();
        assert_eq!(notices[0], Notice::RecordingStarted);
        assert_eq!(notices[1], Notice::RecordingSaved(path.clone()));
        assert!(replay.take_notices().is_empty());
    }

    #[test]
    fn test_recording_resumes_while_save_in_flight() {
        let dir = tempdir().unwrap();
        let mut replay = controller(&dir);
        replay.start_recording();
        for i in 0..5 {
            replay.advance(tick(i));
        }
        replay.stop_recording();
        replay.start_recording();
        for i in 5..8 {
            replay.advance(tick(i));
        }

        // The save may already have been collected by `advance`.
        replay.wait_for_saves();
        let path = replay
            .take_notices()
            .into_iter()
            .find_map(|notice| match notice {
                Notice::RecordingSaved(path) => Some(path),
                _ => None,
            })
            .unwrap();
        assert_eq!(replay.store().load(path).unwrap().len(), 5);
        assert_eq!(replay.session().len(), 3);
    }

    #[test]
    fn test_dump_buffer_saves_and_plays() {
        let dir = tempdir().unwrap();
        let mut replay = controller(&dir);
        for i in 0..30 {
            replay.advance(tick(i));
        }
        assert_eq!(replay.buffer().len(), 10);

        replay.dump_buffer().unwrap();
        assert_eq!(replay.session().len(), 10);
        assert_eq!(replay.status().mode, PlaybackMode::Playing);
        assert_eq!(replay.status().frame_count, 10);

        let results = replay.wait_for_saves();
        assert!(results[0].is_ok());
        let notices = replay.take_notices();
        assert!(notices.contains(&Notice::PlaybackStarted { frames: 10 }));
        assert!(matches!(notices.last(), Some(Notice::ClipSaved(_))));
    }

    #[test]
    fn test_dump_without_frames() {
        let dir = tempdir().unwrap();
        let mut replay = controller(&dir);
        assert!(matches!(
            replay.dump_buffer(),
            Err(ReplayError::Playback(PlaybackError::NoFrames))
        ));
        assert_eq!(replay.take_notices(), vec![Notice::NoFrames]);
        assert_eq!(replay.pending_saves(), 0);
    }

    #[test]
    fn test_dump_while_recording_saves_both() {
        let dir = tempdir().unwrap();
        let mut replay = controller(&dir);
        replay.start_recording();
        for i in 0..4 {
            replay.advance(tick(i));
        }
        replay.dump_buffer().unwrap();
        assert_eq!(replay.wait_for_saves().len(), 2);
        assert_eq!(replay.status().mode, PlaybackMode::Playing);
    }

    #[test]
    fn test_load_failure_keeps_state() {
        let dir = tempdir().unwrap();
        let mut replay = controller(&dir);
        replay.start_recording();
        replay.advance(tick(0));

        let err = replay.load_replay(dir.path().join("missing.dat")).unwrap_err();
        assert!(matches!(err, ReplayError::Persist(_)));
        assert_eq!(replay.status().mode, PlaybackMode::Recording);
        assert_eq!(replay.session().len(), 1);
        assert!(matches!(
            replay.take_notices().last(),
            Some(Notice::LoadFailed(_))
        ));
    }

    #[test]
    fn test_play_recording_then_finish() {
        let dir = tempdir().unwrap();
        let mut replay = controller(&dir);
        replay.start_recording();
        for i in 0..3 {
            replay.advance(tick(i));
        }
        replay.play_recording().unwrap();
        assert_eq!(replay.pending_saves(), 1);
        assert_eq!(replay.host().tagged("Player").len(), 0);

        for i in 3..10 {
            replay.advance(tick(i));
        }
        assert_eq!(replay.status().mode, PlaybackMode::Finished);
        assert_eq!(replay.host().tagged("Player").len(), 2);
        replay.wait_for_saves();
        assert!(replay.take_notices().contains(&Notice::PlaybackFinished));
    }

    #[test]
    fn test_seek_steps_and_reset() {
        let dir = tempdir().unwrap();
        let mut replay = controller(&dir);
        assert!(!replay.seek_forward());

        replay.start_recording();
        for i in 0..1000 {
            replay.advance(tick(i));
        }
        replay.play_recording().unwrap();
        assert!(replay.seek_forward());
        assert_eq!(replay.status().cursor, 500);
        assert!(replay.seek_back());
        assert_eq!(replay.status().cursor, 0);

        replay.stop_and_reset();
        assert_eq!(
            replay.status(),
            ReplayStatus {
                mode: PlaybackMode::Idle,
                cursor: 0,
                frame_count: 1000,
            }
        );
        replay.wait_for_saves();
    }
}
