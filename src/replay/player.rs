//! Playback engine for driving live entities from a recorded sequence.

use std::sync::Arc;
use std::time::Duration;

use super::apply::{Roster, apply_frame};
use super::provision::Provisioner;
use crate::capture::{FixedTicker, FrameSequence};
use crate::host::Host;
use crate::schema::ReplayConfig;

/// Errors from starting playback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("No recorded frames to play")]
    NoFrames,
}

/// The single state of the recorder/player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlaybackMode {
    #[default]
    Idle,
    Recording,
    Playing,
    Paused,
    Finished,
}

impl PlaybackMode {
    /// Whether a sequence is loaded into the engine.
    pub fn has_playback(self) -> bool {
        matches!(self, Self::Playing | Self::Paused | Self::Finished)
    }
}

/// Cursor-based player over a shared, read-only [`FrameSequence`].
///
/// Usage:
/// ```ignore
/// let mut engine = PlaybackEngine::new(&config);
/// engine.start(Arc::new(frames), &mut host, now)?;
///
/// // Once per host update
/// if engine.advance(&mut host, now) {
///     println!("Finished at frame {}", engine.cursor());
/// }
/// ```
#[derive(Debug)]
pub struct PlaybackEngine<E> {
    config: ReplayConfig,
    mode: PlaybackMode,
    frames: Arc<FrameSequence>,
    cursor: usize,
    ticker: FixedTicker,
    roster: Roster<E>,
    provisioning: Option<Provisioner>,
}

impl<E: Copy> PlaybackEngine<E> {
    pub fn new(config: &ReplayConfig) -> Self {
        Self {
            config: config.clone(),
            mode: PlaybackMode::Idle,
            frames: Arc::default(),
            cursor: 0,
            ticker: FixedTicker::new(config.playback_interval(), config.max_catch_up_ticks),
            roster: Roster::default(),
            provisioning: None,
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Index of the next frame to apply.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Length of the loaded sequence; zero when nothing is loaded.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &Arc<FrameSequence> {
        &self.frames
    }

    /// Whether entity re-provisioning is still waiting on its delay.
    pub fn is_provisioning(&self) -> bool {
        self.provisioning.is_some()
    }

    /// Enter `Recording`, abandoning any playback.
    pub fn begin_recording(&mut self) {
        if self.mode.has_playback() {
            self.unload();
        }
        self.mode = PlaybackMode::Recording;
    }

    /// Leave `Recording`. Returns `false` if not recording.
    pub fn end_recording(&mut self) -> bool {
        if self.mode != PlaybackMode::Recording {
            return false;
        }
        self.mode = PlaybackMode::Idle;
        true
    }

    /// Start playing `frames` from the beginning.
    ///
    /// An empty sequence is rejected with no state change and nothing
    /// destroyed. Otherwise live entities are re-provisioned from frame 0
    /// and the cursor holds at 0 until that completes.
    pub fn start<H: Host<Entity = E>>(
        &mut self,
        frames: Arc<FrameSequence>,
        host: &mut H,
        now: Duration,
    ) -> Result<(), PlaybackError> {
        let Some(first) = frames.first() else {
            log::warn!("No recorded frames to play");
            return Err(PlaybackError::NoFrames);
        };

        self.provisioning = Provisioner::begin(host, first, &self.config, now);
        self.frames = frames;
        self.cursor = 0;
        self.roster.clear();
        self.ticker.reset();
        self.mode = PlaybackMode::Playing;
        log::info!("Playback started: {} frames", self.frames.len());
        Ok(())
    }

    /// Toggle between `Playing` and `Paused`.
    ///
    /// Returns the new paused state, or `None` if neither applies.
    pub fn toggle_pause(&mut self) -> Option<bool> {
        match self.mode {
            PlaybackMode::Playing => {
                self.mode = PlaybackMode::Paused;
                log::info!("Playback paused at frame {}", self.cursor);
                Some(true)
            }
            PlaybackMode::Paused => {
                self.mode = PlaybackMode::Playing;
                // Time spent paused must not turn into catch-up ticks.
                self.ticker.reset();
                log::info!("Playback resumed at frame {}", self.cursor);
                Some(false)
            }
            _ => None,
        }
    }

    /// Move the cursor by `delta_secs` worth of frames and resume playing.
    ///
    /// The result is clamped to the sequence. Returns `false` when no
    /// sequence is loaded.
    pub fn seek(&mut self, delta_secs: f64) -> bool {
        if !self.mode.has_playback() || self.frames.is_empty() {
            return false;
        }

        let interval = self.config.playback_interval().as_secs_f64();
        let shift = (delta_secs / interval).round() as i64;
        let last = self.frames.len() as i64 - 1;
        self.cursor = (self.cursor as i64).saturating_add(shift).clamp(0, last) as usize;
        self.mode = PlaybackMode::Playing;
        self.ticker.reset();
        log::info!("Playback seeked to frame {}", self.cursor);
        true
    }

    /// Return to `Idle` from any state.
    pub fn stop(&mut self) {
        if self.mode != PlaybackMode::Idle {
            log::info!("Playback stopped and reset");
        }
        self.unload();
        self.mode = PlaybackMode::Idle;
    }

    /// Feed the current host time.
    ///
    /// Applies the newest due frame to the live roster. Returns `true` on
    /// the update where playback runs off the end of the sequence.
    pub fn advance<H: Host<Entity = E>>(&mut self, host: &mut H, now: Duration) -> bool {
        if self.mode != PlaybackMode::Playing {
            return false;
        }

        if let (Some(provisioner), Some(first)) = (&self.provisioning, self.frames.first()) {
            if !provisioner.poll(host, first, &self.config, now) {
                return false;
            }
            self.provisioning = None;
            self.ticker.reset();
        }

        let mut due = None;
        for _ in 0..self.ticker.advance(now) {
            if self.cursor < self.frames.len() {
                due = Some(self.cursor);
                self.cursor += 1;
            } else {
                self.mode = PlaybackMode::Finished;
                break;
            }
        }

        if let Some(index) = due {
            let frame = &self.frames[index];
            self.roster.refresh(
                host,
                &self.config.entity_tag,
                &self.config.puck_name,
                frame.entity_count(),
            );
            apply_frame(host, &self.roster, frame);
        }

        if self.mode == PlaybackMode::Finished {
            log::info!("Playback finished");
            return true;
        }
        false
    }

    fn unload(&mut self) {
        self.frames = Arc::default();
        self.cursor = 0;
        self.roster.clear();
        self.provisioning = None;
        self.ticker.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryEntity, MemoryHost, Scene};
    use crate::schema::{EntitySnapshot, FrameSnapshot, Pose};
    use proptest::prelude::*;

    fn tick(i: u32) -> Duration {
        Duration::from_millis(10) * i
    }

    fn config() -> ReplayConfig {
        ReplayConfig {
            playback_interval_secs: 0.01,
            respawn_delay_secs: 0.0,
            ..ReplayConfig::default()
        }
    }

    fn frames(count: usize, entities: usize) -> Arc<FrameSequence> {
        Arc::new(
            (0..count)
                .map(|i| FrameSnapshot {
                    entities: (0..entities)
                        .map(|e| EntitySnapshot {
                            pose: Pose::at(i as f32, e as f32, 0.0),
                            ..Default::default()
                        })
                        .collect(),
                    puck: None,
                })
                .collect(),
        )
    }

    fn playing(count: usize) -> (PlaybackEngine<MemoryEntity>, MemoryHost) {
        let mut host = MemoryHost::with_template("player(Clone)", "Player", &[]);
        let mut engine = PlaybackEngine::new(&config());
        engine.start(frames(count, 2), &mut host, tick(0)).unwrap();
        (engine, host)
    }

    #[test]
    fn test_empty_sequence_is_rejected() {
        let mut host = MemoryHost::with_template("player(Clone)", "Player", &[]);
        let existing = host.add_player("player(Clone)", "Player", Pose::default());
        let mut engine = PlaybackEngine::new(&config());

        let err = engine
            .start(Arc::new(FrameSequence::new()), &mut host, tick(0))
            .unwrap_err();
        assert_eq!(err, PlaybackError::NoFrames);
        assert_eq!(engine.mode(), PlaybackMode::Idle);
        assert!(host.is_alive(existing));
        assert_eq!(host.destroyed_count(), 0);
    }

    #[test]
    fn test_plays_through_to_finished() {
        let (mut engine, mut host) = playing(3);

        // Provisioning completes, then frame 0 is applied on the same update.
        assert!(!engine.advance(&mut host, tick(0)));
        assert!(!engine.is_provisioning());
        assert_eq!(engine.cursor(), 1);
        let live = host.tagged("Player")[0];
        assert_eq!(host.pose(live), Some(Pose::at(0.0, 0.0, 0.0)));

        assert!(!engine.advance(&mut host, tick(1)));
        assert!(!engine.advance(&mut host, tick(2)));
        assert_eq!(host.pose(live), Some(Pose::at(2.0, 0.0, 0.0)));
        assert!(engine.advance(&mut host, tick(3)));
        assert_eq!(engine.mode(), PlaybackMode::Finished);

        // No further advancing once finished.
        assert!(!engine.advance(&mut host, tick(4)));
        assert_eq!(engine.cursor(), 3);
    }

    #[test]
    fn test_cursor_holds_while_provisioning() {
        let mut host = MemoryHost::with_template("player(Clone)", "Player", &[]);
        let mut engine = PlaybackEngine::new(&ReplayConfig {
            respawn_delay_secs: 0.1,
            ..config()
        });
        engine.start(frames(50, 2), &mut host, tick(0)).unwrap();
        for i in 0..9 {
            engine.advance(&mut host, tick(i));
        }
        assert!(engine.is_provisioning());
        assert_eq!(engine.cursor(), 0);

        engine.advance(&mut host, tick(10));
        assert!(!engine.is_provisioning());
        assert_eq!(engine.cursor(), 1);
    }

    #[test]
    fn test_pause_twice_is_identity() {
        let (mut engine, mut host) = playing(10);
        engine.advance(&mut host, tick(0));
        engine.advance(&mut host, tick(1));
        let cursor = engine.cursor();

        assert_eq!(engine.toggle_pause(), Some(true));
        assert_eq!(engine.mode(), PlaybackMode::Paused);
        engine.advance(&mut host, tick(5));
        assert_eq!(engine.cursor(), cursor);

        assert_eq!(engine.toggle_pause(), Some(false));
        assert_eq!(engine.mode(), PlaybackMode::Playing);
        assert_eq!(engine.cursor(), cursor);
    }

    #[test]
    fn test_pause_outside_playback_is_ignored() {
        let mut engine: PlaybackEngine<MemoryEntity> = PlaybackEngine::new(&config());
        assert_eq!(engine.toggle_pause(), None);
        engine.begin_recording();
        assert_eq!(engine.toggle_pause(), None);
        assert_eq!(engine.mode(), PlaybackMode::Recording);
    }

    #[test]
    fn test_seek_unpauses_and_clamps() {
        let (mut engine, _host) = playing(100);
        engine.toggle_pause();

        assert!(engine.seek(0.25));
        assert_eq!(engine.cursor(), 25);
        assert_eq!(engine.mode(), PlaybackMode::Playing);

        assert!(engine.seek(-5.0));
        assert_eq!(engine.cursor(), 0);
        assert!(engine.seek(5.0));
        assert_eq!(engine.cursor(), 99);
    }

    #[test]
    fn test_seek_from_finished_resumes() {
        let (mut engine, mut host) = playing(2);
        for i in 0..4 {
            engine.advance(&mut host, tick(i));
        }
        assert_eq!(engine.mode(), PlaybackMode::Finished);
        assert!(engine.seek(-0.01));
        assert_eq!(engine.mode(), PlaybackMode::Playing);
        assert_eq!(engine.cursor(), 1);
    }

    #[test]
    fn test_stop_resets_everything() {
        let (mut engine, mut host) = playing(10);
        engine.advance(&mut host, tick(0));
        engine.stop();
        assert_eq!(engine.mode(), PlaybackMode::Idle);
        assert_eq!(engine.cursor(), 0);
        assert_eq!(engine.frame_count(), 0);
        assert!(!engine.seek(1.0));
    }

    #[test]
    fn test_playback_never_mutates_frames() {
        let shared = frames(5, 2);
        let mut host = MemoryHost::with_template("player(Clone)", "Player", &[]);
        let mut engine = PlaybackEngine::new(&config());
        engine.start(Arc::clone(&shared), &mut host, tick(0)).unwrap();
        for i in 0..10 {
            engine.advance(&mut host, tick(i));
        }
        assert_eq!(*shared, *frames(5, 2));
        assert!(Arc::ptr_eq(&shared, engine.frames()));
    }

    proptest! {
        #[test]
        fn test_seek_stays_in_bounds(
            len in 1usize..400,
            start in 0usize..400,
            deltas in prop::collection::vec(-20.0f64..20.0, 1..8),
        ) {
            let (mut engine, _host) = playing(len);
            engine.seek(start.min(len - 1) as f64 * 0.01);
            for delta in deltas {
                prop_assert!(engine.seek(delta));
                prop_assert!(engine.cursor() < len);
            }
        }
    }
}
