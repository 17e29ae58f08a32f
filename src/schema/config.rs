//! Configuration for recording, buffering and playback.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Largest rolling buffer accepted, in frames (about 2.4 hours at 120 Hz).
pub const MAX_BUFFER_FRAMES: usize = 1 << 20;

/// Seconds as a `Duration`, or `None` if negative, non-finite or too large.
fn duration_of(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

fn default_interval() -> f64 {
    1.0 / 120.0
}

fn default_buffer_duration() -> f64 {
    15.0
}

fn default_replay_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("SlapshotReboundReplays"))
        .unwrap_or_else(|| PathBuf::from("SlapshotReboundReplays"))
}

fn default_entity_tag() -> String {
    "Player".to_string()
}

fn default_puck_name() -> String {
    "puck(Clone)".to_string()
}

fn default_roster_marker() -> String {
    "player(Clone)".to_string()
}

fn default_cosmetic_slots() -> Vec<String> {
    [
        "hat",
        "gloves",
        "pants",
        "stick",
        "jersey",
        "back",
        "hairstyle",
        "mouth_decal",
        "face_decal",
        "eyes_decal",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_roster_fraction() -> f32 {
    0.5
}

fn default_respawn_delay() -> f64 {
    0.1
}

fn default_seek_step() -> f64 {
    5.0
}

fn default_max_catch_up() -> u32 {
    8
}

fn default_true() -> bool {
    true
}

/// Top-level replay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Seconds between samples (both session recording and rolling buffer).
    #[serde(default = "default_interval")]
    pub recording_interval_secs: f64,
    /// Seconds between applied frames during playback.
    #[serde(default = "default_interval")]
    pub playback_interval_secs: f64,
    /// Length of the rolling buffer in seconds.
    #[serde(default = "default_buffer_duration")]
    pub buffer_duration_secs: f64,
    /// Directory replay files are written to.
    #[serde(default = "default_replay_dir")]
    pub replay_dir: PathBuf,
    /// Tag used to enumerate tracked entities.
    #[serde(default = "default_entity_tag")]
    pub entity_tag: String,
    /// Name of the singleton puck object.
    #[serde(default = "default_puck_name")]
    pub puck_name: String,
    /// Entity name that receives initial identity and cosmetics on playback.
    #[serde(default = "default_roster_marker")]
    pub roster_marker: String,
    /// Cosmetic slot types cleared before initial cosmetics are loaded.
    #[serde(default = "default_cosmetic_slots")]
    pub cosmetic_slots: Vec<String>,
    /// Share of frame 0's entity count spawned on playback entry.
    ///
    /// A recorded roster holds two tagged objects per player, so the default
    /// spawns one fresh entity for every two recorded.
    #[serde(default = "default_roster_fraction")]
    pub roster_instantiation_fraction: f32,
    /// Pause between destroying and respawning entities.
    #[serde(default = "default_respawn_delay")]
    pub respawn_delay_secs: f64,
    /// Step used by the seek-forward and seek-back commands.
    #[serde(default = "default_seek_step")]
    pub seek_step_secs: f64,
    /// Upper bound on ticks run for a single host update.
    #[serde(default = "default_max_catch_up")]
    pub max_catch_up_ticks: u32,
    /// Start playback after dumping the rolling buffer.
    #[serde(default = "default_true")]
    pub play_after_dump: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            recording_interval_secs: default_interval(),
            playback_interval_secs: default_interval(),
            buffer_duration_secs: default_buffer_duration(),
            replay_dir: default_replay_dir(),
            entity_tag: default_entity_tag(),
            puck_name: default_puck_name(),
            roster_marker: default_roster_marker(),
            cosmetic_slots: default_cosmetic_slots(),
            roster_instantiation_fraction: default_roster_fraction(),
            respawn_delay_secs: default_respawn_delay(),
            seek_step_secs: default_seek_step(),
            max_catch_up_ticks: default_max_catch_up(),
            play_after_dump: true,
        }
    }
}

impl ReplayConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Number of frames the rolling buffer holds.
    #[inline]
    pub fn buffer_capacity(&self) -> usize {
        (self.buffer_duration_secs / self.recording_interval_secs).ceil() as usize
    }

    /// Unrepresentable values map to zero; `validate` rejects them.
    #[inline]
    pub fn recording_interval(&self) -> Duration {
        duration_of(self.recording_interval_secs).unwrap_or_default()
    }

    #[inline]
    pub fn playback_interval(&self) -> Duration {
        duration_of(self.playback_interval_secs).unwrap_or_default()
    }

    #[inline]
    pub fn respawn_delay(&self) -> Duration {
        duration_of(self.respawn_delay_secs).unwrap_or_default()
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        // Intervals below one nanosecond round to a zero `Duration`.
        let tick = |v: f64| duration_of(v).is_some_and(|d| !d.is_zero());
        if !tick(self.recording_interval_secs) {
            return Err(ConfigError::InvalidInterval("recording_interval_secs"));
        }
        if !tick(self.playback_interval_secs) {
            return Err(ConfigError::InvalidInterval("playback_interval_secs"));
        }
        if !positive(self.buffer_duration_secs) {
            return Err(ConfigError::InvalidBufferDuration);
        }
        let frames = (self.buffer_duration_secs / self.recording_interval_secs).ceil();
        if frames > MAX_BUFFER_FRAMES as f64 {
            return Err(ConfigError::BufferTooLarge {
                frames,
                max: MAX_BUFFER_FRAMES,
            });
        }
        if !(0.0..=1.0).contains(&self.roster_instantiation_fraction) {
            return Err(ConfigError::InvalidRosterFraction(
                self.roster_instantiation_fraction,
            ));
        }
        if duration_of(self.respawn_delay_secs).is_none() {
            return Err(ConfigError::InvalidRespawnDelay);
        }
        if !positive(self.seek_step_secs) {
            return Err(ConfigError::InvalidSeekStep);
        }
        if self.entity_tag.is_empty() {
            return Err(ConfigError::EmptyName("entity_tag"));
        }
        if self.puck_name.is_empty() {
            return Err(ConfigError::EmptyName("puck_name"));
        }
        if self.max_catch_up_ticks == 0 {
            return Err(ConfigError::InvalidCatchUp);
        }
        Ok(())
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be at least one nanosecond and finite")]
    InvalidInterval(&'static str),
    #[error("Buffer duration must be positive and finite")]
    InvalidBufferDuration,
    #[error("Rolling buffer of {frames} frames exceeds the limit of {max}")]
    BufferTooLarge { frames: f64, max: usize },
    #[error("Roster instantiation fraction {0} is outside [0, 1]")]
    InvalidRosterFraction(f32),
    #[error("Respawn delay must be non-negative and finite")]
    InvalidRespawnDelay,
    #[error("Seek step must be positive and finite")]
    InvalidSeekStep,
    #[error("{0} must not be empty")]
    EmptyName(&'static str),
    #[error("max_catch_up_ticks must be at least 1")]
    InvalidCatchUp,
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
