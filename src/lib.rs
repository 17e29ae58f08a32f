//! Puck Replay - Frame-accurate recording and playback of in-game entities.
//!
//! This crate samples the transforms, child-part poses, cosmetics and
//! identity of tagged entities (plus a single puck) at a fixed tick rate,
//! keeps an always-on rolling buffer of the last few seconds, saves
//! sequences to disk and plays them back onto live entities.
//!
//! # Architecture
//!
//! - `schema`: Configuration, transform codec and snapshot types
//! - `host`: Capability traits a game exposes its scene through
//! - `capture`: Entity sampler, frame store and sampling scheduler
//! - `replay`: Replay file format, storage and the playback engine
//! - `controller`: The command surface a host drives each update
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use puck_replay::{
//!     controller::ReplayController,
//!     host::MemoryHost,
//!     schema::{Pose, ReplayConfig},
//! };
//!
//! let mut host = MemoryHost::with_template("player(Clone)", "Player", &["body"]);
//! host.add_player("player(Clone)", "Player", Pose::default());
//!
//! let mut replay = ReplayController::new(ReplayConfig::default(), host).unwrap();
//! replay.start_recording();
//! for tick in 0..240u32 {
//!     replay.advance(Duration::from_secs_f64(1.0 / 120.0) * tick);
//! }
//! replay.stop_recording();
//! replay.play_recording().unwrap();
//!
//! println!("{:?}", replay.status());
//! ```

pub mod capture;
pub mod controller;
pub mod host;
pub mod replay;
pub mod schema;

// Re-export commonly used types
pub use capture::{FrameSequence, RollingBuffer};
pub use controller::{Notice, ReplayController, ReplayError, ReplayStatus};
pub use host::{Host, MemoryHost};
pub use replay::{PlaybackMode, ReplayStore};
pub use schema::{EntitySnapshot, FrameSnapshot, Pose, ReplayConfig};
