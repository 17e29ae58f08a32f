//! Replay persistence and playback.
//!
//! Recorded sequences are stored one per file and played back onto live
//! entities by a cursor-driven engine that re-provisions the scene on entry.
//!
//! # File Format
//!
//! A `.dat` replay file holds one self-contained frame sequence, all
//! integers and floats little-endian:
//!
//! ```text
//! Header (36 bytes):
//!   Magic: "PKRP" (4 bytes)
//!   Version: u16
//!   Flags: u16 (reserved, zero)
//!   Frame count: u64
//!   Recording interval: f32 (seconds)
//!   Reserved: 16 bytes
//!
//! Frame (repeated frame count times):
//!   Puck present: u8, then Pose if 1
//!   Entity count: u32, then per entity:
//!     Pose: 7 * f32 (position xyz, rotation xyzw)
//!     Child count: u32, then per child: name (str) + Pose
//!     Cosmetic count: u32, then per cosmetic: slot, item, variant (str)
//!     Identity mask: u8 (1 = team, 2 = name, 4 = handedness)
//!       team: i32, name: str, handedness: u8, each only if flagged
//!
//! str = length u32 + UTF-8 bytes
//! ```
//!
//! There is no cross-version compatibility: other versions are rejected.

mod apply;
pub mod format;
mod player;
mod provision;
mod store;

pub use apply::{Roster, apply_entity_pose, apply_frame, apply_initial_state};
pub use format::{REPLAY_MAGIC, REPLAY_VERSION, ReplayHeader};
pub use player::{PlaybackEngine, PlaybackError, PlaybackMode};
pub use provision::{Provisioner, spawn_count};
pub use store::{PersistError, REPLAY_EXTENSION, ReplayStore, SaveTicket};
