//! Host collaborator interface.
//!
//! The replay core never touches concrete engine types. A host exposes its
//! scene through these capability traits, keyed by an opaque entity handle:
//!
//! - [`Scene`]: enumeration, lookup, poses, hierarchy, spawn/destroy
//! - [`IdentityAccess`]: team, display name, handedness
//! - [`CosmeticsAccess`]: equipped appearance items
//!
//! Optional capabilities report absence through `None`/`false` rather than
//! errors; the core treats a missing capability as empty data.

mod memory;

pub use memory::{MemoryEntity, MemoryHost};

use std::fmt::Debug;
use std::hash::Hash;

use crate::schema::{CosmeticSelection, Identity, Pose, Team};

/// Errors reported by a host when a required scene anchor is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("Scene anchor not found: {0}")]
    MissingAnchor(String),
    #[error("Failed to spawn entity: {0}")]
    SpawnFailed(String),
}

/// Structural access to the live scene.
pub trait Scene {
    /// Opaque handle to a live object.
    type Entity: Copy + Eq + Hash + Debug;

    /// All live entities carrying `tag`, in host enumeration order.
    fn tagged(&self, tag: &str) -> Vec<Self::Entity>;

    /// A live object by exact name.
    fn find(&self, name: &str) -> Option<Self::Entity>;

    /// Object name, `None` if the handle is stale.
    fn name(&self, entity: Self::Entity) -> Option<String>;

    /// World pose, `None` if the handle is stale.
    fn pose(&self, entity: Self::Entity) -> Option<Pose>;

    /// Move an object. Stale handles are ignored.
    fn set_pose(&mut self, entity: Self::Entity, pose: Pose);

    /// Direct children, in hierarchy order.
    fn children(&self, entity: Self::Entity) -> Vec<Self::Entity>;

    /// Direct child by exact name.
    fn find_child(&self, entity: Self::Entity, name: &str) -> Option<Self::Entity>;

    /// Check that the spawn template and its owning game-mode root exist.
    fn spawn_ready(&self) -> Result<(), HostError>;

    /// Instantiate a fresh tracked entity from the host's template.
    fn spawn(&mut self) -> Result<Self::Entity, HostError>;

    /// Destroy an object.
    fn destroy(&mut self, entity: Self::Entity);

    /// Switch off player control. Returns `false` if the entity has none.
    fn disable_control(&mut self, entity: Self::Entity) -> bool;

    /// Switch the view to the spectator camera.
    fn activate_spectator_camera(&mut self) -> Result<(), HostError>;
}

/// Identity attributes of tracked entities.
pub trait IdentityAccess: Scene {
    /// `None` if the entity has no identity component.
    fn identity(&self, entity: Self::Entity) -> Option<Identity>;

    /// Each setter returns `false` if the entity has no identity component.
    fn set_team(&mut self, entity: Self::Entity, team: Team) -> bool;

    fn set_display_name(&mut self, entity: Self::Entity, name: &str) -> bool;

    fn set_right_handed(&mut self, entity: Self::Entity, right_handed: bool) -> bool;
}

/// Cosmetic selections of tracked entities.
pub trait CosmeticsAccess: Scene {
    /// Equipped `(slot, "item/variant")` pairs, `None` without a cosmetics
    /// component.
    fn equipped(&self, entity: Self::Entity) -> Option<Vec<(String, String)>>;

    /// Remove everything equipped in one slot.
    fn clear_slot(&mut self, entity: Self::Entity, slot: &str) -> bool;

    /// Forget all current selections.
    fn clear_selections(&mut self, entity: Self::Entity) -> bool;

    /// Equip one cosmetic.
    fn load_cosmetic(&mut self, entity: Self::Entity, cosmetic: &CosmeticSelection) -> bool;
}

/// Everything the replay core needs from a host.
pub trait Host: Scene + IdentityAccess + CosmeticsAccess {}

impl<T: Scene + IdentityAccess + CosmeticsAccess> Host for T {}
