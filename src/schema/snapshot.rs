//! Per-tick snapshot types captured from the live scene.

use serde::{Deserialize, Serialize};

use super::Pose;

/// Variant used when a cosmetic key carries no variant segment.
pub const DEFAULT_VARIANT: &str = "default";

/// Team affiliation as reported by the host.
///
/// Opaque to the replay core; the raw value is stored and handed back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team(pub i32);

/// Pose of a named direct child of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildPartSnapshot {
    /// Child name, matched exactly against the live hierarchy on apply.
    pub name: String,
    pub pose: Pose,
}

/// One equipped cosmetic item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmeticSelection {
    /// Slot type, e.g. `"hat"`.
    pub slot: String,
    pub item: String,
    pub variant: String,
}

impl CosmeticSelection {
    pub fn new(
        slot: impl Into<String>,
        item: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            slot: slot.into(),
            item: item.into(),
            variant: variant.into(),
        }
    }

    /// Combined `item/variant` key, the form the host reports.
    pub fn full_key(&self) -> String {
        format!("{}/{}", self.item, self.variant)
    }
}

/// Identity attributes of an entity.
///
/// Each field is `None` when the entity did not expose it, which is distinct
/// from a present default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub team: Option<Team>,
    pub display_name: Option<String>,
    pub right_handed: Option<bool>,
}

impl Identity {
    /// True if no attribute is present.
    pub fn is_empty(&self) -> bool {
        self.team.is_none() && self.display_name.is_none() && self.right_handed.is_none()
    }
}

/// Full captured state of one tracked entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub pose: Pose,
    pub children: Vec<ChildPartSnapshot>,
    pub cosmetics: Vec<CosmeticSelection>,
    pub identity: Identity,
}

impl EntitySnapshot {
    /// Look up a child snapshot by exact name.
    pub fn child(&self, name: &str) -> Option<&ChildPartSnapshot> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Captured state of the whole scene at one tick.
///
/// `entities` is in enumeration order at capture time; that order is the
/// only correspondence key used during playback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub entities: Vec<EntitySnapshot>,
    /// `None` if the puck could not be located when the frame was taken.
    pub puck: Option<Pose>,
}

impl FrameSnapshot {
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}
