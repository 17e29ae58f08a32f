//! Writing recorded snapshots back onto live entities.
//!
//! Correspondence is positional: recorded entity `i` drives live roster
//! entry `i`. Surplus entries on either side are left alone.

use crate::host::Host;
use crate::schema::{EntitySnapshot, FrameSnapshot, ReplayConfig};

/// Live entities that receive playback frames.
///
/// The roster is re-enumerated on every frame until its size matches the
/// recorded entity count, then kept until cleared.
#[derive(Debug, Clone)]
pub struct Roster<E> {
    entities: Vec<E>,
    settled: bool,
    puck: Option<E>,
}

impl<E> Default for Roster<E> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            settled: false,
            puck: None,
        }
    }
}

impl<E: Copy> Roster<E> {
    pub fn clear(&mut self) {
        self.entities.clear();
        self.settled = false;
        self.puck = None;
    }

    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn puck(&self) -> Option<E> {
        self.puck
    }

    /// Refresh from the host unless already settled.
    pub fn refresh<H: Host<Entity = E>>(
        &mut self,
        host: &H,
        tag: &str,
        puck_name: &str,
        expected: usize,
    ) {
        if !self.settled {
            self.entities = host.tagged(tag);
            self.settled = self.entities.len() == expected;
        }
        if self.puck.is_none() {
            self.puck = host.find(puck_name);
        }
    }
}

/// Apply a snapshot's pose and child-part poses to one live entity.
///
/// Children missing from the live hierarchy are skipped. Returns the number
/// of children that were not found.
pub fn apply_entity_pose<H: Host>(
    host: &mut H,
    entity: H::Entity,
    snapshot: &EntitySnapshot,
) -> usize {
    host.set_pose(entity, snapshot.pose);
    let mut missing = 0;
    for child in &snapshot.children {
        match host.find_child(entity, &child.name) {
            Some(live) => host.set_pose(live, child.pose),
            None => missing += 1,
        }
    }
    missing
}

/// Apply one frame to the roster. Returns the number of entities updated.
pub fn apply_frame<H: Host>(
    host: &mut H,
    roster: &Roster<H::Entity>,
    frame: &FrameSnapshot,
) -> usize {
    let mut applied = 0;
    for (&entity, snapshot) in roster.entities().iter().zip(&frame.entities) {
        apply_entity_pose(host, entity, snapshot);
        applied += 1;
    }

    if let (Some(puck), Some(pose)) = (roster.puck(), frame.puck) {
        host.set_pose(puck, pose);
    }
    applied
}

/// One-time restore of identity, cosmetics and child poses from the first
/// frame onto freshly spawned entities.
///
/// Only live entities named like the roster marker are touched; indices
/// still count every tagged entity. Returns the number of entities restored.
pub fn apply_initial_state<H: Host>(
    host: &mut H,
    first: &FrameSnapshot,
    config: &ReplayConfig,
) -> usize {
    let live = host.tagged(&config.entity_tag);
    let mut restored = 0;

    for (&entity, snapshot) in live.iter().zip(&first.entities) {
        if host.name(entity).as_deref() != Some(config.roster_marker.as_str()) {
            continue;
        }

        if host.equipped(entity).is_some() {
            for slot in &config.cosmetic_slots {
                host.clear_slot(entity, slot);
            }
            host.clear_selections(entity);
            for cosmetic in &snapshot.cosmetics {
                if !host.load_cosmetic(entity, cosmetic) {
                    log::warn!("Could not load cosmetic {}/{}", cosmetic.slot, cosmetic.item);
                }
            }
        } else {
            log::error!("Cosmetics component not found on {entity:?}");
        }

        if host.identity(entity).is_some() {
            let identity = &snapshot.identity;
            if let Some(team) = identity.team {
                host.set_team(entity, team);
            }
            if let Some(name) = &identity.display_name {
                host.set_display_name(entity, name);
            }
            if let Some(right_handed) = identity.right_handed {
                host.set_right_handed(entity, right_handed);
            }
        } else {
            log::error!("Identity component not found on {entity:?}");
        }

        for child in &snapshot.children {
            match host.find_child(entity, &child.name) {
                Some(live_child) => host.set_pose(live_child, child.pose),
                None => log::error!("Child object '{}' not found on {entity:?}", child.name),
            }
        }

        restored += 1;
    }

    restored
}
