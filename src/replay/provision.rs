//! Entity re-provisioning on playback entry.
//!
//! Tracked entities are destroyed, and after a short delay (hosts need a
//! frame or two to finish destruction) a fresh roster is spawned and given
//! the first frame's identity and cosmetics.

use std::time::Duration;

use super::apply::apply_initial_state;
use crate::host::Host;
use crate::schema::{FrameSnapshot, ReplayConfig};

/// Number of entities to spawn for a first frame with `recorded` entities.
pub fn spawn_count(recorded: usize, fraction: f32) -> usize {
    (recorded as f64 * fraction as f64).floor() as usize
}

/// A re-provisioning in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioner {
    due: Duration,
    spawn_count: usize,
}

impl Provisioner {
    /// Destroy the current tracked entities and schedule the respawn.
    ///
    /// Returns `None`, with nothing destroyed, if the host cannot spawn;
    /// playback then drives whatever entities already exist.
    pub fn begin<H: Host>(
        host: &mut H,
        first: &FrameSnapshot,
        config: &ReplayConfig,
        now: Duration,
    ) -> Option<Self> {
        if let Err(e) = host.spawn_ready() {
            log::error!("{e}; playing back onto existing entities");
            return None;
        }

        let existing = host.tagged(&config.entity_tag);
        log::debug!("Destroying {} tracked entities", existing.len());
        for entity in existing {
            host.destroy(entity);
        }

        Some(Self {
            due: now + config.respawn_delay(),
            spawn_count: spawn_count(
                first.entity_count(),
                config.roster_instantiation_fraction,
            ),
        })
    }

    pub fn due(&self) -> Duration {
        self.due
    }

    /// Finish provisioning once the delay has passed.
    ///
    /// Returns `true` when done.
    pub fn poll<H: Host>(
        &self,
        host: &mut H,
        first: &FrameSnapshot,
        config: &ReplayConfig,
        now: Duration,
    ) -> bool {
        if now < self.due {
            return false;
        }

        let mut spawned = 0;
        for _ in 0..self.spawn_count {
            match host.spawn() {
                Ok(entity) => {
                    if !host.disable_control(entity) {
                        log::warn!("Spawned entity {entity:?} has no controller to disable");
                    }
                    spawned += 1;
                }
                Err(e) => {
                    log::error!("{e}");
                    break;
                }
            }
        }

        let restored = apply_initial_state(host, first, config);
        log::info!("Spawned {spawned} entities, restored initial state on {restored}");

        match host.activate_spectator_camera() {
            Ok(()) => log::info!("Spectator camera activated"),
            Err(e) => log::warn!("{e}; keeping current camera"),
        }
        true
    }
}
