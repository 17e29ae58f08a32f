//! Entity sampler - read-only snapshot extraction from the live scene.

use crate::host::Host;
use crate::schema::{
    ChildPartSnapshot, CosmeticSelection, DEFAULT_VARIANT, EntitySnapshot, FrameSnapshot,
};

/// Split a host cosmetic key of the form `item/variant`.
///
/// A key without exactly one `/` keeps its first segment as the item and
/// takes the default variant.
pub fn parse_cosmetic_key(slot: &str, key: &str) -> CosmeticSelection {
    let parts: Vec<&str> = key.split('/').collect();
    let variant = if parts.len() == 2 {
        parts[1]
    } else {
        DEFAULT_VARIANT
    };
    CosmeticSelection::new(slot, parts[0], variant)
}

/// Snapshot one entity: pose, direct child poses, cosmetics and identity.
///
/// Returns `None` only if the handle is stale. Missing identity or cosmetics
/// capabilities yield empty data.
pub fn sample_entity<H: Host>(host: &H, entity: H::Entity) -> Option<EntitySnapshot> {
    let pose = host.pose(entity)?;

    let children = host
        .children(entity)
        .into_iter()
        .filter_map(|child| {
            Some(ChildPartSnapshot {
                name: host.name(child)?,
                pose: host.pose(child)?,
            })
        })
        .collect();

    let cosmetics = host
        .equipped(entity)
        .unwrap_or_default()
        .iter()
        .map(|(slot, key)| parse_cosmetic_key(slot, key))
        .collect();

    Some(EntitySnapshot {
        pose,
        children,
        cosmetics,
        identity: host.identity(entity).unwrap_or_default(),
    })
}

/// Snapshot every entity tagged `tag` plus the puck named `puck_name`.
pub fn sample_frame<H: Host>(host: &H, tag: &str, puck_name: &str) -> FrameSnapshot {
    let entities = host
        .tagged(tag)
        .into_iter()
        .filter_map(|e| sample_entity(host, e))
        .collect();
    let puck = host.find(puck_name).and_then(|p| host.pose(p));

    FrameSnapshot { entities, puck }
}
