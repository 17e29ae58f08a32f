//! In-memory scene implementing the host traits.
//!
//! Used by tests, benches and headless tooling that replays files without a
//! running game.

use std::collections::HashMap;

use super::{CosmeticsAccess, HostError, IdentityAccess, Scene};
use crate::schema::{CosmeticSelection, Identity, Pose, Team};

/// Handle into a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryEntity(pub u32);

#[derive(Debug, Clone)]
struct Object {
    name: String,
    tag: Option<String>,
    pose: Pose,
    children: Vec<MemoryEntity>,
    identity: Option<Identity>,
    cosmetics: Option<Vec<(String, String)>>,
    /// `Some(enabled)` if the object has a controller.
    control: Option<bool>,
}

impl Object {
    fn new(name: &str, tag: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            tag: tag.map(str::to_string),
            pose: Pose::default(),
            children: Vec::new(),
            identity: None,
            cosmetics: None,
            control: None,
        }
    }
}

/// Shape of entities created by [`Scene::spawn`].
#[derive(Debug, Clone)]
pub struct SpawnTemplate {
    pub name: String,
    pub tag: String,
    pub child_names: Vec<String>,
}

/// A flat, deterministic scene graph.
///
/// Objects are enumerated in creation order. Destroyed handles stay stale
/// forever; ids are never reused.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    objects: Vec<Option<Object>>,
    template: Option<SpawnTemplate>,
    camera_available: bool,
    camera_active: bool,
    destroyed: usize,
    spawned: usize,
}

impl MemoryHost {
    /// Empty scene without spawn template or spectator camera.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene able to spawn `name`-objects tagged `tag` with the given child
    /// parts, and with a spectator camera.
    pub fn with_template(name: &str, tag: &str, child_names: &[&str]) -> Self {
        Self {
            template: Some(SpawnTemplate {
                name: name.to_string(),
                tag: tag.to_string(),
                child_names: child_names.iter().map(|s| s.to_string()).collect(),
            }),
            camera_available: true,
            ..Self::default()
        }
    }

    /// Add a bare object. `tag` of `None` leaves it untracked.
    pub fn add_object(&mut self, name: &str, tag: Option<&str>, pose: Pose) -> MemoryEntity {
        let id = MemoryEntity(self.objects.len() as u32);
        let mut object = Object::new(name, tag);
        object.pose = pose;
        self.objects.push(Some(object));
        id
    }

    /// Add a fully featured tracked entity: identity, cosmetics and control.
    pub fn add_player(&mut self, name: &str, tag: &str, pose: Pose) -> MemoryEntity {
        let id = self.add_object(name, Some(tag), pose);
        if let Some(object) = self.object_mut(id) {
            object.identity = Some(Identity::default());
            object.cosmetics = Some(Vec::new());
            object.control = Some(true);
        }
        id
    }

    /// Attach a named child part to `parent`.
    pub fn add_child(&mut self, parent: MemoryEntity, name: &str, pose: Pose) -> MemoryEntity {
        let id = self.add_object(name, None, pose);
        if let Some(object) = self.object_mut(parent) {
            object.children.push(id);
        }
        id
    }

    pub fn set_identity(&mut self, entity: MemoryEntity, identity: Option<Identity>) {
        if let Some(object) = self.object_mut(entity) {
            object.identity = identity;
        }
    }

    pub fn set_equipped(&mut self, entity: MemoryEntity, equipped: Option<Vec<(String, String)>>) {
        if let Some(object) = self.object_mut(entity) {
            object.cosmetics = equipped;
        }
    }

    pub fn set_camera_available(&mut self, available: bool) {
        self.camera_available = available;
    }

    pub fn remove_template(&mut self) {
        self.template = None;
    }

    pub fn camera_active(&self) -> bool {
        self.camera_active
    }

    /// Whether the entity's controller is enabled.
    pub fn control_enabled(&self, entity: MemoryEntity) -> Option<bool> {
        self.object(entity).and_then(|o| o.control)
    }

    /// Total objects destroyed so far.
    pub fn destroyed_count(&self) -> usize {
        self.destroyed
    }

    /// Total entities spawned from the template so far.
    pub fn spawned_count(&self) -> usize {
        self.spawned
    }

    pub fn is_alive(&self, entity: MemoryEntity) -> bool {
        self.object(entity).is_some()
    }

    fn object(&self, entity: MemoryEntity) -> Option<&Object> {
        self.objects.get(entity.0 as usize).and_then(Option::as_ref)
    }

    fn object_mut(&mut self, entity: MemoryEntity) -> Option<&mut Object> {
        self.objects.get_mut(entity.0 as usize).and_then(Option::as_mut)
    }

    fn entities(&self) -> impl Iterator<Item = (MemoryEntity, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.as_ref().map(|o| (MemoryEntity(i as u32), o)))
    }
}

impl Scene for MemoryHost {
    type Entity = MemoryEntity;

    fn tagged(&self, tag: &str) -> Vec<MemoryEntity> {
        self.entities()
            .filter(|(_, o)| o.tag.as_deref() == Some(tag))
            .map(|(id, _)| id)
            .collect()
    }

    fn find(&self, name: &str) -> Option<MemoryEntity> {
        self.entities().find(|(_, o)| o.name == name).map(|(id, _)| id)
    }

    fn name(&self, entity: MemoryEntity) -> Option<String> {
        self.object(entity).map(|o| o.name.clone())
    }

    fn pose(&self, entity: MemoryEntity) -> Option<Pose> {
        self.object(entity).map(|o| o.pose)
    }

    fn set_pose(&mut self, entity: MemoryEntity, pose: Pose) {
        if let Some(object) = self.object_mut(entity) {
            object.pose = pose;
        }
    }

    fn children(&self, entity: MemoryEntity) -> Vec<MemoryEntity> {
        self.object(entity)
            .map(|o| {
                o.children
                    .iter()
                    .copied()
                    .filter(|c| self.is_alive(*c))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn find_child(&self, entity: MemoryEntity, name: &str) -> Option<MemoryEntity> {
        self.children(entity)
            .into_iter()
            .find(|c| self.object(*c).is_some_and(|o| o.name == name))
    }

    fn spawn_ready(&self) -> Result<(), HostError> {
        self.template
            .as_ref()
            .map(|_| ())
            .ok_or_else(|| HostError::MissingAnchor("spawn template".to_string()))
    }

    fn spawn(&mut self) -> Result<MemoryEntity, HostError> {
        let template = self
            .template
            .clone()
            .ok_or_else(|| HostError::MissingAnchor("spawn template".to_string()))?;
        let id = self.add_player(&template.name, &template.tag, Pose::default());
        for child in &template.child_names {
            self.add_child(id, child, Pose::default());
        }
        self.spawned += 1;
        Ok(id)
    }

    fn destroy(&mut self, entity: MemoryEntity) {
        let children = self.children(entity);
        let Some(slot) = self.objects.get_mut(entity.0 as usize) else {
            return;
        };
        if slot.take().is_some() {
            self.destroyed += 1;
            for child in children {
                if let Some(c) = self.objects.get_mut(child.0 as usize) {
                    *c = None;
                }
            }
        }
    }

    fn disable_control(&mut self, entity: MemoryEntity) -> bool {
        match self.object_mut(entity).and_then(|o| o.control.as_mut()) {
            Some(enabled) => {
                *enabled = false;
                true
            }
            None => false,
        }
    }

    fn activate_spectator_camera(&mut self) -> Result<(), HostError> {
        if !self.camera_available {
            return Err(HostError::MissingAnchor("spectator camera".to_string()));
        }
        self.camera_active = true;
        Ok(())
    }
}

impl IdentityAccess for MemoryHost {
    fn identity(&self, entity: MemoryEntity) -> Option<Identity> {
        self.object(entity).and_then(|o| o.identity.clone())
    }

    fn set_team(&mut self, entity: MemoryEntity, team: Team) -> bool {
        self.identity_mut(entity)
            .map(|id| id.team = Some(team))
            .is_some()
    }

    fn set_display_name(&mut self, entity: MemoryEntity, name: &str) -> bool {
        self.identity_mut(entity)
            .map(|id| id.display_name = Some(name.to_string()))
            .is_some()
    }

    fn set_right_handed(&mut self, entity: MemoryEntity, right_handed: bool) -> bool {
        self.identity_mut(entity)
            .map(|id| id.right_handed = Some(right_handed))
            .is_some()
    }
}

impl MemoryHost {
    fn identity_mut(&mut self, entity: MemoryEntity) -> Option<&mut Identity> {
        self.object_mut(entity).and_then(|o| o.identity.as_mut())
    }

    fn cosmetics_mut(&mut self, entity: MemoryEntity) -> Option<&mut Vec<(String, String)>> {
        self.object_mut(entity).and_then(|o| o.cosmetics.as_mut())
    }

    /// Equipped cosmetics keyed by slot.
    pub fn equipped_map(&self, entity: MemoryEntity) -> HashMap<String, String> {
        self.equipped(entity).unwrap_or_default().into_iter().collect()
    }
}

impl CosmeticsAccess for MemoryHost {
    fn equipped(&self, entity: MemoryEntity) -> Option<Vec<(String, String)>> {
        self.object(entity).and_then(|o| o.cosmetics.clone())
    }

    fn clear_slot(&mut self, entity: MemoryEntity, slot: &str) -> bool {
        self.cosmetics_mut(entity)
            .map(|c| c.retain(|(s, _)| s != slot))
            .is_some()
    }

    fn clear_selections(&mut self, entity: MemoryEntity) -> bool {
        self.cosmetics_mut(entity).map(Vec::clear).is_some()
    }

    fn load_cosmetic(&mut self, entity: MemoryEntity, cosmetic: &CosmeticSelection) -> bool {
        let Some(equipped) = self.cosmetics_mut(entity) else {
            return false;
        };
        equipped.retain(|(s, _)| *s != cosmetic.slot);
        equipped.push((cosmetic.slot.clone(), cosmetic.full_key()));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_enumeration_order() {
        let mut host = MemoryHost::new();
        let a = host.add_player("a", "Player", Pose::default());
        host.add_object("puck(Clone)", None, Pose::default());
        let b = host.add_player("b", "Player", Pose::default());
        assert_eq!(host.tagged("Player"), vec![a, b]);

        host.destroy(a);
        assert_eq!(host.tagged("Player"), vec![b]);
        assert_eq!(host.destroyed_count(), 1);
    }

    #[test]
    fn test_spawn_requires_template() {
        let mut host = MemoryHost::new();
        assert!(host.spawn_ready().is_err());
        assert!(host.spawn().is_err());

        let mut host = MemoryHost::with_template("player(Clone)", "Player", &["body", "stick"]);
        let id = host.spawn().unwrap();
        assert_eq!(host.children(id).len(), 2);
        assert!(host.find_child(id, "stick").is_some());
        assert_eq!(host.control_enabled(id), Some(true));
    }

    #[test]
    fn test_capabilities_absent_on_bare_object() {
        let mut host = MemoryHost::new();
        let id = host.add_object("crate", Some("Player"), Pose::default());
        assert!(host.identity(id).is_none());
        assert!(host.equipped(id).is_none());
        assert!(!host.set_team(id, Team(1)));
        assert!(!host.disable_control(id));
    }

    #[test]
    fn test_capabilities_can_be_swapped() {
        let mut host = MemoryHost::new();
        let id = host.add_player("p", "Player", Pose::default());

        host.set_identity(
            id,
            Some(Identity {
                team: Some(Team(2)),
                ..Default::default()
            }),
        );
        host.set_equipped(id, Some(vec![("hat".into(), "cap/red".into())]));
        assert_eq!(host.identity(id).unwrap().team, Some(Team(2)));
        assert_eq!(host.equipped_map(id)["hat"], "cap/red");

        host.set_identity(id, None);
        host.set_equipped(id, None);
        assert!(host.identity(id).is_none());
        assert!(host.equipped(id).is_none());
        assert!(!host.set_team(id, Team(1)));
        assert!(!host.clear_slot(id, "hat"));
    }

    #[test]
    fn test_load_cosmetic_replaces_slot() {
        let mut host = MemoryHost::new();
        let id = host.add_player("p", "Player", Pose::default());
        host.load_cosmetic(id, &CosmeticSelection::new("hat", "cap", "default"));
        host.load_cosmetic(id, &CosmeticSelection::new("hat", "beanie", "blue"));
        let equipped = host.equipped_map(id);
        assert_eq!(equipped.len(), 1);
        assert_eq!(equipped["hat"], "beanie/blue");
    }
}
