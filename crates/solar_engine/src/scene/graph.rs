//! Entity table and scene graph operations
//!
//! Entities refer to each other (children, behavior owners, orbit centers)
//! through generational [`EntityId`] handles. A handle whose entity was
//! removed simply fails to resolve, so liveness is a lookup and never a
//! dangling access.
//!
//! Operations that walk the graph live on [`EntityTable`] rather than on
//! [`Entity`] because they need to reach other entities by handle.

use slotmap::SlotMap;

use crate::foundation::math::Vec3;

use super::behavior::Behavior;
use super::entity::Entity;

slotmap::new_key_type! {
    /// Weak, generation-checked entity handle
    pub struct EntityId;
}

/// Storage for every entity in a scene
#[derive(Debug, Default)]
pub struct EntityTable {
    entities: SlotMap<EntityId, Entity>,
}

impl EntityTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entity` and return its handle
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        self.entities.insert(entity)
    }

    /// Remove an entity; handles to it expire
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(id)
    }

    /// Entity behind `id`, if still alive
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutable entity behind `id`, if still alive
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Whether `id` still refers to a live entity
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entity is alive
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Position of `id`, if still alive
    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.entities.get(id).map(Entity::position)
    }

    /// Poll every behavior of `id` once, then apply the removals queued
    /// during the pass.
    ///
    /// Behaviors reporting failure have their slot nulled; the slot is
    /// reused by the next attach. Returns `false` when `id` has expired.
    pub fn update(&mut self, id: EntityId, dt: f32) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };

        // Behaviors mutate their owner through the table, so they are
        // taken out for the duration of the pass
        let mut behaviors = std::mem::take(&mut entity.behaviors);
        let mut expired = Vec::new();
        for (slot, behavior) in behaviors.iter_mut().enumerate() {
            if let Some(behavior) = behavior {
                if !behavior.update(self, dt) {
                    expired.push(slot);
                }
            }
        }

        match self.entities.get_mut(id) {
            Some(entity) => {
                entity.behaviors = behaviors;
                entity.expired_behaviors.extend(expired);
                entity.remove_expired();
                true
            }
            None => false,
        }
    }

    /// Move `id` by `delta` and every live child with it.
    ///
    /// The transform is rebuilt as a translation. Expired children are
    /// queued for removal at the end of the next update pass.
    pub fn change_position(&mut self, id: EntityId, delta: Vec3) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        let position = entity.position() + delta;
        entity.place(position);
        self.shift_children(id, delta);
        true
    }

    /// Move `id` to `position`; children follow by the same delta
    pub fn set_position(&mut self, id: EntityId, position: Vec3) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        let delta = position - entity.position();
        entity.place(position);
        self.shift_children(id, delta);
        true
    }

    fn shift_children(&mut self, id: EntityId, delta: Vec3) {
        let count = self.entities.get(id).map_or(0, |entity| entity.children.len());
        let mut expired = Vec::new();

        for index in (0..count).rev() {
            let Some(child) = self.entities.get(id).and_then(|entity| entity.children.get(index).copied()) else {
                continue;
            };
            if !self.change_position(child, delta) {
                expired.push(index);
            }
        }

        if let Some(entity) = self.entities.get_mut(id) {
            entity.expired_children.extend(expired);
        }
    }

    /// Compose a rotation into the transform of `id`
    pub fn rotate(&mut self, id: EntityId, angle: f32, axis: &Vec3) -> bool {
        match self.entities.get_mut(id) {
            Some(entity) => {
                entity.rotate(angle, axis);
                true
            }
            None => false,
        }
    }

    /// Slave `child`'s position to `parent`.
    ///
    /// Ignored when either handle has expired or the link would form a
    /// cycle.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> bool {
        if !self.contains(child) || self.is_descendant(parent, child) {
            return false;
        }
        match self.entities.get_mut(parent) {
            Some(entity) => {
                entity.children.push(child);
                true
            }
            None => false,
        }
    }

    /// Whether `node` is `root` or reachable through its children
    fn is_descendant(&self, node: EntityId, root: EntityId) -> bool {
        if node == root {
            return true;
        }
        self.entities.get(root).is_some_and(|entity| {
            entity
                .children
                .iter()
                .any(|&child| self.is_descendant(node, child))
        })
    }

    /// Attach `behavior` to its owner. Returns `false` if the owner expired.
    pub fn attach_behavior(&mut self, behavior: Behavior) -> bool {
        match self.entities.get_mut(behavior.owner()) {
            Some(entity) => {
                entity.attach(behavior);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Mat4Ext};
    use approx::assert_relative_eq;

    #[test]
    fn test_update_without_behaviors_changes_nothing() {
        let mut table = EntityTable::new();
        let id = table.insert(Entity::new(Vec3::new(1.0, 2.0, 3.0)));
        table.rotate(id, 0.4, &Vec3::x());
        let before = *table.get(id).unwrap().transform();

        for _ in 0..10 {
            assert!(table.update(id, 0.016));
        }

        let entity = table.get(id).unwrap();
        assert_relative_eq!(entity.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(*entity.transform(), before);
    }

    #[test]
    fn test_children_follow_parent() {
        let mut table = EntityTable::new();
        let parent = table.insert(Entity::new(Vec3::new(300.0, 0.0, 0.0)));
        let child = table.insert(Entity::new(Vec3::new(303.0, 0.0, 0.0)));
        assert!(table.add_child(parent, child));

        table.change_position(parent, Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(table.position(child).unwrap(), Vec3::new(303.0, 1.0, 0.0));

        table.set_position(parent, Vec3::new(310.0, 1.0, 0.0));
        assert_relative_eq!(table.position(child).unwrap(), Vec3::new(313.0, 1.0, 0.0));
        assert_relative_eq!(
            table.get(child).unwrap().transform().translation_part(),
            Vec3::new(313.0, 1.0, 0.0)
        );
    }

    #[test]
    fn test_expired_child_removed_after_update() {
        let mut table = EntityTable::new();
        let parent = table.insert(Entity::new(Vec3::zeros()));
        let kept = table.insert(Entity::new(Vec3::zeros()));
        let dropped = table.insert(Entity::new(Vec3::zeros()));
        table.add_child(parent, dropped);
        table.add_child(parent, kept);
        table.remove(dropped);

        // Queued twice, removed once
        table.change_position(parent, Vec3::x());
        table.change_position(parent, Vec3::x());
        assert_eq!(table.get(parent).unwrap().children().len(), 2);

        table.update(parent, 0.016);
        assert_eq!(table.get(parent).unwrap().children(), &[kept]);
        assert_relative_eq!(table.position(kept).unwrap(), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_add_child_rejects_expired_and_cycles() {
        let mut table = EntityTable::new();
        let a = table.insert(Entity::new(Vec3::zeros()));
        let b = table.insert(Entity::new(Vec3::zeros()));
        let gone = table.insert(Entity::new(Vec3::zeros()));
        table.remove(gone);

        assert!(!table.add_child(a, gone));
        assert!(!table.add_child(a, a));
        assert!(table.add_child(a, b));
        assert!(!table.add_child(b, a));
    }

    #[test]
    fn test_position_change_discards_rotation() {
        let mut table = EntityTable::new();
        let id = table.insert(Entity::new(Vec3::zeros()));
        table.rotate(id, 1.2, &Vec3::y());
        table.change_position(id, Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(
            *table.get(id).unwrap().transform(),
            Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0))
        );
    }

    #[test]
    fn test_operations_on_expired_entity_fail() {
        let mut table = EntityTable::new();
        let id = table.insert(Entity::new(Vec3::zeros()));
        table.remove(id);

        assert!(!table.update(id, 0.016));
        assert!(!table.change_position(id, Vec3::x()));
        assert!(!table.set_position(id, Vec3::x()));
        assert!(!table.rotate(id, 1.0, &Vec3::y()));
        assert!(!table.attach_behavior(Behavior::spin(id, Vec3::y(), 1.0)));
    }
}
