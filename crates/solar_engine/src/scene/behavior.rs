//! Per-frame behaviors attached to entities
//!
//! A behavior belongs to exactly one owner and only ever mutates that
//! owner. Once the owner, or the reference entity of a relational behavior,
//! expires the behavior reports failure and its slot is cleared at the end
//! of the update pass.

use crate::foundation::math::{constants::TAU, Vec3};

use super::graph::{EntityId, EntityTable};

/// Motion applied by a [`Behavior`]
#[derive(Debug, Clone, PartialEq)]
pub enum BehaviorKind {
    /// Rotate around an axis
    Spin {
        /// Rotation axis, need not be normalized
        axis: Vec3,
        /// Turns per second
        speed: f32,
    },
    /// Circle around another entity in the horizontal plane
    Orbit {
        /// Entity at the center; the orbit stops once it expires
        center: EntityId,
        /// Turns per second
        speed: f32,
    },
    /// Bob up and down between `-offset` and `+offset`
    Float {
        /// Half the travel
        offset: f32,
        /// Units per second
        speed: f32,
        /// Displacement from the rest position
        current: f32,
        /// +1 moving up, -1 moving down
        direction: f32,
    },
}

/// A behavior bound to its owning entity
#[derive(Debug, Clone, PartialEq)]
pub struct Behavior {
    owner: EntityId,
    kind: BehaviorKind,
}

impl Behavior {
    /// Behavior of any kind for `owner`
    pub fn new(owner: EntityId, kind: BehaviorKind) -> Self {
        Self { owner, kind }
    }

    /// Rotate `owner` around `axis`
    pub fn spin(owner: EntityId, axis: Vec3, speed: f32) -> Self {
        Self::new(owner, BehaviorKind::Spin { axis, speed })
    }

    /// Circle `owner` around `center`
    pub fn orbit(owner: EntityId, center: EntityId, speed: f32) -> Self {
        Self::new(owner, BehaviorKind::Orbit { center, speed })
    }

    /// Starts at the rest position moving up
    pub fn float(owner: EntityId, offset: f32, speed: f32) -> Self {
        Self::new(
            owner,
            BehaviorKind::Float {
                offset,
                speed,
                current: 0.0,
                direction: 1.0,
            },
        )
    }

    /// Entity this behavior moves
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Motion and its state
    pub fn kind(&self) -> &BehaviorKind {
        &self.kind
    }

    /// Advance by `dt` seconds. Returns `false` once an entity it depends on
    /// has expired.
    pub fn update(&mut self, table: &mut EntityTable, dt: f32) -> bool {
        if !table.contains(self.owner) {
            return false;
        }

        match &mut self.kind {
            BehaviorKind::Spin { axis, speed } => table.rotate(self.owner, TAU * dt * *speed, axis),
            BehaviorKind::Orbit { center, speed } => {
                let (Some(current), Some(center)) = (table.position(self.owner), table.position(*center)) else {
                    return false;
                };

                let angle = f64::from(dt) * std::f64::consts::TAU * f64::from(*speed);
                let (sin, cos) = angle.sin_cos();
                let dx = f64::from(current.x - center.x);
                let dz = f64::from(current.z - center.z);
                let orbited = Vec3::new(
                    (cos * dx - sin * dz + f64::from(center.x)) as f32,
                    current.y,
                    (sin * dx + cos * dz + f64::from(center.z)) as f32,
                );
                table.set_position(self.owner, orbited)
            }
            BehaviorKind::Float {
                offset,
                speed,
                current,
                direction,
            } => {
                // Bounds are checked before the step, so one step may overshoot
                if *current > *offset {
                    *direction = -1.0;
                } else if *current < -*offset {
                    *direction = 1.0;
                }
                let step = dt * *speed * *direction;
                *current += step;
                table.change_position(self.owner, Vec3::new(0.0, step, 0.0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Mat4Ext};
    use crate::scene::entity::Entity;
    use approx::assert_relative_eq;

    fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
        ((a.x - b.x).powi(2) + (a.z - b.z).powi(2)).sqrt()
    }

    #[test]
    fn test_spin_accumulates_angle() {
        let dt = 0.016;
        let speed = 0.25;
        let steps = 40;

        for axis in [Vec3::y(), Vec3::new(1.0, 1.0, 0.0), Vec3::new(0.2, -0.5, 0.9)] {
            let mut table = EntityTable::new();
            let id = table.insert(Entity::new(Vec3::zeros()));
            table.attach_behavior(Behavior::spin(id, axis, speed));

            for _ in 0..steps {
                table.update(id, dt);
            }

            let expected = Mat4::rotation_about(steps as f32 * TAU * dt * speed, &axis);
            assert_relative_eq!(*table.get(id).unwrap().transform(), expected, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_orbit_preserves_radius_and_height() {
        let mut table = EntityTable::new();
        let sun = table.insert(Entity::new(Vec3::new(10.0, 0.0, -5.0)));
        let planet = table.insert(Entity::new(Vec3::new(110.0, 7.0, -5.0)));
        table.attach_behavior(Behavior::orbit(planet, sun, 0.02));

        let center = table.position(sun).unwrap();
        for _ in 0..500 {
            table.update(planet, 0.05);
            let position = table.position(planet).unwrap();
            assert_relative_eq!(horizontal_distance(position, center), 100.0, epsilon = 1e-2);
            assert_eq!(position.y, 7.0);
        }
        // Half a turn later the planet is on the far side
        assert!(table.position(planet).unwrap().x < -80.0);
    }

    #[test]
    fn test_orbit_moves_children_along() {
        let mut table = EntityTable::new();
        let sun = table.insert(Entity::new(Vec3::zeros()));
        let earth = table.insert(Entity::new(Vec3::new(300.0, 0.0, 0.0)));
        let moon = table.insert(Entity::new(Vec3::new(303.0, 0.0, 0.0)));
        table.add_child(earth, moon);
        table.attach_behavior(Behavior::orbit(earth, sun, 0.012));

        for _ in 0..100 {
            table.update(earth, 0.016);
            let earth_position = table.position(earth).unwrap();
            let moon_position = table.position(moon).unwrap();
            assert_relative_eq!((moon_position - earth_position).norm(), 3.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_float_stays_within_one_step_of_bounds() {
        let offset = 1.5;
        let speed = 2.0;
        let dt_max = 0.05;

        let mut table = EntityTable::new();
        let id = table.insert(Entity::new(Vec3::new(0.0, 0.0, 0.0)));
        table.attach_behavior(Behavior::float(id, offset, speed));

        let mut reached_top = false;
        let mut reached_bottom = false;
        for frame in 0..2000 {
            let dt = if frame % 3 == 0 { dt_max } else { dt_max * 0.5 };
            table.update(id, dt);
            let y = table.position(id).unwrap().y;
            assert!(y.abs() <= offset + dt_max * speed + 1e-4, "y = {}", y);
            reached_top |= y > offset * 0.9;
            reached_bottom |= y < -offset * 0.9;
        }
        assert!(reached_top && reached_bottom);
    }

    #[test]
    fn test_behavior_with_expired_owner_is_dropped() {
        let mut table = EntityTable::new();
        let ghost = table.insert(Entity::new(Vec3::zeros()));
        let host = table.insert(Entity::new(Vec3::zeros()));
        table.remove(ghost);

        // Owner expired before the poll
        let mut orphan = Behavior::spin(ghost, Vec3::y(), 1.0);
        assert!(!orphan.update(&mut table, 0.016));

        // Relational behavior whose reference expires
        let center = table.insert(Entity::new(Vec3::new(5.0, 0.0, 0.0)));
        table.attach_behavior(Behavior::orbit(host, center, 1.0));
        table.attach_behavior(Behavior::spin(host, Vec3::y(), 1.0));
        assert_eq!(table.get(host).unwrap().behavior_count(), 2);

        table.remove(center);
        table.update(host, 0.016);
        assert_eq!(table.get(host).unwrap().behavior_count(), 1);

        // Later passes only poll the survivor, and the freed slot is reused
        table.update(host, 0.016);
        assert_eq!(table.get(host).unwrap().behavior_count(), 1);
        table.attach_behavior(Behavior::float(host, 1.0, 1.0));
        let entity = table.get(host).unwrap();
        assert_eq!(entity.behavior_count(), 2);
        assert_eq!(entity.behaviors.len(), 2);
    }
}
