//! Renderable scene graph node

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3, Vec4};
use crate::render::vertex::Vertex;
use crate::render::vulkan::{ActiveRenderPass, GeometryBuffers};

use super::behavior::Behavior;
use super::graph::EntityId;
use super::uniforms::ObjectUniforms;

/// Surface parameters uploaded with the object uniforms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Lit surface color
    pub diffuse: Vec4,
    /// Ambient reflectance
    pub ambient: Vec4,
    /// Highlight color
    pub specular: Vec4,
    /// Self-illumination
    pub emissive: Vec4,
    /// Specular exponent
    pub shininess: f32,
    /// Unlit objects show only their emissive color
    pub lighting_enabled: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Vec4::zeros(),
            ambient: Vec4::zeros(),
            specular: Vec4::zeros(),
            emissive: Vec4::zeros(),
            shininess: 32.0,
            lighting_enabled: false,
        }
    }
}

impl Material {
    /// Replace the diffuse color
    pub fn with_diffuse(mut self, diffuse: Vec4) -> Self {
        self.diffuse = diffuse;
        self
    }

    /// Replace the ambient reflectance
    pub fn with_ambient(mut self, ambient: Vec4) -> Self {
        self.ambient = ambient;
        self
    }

    /// Replace the specular color
    pub fn with_specular(mut self, specular: Vec4) -> Self {
        self.specular = specular;
        self
    }

    /// Replace the emissive color
    pub fn with_emissive(mut self, emissive: Vec4) -> Self {
        self.emissive = emissive;
        self
    }

    /// Replace the specular exponent
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    /// Turn lighting on or off
    pub fn with_lighting(mut self, enabled: bool) -> Self {
        self.lighting_enabled = enabled;
        self
    }
}

/// Positioned, drawable object.
///
/// The translation column of `transform` always equals `position`. Moving
/// the entity rebuilds the transform as a pure translation, so rotation
/// accumulated through [`rotate`](Self::rotate) is lost on the next move.
#[derive(Debug)]
pub struct Entity {
    position: Vec3,
    transform: Mat4,
    /// Surface parameters
    pub material: Material,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    geometry: GeometryBuffers,
    pub(super) behaviors: Vec<Option<Behavior>>,
    pub(super) children: Vec<EntityId>,
    pub(super) expired_behaviors: Vec<usize>,
    pub(super) expired_children: Vec<usize>,
}

impl Entity {
    /// Entity without geometry at `position`
    pub fn new(position: Vec3) -> Self {
        Self::with_geometry(position, Vec::new(), Vec::new())
    }

    /// Entity with vertex and index lists; an empty index list means a
    /// non-indexed draw
    pub fn with_geometry(position: Vec3, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            position,
            transform: Mat4::new_translation(&position),
            material: Material::default(),
            vertices,
            indices,
            geometry: GeometryBuffers::default(),
            behaviors: Vec::new(),
            children: Vec::new(),
            expired_behaviors: Vec::new(),
            expired_children: Vec::new(),
        }
    }

    /// Replace the material
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// World position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// World transform uploaded with the object uniforms
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// CPU copy of the vertices, kept for re-upload
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// CPU copy of the indices; empty for non-indexed draws
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// GPU buffers; null while the device is not ready
    pub fn geometry(&self) -> &GeometryBuffers {
        &self.geometry
    }

    pub(crate) fn geometry_mut(&mut self) -> &mut GeometryBuffers {
        &mut self.geometry
    }

    /// Child handles, some of which may have expired
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Number of live behavior slots
    pub fn behavior_count(&self) -> usize {
        self.behaviors.iter().filter(|slot| slot.is_some()).count()
    }

    /// Move to `position` and reset the transform to that translation
    pub(super) fn place(&mut self, position: Vec3) {
        self.position = position;
        self.transform = Mat4::new_translation(&position);
    }

    /// Post-multiply a rotation into the transform
    pub fn rotate(&mut self, angle: f32, axis: &Vec3) {
        self.transform *= Mat4::rotation_about(angle, axis);
    }

    /// Put `behavior` in the first free slot, or append it
    pub(super) fn attach(&mut self, behavior: Behavior) {
        match self.behaviors.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => *slot = Some(behavior),
            None => self.behaviors.push(Some(behavior)),
        }
    }

    /// Apply removals queued during the last pass
    pub(super) fn remove_expired(&mut self) {
        for slot in self.expired_behaviors.drain(..) {
            if let Some(behavior) = self.behaviors.get_mut(slot) {
                *behavior = None;
            }
        }

        // Largest first so swap-remove never moves a queued child
        self.expired_children.sort_unstable_by(|a, b| b.cmp(a));
        self.expired_children.dedup();
        for index in self.expired_children.drain(..) {
            if index < self.children.len() {
                self.children.swap_remove(index);
            }
        }
    }

    /// Uniform block for binding 1
    pub fn object_uniforms(&self) -> ObjectUniforms {
        ObjectUniforms {
            world: utils::to_cols_array(&self.transform),
            diffuse: self.material.diffuse.into(),
            emissive: self.material.emissive.into(),
            ambient: self.material.ambient.into(),
            specular: self.material.specular.into(),
            shininess: self.material.shininess,
            enable_lighting: u32::from(self.material.lighting_enabled),
            _padding: [0; 2],
        }
    }

    /// Record the draw; the pipeline must already be bound
    pub fn draw(&self, pass: &mut ActiveRenderPass<'_>) {
        if self.geometry.vertex.is_null() {
            return;
        }

        pass.bind_vertex_buffer(self.geometry.vertex.buffer);
        if self.geometry.has_index_buffer() {
            pass.bind_index_buffer(self.geometry.index.buffer);
            pass.draw_indexed(self.geometry.index_count);
        } else {
            pass.draw(self.geometry.vertex_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_entity_transform_is_translation() {
        let entity = Entity::new(Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(entity.transform().translation_part(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(entity.behavior_count(), 0);
    }

    #[test]
    fn test_place_discards_rotation() {
        let mut entity = Entity::new(Vec3::zeros());
        entity.rotate(1.0, &Vec3::y());
        entity.place(Vec3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(*entity.transform(), Mat4::new_translation(&Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_rotate_keeps_translation() {
        let mut entity = Entity::new(Vec3::new(3.0, 0.0, 0.0));
        entity.rotate(0.7, &Vec3::y());
        assert_relative_eq!(entity.transform().translation_part(), Vec3::new(3.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_object_uniforms_carry_material() {
        let material = Material::default()
            .with_diffuse(Vec4::new(0.0, 0.6, 1.0, 1.0))
            .with_shininess(100.0)
            .with_lighting(true);
        let entity = Entity::new(Vec3::new(7.0, 0.0, 0.0)).with_material(material);
        let uniforms = entity.object_uniforms();

        assert_eq!(uniforms.diffuse, [0.0, 0.6, 1.0, 1.0]);
        assert_eq!(uniforms.shininess, 100.0);
        assert_eq!(uniforms.enable_lighting, 1);
        assert_eq!(uniforms.world[3], [7.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_default_material() {
        let material = Material::default();
        assert_eq!(material.shininess, 32.0);
        assert!(!material.lighting_enabled);
        assert_eq!(material.diffuse, Vec4::zeros());
    }
}
