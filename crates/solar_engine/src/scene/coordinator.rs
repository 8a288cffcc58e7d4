//! Scene coordinator
//!
//! Owns every entity together with its pipeline and keeps three parallel
//! collections in step:
//!
//! ```text
//! entity_ids[i] ── pipelines[i] ── descriptions[i]
//! draw_order: permutation of 0..len, farthest from the camera first
//! ```
//!
//! Registration is all-or-nothing: if any GPU resource of a new entity
//! cannot be created, everything created for it so far is released and the
//! collections keep their previous lengths.

use ash::vk;
use thiserror::Error;

use crate::foundation::logging;
use crate::foundation::math::{Vec3, Vec4};
use crate::render::vulkan::{
    ActiveRenderPass, CommandRecorder, PipelineDescription, PipelineObjects, RenderCallbacks, ResourceFactory,
    VulkanError,
};

use super::camera::Camera;
use super::entity::Entity;
use super::graph::{EntityId, EntityTable};
use super::uniforms::GlobalUniforms;

/// Uniform binding shared by every object
pub const GLOBAL_UNIFORM_BINDING: u32 = 0;
/// Uniform binding for per-object data
pub const OBJECT_UNIFORM_BINDING: u32 = 1;

/// Failures while registering or removing entities
#[derive(Error, Debug)]
pub enum SceneError {
    /// Pipeline creation failed; nothing was registered
    #[error("Failed to create pipeline")]
    Pipeline(#[source] VulkanError),
    /// Geometry upload failed; the entity was rolled back
    #[error("Failed to create geometry buffers")]
    Geometry(#[source] VulkanError),
    /// Handle does not belong to this coordinator
    #[error("Entity {0:?} is not registered")]
    UnknownEntity(EntityId),
}

/// Entities, their pipelines and the per-frame draw order
#[derive(Debug, Default)]
pub struct SceneCoordinator {
    table: EntityTable,
    entity_ids: Vec<EntityId>,
    pipelines: Vec<PipelineObjects>,
    descriptions: Vec<PipelineDescription>,
    draw_order: Vec<usize>,
    globals: GlobalUniforms,
    camera_position: Vec3,
}

impl SceneCoordinator {
    /// Empty scene with identity camera matrices
    pub fn new() -> Self {
        Self::default()
    }
    /// Register `entity` with a pipeline built from `description`.
    ///
    /// The pipeline is created first; if that fails nothing is registered.
    /// If the geometry buffers fail afterwards the entity is unregistered
    /// again and the pipeline destroyed.
    pub fn add_entity(
        &mut self,
        resources: &mut dyn ResourceFactory,
        entity: Entity,
        description: PipelineDescription,
    ) -> Result<EntityId, SceneError> {
        let mut pipeline = resources.create_pipeline(&description).map_err(SceneError::Pipeline)?;

        let id = self.table.insert(entity);
        let geometry = match self.table.get(id) {
            Some(entity) => resources.create_geometry(entity.vertices(), entity.indices()),
            None => Err(VulkanError::InvalidOperation {
                reason: "Entity vanished during registration".to_string(),
            }),
        };

        match geometry {
            Ok(geometry) => {
                if let Some(entity) = self.table.get_mut(id) {
                    *entity.geometry_mut() = geometry;
                }
            }
            Err(e) => {
                self.table.remove(id);
                resources.destroy_pipeline(&mut pipeline);
                return Err(SceneError::Geometry(e));
            }
        }

        self.draw_order.push(self.entity_ids.len());
        self.entity_ids.push(id);
        self.pipelines.push(pipeline);
        self.descriptions.push(description);

        log::debug!("Registered entity {:?} ({} total)", id, self.entity_ids.len());
        Ok(id)
    }
    /// Unregister `id`, releasing its pipeline and buffers.
    ///
    /// Handles held by other entities (children, orbit centers) expire.
    pub fn remove_entity(&mut self, resources: &mut dyn ResourceFactory, id: EntityId) -> Result<Entity, SceneError> {
        let index = self
            .entity_ids
            .iter()
            .position(|&candidate| candidate == id)
            .ok_or(SceneError::UnknownEntity(id))?;

        let mut entity = self.table.remove(id).ok_or(SceneError::UnknownEntity(id))?;
        resources.destroy_geometry(entity.geometry_mut());

        let mut pipeline = self.pipelines.remove(index);
        resources.destroy_pipeline(&mut pipeline);
        self.entity_ids.remove(index);
        self.descriptions.remove(index);

        self.draw_order.retain(|&slot| slot != index);
        for slot in &mut self.draw_order {
            if *slot > index {
                *slot -= 1;
            }
        }

        Ok(entity)
    }
    /// Number of registered entities
    pub fn len(&self) -> usize {
        self.entity_ids.len()
    }
    /// Whether no entity is registered
    pub fn is_empty(&self) -> bool {
        self.entity_ids.is_empty()
    }
    /// Registered entity handles, in registration order
    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entity_ids
    }
    /// Current draw order as indices into [`entity_ids`](Self::entity_ids)
    pub fn draw_order(&self) -> &[usize] {
        &self.draw_order
    }
    /// Pipelines, parallel to [`entity_ids`](Self::entity_ids)
    pub fn pipelines(&self) -> &[PipelineObjects] {
        &self.pipelines
    }
    /// Entity table
    pub fn entities(&self) -> &EntityTable {
        &self.table
    }
    /// Entity table, for moving entities and wiring children and behaviors
    pub fn entities_mut(&mut self) -> &mut EntityTable {
        &mut self.table
    }
    /// Uniforms uploaded to binding 0 of every entity
    pub fn globals(&self) -> &GlobalUniforms {
        &self.globals
    }
    /// Take view, projection and eye position from `camera`
    pub fn set_camera(&mut self, camera: &Camera, aspect: f32) {
        self.camera_position = camera.position();
        self.globals
            .set_camera(&camera.view_matrix(), &camera.projection_matrix(aspect), &self.camera_position);
    }
    /// Set the point light; alpha of `color` is its intensity
    pub fn set_light(&mut self, position: Vec4, color: Vec4) {
        self.globals.set_light(&position, &color);
    }
    /// Advance every entity's behaviors, then refresh the draw order
    pub fn update(&mut self, dt: f32) {
        for &id in &self.entity_ids {
            self.table.update(id, dt);
        }
        self.reorder_draw_priority();
    }
    /// Stable sort of the draw order, farthest from the camera first
    pub fn reorder_draw_priority(&mut self) {
        if self.entity_ids.len() < 2 {
            return;
        }

        let camera = self.camera_position;
        let distances: Vec<f32> = self
            .entity_ids
            .iter()
            .map(|&id| self.table.position(id).map_or(0.0, |position| (position - camera).norm()))
            .collect();

        self.draw_order
            .sort_by(|&a, &b| distances[b].total_cmp(&distances[a]));
    }
    /// Buffer updates for one frame: binding 0 of every entity in draw
    /// order, then binding 1 of every entity in draw order
    pub fn uniform_uploads(&self) -> Vec<(vk::Buffer, Vec<u8>)> {
        let globals = bytemuck::bytes_of(&self.globals);
        let mut uploads = Vec::with_capacity(self.draw_order.len() * 2);

        for &index in &self.draw_order {
            if let Some(buffer) = self.pipelines[index].uniform_buffer(GLOBAL_UNIFORM_BINDING) {
                uploads.push((buffer, globals.to_vec()));
            }
        }

        for &index in &self.draw_order {
            let Some(buffer) = self.pipelines[index].uniform_buffer(OBJECT_UNIFORM_BINDING) else {
                continue;
            };
            if let Some(entity) = self.table.get(self.entity_ids[index]) {
                uploads.push((buffer, bytemuck::bytes_of(&entity.object_uniforms()).to_vec()));
            }
        }

        uploads
    }
    /// Release every pipeline and geometry buffer; entities stay registered
    pub fn release_gpu_resources(&mut self, resources: &mut dyn ResourceFactory) {
        for (index, pipeline) in self.pipelines.iter_mut().enumerate() {
            resources.destroy_pipeline(pipeline);
            if let Some(entity) = self.table.get_mut(self.entity_ids[index]) {
                resources.destroy_geometry(entity.geometry_mut());
            }
        }
    }
    /// Recreate whatever [`release_gpu_resources`](Self::release_gpu_resources)
    /// released. Entities whose resources fail are logged and skipped when
    /// drawing.
    pub fn restore_gpu_resources(&mut self, resources: &mut dyn ResourceFactory) {
        for index in 0..self.entity_ids.len() {
            if self.pipelines[index].is_null() {
                match resources.create_pipeline(&self.descriptions[index]) {
                    Ok(pipeline) => self.pipelines[index] = pipeline,
                    Err(e) => {
                        logging::report("Failed to restore pipeline", &SceneError::Pipeline(e));
                        continue;
                    }
                }
            }

            let Some(entity) = self.table.get_mut(self.entity_ids[index]) else {
                continue;
            };
            if entity.geometry().is_null() && !entity.vertices().is_empty() {
                match resources.create_geometry(entity.vertices(), entity.indices()) {
                    Ok(geometry) => *entity.geometry_mut() = geometry,
                    Err(e) => logging::report("Failed to restore geometry", &SceneError::Geometry(e)),
                }
            }
        }
    }
}

impl RenderCallbacks for SceneCoordinator {
    fn on_device_lost(&mut self, resources: &mut dyn ResourceFactory) {
        log::debug!("Releasing GPU resources of {} entities", self.entity_ids.len());
        self.release_gpu_resources(resources);
    }

    fn on_device_ready(&mut self, resources: &mut dyn ResourceFactory) {
        self.restore_gpu_resources(resources);
    }

    fn on_pre_render(&mut self, commands: &mut CommandRecorder) {
        for (buffer, data) in self.uniform_uploads() {
            commands.update_buffer(buffer, 0, &data);
        }
    }

    fn on_render(&mut self, pass: &mut ActiveRenderPass<'_>) {
        for &index in &self.draw_order {
            let pipeline = &self.pipelines[index];
            if pipeline.is_null() {
                continue;
            }
            let Some(entity) = self.table.get(self.entity_ids[index]) else {
                continue;
            };
            pipeline.bind(pass);
            entity.draw(pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::vertex::Vertex;
    use crate::render::vulkan::pipeline::UniformBufferObjects;
    use crate::render::vulkan::{AllocatedBuffer, GeometryBuffers, VulkanResult};
    use crate::scene::uniforms::ObjectUniforms;
    use ash::vk::Handle;
    /// Hands out fake, unique handles and counts live resources
    #[derive(Default)]
    struct MockFactory {
        next_handle: u64,
        fail_pipeline: bool,
        fail_geometry: bool,
        live_pipelines: usize,
        live_geometry: usize,
    }

    impl MockFactory {
        fn handle(&mut self) -> u64 {
            self.next_handle += 1;
            self.next_handle
        }

        fn buffer(&mut self, size: vk::DeviceSize) -> AllocatedBuffer {
            let raw = self.handle();
            AllocatedBuffer {
                buffer: vk::Buffer::from_raw(raw),
                memory: vk::DeviceMemory::from_raw(raw),
                size,
            }
        }
    }

    impl ResourceFactory for MockFactory {
        fn create_pipeline(&mut self, description: &PipelineDescription) -> VulkanResult<PipelineObjects> {
            if self.fail_pipeline {
                return Err(VulkanError::Api(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
            }
            let raw = self.handle();
            let uniform_buffers = description
                .uniform_buffers
                .iter()
                .map(|binding| UniformBufferObjects {
                    binding: binding.binding,
                    buffer: self.buffer(binding.byte_size),
                })
                .collect();
            self.live_pipelines += 1;
            Ok(PipelineObjects {
                pipeline: vk::Pipeline::from_raw(raw),
                layout: vk::PipelineLayout::from_raw(raw),
                descriptor_set: vk::DescriptorSet::from_raw(raw),
                descriptor_set_layout: vk::DescriptorSetLayout::from_raw(raw),
                uniform_buffers,
            })
        }

        fn destroy_pipeline(&mut self, pipeline: &mut PipelineObjects) {
            if !pipeline.is_null() {
                self.live_pipelines -= 1;
            }
            *pipeline = PipelineObjects::default();
        }

        fn create_geometry(&mut self, vertices: &[Vertex], indices: &[u32]) -> VulkanResult<GeometryBuffers> {
            if self.fail_geometry {
                return Err(VulkanError::NoSuitableMemoryType);
            }
            let mut geometry = GeometryBuffers::default();
            if !vertices.is_empty() {
                geometry.vertex = self.buffer(std::mem::size_of_val(vertices) as vk::DeviceSize);
                geometry.vertex_count = vertices.len() as u32;
            }
            if !indices.is_empty() {
                geometry.index = self.buffer(std::mem::size_of_val(indices) as vk::DeviceSize);
                geometry.index_count = indices.len() as u32;
            }
            self.live_geometry += 1;
            Ok(geometry)
        }

        fn destroy_geometry(&mut self, geometry: &mut GeometryBuffers) {
            if !geometry.is_null() {
                self.live_geometry -= 1;
            }
            *geometry = GeometryBuffers::default();
        }
    }

    fn description() -> PipelineDescription {
        PipelineDescription::new("simple.vert.spv", "simple.frag.spv")
            .with_vertex_layout(Vertex::attributes(), Vertex::STRIDE)
            .with_uniform_buffer(GLOBAL_UNIFORM_BINDING, std::mem::size_of::<GlobalUniforms>() as vk::DeviceSize)
            .with_uniform_buffer(OBJECT_UNIFORM_BINDING, std::mem::size_of::<ObjectUniforms>() as vk::DeviceSize)
    }

    fn triangle_at(position: Vec3) -> Entity {
        let vertices = vec![
            Vertex::new(Vec3::new(0.0, 0.0, 0.0), Vec3::z()),
            Vertex::new(Vec3::new(1.0, 0.0, 0.0), Vec3::z()),
            Vertex::new(Vec3::new(0.0, 1.0, 0.0), Vec3::z()),
        ];
        Entity::with_geometry(position, vertices, vec![0, 1, 2])
    }

    fn assert_parallel(scene: &SceneCoordinator, expected: usize) {
        assert_eq!(scene.len(), expected);
        assert_eq!(scene.entities().len(), expected);
        assert_eq!(scene.pipelines().len(), expected);
        assert_eq!(scene.descriptions.len(), expected);
        assert_eq!(scene.draw_order().len(), expected);
    }

    #[test]
    fn test_add_entity_registers_everything() {
        let mut factory = MockFactory::default();
        let mut scene = SceneCoordinator::new();

        let id = scene.add_entity(&mut factory, triangle_at(Vec3::zeros()), description()).unwrap();

        assert_parallel(&scene, 1);
        let geometry = scene.entities().get(id).unwrap().geometry();
        assert!(geometry.has_index_buffer());
        assert_eq!(geometry.index_count, 3);
        assert_eq!(factory.live_pipelines, 1);
    }

    #[test]
    fn test_failing_pipeline_registers_nothing() {
        let mut factory = MockFactory::default();
        let mut scene = SceneCoordinator::new();
        scene.add_entity(&mut factory, triangle_at(Vec3::zeros()), description()).unwrap();

        factory.fail_pipeline = true;
        let result = scene.add_entity(&mut factory, triangle_at(Vec3::x()), description());

        assert!(matches!(result, Err(SceneError::Pipeline(_))));
        assert_parallel(&scene, 1);
    }

    #[test]
    fn test_failing_geometry_rolls_back_pipeline() {
        let mut factory = MockFactory::default();
        let mut scene = SceneCoordinator::new();

        factory.fail_geometry = true;
        let result = scene.add_entity(&mut factory, triangle_at(Vec3::zeros()), description());

        assert!(matches!(result, Err(SceneError::Geometry(_))));
        assert_parallel(&scene, 0);
        assert_eq!(factory.live_pipelines, 0);
    }

    #[test]
    fn test_entity_without_indices_draws_unindexed() {
        let mut factory = MockFactory::default();
        let mut scene = SceneCoordinator::new();
        let mut entity = triangle_at(Vec3::zeros());
        entity = Entity::with_geometry(entity.position(), entity.vertices().to_vec(), Vec::new());

        let id = scene.add_entity(&mut factory, entity, description()).unwrap();
        let geometry = scene.entities().get(id).unwrap().geometry();
        assert!(!geometry.has_index_buffer());
        assert_eq!(geometry.vertex_count, 3);
    }

    fn scene_at_distances(factory: &mut MockFactory, distances: &[f32]) -> SceneCoordinator {
        let mut scene = SceneCoordinator::new();
        for &distance in distances {
            scene
                .add_entity(factory, triangle_at(Vec3::new(0.0, 0.0, distance)), description())
                .unwrap();
        }
        scene
    }

    #[test]
    fn test_draw_order_is_farthest_first() {
        let mut factory = MockFactory::default();
        let mut scene = scene_at_distances(&mut factory, &[5.0, 1.0, 3.0]);

        scene.reorder_draw_priority();
        assert_eq!(scene.draw_order(), &[0, 2, 1]);
    }

    #[test]
    fn test_draw_order_is_stable_for_ties() {
        let mut factory = MockFactory::default();
        let mut scene = scene_at_distances(&mut factory, &[2.0, 7.0, 2.0, 2.0]);

        scene.reorder_draw_priority();
        assert_eq!(scene.draw_order(), &[1, 0, 2, 3]);
    }

    #[test]
    fn test_reorder_with_fewer_than_two_entities() {
        let mut factory = MockFactory::default();
        let mut empty = SceneCoordinator::new();
        empty.reorder_draw_priority();
        assert!(empty.draw_order().is_empty());

        let mut single = scene_at_distances(&mut factory, &[4.0]);
        single.reorder_draw_priority();
        assert_eq!(single.draw_order(), &[0]);
    }

    #[test]
    fn test_reorder_uses_camera_position() {
        let mut factory = MockFactory::default();
        let mut scene = scene_at_distances(&mut factory, &[5.0, 1.0, 3.0]);

        scene.set_camera(&Camera::new(Vec3::new(0.0, 0.0, 6.0)), 1.0);
        scene.reorder_draw_priority();
        assert_eq!(scene.draw_order(), &[1, 2, 0]);
    }

    #[test]
    fn test_uniform_uploads_globals_then_objects() {
        let mut factory = MockFactory::default();
        let mut scene = scene_at_distances(&mut factory, &[1.0, 3.0]);
        scene.reorder_draw_priority();

        let uploads = scene.uniform_uploads();
        assert_eq!(uploads.len(), 4);

        let global_size = std::mem::size_of::<GlobalUniforms>();
        let object_size = std::mem::size_of::<ObjectUniforms>();
        assert!(uploads[..2].iter().all(|(_, data)| data.len() == global_size));
        assert!(uploads[2..].iter().all(|(_, data)| data.len() == object_size));

        // Both passes follow the draw order: entity 1 (farther) first
        let far = &scene.pipelines()[1];
        assert_eq!(Some(uploads[0].0), far.uniform_buffer(GLOBAL_UNIFORM_BINDING));
        assert_eq!(Some(uploads[2].0), far.uniform_buffer(OBJECT_UNIFORM_BINDING));

        let world: ObjectUniforms = bytemuck::pod_read_unaligned(&uploads[2].1);
        assert_eq!(world.world[3], [0.0, 0.0, 3.0, 1.0]);
    }

    #[test]
    fn test_device_lost_and_ready_cycle() {
        let mut factory = MockFactory::default();
        let mut scene = scene_at_distances(&mut factory, &[1.0, 2.0, 3.0]);

        scene.on_device_lost(&mut factory);
        assert_eq!(factory.live_pipelines, 0);
        assert_eq!(factory.live_geometry, 0);
        assert!(scene.pipelines().iter().all(PipelineObjects::is_null));
        assert!(scene.uniform_uploads().is_empty());
        assert_parallel(&scene, 3);

        // Releasing twice is harmless
        scene.on_device_lost(&mut factory);
        assert_eq!(factory.live_pipelines, 0);

        scene.on_device_ready(&mut factory);
        assert_eq!(factory.live_pipelines, 3);
        assert_eq!(factory.live_geometry, 3);
        assert_eq!(scene.uniform_uploads().len(), 6);
    }

    #[test]
    fn test_failed_restore_skips_entity() {
        let mut factory = MockFactory::default();
        let mut scene = scene_at_distances(&mut factory, &[1.0, 2.0]);

        scene.on_device_lost(&mut factory);
        factory.fail_pipeline = true;
        scene.on_device_ready(&mut factory);

        assert_parallel(&scene, 2);
        assert!(scene.uniform_uploads().is_empty());
        assert_eq!(factory.live_geometry, 0);
    }

    #[test]
    fn test_remove_entity_expires_handles() {
        let mut factory = MockFactory::default();
        let mut scene = scene_at_distances(&mut factory, &[1.0, 2.0, 3.0]);
        let ids = scene.entity_ids().to_vec();

        scene.remove_entity(&mut factory, ids[1]).unwrap();

        assert_parallel(&scene, 2);
        assert!(!scene.entities().contains(ids[1]));
        assert_eq!(factory.live_pipelines, 2);
        assert_eq!(factory.live_geometry, 2);
        let mut order = scene.draw_order().to_vec();
        order.sort_unstable();
        assert_eq!(order, vec![0, 1]);

        assert!(matches!(
            scene.remove_entity(&mut factory, ids[1]),
            Err(SceneError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_update_drives_behaviors_and_order() {
        use crate::scene::behavior::Behavior;

        let mut factory = MockFactory::default();
        let mut scene = scene_at_distances(&mut factory, &[1.0, 3.0]);
        let ids = scene.entity_ids().to_vec();

        // Float the near entity up until it is farther than the other one
        scene
            .entities_mut()
            .attach_behavior(Behavior::float(ids[0], 100.0, 1.0));
        scene.update(0.5);
        assert_eq!(scene.draw_order(), &[1, 0]);

        for _ in 0..10 {
            scene.update(0.5);
        }
        assert_eq!(scene.draw_order(), &[0, 1]);
    }
}
