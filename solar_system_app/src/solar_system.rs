//! Solar system scene and camera controls

use std::path::{Path, PathBuf};

use solar_engine::assets::{MeshData, ObjLoader};
use solar_engine::config::{ApplicationConfig, CameraConfig, ConfigError};
use solar_engine::foundation::math::{constants::TAU, Vec3, Vec4};
use solar_engine::input::{InputState, KeyCode};
use solar_engine::render::vertex::Vertex;
use solar_engine::render::vulkan::{PipelineDescription, ResourceFactory};
use solar_engine::scene::{
    shapes, Behavior, Camera, Entity, EntityId, GlobalUniforms, ObjectUniforms, SceneCoordinator,
    GLOBAL_UNIFORM_BINDING, OBJECT_UNIFORM_BINDING,
};
use solar_engine::{AppError, Application, FrameContext};

use crate::bodies::{self, BodySpec, BODIES, FIRST_PLANET, SUN};

/// Units per second for T/G
const PLANET_LIFT_SPEED: f32 = 0.5;

/// Keeps the view from flipping over the poles
const PITCH_LIMIT: f32 = 1.55;

const SPHERE_RINGS: u32 = 24;
const SPHERE_SEGMENTS: u32 = 32;

/// Sun, eight planets and a moon, viewed through a free-flying camera
pub struct SolarSystemApp {
    config: ApplicationConfig,
    camera: Camera,
    loader: ObjLoader,
    models_dir: PathBuf,
    bodies: Vec<EntityId>,
}

impl SolarSystemApp {
    /// App that looks for `<name>.obj` files in `models_dir`
    pub fn new(config: ApplicationConfig, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            camera: Camera::from_config(&config.camera),
            config,
            loader: ObjLoader::new(),
            models_dir: models_dir.into(),
            bodies: Vec::new(),
        }
    }

    /// Camera driven by the keyboard
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Handles of the registered bodies, in [`BODIES`] order
    pub fn bodies(&self) -> &[EntityId] {
        &self.bodies
    }

    fn pipeline_description(&self) -> PipelineDescription {
        let shaders = &self.config.shaders;
        let description = PipelineDescription::new(&shaders.vertex_shader_path, &shaders.fragment_shader_path)
            .with_vertex_layout(Vertex::attributes(), Vertex::STRIDE)
            .with_uniform_buffer(GLOBAL_UNIFORM_BINDING, std::mem::size_of::<GlobalUniforms>() as u64)
            .with_uniform_buffer(OBJECT_UNIFORM_BINDING, std::mem::size_of::<ObjectUniforms>() as u64);

        match &shaders.geometry_shader_path {
            Some(path) => description.with_geometry_shader(path),
            None => description,
        }
    }

    /// `<models_dir>/<name>.obj` when present, otherwise a generated sphere
    fn load_mesh(&mut self, body: &BodySpec) -> Result<MeshData, AppError> {
        let path = self.models_dir.join(format!("{}.obj", body.name));
        if path.exists() {
            log::info!("Loading {} from {}", body.name, path.display());
            return Ok(self.loader.load(&path)?);
        }

        log::debug!("No model for {}, using a sphere of radius {}", body.name, body.fallback_radius);
        Ok(shapes::uv_sphere(body.fallback_radius, SPHERE_RINGS, SPHERE_SEGMENTS))
    }
}

impl Application for SolarSystemApp {
    fn setup(&mut self, scene: &mut SceneCoordinator, resources: &mut dyn ResourceFactory) -> Result<(), AppError> {
        self.config.shaders.validate().map_err(ConfigError::Invalid)?;
        let description = self.pipeline_description();

        self.bodies.clear();
        for (index, body) in BODIES.iter().enumerate() {
            let mesh = self.load_mesh(body)?;
            let material = if index == SUN {
                bodies::sun_material()
            } else {
                body.material()
            };
            let entity = Entity::with_geometry(body.position(), mesh.vertices, mesh.indices).with_material(material);
            let id = scene.add_entity(resources, entity, description.clone())?;
            self.bodies.push(id);
        }

        let table = scene.entities_mut();
        for (body, &id) in BODIES.iter().zip(&self.bodies) {
            table.attach_behavior(Behavior::spin(id, Vec3::y(), body.spin_speed));
            if let Some((center, speed)) = body.orbit {
                table.attach_behavior(Behavior::orbit(id, self.bodies[center], speed));
            }
            if let Some(parent) = body.parent {
                table.add_child(self.bodies[parent], id);
            }
        }

        scene.set_light(Vec4::new(0.0, 0.0, 0.0, 1.0), Vec4::new(1.0, 1.0, 0.8, 0.4));
        log::info!("Solar system ready with {} bodies", self.bodies.len());
        Ok(())
    }

    fn update(&mut self, scene: &mut SceneCoordinator, frame: &FrameContext<'_>) -> Result<(), AppError> {
        let dt = frame.delta_time;
        apply_camera_controls(&mut self.camera, frame.input, dt, &self.config.camera);

        let lift = vertical_input(frame.input) * dt * PLANET_LIFT_SPEED;
        if lift != 0.0 {
            if let Some(&planet) = self.bodies.get(FIRST_PLANET) {
                scene.entities_mut().change_position(planet, Vec3::new(0.0, lift, 0.0));
            }
        }

        scene.set_camera(&self.camera, frame.aspect_ratio);
        Ok(())
    }

    fn shutdown(&mut self, _scene: &mut SceneCoordinator) {
        log::info!("Leaving the solar system");
    }
}

/// +1 for T, -1 for G, 0 for neither or both
fn vertical_input(input: &dyn InputState) -> f32 {
    let mut direction = 0.0;
    if input.is_key_down(KeyCode::T) {
        direction += 1.0;
    }
    if input.is_key_down(KeyCode::G) {
        direction -= 1.0;
    }
    direction
}

/// WASD moves, Q/E turn, holding Space lets the mouse look around
pub fn apply_camera_controls(camera: &mut Camera, input: &dyn InputState, dt: f32, config: &CameraConfig) {
    let step = config.move_speed * dt;
    if input.is_key_down(KeyCode::W) {
        camera.move_forward(step);
    }
    if input.is_key_down(KeyCode::S) {
        camera.move_forward(-step);
    }
    if input.is_key_down(KeyCode::A) {
        camera.strafe(-step);
    }
    if input.is_key_down(KeyCode::D) {
        camera.strafe(step);
    }

    let turn = TAU * dt * config.turn_speed;
    if input.is_key_down(KeyCode::Q) {
        camera.set_yaw(camera.yaw() + turn);
    }
    if input.is_key_down(KeyCode::E) {
        camera.set_yaw(camera.yaw() - turn);
    }

    if input.is_key_down(KeyCode::Space) {
        let (dx, dy) = input.mouse_delta();
        camera.set_yaw(camera.yaw() - dx * config.mouse_sensitivity);
        let pitch = camera.pitch() + dy * config.mouse_sensitivity;
        camera.set_pitch(pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT));
    }
}

/// Models live next to the shaders in the resource tree
pub fn default_models_dir() -> &'static Path {
    Path::new("resources/models")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use solar_engine::input::InputSnapshot;
    use solar_engine::render::vulkan::{GeometryBuffers, PipelineObjects, VulkanResult};
    use tempfile::TempDir;

    /// Hands out null handles; nothing is ever drawn
    #[derive(Default)]
    struct NullFactory {
        pipelines: usize,
    }

    impl ResourceFactory for NullFactory {
        fn create_pipeline(&mut self, _description: &PipelineDescription) -> VulkanResult<PipelineObjects> {
            self.pipelines += 1;
            Ok(PipelineObjects::default())
        }

        fn destroy_pipeline(&mut self, _pipeline: &mut PipelineObjects) {}

        fn create_geometry(&mut self, vertices: &[Vertex], indices: &[u32]) -> VulkanResult<GeometryBuffers> {
            Ok(GeometryBuffers {
                vertex_count: vertices.len() as u32,
                index_count: indices.len() as u32,
                ..GeometryBuffers::default()
            })
        }

        fn destroy_geometry(&mut self, _geometry: &mut GeometryBuffers) {}
    }

    fn held(keys: &[KeyCode]) -> InputSnapshot {
        InputSnapshot {
            frame_time: 0.5,
            keys_down: keys.to_vec(),
            mouse_delta: (0.0, 0.0),
        }
    }

    fn app_with_shaders() -> (SolarSystemApp, TempDir) {
        let dir = TempDir::new().unwrap();
        let vertex = dir.path().join("simple.vert.spv");
        let fragment = dir.path().join("simple.frag.spv");
        std::fs::write(&vertex, [0u8; 4]).unwrap();
        std::fs::write(&fragment, [0u8; 4]).unwrap();

        let mut config = ApplicationConfig::new("Test");
        config.shaders = solar_engine::config::ShaderConfig::new(
            vertex.to_string_lossy().into_owned(),
            fragment.to_string_lossy().into_owned(),
        );
        (SolarSystemApp::new(config, dir.path().join("models")), dir)
    }

    #[test]
    fn test_setup_builds_every_body() {
        let (mut app, _dir) = app_with_shaders();
        let mut scene = SceneCoordinator::new();
        let mut factory = NullFactory::default();

        app.setup(&mut scene, &mut factory).unwrap();

        assert_eq!(scene.len(), BODIES.len());
        assert_eq!(factory.pipelines, BODIES.len());

        let table = scene.entities();
        let earth = app.bodies()[3];
        let moon = app.bodies()[4];
        assert_eq!(table.get(earth).unwrap().children(), &[moon]);
        // Spin and orbit
        assert_eq!(table.get(moon).unwrap().behavior_count(), 2);
        // The sun only spins
        assert_eq!(table.get(app.bodies()[SUN]).unwrap().behavior_count(), 1);
        assert!(!table.get(app.bodies()[SUN]).unwrap().material.lighting_enabled);
    }

    #[test]
    fn test_model_file_replaces_generated_sphere() {
        let (mut app, dir) = app_with_shaders();
        let models = dir.path().join("models");
        std::fs::create_dir_all(&models).unwrap();
        std::fs::write(
            models.join("mercury.obj"),
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        )
        .unwrap();

        let mut scene = SceneCoordinator::new();
        app.setup(&mut scene, &mut NullFactory::default()).unwrap();

        let table = scene.entities();
        let mercury = table.get(app.bodies()[FIRST_PLANET]).unwrap();
        assert_eq!(mercury.vertices().len(), 4);
        assert_eq!(mercury.indices().len(), 6);
        let venus = table.get(app.bodies()[2]).unwrap();
        assert_eq!(venus.vertices().len(), ((SPHERE_RINGS + 1) * (SPHERE_SEGMENTS + 1)) as usize);
    }

    #[test]
    fn test_setup_fails_without_shaders() {
        let mut config = ApplicationConfig::new("Test");
        config.shaders = solar_engine::config::ShaderConfig::new("missing.vert.spv", "missing.frag.spv");
        let mut app = SolarSystemApp::new(config, "missing-models");
        let mut scene = SceneCoordinator::new();

        let result = app.setup(&mut scene, &mut NullFactory::default());
        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(scene.is_empty());
    }

    #[test]
    fn test_moon_keeps_distance_from_earth() {
        let (mut app, _dir) = app_with_shaders();
        let mut scene = SceneCoordinator::new();
        app.setup(&mut scene, &mut NullFactory::default()).unwrap();

        for _ in 0..200 {
            scene.update(0.016);
        }

        let table = scene.entities();
        let earth = table.position(app.bodies()[3]).unwrap();
        let moon = table.position(app.bodies()[4]).unwrap();
        assert_relative_eq!((moon - earth).norm(), 3.0, epsilon = 1e-2);
        assert_relative_eq!(earth.norm(), 300.0, epsilon = 1e-1);
    }

    #[test]
    fn test_lift_moves_first_planet() {
        let (mut app, _dir) = app_with_shaders();
        let mut scene = SceneCoordinator::new();
        app.setup(&mut scene, &mut NullFactory::default()).unwrap();

        let input = held(&[KeyCode::T]);
        let frame = FrameContext {
            input: &input,
            delta_time: 0.5,
            aspect_ratio: 1.5,
        };
        app.update(&mut scene, &frame).unwrap();

        let mercury = scene.entities().position(app.bodies()[FIRST_PLANET]).unwrap();
        assert_relative_eq!(mercury, Vec3::new(100.0, 0.25, 0.0));
    }

    #[test]
    fn test_wasd_moves_camera() {
        let config = CameraConfig::default();
        let mut camera = Camera::new(Vec3::zeros());

        apply_camera_controls(&mut camera, &held(&[KeyCode::W]), 0.5, &config);
        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, 20.0), epsilon = 1e-4);

        // Opposite keys cancel
        apply_camera_controls(&mut camera, &held(&[KeyCode::A, KeyCode::D]), 0.5, &config);
        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, 20.0), epsilon = 1e-4);

        apply_camera_controls(&mut camera, &held(&[KeyCode::D]), 0.5, &config);
        assert_relative_eq!(camera.position(), Vec3::new(-20.0, 0.0, 20.0), epsilon = 1e-4);
    }

    #[test]
    fn test_turning() {
        let config = CameraConfig::default();
        let mut camera = Camera::new(Vec3::zeros());

        apply_camera_controls(&mut camera, &held(&[KeyCode::Q]), 1.0, &config);
        assert_relative_eq!(camera.yaw(), TAU * 0.25, epsilon = 1e-6);

        apply_camera_controls(&mut camera, &held(&[KeyCode::E]), 0.5, &config);
        assert_relative_eq!(camera.yaw(), TAU * 0.125, epsilon = 1e-6);
    }

    #[test]
    fn test_mouse_look_requires_space() {
        let config = CameraConfig::default();
        let mut camera = Camera::new(Vec3::zeros());
        let mut input = held(&[]);
        input.mouse_delta = (10.0, 1000.0);

        apply_camera_controls(&mut camera, &input, 0.016, &config);
        assert_eq!(camera.pitch(), 0.0);
        assert_eq!(camera.yaw(), 0.0);

        input.keys_down.push(KeyCode::Space);
        apply_camera_controls(&mut camera, &input, 0.016, &config);
        assert_relative_eq!(camera.yaw(), -10.0 * config.mouse_sensitivity, epsilon = 1e-6);
        assert_relative_eq!(camera.pitch(), PITCH_LIMIT);
    }
}
