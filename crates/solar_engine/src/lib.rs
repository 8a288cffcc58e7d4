//! # Solar Engine
//!
//! A small Vulkan scene renderer driven by a behavior-based scene graph.
//!
//! ## Features
//!
//! - **Vulkan Rendering**: one forward pass, one pipeline per entity
//! - **Scene Graph**: entities with children and per-frame behaviors
//! - **Swapchain Recovery**: scene GPU resources are released and restored around rebuilds
//! - **Back-to-Front Ordering**: draw order follows camera distance
//! - **Asset Loading**: cached Wavefront OBJ meshes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use solar_engine::prelude::*;
//!
//! struct Spinner;
//!
//! impl Application for Spinner {
//!     fn setup(&mut self, scene: &mut SceneCoordinator, resources: &mut dyn ResourceFactory) -> Result<(), AppError> {
//!         let mesh = shapes::cube(10.0);
//!         let description = PipelineDescription::new("target/shaders/simple.vert.spv", "target/shaders/simple.frag.spv")
//!             .with_vertex_layout(Vertex::attributes(), Vertex::STRIDE);
//!         let id = scene.add_entity(resources, Entity::with_geometry(Vec3::zeros(), mesh.vertices, mesh.indices), description)?;
//!         scene.entities_mut().attach_behavior(Behavior::spin(id, Vec3::y(), 0.1));
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, _scene: &mut SceneCoordinator, _frame: &FrameContext<'_>) -> Result<(), AppError> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = Engine::initialize(ApplicationConfig::new("Spinner"))?;
//!     engine.run(&mut Spinner)?;
//!     engine.shutdown()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod input;
pub mod assets;
pub mod render;
pub mod scene;

mod application;
mod engine;

pub use application::{AppError, Application, FrameContext};
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        AppError, Application, Engine, EngineError, FrameContext,
        assets::{MeshData, ObjLoader},
        config::{ApplicationConfig, Config},
        foundation::math::{Mat4, Mat4Ext, Vec3, Vec4},
        input::{InputState, KeyCode},
        render::{
            vertex::Vertex,
            vulkan::{PipelineDescription, ResourceFactory},
        },
        scene::{shapes, Behavior, Camera, Entity, EntityId, Material, SceneCoordinator},
    };
}
