//! Scene graph and composition
//!
//! ```text
//! SceneCoordinator ── owns ──▶ EntityTable ── owns ──▶ Entity ── owns ──▶ Behavior
//!        │                                              │
//!        └── PipelineObjects (one per entity)           └── children: EntityId (weak)
//! ```
//!
//! The coordinator advances behaviors once per frame, sorts the draw order
//! back to front and implements [`RenderCallbacks`](crate::render::vulkan::RenderCallbacks)
//! so the renderer can upload uniforms, draw, and release or restore GPU
//! resources around a swapchain rebuild.

pub mod behavior;
pub mod camera;
pub mod coordinator;
pub mod entity;
pub mod graph;
pub mod shapes;
pub mod uniforms;

pub use behavior::{Behavior, BehaviorKind};
pub use camera::Camera;
pub use coordinator::{SceneCoordinator, SceneError, GLOBAL_UNIFORM_BINDING, OBJECT_UNIFORM_BINDING};
pub use entity::{Entity, Material};
pub use graph::{EntityId, EntityTable};
pub use uniforms::{GlobalUniforms, ObjectUniforms};
