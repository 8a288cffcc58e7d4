//! Asset loading
//!
//! Mesh files are parsed into [`MeshData`], the vertex/index pair the scene
//! uploads verbatim.

pub mod obj_loader;

pub use obj_loader::{MeshData, ObjError, ObjLoader};
