//! Viewer data structures: meshes, textures, instances and the scene.
//!
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds per-root placement and the raw per-instance GPU data
//! - `scene_graph` holds the scene container with its ground and model root
//! - `ground` builds the static ground plane

pub mod ground;
pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
