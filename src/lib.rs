//! model-viewer
//!
//! A small cross-platform 3D model viewer for native and WASM. It shows one
//! glTF model at a time on a ground plane, orbits the camera around it and
//! shows a caption for whatever surface is clicked.
//!
//! High-level modules
//! - `camera`: camera, projection, the orbit controller and the camera uniform
//! - `catalog`: the fixed table of selectable models
//! - `config`: every tunable constant of the viewer
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: meshes, textures, instances and the scene container
//! - `flow`: the winit event loop and asynchronous loading
//! - `pick`: CPU ray casting against the scene
//! - `pipelines`: the lit render pipelines and the light uniform
//! - `render`: frame encoding
//! - `resources`: helpers to load glTF models and textures into GPU resources
//! - `ui`: captions, progress indicator and annotations (DOM or log backed)
//! - `viewer`: model switching and caption state
//!

pub mod camera;
pub mod catalog;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pick;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod ui;
pub mod viewer;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use config::ViewerConfig;
pub use flow::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point, runs the viewer with its default configuration.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run(ViewerConfig::default()).map_err(|e| wasm_bindgen::JsValue::from_str(&format!("{:?}", e)))
}
