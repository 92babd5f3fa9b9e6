//! Viewer configuration.
//!
//! Everything that is a fixed constant of the viewer lives here so that the
//! event loop, the scene setup and the tests read the same numbers. The
//! [`Default`] impl is the configuration the viewer ships with.

use crate::catalog::ModelCatalog;

/// Environment variable overriding the native asset root directory.
pub const ASSET_ROOT_ENV: &str = "MODEL_VIEWER_ASSETS";

/// Caption shown when a picked surface carries no feature text (e.g. the ground).
pub const NO_FEATURE_CAPTION: &str = "No feature data available.";

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub clear_colour: wgpu::Color,
    /// Requested MSAA sample count. Falls back to 1 where the surface format cannot be multisampled.
    pub sample_count: u32,
    pub camera: CameraConfig,
    pub controls: OrbitConfig,
    pub ground: GroundConfig,
    pub lights: LightsConfig,
    /// Fixed world offset applied to every loaded model root.
    pub model_offset: cgmath::Vector3<f32>,
    /// World anchors that are projected to screen space every frame, keyed by element id.
    pub annotations: Vec<(String, cgmath::Point3<f32>)>,
    pub catalog: ModelCatalog,
    /// Directory (native) that relative asset paths are resolved against.
    pub asset_root: std::path::PathBuf,
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub position: cgmath::Point3<f32>,
    pub fovy: cgmath::Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

#[derive(Clone, Debug)]
pub struct OrbitConfig {
    pub target: cgmath::Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_pan: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians measured from the +Y axis.
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub auto_rotate: bool,
}

#[derive(Clone, Debug)]
pub struct GroundConfig {
    pub width: f32,
    pub depth: f32,
    pub segments: u32,
    /// sRGB bytes
    pub colour: [u8; 3],
}

#[derive(Clone, Debug)]
pub struct LightsConfig {
    pub ambient_colour: [f32; 3],
    pub ambient_intensity: f32,
    pub directional_colour: [f32; 3],
    pub directional_intensity: f32,
    pub directional_position: cgmath::Point3<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: cgmath::Point3::new(4.0, 5.0, 11.0),
            fovy: cgmath::Deg(45.0),
            znear: 1.0,
            zfar: 1000.0,
        }
    }
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            target: cgmath::Point3::new(0.0, 1.0, 0.0),
            enable_damping: true,
            damping_factor: 0.05,
            enable_pan: false,
            min_distance: 5.0,
            max_distance: 20.0,
            min_polar_angle: 0.5,
            max_polar_angle: 1.5,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            auto_rotate: false,
        }
    }
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            width: 20.0,
            depth: 20.0,
            segments: 32,
            colour: [0x55, 0x55, 0x55],
        }
    }
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            ambient_colour: [1.0, 1.0, 1.0],
            ambient_intensity: 1.0,
            directional_colour: [1.0, 1.0, 1.0],
            directional_intensity: 1.0,
            directional_position: cgmath::Point3::new(5.0, 15.0, -10.0),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            clear_colour: wgpu::Color::BLACK,
            sample_count: 4,
            camera: CameraConfig::default(),
            controls: OrbitConfig::default(),
            ground: GroundConfig::default(),
            lights: LightsConfig::default(),
            model_offset: cgmath::Vector3::new(0.0, 1.15, -1.0),
            annotations: vec![
                ("annotation-1".to_string(), cgmath::Point3::new(1.0, 1.5, -1.0)),
                ("annotation-2".to_string(), cgmath::Point3::new(2.0, 2.5, -2.0)),
            ],
            catalog: ModelCatalog::default(),
            asset_root: default_asset_root(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_asset_root() -> std::path::PathBuf {
    std::env::var_os(ASSET_ROOT_ENV)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("."))
}

// Web builds resolve assets against the page URL instead.
#[cfg(target_arch = "wasm32")]
fn default_asset_root() -> std::path::PathBuf {
    std::path::PathBuf::new()
}
