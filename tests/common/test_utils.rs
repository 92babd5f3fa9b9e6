use std::collections::HashMap;

use model_viewer::{
    ViewerConfig,
    cgmath::{Matrix4, Point2, SquareMatrix},
    data_structures::scene_graph::{Geometry, ModelRoot, Surface},
    ui::Ui,
    viewer::Viewer,
};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum UiCall {
    ClearCaption,
    SetCaption(String),
    HideProgress,
}

/// Records what the viewer writes to the page.
#[derive(Debug)]
pub(crate) struct RecordingUi {
    pub calls: Vec<UiCall>,
    pub caption: String,
    pub progress_visible: bool,
    pub annotations: HashMap<String, Option<Point2<f32>>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            caption: String::new(),
            progress_visible: true,
            annotations: HashMap::new(),
        }
    }
}

impl Default for RecordingUi {
    fn default() -> Self {
        Self::new()
    }
}

impl Ui for RecordingUi {
    fn clear_caption(&mut self) {
        self.caption.clear();
        self.calls.push(UiCall::ClearCaption);
    }

    fn set_caption(&mut self, text: &str) {
        self.caption = text.to_string();
        self.calls.push(UiCall::SetCaption(text.to_string()));
    }

    fn hide_progress(&mut self) {
        self.progress_visible = false;
        self.calls.push(UiCall::HideProgress);
    }

    fn place_annotation(&mut self, id: &str, position: Option<Point2<f32>>) {
        self.annotations.insert(id.to_string(), position);
    }
}

/// Axis aligned box spanning `min`..`max` with outward facing, counter-clockwise triangles.
pub(crate) fn cuboid(min: [f32; 3], max: [f32; 3]) -> Geometry {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    let positions = vec![
        [x0, y0, z0],
        [x1, y0, z0],
        [x1, y1, z0],
        [x0, y1, z0],
        [x0, y0, z1],
        [x1, y0, z1],
        [x1, y1, z1],
        [x0, y1, z1],
    ];
    #[rustfmt::skip]
    let indices = vec![
        4, 5, 6, 4, 6, 7, // +z
        1, 0, 3, 1, 3, 2, // -z
        5, 1, 2, 5, 2, 6, // +x
        0, 4, 7, 0, 7, 3, // -x
        7, 6, 2, 7, 2, 3, // +y
        0, 1, 5, 0, 5, 4, // -y
    ];
    Geometry::new(positions, indices)
}

/// Flat square in the XZ plane at height `y`, facing up.
pub(crate) fn floor(half_size: f32, y: f32) -> Geometry {
    let s = half_size;
    Geometry::new(
        vec![[-s, y, -s], [s, y, -s], [s, y, s], [-s, y, s]],
        vec![0, 3, 2, 0, 2, 1],
    )
}

/// A GPU-less model: one unit cube surface per entry of `parts`, given as cube centres in model space.
pub(crate) fn headless_model(parts: &[[f32; 3]]) -> ModelRoot {
    let surfaces = parts
        .iter()
        .enumerate()
        .map(|(i, [x, y, z])| {
            Surface::headless(
                &format!("part-{}", i),
                cuboid([x - 0.5, y - 0.5, z - 0.5], [x + 0.5, y + 0.5, z + 0.5]),
                Matrix4::identity(),
                false,
            )
        })
        .collect();
    ModelRoot::headless("", surfaces)
}

/// The default viewer over a 20x20 ground plane without GPU resources.
pub(crate) fn headless_viewer() -> Viewer {
    let config = ViewerConfig::default();
    let ground = ModelRoot::headless(
        "ground",
        vec![Surface::headless(
            "ground",
            floor(10.0, 0.0),
            Matrix4::identity(),
            true,
        )],
    );
    Viewer::new(&config, ground)
}
