//! Viewer state: model switching, picking captions and annotation projection.
//!
//! [`Viewer`] owns everything that changes while the page is open. Switching
//! models is a two step protocol. [`Viewer::select`] removes the current model
//! right away and hands out a [`LoadRequest`]; the load runs asynchronously and
//! its result is brought back with [`Viewer::complete`]. Every `select`
//! invalidates the tickets issued before it, so a slow load that finishes after
//! the user picked another model is dropped instead of being shown next to it.

use std::collections::HashMap;

use cgmath::{Point2, Point3, Vector3};

use crate::{
    camera::{Camera, Projection},
    catalog::{ModelCatalog, ModelDescriptor},
    config::{NO_FEATURE_CAPTION, ViewerConfig},
    data_structures::{
        instance::Instance,
        scene_graph::{Lights, ModelRoot, Scene, SurfaceId},
    },
    pick::{PickHit, Ray, pick},
    ui::Ui,
};

/// Identifies one model load. Only the most recently issued ticket is current.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

/// Work order for the loader.
#[derive(Clone, Debug)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    /// Catalog key after fallback.
    pub key: String,
    pub descriptor: ModelDescriptor,
}

#[derive(Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Attached { key: String, surfaces: usize },
    /// Superseded by a later selection and discarded.
    Stale,
    Failed,
}

#[derive(Debug)]
struct PendingLoad {
    ticket: LoadTicket,
    key: String,
    descriptor: ModelDescriptor,
    started: instant::Instant,
}

/// Caption text per surface. Written when a root is attached, dropped when it is detached.
#[derive(Debug, Default)]
pub struct CaptionTable {
    captions: HashMap<SurfaceId, String>,
}

impl CaptionTable {
    pub fn insert_root(&mut self, root: &ModelRoot, caption: &str) {
        for id in root.surface_ids() {
            self.captions.insert(id, caption.to_string());
        }
    }

    pub fn remove_root(&mut self, root: &ModelRoot) {
        for id in root.surface_ids() {
            self.captions.remove(&id);
        }
    }

    pub fn get(&self, id: SurfaceId) -> Option<&str> {
        self.captions.get(&id).map(String::as_str)
    }

    /// Caption of `id`, or the generic text for surfaces without one.
    pub fn caption_for(&self, id: SurfaceId) -> &str {
        self.get(id).unwrap_or(NO_FEATURE_CAPTION)
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }
}

#[derive(Debug)]
pub struct Viewer {
    catalog: ModelCatalog,
    scene: Scene,
    captions: CaptionTable,
    model_offset: Vector3<f32>,
    annotations: Vec<(String, Point3<f32>)>,
    annotation_positions: Vec<Option<Point2<f32>>>,
    selected: Option<String>,
    caption: Option<String>,
    next_ticket: u64,
    pending: Option<PendingLoad>,
}

impl Viewer {
    /// A viewer showing only `ground`. No model is selected yet.
    pub fn new(config: &ViewerConfig, ground: ModelRoot) -> Self {
        Self {
            catalog: config.catalog.clone(),
            scene: Scene::new(ground, Lights::from(&config.lights)),
            captions: CaptionTable::default(),
            model_offset: config.model_offset,
            annotations: config.annotations.clone(),
            annotation_positions: vec![None; config.annotations.len()],
            selected: None,
            caption: None,
            next_ticket: 0,
            pending: None,
        }
    }

    /**
     * Starts showing the catalog entry `key`.
     *
     * Unknown keys fall back to the catalog default. The current model is
     * removed and the caption cleared immediately; the returned request must be
     * loaded and passed back to [`Viewer::complete`].
     */
    pub fn select(&mut self, key: &str, ui: &mut dyn Ui) -> LoadRequest {
        let (resolved, descriptor) = self.catalog.resolve(key);
        let (resolved, descriptor) = (resolved.to_string(), descriptor.clone());
        log::info!("Selected model {} ({})", resolved, descriptor.scene_path());

        if let Some(old) = self.scene.detach() {
            self.captions.remove_root(&old);
            log::debug!("Detached model {}", old.key);
        }
        self.caption = None;
        ui.clear_caption();

        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        if let Some(previous) = self.pending.take() {
            log::debug!("Load of {} superseded", previous.key);
        }
        self.pending = Some(PendingLoad {
            ticket,
            key: resolved.clone(),
            descriptor: descriptor.clone(),
            started: instant::Instant::now(),
        });
        self.selected = Some(resolved.clone());

        LoadRequest {
            ticket,
            key: resolved,
            descriptor,
        }
    }

    /// Selects the catalog default.
    pub fn select_default(&mut self, ui: &mut dyn Ui) -> LoadRequest {
        let key = self.catalog.default_key().to_string();
        self.select(&key, ui)
    }

    /// Hands a finished load back to the viewer.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        result: anyhow::Result<ModelRoot>,
        ui: &mut dyn Ui,
    ) -> LoadOutcome {
        let pending = match self.pending.take() {
            Some(pending) if pending.ticket == ticket => pending,
            other => {
                self.pending = other;
                log::debug!("Discarding stale load {:?}", ticket);
                return LoadOutcome::Stale;
            }
        };

        let mut root = match result {
            Ok(root) => root,
            Err(e) => {
                log::error!("Failed to load model {}: {:?}", pending.key, e);
                return LoadOutcome::Failed;
            }
        };

        root.key = pending.key.clone();
        root.set_transform(Instance::placed(
            self.model_offset,
            pending.descriptor.scale,
        ));
        if let Some(displaced) = self.scene.attach(root) {
            self.captions.remove_root(&displaced);
        }
        let surfaces = match self.scene.model_root() {
            Some(root) => {
                self.captions.insert_root(root, &pending.descriptor.feature);
                root.surfaces.len()
            }
            None => 0,
        };
        ui.hide_progress();
        log::info!(
            "Loaded model {} with {} surfaces in {:?}",
            pending.key,
            surfaces,
            pending.started.elapsed()
        );

        LoadOutcome::Attached {
            key: pending.key,
            surfaces,
        }
    }

    /**
     * Shows the caption of the nearest surface under `ray`.
     *
     * A miss leaves the current caption untouched.
     */
    pub fn click(&mut self, ray: &Ray, ui: &mut dyn Ui) -> Option<PickHit> {
        let hit = pick(&self.scene, ray)?;
        let caption = self.captions.caption_for(hit.surface).to_string();
        log::info!(
            "Picked surface {:?} at distance {:.3}",
            hit.surface,
            hit.distance
        );
        ui.set_caption(&caption);
        self.caption = Some(caption);
        Some(hit)
    }

    /// Projects every annotation anchor to screen space and hands the result to `ui`.
    pub fn update_annotations(
        &mut self,
        camera: &Camera,
        projection: &Projection,
        width: f32,
        height: f32,
        ui: &mut dyn Ui,
    ) {
        for ((id, anchor), position) in self
            .annotations
            .iter()
            .zip(self.annotation_positions.iter_mut())
        {
            *position = camera
                .project_to_screen(*anchor, projection, width, height)
                .map(|p| Point2::new(p.x, p.y));
            ui.place_annotation(id, *position);
        }
    }

    pub fn annotation_positions(&self) -> impl Iterator<Item = (&str, Option<Point2<f32>>)> {
        self.annotations
            .iter()
            .zip(self.annotation_positions.iter())
            .map(|((id, _), position)| (id.as_str(), *position))
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn captions(&self) -> &CaptionTable {
        &self.captions
    }

    pub fn selected_key(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Caption currently shown, `None` when the display is empty.
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}
