//! The displayed scene: ground, lights and at most one model root.
//!
//! Every drawable part is a [`Surface`]: CPU triangles for picking plus,
//! when created on a device, the GPU mesh and instance buffer used for
//! drawing. Surfaces are grouped into [`ModelRoot`]s which are attached and
//! detached as a unit.

use cgmath::{Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::data_structures::{
    instance::{Instance, InstanceRaw},
    model,
};

/// Stable identifier of one pickable surface, assigned when its root enters the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

impl SurfaceId {
    /// The ground plane is the first surface to enter every scene.
    pub const GROUND: SurfaceId = SurfaceId(0);

    /// Placeholder until the owning root is attached.
    pub const UNASSIGNED: SurfaceId = SurfaceId(u32::MAX);
}

/// Indexed triangle list in the surface's own space.
#[derive(Clone, Debug, Default)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    /// Triangles with out-of-range indices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [cgmath::Point3<f32>; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let a = self.positions.get(tri[0] as usize)?;
            let b = self.positions.get(tri[1] as usize)?;
            let c = self.positions.get(tri[2] as usize)?;
            Some([(*a).into(), (*b).into(), (*c).into()])
        })
    }
}

#[derive(Debug)]
pub struct GpuSurface {
    pub mesh: model::Mesh,
    pub instance_buffer: wgpu::Buffer,
}

impl GpuSurface {
    pub fn new(device: &wgpu::Device, mesh: model::Mesh) -> Self {
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(&[Instance::default().to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            mesh,
            instance_buffer,
        }
    }
}

/// One visual sub-part of a model.
#[derive(Debug)]
pub struct Surface {
    pub id: SurfaceId,
    pub name: String,
    pub geometry: Geometry,
    /// Transform from surface space into the space of the owning root.
    pub local: Matrix4<f32>,
    pub double_sided: bool,
    pub gpu: Option<GpuSurface>,
}

impl Surface {
    /// A surface without GPU resources. It can be picked but is never drawn.
    pub fn headless(name: &str, geometry: Geometry, local: Matrix4<f32>, double_sided: bool) -> Self {
        Self {
            id: SurfaceId::UNASSIGNED,
            name: name.to_string(),
            geometry,
            local,
            double_sided,
            gpu: None,
        }
    }

    pub fn with_gpu(mut self, gpu: GpuSurface) -> Self {
        self.gpu = Some(gpu);
        self
    }
}

/// Top level node of one loaded asset.
#[derive(Debug)]
pub struct ModelRoot {
    pub key: String,
    transform: Instance,
    pub surfaces: Vec<Surface>,
    pub materials: Vec<model::Material>,
    // instance buffers lag behind `transform`
    dirty: bool,
}

impl ModelRoot {
    pub fn new(key: &str, surfaces: Vec<Surface>, materials: Vec<model::Material>) -> Self {
        Self {
            key: key.to_string(),
            transform: Instance::default(),
            surfaces,
            materials,
            dirty: true,
        }
    }

    pub fn headless(key: &str, surfaces: Vec<Surface>) -> Self {
        Self::new(key, surfaces, Vec::new())
    }

    pub fn transform(&self) -> &Instance {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Instance) {
        self.transform = transform;
        self.dirty = true;
    }

    pub fn world_matrix(&self, surface: &Surface) -> Matrix4<f32> {
        self.transform.to_matrix() * surface.local
    }

    pub fn surface_ids(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.surfaces.iter().map(|surface| surface.id)
    }

    pub fn needs_upload(&self) -> bool {
        self.dirty && self.surfaces.iter().any(|surface| surface.gpu.is_some())
    }

    /// Uploads each surface's world matrix into its instance buffer.
    pub fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        let root = self.transform.to_matrix();
        for surface in &self.surfaces {
            if let Some(gpu) = &surface.gpu {
                let raw = InstanceRaw::from_matrix(root * surface.local);
                queue.write_buffer(&gpu.instance_buffer, 0, bytemuck::cast_slice(&[raw]));
            }
        }
        self.dirty = false;
    }
}

#[derive(Clone, Debug)]
pub struct AmbientLight {
    pub colour: [f32; 3],
    pub intensity: f32,
}

#[derive(Clone, Debug)]
pub struct DirectionalLight {
    pub colour: [f32; 3],
    pub intensity: f32,
    pub position: cgmath::Point3<f32>,
    pub target: cgmath::Point3<f32>,
}

#[derive(Clone, Debug)]
pub struct Lights {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
}

impl From<&crate::config::LightsConfig> for Lights {
    fn from(config: &crate::config::LightsConfig) -> Self {
        Self {
            ambient: AmbientLight {
                colour: config.ambient_colour,
                intensity: config.ambient_intensity,
            },
            directional: DirectionalLight {
                colour: config.directional_colour,
                intensity: config.directional_intensity,
                position: config.directional_position,
                target: cgmath::Point3::new(0.0, 0.0, 0.0),
            },
        }
    }
}

/**
 * The scene container.
 *
 * Holds the static ground and lights and zero or one model root. Surface ids
 * come from a counter that never rewinds, so an id never refers to surfaces of
 * two different roots.
 */
#[derive(Debug)]
pub struct Scene {
    ground: ModelRoot,
    pub lights: Lights,
    model: Option<ModelRoot>,
    next_surface_id: u32,
}

impl Scene {
    pub fn new(ground: ModelRoot, lights: Lights) -> Self {
        let mut scene = Self {
            ground,
            lights,
            model: None,
            next_surface_id: 0,
        };
        let mut ground = std::mem::replace(&mut scene.ground, ModelRoot::headless("", Vec::new()));
        scene.assign_ids(&mut ground);
        scene.ground = ground;
        scene
    }

    fn assign_ids(&mut self, root: &mut ModelRoot) {
        for surface in root.surfaces.iter_mut() {
            surface.id = SurfaceId(self.next_surface_id);
            self.next_surface_id += 1;
        }
    }

    /// Installs `root` and returns the root it displaced.
    pub fn attach(&mut self, mut root: ModelRoot) -> Option<ModelRoot> {
        self.assign_ids(&mut root);
        self.model.replace(root)
    }

    pub fn detach(&mut self) -> Option<ModelRoot> {
        self.model.take()
    }

    pub fn model_root(&self) -> Option<&ModelRoot> {
        self.model.as_ref()
    }

    pub fn ground(&self) -> &ModelRoot {
        &self.ground
    }

    pub fn model_root_count(&self) -> usize {
        self.model.iter().count()
    }

    /// Ground first, then the model root if one is attached.
    pub fn roots(&self) -> impl Iterator<Item = &ModelRoot> {
        std::iter::once(&self.ground).chain(self.model.iter())
    }

    /// Every surface currently in the scene paired with its world matrix.
    pub fn surfaces(&self) -> impl Iterator<Item = (&Surface, Matrix4<f32>)> {
        self.roots().flat_map(|root| {
            root.surfaces
                .iter()
                .map(move |surface| (surface, root.world_matrix(surface)))
        })
    }

    pub fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        if self.ground.needs_upload() {
            self.ground.write_to_buffers(queue);
        }
        if let Some(model) = self.model.as_mut().filter(|model| model.needs_upload()) {
            model.write_to_buffers(queue);
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new(
            ModelRoot::headless("ground", Vec::new()),
            Lights::from(&crate::config::LightsConfig::default()),
        )
    }
}

/// Identity transform, for surfaces directly under their root.
pub fn identity() -> Matrix4<f32> {
    Matrix4::identity()
}
