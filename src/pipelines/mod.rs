//! Render pipelines.
//!
//! Both pipelines share one shader and bind group layout; they only differ
//! in face culling.

pub mod basic;
pub mod light;

#[derive(Debug)]
pub struct Pipelines {
    /// Culls back faces.
    pub basic: wgpu::RenderPipeline,
    pub double_sided: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        material_bind_group_layout: &wgpu::BindGroupLayout,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
        sample_count: u32,
    ) -> Self {
        let mk = |cull_mode| {
            basic::mk_basic_pipeline(
                device,
                config,
                material_bind_group_layout,
                camera_bind_group_layout,
                light_bind_group_layout,
                cull_mode,
                sample_count,
            )
        };
        Self {
            basic: mk(Some(wgpu::Face::Back)),
            double_sided: mk(None),
        }
    }

    pub fn for_sidedness(&self, double_sided: bool) -> &wgpu::RenderPipeline {
        if double_sided {
            &self.double_sided
        } else {
            &self.basic
        }
    }
}
