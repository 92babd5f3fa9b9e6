//! Frame encoding.
//!
//! Every surface of the scene that carries GPU resources becomes one
//! [`Instanced`] draw. Draws are batched by pipeline so each pipeline is bound
//! once per frame: single sided surfaces first, then double sided ones (the
//! ground among them).

use std::iter;

use crate::{
    context::Context,
    data_structures::{
        model::{DrawModel, Material, Mesh},
        scene_graph::{ModelRoot, Scene},
    },
};

/// Data for drawing one surface: mesh, material and the instance buffer holding its world matrix.
pub struct Instanced<'a> {
    pub mesh: &'a Mesh,
    pub material: &'a Material,
    pub instance: &'a wgpu::Buffer,
    pub double_sided: bool,
}

/// Collects the draws of `root`. Surfaces without GPU resources or with a dangling material are skipped.
pub fn instanced_draws(root: &ModelRoot) -> impl Iterator<Item = Instanced<'_>> {
    root.surfaces.iter().filter_map(|surface| {
        let gpu = surface.gpu.as_ref()?;
        let material = root.materials.get(gpu.mesh.material);
        if material.is_none() {
            log::warn!(
                "Surface {} references missing material {}",
                surface.name,
                gpu.mesh.material
            );
        }
        Some(Instanced {
            mesh: &gpu.mesh,
            material: material?,
            instance: &gpu.instance_buffer,
            double_sided: surface.double_sided,
        })
    })
}

/// Renders `scene` into the current surface texture and presents it.
pub fn draw_scene(ctx: &Context, scene: &Scene) -> Result<(), wgpu::SurfaceError> {
    let output = ctx.surface.get_current_texture()?;
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let (color_view, resolve_target) = match &ctx.msaa_target {
        Some(msaa) => (&msaa.view, Some(&view)),
        None => (&view, None),
    };

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ctx.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &ctx.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        let (double_sided, basics): (Vec<Instanced>, Vec<Instanced>) = scene
            .roots()
            .flat_map(instanced_draws)
            .partition(|draw| draw.double_sided);

        for (pipeline, batch) in [
            (ctx.pipelines.for_sidedness(false), basics),
            (ctx.pipelines.for_sidedness(true), double_sided),
        ] {
            if batch.is_empty() {
                continue;
            }
            render_pass.set_pipeline(pipeline);
            for instanced in batch {
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_mesh_instanced(
                    instanced.mesh,
                    instanced.material,
                    0..1,
                    &ctx.camera.bind_group,
                    &ctx.light.bind_group,
                );
            }
        }
    }

    ctx.queue.submit(iter::once(encoder.finish()));
    output.present();
    Ok(())
}
