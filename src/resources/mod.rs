use std::path::Path;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use cgmath::Matrix4;

use crate::{
    catalog::ModelDescriptor,
    config::GroundConfig,
    data_structures::{
        ground,
        model::{Material, ModelVertex},
        scene_graph::{GpuSurface, ModelRoot, Surface, identity},
        texture::Texture,
    },
};

/**
 * This module contains all logic for loading meshes and textures from external files.
 */
pub mod mesh;
pub mod texture;

/**
 * Loads the glTF scene of `descriptor` and uploads it to the GPU.
 *
 * Every mesh primitive becomes one [`Surface`] whose local transform is the
 * product of its node transforms. The returned root is still unplaced; the
 * viewer positions and scales it when attaching.
 */
pub async fn load_model(
    descriptor: &ModelDescriptor,
    key: &str,
    asset_root: &Path,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<ModelRoot> {
    let scene_path = descriptor.scene_path();
    let gltf_bytes = texture::load_binary(asset_root, &scene_path).await?;
    let gltf = gltf::Gltf::from_slice(&gltf_bytes)
        .with_context(|| format!("{} is not a valid glTF file", scene_path))?;

    let buffers = load_buffers(&gltf, descriptor, asset_root).await?;

    // Load materials
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let name = material.name().unwrap_or("material").to_string();
        let diffuse = match material.pbr_metallic_roughness().base_color_texture() {
            Some(info) => {
                load_image(
                    info.texture().source().source(),
                    &buffers,
                    descriptor,
                    asset_root,
                    device,
                    queue,
                )
                .await
            }
            None => None,
        };
        let diffuse = diffuse.unwrap_or_else(|| {
            let factor = material.pbr_metallic_roughness().base_color_factor();
            Texture::solid_colour(device, queue, srgb_bytes(factor), &name)
        });
        materials.push(Material::new(
            device,
            &name,
            diffuse,
            material.double_sided(),
            layout,
        ));
    }
    // glTF's default material for primitives that reference none
    let default_material = materials.len();
    materials.push(Material::new(
        device,
        "default",
        Texture::solid_colour(device, queue, [255; 4], "default"),
        false,
        layout,
    ));

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{} contains no scene", scene_path))?;

    let surfaces: Vec<Surface> = collect_primitives(&scene, &buffers, default_material)
        .into_iter()
        .map(|primitive| {
            let double_sided = materials
                .get(primitive.material)
                .is_some_and(|m| m.double_sided);
            let gpu = GpuSurface::new(
                device,
                mesh::create_mesh(
                    device,
                    &primitive.name,
                    &primitive.vertices,
                    &primitive.indices,
                    primitive.material,
                ),
            );
            Surface::headless(
                &primitive.name,
                mesh::geometry(&primitive.vertices, &primitive.indices),
                primitive.local,
                double_sided,
            )
            .with_gpu(gpu)
        })
        .collect();
    if surfaces.is_empty() {
        log::warn!("{} contains no drawable triangles", scene_path);
    }

    Ok(ModelRoot::new(key, surfaces, materials))
}

/// Fetches every buffer of `gltf`: the GLB blob, embedded `data:` URIs or files next to the scene.
pub async fn load_buffers(
    gltf: &gltf::Gltf,
    descriptor: &ModelDescriptor,
    asset_root: &Path,
) -> anyhow::Result<Vec<Vec<u8>>> {
    let blob = gltf.blob.as_deref();
    let buffer_futures = gltf.buffers().map(|buffer| async move {
        match buffer.source() {
            gltf::buffer::Source::Bin => blob
                .map(<[u8]>::to_vec)
                .context("Binary buffer referenced but no GLB blob present"),
            gltf::buffer::Source::Uri(uri) => fetch_asset(uri, descriptor, asset_root).await,
        }
    });
    futures::future::try_join_all(buffer_futures).await
}

async fn fetch_asset(
    uri: &str,
    descriptor: &ModelDescriptor,
    asset_root: &Path,
) -> anyhow::Result<Vec<u8>> {
    if uri.starts_with("data:") {
        decode_data_uri(uri)
    } else {
        texture::load_binary(asset_root, &descriptor.asset_path(uri)).await
    }
}

/// Decodes a base64 `data:` URI such as `data:application/octet-stream;base64,AAAA`.
fn decode_data_uri(uri: &str) -> anyhow::Result<Vec<u8>> {
    let (header, payload) = uri.split_once(',').context("Data URI without payload")?;
    if !header.ends_with(";base64") {
        anyhow::bail!("Only base64 data URIs are supported, got {}", header);
    }
    BASE64
        .decode(payload.as_bytes())
        .context("Data URI payload is not valid base64")
}

/// CPU side of one drawable triangle-list primitive.
#[derive(Debug)]
pub struct Primitive {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    /// Product of the node transforms from the scene root down to the primitive's node.
    pub local: Matrix4<f32>,
    pub material: usize,
}

/**
 * Walks the node hierarchy of `scene` and reads every triangle-list primitive.
 *
 * Other primitive modes and primitives without positions are skipped.
 * Primitives without a material get `default_material`.
 */
pub fn collect_primitives(
    scene: &gltf::Scene,
    buffers: &[Vec<u8>],
    default_material: usize,
) -> Vec<Primitive> {
    let mut out = Vec::new();
    for node in scene.nodes() {
        walk_node(&node, identity(), buffers, default_material, &mut out);
    }
    out
}

fn walk_node(
    node: &gltf::Node,
    parent: Matrix4<f32>,
    buffers: &[Vec<u8>],
    default_material: usize,
    out: &mut Vec<Primitive>,
) {
    let local = parent * Matrix4::from(node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let mesh_name = mesh.name().or(node.name()).unwrap_or("unknown_mesh");
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!("Skipping {:?} primitive of {}", primitive.mode(), mesh_name);
                continue;
            }
            let Some((vertices, indices)) = mesh::read_primitive(&primitive, buffers) else {
                log::warn!("Primitive of {} has no positions", mesh_name);
                continue;
            };
            out.push(Primitive {
                name: mesh_name.to_string(),
                vertices,
                indices,
                local,
                material: primitive.material().index().unwrap_or(default_material),
            });
        }
    }

    for child in node.children() {
        walk_node(&child, local, buffers, default_material, out);
    }
}

/// A texture that cannot be read or decoded is logged and replaced by the material's base colour.
async fn load_image(
    source: gltf::image::Source<'_>,
    buffers: &[Vec<u8>],
    descriptor: &ModelDescriptor,
    asset_root: &Path,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Option<Texture> {
    let result = match source {
        gltf::image::Source::View { view, mime_type } => {
            let start = view.offset();
            let end = start + view.length();
            buffers
                .get(view.buffer().index())
                .and_then(|buffer| buffer.get(start..end))
                .context("Image buffer view out of range")
                .and_then(|bytes| {
                    Texture::from_bytes(
                        device,
                        queue,
                        bytes,
                        &descriptor.file_name,
                        mime_type.split('/').next_back(),
                    )
                })
        }
        gltf::image::Source::Uri { uri, mime_type } => {
            fetch_asset(uri, descriptor, asset_root)
                .await
                .and_then(|bytes| {
                    Texture::from_bytes(
                        device,
                        queue,
                        &bytes,
                        uri,
                        mime_type.and_then(|mt| mt.split('/').next_back()),
                    )
                })
        }
    };
    match result {
        Ok(texture) => Some(texture),
        Err(e) => {
            log::warn!("Texture of {} could not be loaded: {:?}", descriptor.file_name, e);
            None
        }
    }
}

/// Builds the static ground plane as a one-surface, double-sided root.
pub fn load_ground(
    config: &GroundConfig,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> ModelRoot {
    let (vertices, indices) = ground::plane(config);
    let [r, g, b] = config.colour;
    let material = Material::new(
        device,
        "ground",
        Texture::solid_colour(device, queue, [r, g, b, 255], "ground"),
        true,
        layout,
    );
    let surface = Surface::headless("ground", mesh::geometry(&vertices, &indices), identity(), true)
        .with_gpu(GpuSurface::new(
            device,
            mesh::create_mesh(device, "ground", &vertices, &indices, 0),
        ));
    ModelRoot::new("ground", vec![surface], vec![material])
}

/// Linear base colour factor to sRGB texel bytes.
fn srgb_bytes(linear: [f32; 4]) -> [u8; 4] {
    let encode = |c: f32| {
        let c = c.clamp(0.0, 1.0);
        let s = if c <= 0.0031308 {
            12.92 * c
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        };
        (s * 255.0).round() as u8
    };
    [
        encode(linear[0]),
        encode(linear[1]),
        encode(linear[2]),
        (linear[3].clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use cgmath::{Point3, Transform};

    use super::*;

    // Triangle (0,0,0) (1,0,0) (0,1,0) plus u16 indices 0 1 2, embedded as base64.
    const NESTED_NODES: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "parent", "translation": [1.0, 0.0, 0.0], "mesh": 1, "children": [1] },
            { "name": "child", "scale": [2.0, 2.0, 2.0], "mesh": 0 }
        ],
        "meshes": [
            {
                "name": "plain",
                "primitives": [
                    { "attributes": { "POSITION": 0 } },
                    { "attributes": { "POSITION": 0 }, "mode": 1 }
                ]
            },
            {
                "name": "indexed",
                "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
            }
        ],
        "materials": [{ "name": "both", "doubleSided": true }],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
        ],
        "buffers": [{
            "byteLength": 44,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAA="
        }]
    }"#;

    fn nested_primitives() -> Vec<Primitive> {
        let gltf = gltf::Gltf::from_slice(NESTED_NODES.as_bytes()).unwrap();
        let descriptor = ModelDescriptor::new("models/", "nested.gltf", [1.0; 3]);
        let buffers =
            futures::executor::block_on(load_buffers(&gltf, &descriptor, Path::new("."))).unwrap();
        assert_eq!(buffers.len(), 1);
        assert_eq!(buffers[0].len(), 44);
        let scene = gltf.default_scene().unwrap();
        collect_primitives(&scene, &buffers, gltf.materials().len())
    }

    #[test]
    fn embedded_buffers_are_decoded() {
        assert_eq!(
            decode_data_uri("data:application/octet-stream;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(decode_data_uri("data:text/plain,hello").is_err());
        assert!(decode_data_uri("data:application/octet-stream;base64").is_err());
        assert!(decode_data_uri("data:application/octet-stream;base64,***").is_err());
    }

    #[test]
    fn node_transforms_multiply_down_the_hierarchy() {
        let primitives = nested_primitives();
        let names: Vec<_> = primitives.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["indexed", "plain"]);

        let parent = primitives[0].local.transform_point(Point3::new(1.0, 0.0, 0.0));
        assert_eq!(parent, Point3::new(2.0, 0.0, 0.0));
        let child = primitives[1].local.transform_point(Point3::new(1.0, 0.0, 0.0));
        assert_eq!(child, Point3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn only_triangle_lists_become_primitives() {
        let primitives = nested_primitives();
        assert_eq!(primitives.iter().filter(|p| p.name == "plain").count(), 1);
        for primitive in &primitives {
            assert_eq!(primitive.vertices.len(), 3);
            assert_eq!(primitive.vertices[1].position, [1.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn unindexed_primitives_draw_in_vertex_order() {
        let primitives = nested_primitives();
        assert_eq!(primitives[0].indices, [0, 1, 2]);
        assert_eq!(primitives[1].indices, [0, 1, 2]);
    }

    #[test]
    fn primitives_without_material_use_the_default() {
        let primitives = nested_primitives();
        assert_eq!(primitives[0].material, 0);
        assert_eq!(primitives[1].material, 1);
    }

    #[test]
    fn base_colour_is_encoded_as_srgb() {
        assert_eq!(srgb_bytes([0.0, 1.0, 0.5, 1.0]), [0, 255, 188, 255]);
        assert_eq!(srgb_bytes([2.0, -1.0, 0.0, 0.5]), [255, 0, 0, 128]);
    }
}
