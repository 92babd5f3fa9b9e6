use wgpu::util::DeviceExt;

use crate::data_structures::{model, scene_graph::Geometry};

/**
 * Reads the vertices and indices of a triangle-list primitive.
 *
 * Missing normals and texture coordinates default to zero. Primitives without
 * an index accessor are drawn in vertex order. Returns `None` for primitives
 * without positions.
 */
pub fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
) -> Option<(Vec<model::ModelVertex>, Vec<u32>)> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<model::ModelVertex> = reader
        .read_positions()?
        .map(|position| model::ModelVertex {
            position,
            ..Default::default()
        })
        .collect();

    if let Some(normals) = reader.read_normals() {
        vertices
            .iter_mut()
            .zip(normals)
            .for_each(|(vertex, normal)| vertex.normal = normal);
    }
    if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
        vertices
            .iter_mut()
            .zip(tex_coords)
            .for_each(|(vertex, tex_coord)| vertex.tex_coords = tex_coord);
    }

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    Some((vertices, indices))
}

pub fn geometry(vertices: &[model::ModelVertex], indices: &[u32]) -> Geometry {
    Geometry::new(
        vertices.iter().map(|vertex| vertex.position).collect(),
        indices.to_vec(),
    )
}

pub fn create_mesh(
    device: &wgpu::Device,
    name: &str,
    vertices: &[model::ModelVertex],
    indices: &[u32],
    material: usize,
) -> model::Mesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Vertex Buffer", name)),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Index Buffer", name)),
        contents: bytemuck::cast_slice(indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    model::Mesh {
        name: name.to_string(),
        vertex_buffer,
        index_buffer,
        num_elements: indices.len() as u32,
        material,
    }
}
