//! The static ground plane.

use crate::{config::GroundConfig, data_structures::model::ModelVertex};

/**
 * A `width` x `depth` grid of `segments` x `segments` quads in the XZ plane at y = 0.
 *
 * Normals point up and texture coordinates run 0..1 across the plane. The
 * triangle winding is counter-clockwise seen from above.
 */
pub fn plane(config: &GroundConfig) -> (Vec<ModelVertex>, Vec<u32>) {
    let segments = config.segments.max(1);
    let columns = segments + 1;
    let half_width = config.width / 2.0;
    let half_depth = config.depth / 2.0;

    let mut vertices = Vec::with_capacity((columns * columns) as usize);
    for row in 0..columns {
        let v = row as f32 / segments as f32;
        // rows run from the far edge (-z) towards the camera (+z)
        let z = -half_depth + v * config.depth;
        for column in 0..columns {
            let u = column as f32 / segments as f32;
            let x = -half_width + u * config.width;
            vertices.push(ModelVertex {
                position: [x, 0.0, z],
                tex_coords: [u, v],
                normal: [0.0, 1.0, 0.0],
            });
        }
    }

    let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
    for row in 0..segments {
        for column in 0..segments {
            let a = row * columns + column;
            let b = a + columns;
            let c = b + 1;
            let d = a + 1;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;

    use super::*;

    #[test]
    fn plane_has_expected_size() {
        let (vertices, indices) = plane(&GroundConfig::default());
        assert_eq!(vertices.len(), 33 * 33);
        assert_eq!(indices.len(), 32 * 32 * 6);
        let max_x = vertices.iter().map(|v| v.position[0]).fold(f32::MIN, f32::max);
        let min_z = vertices.iter().map(|v| v.position[2]).fold(f32::MAX, f32::min);
        assert_eq!(max_x, 10.0);
        assert_eq!(min_z, -10.0);
        assert!(vertices.iter().all(|v| v.position[1] == 0.0));
    }

    #[test]
    fn triangles_face_up() {
        let (vertices, indices) = plane(&GroundConfig::default());
        for tri in indices.chunks_exact(3) {
            let p = |i: u32| cgmath::Vector3::from(vertices[i as usize].position);
            let normal = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            assert!(normal.normalize().y > 0.99);
        }
    }
}
