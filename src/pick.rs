//! Object picking and selection.
//!
//! Picking casts a ray from the camera through the clicked pixel and tests it
//! against the triangles of every surface in the scene on the CPU:
//! 1. Convert the pointer position to normalized device coordinates ([`crate::camera::ndc_from_pixels`])
//! 2. Unproject it into a world-space [`Ray`] ([`crate::camera::Camera::cast_ray`])
//! 3. Transform the ray into each surface's own space and intersect its triangles
//! 4. Return the nearest hit in front of the camera
//!
//! Single-sided surfaces only register hits on their front faces, matching what
//! the renderer draws with back-face culling enabled.

use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Transform, Vector3};

use crate::data_structures::scene_graph::{Scene, Surface, SurfaceId};

const EPSILON: f32 = 1e-7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Unit length
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction * distance
    }

    /// The same ray expressed in another space. The direction is left unnormalized
    /// so that hit parameters stay comparable between spaces.
    fn transformed(&self, matrix: &Matrix4<f32>) -> (Point3<f32>, Vector3<f32>) {
        (
            matrix.transform_point(self.origin),
            matrix.transform_vector(self.direction),
        )
    }
}

/// Nearest intersection of a ray with the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickHit {
    pub surface: SurfaceId,
    /// World-space distance from the ray origin.
    pub distance: f32,
    pub point: Point3<f32>,
}

/**
 * Möller–Trumbore ray/triangle intersection.
 *
 * Returns the ray parameter `t` of the hit, so the hit point is
 * `origin + t * direction`. Hits at or behind the origin are rejected.
 * With `cull_back_faces` triangles seen from behind (clockwise from the
 * ray's point of view) never hit.
 */
pub fn ray_triangle(
    origin: Point3<f32>,
    direction: Vector3<f32>,
    triangle: &[Point3<f32>; 3],
    cull_back_faces: bool,
) -> Option<f32> {
    let [v0, v1, v2] = *triangle;
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = direction.cross(edge2);
    let det = edge1.dot(h);

    if cull_back_faces {
        if det < EPSILON {
            return None;
        }
    } else if det.abs() < EPSILON {
        // parallel to the triangle plane
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - v0;
    let u = inv_det * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = inv_det * direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * edge2.dot(q);
    (t > EPSILON).then_some(t)
}

/// Nearest hit of `ray` on one surface placed by `world`.
pub fn pick_surface(surface: &Surface, world: &Matrix4<f32>, ray: &Ray) -> Option<PickHit> {
    let inverse = world.invert()?;
    let (origin, direction) = ray.transformed(&inverse);
    let cull = !surface.double_sided;

    let t = surface
        .geometry
        .triangles()
        .filter_map(|triangle| ray_triangle(origin, direction, &triangle, cull))
        .min_by(|a, b| a.total_cmp(b))?;

    // t is in local units along the transformed direction; measure it again in world space
    let point = world.transform_point(origin + direction * t);
    Some(PickHit {
        surface: surface.id,
        distance: (point - ray.origin).magnitude(),
        point,
    })
}

/// Determine which surface of the scene the ray hits first.
///
/// # Arguments
///
/// * `scene` every surface currently attached is tested, the ground included
/// * `ray` world-space ray, usually from [`crate::camera::Camera::cast_ray`]
///
/// # Returns
///
/// The nearest hit with a positive distance, or `None` if the ray misses everything.
pub fn pick(scene: &Scene, ray: &Ray) -> Option<PickHit> {
    scene
        .surfaces()
        .filter_map(|(surface, world)| pick_surface(surface, &world, ray))
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{Matrix4, Vector3};

    use super::*;
    use crate::data_structures::scene_graph::{Geometry, ModelRoot, Surface, identity};

    fn quad(z: f32) -> Geometry {
        // counter-clockwise seen from +z
        Geometry::new(
            vec![[-1.0, -1.0, z], [1.0, -1.0, z], [1.0, 1.0, z], [-1.0, 1.0, z]],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    fn towards_minus_z() -> Ray {
        Ray::new(Point3::new(0.2, 0.1, 10.0), Vector3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn front_face_is_hit() {
        let tri = [
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let ray = towards_minus_z();
        let t = ray_triangle(ray.origin, ray.direction, &tri, true).unwrap();
        assert_relative_eq!(t, 10.0, epsilon = 1e-5);
    }

    #[test]
    fn back_face_is_culled_only_when_requested() {
        let tri = [
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
        ];
        let ray = towards_minus_z();
        assert_eq!(ray_triangle(ray.origin, ray.direction, &tri, true), None);
        assert!(ray_triangle(ray.origin, ray.direction, &tri, false).is_some());
    }

    #[test]
    fn hits_behind_the_origin_are_ignored() {
        let tri = [
            Point3::new(-1.0, -1.0, 20.0),
            Point3::new(1.0, -1.0, 20.0),
            Point3::new(0.0, 1.0, 20.0),
        ];
        let ray = towards_minus_z();
        assert_eq!(ray_triangle(ray.origin, ray.direction, &tri, false), None);
    }

    #[test]
    fn misses_outside_the_triangle() {
        let tri = [
            Point3::new(5.0, 5.0, 0.0),
            Point3::new(6.0, 5.0, 0.0),
            Point3::new(5.0, 6.0, 0.0),
        ];
        let ray = towards_minus_z();
        assert_eq!(ray_triangle(ray.origin, ray.direction, &tri, false), None);
    }

    #[test]
    fn pick_returns_nearest_surface() {
        let ground = ModelRoot::headless(
            "ground",
            vec![Surface::headless("ground", quad(-5.0), identity(), true)],
        );
        let mut scene = Scene::new(ground, Scene::default().lights);
        scene.attach(ModelRoot::headless(
            "model",
            vec![
                Surface::headless("far", quad(0.0), identity(), false),
                Surface::headless("near", quad(2.0), identity(), false),
            ],
        ));
        let hit = pick(&scene, &towards_minus_z()).unwrap();
        let near = scene.model_root().unwrap().surfaces[1].id;
        assert_eq!(hit.surface, near);
        assert_relative_eq!(hit.distance, 8.0, epsilon = 1e-4);
        assert_relative_eq!(hit.point.z, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn pick_respects_root_transform() {
        let mut root = ModelRoot::headless(
            "model",
            vec![Surface::headless("part", quad(0.0), identity(), false)],
        );
        root.set_transform(crate::data_structures::instance::Instance::placed(
            Vector3::new(0.0, 0.0, 1.0),
            [0.5, 0.5, 0.5],
        ));
        let mut scene = Scene::default();
        scene.attach(root);

        let hit = pick(&scene, &towards_minus_z()).unwrap();
        assert_relative_eq!(hit.distance, 9.0, epsilon = 1e-4);

        // scaled quad spans -0.5..0.5, so this ray passes beside it
        let beside = Ray::new(Point3::new(0.8, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(pick(&scene, &beside), None);
    }

    #[test]
    fn nested_surface_transform_is_applied() {
        let local = Matrix4::from_translation(Vector3::new(3.0, 0.0, 0.0));
        let mut scene = Scene::default();
        scene.attach(ModelRoot::headless(
            "model",
            vec![Surface::headless("moved", quad(0.0), local, false)],
        ));
        assert_eq!(pick(&scene, &towards_minus_z()), None);
        let shifted = Ray::new(Point3::new(3.2, 0.1, 10.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(pick(&scene, &shifted).is_some());
    }

    #[test]
    fn empty_scene_has_no_hit() {
        assert_eq!(pick(&Scene::default(), &towards_minus_z()), None);
    }
}
