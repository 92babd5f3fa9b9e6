//! Camera, projection and the orbit controller.
//!
//! The camera always looks at the controller's target. The controller keeps
//! its state in spherical coordinates around that target and is advanced once
//! per frame; pointer input only accumulates deltas that `update` applies
//! (damped when damping is enabled).

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, Vector4};

use crate::{
    config::{CameraConfig, OrbitConfig},
    pick::Ray,
};

/// wgpu's NDC depth range is 0..1 while cgmath produces OpenGL-style -1..1 matrices.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const EPS: f32 = 0.000001;

/// Pixel position on the render surface, origin top left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

/// Converts a pixel coordinate into normalized device coordinates (-1..1, y up).
pub fn ndc_from_pixels(x: f32, y: f32, width: f32, height: f32) -> cgmath::Vector2<f32> {
    cgmath::Vector2::new((x / width) * 2.0 - 1.0, -(y / height) * 2.0 + 1.0)
}

#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P, target: P) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    /// Ray from the camera position through the given NDC point.
    pub fn cast_ray(&self, ndc: cgmath::Vector2<f32>, projection: &Projection) -> Ray {
        let view_proj = projection.gl_matrix() * self.calc_matrix();
        let inverse = view_proj.invert().unwrap_or_else(Matrix4::identity);
        let far = inverse * Vector4::new(ndc.x, ndc.y, 1.0, 1.0);
        let far = Point3::new(far.x / far.w, far.y / far.w, far.z / far.w);
        Ray::new(self.position, far - self.position)
    }

    /**
     * Projects a world point onto a surface of `width` x `height` pixels.
     *
     * Returns `None` for points on the camera plane where the perspective divide is undefined.
     */
    pub fn project_to_screen(
        &self,
        point: Point3<f32>,
        projection: &Projection,
        width: f32,
        height: f32,
    ) -> Option<ScreenPoint> {
        let clip = projection.gl_matrix() * self.calc_matrix() * point.to_homogeneous();
        if clip.w.abs() < EPS {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let width_half = 0.5 * width;
        let height_half = 0.5 * height;
        Some(ScreenPoint {
            x: ndc.x * width_half + width_half,
            y: -(ndc.y * height_half) + height_half,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// OpenGL-style matrix, used for ray casting and screen projection.
    pub fn gl_matrix(&self) -> Matrix4<f32> {
        cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.gl_matrix()
    }
}

impl From<(&CameraConfig, u32, u32)> for Projection {
    fn from((config, width, height): (&CameraConfig, u32, u32)) -> Self {
        Projection::new(width, height, config.fovy, config.znear, config.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU side of the camera together with the CPU camera and its controller.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Spherical {
    radius: f32,
    /// polar angle from +Y
    phi: f32,
    /// azimuth around +Y, measured from +Z
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/**
 * Orbits the camera around a fixed target.
 *
 * Pointer drags rotate and the wheel zooms; panning is not supported. Input
 * is turned into pending spherical deltas and a pending zoom scale which
 * `update` folds into the camera position. With damping enabled the deltas
 * decay geometrically over the following frames which gives the inertial feel.
 */
#[derive(Clone, Debug)]
pub struct OrbitController {
    pub target: Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    dragging: bool,
    last_pointer: Option<(f64, f64)>,
}

impl OrbitController {
    pub fn new(config: &OrbitConfig) -> Self {
        if config.enable_pan {
            log::warn!("Panning is not supported by the orbit controller and stays disabled");
        }
        Self {
            target: config.target,
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            min_polar_angle: config.min_polar_angle,
            max_polar_angle: config.max_polar_angle,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            auto_rotate: config.auto_rotate,
            auto_rotate_speed: 2.0,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            dragging: false,
            last_pointer: None,
        }
    }

    /// Queue a rotation for a pointer drag of `dx`/`dy` pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.delta_theta -= 2.0 * PI * dx * self.rotate_speed / height;
        self.delta_phi -= 2.0 * PI * dy * self.rotate_speed / height;
    }

    /// Positive `delta` zooms in (scroll away from the user), negative zooms out.
    pub fn zoom(&mut self, delta: f32) {
        let zoom_scale = 0.95f32.powf(self.zoom_speed);
        if delta > 0.0 {
            self.scale *= zoom_scale;
        } else if delta < 0.0 {
            self.scale /= zoom_scale;
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
        if !dragging {
            self.last_pointer = None;
        }
    }

    /// Feeds the cursor position; rotates while the drag button is held.
    pub fn pointer_moved(&mut self, x: f64, y: f64, viewport_height: f32) {
        if self.dragging {
            if let Some((last_x, last_y)) = self.last_pointer {
                self.rotate((x - last_x) as f32, (y - last_y) as f32, viewport_height);
            }
        }
        self.last_pointer = Some((x, y));
    }

    pub fn handle_window_events(&mut self, event: &winit::event::WindowEvent, viewport_height: f32) {
        use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.set_dragging(*state == ElementState::Pressed),
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(position.x, position.y, viewport_height)
            }
            WindowEvent::CursorLeft { .. } => self.set_dragging(false),
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32,
                };
                self.zoom(scroll);
            }
            _ => (),
        }
    }

    /**
     * Applies pending input to `camera` and decays it.
     *
     * Returns whether the camera moved.
     */
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(offset);

        if self.auto_rotate {
            // one full turn per 30s at 60fps for speed 2.0, as in the browser controls
            self.delta_theta -= 2.0 * PI / 60.0 / 60.0 * self.auto_rotate_speed;
        }

        if self.enable_damping {
            spherical.theta += self.delta_theta * self.damping_factor;
            spherical.phi += self.delta_phi * self.damping_factor;
        } else {
            spherical.theta += self.delta_theta;
            spherical.phi += self.delta_phi;
        }

        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(EPS, PI - EPS);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        let position = self.target + spherical.to_offset();
        let moved = (position - camera.position).magnitude2() > EPS;
        camera.position = position;
        camera.target = self.target;

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;
        moved
    }

    /// Distance of the camera to the orbit target.
    pub fn distance(&self, camera: &Camera) -> f32 {
        (camera.position - self.target).magnitude()
    }

    /// Polar angle of the camera measured from the +Y axis.
    pub fn polar_angle(&self, camera: &Camera) -> f32 {
        Spherical::from_offset(camera.position - self.target).phi
    }

    pub fn azimuth(&self, camera: &Camera) -> f32 {
        Spherical::from_offset(camera.position - self.target).theta
    }
}

impl Camera {
    /// Camera placed per `config`, looking at the orbit target.
    pub fn from_config(camera: &CameraConfig, controls: &OrbitConfig) -> Self {
        Camera::new(camera.position, controls.target)
    }
}
