//! Perspective camera that owns the G-buffer it renders into.

use std::rc::Rc;

use glam::{Mat4, Vec3};

use crate::fbo::{Fbo, FboError};
use crate::gpu::GpuContext;

/// Number of G-buffer color attachments: diffuse, depth, world-space normal,
/// shadow visibility, world-space position.
pub const GBUFFER_TARGETS: u32 = 5;

/// A perspective camera with an attached five-target G-buffer.
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// The G-buffer the geometry pass fills and the composite pass reads.
    pub fbo: Rc<Fbo>,
}

impl Camera {
    /// Create a camera looking from `position` at `target`, with a G-buffer
    /// sized to the current surface.
    pub fn new(gpu: &GpuContext, position: Vec3, target: Vec3) -> Result<Self, FboError> {
        let fbo = Fbo::create(
            gpu,
            gpu.width(),
            gpu.height(),
            GBUFFER_TARGETS,
            "G-Buffer",
        )?;
        Ok(Self {
            position,
            target,
            up: Vec3::Y,
            fov_y: 75f32.to_radians(),
            near: 1e-3,
            far: 1000.0,
            fbo: Rc::new(fbo),
        })
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec4, vec3};

    fn test_camera(position: Vec3, target: Vec3) -> (Mat4, Mat4) {
        // Matrix math only; no GPU involved.
        let view = Mat4::look_at_rh(position, target, Vec3::Y);
        let projection = Mat4::perspective_rh(75f32.to_radians(), 16.0 / 9.0, 1e-3, 1000.0);
        (view, projection)
    }

    #[test]
    fn view_matrix_centers_the_target() {
        let (view, _) = test_camera(vec3(0.0, 2.0, 5.0), vec3(0.0, 2.0, 0.0));
        let target = view * Vec4::new(0.0, 2.0, 0.0, 1.0);
        // The look-at target sits straight ahead on the -Z view axis.
        assert!(target.x.abs() < 1e-5);
        assert!(target.y.abs() < 1e-5);
        assert!((target.z + 5.0).abs() < 1e-5);
    }

    #[test]
    fn projection_maps_near_plane_to_zero_depth() {
        let (_, projection) = test_camera(Vec3::ZERO, vec3(0.0, 0.0, -1.0));
        let near = projection * Vec4::new(0.0, 0.0, -1e-3, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);
    }
}
