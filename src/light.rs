//! The directional light: shadow framebuffer, visualization cube, and the
//! matrices the shadow and composite passes derive from it.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec3};

use crate::fbo::{Fbo, FboError};
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, TrsTransform};

/// A single directional light with a shadow-map framebuffer.
///
/// The light also carries a small cube mesh marking its position on screen.
/// The renderer keeps the cube's translation synced to `position`, so moving
/// the light moves its marker.
pub struct DirectionalLight {
    /// Emitted radiance, unbounded HDR values.
    pub radiance: Vec3,
    pub position: Vec3,
    /// Direction the light shines toward (not normalized).
    pub direction: Vec3,
    /// Up vector for the shadow view matrix.
    pub up: Vec3,
    /// Shadow-map framebuffer the shadow pass renders into.
    pub fbo: Rc<Fbo>,
    /// Visualization cube, shared with the render unit that draws it.
    pub mesh: Rc<RefCell<Mesh>>,
}

impl DirectionalLight {
    /// Create a directional light and allocate its shadow framebuffer at the
    /// current surface size.
    pub fn new(
        gpu: &GpuContext,
        radiance: Vec3,
        position: Vec3,
        direction: Vec3,
        up: Vec3,
    ) -> Result<Self, FboError> {
        let fbo = Fbo::create(gpu, gpu.width(), gpu.height(), 5, "Shadow Map")?;
        let mesh = Mesh::cube(TrsTransform::new(
            position,
            Vec3::splat(0.1),
            Vec3::ZERO,
        ));

        Ok(Self {
            radiance,
            position,
            direction,
            up,
            fbo: Rc::new(fbo),
            mesh: Rc::new(RefCell::new(mesh)),
        })
    }

    /// Direction from a shaded point toward the light.
    pub fn shading_direction(&self) -> Vec3 {
        -self.direction
    }

    /// View-projection matrix for rendering the scene from the light.
    ///
    /// Directional light rays are parallel, so the projection is a fixed
    /// 20×20 orthographic box with a deep far plane.
    pub fn light_vp(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.position, self.position + self.direction, self.up);
        let projection = Mat4::orthographic_rh(-10.0, 10.0, -10.0, 10.0, 1e-2, 1000.0);
        projection * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec4, vec3};

    #[test]
    fn light_vp_centers_points_on_the_light_axis() {
        let position = vec3(0.0, 10.0, 0.0);
        let direction = vec3(0.0, -1.0, 0.0);
        let view = Mat4::look_at_rh(position, position + direction, Vec3::X);
        let projection = Mat4::orthographic_rh(-10.0, 10.0, -10.0, 10.0, 1e-2, 1000.0);
        let vp = projection * view;

        // A point 5 units below the light lands at the center of the clip
        // volume, partway into its depth range.
        let p = vp * Vec4::new(0.0, 5.0, 0.0, 1.0);
        assert!(p.x.abs() < 1e-5);
        assert!(p.y.abs() < 1e-5);
        assert!(p.z > 0.0 && p.z < 1.0);

        // A point outside the 20-unit box falls outside clip space. With X
        // as the up vector, world X lands on the view's y axis.
        let outside = vp * Vec4::new(15.0, 5.0, 0.0, 1.0);
        assert!(outside.y.abs() > 1.0);
    }
}
