//! CPU-side mesh data: named vertex attributes, indices, and a TRS transform.

use glam::{Mat4, Vec3};

/// Canonical attribute names shared between meshes and shaders.
pub const ATTR_POSITION: &str = "a_position";
pub const ATTR_NORMAL: &str = "a_normal";
pub const ATTR_UV: &str = "a_uv";

/// Component count for a canonical attribute name.
///
/// UVs are two floats per vertex; everything else is three.
pub fn attribute_components(name: &str) -> u32 {
    if name == ATTR_UV { 2 } else { 3 }
}

/// One named per-vertex attribute array.
#[derive(Clone, Debug)]
pub struct AttributeData {
    /// The uniform-style name the shader binds this array under.
    pub name: String,
    /// Tightly packed float data, `components` floats per vertex.
    pub data: Vec<f32>,
    pub components: u32,
}

impl AttributeData {
    pub fn new(name: &str, data: Vec<f32>, components: u32) -> Self {
        Self {
            name: name.to_string(),
            data,
            components,
        }
    }
}

/// Translate/scale/rotate transform with per-axis Euler rotation.
#[derive(Clone, Copy, Debug)]
pub struct TrsTransform {
    pub translate: Vec3,
    pub scale: Vec3,
    /// Euler angles in radians, applied X then Y then Z.
    pub rotate: Vec3,
}

impl Default for TrsTransform {
    fn default() -> Self {
        Self {
            translate: Vec3::ZERO,
            scale: Vec3::ONE,
            rotate: Vec3::ZERO,
        }
    }
}

impl TrsTransform {
    pub fn new(translate: Vec3, scale: Vec3, rotate: Vec3) -> Self {
        Self {
            translate,
            scale,
            rotate,
        }
    }

    /// Model matrix composed as translate · scale · rotX · rotY · rotZ.
    ///
    /// The scale-before-rotation order is unusual but load-bearing: scene
    /// constants were authored against it.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translate)
            * Mat4::from_scale(self.scale)
            * Mat4::from_rotation_x(self.rotate.x)
            * Mat4::from_rotation_y(self.rotate.y)
            * Mat4::from_rotation_z(self.rotate.z)
    }
}

/// An indexed triangle mesh with optional position/normal/uv attributes.
///
/// Indices are `u16`: every mesh this pipeline draws stays under 65 536
/// vertices, and the water surface generator clamps its resolution to keep
/// it that way.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub positions: Option<AttributeData>,
    pub normals: Option<AttributeData>,
    pub texcoords: Option<AttributeData>,
    pub indices: Vec<u16>,
    pub transform: TrsTransform,
}

impl Mesh {
    pub fn new(
        positions: Option<AttributeData>,
        normals: Option<AttributeData>,
        texcoords: Option<AttributeData>,
        indices: Vec<u16>,
        transform: TrsTransform,
    ) -> Self {
        Self {
            positions,
            normals,
            texcoords,
            indices,
            transform,
        }
    }

    /// Number of indices to draw.
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Attributes present on this mesh, in position/normal/uv order.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeData> {
        self.positions
            .iter()
            .chain(self.normals.iter())
            .chain(self.texcoords.iter())
    }

    /// A unit cube spanning [-1, 1] on each axis, positions only.
    ///
    /// Used as the light's visualization body; the emissive shader needs no
    /// normals or UVs.
    pub fn cube(transform: TrsTransform) -> Self {
        #[rustfmt::skip]
        let positions: Vec<f32> = vec![
            // front
            -1.0, -1.0,  1.0,   1.0, -1.0,  1.0,   1.0,  1.0,  1.0,  -1.0,  1.0,  1.0,
            // back
            -1.0, -1.0, -1.0,  -1.0,  1.0, -1.0,   1.0,  1.0, -1.0,   1.0, -1.0, -1.0,
            // top
            -1.0,  1.0, -1.0,  -1.0,  1.0,  1.0,   1.0,  1.0,  1.0,   1.0,  1.0, -1.0,
            // bottom
            -1.0, -1.0, -1.0,   1.0, -1.0, -1.0,   1.0, -1.0,  1.0,  -1.0, -1.0,  1.0,
            // right
             1.0, -1.0, -1.0,   1.0,  1.0, -1.0,   1.0,  1.0,  1.0,   1.0, -1.0,  1.0,
            // left
            -1.0, -1.0, -1.0,  -1.0, -1.0,  1.0,  -1.0,  1.0,  1.0,  -1.0,  1.0, -1.0,
        ];
        #[rustfmt::skip]
        let indices: Vec<u16> = vec![
             0,  1,  2,   0,  2,  3, // front
             4,  5,  6,   4,  6,  7, // back
             8,  9, 10,   8, 10, 11, // top
            12, 13, 14,  12, 14, 15, // bottom
            16, 17, 18,  16, 18, 19, // right
            20, 21, 22,  20, 22, 23, // left
        ];

        Self::new(
            Some(AttributeData::new(ATTR_POSITION, positions, 3)),
            None,
            None,
            indices,
            transform,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec4, vec3};

    #[test]
    fn cube_has_24_vertices_and_36_indices() {
        let cube = Mesh::cube(TrsTransform::default());
        let positions = cube.positions.as_ref().unwrap();
        assert_eq!(positions.data.len(), 24 * 3);
        assert_eq!(positions.components, 3);
        assert_eq!(cube.index_count(), 36);
        assert!(cube.normals.is_none());
        assert!(cube.texcoords.is_none());
        assert!(cube.indices.iter().all(|&i| i < 24));
    }

    #[test]
    fn model_matrix_composition_order() {
        let t = TrsTransform::new(
            Vec3::ZERO,
            vec3(2.0, 1.0, 1.0),
            vec3(0.0, 0.0, std::f32::consts::FRAC_PI_2),
        );
        let p = t.matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        // translate·scale·rotZ: rotate first maps x̂ to ŷ, then scale leaves
        // ŷ alone.
        assert!((p.x - 0.0).abs() < 1e-5);
        assert!((p.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn transform_translates_last() {
        let t = TrsTransform::new(vec3(1.0, 2.0, 3.0), Vec3::ONE, Vec3::ZERO);
        let p = t.matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!((p.x, p.y, p.z), (1.0, 2.0, 3.0));
    }

    #[test]
    fn uv_attribute_has_two_components() {
        assert_eq!(attribute_components(ATTR_UV), 2);
        assert_eq!(attribute_components(ATTR_POSITION), 3);
        assert_eq!(attribute_components(ATTR_NORMAL), 3);
    }
}
