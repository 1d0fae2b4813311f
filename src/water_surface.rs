//! Procedural water surface grid.
//!
//! Generates a flat, regular grid in the XZ plane centered on the origin.
//! Displacement happens entirely in the vertex shader, so the CPU mesh stays
//! flat with all normals pointing up.

use crate::mesh::{ATTR_NORMAL, ATTR_POSITION, ATTR_UV, AttributeData, Mesh, TrsTransform};

/// Highest grid resolution representable with 16-bit indices:
/// (255 + 1)² = 65 536 vertices exactly fills the index range.
pub const MAX_RESOLUTION: u32 = 255;

/// Generate a water surface mesh.
///
/// `size` is the side length in world units; `resolution` is the number of
/// quads per side, so the grid has `(resolution + 1)²` vertices and
/// `2 · resolution²` consistently wound triangles. Resolutions above
/// [`MAX_RESOLUTION`] are clamped (and logged) to stay within the u16 index
/// range.
///
/// # Example
///
/// ```
/// use waterline::water_surface::generate;
///
/// let mesh = generate(50.0, 4, Default::default());
/// assert_eq!(mesh.positions.as_ref().unwrap().data.len(), 25 * 3);
/// assert_eq!(mesh.index_count(), 2 * 16 * 3);
/// ```
pub fn generate(size: f32, resolution: u32, transform: TrsTransform) -> Mesh {
    let resolution = if resolution > MAX_RESOLUTION {
        log::warn!(
            "water surface resolution {} exceeds {}; clamping",
            resolution,
            MAX_RESOLUTION
        );
        MAX_RESOLUTION
    } else {
        resolution
    };

    let side = resolution + 1;
    let vertex_count = (side * side) as usize;
    let mut positions = Vec::with_capacity(vertex_count * 3);
    let mut normals = Vec::with_capacity(vertex_count * 3);
    let mut texcoords = Vec::with_capacity(vertex_count * 2);

    for i in 0..=resolution {
        for j in 0..=resolution {
            let u = i as f32 / resolution as f32;
            let v = j as f32 / resolution as f32;
            let x = (u - 0.5) * size;
            let z = (v - 0.5) * size;

            positions.extend_from_slice(&[x, 0.0, z]);
            normals.extend_from_slice(&[0.0, 1.0, 0.0]);
            texcoords.extend_from_slice(&[u, v]);
        }
    }

    let mut indices = Vec::with_capacity((resolution * resolution * 6) as usize);
    for i in 0..resolution {
        for j in 0..resolution {
            let top_left = (i * side + j) as u16;
            let top_right = top_left + 1;
            let bottom_left = ((i + 1) * side + j) as u16;
            let bottom_right = bottom_left + 1;

            // Split each quad the same way so every triangle winds
            // consistently.
            indices.extend_from_slice(&[top_left, bottom_left, top_right]);
            indices.extend_from_slice(&[top_right, bottom_left, bottom_right]);
        }
    }

    Mesh::new(
        Some(AttributeData::new(ATTR_POSITION, positions, 3)),
        Some(AttributeData::new(ATTR_NORMAL, normals, 3)),
        Some(AttributeData::new(ATTR_UV, texcoords, 2)),
        indices,
        transform,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, vec3};

    /// Twice the signed area of a triangle projected onto the XZ plane.
    fn signed_area_xz(a: Vec3, b: Vec3, c: Vec3) -> f32 {
        (b.x - a.x) * (c.z - a.z) - (b.z - a.z) * (c.x - a.x)
    }

    fn vertex(mesh: &Mesh, index: u16) -> Vec3 {
        let data = &mesh.positions.as_ref().unwrap().data;
        let base = index as usize * 3;
        vec3(data[base], data[base + 1], data[base + 2])
    }

    #[test]
    fn grid_counts_match_resolution() {
        let mesh = generate(50.0, 250, TrsTransform::default());
        let positions = mesh.positions.as_ref().unwrap();
        assert_eq!(positions.data.len(), 251 * 251 * 3);
        assert_eq!(mesh.index_count(), 2 * 250 * 250 * 3);
        assert_eq!(mesh.texcoords.as_ref().unwrap().data.len(), 251 * 251 * 2);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < 251 * 251));
    }

    #[test]
    fn excessive_resolution_is_clamped() {
        let mesh = generate(10.0, 400, TrsTransform::default());
        let positions = mesh.positions.as_ref().unwrap();
        assert_eq!(positions.data.len(), 256 * 256 * 3);
    }

    #[test]
    fn grid_spans_centered_extent() {
        let mesh = generate(50.0, 4, TrsTransform::default());
        let first = vertex(&mesh, 0);
        let last = vertex(&mesh, 24);
        assert_eq!((first.x, first.z), (-25.0, -25.0));
        assert_eq!((last.x, last.z), (25.0, 25.0));
        let positions = &mesh.positions.as_ref().unwrap().data;
        assert!(positions.chunks(3).all(|p| p[1] == 0.0));
    }

    #[test]
    fn triangles_wind_consistently_and_are_not_degenerate() {
        let mesh = generate(10.0, 8, TrsTransform::default());
        for tri in mesh.indices.chunks(3) {
            let area = signed_area_xz(
                vertex(&mesh, tri[0]),
                vertex(&mesh, tri[1]),
                vertex(&mesh, tri[2]),
            );
            assert!(area > 0.0, "flipped or degenerate triangle {:?}", tri);
        }
    }
}
