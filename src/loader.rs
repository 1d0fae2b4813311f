//! Scene assembly: registering imported meshes and water surfaces with the
//! renderer.
//!
//! Asset decoding itself stays outside this crate; callers hand over
//! already-decoded vertex arrays and textures. This module turns them into
//! render units and registers each imported mesh three times — once per pass
//! that needs to see it.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;

use crate::camera::Camera;
use crate::deferred::{gbuffer_material, shadow_material, ssr_material};
use crate::gpu::GpuContext;
use crate::mesh::{ATTR_NORMAL, ATTR_POSITION, ATTR_UV, AttributeData, Mesh, TrsTransform};
use crate::mesh_render::MeshRenderUnit;
use crate::renderer::Renderer;
use crate::shader::ShaderError;
use crate::texture::Texture;
use crate::water_material::WaterConfig;
use crate::water_surface;

/// Read WGSL shader source from disk, for materials authored outside the
/// embedded set. A missing or unreadable file is fatal to the material
/// being built.
pub fn shader_source(path: impl AsRef<Path>) -> io::Result<String> {
    fs::read_to_string(path)
}

/// Decoded geometry handed over by an external asset loader.
pub struct ImportedMesh {
    pub positions: Vec<f32>,
    pub normals: Option<Vec<f32>>,
    pub texcoords: Option<Vec<f32>>,
    pub indices: Vec<u16>,
    pub transform: TrsTransform,
}

impl ImportedMesh {
    fn into_mesh(self) -> Mesh {
        Mesh::new(
            Some(AttributeData::new(ATTR_POSITION, self.positions, 3)),
            self.normals
                .map(|data| AttributeData::new(ATTR_NORMAL, data, 3)),
            self.texcoords
                .map(|data| AttributeData::new(ATTR_UV, data, 2)),
            self.indices,
            self.transform,
        )
    }
}

/// Decoded material properties for an imported mesh. Missing maps fall back
/// to 1x1 constant textures.
pub struct ImportedMaterial {
    pub diffuse_map: Option<Rc<Texture>>,
    pub normal_map: Option<Rc<Texture>>,
    /// Base color used when `diffuse_map` is absent.
    pub base_color: [u8; 4],
}

impl Default for ImportedMaterial {
    fn default() -> Self {
        Self {
            diffuse_map: None,
            normal_map: None,
            base_color: [255, 255, 255, 255],
        }
    }
}

/// Register an imported mesh with the renderer.
///
/// Builds three units over the same shared mesh: an SSR unit for the
/// composite pass, a shadow unit for the shadow pass, and a G-buffer unit
/// for the geometry pass. The mesh participates in every stage of the frame.
///
/// # Panics
///
/// Panics if no light is registered yet; the deferred materials are built
/// against the light's shadow map.
pub fn register_imported_mesh(
    gpu: &GpuContext,
    renderer: &mut Renderer,
    camera: &Camera,
    imported: ImportedMesh,
    material: ImportedMaterial,
) -> Result<(), ShaderError> {
    let mesh = Rc::new(RefCell::new(imported.into_mesh()));

    let diffuse_map = material.diffuse_map.unwrap_or_else(|| {
        Rc::new(Texture::solid_color(
            gpu,
            material.base_color,
            "Imported Base Color",
        ))
    });
    // Flat tangent-space normal when the asset carries no normal map.
    let normal_map = material.normal_map.unwrap_or_else(|| {
        Rc::new(Texture::solid_color(
            gpu,
            [128, 128, 255, 255],
            "Imported Flat Normal",
        ))
    });

    let (ssr, shadow, gbuffer) = {
        let light = renderer.light().expect("No light");
        (
            ssr_material(light, camera),
            shadow_material(light),
            gbuffer_material(diffuse_map, normal_map, light, camera),
        )
    };

    let ssr_unit = MeshRenderUnit::new(gpu, Rc::clone(&mesh), ssr)?;
    let shadow_unit = MeshRenderUnit::new(gpu, Rc::clone(&mesh), shadow)?;
    let buffer_unit = MeshRenderUnit::new(gpu, Rc::clone(&mesh), gbuffer)?;

    renderer.add_composite_unit(ssr_unit);
    renderer.add_shadow_unit(shadow_unit);
    renderer.add_buffer_unit(buffer_unit);
    Ok(())
}

/// Generate a water surface from `config` and register it for the composite
/// pass.
pub fn load_water(
    gpu: &GpuContext,
    renderer: &mut Renderer,
    config: &WaterConfig,
) -> Result<(), ShaderError> {
    let mesh = water_surface::generate(config.size, config.resolution, config.transform);
    let unit = MeshRenderUnit::new(gpu, Rc::new(RefCell::new(mesh)), config.material())?;
    renderer.add_composite_unit(unit);
    log::info!(
        "water surface registered: size {}, resolution {}",
        config.size,
        config.resolution
    );
    Ok(())
}
