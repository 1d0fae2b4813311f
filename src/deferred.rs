//! Builders for the deferred pipeline's fixed materials: the emissive light
//! cube, the shadow pass, the G-buffer geometry pass, and the
//! screen-space-reflection composite pass.
//!
//! Shader source is embedded at build time; each builder wires the uniforms
//! its pass needs and declares the pass's destination. Uniform insertion
//! order here is load-bearing: it fixes block offsets and texture units.

use std::rc::Rc;

use crate::camera::Camera;
use crate::light::DirectionalLight;
use crate::material::{Material, UniformMap, UniformValue};
use crate::texture::Texture;

const LIGHT_CUBE_SOURCE: &str = include_str!("shaders/light_cube.wgsl");
const SHADOW_SOURCE: &str = include_str!("shaders/shadow.wgsl");
const GBUFFER_SOURCE: &str = include_str!("shaders/gbuffer.wgsl");
const SSR_SOURCE: &str = include_str!("shaders/ssr.wgsl");

/// Material for the light's visualization cube: flat emissive color straight
/// to the screen.
pub fn emissive_material(radiance: glam::Vec3) -> Material {
    let mut uniforms = UniformMap::new();
    uniforms.insert("light_radiance", UniformValue::Vec3(radiance));
    Material::new("Light Cube", uniforms, LIGHT_CUBE_SOURCE, None)
}

/// Material for the shadow pass: depth from the light's viewpoint into the
/// light's framebuffer.
pub fn shadow_material(light: &DirectionalLight) -> Material {
    let mut uniforms = UniformMap::new();
    uniforms.insert("light_vp", UniformValue::Mat4(light.light_vp()));
    Material::new(
        "Shadow",
        uniforms,
        SHADOW_SOURCE,
        Some(Rc::clone(&light.fbo)),
    )
}

/// Material for the geometry pass: surface attributes into the camera's
/// G-buffer, sampling the light's shadow map for visibility.
pub fn gbuffer_material(
    diffuse_map: Rc<Texture>,
    normal_map: Rc<Texture>,
    light: &DirectionalLight,
    camera: &Camera,
) -> Material {
    let mut uniforms = UniformMap::new();
    uniforms.insert("kd_map", UniformValue::Texture(diffuse_map));
    uniforms.insert("normal_map", UniformValue::Texture(normal_map));
    uniforms.insert("light_vp", UniformValue::Mat4(light.light_vp()));
    uniforms.insert(
        "shadow_map",
        UniformValue::Texture(Rc::clone(&light.fbo.color[0])),
    );
    Material::new(
        "G-Buffer",
        uniforms,
        GBUFFER_SOURCE,
        Some(Rc::clone(&camera.fbo)),
    )
}

/// Material for the composite pass: screen-space reflections shaded from the
/// five G-buffer attachments, to the screen.
pub fn ssr_material(light: &DirectionalLight, camera: &Camera) -> Material {
    let mut uniforms = UniformMap::new();
    uniforms.insert("light_radiance", UniformValue::Vec3(light.radiance));
    uniforms.insert("light_dir", UniformValue::Vec3(light.shading_direction()));
    uniforms.insert(
        "g_diffuse",
        UniformValue::Texture(Rc::clone(&camera.fbo.color[0])),
    );
    uniforms.insert(
        "g_depth",
        UniformValue::Texture(Rc::clone(&camera.fbo.color[1])),
    );
    uniforms.insert(
        "g_normal_world",
        UniformValue::Texture(Rc::clone(&camera.fbo.color[2])),
    );
    uniforms.insert(
        "g_shadow",
        UniformValue::Texture(Rc::clone(&camera.fbo.color[3])),
    );
    uniforms.insert(
        "g_pos_world",
        UniformValue::Texture(Rc::clone(&camera.fbo.color[4])),
    );
    Material::new("SSR Composite", uniforms, SSR_SOURCE, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::UniformKind;

    #[test]
    fn emissive_material_targets_the_screen() {
        let material = emissive_material(glam::vec3(20.0, 20.0, 20.0));
        assert!(material.target.is_none());
        assert_eq!(
            material.uniforms.get("light_radiance").map(|v| v.kind()),
            Some(UniformKind::Vec3)
        );
    }
}
