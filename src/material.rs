//! Materials: an ordered map of named uniforms, an attribute list, WGSL
//! source, and an optional offscreen destination.
//!
//! A material is plain data until [`Material::compile`] turns it into a
//! [`ShaderProgram`]. Map insertion order is significant twice over: it fixes
//! both the uniform block layout and the texture unit numbering, so the map
//! is a vector of pairs rather than a hash map.

use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3};

use crate::fbo::{FBO_COLOR_FORMAT, FBO_DEPTH_FORMAT, Fbo};
use crate::gpu::{GpuContext, SCREEN_DEPTH_FORMAT};
use crate::shader::{PipelineTargets, ShaderError, ShaderProgram, UniformKind};
use crate::texture::Texture;

/// Uniform names every material implicitly declares, bound by the renderer
/// each draw. They occupy the head of the uniform block in this order.
pub const CAMERA_UNIFORMS: [(&str, UniformKind); 4] = [
    ("view_matrix", UniformKind::Mat4),
    ("model_matrix", UniformKind::Mat4),
    ("projection_matrix", UniformKind::Mat4),
    ("camera_pos", UniformKind::Vec3),
];

/// A uniform value of one of the closed set of supported kinds.
#[derive(Clone, Debug)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Mat4(Mat4),
    Texture(Rc<Texture>),
}

impl UniformValue {
    /// The kind tag this value carries.
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Texture(_) => UniformKind::Texture,
        }
    }
}

/// An insertion-ordered uniform map.
///
/// Re-inserting an existing key overwrites the value but keeps the key's
/// original position, so later writes never reshuffle block offsets or
/// texture units.
#[derive(Clone, Debug, Default)]
pub struct UniformMap {
    entries: Vec<(String, UniformValue)>,
}

impl UniformMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a uniform. Last writer wins on value, first
    /// writer wins on position.
    pub fn insert(&mut self, name: &str, value: UniformValue) {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(n, _)| n == name) {
            *existing = value;
        } else {
            self.entries.push((name.to_string(), value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut UniformValue> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A shading recipe: uniforms, attribute names, WGSL source, destination.
///
/// `target` declares where draws with this material land. `None` means the
/// window surface; `Some` means an offscreen framebuffer, and the compiled
/// pipeline takes its color/depth formats from it.
pub struct Material {
    pub name: String,
    pub uniforms: UniformMap,
    /// Attribute names in binding order. Usually empty until the render
    /// unit appends its mesh's attribute names before compiling.
    pub attribs: Vec<String>,
    pub source: String,
    pub target: Option<Rc<Fbo>>,
}

impl Material {
    pub fn new(name: &str, uniforms: UniformMap, source: &str, target: Option<Rc<Fbo>>) -> Self {
        Self {
            name: name.to_string(),
            uniforms,
            attribs: Vec::new(),
            source: source.to_string(),
            target,
        }
    }

    /// Append attribute names to the binding list, keeping earlier entries'
    /// slots stable.
    pub fn append_attributes<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            if !self.attribs.iter().any(|n| n == name) {
                self.attribs.push(name.to_string());
            }
        }
    }

    /// Flattened uniform declaration list: the camera prefix followed by
    /// this material's own uniforms in map order.
    pub fn flatten_uniforms(&self) -> Vec<(String, UniformKind)> {
        CAMERA_UNIFORMS
            .iter()
            .map(|(n, k)| (n.to_string(), *k))
            .chain(self.uniforms.iter().map(|(n, v)| (n.to_string(), v.kind())))
            .collect()
    }

    /// Compile this material into a shader program targeting its declared
    /// destination.
    pub fn compile(&self, gpu: &GpuContext) -> Result<ShaderProgram, ShaderError> {
        let targets = match &self.target {
            Some(fbo) => PipelineTargets {
                color_formats: vec![FBO_COLOR_FORMAT; fbo.color.len()],
                depth_format: FBO_DEPTH_FORMAT,
            },
            None => PipelineTargets {
                color_formats: vec![gpu.config.format],
                depth_format: SCREEN_DEPTH_FORMAT,
            },
        };
        ShaderProgram::compile(
            gpu,
            &self.source,
            &self.flatten_uniforms(),
            &self.attribs,
            &targets,
            &self.name,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_first_position_and_last_value() {
        let mut map = UniformMap::new();
        map.insert("time", UniformValue::Float(0.0));
        map.insert("transparency", UniformValue::Float(0.8));
        map.insert("time", UniformValue::Float(2.5));

        let names: Vec<&str> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["time", "transparency"]);
        match map.get("time") {
            Some(UniformValue::Float(v)) => assert_eq!(*v, 2.5),
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn flatten_puts_camera_prefix_first() {
        let mut uniforms = UniformMap::new();
        uniforms.insert("light_vp", UniformValue::Mat4(Mat4::IDENTITY));
        let material = Material::new("Test", uniforms, "", None);

        let flat = material.flatten_uniforms();
        let names: Vec<&str> = flat.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "view_matrix",
                "model_matrix",
                "projection_matrix",
                "camera_pos",
                "light_vp"
            ]
        );
    }

    #[test]
    fn append_attributes_deduplicates() {
        let material_uniforms = UniformMap::new();
        let mut material = Material::new("Test", material_uniforms, "", None);
        material.append_attributes(["a_position", "a_normal"]);
        material.append_attributes(["a_position", "a_uv"]);
        assert_eq!(material.attribs, vec!["a_position", "a_normal", "a_uv"]);
    }
}
