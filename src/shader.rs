//! Shader program compilation and named binding-slot resolution.
//!
//! A [`ShaderProgram`] is the compiled form of a material: a wgpu render
//! pipeline plus a [`ShaderLayout`] that maps the material's *names* onto
//! concrete GPU binding slots. The layout is the contract the mesh-render
//! unit writes through every frame:
//!
//! - Every non-texture uniform lives in one uniform block at
//!   `@group(0) @binding(0)`, opening with a fixed camera prefix
//!   (`view_matrix` at 0, `model_matrix` at 64, `projection_matrix` at 128,
//!   `camera_pos` at 192); material uniforms follow in map-insertion order.
//! - Texture uniforms get sequential texture units starting at 0, in
//!   map-insertion order. Unit `i` occupies `@group(1)` bindings `2·i`
//!   (view) and `2·i + 1` (sampler).
//! - Each resolved vertex attribute gets its own vertex buffer slot, in
//!   attribute-list order.
//!
//! A name the shader source never declares resolves to *no* slot. Writes
//! through an unresolved name are silent no-ops (logged at debug level), the
//! same way WebGL treats a -1 attribute location or a null uniform location.
//!
//! # Block packing
//!
//! Offsets follow WGSL uniform layout rules (f32/i32 align 4, vec3 and mat4
//! align 16) with one deviation: vec2 aligns to 16. That pins each Gerstner
//! wave entry (`waves[i].direction` first) to a 32-byte stride, matching an
//! `@align(16)` member in the WGSL struct.

use std::collections::HashMap;

use crate::gpu::GpuContext;
use crate::mesh::attribute_components;

/// The closed set of uniform kinds a material may declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    Vec2,
    Vec3,
    Mat4,
    Texture,
}

impl UniformKind {
    /// Byte size of this kind inside the uniform block.
    fn size(self) -> u64 {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Mat4 => 64,
            UniformKind::Texture => 0,
        }
    }

    /// Alignment of this kind inside the uniform block.
    fn align(self) -> u64 {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            // vec2 is promoted to 16 so struct-array entries led by a vec2
            // land on the 32-byte stride the WGSL side declares.
            UniformKind::Vec2 | UniformKind::Vec3 | UniformKind::Mat4 => 16,
            UniformKind::Texture => 0,
        }
    }
}

/// Errors raised while building a shader program.
#[derive(Debug)]
pub enum ShaderError {
    /// WGSL parse or validation failure; carries the compiler diagnostic.
    Compile(String),
    /// Shader source retrieval failed.
    Source(std::io::Error),
}

impl std::fmt::Display for ShaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderError::Compile(msg) => write!(f, "shader compile error: {}", msg),
            ShaderError::Source(e) => write!(f, "shader source error: {}", e),
        }
    }
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShaderError::Source(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ShaderError {
    fn from(e: std::io::Error) -> Self {
        ShaderError::Source(e)
    }
}

/// One uniform's place in the block.
#[derive(Clone, Copy, Debug)]
pub struct BlockSlot {
    /// Byte offset inside the uniform buffer.
    pub offset: u64,
    /// The kind the slot was declared with; writes of another kind are
    /// skipped.
    pub kind: UniformKind,
    /// Whether the shader source actually declares this name. Unresolved
    /// slots still occupy their offset (the block layout is fixed by the
    /// declaration list) but writes through them are no-ops.
    pub resolved: bool,
}

/// Resolved name-to-slot mappings for one compiled program.
#[derive(Debug, Default)]
pub struct ShaderLayout {
    block: HashMap<String, BlockSlot>,
    /// Total uniform block size, 16-byte aligned.
    pub block_size: u64,
    /// Texture uniform names in unit order (unit `i` = `textures[i]`).
    pub textures: Vec<String>,
    attributes: HashMap<String, u32>,
    /// Resolved attribute names in vertex-buffer-slot order.
    pub attribute_order: Vec<String>,
}

impl ShaderLayout {
    /// Resolve named uniforms and attributes against the shader source.
    ///
    /// `uniforms` is the material's flattened declaration list (camera prefix
    /// first) in insertion order; `attribs` the flattened attribute name
    /// list. Names the source does not declare are recorded as unresolved
    /// (uniforms) or dropped (attributes); neither is an error.
    pub fn resolve(source: &str, uniforms: &[(String, UniformKind)], attribs: &[String]) -> Self {
        let mut layout = ShaderLayout::default();
        let mut cursor: u64 = 0;

        for (name, kind) in uniforms {
            if *kind == UniformKind::Texture {
                if !declares(source, name) {
                    log::debug!("uniform `{}` not declared by shader; texture unit {} unused",
                        name, layout.textures.len());
                }
                // Unit numbers advance for every texture entry, resolved or
                // not, mirroring the sequential active-texture counter.
                layout.textures.push(name.clone());
                continue;
            }

            let offset = align_up(cursor, kind.align());
            cursor = offset + kind.size();
            let resolved = declares(source, name);
            if !resolved {
                log::debug!("uniform `{}` not declared by shader; writes will be skipped", name);
            }
            layout.block.insert(
                name.clone(),
                BlockSlot {
                    offset,
                    kind: *kind,
                    resolved,
                },
            );
        }
        layout.block_size = align_up(cursor.max(16), 16);

        for name in attribs {
            if declares(source, name) {
                let slot = layout.attribute_order.len() as u32;
                layout.attributes.insert(name.clone(), slot);
                layout.attribute_order.push(name.clone());
            } else {
                log::debug!("attribute `{}` not declared by shader; binding skipped", name);
            }
        }

        layout
    }

    /// Block slot for a uniform name, if the name was declared at all.
    pub fn block_slot(&self, name: &str) -> Option<BlockSlot> {
        self.block.get(name).copied()
    }

    /// Vertex buffer slot for an attribute name, if resolved.
    pub fn attribute_slot(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }
}

/// Color/depth target description a pipeline is compiled against.
///
/// GL programs were target-agnostic; wgpu pipelines are not, so the material
/// supplies the formats of its declared destination here.
pub struct PipelineTargets {
    pub color_formats: Vec<wgpu::TextureFormat>,
    pub depth_format: wgpu::TextureFormat,
}

/// A compiled shader program: pipeline, uniform buffer, and resolved layout.
///
/// Immutable after construction. Owned by the mesh-render unit that compiled
/// its material, and dropped with it.
pub struct ShaderProgram {
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub layout: ShaderLayout,
    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) uniform_bind_group: wgpu::BindGroup,
    pub(crate) texture_layout: Option<wgpu::BindGroupLayout>,
}

impl ShaderProgram {
    /// Compile WGSL source into a pipeline and resolve its binding slots.
    ///
    /// The source must define `vs` and `fs` entry points. A parse or
    /// validation failure is fatal to the material being built: the
    /// diagnostic text is captured and propagated, and nothing half-built is
    /// kept.
    pub fn compile(
        gpu: &GpuContext,
        source: &str,
        uniforms: &[(String, UniformKind)],
        attribs: &[String],
        targets: &PipelineTargets,
        label: &str,
    ) -> Result<Self, ShaderError> {
        let device = &gpu.device;
        let layout = ShaderLayout::resolve(source, uniforms, attribs);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Compile(error.to_string()));
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} Uniform Block", label)),
            size: layout.block_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Uniform Layout", label)),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Uniform Bind Group", label)),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // Texture units become view+sampler binding pairs in group 1.
        let texture_layout = if layout.textures.is_empty() {
            None
        } else {
            let mut entries = Vec::with_capacity(layout.textures.len() * 2);
            for unit in 0..layout.textures.len() as u32 {
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding: unit * 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                });
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding: unit * 2 + 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                });
            }
            Some(
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{} Texture Layout", label)),
                    entries: &entries,
                }),
            )
        };

        let mut bind_group_layouts = vec![&uniform_layout];
        if let Some(tex) = &texture_layout {
            bind_group_layouts.push(tex);
        }

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", label)),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        // One vertex buffer per resolved attribute, slot order fixed by the
        // attribute list.
        let vertex_attrs: Vec<[wgpu::VertexAttribute; 1]> = layout
            .attribute_order
            .iter()
            .enumerate()
            .map(|(slot, name)| {
                [wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: slot as u32,
                    format: match attribute_components(name) {
                        2 => wgpu::VertexFormat::Float32x2,
                        _ => wgpu::VertexFormat::Float32x3,
                    },
                }]
            })
            .collect();
        let vertex_layouts: Vec<wgpu::VertexBufferLayout> = layout
            .attribute_order
            .iter()
            .zip(&vertex_attrs)
            .map(|(name, attrs)| wgpu::VertexBufferLayout {
                array_stride: attribute_components(name) as u64 * 4,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let color_targets: Vec<Option<wgpu::ColorTargetState>> = targets
            .color_formats
            .iter()
            .map(|format| {
                Some(wgpu::ColorTargetState {
                    format: *format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} Pipeline", label)),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs"),
                buffers: &vertex_layouts,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs"),
                targets: &color_targets,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Depth test only; no face culling. Water is visible from
                // both sides and the light cube's interior never shows.
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: targets.depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Compile(error.to_string()));
        }

        Ok(Self {
            pipeline,
            layout,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
        })
    }
}

fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

/// Whether `source` declares `name` as an identifier.
///
/// Dotted/indexed uniform names (`waves[3].phase`) are matched by their root
/// identifier, the way a struct-array member resolves through its array name.
/// Matching is word-bounded so `time` does not match `lifetime`.
fn declares(source: &str, name: &str) -> bool {
    let root: &str = name
        .split(|c: char| c == '[' || c == '.')
        .next()
        .unwrap_or(name);
    if root.is_empty() {
        return false;
    }

    let bytes = source.as_bytes();
    let mut from = 0;
    while let Some(pos) = source[from..].find(root) {
        let start = from + pos;
        let end = start + root.len();
        let before_ok = start == 0 || !is_ident_byte(bytes[start - 1]);
        let after_ok = end == bytes.len() || !is_ident_byte(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
        from = end;
    }
    false
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniforms(list: &[(&str, UniformKind)]) -> Vec<(String, UniformKind)> {
        list.iter().map(|(n, k)| (n.to_string(), *k)).collect()
    }

    const CAMERA_SOURCE: &str = "struct Uniforms { view_matrix: mat4x4f, model_matrix: mat4x4f, \
         projection_matrix: mat4x4f, camera_pos: vec3f, light_vp: mat4x4f }";

    #[test]
    fn camera_prefix_offsets() {
        let decls = uniforms(&[
            ("view_matrix", UniformKind::Mat4),
            ("model_matrix", UniformKind::Mat4),
            ("projection_matrix", UniformKind::Mat4),
            ("camera_pos", UniformKind::Vec3),
            ("light_vp", UniformKind::Mat4),
        ]);
        let layout = ShaderLayout::resolve(CAMERA_SOURCE, &decls, &[]);

        assert_eq!(layout.block_slot("view_matrix").unwrap().offset, 0);
        assert_eq!(layout.block_slot("model_matrix").unwrap().offset, 64);
        assert_eq!(layout.block_slot("projection_matrix").unwrap().offset, 128);
        assert_eq!(layout.block_slot("camera_pos").unwrap().offset, 192);
        assert_eq!(layout.block_slot("light_vp").unwrap().offset, 208);
        assert_eq!(layout.block_size, 272);
    }

    #[test]
    fn scalars_pack_after_vec3() {
        let decls = uniforms(&[
            ("water_color", UniformKind::Vec3),
            ("transparency", UniformKind::Float),
            ("reflectance", UniformKind::Float),
        ]);
        let layout = ShaderLayout::resolve("water_color transparency reflectance", &decls, &[]);

        // f32 packs into the vec3 tail padding, as WGSL lays it out.
        assert_eq!(layout.block_slot("water_color").unwrap().offset, 0);
        assert_eq!(layout.block_slot("transparency").unwrap().offset, 12);
        assert_eq!(layout.block_slot("reflectance").unwrap().offset, 16);
    }

    #[test]
    fn wave_array_strides_32_bytes() {
        let mut decls = vec![("wave_count".to_string(), UniformKind::Int)];
        for i in 0..2 {
            decls.push((format!("waves[{}].direction", i), UniformKind::Vec2));
            decls.push((format!("waves[{}].steepness", i), UniformKind::Float));
            decls.push((format!("waves[{}].wavelength", i), UniformKind::Float));
            decls.push((format!("waves[{}].speed_multiplier", i), UniformKind::Float));
            decls.push((format!("waves[{}].phase", i), UniformKind::Float));
        }
        let layout = ShaderLayout::resolve("wave_count waves", &decls, &[]);

        let w0 = layout.block_slot("waves[0].direction").unwrap().offset;
        let w1 = layout.block_slot("waves[1].direction").unwrap().offset;
        assert_eq!(w1 - w0, 32);
        assert_eq!(layout.block_slot("waves[0].phase").unwrap().offset, w0 + 20);
    }

    #[test]
    fn unresolved_names_keep_their_offset_but_are_flagged() {
        let decls = uniforms(&[
            ("light_vp", UniformKind::Mat4),
            ("light_dir", UniformKind::Vec3),
        ]);
        let layout = ShaderLayout::resolve("struct U { light_vp: mat4x4f }", &decls, &[]);

        assert!(layout.block_slot("light_vp").unwrap().resolved);
        let dir = layout.block_slot("light_dir").unwrap();
        assert!(!dir.resolved);
        assert_eq!(dir.offset, 64);
    }

    #[test]
    fn attribute_slots_number_resolved_names_only() {
        let attribs: Vec<String> = ["a_position", "a_normal", "a_uv"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        // Shadow-style source: only declares the position input.
        let layout = ShaderLayout::resolve("struct VsIn { a_position: vec3f }", &[], &attribs);

        assert_eq!(layout.attribute_slot("a_position"), Some(0));
        assert_eq!(layout.attribute_slot("a_normal"), None);
        assert_eq!(layout.attribute_slot("a_uv"), None);
        assert_eq!(layout.attribute_order, vec!["a_position".to_string()]);
    }

    #[test]
    fn declaration_matching_is_word_bounded() {
        assert!(declares("let time = u.time;", "time"));
        assert!(!declares("let lifetime = 3.0;", "time"));
        assert!(declares("waves[0].direction", "waves[3].phase"));
        assert!(!declares("wavefront", "waves"));
    }

    #[test]
    fn texture_units_count_every_texture_entry() {
        let decls = uniforms(&[
            ("kd_map", UniformKind::Texture),
            ("normal_map", UniformKind::Texture),
            ("shadow_map", UniformKind::Texture),
        ]);
        let layout = ShaderLayout::resolve("kd_map normal_map shadow_map", &decls, &[]);
        assert_eq!(layout.textures, vec!["kd_map", "normal_map", "shadow_map"]);
    }
}
