//! # Waterline
//!
//! **A deferred-shading water renderer built on wgpu.**
//!
//! One directional light renders a shadow map, scene geometry fills a
//! five-target G-buffer, and a composite pass resolves direct lighting plus
//! screen-space reflections — with a procedural water surface displaced by
//! sine or Gerstner waves on top.
//!
//! ## Quick Start
//!
//! ```no_run
//! # use std::sync::Arc;
//! use glam::vec3;
//! use waterline::*;
//!
//! # fn demo(window: Arc<winit::window::Window>) {
//! let gpu = GpuContext::new(window);
//! let camera = Camera::new(&gpu, vec3(4.19, 1.03, 2.07), vec3(2.92, 0.98, 1.55)).unwrap();
//! let mut renderer = Renderer::new(&gpu);
//!
//! let light = DirectionalLight::new(
//!     &gpu,
//!     vec3(20.0, 20.0, 20.0),
//!     vec3(-0.45, 5.41, 0.64),
//!     vec3(0.39, -0.90, 0.20),
//!     vec3(1.0, 0.0, 0.0),
//! )
//! .unwrap();
//! renderer.add_light(&gpu, light).unwrap();
//!
//! load_water(&gpu, &mut renderer, &gerstner_ocean()).unwrap();
//!
//! // Per frame:
//! renderer.render(&gpu, &camera).unwrap();
//! # }
//! ```
//!
//! Materials address their uniforms and vertex attributes purely by name;
//! names the shader doesn't declare are silently skipped, so one material
//! definition can serve shader variants with different subsets of inputs.

pub mod camera;
pub mod deferred;
pub mod fbo;
pub mod gpu;
pub mod light;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod mesh_render;
pub mod renderer;
pub mod shader;
pub mod texture;
pub mod water_material;
pub mod water_surface;

pub use camera::Camera;
pub use deferred::{emissive_material, gbuffer_material, shadow_material, ssr_material};
pub use fbo::{Fbo, FboError};
pub use gpu::GpuContext;
pub use light::DirectionalLight;
pub use loader::{ImportedMaterial, ImportedMesh, load_water, register_imported_mesh};
pub use material::{Material, UniformMap, UniformValue};
pub use mesh::{AttributeData, Mesh, TrsTransform};
pub use mesh_render::{MeshRenderUnit, ScreenTarget};
pub use renderer::{FrameStats, Renderer};
pub use shader::{ShaderError, ShaderLayout, ShaderProgram, UniformKind};
pub use texture::Texture;
pub use water_material::{
    GerstnerWave, GerstnerWaveParams, SineWaveParams, WaterConfig, WaterParams, WaveModel,
    calm_lake, gerstner_ocean, gerstner_wave_material, sine_wave_material,
};
