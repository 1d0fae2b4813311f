//! The mesh render unit: one mesh bound to one material, drawable into a
//! framebuffer or the screen.
//!
//! Construction is two-phase. `new` uploads the mesh's attribute and index
//! buffers, appends the mesh's attribute names to the material, and compiles
//! the material — so the shader's binding slots are resolved against the
//! final attribute list. A unit only reaches the renderer fully built;
//! registration never sees a half-constructed one.
//!
//! Every draw performs the same sequence: apply per-frame overrides, pack
//! the uniform block, bind textures, and issue one indexed draw with
//! load-preserving attachments. Clearing is the renderer's job, not the
//! unit's.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::fbo::Fbo;
use crate::gpu::GpuContext;
use crate::material::{Material, UniformValue};
use crate::mesh::Mesh;
use crate::shader::{BlockSlot, ShaderError, ShaderLayout, ShaderProgram};

/// The window surface's attachments for screen-targeted draws.
pub struct ScreenTarget<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
}

/// Per-draw camera state packed into the head of every uniform block.
pub struct CameraBlock {
    pub view: Mat4,
    pub model: Mat4,
    pub projection: Mat4,
    pub camera_pos: Vec3,
}

/// A mesh/material pair compiled into a drawable unit.
pub struct MeshRenderUnit {
    pub mesh: Rc<RefCell<Mesh>>,
    pub material: Material,
    pub shader: ShaderProgram,
    vertex_buffers: Vec<(String, wgpu::Buffer)>,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl MeshRenderUnit {
    /// Upload the mesh, extend the material's attribute list with the mesh's
    /// attribute names, and compile.
    pub fn new(
        gpu: &GpuContext,
        mesh: Rc<RefCell<Mesh>>,
        mut material: Material,
    ) -> Result<Self, ShaderError> {
        let (vertex_buffers, index_buffer, index_count, names) = {
            let mesh_ref = mesh.borrow();

            let mut buffers = Vec::new();
            let mut names = Vec::new();
            for attrib in mesh_ref.attributes() {
                let buffer = gpu
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{} {}", material.name, attrib.name)),
                        contents: bytemuck::cast_slice(&attrib.data),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
                buffers.push((attrib.name.clone(), buffer));
                names.push(attrib.name.clone());
            }

            let index_buffer = gpu
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Indices", material.name)),
                    contents: bytemuck::cast_slice(&mesh_ref.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });

            (buffers, index_buffer, mesh_ref.index_count(), names)
        };

        material.append_attributes(names.iter().map(String::as_str));
        let shader = material.compile(gpu)?;

        Ok(Self {
            mesh,
            material,
            shader,
            vertex_buffers,
            index_buffer,
            index_count,
        })
    }

    /// Draw this unit once.
    ///
    /// `fbo` selects the destination: `Some` renders into the framebuffer's
    /// attachments, `None` into the screen target. All attachments load
    /// their previous contents; nothing is cleared here.
    pub fn draw(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        screen: &ScreenTarget,
        fbo: Option<&Fbo>,
        camera: &Camera,
        overrides: &[(&str, UniformValue)],
    ) {
        apply_overrides(&mut self.material, overrides);

        let camera_block = CameraBlock {
            view: camera.view_matrix(),
            model: self.mesh.borrow().transform.matrix(),
            projection: camera.projection_matrix(gpu.aspect()),
            camera_pos: camera.position,
        };
        let block = pack_uniform_block(&self.shader.layout, &camera_block, &self.material);
        gpu.queue
            .write_buffer(&self.shader.uniform_buffer, 0, &block);

        // Texture bind group is rebuilt per draw; framebuffer attachments
        // bound here may have been written by an earlier pass this frame.
        let texture_bind_group = self.shader.texture_layout.as_ref().map(|layout| {
            let mut entries = Vec::new();
            let mut unit = 0u32;
            for (_, value) in self.material.uniforms.iter() {
                if let UniformValue::Texture(texture) = value {
                    entries.push(wgpu::BindGroupEntry {
                        binding: unit * 2,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    });
                    entries.push(wgpu::BindGroupEntry {
                        binding: unit * 2 + 1,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    });
                    unit += 1;
                }
            }
            gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{} Textures", self.material.name)),
                layout,
                entries: &entries,
            })
        });

        let color_views: Vec<&wgpu::TextureView> = match fbo {
            Some(fbo) => fbo.color.iter().map(|t| &t.view).collect(),
            None => vec![screen.color],
        };
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_views
            .iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();
        let depth_view = match fbo {
            Some(fbo) => fbo.depth_view(),
            None => screen.depth,
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.material.name),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        pass.set_pipeline(&self.shader.pipeline);
        pass.set_bind_group(0, &self.shader.uniform_bind_group, &[]);
        if let Some(bind_group) = &texture_bind_group {
            pass.set_bind_group(1, bind_group, &[]);
        }
        for (slot, name) in self.shader.layout.attribute_order.iter().enumerate() {
            if let Some((_, buffer)) = self.vertex_buffers.iter().find(|(n, _)| n == name) {
                pass.set_vertex_buffer(slot as u32, buffer.slice(..));
            }
        }
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Overwrite material uniforms from per-frame override pairs.
///
/// Only keys the material already declares are touched, and only when the
/// kinds agree; everything else is skipped.
fn apply_overrides(material: &mut Material, overrides: &[(&str, UniformValue)]) {
    for (name, value) in overrides {
        match material.uniforms.get_mut(name) {
            Some(existing) if existing.kind() == value.kind() => {
                *existing = value.clone();
            }
            Some(existing) => {
                log::debug!(
                    "override `{}` kind {:?} does not match declared {:?}; skipped",
                    name,
                    value.kind(),
                    existing.kind()
                );
            }
            None => {}
        }
    }
}

/// Pack the full uniform block: camera prefix, then material uniforms, each
/// at its resolved offset. Unresolved slots keep their zeroed bytes.
fn pack_uniform_block(layout: &ShaderLayout, camera: &CameraBlock, material: &Material) -> Vec<u8> {
    let mut bytes = vec![0u8; layout.block_size as usize];

    let camera_values = [
        ("view_matrix", UniformValue::Mat4(camera.view)),
        ("model_matrix", UniformValue::Mat4(camera.model)),
        ("projection_matrix", UniformValue::Mat4(camera.projection)),
        ("camera_pos", UniformValue::Vec3(camera.camera_pos)),
    ];
    for (name, value) in &camera_values {
        write_slot(&mut bytes, layout.block_slot(name), value);
    }
    for (name, value) in material.uniforms.iter() {
        if matches!(value, UniformValue::Texture(_)) {
            continue;
        }
        write_slot(&mut bytes, layout.block_slot(name), value);
    }

    bytes
}

fn write_slot(bytes: &mut [u8], slot: Option<BlockSlot>, value: &UniformValue) {
    let Some(slot) = slot else { return };
    if !slot.resolved || slot.kind != value.kind() {
        return;
    }
    let offset = slot.offset as usize;
    match value {
        UniformValue::Float(v) => {
            bytes[offset..offset + 4].copy_from_slice(bytemuck::bytes_of(v));
        }
        UniformValue::Int(v) => {
            bytes[offset..offset + 4].copy_from_slice(bytemuck::bytes_of(v));
        }
        UniformValue::Vec2(v) => {
            bytes[offset..offset + 8].copy_from_slice(bytemuck::cast_slice(&v.to_array()));
        }
        UniformValue::Vec3(v) => {
            bytes[offset..offset + 12].copy_from_slice(bytemuck::cast_slice(&v.to_array()));
        }
        UniformValue::Mat4(v) => {
            bytes[offset..offset + 64].copy_from_slice(bytemuck::cast_slice(&v.to_cols_array()));
        }
        UniformValue::Texture(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::UniformMap;

    fn camera_block() -> CameraBlock {
        CameraBlock {
            view: Mat4::IDENTITY,
            model: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            projection: Mat4::IDENTITY,
            camera_pos: Vec3::new(4.0, 5.0, 6.0),
        }
    }

    fn read_f32(bytes: &[u8], offset: usize) -> f32 {
        f32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn packs_camera_prefix_and_material_values() {
        let mut uniforms = UniformMap::new();
        uniforms.insert("transparency", UniformValue::Float(0.85));
        let material = Material::new(
            "Test",
            uniforms,
            "view_matrix model_matrix projection_matrix camera_pos transparency",
            None,
        );
        let layout = ShaderLayout::resolve(&material.source, &material.flatten_uniforms(), &[]);

        let bytes = pack_uniform_block(&layout, &camera_block(), &material);
        assert_eq!(bytes.len() as u64, layout.block_size);
        // Model matrix translation column lives at offset 64 + 48.
        assert_eq!(read_f32(&bytes, 64 + 48), 1.0);
        assert_eq!(read_f32(&bytes, 64 + 52), 2.0);
        // Camera position at its fixed prefix offset.
        assert_eq!(read_f32(&bytes, 192), 4.0);
        assert_eq!(read_f32(&bytes, 200), 6.0);
        // A lone f32 packs into the camera_pos tail padding at 204.
        assert_eq!(read_f32(&bytes, 204), 0.85);
    }

    #[test]
    fn unresolved_uniforms_leave_zeroes() {
        let mut uniforms = UniformMap::new();
        uniforms.insert("reflectance", UniformValue::Float(0.4));
        let material = Material::new("Test", uniforms, "camera_pos", None);
        let layout = ShaderLayout::resolve(&material.source, &material.flatten_uniforms(), &[]);

        let bytes = pack_uniform_block(&layout, &camera_block(), &material);
        // reflectance is declared but unresolved; its slot stays zero.
        let slot = layout.block_slot("reflectance").unwrap();
        assert!(!slot.resolved);
        assert_eq!(read_f32(&bytes, slot.offset as usize), 0.0);
        // camera_pos resolved and written.
        assert_eq!(read_f32(&bytes, 192), 4.0);
    }

    #[test]
    fn overrides_respect_declared_kinds() {
        let mut uniforms = UniformMap::new();
        uniforms.insert("time", UniformValue::Float(0.0));
        uniforms.insert("light_dir", UniformValue::Vec3(Vec3::ZERO));
        let mut material = Material::new("Test", uniforms, "", None);

        apply_overrides(
            &mut material,
            &[
                ("time", UniformValue::Float(3.5)),
                ("light_dir", UniformValue::Float(1.0)), // kind mismatch
                ("light_vp", UniformValue::Mat4(Mat4::IDENTITY)), // undeclared
            ],
        );

        match material.uniforms.get("time") {
            Some(UniformValue::Float(v)) => assert_eq!(*v, 3.5),
            other => panic!("time is {:?}", other),
        }
        match material.uniforms.get("light_dir") {
            Some(UniformValue::Vec3(v)) => assert_eq!(*v, Vec3::ZERO),
            other => panic!("light_dir is {:?}", other),
        }
        assert!(!material.uniforms.contains("light_vp"));
    }
}
