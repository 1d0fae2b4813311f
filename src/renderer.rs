//! Frame orchestration: the fixed five-stage deferred pipeline.
//!
//! Each frame renders, in order:
//!
//! 1. clear the screen,
//! 2. draw the light's visualization cube to the screen,
//! 3. shadow pass — clear the light's framebuffer, draw every shadow unit
//!    into it,
//! 4. buffer pass — clear the camera's G-buffer, draw every buffer unit
//!    into it,
//! 5. composite pass — draw every composite unit (SSR and water) to the
//!    screen.
//!
//! Light view-projection, shading direction, and elapsed time are recomputed
//! once per frame and pushed to every unit through the override path, so a
//! moving light stays consistent across all passes within one frame.

use std::rc::Rc;
use std::time::Instant;

use wgpu::SurfaceError;

use crate::camera::Camera;
use crate::deferred::emissive_material;
use crate::fbo::Fbo;
use crate::gpu::{GpuContext, SCREEN_DEPTH_FORMAT};
use crate::light::DirectionalLight;
use crate::material::UniformValue;
use crate::mesh_render::{MeshRenderUnit, ScreenTarget};
use crate::shader::ShaderError;
use crate::texture::Texture;

/// Draw counts for one rendered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub light_draws: u32,
    pub shadow_draws: u32,
    pub buffer_draws: u32,
    pub composite_draws: u32,
}

impl FrameStats {
    /// One draw per registered unit, per pass, in pass order.
    fn planned(lights: usize, shadow: usize, buffer: usize, composite: usize) -> Self {
        Self {
            light_draws: lights as u32,
            shadow_draws: shadow as u32,
            buffer_draws: buffer as u32,
            composite_draws: composite as u32,
        }
    }
}

struct LightUnit {
    light: DirectionalLight,
    unit: MeshRenderUnit,
}

/// The pass orchestrator. Units are registered into one of three lists and
/// drawn every frame in registration order.
pub struct Renderer {
    lights: Vec<LightUnit>,
    shadow_units: Vec<MeshRenderUnit>,
    buffer_units: Vec<MeshRenderUnit>,
    composite_units: Vec<MeshRenderUnit>,
    depth: Texture,
    started: Instant,
}

impl Renderer {
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            lights: Vec::new(),
            shadow_units: Vec::new(),
            buffer_units: Vec::new(),
            composite_units: Vec::new(),
            depth: Texture::render_target(
                gpu,
                gpu.width(),
                gpu.height(),
                SCREEN_DEPTH_FORMAT,
                "Screen Depth",
            ),
            started: Instant::now(),
        }
    }

    /// Register the scene's light, building its emissive cube unit.
    pub fn add_light(&mut self, gpu: &GpuContext, light: DirectionalLight) -> Result<(), ShaderError> {
        let unit = MeshRenderUnit::new(
            gpu,
            Rc::clone(&light.mesh),
            emissive_material(light.radiance),
        )?;
        self.lights.push(LightUnit { light, unit });
        Ok(())
    }

    /// Register a unit for the shadow pass.
    pub fn add_shadow_unit(&mut self, unit: MeshRenderUnit) {
        self.shadow_units.push(unit);
    }

    /// Register a unit for the G-buffer pass.
    pub fn add_buffer_unit(&mut self, unit: MeshRenderUnit) {
        self.buffer_units.push(unit);
    }

    /// Register a unit for the composite pass.
    pub fn add_composite_unit(&mut self, unit: MeshRenderUnit) {
        self.composite_units.push(unit);
    }

    /// The registered light, if any.
    pub fn light(&self) -> Option<&DirectionalLight> {
        self.lights.first().map(|l| &l.light)
    }

    /// Mutable access to the light, for animating its position or direction.
    pub fn light_mut(&mut self) -> Option<&mut DirectionalLight> {
        self.lights.first_mut().map(|l| &mut l.light)
    }

    /// Recreate the screen depth buffer after a surface resize.
    pub fn resize(&mut self, gpu: &GpuContext) {
        self.depth = Texture::render_target(
            gpu,
            gpu.width(),
            gpu.height(),
            SCREEN_DEPTH_FORMAT,
            "Screen Depth",
        );
    }

    /// Render one frame.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one light is registered. The whole pipeline is
    /// built around a single shadow-casting directional light.
    pub fn render(&mut self, gpu: &GpuContext, camera: &Camera) -> Result<FrameStats, SurfaceError> {
        assert!(!self.lights.is_empty(), "No light");
        assert!(self.lights.len() == 1, "Multiple lights");

        let frame = gpu.surface.get_current_texture()?;
        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let stats = FrameStats::planned(
            self.lights.len(),
            self.shadow_units.len(),
            self.buffer_units.len(),
            self.composite_units.len(),
        );
        let time = self.started.elapsed().as_millis() as f32 / 1000.0;
        let (light_vp, light_dir, light_pos, light_fbo) = {
            let light = &self.lights[0].light;
            (
                light.light_vp(),
                light.shading_direction(),
                light.position,
                Rc::clone(&light.fbo),
            )
        };
        let overrides: [(&str, UniformValue); 3] = [
            ("light_vp", UniformValue::Mat4(light_vp)),
            ("light_dir", UniformValue::Vec3(light_dir)),
            ("time", UniformValue::Float(time)),
        ];

        let screen = ScreenTarget {
            color: &frame_view,
            depth: &self.depth.view,
        };

        clear_pass(&mut encoder, &[&frame_view], &self.depth.view, "Clear Screen");

        // Draw light: keep the cube's marker on the light's position.
        {
            let light_unit = &mut self.lights[0];
            light_unit.unit.mesh.borrow_mut().transform.translate = light_pos;
            light_unit
                .unit
                .draw(gpu, &mut encoder, &screen, None, camera, &overrides);
        }

        // Shadow pass.
        clear_fbo(&mut encoder, &light_fbo, "Clear Shadow Map");
        for unit in &mut self.shadow_units {
            unit.draw(gpu, &mut encoder, &screen, Some(&light_fbo), camera, &overrides);
        }

        // Buffer pass.
        clear_fbo(&mut encoder, &camera.fbo, "Clear G-Buffer");
        for unit in &mut self.buffer_units {
            unit.draw(gpu, &mut encoder, &screen, Some(&camera.fbo), camera, &overrides);
        }

        // Composite pass, on top of the already-drawn light cube.
        for unit in &mut self.composite_units {
            unit.draw(gpu, &mut encoder, &screen, None, camera, &overrides);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        log::trace!("frame rendered: {:?}", stats);
        Ok(stats)
    }
}

/// Clear color attachments to opaque black and depth to 1.0, writing nothing
/// else.
fn clear_pass(
    encoder: &mut wgpu::CommandEncoder,
    color_views: &[&wgpu::TextureView],
    depth_view: &wgpu::TextureView,
    label: &str,
) {
    let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_views
        .iter()
        .map(|view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })
        })
        .collect();

    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &color_attachments,
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        ..Default::default()
    });
}

fn clear_fbo(encoder: &mut wgpu::CommandEncoder, fbo: &Fbo, label: &str) {
    let views: Vec<&wgpu::TextureView> = fbo.color.iter().map(|t| &t.view).collect();
    clear_pass(encoder, &views, fbo.depth_view(), label);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_one_draw_per_unit_per_pass() {
        let stats = FrameStats::planned(1, 2, 2, 3);
        assert_eq!(
            stats,
            FrameStats {
                light_draws: 1,
                shadow_draws: 2,
                buffer_draws: 2,
                composite_draws: 3,
            }
        );
        // A pass with no registered units draws nothing.
        assert_eq!(FrameStats::planned(1, 0, 0, 1).shadow_draws, 0);
    }
}
