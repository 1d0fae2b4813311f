use std::sync::Arc;

use glam::{Vec3, vec3};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use waterline::mesh::TrsTransform;
use waterline::{
    Camera, DirectionalLight, GpuContext, ImportedMaterial, ImportedMesh, Renderer, gerstner_ocean,
    load_water, register_imported_mesh,
};

struct Scene {
    gpu: GpuContext,
    camera: Camera,
    renderer: Renderer,
}

#[derive(Default)]
struct App {
    window: Option<Arc<Window>>,
    scene: Option<Scene>,
}

/// A flat basin floor under the water, so the shadow, G-buffer, and
/// composite passes all have opaque geometry to work with.
fn basin_floor() -> ImportedMesh {
    let half = 30.0;
    let y = -2.0;
    ImportedMesh {
        positions: vec![
            -half, y, -half, //
            half, y, -half, //
            half, y, half, //
            -half, y, half,
        ],
        normals: Some(vec![
            0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ]),
        texcoords: Some(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]),
        indices: vec![0, 2, 1, 0, 3, 2],
        transform: TrsTransform::default(),
    }
}

fn build_scene(window: Arc<Window>) -> Scene {
    let gpu = GpuContext::new(window);

    let camera = Camera::new(
        &gpu,
        vec3(4.18927, 1.0313, 2.07331),
        vec3(2.92191, 0.98, 1.55037),
    )
    .expect("failed to allocate the G-buffer");

    let mut renderer = Renderer::new(&gpu);

    let light = DirectionalLight::new(
        &gpu,
        vec3(20.0, 20.0, 20.0),
        vec3(-0.45, 5.40507, 0.637043),
        vec3(0.39048811, -0.89896828, 0.19843153),
        Vec3::X,
    )
    .expect("failed to allocate the shadow map");
    renderer
        .add_light(&gpu, light)
        .expect("failed to compile the light cube material");

    register_imported_mesh(
        &gpu,
        &mut renderer,
        &camera,
        basin_floor(),
        ImportedMaterial {
            base_color: [96, 88, 80, 255],
            ..Default::default()
        },
    )
    .expect("failed to register the basin floor");

    load_water(&gpu, &mut renderer, &gerstner_ocean()).expect("failed to load the water surface");

    Scene {
        gpu,
        camera,
        renderer,
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window = Arc::new(
            event_loop
                .create_window(Window::default_attributes().with_title("waterline"))
                .unwrap(),
        );

        self.scene = Some(build_scene(window.clone()));
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(scene) = &mut self.scene {
                    scene.gpu.resize(size.width, size.height);
                    scene.renderer.resize(&scene.gpu);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(scene) = &mut self.scene {
                    match scene.renderer.render(&scene.gpu, &scene.camera) {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            let (w, h) = (scene.gpu.width(), scene.gpu.height());
                            scene.gpu.resize(w, h);
                        }
                        Err(e) => log::error!("frame dropped: {}", e),
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

fn main() {
    env_logger::init();

    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run_app(&mut App::default()).unwrap();
}
