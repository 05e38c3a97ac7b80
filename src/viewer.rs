//! Standalone demo window backed by winit.
//!
//! Shows a grid of generated meshes on the ground plane. Hovering an
//! instance gives it a faint rim through the hit-test result, clicking
//! selects it, and keys toggle the draw flags:
//!
//! | Key | Effect |
//! |-----|--------|
//! | `W` | wireframe |
//! | `N` | normals overlay |
//! | `F` | ground plane |
//! | `R` | rims |
//! | `D` | diagnostic quads |
//! | `H` | hit testing |
//! | `O` | optimized vs. synchronous hit test |
//! | `1`, `2`, `4`, `8` | sample count |
//!
//! ```no_run
//! # use rimrender::Viewer;
//! Viewer::builder().with_title("rims").build().run().unwrap();
//! ```

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3, Vec4};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::error::RenderError;
use crate::gpu::render_context::RenderContext;
use crate::mesh::{generate, MeshId};
use crate::options::RenderOptions;
use crate::renderer::frame::FrameParams;
use crate::renderer::SceneRenderer;
use crate::scene::label::{label_instances, Highlight};
use crate::scene::MeshInstance;

/// Pointer travel, in pixels, beyond which a press counts as a drag.
const CLICK_SLOP: f32 = 4.0;
/// Instances per side of the demo grid.
const GRID: usize = 6;
/// World-space distance between grid cells.
const SPACING: f32 = 3.0;

// ── Camera ───────────────────────────────────────────────────────────────

/// Orbiting camera around a fixed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OrbitCamera {
    target: Vec3,
    yaw: f32,
    pitch: f32,
    distance: f32,
    fov_y: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 1.0, 0.0),
            yaw: 0.6,
            pitch: 0.45,
            distance: 24.0,
            fov_y: 45f32.to_radians(),
        }
    }
}

impl OrbitCamera {
    const MIN_DISTANCE: f32 = 2.0;
    const MAX_DISTANCE: f32 = 150.0;
    const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.05;

    pub(crate) fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target
            + self.distance
                * Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    pub(crate) fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub(crate) fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect.max(1e-3), 0.1, 500.0)
    }

    /// Orbit by a pointer drag of `delta` pixels.
    pub(crate) fn rotate(&mut self, delta: Vec2) {
        self.yaw -= delta.x * 0.01;
        self.pitch = (self.pitch + delta.y * 0.01)
            .clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
    }

    /// Dolly by `steps` wheel notches; positive moves closer.
    pub(crate) fn zoom(&mut self, steps: f32) {
        self.distance = (self.distance * 0.9f32.powf(steps))
            .clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
    }
}

// ── Demo scene ───────────────────────────────────────────────────────────

struct Shape {
    mesh_id: MeshId,
    transform: Mat4,
    rgba: Vec4,
}

/// Grid of generated meshes, every fourth one translucent.
struct DemoScene {
    shapes: Vec<Shape>,
}

impl DemoScene {
    fn new(
        context: &RenderContext,
        renderer: &mut SceneRenderer,
    ) -> Result<Self, RenderError> {
        let meshes = [
            renderer.allocate_mesh_keyed(context, "sphere", || {
                generate::unit_sphere(12, 12)
            })?,
            renderer
                .allocate_mesh_keyed(context, "cylinder", || generate::unit_cylinder(24))?,
            renderer.allocate_mesh_keyed(context, "cube", generate::unit_cube)?,
        ];

        let offset = (GRID as f32 - 1.0) * SPACING * 0.5;
        let shapes = (0..GRID * GRID)
            .map(|i| {
                let (row, col) = (i / GRID, i % GRID);
                let position = Vec3::new(
                    col as f32 * SPACING - offset,
                    1.0,
                    row as f32 * SPACING - offset,
                );
                let hue = i as f32 / (GRID * GRID) as f32;
                let alpha = if i % 4 == 3 { 0.5 } else { 1.0 };
                Shape {
                    mesh_id: meshes[i % meshes.len()],
                    transform: Mat4::from_translation(position),
                    rgba: Vec4::new(0.3 + 0.6 * hue, 0.5, 0.9 - 0.6 * hue, alpha),
                }
            })
            .collect();
        Ok(Self { shapes })
    }

    /// Fresh instance list labelled by generation order.
    fn instances(
        &self,
        hovered: Option<usize>,
        selected: Option<usize>,
    ) -> Result<Vec<MeshInstance>, RenderError> {
        let mut instances: Vec<MeshInstance> = self
            .shapes
            .iter()
            .map(|shape| {
                MeshInstance::new(shape.mesh_id, shape.transform, shape.rgba)
            })
            .collect();
        label_instances(&mut instances, |index| {
            if selected == Some(index) {
                Highlight::Selected
            } else if hovered == Some(index) {
                Highlight::Hovered
            } else {
                Highlight::None
            }
        })?;
        Ok(instances)
    }
}

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    options: Option<RenderOptions>,
    title: String,
}

impl ViewerBuilder {
    fn new() -> Self {
        Self {
            options: None,
            title: "rimrender".into(),
        }
    }

    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            options: self.options.unwrap_or_default(),
            title: self.title,
        }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// A standalone window rendering the demo scene.
///
/// Construct via [`Viewer::builder`], then call [`run`](Self::run) to
/// enter the event loop.
pub struct Viewer {
    options: RenderOptions,
    title: String,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Viewer`] if the event loop fails, or the
    /// first error raised while setting up or drawing.
    pub fn run(self) -> Result<(), RenderError> {
        let event_loop =
            EventLoop::new().map_err(|e| RenderError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = ViewerApp {
            options: self.options,
            title: self.title,
            state: None,
            camera: OrbitCamera::default(),
            pointer: None,
            press: None,
            dragging: false,
            selected: None,
            error: None,
        };
        event_loop
            .run_app(&mut app)
            .map_err(|e| RenderError::Viewer(e.to_string()))?;
        app.error.map_or(Ok(()), Err)
    }
}

// ── Winit app ────────────────────────────────────────────────────────────

/// GPU-side state, created once the window exists.
struct GpuState {
    window: Arc<Window>,
    context: RenderContext,
    renderer: SceneRenderer,
    scene: DemoScene,
}

struct ViewerApp {
    options: RenderOptions,
    title: String,
    state: Option<GpuState>,
    camera: OrbitCamera,
    pointer: Option<Vec2>,
    press: Option<Vec2>,
    dragging: bool,
    selected: Option<usize>,
    error: Option<RenderError>,
}

impl ViewerApp {
    fn init(&self, event_loop: &ActiveEventLoop) -> Result<GpuState, RenderError> {
        let window = Arc::new(
            event_loop
                .create_window(Window::default_attributes().with_title(&self.title))
                .map_err(|e| RenderError::Viewer(e.to_string()))?,
        );
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));
        let context =
            pollster::block_on(RenderContext::new(Arc::clone(&window), (width, height)))?;

        let requested = self.options.quality.sample_count;
        let sample_count = if context.supports_sample_count(requested) {
            requested
        } else {
            log::warn!("{requested}x MSAA unsupported; falling back to 1x");
            1
        };
        let mut renderer = SceneRenderer::new(
            &context,
            context.format(),
            (width, height),
            sample_count,
        )?;
        let scene = DemoScene::new(&context, &mut renderer)?;
        Ok(GpuState {
            window,
            context,
            renderer,
            scene,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: RenderError) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let Some(state) = &mut self.state else {
            return Ok(());
        };
        if width == 0 || height == 0 {
            return Ok(());
        }
        state.context.resize(width, height);
        let samples = state.renderer.sample_count();
        state
            .renderer
            .reallocate_buffers(&state.context, width, height, samples)
    }

    fn set_sample_count(&mut self, count: u32) -> Result<(), RenderError> {
        let Some(state) = &mut self.state else {
            return Ok(());
        };
        if !state.context.supports_sample_count(count) {
            log::warn!("{count}x MSAA unsupported by this adapter");
            return Ok(());
        }
        self.options.quality.sample_count = count;
        let (width, height) = state.renderer.size();
        state
            .renderer
            .reallocate_buffers(&state.context, width, height, count)
    }

    fn toggle(&mut self, code: KeyCode) -> Result<(), RenderError> {
        let flags = &mut self.options.flags;
        match code {
            KeyCode::KeyW => flags.wireframe = !flags.wireframe,
            KeyCode::KeyN => flags.show_normals = !flags.show_normals,
            KeyCode::KeyF => flags.show_floor = !flags.show_floor,
            KeyCode::KeyR => flags.draw_rims = !flags.draw_rims,
            KeyCode::KeyD => flags.diagnostics = !flags.diagnostics,
            KeyCode::KeyH => flags.hit_test = !flags.hit_test,
            KeyCode::KeyO => {
                flags.optimized_hit_test = !flags.optimized_hit_test;
            }
            KeyCode::Digit1 => return self.set_sample_count(1),
            KeyCode::Digit2 => return self.set_sample_count(2),
            KeyCode::Digit4 => return self.set_sample_count(4),
            KeyCode::Digit8 => return self.set_sample_count(8),
            _ => return Ok(()),
        }
        log::info!("flags: {:?}", self.options.flags);
        Ok(())
    }

    fn release(&mut self) {
        if !self.dragging {
            self.selected = self
                .state
                .as_ref()
                .and_then(|state| state.renderer.hit_test_result().instance_index());
        }
        self.press = None;
        self.dragging = false;
    }

    fn redraw(&mut self) -> Result<(), RenderError> {
        let Some(state) = &mut self.state else {
            return Ok(());
        };
        let frame = match state.context.get_next_frame() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                let size = state.window.inner_size();
                state.context.resize(size.width, size.height);
                return Ok(());
            }
            Err(e) => {
                log::warn!("skipping frame: {e}");
                return Ok(());
            }
        };

        let (width, height) = state.renderer.size();
        let hovered = state.renderer.hit_test_result().instance_index();
        let mut instances = state.scene.instances(hovered, self.selected)?;
        let params = FrameParams::from_options(
            &self.options,
            self.camera.view(),
            self.camera.projection(width as f32 / height as f32),
            self.camera.eye(),
        )
        .with_pointer(self.pointer.map(|p| (p.x as u32, p.y as u32)));

        let _ = state.renderer.draw(
            &state.context,
            &mut instances,
            &params,
            &frame.texture,
        )?;
        frame.present();
        Ok(())
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => {
                state.window.request_redraw();
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        let handled = match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let drawn = self.redraw();
                if let Some(state) = &self.state {
                    state.window.request_redraw();
                }
                drawn
            }
            WindowEvent::CursorMoved { position, .. } => {
                let now = Vec2::new(position.x as f32, position.y as f32);
                if let (Some(press), Some(last)) = (self.press, self.pointer) {
                    self.dragging |= now.distance(press) > CLICK_SLOP;
                    if self.dragging {
                        self.camera.rotate(now - last);
                    }
                }
                self.pointer = Some(now);
                Ok(())
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer = None;
                Ok(())
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                if state == ElementState::Pressed {
                    self.press = self.pointer;
                } else {
                    self.release();
                }
                Ok(())
            }
            WindowEvent::MouseWheel { delta, .. } => {
                match delta {
                    MouseScrollDelta::LineDelta(_, y) => self.camera.zoom(y),
                    MouseScrollDelta::PixelDelta(pos) => {
                        self.camera.zoom(pos.y as f32 * 0.01);
                    }
                }
                Ok(())
            }
            WindowEvent::KeyboardInput { event, .. } => {
                match (event.state, event.physical_key) {
                    (ElementState::Pressed, PhysicalKey::Code(code)) => {
                        self.toggle(code)
                    }
                    _ => Ok(()),
                }
            }
            _ => Ok(()),
        };
        if let Err(e) = handled {
            self.fail(event_loop, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_looks_at_target() {
        let camera = OrbitCamera::default();
        let eye = camera.eye();
        assert!((eye.distance(camera.target) - camera.distance).abs() < 1e-4);
        let target_in_view = camera.view().transform_point3(camera.target);
        assert!(target_in_view.x.abs() < 1e-4);
        assert!(target_in_view.y.abs() < 1e-4);
        assert!(target_in_view.z < 0.0);
    }

    #[test]
    fn pitch_is_clamped_short_of_the_poles() {
        let mut camera = OrbitCamera::default();
        camera.rotate(Vec2::new(0.0, 10_000.0));
        assert!(camera.pitch < FRAC_PI_2);
        camera.rotate(Vec2::new(0.0, -20_000.0));
        assert!(camera.pitch > -FRAC_PI_2);
    }

    #[test]
    fn zoom_stays_in_range() {
        let mut camera = OrbitCamera::default();
        camera.zoom(1000.0);
        assert_eq!(camera.distance, OrbitCamera::MIN_DISTANCE);
        camera.zoom(-1000.0);
        assert_eq!(camera.distance, OrbitCamera::MAX_DISTANCE);
    }
}
