use std::path::Path;
use std::time::Instant;

use glam::{Vec2, Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{LightConfig, TracerConfig};
use crate::core::accumulation::AccumulationController;
use crate::core::buffers::{BufferId, SceneBufferManager};
use crate::core::events::{FrameEventBus, SubscriptionId};
use crate::core::kernel::{KernelBindings, KernelParams, KernelSlot};
use crate::error::{Result, TracerError};
use crate::scene::{self, SceneState, SceneSummary};
use crate::traits::{FrameHost, RenderDevice};

/// Progressive path tracer orchestrating scene upload, dispatch and accumulation
///
/// Constructed once and passed by reference to whatever drives it; scene
/// setup registers entities and frame subscribers through it.
pub struct PathTracer<D: RenderDevice> {
    device: D,
    buffers: SceneBufferManager<D::Buffer>,
    accumulation: AccumulationController<D::Target>,
    scene: SceneState,
    events: FrameEventBus<SceneState>,
    light: Vec4,
    viewport: (u32, u32),
    rng: StdRng,
    started: Instant,
    frames_rendered: u64,
}

impl<D: RenderDevice> PathTracer<D> {
    pub fn new(device: D, config: &TracerConfig) -> Self {
        Self {
            device,
            buffers: SceneBufferManager::new(),
            accumulation: AccumulationController::new(config.accumulation),
            scene: SceneState::new(config),
            events: FrameEventBus::new(),
            light: directional_light(&config.light),
            viewport: (config.width.max(1), config.height.max(1)),
            rng: StdRng::seed_from_u64(config.spheres.seed),
            started: Instant::now(),
            frames_rendered: 0,
        }
    }

    /// Register the configured scene content and its animators
    pub fn populate_scene(&mut self, config: &TracerConfig) -> Result<SceneSummary> {
        scene::populate(&mut self.scene, &mut self.events, config)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneState {
        &mut self.scene
    }

    pub fn buffers(&self) -> &SceneBufferManager<D::Buffer> {
        &self.buffers
    }

    pub fn accumulation(&self) -> &AccumulationController<D::Target> {
        &self.accumulation
    }

    pub fn sample_count(&self) -> u32 {
        self.accumulation.sample_count()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Register a frame-rendered handler
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(u32, &mut SceneState) + 'static,
    {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Targets are recreated on the next frame; zero sizes are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = (width, height);
    }

    pub fn set_accumulation(&mut self, enabled: bool) {
        self.accumulation.set_enabled(enabled);
    }

    /// Target the display pass should present
    pub fn current_target(&self) -> Option<&D::Target> {
        self.accumulation.current_target()
    }

    /// Rebuild, upload, bind, dispatch and accumulate one frame
    pub fn render_frame(&mut self) -> Result<()> {
        let (width, height) = self.viewport;
        self.accumulation.ensure_targets(&self.device, width, height);

        if self.scene.camera.take_changed() && self.accumulation.is_enabled() {
            self.accumulation.invalidate();
        }

        if self.scene.registry.rebuild(&mut self.accumulation) {
            let flat = self.scene.registry.flattened();
            self.buffers
                .upload(&self.device, BufferId::MeshObjects, &flat.mesh_objects);
            self.buffers.upload(&self.device, BufferId::Vertices, &flat.vertices);
            self.buffers.upload(&self.device, BufferId::Indices, &flat.indices);
        }

        // Dynamic spheres move every frame
        let spheres = self.scene.registry.spheres();
        self.buffers.upload(&self.device, BufferId::Spheres, &spheres);

        let params = self.kernel_params(spheres.len());

        let mut bindings = KernelBindings::new();
        self.buffers.bind(&mut bindings, KernelSlot::Spheres, BufferId::Spheres);
        self.buffers
            .bind(&mut bindings, KernelSlot::MeshObjects, BufferId::MeshObjects);
        self.buffers.bind(&mut bindings, KernelSlot::Vertices, BufferId::Vertices);
        self.buffers.bind(&mut bindings, KernelSlot::Indices, BufferId::Indices);

        let target = self
            .accumulation
            .working_target()
            .ok_or_else(|| TracerError::Gpu("no working target to dispatch into".to_string()))?;
        self.device.dispatch(&params, &bindings, target)?;

        if self.accumulation.is_enabled() {
            self.accumulation.advance(&self.device);
        }

        self.frames_rendered += 1;
        Ok(())
    }

    fn kernel_params(&mut self, sphere_count: usize) -> KernelParams {
        let (width, height) = self.viewport;
        let camera = &self.scene.camera;

        let pixel_offset = if self.accumulation.is_enabled() {
            Vec2::new(self.rng.gen::<f32>() / 2.0, self.rng.gen::<f32>() / 2.0)
        } else {
            Vec2::splat(0.5)
        };
        let seed = self.rng.gen::<f32>();

        KernelParams::new(
            camera.camera_to_world(),
            camera.inverse_projection(width as f32 / height as f32),
            self.light,
        )
        .with_pixel_offset(pixel_offset)
        .with_time(self.started.elapsed().as_secs_f32(), seed)
        .with_counts(sphere_count, self.scene.registry.flattened().mesh_objects.len())
    }

    /// Write the displayed target to `path`
    pub fn capture(&self, path: &Path) -> Result<()> {
        let target = self
            .accumulation
            .current_target()
            .ok_or_else(|| TracerError::Capture("nothing has been rendered yet".to_string()))?;
        self.device.capture(target, path)
    }

    /// Notify subscribers that `frame` is done
    pub fn publish(&mut self, frame: u32) {
        self.events.publish(frame, &mut self.scene);
    }

    /// Release scene buffers and render targets
    ///
    /// The registry is dirtied so a later frame uploads the mesh pools again.
    pub fn release(&mut self) {
        self.buffers.release_all(&self.device);
        self.accumulation.release(&self.device);
        self.scene.registry.mark_dirty();
    }
}

impl<D: RenderDevice> FrameHost for PathTracer<D> {
    fn mark_scene_dirty(&mut self) {
        self.scene.registry.mark_dirty();
    }

    fn render_frame(&mut self) -> Result<()> {
        PathTracer::render_frame(self)
    }

    fn capture_frame(&mut self, path: &Path) -> Result<()> {
        self.capture(path)
    }

    fn publish_frame(&mut self, frame: u32) {
        self.publish(frame);
    }

    fn release_resources(&mut self) {
        log::info!("Releasing tracer resources");
        self.release();
    }
}

impl<D: RenderDevice> Drop for PathTracer<D> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Normalised light direction in xyz, intensity in w
fn directional_light(light: &LightConfig) -> Vec4 {
    Vec3::from_array(light.direction)
        .normalize_or(Vec3::NEG_Y)
        .extend(light.intensity)
}
