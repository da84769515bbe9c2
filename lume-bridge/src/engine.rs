//! [`Engine`]: constructs a device, owns the [`VolumeRenderer`] and the scene's models, and
//! drives one frame end to end. Host applications that don't need their own device lifecycle or
//! graph wiring can use this directly instead of assembling `lume-rhi`/`lume-renderer` by hand.

use std::sync::Arc;

use lume_rhi::config::EngineConfig;
use lume_rhi::{CommandBuffer, Device, Texture, VulkanDevice};
use lume_renderer::{CameraParams, DrawMode, VolumeRenderer};
use lume_svo::volume_array::LodParams;
use lume_svo::VoxelModel;

/// The set of models to render this frame, alongside the LOD parameters each was culled and
/// flattened with. Kept as a pair of parallel slices rather than a struct-of-one so callers can
/// build the LOD params once per camera move and reuse them across frames that don't change it.
#[derive(Default)]
pub struct Scene {
    pub models: Vec<VoxelModel>,
    pub lod_params: Vec<LodParams>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, model: VoxelModel, lod_params: LodParams) {
        self.models.push(model);
        self.lod_params.push(lod_params);
    }
}

/// Owns the device and the volume renderer built on top of it.
pub struct Engine {
    device: Arc<dyn Device>,
    renderer: VolumeRenderer,
}

impl Engine {
    /// Creates a headless device (no swapchain) and the volume renderer on top of it.
    pub fn new(config: EngineConfig) -> Result<Self, String> {
        let config = config.from_env_overrides();
        let device: Arc<dyn Device> = VulkanDevice::new()?;
        let renderer = VolumeRenderer::new(Arc::clone(&device), config)?;
        log::info!("engine initialized (headless)");
        Ok(Self { device, renderer })
    }

    /// Creates a device with a swapchain-capable surface bound to `window`, for applications that
    /// present directly instead of reading back a texture.
    #[cfg(feature = "window")]
    pub fn new_with_surface(
        config: EngineConfig,
        window: &dyn raw_window_handle::HasWindowHandle,
    ) -> Result<Self, String> {
        let config = config.from_env_overrides();
        let device: Arc<dyn Device> = VulkanDevice::new_with_surface(window)?;
        let renderer = VolumeRenderer::new(Arc::clone(&device), config)?;
        log::info!("engine initialized (windowed)");
        Ok(Self { device, renderer })
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    /// Re-culls and re-uploads `scene`'s models for a `target_extent`-sized output. Call once per
    /// frame before [`Engine::render`], after the camera/scene have changed.
    pub fn prepare_scene(&mut self, scene: &Scene, target_extent: (u32, u32)) -> Result<(), String> {
        self.renderer.prepare_scene(&scene.models, &scene.lod_params, target_extent)
    }

    pub fn set_camera(&self, camera: CameraParams, draw_mode: DrawMode) {
        self.renderer.set_camera(camera, draw_mode);
    }

    /// Renders the prepared scene into `output` and submits the resulting command buffers.
    pub fn render(&self, output: &dyn Texture, visualizer: bool) -> Result<(), String> {
        let command_buffers = self.renderer.render(output, visualizer)?;
        self.device.submit(command_buffers)
    }

    /// Renders without submitting, for callers that batch submission across multiple engines or
    /// need to interleave other command buffers in the same queue submit.
    pub fn render_unsubmitted(
        &self,
        output: &dyn Texture,
        visualizer: bool,
    ) -> Result<Vec<Box<dyn CommandBuffer>>, String> {
        self.renderer.render(output, visualizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lume_svo::model::Aabb;

    #[test]
    fn scene_add_keeps_models_and_params_aligned() {
        let mut scene = Scene::new();
        let aabb = Aabb { min: [0.0, 0.0, 0.0], max: [1.0, 1.0, 1.0] };
        scene.add(VoxelModel::new(4, aabb), identity_lod_params());
        assert_eq!(scene.models.len(), 1);
        assert_eq!(scene.lod_params.len(), 1);
    }

    fn identity_lod_params() -> LodParams {
        let mut identity = [[0.0f32; 4]; 4];
        for i in 0..4 {
            identity[i][i] = 1.0;
        }
        LodParams {
            view: identity,
            projection: identity,
            min_detail: 0,
            max_detail: 6,
            dist_max: 100.0,
            dist_min: 1.0,
        }
    }
}
