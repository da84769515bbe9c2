//! Engine-wide configuration (C17): read once at startup, never hot-reloaded.
//!
//! Plain public-field structs with `with_*` builder methods, covering the full
//! device/renderer/descriptor-pool-chain surface this engine exposes.

use std::time::Duration;

/// LOD target-depth parameters for the volume array builder (§4.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodConfig {
    pub min_detail: u8,
    pub max_detail: u8,
    pub dist_to_max_detail: f32,
    pub dist_to_min_detail: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            min_detail: 0,
            max_detail: 12,
            dist_to_max_detail: 200.0,
            dist_to_min_detail: 5.0,
        }
    }
}

/// Post-process blur kernel selection for the composition pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlurMode {
    Box,
    SeparableGaussian { radius_x: f32, radius_y: f32 },
}

impl Default for BlurMode {
    fn default() -> Self {
        BlurMode::SeparableGaussian { radius_x: 2.0, radius_y: 2.0 }
    }
}

/// Engine-wide configuration, constructed via [`EngineConfig::default`] and
/// builder-style `with_*` setters. Never parsed from a file or CLI by this crate;
/// host applications own that.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub render_scale: f32,
    pub ssao_radius: f32,
    pub ssao_bias: f32,
    pub ssao_kernel_size: usize,
    pub lod: LodConfig,
    pub blur: BlurMode,
    pub validation: bool,
    pub fence_poll_interval: Duration,
    pub descriptor_pool_bucket_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render_scale: 1.0,
            ssao_radius: 0.5,
            ssao_bias: 0.025,
            ssao_kernel_size: 64,
            lod: LodConfig::default(),
            blur: BlurMode::default(),
            validation: false,
            fence_poll_interval: Duration::from_millis(2),
            descriptor_pool_bucket_count: 7,
        }
    }
}

impl EngineConfig {
    pub fn with_render_scale(mut self, render_scale: f32) -> Self {
        self.render_scale = render_scale.clamp(0.1, 1.0);
        self
    }

    pub fn with_ssao(mut self, radius: f32, bias: f32) -> Self {
        self.ssao_radius = radius;
        self.ssao_bias = bias;
        self
    }

    pub fn with_lod(mut self, lod: LodConfig) -> Self {
        self.lod = lod;
        self
    }

    pub fn with_blur(mut self, blur: BlurMode) -> Self {
        self.blur = blur;
        self
    }

    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_descriptor_pool_bucket_count(mut self, count: usize) -> Self {
        self.descriptor_pool_bucket_count = count.max(1);
        self
    }

    /// Folds in the `LUME_VALIDATION` environment override so it is visible at one
    /// call site instead of scattered `std::env::var` reads across the backend.
    pub fn from_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("LUME_VALIDATION") {
            self.validation = !(v == "0" || v.eq_ignore_ascii_case("false"));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_scale_is_clamped() {
        let cfg = EngineConfig::default().with_render_scale(5.0);
        assert_eq!(cfg.render_scale, 1.0);
        let cfg = EngineConfig::default().with_render_scale(0.0);
        assert_eq!(cfg.render_scale, 0.1);
    }

    #[test]
    fn env_override_disables_validation() {
        std::env::set_var("LUME_VALIDATION", "0");
        let cfg = EngineConfig::default().with_validation(true).from_env_overrides();
        assert!(!cfg.validation);
        std::env::remove_var("LUME_VALIDATION");
    }
}
