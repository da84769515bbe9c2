//! Top-level facade: wires device creation, [`EngineConfig`], and [`VolumeRenderer`] into the
//! one entry point a host application constructs. Everything here is a thin composition of
//! `lume-rhi` and `lume-renderer` types; it holds no rendering logic of its own.

mod engine;

pub use engine::{Engine, Scene};
pub use lume_rhi::config::EngineConfig;
pub use lume_renderer::{CameraParams, DrawMode};
