//! Lume Renderer: High-level rendering logic.
//! Implements the volume renderer (raycast + SSAO + composition) on top of the render graph.

pub mod graph;
pub mod material;
pub mod shaders;
pub mod ssao;
pub mod volume_renderer;

pub use graph::{RenderGraph, RenderGraphNode, ResourceHandle, ResourceId as GraphResourceId, NodeId};
pub use volume_renderer::{CameraParams, DrawMode, VolumeRenderer};
