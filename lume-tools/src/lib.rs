//! Offline tools: adapters at the voxelizer's input boundary (spec §4.3/§1 Non-goals
//! "glTF mesh import... accepted as a producer of triangle streams and material
//! properties"). A glTF (or any other) mesh importer hands over flat position/uv/color
//! buffers and decoded texture bytes; this crate turns that into the
//! `lume_svo::voxelizer` contract (`InputTriangle` slices, a `TextureSource` impl)
//! without the voxelizer itself depending on any particular mesh or image format.

pub mod image_source;
pub mod mesh_buffers;

pub use image_source::ImageTextureSource;
pub use mesh_buffers::{triangles_from_buffers, MeshBuffers};
