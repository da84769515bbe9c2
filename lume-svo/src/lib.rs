//! Sparse voxel octree model, mesh voxelizer, and GPU volume-array flattening.
//!
//! Three layers, bottom to top:
//! - [`octree`] / [`voxel`]: the mutable tree and its leaf payload (C11).
//! - [`model`]: world-space placement and binary (de)serialization around a tree.
//! - [`voxelizer`] / [`triangle_octree`] / [`material`]: turns triangle meshes into
//!   models (C12).
//! - [`volume_array`]: flattens a model into the view-dependent array the raycaster
//!   consumes each frame (C13).

mod object_pool;

pub mod error;
pub mod material;
pub mod model;
pub mod octree;
pub mod triangle_octree;
pub mod voxel;
pub mod voxelizer;
pub mod volume_array;

pub use error::{DeserializeError, SvoError};
pub use material::{Material, MaterialFace, MaterialSemantic, PropertyValue, TextureSamplerRef};
pub use model::{Aabb, VoxelModel};
pub use octree::VoxelOctree;
pub use triangle_octree::{AabbOctreeNode, TriangleOctree};
pub use voxel::{mean_voxel, Voxel};
pub use voxelizer::{voxelize, InputTriangle, NoTextures, TextureSource};
pub use volume_array::{
    concatenate_layers, concatenate_layers_with_offsets, LodParams, VolumeArrayBuilder, VolumeArrayNode,
    VolumeLayer,
};
