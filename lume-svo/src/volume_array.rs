//! Volume array builder (C13): flattens a [`VoxelOctree`] into the view-dependent,
//! GPU-uploadable LOD array consumed by the raycaster (spec §4.4).

use std::collections::HashMap;

use crate::model::{Aabb, VoxelModel};
use crate::octree::VoxelOctree;
use crate::voxel::Voxel;

/// One record of the flattened GPU volume array (spec §6 "Volume array GPU layout"),
/// 16 bytes packed. Depth-first order with skip-pointer traversal: a ray walks the
/// array in order, testing each node's AABB (derived from `center`/`depth`); on a
/// miss it jumps `stride` records ahead to skip the whole subtree instead of
/// visiting every descendant.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct VolumeArrayNode {
    /// Quantized center within the unit cube, uint16 fixed-point per axis.
    pub center: [u16; 3],
    /// Recursion depth at which this node was emitted; half-extent is `0.5 * 2^-depth`.
    pub depth: u8,
    /// Bit 0: carries a voxel payload (is a leaf).
    pub flags: u8,
    /// RGBA payload if a leaf, else the stride (in records) to the next sibling.
    pub payload_or_stride: u32,
    pub reserved: u16,
    pub _pad: u16,
}

const FLAG_HAS_PAYLOAD: u8 = 1;

/// View-dependent parameters controlling how deep each subtree is flattened.
#[derive(Debug, Clone, Copy)]
pub struct LodParams {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub min_detail: u32,
    pub max_detail: u32,
    pub dist_max: f32,
    pub dist_min: f32,
}

/// A finished layer: its flattened node array plus the view-space Z of its AABB
/// center, used to order layers front-to-back for the raycaster's early-out.
pub struct VolumeLayer {
    pub nodes: Vec<VolumeArrayNode>,
    pub view_z: f32,
}

struct CacheEntry {
    depth: u32,
    nodes: Vec<VolumeArrayNode>,
}

/// Builds and caches per-subtree flattened arrays across frames, keyed by the
/// subtree's root pool index — matches spec §4.4's "subtree keyed by root pointer"
/// cache contract without depending on the octree's internal node layout staying
/// stable across rebuilds.
#[derive(Default)]
pub struct VolumeArrayBuilder {
    cache: HashMap<u32, CacheEntry>,
}

impl VolumeArrayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the frame's volume array for `model` under `params`. Returns `None` if
    /// the model's AABB projects entirely outside the view frustum.
    pub fn build(&mut self, model: &VoxelModel, params: &LodParams) -> Option<VolumeLayer> {
        if !aabb_in_frustum(model.aabb, &params.view, &params.projection) {
            return None;
        }
        let view_z = transform_point(model.aabb.center(), &params.view)[2];
        let target_depth = target_depth_for(model.aabb, params, model.depth);
        let nodes = self.flatten_cached(&model.octree, target_depth);
        Some(VolumeLayer { nodes, view_z })
    }

    fn flatten_cached(&mut self, octree: &VoxelOctree, target_depth: u32) -> Vec<VolumeArrayNode> {
        let root = octree.root_index();
        if let Some(entry) = self.cache.get(&root) {
            if entry.depth == target_depth {
                return entry.nodes.clone();
            }
        }
        let mut nodes = Vec::new();
        flatten_rec(octree, root, [0.5, 0.5, 0.5], 0.5, 0, target_depth, &mut nodes);
        self.cache.insert(root, CacheEntry { depth: target_depth, nodes: nodes.clone() });
        nodes
    }
}

/// Sorts layers front-to-back by view-space Z (spec §4.4 step 4) and concatenates
/// their node arrays.
pub fn concatenate_layers(layers: Vec<VolumeLayer>) -> Vec<VolumeArrayNode> {
    concatenate_layers_with_offsets(layers).0
}

/// Like [`concatenate_layers`] but also returns each layer's `(node_offset, node_count)` range
/// into the concatenated array, in the same front-to-back order. The raycaster dispatches one
/// pass per range so each layer's push constants (origin, voxel size) stay per-layer while the
/// GPU-side storage buffer is a single upload.
pub fn concatenate_layers_with_offsets(mut layers: Vec<VolumeLayer>) -> (Vec<VolumeArrayNode>, Vec<(u32, u32)>) {
    layers.sort_by(|a, b| a.view_z.partial_cmp(&b.view_z).unwrap_or(std::cmp::Ordering::Equal));
    let mut nodes = Vec::new();
    let mut ranges = Vec::with_capacity(layers.len());
    for layer in layers {
        let offset = nodes.len() as u32;
        let count = layer.nodes.len() as u32;
        ranges.push((offset, count));
        nodes.extend(layer.nodes);
    }
    (nodes, ranges)
}

fn flatten_rec(
    octree: &VoxelOctree,
    index: u32,
    center: [f32; 3],
    half_extent: f32,
    level: u32,
    target_depth: u32,
    out: &mut Vec<VolumeArrayNode>,
) {
    let content = crate::octree::node_content_for_flatten(octree, index);
    match content {
        FlattenView::Empty => {}
        FlattenView::Leaf(v) => {
            out.push(leaf_node(v, center, level));
        }
        FlattenView::Internal { children, mask } => {
            if level >= target_depth {
                let voxels: Vec<Voxel> = children
                    .iter()
                    .filter(|&&c| c != crate::object_pool::NONE)
                    .filter_map(|&c| match crate::octree::node_content_for_flatten(octree, c) {
                        FlattenView::Leaf(v) => Some(v),
                        _ => None,
                    })
                    .collect();
                out.push(leaf_node(crate::voxel::mean_voxel(&voxels), center, level));
                return;
            }
            let self_index = out.len();
            out.push(VolumeArrayNode {
                center: quantize_center(center),
                depth: level as u8,
                flags: 0,
                payload_or_stride: 0, // patched below once the subtree size is known
                reserved: 0,
                _pad: 0,
            });
            let child_half = half_extent * 0.5;
            for (octant, &child) in children.iter().enumerate() {
                if mask & (1 << octant) != 0 {
                    let dx = if octant & 1 != 0 { child_half } else { -child_half };
                    let dy = if octant & 2 != 0 { child_half } else { -child_half };
                    let dz = if octant & 4 != 0 { child_half } else { -child_half };
                    let child_center = [center[0] + dx, center[1] + dy, center[2] + dz];
                    flatten_rec(octree, child, child_center, child_half, level + 1, target_depth, out);
                }
            }
            let stride = (out.len() - self_index) as u32;
            out[self_index].payload_or_stride = stride;
        }
    }
}

fn quantize_center(center: [f32; 3]) -> [u16; 3] {
    [
        (center[0].clamp(0.0, 1.0) * u16::MAX as f32) as u16,
        (center[1].clamp(0.0, 1.0) * u16::MAX as f32) as u16,
        (center[2].clamp(0.0, 1.0) * u16::MAX as f32) as u16,
    ]
}

fn leaf_node(v: Voxel, center: [f32; 3], depth: u32) -> VolumeArrayNode {
    VolumeArrayNode {
        center: quantize_center(center),
        depth: depth as u8,
        flags: FLAG_HAS_PAYLOAD,
        payload_or_stride: v.rgba(),
        reserved: 0,
        _pad: 0,
    }
}

pub(crate) enum FlattenView {
    Empty,
    Leaf(Voxel),
    Internal { children: [u32; 8], mask: u8 },
}

fn target_depth_for(aabb: Aabb, params: &LodParams, tree_depth: u32) -> u32 {
    let mvp = mul4(&params.projection, &params.view);
    let corners = aabb_corners(aabb);
    let mut min_px = [f32::MAX, f32::MAX];
    let mut max_px = [f32::MIN, f32::MIN];
    for c in corners {
        let clip = transform_point4(c, &mvp);
        if clip[3].abs() < 1e-6 {
            continue;
        }
        let ndc = [clip[0] / clip[3], clip[1] / clip[3]];
        min_px[0] = min_px[0].min(ndc[0]);
        min_px[1] = min_px[1].min(ndc[1]);
        max_px[0] = max_px[0].max(ndc[0]);
        max_px[1] = max_px[1].max(ndc[1]);
    }
    let pixel_w = (max_px[0] - min_px[0]).abs();
    let pixel_h = (max_px[1] - min_px[1]).abs();
    let best_fit_raw = (pixel_w.max(pixel_h).max(1.0)).log2();
    let best_fit_clamped = best_fit_raw.clamp(0.0, 125.0);

    let view_z = transform_point(aabb.center(), &params.view)[2].abs();
    let falloff = if params.dist_max > params.dist_min {
        ((params.dist_max - view_z) / (params.dist_max - params.dist_min)).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let best_fit = best_fit_clamped * falloff;

    let target = (params.min_detail as f32 + best_fit).min(tree_depth as f32);
    (target.round() as u32).min(params.max_detail)
}

fn aabb_corners(aabb: Aabb) -> [[f32; 3]; 8] {
    let mut out = [[0.0f32; 3]; 8];
    for i in 0..8 {
        out[i] = [
            if i & 1 != 0 { aabb.max[0] } else { aabb.min[0] },
            if i & 2 != 0 { aabb.max[1] } else { aabb.min[1] },
            if i & 4 != 0 { aabb.max[2] } else { aabb.min[2] },
        ];
    }
    out
}

fn transform_point(p: [f32; 3], m: &[[f32; 4]; 4]) -> [f32; 3] {
    let r = transform_point4([p[0], p[1], p[2], 1.0], m);
    [r[0], r[1], r[2]]
}

fn transform_point4(p: [f32; 4], m: &[[f32; 4]; 4]) -> [f32; 4] {
    let mut out = [0.0f32; 4];
    for row in 0..4 {
        out[row] = m[row][0] * p[0] + m[row][1] * p[1] + m[row][2] * p[2] + m[row][3] * p[3];
    }
    out
}

fn mul4(a: &[[f32; 4]; 4], b: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut out = [[0.0f32; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            let mut sum = 0.0;
            for k in 0..4 {
                sum += a[i][k] * b[k][j];
            }
            out[i][j] = sum;
        }
    }
    out
}

/// Conservative frustum test against the normalized clip-space box; an AABB is kept
/// unless every projected corner falls outside the same clip plane.
fn aabb_in_frustum(aabb: Aabb, view: &[[f32; 4]; 4], projection: &[[f32; 4]; 4]) -> bool {
    let mvp = mul4(projection, view);
    let corners = aabb_corners(aabb);
    let clip: Vec<[f32; 4]> = corners.iter().map(|&c| transform_point4([c[0], c[1], c[2], 1.0], &mvp)).collect();
    let outside = |test: &dyn Fn(&[f32; 4]) -> bool| clip.iter().all(test);
    if outside(&|c| c[0] > c[3]) || outside(&|c| c[0] < -c[3]) {
        return false;
    }
    if outside(&|c| c[1] > c[3]) || outside(&|c| c[1] < -c[3]) {
        return false;
    }
    if outside(&|c| c[2] > c[3]) || outside(&|c| c[2] < 0.0) {
        return false;
    }
    true
}

fn identity() -> [[f32; 4]; 4] {
    let mut m = [[0.0f32; 4]; 4];
    for i in 0..4 {
        m[i][i] = 1.0;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_params() -> LodParams {
        LodParams {
            view: identity(),
            projection: identity(),
            min_detail: 0,
            max_detail: 6,
            dist_max: 100.0,
            dist_min: 1.0,
        }
    }

    #[test]
    fn out_of_frustum_model_yields_no_layer() {
        let aabb = Aabb { min: [1000.0, 1000.0, 1000.0], max: [1001.0, 1001.0, 1001.0] };
        let model = VoxelModel::new(4, aabb);
        let mut builder = VolumeArrayBuilder::new();
        assert!(builder.build(&model, &identity_params()).is_none());
    }

    #[test]
    fn cache_reuses_array_for_same_target_depth() {
        let aabb = Aabb { min: [-1.0, -1.0, 0.5], max: [1.0, 1.0, 2.0] };
        let mut model = VoxelModel::new(4, aabb);
        model.octree.insert(0, 0, 0, Voxel::new(1, 2, 3, 255, 0)).unwrap();
        let mut builder = VolumeArrayBuilder::new();
        let params = identity_params();
        let first = builder.build(&model, &params).unwrap().nodes;
        let second = builder.build(&model, &params).unwrap().nodes;
        assert_eq!(first, second);
    }

    #[test]
    fn layers_concatenate_front_to_back() {
        let center = [0.5, 0.5, 0.5];
        let far = VolumeLayer { nodes: vec![leaf_node(Voxel::new(1, 0, 0, 255, 0), center, 0)], view_z: 50.0 };
        let near = VolumeLayer { nodes: vec![leaf_node(Voxel::new(0, 1, 0, 255, 0), center, 0)], view_z: 2.0 };
        let combined = concatenate_layers(vec![far, near]);
        assert_eq!(combined[0].payload_or_stride, Voxel::new(0, 1, 0, 255, 0).rgba());
        assert_eq!(combined[1].payload_or_stride, Voxel::new(1, 0, 0, 255, 0).rgba());
    }

    #[test]
    fn flatten_stride_covers_entire_subtree() {
        let aabb = Aabb { min: [-1.0, -1.0, -1.0], max: [1.0, 1.0, 1.0] };
        let mut model = VoxelModel::new(3, aabb);
        for (x, y, z) in [(0u32, 0u32, 0u32), (7, 7, 7), (1, 6, 3)] {
            model.octree.insert(x, y, z, Voxel::new(1, 2, 3, 255, 0)).unwrap();
        }
        let mut builder = VolumeArrayBuilder::new();
        let params = LodParams { max_detail: 3, ..identity_params() };
        let flat = builder.build(&model, &params).unwrap().nodes;
        assert!(!flat.is_empty());
        let mut i = 0;
        while i < flat.len() {
            let node = flat[i];
            if node.flags & FLAG_HAS_PAYLOAD == 0 {
                let stride = node.payload_or_stride as usize;
                assert!(stride > 0);
                assert!(i + stride <= flat.len());
            }
            i += 1;
        }
    }
}
