//! Mesh voxelizer (C12): turns a triangle soup + material set into a [`VoxelModel`]
//! (spec §4.3).

use crate::material::{Material, MaterialFace};
use crate::model::{Aabb, VoxelModel};
use crate::triangle_octree::TriangleOctree;
use crate::voxel::Voxel;

/// A triangle resolved against the material it's drawn with, owning its position so
/// the voxelizer can normalize and re-associate it freely.
pub struct InputTriangle<'m> {
    pub positions: [[f32; 3]; 3],
    pub uvs: [[f32; 2]; 3],
    pub colors: [[f32; 4]; 3],
    pub material: &'m Material,
}

/// A sampled texture the material resolver can read from (nearest-neighbor, wrapped).
pub trait TextureSource {
    /// Samples RGBA at wrapped normalized UV coordinates.
    fn sample(&self, texture: u32, uv: [f32; 2]) -> [f32; 4];
}

/// No-op texture source for meshes with no base-color textures; every sample returns
/// opaque white so vertex color / material base color drive the result unmodified.
pub struct NoTextures;

impl TextureSource for NoTextures {
    fn sample(&self, _texture: u32, _uv: [f32; 2]) -> [f32; 4] {
        [1.0, 1.0, 1.0, 1.0]
    }
}

/// Voxelizes `triangles` at `target_depth`, sampling material colors through
/// `textures`. Degenerate input (zero triangles) yields an empty model spanning the
/// unit cube.
pub fn voxelize(
    triangles: &[InputTriangle],
    target_depth: u32,
    textures: &impl TextureSource,
) -> VoxelModel {
    if triangles.is_empty() {
        return VoxelModel::new(target_depth, Aabb { min: [0.0; 3], max: [1.0; 3] });
    }

    let world_aabb = compute_aabb(triangles);
    let (scale, offset) = normalize_transform(world_aabb);
    let normalized: Vec<[[f32; 3]; 3]> = triangles
        .iter()
        .map(|t| {
            [
                to_unit_cube(t.positions[0], scale, offset),
                to_unit_cube(t.positions[1], scale, offset),
                to_unit_cube(t.positions[2], scale, offset),
            ]
        })
        .collect();

    let aabbs: Vec<([f32; 3], [f32; 3])> = normalized.iter().map(|p| triangle_aabb(*p)).collect();
    let octree = TriangleOctree::build(aabbs, target_depth);

    let resolve = |tri_indices: &[usize], leaf_center: [f32; 3]| -> u32 {
        resolve_material(tri_indices, leaf_center, &normalized, triangles, textures)
    };
    let flat = octree.flatten(resolve);

    let resolution = 1u32 << target_depth;
    let mut model = VoxelModel::new(target_depth, world_aabb);
    for node in &flat {
        if node.flags & 1 == 0 {
            continue;
        }
        let lattice = [
            ((node.center[0] as u32 * resolution) / (u16::MAX as u32 + 1)).min(resolution - 1),
            ((node.center[1] as u32 * resolution) / (u16::MAX as u32 + 1)).min(resolution - 1),
            ((node.center[2] as u32 * resolution) / (u16::MAX as u32 + 1)).min(resolution - 1),
        ];
        let voxel = Voxel::from_rgba(node.payload_or_stride, 0);
        let _ = model.octree.insert(lattice[0], lattice[1], lattice[2], voxel);
    }
    model
}

fn compute_aabb(triangles: &[InputTriangle]) -> Aabb {
    let mut min = triangles[0].positions[0];
    let mut max = triangles[0].positions[0];
    for t in triangles {
        for p in &t.positions {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
    }
    // Degenerate axes (a flat mesh) get a nominal unit extent so the normalize
    // transform stays invertible.
    for i in 0..3 {
        if max[i] - min[i] < f32::EPSILON {
            max[i] = min[i] + 1.0;
        }
    }
    Aabb { min, max }
}

fn normalize_transform(aabb: Aabb) -> ([f32; 3], [f32; 3]) {
    let extent = [
        aabb.max[0] - aabb.min[0],
        aabb.max[1] - aabb.min[1],
        aabb.max[2] - aabb.min[2],
    ];
    let scale = [1.0 / extent[0], 1.0 / extent[1], 1.0 / extent[2]];
    (scale, aabb.min)
}

fn to_unit_cube(p: [f32; 3], scale: [f32; 3], offset: [f32; 3]) -> [f32; 3] {
    [
        (p[0] - offset[0]) * scale[0],
        (p[1] - offset[1]) * scale[1],
        (p[2] - offset[2]) * scale[2],
    ]
}

fn triangle_aabb(p: [[f32; 3]; 3]) -> ([f32; 3], [f32; 3]) {
    let mut min = p[0];
    let mut max = p[0];
    for v in &p[1..] {
        for i in 0..3 {
            min[i] = min[i].min(v[i]);
            max[i] = max[i].max(v[i]);
        }
    }
    (min, max)
}

/// Reference material-resolver implementation (spec §4.3): for each candidate
/// triangle, cast from the leaf center along the triangle's normal, interpolate
/// color/UV at the nearer hit, sample the base-color texture if present, and average
/// across candidates.
fn resolve_material(
    tri_indices: &[usize],
    leaf_center: [f32; 3],
    normalized: &[[[f32; 3]; 3]],
    original: &[InputTriangle],
    textures: &impl TextureSource,
) -> u32 {
    let mut accum = [0.0f32; 4];
    let mut hits = 0u32;
    for &i in tri_indices {
        let p = normalized[i];
        let tri = &original[i];
        let face = MaterialFace {
            positions: p,
            uvs: tri.uvs,
            colors: tri.colors,
            material: tri.material,
        };
        let normal = face.normal();
        if let Some((bary, _t)) = ray_triangle_hit(leaf_center, normal, p) {
            let color = interpolate(tri.colors, bary);
            let uv = interpolate_uv(tri.uvs, bary);
            let base_color = tri.material.base_color();
            let sample = match tri.material.get(crate::material::MaterialSemantic::BaseColorTexture) {
                Some(crate::material::PropertyValue::Texture(t)) => textures.sample(t.texture, uv),
                _ => color,
            };
            for c in 0..4 {
                accum[c] += sample[c] * base_color[c];
            }
            hits += 1;
        }
    }
    if hits == 0 {
        return 0;
    }
    let inv = 1.0 / hits as f32;
    let rgba = [
        (accum[0] * inv).clamp(0.0, 1.0),
        (accum[1] * inv).clamp(0.0, 1.0),
        (accum[2] * inv).clamp(0.0, 1.0),
        (accum[3] * inv).clamp(0.0, 1.0),
    ];
    u32::from_le_bytes([
        (rgba[0] * 255.0) as u8,
        (rgba[1] * 255.0) as u8,
        (rgba[2] * 255.0) as u8,
        (rgba[3] * 255.0) as u8,
    ])
}

/// Casts a ray from `origin` along `dir` (and its reverse) against triangle `tri`;
/// returns the barycentric coordinates and signed distance of the nearer hit.
fn ray_triangle_hit(origin: [f32; 3], dir: [f32; 3], tri: [[f32; 3]; 3]) -> Option<([f32; 3], f32)> {
    let forward = intersect(origin, dir, tri);
    let backward = intersect(origin, [-dir[0], -dir[1], -dir[2]], tri);
    match (forward, backward) {
        (Some(f), Some(b)) => Some(if f.1.abs() <= b.1.abs() { f } else { b }),
        (Some(f), None) => Some(f),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Moller-Trumbore ray/triangle intersection returning `(barycentric, t)`.
fn intersect(origin: [f32; 3], dir: [f32; 3], tri: [[f32; 3]; 3]) -> Option<([f32; 3], f32)> {
    let e1 = sub(tri[1], tri[0]);
    let e2 = sub(tri[2], tri[0]);
    let pvec = cross(dir, e2);
    let det = dot(e1, pvec);
    if det.abs() < 1e-9 {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = sub(origin, tri[0]);
    let u = dot(tvec, pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = cross(tvec, e1);
    let v = dot(dir, qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = dot(e2, qvec) * inv_det;
    Some(([1.0 - u - v, u, v], t))
}

fn interpolate(values: [[f32; 4]; 3], bary: [f32; 3]) -> [f32; 4] {
    let mut out = [0.0f32; 4];
    for c in 0..4 {
        out[c] = values[0][c] * bary[0] + values[1][c] * bary[1] + values[2][c] * bary[2];
    }
    out
}

fn interpolate_uv(values: [[f32; 2]; 3], bary: [f32; 3]) -> [f32; 2] {
    [
        values[0][0] * bary[0] + values[1][0] * bary[1] + values[2][0] * bary[2],
        values[0][1] * bary[0] + values[1][1] * bary[1] + values[2][1] * bary[2],
    ]
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;

    fn tetrahedron(material: &Material) -> Vec<InputTriangle<'_>> {
        let verts = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let faces = [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        faces
            .iter()
            .map(|f| InputTriangle {
                positions: [verts[f[0]], verts[f[1]], verts[f[2]]],
                uvs: [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
                colors: [[1.0, 0.0, 0.0, 1.0]; 3],
                material,
            })
            .collect()
    }

    #[test]
    fn voxelizing_a_tetrahedron_produces_leaves_near_its_surface() {
        let mut material = Material::new();
        material.set(
            crate::material::MaterialSemantic::BaseColor,
            crate::material::PropertyValue::Color([1.0, 1.0, 1.0, 1.0]),
        );
        let tris = tetrahedron(&material);
        let model = voxelize(&tris, 5, &NoTextures);
        assert!(model.octree.num_leaf_nodes() > 0);
        assert!(model.octree.num_leaf_nodes() < (1usize << (5 * 3)));
    }

    #[test]
    fn empty_input_produces_empty_model() {
        let model = voxelize(&[], 4, &NoTextures);
        assert_eq!(model.octree.num_leaf_nodes(), 0);
    }
}
