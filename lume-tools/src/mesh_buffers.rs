//! Flat vertex/index buffers (the shape a glTF importer naturally produces) to
//! [`InputTriangle`] slices (the shape `lume_svo::voxelize` consumes).

use lume_svo::material::Material;
use lume_svo::voxelizer::InputTriangle;

/// A single mesh primitive's attribute buffers. `face_material` maps each triangle's
/// index (`indices[3*t..3*t+3]`) to the index of its owning entry in a caller-held
/// material slice; triangles sharing a material point at the same `&Material`.
pub struct MeshBuffers<'a> {
    pub positions: &'a [[f32; 3]],
    pub uvs: &'a [[f32; 2]],
    pub colors: &'a [[f32; 4]],
    pub indices: &'a [u32],
    pub face_material: &'a [u32],
}

/// Builds the `InputTriangle` list `voxelize` expects, resolving each triangle's
/// material from `materials` via `face_material`. Panics if `indices.len()` is not a
/// multiple of 3 or an index runs past its buffer — both indicate a malformed import,
/// not a runtime condition this crate should paper over.
pub fn triangles_from_buffers<'m>(
    mesh: &MeshBuffers<'_>,
    materials: &'m [Material],
) -> Vec<InputTriangle<'m>> {
    assert_eq!(mesh.indices.len() % 3, 0, "index buffer is not a triangle list");
    let triangle_count = mesh.indices.len() / 3;
    let mut out = Vec::with_capacity(triangle_count);
    for t in 0..triangle_count {
        let tri = [
            mesh.indices[t * 3] as usize,
            mesh.indices[t * 3 + 1] as usize,
            mesh.indices[t * 3 + 2] as usize,
        ];
        let material_index = mesh.face_material.get(t).copied().unwrap_or(0) as usize;
        out.push(InputTriangle {
            positions: [mesh.positions[tri[0]], mesh.positions[tri[1]], mesh.positions[tri[2]]],
            uvs: [mesh.uvs[tri[0]], mesh.uvs[tri[1]], mesh.uvs[tri[2]]],
            colors: [mesh.colors[tri[0]], mesh.colors[tri[1]], mesh.colors[tri[2]]],
            material: &materials[material_index],
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lume_svo::material::{MaterialSemantic, PropertyValue};

    #[test]
    fn single_triangle_round_trips_into_one_input_triangle() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let colors = [[1.0, 1.0, 1.0, 1.0]; 3];
        let indices = [0u32, 1, 2];
        let face_material = [0u32];
        let mesh = MeshBuffers {
            positions: &positions,
            uvs: &uvs,
            colors: &colors,
            indices: &indices,
            face_material: &face_material,
        };
        let mut material = Material::new();
        material.set(MaterialSemantic::BaseColor, PropertyValue::Color([0.5, 0.5, 0.5, 1.0]));
        let materials = [material];
        let triangles = triangles_from_buffers(&mesh, &materials);
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0].positions, positions);
        assert_eq!(triangles[0].material.base_color(), [0.5, 0.5, 0.5, 1.0]);
    }
}
