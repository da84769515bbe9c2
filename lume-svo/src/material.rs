//! Material/material-face data consumed by the mesh voxelizer (C12) and, later, by
//! the renderer's shader-binding layer (C5/C14, see `lume-renderer::binding`).

use std::collections::HashMap;

/// Small enum keying a [`Material`]'s property map (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialSemantic {
    BaseColor,
    BaseColorTexture,
    Metallic,
    Roughness,
    NormalTexture,
}

/// A reference to a sampled texture plus the sampler to read it with. Both are
/// opaque handles here — the GPU-resident form is resolved downstream by the
/// renderer's material-binding layer, not by the voxelizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSamplerRef {
    pub texture: u32,
    pub sampler: u32,
}

/// A single material property value: scalar, vector, color, or texture+sampler pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    Scalar(f32),
    Vector([f32; 3]),
    Color([f32; 4]),
    Texture(TextureSamplerRef),
}

/// A property map keyed by [`MaterialSemantic`].
#[derive(Debug, Clone, Default)]
pub struct Material {
    properties: HashMap<MaterialSemantic, PropertyValue>,
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, semantic: MaterialSemantic, value: PropertyValue) -> &mut Self {
        self.properties.insert(semantic, value);
        self
    }

    pub fn get(&self, semantic: MaterialSemantic) -> Option<&PropertyValue> {
        self.properties.get(&semantic)
    }

    pub fn base_color(&self) -> [f32; 4] {
        match self.get(MaterialSemantic::BaseColor) {
            Some(PropertyValue::Color(c)) => *c,
            _ => [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// One triangle's full per-vertex attribute set plus its owning material, as fed to
/// the voxelizer (spec §3 "Material and material face").
#[derive(Debug, Clone)]
pub struct MaterialFace<'m> {
    pub positions: [[f32; 3]; 3],
    pub uvs: [[f32; 2]; 3],
    pub colors: [[f32; 4]; 3],
    pub material: &'m Material,
}

impl<'m> MaterialFace<'m> {
    pub fn aabb(&self) -> ([f32; 3], [f32; 3]) {
        let mut min = self.positions[0];
        let mut max = self.positions[0];
        for p in &self.positions[1..] {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        (min, max)
    }

    pub fn normal(&self) -> [f32; 3] {
        let e1 = sub(self.positions[1], self.positions[0]);
        let e2 = sub(self.positions[2], self.positions[0]);
        normalize(cross(e1, e2))
    }
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len <= f32::EPSILON {
        [0.0, 0.0, 1.0]
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}
