//! Material to pipeline binding (§4.6): resolves a shader's reflected resource/push-constant
//! tables against a `Material`'s property map, substituting device-wide defaults for anything
//! the material doesn't supply so a mesh is never un-drawable.

use lume_rhi::{
    AddressMode, Device, FilterMode, Sampler, SamplerDescriptor, Texture, TextureDescriptor,
    TextureDimension, TextureFormat, TextureUsage,
};
use std::collections::HashMap;
use std::sync::Arc;

/// A binding location inside a shader's reflected layout: `offset` is the push-constant byte
/// offset when this entry is a push constant, 0 for a full descriptor binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderBindingLocation {
    pub set: u32,
    pub binding: u32,
    pub offset: u32,
}

/// Material-authored properties a shader binding can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialSemantic {
    BaseColor,
    BaseColorTexture,
    Metallic,
    Roughness,
    NormalTexture,
    Emissive,
}

/// Engine-derived uniforms, resolved from render state rather than the material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderUniformSemantic {
    ModelViewProjectionMatrix,
    ModelViewMatrix,
    InverseModelViewProjectionMatrix,
    ZNearZFar,
    ViewportSize,
}

/// Which of the two semantic tables a shader binding location resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceSemantic {
    Material(MaterialSemantic),
    Uniform(ShaderUniformSemantic),
}

/// Per-vertex attribute roles a shader's vertex input locations map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeSemantic {
    Position,
    Normal,
    TextureCoordinates,
    Color,
    Tangent,
}

/// A single material property value; resolved against a `MaterialSemantic` to produce either a
/// GPU resource (texture/sampler) or raw bytes for a push-constant/uniform slot.
#[derive(Debug, Clone)]
pub enum MaterialValue {
    Scalar(f32),
    Vector([f32; 4]),
    Color([f32; 4]),
    Texture { texture: Arc<dyn Texture>, sampler: Arc<dyn Sampler> },
}

/// Per-triangle material: a property map keyed by [`MaterialSemantic`].
#[derive(Debug, Default, Clone)]
pub struct Material {
    properties: HashMap<MaterialSemantic, MaterialValue>,
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, semantic: MaterialSemantic, value: MaterialValue) -> &mut Self {
        self.properties.insert(semantic, value);
        self
    }

    pub fn get(&self, semantic: MaterialSemantic) -> Option<&MaterialValue> {
        self.properties.get(&semantic)
    }
}

/// Pairs a shader's reflected binding tables with the semantics they resolve to (spec §4.6).
#[derive(Debug, Clone, Default)]
pub struct MaterialShaderMap {
    pub resource_semantics: HashMap<ShaderBindingLocation, ResourceSemantic>,
    pub input_attribute_semantics: HashMap<u32, VertexAttributeSemantic>,
}

impl MaterialShaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_resource(mut self, location: ShaderBindingLocation, semantic: ResourceSemantic) -> Self {
        self.resource_semantics.insert(location, semantic);
        self
    }

    pub fn bind_input(mut self, shader_location: u32, semantic: VertexAttributeSemantic) -> Self {
        self.input_attribute_semantics.insert(shader_location, semantic);
        self
    }
}

/// Device-wide fallbacks substituted when a material doesn't supply a value for a binding, so
/// that no mesh is ever un-drawable for a missing texture/sampler.
pub struct DefaultResources {
    pub magenta_texture: Arc<dyn Texture>,
    pub default_sampler: Arc<dyn Sampler>,
}

impl DefaultResources {
    pub fn create(device: &dyn Device) -> Result<Self, String> {
        let texture = device.create_texture(&TextureDescriptor {
            label: Some("default_magenta"),
            size: (1, 1, 1),
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
            dimension: TextureDimension::D2,
            mip_level_count: 1,
        })?;
        let magenta: [u8; 4] = [255, 0, 255, 255];
        let staging = device.create_buffer(&lume_rhi::BufferDescriptor {
            label: Some("default_magenta_staging"),
            size: 4,
            usage: lume_rhi::BufferUsage::CopySrc,
            memory: lume_rhi::BufferMemoryPreference::HostVisible,
        })?;
        device.write_buffer(staging.as_ref(), 0, &magenta)?;
        let mut encoder = device.create_command_encoder()?;
        encoder.copy_buffer_to_texture(staging.as_ref(), 0, texture.as_ref(), 0, (0, 0, 0), (1, 1, 1));
        let cmd = encoder.finish()?;
        device.submit(vec![cmd])?;

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("default_clamp"),
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            anisotropy_clamp: None,
        })?;

        Ok(Self {
            magenta_texture: Arc::from(texture),
            default_sampler: Arc::from(sampler),
        })
    }
}

/// Resolved binding ready to be written into a descriptor set or push-constant buffer.
pub enum ResolvedBinding {
    SampledImage { binding: u32, texture: Arc<dyn Texture>, sampler: Arc<dyn Sampler> },
    PushConstant { offset: u32, bytes: Vec<u8> },
}

/// Walks `map`'s resource table, resolving each entry against `material` (falling back to
/// `defaults` for textures/samplers the material doesn't supply) and `uniforms` for engine-derived
/// values. Entries this function can't resolve (unset scalar/vector material properties) are
/// skipped rather than erroring, matching §4.6's "never un-drawable" contract.
pub fn resolve_bindings(
    map: &MaterialShaderMap,
    material: &Material,
    defaults: &DefaultResources,
    uniform_bytes: impl Fn(ShaderUniformSemantic) -> Option<Vec<u8>>,
) -> Vec<ResolvedBinding> {
    let mut out = Vec::new();
    for (location, semantic) in &map.resource_semantics {
        match semantic {
            ResourceSemantic::Material(material_semantic) => {
                match material.get(*material_semantic) {
                    Some(MaterialValue::Texture { texture, sampler }) => {
                        out.push(ResolvedBinding::SampledImage {
                            binding: location.binding,
                            texture: Arc::clone(texture),
                            sampler: Arc::clone(sampler),
                        });
                    }
                    Some(MaterialValue::Scalar(v)) => {
                        out.push(ResolvedBinding::PushConstant {
                            offset: location.offset,
                            bytes: v.to_ne_bytes().to_vec(),
                        });
                    }
                    Some(MaterialValue::Vector(v)) | Some(MaterialValue::Color(v)) => {
                        out.push(ResolvedBinding::PushConstant {
                            offset: location.offset,
                            bytes: bytemuck::cast_slice(v).to_vec(),
                        });
                    }
                    None => {
                        if matches!(
                            material_semantic,
                            MaterialSemantic::BaseColorTexture | MaterialSemantic::NormalTexture
                        ) {
                            out.push(ResolvedBinding::SampledImage {
                                binding: location.binding,
                                texture: Arc::clone(&defaults.magenta_texture),
                                sampler: Arc::clone(&defaults.default_sampler),
                            });
                        }
                    }
                }
            }
            ResourceSemantic::Uniform(uniform_semantic) => {
                if let Some(bytes) = uniform_bytes(*uniform_semantic) {
                    out.push(ResolvedBinding::PushConstant { offset: location.offset, bytes });
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_base_color_texture_yields_no_binding_without_defaults() {
        let map = MaterialShaderMap::new().bind_resource(
            ShaderBindingLocation { set: 0, binding: 0, offset: 0 },
            ResourceSemantic::Material(MaterialSemantic::Metallic),
        );
        let material = Material::new();
        assert!(material.get(MaterialSemantic::Metallic).is_none());
        assert!(map.resource_semantics.contains_key(&ShaderBindingLocation { set: 0, binding: 0, offset: 0 }));
    }

    #[test]
    fn material_set_and_get_round_trips() {
        let mut material = Material::new();
        material.set(MaterialSemantic::BaseColor, MaterialValue::Color([1.0, 0.0, 0.0, 1.0]));
        match material.get(MaterialSemantic::BaseColor) {
            Some(MaterialValue::Color(c)) => assert_eq!(*c, [1.0, 0.0, 0.0, 1.0]),
            _ => panic!("expected color"),
        }
    }
}
