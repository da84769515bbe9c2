//! Volume renderer (C14): raycasts a scene of voxel models through their LOD layers into a
//! small G-buffer, applies SSAO, and composites to an output texture.
//!
//! The per-pass work (clear, one raycast dispatch per visible LOD layer, SSAO, blur) is expressed
//! as a fresh [`RenderGraph`] built every call to [`VolumeRenderer::render`] so the graph's
//! topological ordering covers however many layers this frame's culling left visible. Nodes carry
//! their own texture references and manage their own layout transitions directly (the graph's
//! automatic barrier tracking is for resources it owns; ours persist across frames, so we opt out
//! of it per the "nodes must perform layout transitions themselves" escape hatch `graph` documents).
//! The final composition pass writes straight to the caller's output texture and so runs outside
//! the graph, the same way a swapchain blit would in any graph-based renderer.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lume_rhi::descriptor_pool_chain::DescriptorPoolChain;
use lume_rhi::{
    Buffer, ClearColor, ColorAttachment, ColorTargetState, CommandBuffer, CommandEncoder, ComputePass,
    ComputePipeline, ComputePipelineDescriptor, CullMode, Device, DescriptorSet, DescriptorSetLayout,
    DescriptorSetLayoutBinding, DescriptorType, EngineConfig, GraphicsPipeline,
    GraphicsPipelineDescriptor, LoadOp, PrimitiveTopology, RasterizationState, RenderPass,
    RenderPassDescriptor, Sampler, SamplerDescriptor, ShaderStage, ShaderStages, StoreOp, Texture,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsage, VertexInputDescriptor,
};
use lume_svo::volume_array::{concatenate_layers_with_offsets, LodParams, VolumeArrayBuilder};
use lume_svo::VoxelModel;

use crate::graph::{NodeId, RenderGraph, RenderGraphNode, ResourceHandle, ResourceId};
use crate::shaders;
use crate::ssao;

/// Which intermediate buffer the final composition pass presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    /// Albedo modulated by SSAO; the normal "lit" output.
    Composition,
    /// SSAO term alone, visualized as greyscale.
    Ssao,
    /// Albedo with no occlusion applied.
    Albedo,
    /// Raw raycast output before any post-process (identical to `Albedo` in this pipeline, since
    /// SSAO never overwrites the albedo target; kept distinct to match the four inspector modes).
    Raycast,
}

impl DrawMode {
    fn as_u32(self) -> u32 {
        match self {
            DrawMode::Composition => 0,
            DrawMode::Ssao => 1,
            DrawMode::Albedo => 2,
            DrawMode::Raycast => 3,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CameraParams {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub inverse_view_proj: [[f32; 4]; 4],
    pub inverse_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct RaycastPushConstants {
    inverse_view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    layer_origin: [f32; 4],
    /// World-space side length of the model's cube AABB (assumes a cubic volume).
    layer_extent: f32,
    layer_index: u32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SsaoPushConstants {
    inverse_proj: [[f32; 4]; 4],
    radius: f32,
    bias: f32,
    noise_scale: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurPushConstants {
    texel_size: [f32; 2],
    horizontal: u32,
    _pad: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct CompositionPushConstants {
    draw_mode: u32,
    _pad: [u32; 3],
}

fn storage_image_binding(binding: u32) -> DescriptorSetLayoutBinding {
    DescriptorSetLayoutBinding {
        binding,
        descriptor_type: DescriptorType::StorageImage,
        count: 1,
        stages: ShaderStages::COMPUTE,
    }
}

fn combined_sampler_binding(binding: u32, stages: ShaderStages) -> DescriptorSetLayoutBinding {
    DescriptorSetLayoutBinding { binding, descriptor_type: DescriptorType::CombinedImageSampler, count: 1, stages }
}

struct ComputePipelineSet {
    pipeline: Arc<dyn ComputePipeline>,
    layout: Arc<dyn DescriptorSetLayout>,
    pool_sizes: Vec<(DescriptorType, u32)>,
}

struct GraphicsPipelineSet {
    pipeline: Arc<dyn GraphicsPipeline>,
    layout: Arc<dyn DescriptorSetLayout>,
    pool_sizes: Vec<(DescriptorType, u32)>,
}

struct Pipelines {
    clear: ComputePipelineSet,
    raycast_data: ComputePipelineSet,
    raycast_visualizer: ComputePipelineSet,
    ssao: GraphicsPipelineSet,
    blur: GraphicsPipelineSet,
    composition: GraphicsPipelineSet,
}

/// The G-buffer and SSAO ping-pong targets, reallocated in [`VolumeRenderer::prepare_scene`]
/// whenever `render_scale` or the output extent changes.
struct GBuffer {
    extent: (u32, u32),
    albedo: Arc<dyn Texture>,
    normal: Arc<dyn Texture>,
    position: Arc<dyn Texture>,
    ssao_a: Arc<dyn Texture>,
    ssao_b: Arc<dyn Texture>,
}

impl GBuffer {
    fn allocate(device: &dyn Device, extent: (u32, u32)) -> Result<Self, String> {
        let storage_tex = |format: TextureFormat, label: &'static str| {
            device.create_texture(&TextureDescriptor {
                label: Some(label),
                size: (extent.0, extent.1, 1),
                format,
                usage: TextureUsage::STORAGE_BINDING | TextureUsage::TEXTURE_BINDING,
                dimension: TextureDimension::D2,
                mip_level_count: 1,
            })
        };
        let render_tex = |format: TextureFormat, label: &'static str| {
            device.create_texture(&TextureDescriptor {
                label: Some(label),
                size: (extent.0, extent.1, 1),
                format,
                usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
                dimension: TextureDimension::D2,
                mip_level_count: 1,
            })
        };
        Ok(Self {
            extent,
            albedo: Arc::from(storage_tex(TextureFormat::Rgba8Unorm, "gbuffer_albedo")?),
            normal: Arc::from(storage_tex(TextureFormat::Rgba16Float, "gbuffer_normal")?),
            position: Arc::from(storage_tex(TextureFormat::Rgba32Float, "gbuffer_position")?),
            ssao_a: Arc::from(render_tex(TextureFormat::R32Float, "ssao_a")?),
            ssao_b: Arc::from(render_tex(TextureFormat::R32Float, "ssao_b")?),
        })
    }
}

/// Per-frame camera state shared (read-only, post-construction) with the graph's nodes.
struct FrameState {
    camera: CameraParams,
    draw_mode: DrawMode,
}

pub struct VolumeRenderer {
    device: Arc<dyn Device>,
    config: EngineConfig,
    pipelines: Pipelines,
    descriptor_chain: Arc<DescriptorPoolChain>,
    kernel_buffer: Arc<dyn Buffer>,
    noise_texture: Arc<dyn Texture>,
    sampler: Arc<dyn Sampler>,
    array_builder: VolumeArrayBuilder,
    gbuffer: Option<GBuffer>,
    layer_buffer: Option<Arc<dyn Buffer>>,
    /// `(node_offset, node_count, world_origin, world_extent)` per visible layer, front-to-back.
    layer_ranges: Vec<(u32, u32, [f32; 3], f32)>,
    frame: Arc<Mutex<FrameState>>,
}

impl VolumeRenderer {
    pub fn new(device: Arc<dyn Device>, config: EngineConfig) -> Result<Self, String> {
        let pipelines = Self::build_pipelines(device.as_ref())?;
        let kernel_buffer: Arc<dyn Buffer> =
            Arc::from(ssao::build_ssao_kernel(device.as_ref(), config.ssao_kernel_size)?);
        let noise_texture: Arc<dyn Texture> = Arc::from(ssao::build_ssao_noise_texture(device.as_ref())?);
        let sampler: Arc<dyn Sampler> = Arc::from(device.create_sampler(&SamplerDescriptor::default())?);
        log::info!("volume renderer initialized (ssao_kernel_size={})", config.ssao_kernel_size);
        Ok(Self {
            device,
            config,
            pipelines,
            descriptor_chain: DescriptorPoolChain::new(1),
            kernel_buffer,
            noise_texture,
            sampler,
            array_builder: VolumeArrayBuilder::new(),
            gbuffer: None,
            layer_buffer: None,
            layer_ranges: Vec::new(),
            frame: Arc::new(Mutex::new(FrameState {
                camera: CameraParams {
                    view: identity(),
                    projection: identity(),
                    inverse_view_proj: identity(),
                    inverse_proj: identity(),
                    camera_pos: [0.0, 0.0, 0.0],
                },
                draw_mode: DrawMode::Composition,
            })),
        })
    }

    fn build_pipelines(device: &dyn Device) -> Result<Pipelines, String> {
        let clear_bindings =
            vec![storage_image_binding(0), storage_image_binding(1), storage_image_binding(2)];
        let clear_shader = shaders::compile(shaders::CLEAR_COMPUTE, naga::ShaderStage::Compute, "main");
        let clear_pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("volume_clear"),
            shader_source: clear_shader,
            entry_point: "main".to_string(),
            layout_bindings: clear_bindings.clone(),
            push_constant_size: 0,
            specialization_constant: None,
        })?;
        let clear_layout = device.create_descriptor_set_layout(&clear_bindings)?;

        let raycast_bindings = vec![
            DescriptorSetLayoutBinding {
                binding: 0,
                descriptor_type: DescriptorType::StorageBuffer,
                count: 1,
                stages: ShaderStages::COMPUTE,
            },
            storage_image_binding(1),
            storage_image_binding(2),
            storage_image_binding(3),
        ];
        let raycast_shader = shaders::compile(shaders::RAYCAST_COMPUTE, naga::ShaderStage::Compute, "main");
        let raycast_layout = device.create_descriptor_set_layout(&raycast_bindings)?;
        let raycast_push_size = std::mem::size_of::<RaycastPushConstants>() as u32;
        let raycast_data_pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("volume_raycast_data"),
            shader_source: raycast_shader.clone(),
            entry_point: "main".to_string(),
            layout_bindings: raycast_bindings.clone(),
            push_constant_size: raycast_push_size,
            specialization_constant: Some(0),
        })?;
        let raycast_visualizer_pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("volume_raycast_visualizer"),
            shader_source: raycast_shader,
            entry_point: "main".to_string(),
            layout_bindings: raycast_bindings.clone(),
            push_constant_size: raycast_push_size,
            specialization_constant: Some(1),
        })?;

        let vertex_shader = shaders::compile(shaders::FULLSCREEN_VERTEX, naga::ShaderStage::Vertex, "main");
        let fullscreen_rasterization = RasterizationState { cull_mode: CullMode::None, ..Default::default() };

        let ssao_bindings = vec![
            combined_sampler_binding(0, ShaderStages::FRAGMENT),
            combined_sampler_binding(1, ShaderStages::FRAGMENT),
            combined_sampler_binding(2, ShaderStages::FRAGMENT),
            DescriptorSetLayoutBinding {
                binding: 3,
                descriptor_type: DescriptorType::UniformBuffer,
                count: 1,
                stages: ShaderStages::FRAGMENT,
            },
        ];
        let ssao_fragment = shaders::compile(shaders::SSAO_FRAGMENT, naga::ShaderStage::Fragment, "main");
        let ssao_layout = device.create_descriptor_set_layout(&ssao_bindings)?;
        let ssao_pipeline = device.create_graphics_pipeline(&GraphicsPipelineDescriptor {
            label: Some("ssao"),
            vertex_shader: ShaderStage { source: vertex_shader.clone(), entry_point: "main".to_string() },
            fragment_shader: Some(ShaderStage { source: ssao_fragment, entry_point: "main".to_string() }),
            vertex_input: VertexInputDescriptor::default(),
            primitive_topology: PrimitiveTopology::TriangleList,
            rasterization: fullscreen_rasterization.clone(),
            color_targets: vec![ColorTargetState { format: TextureFormat::R32Float, blend: None }],
            depth_stencil: None,
            layout_bindings: ssao_bindings.clone(),
            push_constant_size: std::mem::size_of::<SsaoPushConstants>() as u32,
        })?;

        let blur_bindings = vec![combined_sampler_binding(0, ShaderStages::FRAGMENT)];
        let blur_fragment = shaders::compile(shaders::BLUR_FRAGMENT, naga::ShaderStage::Fragment, "main");
        let blur_layout = device.create_descriptor_set_layout(&blur_bindings)?;
        let blur_pipeline = device.create_graphics_pipeline(&GraphicsPipelineDescriptor {
            label: Some("ssao_blur"),
            vertex_shader: ShaderStage { source: vertex_shader.clone(), entry_point: "main".to_string() },
            fragment_shader: Some(ShaderStage { source: blur_fragment, entry_point: "main".to_string() }),
            vertex_input: VertexInputDescriptor::default(),
            primitive_topology: PrimitiveTopology::TriangleList,
            rasterization: fullscreen_rasterization.clone(),
            color_targets: vec![ColorTargetState { format: TextureFormat::R32Float, blend: None }],
            depth_stencil: None,
            layout_bindings: blur_bindings.clone(),
            push_constant_size: std::mem::size_of::<BlurPushConstants>() as u32,
        })?;

        let composition_bindings =
            vec![combined_sampler_binding(0, ShaderStages::FRAGMENT), combined_sampler_binding(1, ShaderStages::FRAGMENT)];
        let composition_fragment =
            shaders::compile(shaders::COMPOSITION_FRAGMENT, naga::ShaderStage::Fragment, "main");
        let composition_layout = device.create_descriptor_set_layout(&composition_bindings)?;
        let composition_pipeline = device.create_graphics_pipeline(&GraphicsPipelineDescriptor {
            label: Some("composition"),
            vertex_shader: ShaderStage { source: vertex_shader, entry_point: "main".to_string() },
            fragment_shader: Some(ShaderStage { source: composition_fragment, entry_point: "main".to_string() }),
            vertex_input: VertexInputDescriptor::default(),
            primitive_topology: PrimitiveTopology::TriangleList,
            rasterization: fullscreen_rasterization,
            // Most host applications present to an Rgba8Unorm swapchain; callers targeting a
            // different format need their own composition pipeline variant.
            color_targets: vec![ColorTargetState { format: TextureFormat::Rgba8Unorm, blend: None }],
            depth_stencil: None,
            layout_bindings: composition_bindings.clone(),
            push_constant_size: std::mem::size_of::<CompositionPushConstants>() as u32,
        })?;

        Ok(Pipelines {
            clear: ComputePipelineSet {
                pipeline: Arc::from(clear_pipeline),
                layout: Arc::from(clear_layout),
                pool_sizes: vec![(DescriptorType::StorageImage, 3)],
            },
            raycast_data: ComputePipelineSet {
                pipeline: Arc::from(raycast_data_pipeline),
                layout: Arc::from(raycast_layout),
                pool_sizes: vec![(DescriptorType::StorageBuffer, 1), (DescriptorType::StorageImage, 3)],
            },
            raycast_visualizer: ComputePipelineSet {
                pipeline: Arc::from(raycast_visualizer_pipeline),
                layout: Arc::from(device.create_descriptor_set_layout(&raycast_bindings)?),
                pool_sizes: vec![(DescriptorType::StorageBuffer, 1), (DescriptorType::StorageImage, 3)],
            },
            ssao: GraphicsPipelineSet {
                pipeline: Arc::from(ssao_pipeline),
                layout: Arc::from(ssao_layout),
                pool_sizes: vec![(DescriptorType::CombinedImageSampler, 3), (DescriptorType::UniformBuffer, 1)],
            },
            blur: GraphicsPipelineSet {
                pipeline: Arc::from(blur_pipeline),
                layout: Arc::from(blur_layout),
                pool_sizes: vec![(DescriptorType::CombinedImageSampler, 1)],
            },
            composition: GraphicsPipelineSet {
                pipeline: Arc::from(composition_pipeline),
                layout: Arc::from(composition_layout),
                pool_sizes: vec![(DescriptorType::CombinedImageSampler, 2)],
            },
        })
    }

    /// Rebuilds the G-buffer if `target_extent` (scaled by `render_scale`) changed, runs
    /// frustum/AABB culling via [`VolumeArrayBuilder::build`] for each model, and uploads the
    /// concatenated, front-to-back-sorted LOD layer array for this frame's raycast passes.
    pub fn prepare_scene(
        &mut self,
        models: &[VoxelModel],
        lod_params: &[LodParams],
        target_extent: (u32, u32),
    ) -> Result<(), String> {
        let scaled = (
            ((target_extent.0 as f32) * self.config.render_scale).max(1.0) as u32,
            ((target_extent.1 as f32) * self.config.render_scale).max(1.0) as u32,
        );
        if self.gbuffer.as_ref().map(|g| g.extent) != Some(scaled) {
            self.gbuffer = Some(GBuffer::allocate(self.device.as_ref(), scaled)?);
            log::info!("volume renderer g-buffer reallocated to {}x{}", scaled.0, scaled.1);
        }

        let mut layers = Vec::new();
        let mut culled = 0usize;
        for (model, params) in models.iter().zip(lod_params.iter()) {
            match self.array_builder.build(model, params) {
                Some(layer) => layers.push(layer),
                None => culled += 1,
            }
        }
        log::debug!("volume renderer: {} layers visible, {} culled", layers.len(), culled);

        let origins: Vec<[f32; 3]> = models.iter().map(|m| m.aabb.min).collect();
        let extents: Vec<f32> = models.iter().map(|m| m.aabb.max[0] - m.aabb.min[0]).collect();

        let (nodes, ranges) = concatenate_layers_with_offsets(layers);
        let bytes: &[u8] = bytemuck::cast_slice(&nodes);
        let needs_new_buffer = self.layer_buffer.as_ref().map(|b| b.size()) != Some(bytes.len().max(4) as u64);
        if needs_new_buffer {
            let buffer = self.device.create_buffer(&lume_rhi::BufferDescriptor {
                label: Some("volume_layer_nodes"),
                size: bytes.len().max(4) as u64,
                usage: lume_rhi::BufferUsage::Storage,
                memory: lume_rhi::BufferMemoryPreference::HostVisible,
            })?;
            self.layer_buffer = Some(Arc::from(buffer));
        }
        if let Some(buffer) = &self.layer_buffer {
            if !bytes.is_empty() {
                self.device.write_buffer(buffer.as_ref(), 0, bytes)?;
            }
        }
        self.layer_ranges = ranges
            .into_iter()
            .enumerate()
            .map(|(i, (offset, count))| {
                let origin = origins.get(i).copied().unwrap_or([0.0; 3]);
                let extent = extents.get(i).copied().unwrap_or(1.0);
                (offset, count, origin, extent)
            })
            .collect();
        Ok(())
    }

    pub fn set_camera(&self, camera: CameraParams, draw_mode: DrawMode) {
        let mut frame = self.frame.lock().expect("volume renderer frame state mutex poisoned");
        frame.camera = camera;
        frame.draw_mode = draw_mode;
    }

    /// Runs clear, per-layer raycast, SSAO, and blur through a freshly-built render graph, then
    /// composites directly into `output`. `visualizer` selects the raycast shader variant (the
    /// octree-bounds debug view instead of the opaque voxel raycast).
    pub fn render(
        &self,
        output: &dyn Texture,
        visualizer: bool,
    ) -> Result<Vec<Box<dyn CommandBuffer>>, String> {
        let gbuffer = self.gbuffer.as_ref().ok_or("prepare_scene must run before render")?;
        let mut graph = RenderGraph::new();

        let clear_node = ClearNode {
            pipeline: Arc::clone(&self.pipelines.clear.pipeline),
            layout: Arc::clone(&self.pipelines.clear.layout),
            pool_sizes: self.pipelines.clear.pool_sizes.clone(),
            descriptor_chain: Arc::clone(&self.descriptor_chain),
            albedo: Arc::clone(&gbuffer.albedo),
            normal: Arc::clone(&gbuffer.normal),
            position: Arc::clone(&gbuffer.position),
            extent: gbuffer.extent,
        };
        let clear_id = graph.add_node(Box::new(clear_node), Vec::new());

        let raycast_set = if visualizer { &self.pipelines.raycast_visualizer } else { &self.pipelines.raycast_data };
        let mut last_raycast_id: Option<NodeId> = None;
        let layer_buffer = self.layer_buffer.clone();
        for (index, &(offset, count, origin, extent)) in self.layer_ranges.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let Some(buffer) = layer_buffer.clone() else { continue };
            let node = RaycastNode {
                pipeline: Arc::clone(&raycast_set.pipeline),
                layout: Arc::clone(&raycast_set.layout),
                pool_sizes: raycast_set.pool_sizes.clone(),
                descriptor_chain: Arc::clone(&self.descriptor_chain),
                layer_buffer: buffer,
                node_offset: offset,
                node_count: count,
                layer_origin: origin,
                layer_extent: extent,
                layer_index: index as u32,
                albedo: Arc::clone(&gbuffer.albedo),
                normal: Arc::clone(&gbuffer.normal),
                position: Arc::clone(&gbuffer.position),
                extent: gbuffer.extent,
                frame: Arc::clone(&self.frame),
            };
            let id = graph.add_node(Box::new(node), Vec::new());
            graph.add_edge(clear_id, id);
            if let Some(prev) = last_raycast_id {
                graph.add_edge(prev, id);
            }
            last_raycast_id = Some(id);
        }
        let last_pass_id = last_raycast_id.unwrap_or(clear_id);

        let ssao_node = SsaoNode {
            pipeline: Arc::clone(&self.pipelines.ssao.pipeline),
            layout: Arc::clone(&self.pipelines.ssao.layout),
            pool_sizes: self.pipelines.ssao.pool_sizes.clone(),
            descriptor_chain: Arc::clone(&self.descriptor_chain),
            position: Arc::clone(&gbuffer.position),
            normal: Arc::clone(&gbuffer.normal),
            noise: Arc::clone(&self.noise_texture),
            kernel_buffer: Arc::clone(&self.kernel_buffer),
            sampler: Arc::clone(&self.sampler),
            output: Arc::clone(&gbuffer.ssao_a),
            radius: self.config.ssao_radius,
            bias: self.config.ssao_bias,
            frame: Arc::clone(&self.frame),
        };
        let ssao_id = graph.add_node(Box::new(ssao_node), Vec::new());
        graph.add_edge(last_pass_id, ssao_id);

        let (passes, radius_x, radius_y) = match self.config.blur {
            lume_rhi::BlurMode::Box => (2usize, 1.0f32, 1.0f32),
            lume_rhi::BlurMode::SeparableGaussian { radius_x, radius_y } => (2usize, radius_x, radius_y),
        };
        let texel = (1.0 / gbuffer.extent.0 as f32, 1.0 / gbuffer.extent.1 as f32);
        let mut last_blur_id = ssao_id;
        let mut ping = Arc::clone(&gbuffer.ssao_a);
        let mut pong = Arc::clone(&gbuffer.ssao_b);
        for pass in 0..passes {
            let horizontal = pass % 2 == 0;
            let scale = if horizontal { radius_x } else { radius_y };
            let node = BlurNode {
                pipeline: Arc::clone(&self.pipelines.blur.pipeline),
                layout: Arc::clone(&self.pipelines.blur.layout),
                pool_sizes: self.pipelines.blur.pool_sizes.clone(),
                descriptor_chain: Arc::clone(&self.descriptor_chain),
                input: Arc::clone(&ping),
                output: Arc::clone(&pong),
                sampler: Arc::clone(&self.sampler),
                horizontal,
                texel_size: (texel.0 * scale, texel.1 * scale),
            };
            let id = graph.add_node(Box::new(node), Vec::new());
            graph.add_edge(last_blur_id, id);
            last_blur_id = id;
            std::mem::swap(&mut ping, &mut pong);
        }
        let ssao_final = ping;

        let cmds = graph.execute(&self.device)?;

        let composition_cmds = self.composite(output, &gbuffer.albedo, &ssao_final)?;
        let mut all = cmds;
        all.extend(composition_cmds);
        Ok(all)
    }

    fn composite(
        &self,
        output: &dyn Texture,
        albedo: &Arc<dyn Texture>,
        ssao_final: &Arc<dyn Texture>,
    ) -> Result<Vec<Box<dyn CommandBuffer>>, String> {
        let mut set = self.descriptor_chain.allocate(
            self.device.as_ref(),
            self.pipelines.composition.layout.as_ref(),
            &self.pipelines.composition.pool_sizes,
        )?;
        set.get_mut().write_sampled_image(0, albedo.as_ref(), self.sampler.as_ref())?;
        set.get_mut().write_sampled_image(1, ssao_final.as_ref(), self.sampler.as_ref())?;
        let set = Arc::new(set);

        let draw_mode = self.frame.lock().expect("volume renderer frame state mutex poisoned").draw_mode;
        let push = CompositionPushConstants { draw_mode: draw_mode.as_u32(), _pad: [0; 3] };

        let mut encoder = self.device.create_command_encoder()?;
        let mut pass = encoder.begin_render_pass(RenderPassDescriptor {
            label: Some("composition"),
            color_attachments: vec![ColorAttachment {
                texture: output,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                clear_value: Some(ClearColor { r: 0.0, g: 0.0, b: 0.0, a: 1.0 }),
                initial_layout: None,
            }],
            depth_stencil_attachment: None,
        })?;
        pass.set_pipeline(self.pipelines.composition.pipeline.as_ref());
        pass.bind_descriptor_set(0, set.get());
        pass.set_push_constants(ShaderStages::FRAGMENT, 0, bytemuck::bytes_of(&push));
        pass.draw(3, 1, 0, 0);
        pass.end();
        encoder.retain(set as Arc<dyn Any + Send + Sync>);
        Ok(vec![encoder.finish()?])
    }
}

struct ClearNode {
    pipeline: Arc<dyn ComputePipeline>,
    layout: Arc<dyn DescriptorSetLayout>,
    pool_sizes: Vec<(DescriptorType, u32)>,
    descriptor_chain: Arc<DescriptorPoolChain>,
    albedo: Arc<dyn Texture>,
    normal: Arc<dyn Texture>,
    position: Arc<dyn Texture>,
    extent: (u32, u32),
}

impl RenderGraphNode for ClearNode {
    fn execute(
        &self,
        device: &Arc<dyn Device>,
        _resources: &HashMap<ResourceId, &ResourceHandle>,
    ) -> Vec<Box<dyn CommandBuffer>> {
        let Ok(mut set) =
            self.descriptor_chain.allocate(device.as_ref(), self.layout.as_ref(), &self.pool_sizes)
        else {
            return Vec::new();
        };
        let _ = set.get_mut().write_texture(0, self.albedo.as_ref());
        let _ = set.get_mut().write_texture(1, self.normal.as_ref());
        let _ = set.get_mut().write_texture(2, self.position.as_ref());
        let set = Arc::new(set);

        let Ok(mut encoder) = device.create_command_encoder() else { return Vec::new() };
        let mut pass = encoder.begin_compute_pass();
        pass.set_pipeline(self.pipeline.as_ref());
        pass.bind_descriptor_set(0, set.get());
        let groups = (div_ceil(self.extent.0, 8), div_ceil(self.extent.1, 8), 1);
        pass.dispatch(groups.0, groups.1, groups.2);
        drop(pass);
        encoder.retain(set as Arc<dyn Any + Send + Sync>);
        encoder.finish().map(|cmd| vec![cmd]).unwrap_or_default()
    }
}

struct RaycastNode {
    pipeline: Arc<dyn ComputePipeline>,
    layout: Arc<dyn DescriptorSetLayout>,
    pool_sizes: Vec<(DescriptorType, u32)>,
    descriptor_chain: Arc<DescriptorPoolChain>,
    layer_buffer: Arc<dyn Buffer>,
    node_offset: u32,
    node_count: u32,
    layer_origin: [f32; 3],
    layer_extent: f32,
    layer_index: u32,
    albedo: Arc<dyn Texture>,
    normal: Arc<dyn Texture>,
    position: Arc<dyn Texture>,
    extent: (u32, u32),
    frame: Arc<Mutex<FrameState>>,
}

impl RenderGraphNode for RaycastNode {
    fn execute(
        &self,
        device: &Arc<dyn Device>,
        _resources: &HashMap<ResourceId, &ResourceHandle>,
    ) -> Vec<Box<dyn CommandBuffer>> {
        let Ok(mut set) =
            self.descriptor_chain.allocate(device.as_ref(), self.layout.as_ref(), &self.pool_sizes)
        else {
            return Vec::new();
        };
        let node_size = std::mem::size_of::<lume_svo::VolumeArrayNode>() as u64;
        let _ = set.get_mut().write_buffer(
            0,
            self.layer_buffer.as_ref(),
            self.node_offset as u64 * node_size,
            self.node_count as u64 * node_size,
        );
        let _ = set.get_mut().write_texture(1, self.albedo.as_ref());
        let _ = set.get_mut().write_texture(2, self.normal.as_ref());
        let _ = set.get_mut().write_texture(3, self.position.as_ref());
        let set = Arc::new(set);

        let camera = self.frame.lock().expect("volume renderer frame state mutex poisoned").camera;
        let push = RaycastPushConstants {
            inverse_view_proj: camera.inverse_view_proj,
            camera_pos: [camera.camera_pos[0], camera.camera_pos[1], camera.camera_pos[2], 0.0],
            layer_origin: [self.layer_origin[0], self.layer_origin[1], self.layer_origin[2], 0.0],
            layer_extent: self.layer_extent,
            layer_index: self.layer_index,
            _pad: [0.0, 0.0],
        };

        let Ok(mut encoder) = device.create_command_encoder() else { return Vec::new() };
        let mut pass = encoder.begin_compute_pass();
        pass.set_pipeline(self.pipeline.as_ref());
        pass.bind_descriptor_set(0, set.get());
        pass.set_push_constants(bytemuck::bytes_of(&push));
        let groups = (div_ceil(self.extent.0, 8), div_ceil(self.extent.1, 8), 1);
        pass.dispatch(groups.0, groups.1, groups.2);
        drop(pass);
        encoder.retain(set as Arc<dyn Any + Send + Sync>);
        encoder.finish().map(|cmd| vec![cmd]).unwrap_or_default()
    }
}

struct SsaoNode {
    pipeline: Arc<dyn GraphicsPipeline>,
    layout: Arc<dyn DescriptorSetLayout>,
    pool_sizes: Vec<(DescriptorType, u32)>,
    descriptor_chain: Arc<DescriptorPoolChain>,
    position: Arc<dyn Texture>,
    normal: Arc<dyn Texture>,
    noise: Arc<dyn Texture>,
    kernel_buffer: Arc<dyn Buffer>,
    sampler: Arc<dyn Sampler>,
    output: Arc<dyn Texture>,
    radius: f32,
    bias: f32,
    frame: Arc<Mutex<FrameState>>,
}

impl RenderGraphNode for SsaoNode {
    fn execute(
        &self,
        device: &Arc<dyn Device>,
        _resources: &HashMap<ResourceId, &ResourceHandle>,
    ) -> Vec<Box<dyn CommandBuffer>> {
        let Ok(mut set) =
            self.descriptor_chain.allocate(device.as_ref(), self.layout.as_ref(), &self.pool_sizes)
        else {
            return Vec::new();
        };
        let _ = set.get_mut().write_sampled_image(0, self.position.as_ref(), self.sampler.as_ref());
        let _ = set.get_mut().write_sampled_image(1, self.normal.as_ref(), self.sampler.as_ref());
        let _ = set.get_mut().write_sampled_image(2, self.noise.as_ref(), self.sampler.as_ref());
        let _ = set.get_mut().write_buffer(3, self.kernel_buffer.as_ref(), 0, self.kernel_buffer.size());
        let set = Arc::new(set);

        let camera = self.frame.lock().expect("volume renderer frame state mutex poisoned").camera;
        let size = self.output.size();
        let push = SsaoPushConstants {
            inverse_proj: camera.inverse_proj,
            radius: self.radius,
            bias: self.bias,
            noise_scale: [size.0 as f32 / 4.0, size.1 as f32 / 4.0],
        };

        let Ok(mut encoder) = device.create_command_encoder() else { return Vec::new() };
        let pass_result = encoder.begin_render_pass(RenderPassDescriptor {
            label: Some("ssao"),
            color_attachments: vec![ColorAttachment {
                texture: self.output.as_ref(),
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                clear_value: Some(ClearColor { r: 1.0, g: 1.0, b: 1.0, a: 1.0 }),
                initial_layout: None,
            }],
            depth_stencil_attachment: None,
        });
        let Ok(mut pass) = pass_result else { return Vec::new() };
        pass.set_pipeline(self.pipeline.as_ref());
        pass.bind_descriptor_set(0, set.get());
        pass.set_push_constants(ShaderStages::FRAGMENT, 0, bytemuck::bytes_of(&push));
        pass.draw(3, 1, 0, 0);
        pass.end();
        encoder.retain(set as Arc<dyn Any + Send + Sync>);
        encoder.finish().map(|cmd| vec![cmd]).unwrap_or_default()
    }
}

struct BlurNode {
    pipeline: Arc<dyn GraphicsPipeline>,
    layout: Arc<dyn DescriptorSetLayout>,
    pool_sizes: Vec<(DescriptorType, u32)>,
    descriptor_chain: Arc<DescriptorPoolChain>,
    input: Arc<dyn Texture>,
    output: Arc<dyn Texture>,
    sampler: Arc<dyn Sampler>,
    horizontal: bool,
    texel_size: (f32, f32),
}

impl RenderGraphNode for BlurNode {
    fn execute(
        &self,
        device: &Arc<dyn Device>,
        _resources: &HashMap<ResourceId, &ResourceHandle>,
    ) -> Vec<Box<dyn CommandBuffer>> {
        let Ok(mut set) =
            self.descriptor_chain.allocate(device.as_ref(), self.layout.as_ref(), &self.pool_sizes)
        else {
            return Vec::new();
        };
        let _ = set.get_mut().write_sampled_image(0, self.input.as_ref(), self.sampler.as_ref());
        let set = Arc::new(set);

        let push = BlurPushConstants {
            texel_size: [self.texel_size.0, self.texel_size.1],
            horizontal: self.horizontal as u32,
            _pad: 0,
        };

        let Ok(mut encoder) = device.create_command_encoder() else { return Vec::new() };
        let pass_result = encoder.begin_render_pass(RenderPassDescriptor {
            label: Some("ssao_blur"),
            color_attachments: vec![ColorAttachment {
                texture: self.output.as_ref(),
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                clear_value: Some(ClearColor { r: 1.0, g: 1.0, b: 1.0, a: 1.0 }),
                initial_layout: None,
            }],
            depth_stencil_attachment: None,
        });
        let Ok(mut pass) = pass_result else { return Vec::new() };
        pass.set_pipeline(self.pipeline.as_ref());
        pass.bind_descriptor_set(0, set.get());
        pass.set_push_constants(ShaderStages::FRAGMENT, 0, bytemuck::bytes_of(&push));
        pass.draw(3, 1, 0, 0);
        pass.end();
        encoder.retain(set as Arc<dyn Any + Send + Sync>);
        encoder.finish().map(|cmd| vec![cmd]).unwrap_or_default()
    }
}

fn div_ceil(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
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

    #[test]
    fn draw_mode_discriminants_are_distinct() {
        let modes = [DrawMode::Composition, DrawMode::Ssao, DrawMode::Albedo, DrawMode::Raycast];
        let values: Vec<u32> = modes.iter().map(|m| m.as_u32()).collect();
        let mut sorted = values.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), values.len());
    }

    #[test]
    fn div_ceil_rounds_up() {
        assert_eq!(div_ceil(17, 8), 3);
        assert_eq!(div_ceil(16, 8), 2);
    }
}
