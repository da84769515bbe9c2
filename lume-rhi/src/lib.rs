//! Lume RHI: Backend-agnostic Rendering Hardware Interface.
//! This crate defines the traits and types required to abstract over Vulkan and Metal.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

pub mod config;
pub mod error;

pub use config::{BlurMode, EngineConfig, LodConfig};
pub use error::{CommandBufferError, DeviceError, ResourceError, ShaderError};

/// Unique identifier for a GPU resource.
pub type ResourceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
    Storage,
    CopySrc,
    CopyDst,
    Indirect,
}

/// Which memory pool a buffer should be allocated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMemoryPreference {
    /// Mappable from the CPU via [`Device::write_buffer`]; slower for the GPU to read.
    HostVisible,
    /// Fastest for the GPU; written to via staging-buffer upload helpers.
    DeviceLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    R8Unorm,
    R8Uint,
    R8Sint,
    Rg8Unorm,
    Rg8Uint,
    Rg8Sint,
    Rgba8Unorm,
    Rgba8Uint,
    Rgba8Sint,
    Bgra8Unorm,
    R16Float,
    R16Uint,
    R16Sint,
    Rg16Float,
    Rg16Uint,
    Rg16Sint,
    Rgba16Float,
    Rgba16Uint,
    Rgba16Sint,
    R32Float,
    R32Uint,
    R32Sint,
    Rg32Float,
    Rg32Uint,
    Rg32Sint,
    Rgba32Float,
    Rgba32Uint,
    Rgba32Sint,
    Rgb10a2Unorm,
    Rg11b10Float,
    Rgb9e5Float,
    Depth16Unorm,
    D32Float,
    Stencil8,
    Depth24UnormStencil8,
    Depth32FloatStencil8,
}

/// Texture dimension / type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureDimension {
    #[default]
    D2,
    D2Array,
    D3,
    Cube,
}

/// The core device trait that all backends must implement.
pub trait Device: Send + Sync + Debug {
    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<Box<dyn Buffer>, String>;
    fn create_texture(&self, desc: &TextureDescriptor) -> Result<Box<dyn Texture>, String>;
    fn create_sampler(&self, desc: &SamplerDescriptor) -> Result<Box<dyn Sampler>, String>;
    fn create_compute_pipeline(&self, desc: &ComputePipelineDescriptor) -> Result<Box<dyn ComputePipeline>, String>;
    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDescriptor) -> Result<Box<dyn GraphicsPipeline>, String>;
    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> Result<Box<dyn DescriptorSetLayout>, String>;
    /// Creates a pool sized for `max_sets` sets with a reasonable default mix of
    /// descriptor types. For explicit control over per-type counts, use
    /// [`Device::create_descriptor_pool_with_descriptor`].
    fn create_descriptor_pool(&self, max_sets: u32) -> Result<Box<dyn DescriptorPool>, String>;
    fn create_descriptor_pool_with_descriptor(
        &self,
        desc: &DescriptorPoolDescriptor,
    ) -> Result<Box<dyn DescriptorPool>, String>;

    /// Create a command encoder for recording GPU commands.
    fn create_command_encoder(&self) -> Result<Box<dyn CommandEncoder>, String>;

    /// Submit command buffers to the default queue. Does not block; use wait_idle or Fence to synchronize.
    fn submit(&self, command_buffers: Vec<Box<dyn CommandBuffer>>) -> Result<(), String>;

    /// Get the main queue (graphics+compute) for submissions.
    fn queue(&self) -> Result<Box<dyn Queue>, String>;

    /// Get the dedicated transfer queue, if the device was created with one.
    fn transfer_queue(&self) -> Option<Box<dyn Queue>>;

    /// Write data into a buffer (CPU to GPU). Buffer must have been created with `BufferMemoryPreference::HostVisible`.
    fn write_buffer(&self, buffer: &dyn Buffer, offset: u64, data: &[u8]) -> Result<(), String>;

    /// Write data into any buffer, synchronously: host-visible buffers are written directly,
    /// device-local buffers go through an internally-allocated staging buffer and a blocking copy.
    fn upload_to_buffer(&self, buffer: &dyn Buffer, offset: u64, data: &[u8]) -> Result<(), String>;

    /// Like [`Device::upload_to_buffer`] but submits the staging copy on the transfer queue when
    /// available and signals `signal_fence` (or an internally-created one, waited on here) instead
    /// of blocking the whole device.
    fn upload_to_buffer_async(
        &self,
        buffer: &dyn Buffer,
        offset: u64,
        data: &[u8],
        signal_fence: Option<&dyn Fence>,
    ) -> Result<(), String>;

    /// Records and submits a buffer-to-buffer copy on the transfer queue (falling back to the
    /// main queue), signaling `signal_fence` without waiting.
    fn submit_buffer_copy(
        &self,
        src: &dyn Buffer,
        src_offset: u64,
        dst: &dyn Buffer,
        dst_offset: u64,
        size: u64,
        signal_fence: Option<&dyn Fence>,
    ) -> Result<(), String>;

    /// Wait for the device to become idle (all submitted work finished).
    fn wait_idle(&self) -> Result<(), String>;

    /// Create a fence for CPU-GPU synchronization.
    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>, String>;
    /// Create a semaphore for GPU-GPU synchronization.
    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>, String>;

    /// Create (or recreate) a swapchain for presentation (only supported when the device was
    /// created with a window/surface). Pass the previous swapchain as `old_swapchain` when
    /// resizing so the backend can reuse it during recreation.
    fn create_swapchain(
        &self,
        extent: (u32, u32),
        old_swapchain: Option<&dyn Swapchain>,
    ) -> Result<Box<dyn Swapchain>, String> {
        let _ = (extent, old_swapchain);
        Err("Swapchain not supported (device created without surface)".to_string())
    }
}

/// Fence: CPU can wait for GPU to complete submitted work.
pub trait Fence: Send + Sync + Debug {
    fn wait(&self, timeout_ns: u64) -> Result<(), String>;
    fn reset(&self) -> Result<(), String>;
    fn as_any(&self) -> &dyn Any;
}

/// Semaphore: GPU-GPU synchronization between queues or passes.
pub trait Semaphore: Send + Sync + Debug {
    fn as_any(&self) -> &dyn Any;
}

/// Queue for submitting work. Supports non-blocking submit with semaphores and fence.
pub trait Queue: Send + Sync + Debug {
    fn submit(
        &self,
        command_buffers: &[&dyn CommandBuffer],
        wait_semaphores: &[&dyn Semaphore],
        signal_semaphores: &[&dyn Semaphore],
        signal_fence: Option<&dyn Fence>,
    ) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor {
    pub label: Option<&'static str>,
    pub size: u64,
    pub usage: BufferUsage,
    pub memory: BufferMemoryPreference,
}

pub trait Buffer: Send + Sync + Debug {
    fn id(&self) -> ResourceId;
    fn size(&self) -> u64;
    /// Whether this buffer can be mapped and written directly from the CPU.
    fn host_visible(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: Option<&'static str>,
    /// (width, height, depth_or_layers). For 2D: depth=1. For 2DArray: depth=array_layers. For 3D: depth=depth.
    pub size: (u32, u32, u32),
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub dimension: TextureDimension,
    pub mip_level_count: u32,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: (1, 1, 1),
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::empty(),
            dimension: TextureDimension::D2,
            mip_level_count: 1,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct TextureUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const TEXTURE_BINDING = 1 << 2;
        const STORAGE_BINDING = 1 << 3;
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

pub trait Texture: Send + Sync + Debug {
    fn id(&self) -> ResourceId;
    fn format(&self) -> TextureFormat;
    fn size(&self) -> (u32, u32, u32);
    fn dimension(&self) -> TextureDimension;
    fn mip_level_count(&self) -> u32;
    fn as_any(&self) -> &dyn Any;
}

/// Nearest/linear sampler bound alongside a sampled or combined-image-sampler texture.
pub trait Sampler: Send + Sync + Debug {
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy)]
pub struct SamplerDescriptor {
    pub label: Option<&'static str>,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
    /// `Some(max)` enables anisotropic filtering clamped to `[1.0, 16.0]`.
    pub anisotropy_clamp: Option<f32>,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            anisotropy_clamp: None,
        }
    }
}

pub trait ComputePipeline: Send + Sync + Debug {
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone, Default)]
pub struct ComputePipelineDescriptor {
    pub label: Option<&'static str>,
    /// SPIR-V bytes.
    pub shader_source: Vec<u8>,
    pub entry_point: String,
    pub layout_bindings: Vec<DescriptorSetLayoutBinding>,
    /// Size in bytes of the push-constant block this pipeline's shader expects, or 0 for none.
    pub push_constant_size: u32,
    /// Specialization constant value baked into the shader at pipeline-creation time (used to
    /// select between the raycast-data and raycast-visualizer variants of one compute shader).
    pub specialization_constant: Option<u32>,
}

/// Graphics pipeline for rasterization (vertex + fragment).
pub trait GraphicsPipeline: Send + Sync + Debug {
    fn as_any(&self) -> &dyn Any;
}

/// Descriptor for creating a graphics pipeline.
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDescriptor {
    pub label: Option<&'static str>,
    pub vertex_shader: ShaderStage,
    pub fragment_shader: Option<ShaderStage>,
    pub vertex_input: VertexInputDescriptor,
    pub primitive_topology: PrimitiveTopology,
    pub rasterization: RasterizationState,
    pub color_targets: Vec<ColorTargetState>,
    pub depth_stencil: Option<DepthStencilState>,
    /// Descriptor set layout bindings for UBO/sampled image etc. Used to create pipeline layout.
    pub layout_bindings: Vec<DescriptorSetLayoutBinding>,
    /// Size in bytes of the push-constant block shared by the vertex and fragment stages, or 0.
    pub push_constant_size: u32,
}

#[derive(Debug, Clone)]
pub struct ShaderStage {
    pub source: Vec<u8>, // SPIR-V bytes
    pub entry_point: String,
}

#[derive(Debug, Clone, Default)]
pub struct VertexInputDescriptor {
    pub attributes: Vec<VertexAttribute>,
    pub bindings: Vec<VertexBinding>,
}

#[derive(Debug, Clone)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct VertexBinding {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInputRate {
    Vertex,
    Instance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexFormat {
    #[default]
    Float32x3,
    Float32x2,
    Float32x4,
    Uint32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

#[derive(Debug, Clone, Default)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    None,
    #[default]
    Back,
    Front,
    FrontAndBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontFace {
    #[default]
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
    Point,
}

#[derive(Debug, Clone)]
pub struct ColorTargetState {
    pub format: TextureFormat,
    pub blend: Option<BlendState>,
}

#[derive(Debug, Clone)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

#[derive(Debug, Clone, Copy)]
pub struct BlendComponent {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOp,
}

#[derive(Debug, Clone, Copy)]
pub enum BlendFactor {
    One,
    Zero,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy)]
pub enum BlendOp {
    Add,
    Subtract,
}

#[derive(Debug, Clone)]
pub struct DepthStencilState {
    pub format: TextureFormat,
    pub depth_write_enabled: bool,
    pub depth_compare: CompareOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Render pass descriptor for begin_render_pass.
#[derive(Debug, Clone)]
pub struct RenderPassDescriptor<'a> {
    pub label: Option<&'static str>,
    pub color_attachments: Vec<ColorAttachment<'a>>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment<'a>>,
}

#[derive(Debug, Clone)]
pub struct ColorAttachment<'a> {
    pub texture: &'a dyn Texture,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_value: Option<ClearColor>,
    /// Layout the texture is already in (e.g. `PresentSrc` for a reused swapchain image).
    /// `None` means the backend should assume `Undefined`.
    pub initial_layout: Option<ImageLayout>,
}

#[derive(Debug, Clone, Copy)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Debug, Clone)]
pub struct DepthStencilAttachment<'a> {
    pub texture: &'a dyn Texture,
    pub depth_load_op: LoadOp,
    pub depth_store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub clear_depth: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    Load,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    DontCare,
}

pub trait CommandEncoder: Debug {
    fn begin_compute_pass(&mut self) -> Box<dyn ComputePass>;
    fn begin_render_pass<'a>(&mut self, desc: RenderPassDescriptor<'a>) -> Result<Box<dyn RenderPass>, String>;
    fn copy_buffer_to_buffer(
        &mut self,
        src: &dyn Buffer,
        src_offset: u64,
        dst: &dyn Buffer,
        dst_offset: u64,
        size: u64,
    );
    fn copy_buffer_to_texture(
        &mut self,
        src: &dyn Buffer,
        src_offset: u64,
        dst: &dyn Texture,
        dst_mip: u32,
        dst_origin: (u32, u32, u32),
        size: (u32, u32, u32),
    );
    /// Insert a pipeline barrier for layout transitions and synchronization.
    fn pipeline_barrier_texture(
        &mut self,
        texture: &dyn Texture,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    );
    /// Insert a pipeline barrier guarding a compute-shader write before a subsequent read
    /// (e.g. a storage buffer a raycast pass just populated for the composition pass).
    /// `size == 0` means "to the end of the buffer".
    fn pipeline_barrier_buffer(&mut self, buffer: &dyn Buffer, offset: u64, size: u64);
    /// Keeps `resource` alive for as long as the command buffer [`finish`](CommandEncoder::finish)
    /// produces: a pooled descriptor set or anything else a recorded command points at must not be
    /// dropped before the GPU has finished executing it.
    fn retain(&mut self, resource: Arc<dyn Any + Send + Sync>);
    fn finish(self: Box<Self>) -> Result<Box<dyn CommandBuffer>, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    TransferDst,
    TransferSrc,
    ShaderReadOnly,
    ColorAttachment,
    DepthStencilAttachment,
    General,
    PresentSrc,
}

/// Render pass for recording draw calls.
pub trait RenderPass: Debug {
    fn set_pipeline(&mut self, pipeline: &dyn GraphicsPipeline);
    /// Bind a descriptor set for the currently bound graphics pipeline (set_index must match layout).
    ///
    /// On some drivers, binding a descriptor set corrupts previously-set push-constant state;
    /// callers must re-push push constants immediately after every `bind_descriptor_set` call.
    fn bind_descriptor_set(&mut self, set_index: u32, set: &dyn DescriptorSet);
    /// Pushes `data` into the pipeline's push-constant block at `offset` bytes, visible to `stages`.
    fn set_push_constants(&mut self, stages: ShaderStages, offset: u32, data: &[u8]);
    fn set_vertex_buffer(&mut self, index: u32, buffer: &dyn Buffer, offset: u64);
    fn set_index_buffer(&mut self, buffer: &dyn Buffer, offset: u64, index_format: IndexFormat);
    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );
    fn draw_indexed_indirect(&mut self, buffer: &dyn Buffer, offset: u64);
    fn end(self: Box<Self>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

pub trait ComputePass: Debug {
    fn set_pipeline(&mut self, pipeline: &dyn ComputePipeline);
    /// See [`RenderPass::bind_descriptor_set`]'s push-constant-corruption note; the same
    /// re-push-after-bind discipline applies here.
    fn bind_descriptor_set(&mut self, set_index: u32, set: &dyn DescriptorSet);
    fn set_push_constants(&mut self, data: &[u8]);
    fn dispatch(&mut self, x: u32, y: u32, z: u32);
    fn dispatch_indirect(&mut self, buffer: &dyn Buffer, offset: u64);
}

/// Descriptor binding type for layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    UniformBuffer,
    StorageBuffer,
    StorageImage,
    SampledImage,
    CombinedImageSampler,
}

/// Descriptor set layout binding.
#[derive(Debug, Clone)]
pub struct DescriptorSetLayoutBinding {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub count: u32,
    pub stages: ShaderStages,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

/// Descriptor set layout.
pub trait DescriptorSetLayout: Send + Sync + Debug {
    fn as_any(&self) -> &dyn Any;
}

/// Descriptor for creating a pool with explicit per-type capacity. An empty `pool_sizes` falls
/// back to a default multiple of `max_sets` per type (see the fence-arbiter-adjacent growth
/// chain in `lume-renderer`, which is the actual caller that cares about exact sizing).
#[derive(Debug, Clone, Default)]
pub struct DescriptorPoolDescriptor {
    pub max_sets: u32,
    pub pool_sizes: Vec<(DescriptorType, u32)>,
}

/// Descriptor pool for allocating sets.
pub trait DescriptorPool: Send + Sync + Debug {
    fn allocate_set(&self, layout: &dyn DescriptorSetLayout) -> Result<Box<dyn DescriptorSet>, String>;
    /// Bulk-reset the pool, invalidating every set it has ever handed out. Called by
    /// [`descriptor_pool_chain`] once a pool's live-set count reaches zero.
    fn reset(&self) -> Result<(), String>;
}

/// Descriptor set for binding resources.
pub trait DescriptorSet: Send + Sync + Debug {
    fn write_buffer(&mut self, binding: u32, buffer: &dyn Buffer, offset: u64, size: u64) -> Result<(), String>;
    fn write_texture(&mut self, binding: u32, texture: &dyn Texture) -> Result<(), String>;
    fn write_sampled_image(&mut self, binding: u32, texture: &dyn Texture, sampler: &dyn Sampler) -> Result<(), String>;
    fn write_buffer_at(
        &mut self,
        binding: u32,
        array_element: u32,
        buffer: &dyn Buffer,
        offset: u64,
        size: u64,
    ) -> Result<(), String>;
    fn write_texture_at(&mut self, binding: u32, array_element: u32, texture: &dyn Texture) -> Result<(), String>;
    fn write_sampled_image_at(
        &mut self,
        binding: u32,
        array_element: u32,
        texture: &dyn Texture,
        sampler: &dyn Sampler,
    ) -> Result<(), String>;
    fn as_any(&self) -> &dyn Any;
}

pub trait CommandBuffer: Send + Sync + Debug {
    fn as_any(&self) -> &dyn Any;
}

/// One swapchain image available for rendering this frame.
pub struct SwapchainFrame<'a> {
    pub image_index: u32,
    pub texture: &'a dyn Texture,
}

/// Swapchain for presenting to a window. Acquire an image, render to it, then present.
pub trait Swapchain: Send + Sync + Debug {
    /// Acquire the next image. Returns (image_index, texture to use as color attachment).
    /// Wait semaphore will be signaled when the image is available.
    fn acquire_next_image(&mut self, wait_semaphore: Option<&dyn Semaphore>) -> Result<SwapchainFrame<'_>, String>;
    /// Present the image. Wait semaphore should be signaled when rendering to that image is done.
    fn present(&self, image_index: u32, wait_semaphore: Option<&dyn Semaphore>) -> Result<(), String>;
    /// Current extent (width, height). May change on resize.
    fn extent(&self) -> (u32, u32);
    fn as_any(&self) -> &dyn Any;
}

pub mod fence_arbiter;

pub mod descriptor_pool_chain;

#[cfg(feature = "vulkan")]
pub mod vulkan;

#[cfg(feature = "vulkan")]
pub use vulkan::VulkanDevice;
