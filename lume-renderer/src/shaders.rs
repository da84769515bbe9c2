//! WGSL sources for the volume renderer's passes, compiled to SPIR-V at pipeline-creation time.
//!
//! Compiling in-process (rather than shipping pre-built `.spv` blobs) keeps the render passes
//! readable next to the Rust code that wires their bindings, the same tradeoff the triangle demos
//! make.

/// Compiles a WGSL module to SPIR-V bytes for the given entry point and stage.
pub fn compile(source: &str, stage: naga::ShaderStage, entry_point: &str) -> Vec<u8> {
    let module = naga::front::wgsl::parse_str(source).expect("parse wgsl");
    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::default(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .expect("validate wgsl");
    let options = naga::back::spv::Options::default();
    let pipeline_options = naga::back::spv::PipelineOptions {
        shader_stage: stage,
        entry_point: entry_point.to_string(),
    };
    let words = naga::back::spv::write_vec(&module, &info, &options, Some(&pipeline_options))
        .expect("compile to spirv");
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Clears the G-buffer targets before the first raycast layer is dispatched.
pub const CLEAR_COMPUTE: &str = r#"
@group(0) @binding(0) var albedo: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(1) var normal: texture_storage_2d<rgba16float, write>;
@group(0) @binding(2) var position: texture_storage_2d<rgba32float, write>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let coord = vec2<i32>(i32(gid.x), i32(gid.y));
    textureStore(albedo, coord, vec4<f32>(0.0, 0.0, 0.0, 0.0));
    textureStore(normal, coord, vec4<f32>(0.0, 0.0, 0.0, 0.0));
    textureStore(position, coord, vec4<f32>(0.0, 0.0, 0.0, 0.0));
}
"#;

/// Raycasts one LOD layer of the volume array into the G-buffer. `draw_variant` selects between
/// the data layer (opaque voxel raycast) and the visualizer layer (wireframe octree bounds),
/// baked in as a specialization constant so both variants share one compiled module.
///
/// `layer_nodes` is the flattened, depth-first node array described in `lume_svo::volume_array`:
/// each record is 4 packed `u32` words (quantized center, depth, leaf/internal flag, RGBA payload
/// or stride-to-next-sibling). Traversal walks the whole array once per pixel, testing each
/// node's world-space AABB against the pixel's ray; a miss on an internal node skips its entire
/// subtree via its stride instead of visiting every descendant.
pub const RAYCAST_COMPUTE: &str = r#"
struct RaycastParams {
    inverse_view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    layer_origin: vec4<f32>,
    layer_extent: f32,
    layer_index: u32,
    _pad: vec2<f32>,
}

@id(0) override draw_variant: u32 = 0u;

var<push_constant> params: RaycastParams;

@group(0) @binding(0) var<storage, read> layer_nodes: array<u32>;
@group(0) @binding(1) var albedo: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(2) var normal: texture_storage_2d<rgba16float, write>;
@group(0) @binding(3) var position: texture_storage_2d<rgba32float, write>;

const FLAG_HAS_PAYLOAD: u32 = 1u;

fn ray_aabb_enter(origin: vec3<f32>, dir: vec3<f32>, box_min: vec3<f32>, box_max: vec3<f32>) -> f32 {
    let inv_dir = 1.0 / dir;
    let t0 = (box_min - origin) * inv_dir;
    let t1 = (box_max - origin) * inv_dir;
    let tmin = min(t0, t1);
    let tmax = max(t0, t1);
    let t_enter = max(max(tmin.x, tmin.y), tmin.z);
    let t_exit = min(min(tmax.x, tmax.y), tmax.z);
    if (t_exit < max(t_enter, 0.0)) {
        return -1.0;
    }
    return max(t_enter, 0.0);
}

fn box_face_normal(hit_pos: vec3<f32>, center: vec3<f32>, half_extent: f32) -> vec3<f32> {
    let local = (hit_pos - center) / half_extent;
    let a = abs(local);
    if (a.x >= a.y && a.x >= a.z) {
        return vec3<f32>(sign(local.x), 0.0, 0.0);
    } else if (a.y >= a.z) {
        return vec3<f32>(0.0, sign(local.y), 0.0);
    } else {
        return vec3<f32>(0.0, 0.0, sign(local.z));
    }
}

fn unpack_rgba(raw: u32) -> vec4<f32> {
    return vec4<f32>(
        f32(raw & 0xFFu) / 255.0,
        f32((raw >> 8u) & 0xFFu) / 255.0,
        f32((raw >> 16u) & 0xFFu) / 255.0,
        f32((raw >> 24u) & 0xFFu) / 255.0,
    );
}

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let coord = vec2<i32>(i32(gid.x), i32(gid.y));
    if (draw_variant == 1u) {
        // visualizer: tint by layer index so nested LODs are distinguishable on screen.
        let tint = f32(params.layer_index % 4u) / 4.0;
        textureStore(albedo, coord, vec4<f32>(tint, 1.0 - tint, 0.2, 1.0));
        return;
    }

    let node_count = arrayLength(&layer_nodes) / 4u;
    if (node_count == 0u) {
        return;
    }

    let dims = textureDimensions(albedo);
    let ndc_x = (f32(coord.x) + 0.5) / f32(dims.x) * 2.0 - 1.0;
    let ndc_y = 1.0 - (f32(coord.y) + 0.5) / f32(dims.y) * 2.0;
    let far_clip = vec4<f32>(ndc_x, ndc_y, 1.0, 1.0);
    let far_world4 = params.inverse_view_proj * far_clip;
    let far_world = far_world4.xyz / far_world4.w;
    let ray_origin = params.camera_pos.xyz;
    let ray_dir = normalize(far_world - ray_origin);

    var best_t = 3.4e38;
    var best_color = vec4<f32>(0.0);
    var best_normal = vec3<f32>(0.0);
    var best_pos = vec3<f32>(0.0);
    var hit = false;

    var i = 0u;
    loop {
        if (i >= node_count) {
            break;
        }
        let base = i * 4u;
        let w0 = layer_nodes[base];
        let w1 = layer_nodes[base + 1u];
        let w2 = layer_nodes[base + 2u];

        let center_unit = vec3<f32>(
            f32(w0 & 0xFFFFu) / 65535.0,
            f32((w0 >> 16u) & 0xFFFFu) / 65535.0,
            f32(w1 & 0xFFFFu) / 65535.0,
        );
        let depth = (w1 >> 16u) & 0xFFu;
        let flags = (w1 >> 24u) & 0xFFu;
        let is_leaf = (flags & FLAG_HAS_PAYLOAD) != 0u;

        let half_extent_world = (0.5 / f32(1u << depth)) * params.layer_extent;
        let center_world = params.layer_origin.xyz + center_unit * params.layer_extent;
        let box_min = center_world - vec3<f32>(half_extent_world);
        let box_max = center_world + vec3<f32>(half_extent_world);
        let t_enter = ray_aabb_enter(ray_origin, ray_dir, box_min, box_max);

        if (t_enter < 0.0) {
            if (is_leaf) {
                i = i + 1u;
            } else {
                i = i + max(w2, 1u);
            }
            continue;
        }
        if (is_leaf) {
            if (t_enter < best_t) {
                best_t = t_enter;
                best_color = unpack_rgba(w2);
                let hit_pos = ray_origin + ray_dir * t_enter;
                best_normal = box_face_normal(hit_pos, center_world, half_extent_world);
                best_pos = hit_pos;
                hit = true;
            }
        }
        i = i + 1u;
    }

    if (hit) {
        textureStore(albedo, coord, best_color);
        textureStore(normal, coord, vec4<f32>(best_normal, 0.0));
        textureStore(position, coord, vec4<f32>(best_pos, 1.0));
    }
}
"#;

/// Shared fullscreen-triangle vertex stage for the SSAO, blur, and composition passes.
pub const FULLSCREEN_VERTEX: &str = r#"
struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn main(@builtin(vertex_index) index: u32) -> VsOut {
    var uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VsOut;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}
"#;

pub const SSAO_FRAGMENT: &str = r#"
struct SsaoParams {
    inverse_proj: mat4x4<f32>,
    radius: f32,
    bias: f32,
    noise_scale_x: f32,
    noise_scale_y: f32,
}

var<push_constant> params: SsaoParams;

@group(0) @binding(0) var position_tex: texture_2d<f32>;
@group(0) @binding(1) var normal_tex: texture_2d<f32>;
@group(0) @binding(2) var noise_tex: texture_2d<f32>;
@group(0) @binding(3) var kernel_sampler: sampler;
@group(0) @binding(4) var<uniform> kernel: array<vec4<f32>, 64>;

@fragment
fn main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let dims = textureDimensions(position_tex);
    let pixel = vec2<i32>(uv * vec2<f32>(dims));
    let origin = textureLoad(position_tex, pixel, 0).xyz;
    let normal = normalize(textureLoad(normal_tex, pixel, 0).xyz);
    var occlusion = 0.0;
    for (var i = 0u; i < 64u; i = i + 1u) {
        let sample_pos = origin + kernel[i].xyz * params.radius;
        occlusion = occlusion + select(0.0, 1.0, sample_pos.z + params.bias < origin.z);
    }
    let ao = 1.0 - occlusion / 64.0;
    return vec4<f32>(ao, ao, ao, 1.0);
}
"#;

/// Separable blur; `horizontal` selects the axis via a push-constant flag shared by both passes.
pub const BLUR_FRAGMENT: &str = r#"
struct BlurParams {
    texel_size: vec2<f32>,
    horizontal: u32,
    _pad: u32,
}

var<push_constant> params: BlurParams;

@group(0) @binding(0) var ssao_tex: texture_2d<f32>;
@group(0) @binding(1) var ssao_sampler: sampler;

@fragment
fn main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    var sum = 0.0;
    let offset = select(vec2<f32>(0.0, params.texel_size.y), vec2<f32>(params.texel_size.x, 0.0), params.horizontal != 0u);
    for (var i = -2; i <= 2; i = i + 1) {
        sum = sum + textureSample(ssao_tex, ssao_sampler, uv + offset * f32(i)).r;
    }
    let v = sum / 5.0;
    return vec4<f32>(v, v, v, 1.0);
}
"#;

/// Final composition pass; `draw_mode` push constant selects which intermediate buffer to present.
pub const COMPOSITION_FRAGMENT: &str = r#"
struct CompositionParams {
    draw_mode: u32,
    _pad: vec3<u32>,
}

var<push_constant> params: CompositionParams;

@group(0) @binding(0) var albedo_tex: texture_2d<f32>;
@group(0) @binding(1) var ssao_tex: texture_2d<f32>;
@group(0) @binding(2) var color_sampler: sampler;

@fragment
fn main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let albedo = textureSample(albedo_tex, color_sampler, uv);
    let ao = textureSample(ssao_tex, color_sampler, uv).r;
    if (params.draw_mode == 1u) {
        return vec4<f32>(ao, ao, ao, 1.0);
    }
    if (params.draw_mode == 2u || params.draw_mode == 3u) {
        return albedo;
    }
    return vec4<f32>(albedo.rgb * ao, albedo.a);
}
"#;
