//! End-to-end smoke test of the volume renderer: voxelizes a tiny cube into a model, hands it to
//! [`lume_bridge::Engine`], and renders one frame into an offscreen texture.

use lume_bridge::{CameraParams, DrawMode, Engine, EngineConfig, Scene};
use lume_rhi::{Device, TextureDescriptor, TextureDimension, TextureFormat, TextureUsage};
use lume_svo::model::Aabb;
use lume_svo::volume_array::LodParams;
use lume_svo::voxel::Voxel;
use lume_svo::VoxelModel;

fn main() {
    env_logger::init();

    let mut engine = Engine::new(EngineConfig::default()).expect("Engine::new");

    let aabb = Aabb { min: [-1.0, -1.0, -1.0], max: [1.0, 1.0, 1.0] };
    let mut model = VoxelModel::new(4, aabb);
    for x in 0..16u32 {
        for y in 0..16u32 {
            for z in 0..16u32 {
                if (x + y + z) % 3 == 0 {
                    model.octree.insert(x, y, z, Voxel::new(200, 120, 60, 255, 0)).expect("insert");
                }
            }
        }
    }

    let camera = CameraParams {
        view: identity(),
        projection: identity(),
        inverse_view_proj: identity(),
        inverse_proj: identity(),
        camera_pos: [0.0, 0.0, -5.0],
    };
    let lod_params = LodParams {
        view: identity(),
        projection: identity(),
        min_detail: 0,
        max_detail: 4,
        dist_max: 100.0,
        dist_min: 1.0,
    };

    let mut scene = Scene::new();
    scene.add(model, lod_params);

    let extent = (256, 256);
    engine.prepare_scene(&scene, extent).expect("prepare_scene");
    engine.set_camera(camera, DrawMode::Composition);

    let output = engine
        .device()
        .create_texture(&TextureDescriptor {
            label: Some("volume_render_output"),
            size: (extent.0, extent.1, 1),
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::COPY_SRC,
            dimension: TextureDimension::D2,
            mip_level_count: 1,
        })
        .expect("create_texture");

    engine.render(output.as_ref(), false).expect("render");
    engine.device().wait_idle().expect("wait_idle");

    println!("Volume render OK");
}

fn identity() -> [[f32; 4]; 4] {
    let mut m = [[0.0f32; 4]; 4];
    for i in 0..4 {
        m[i][i] = 1.0;
    }
    m
}
