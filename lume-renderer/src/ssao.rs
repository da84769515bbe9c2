//! SSAO kernel and noise texture generation (spec §4.7 init step).
//!
//! The kernel is a fixed hemisphere of sample vectors around +Z, each scaled so that samples
//! bunch closer to the origin (`lerp(0.1, 1, (i/n)^2)`), uploaded once as a uniform buffer and
//! reused every frame. The 4x4 noise texture rotates the kernel per-pixel in the SSAO shader to
//! hide the fixed sample count as banding instead of as a grid.

use lume_rhi::{
    BufferDescriptor, BufferMemoryPreference, BufferUsage, Device, TextureDescriptor,
    TextureDimension, TextureFormat, TextureUsage,
};

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// A simple linear-congruential generator so kernel/noise generation is deterministic across
/// runs without pulling in a `rand` dependency for four lines of sampling.
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Next value in `[0, 1)`.
    fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as f32) / (u32::MAX as f32)
    }
}

/// Builds the 64-sample hemispherical SSAO kernel (spec §4.7) and uploads it as a uniform buffer
/// sized for `kernel_size` `vec4` entries (the fourth component padding to match std140 layout).
pub fn build_ssao_kernel(
    device: &dyn Device,
    kernel_size: usize,
) -> Result<Box<dyn lume_rhi::Buffer>, String> {
    let mut rng = Lcg::new(0x5EED_u64);
    let mut samples = Vec::with_capacity(kernel_size * 4);
    for i in 0..kernel_size {
        let mut x = rng.next_f32() * 2.0 - 1.0;
        let mut y = rng.next_f32() * 2.0 - 1.0;
        let mut z = rng.next_f32();
        let len = (x * x + y * y + z * z).sqrt().max(1e-6);
        x /= len;
        y /= len;
        z /= len;
        let radius_scale = rng.next_f32();
        let scale = lerp(0.1, 1.0, (i as f32 / kernel_size as f32).powi(2));
        x *= radius_scale * scale;
        y *= radius_scale * scale;
        z *= radius_scale * scale;
        samples.extend_from_slice(&[x, y, z, 0.0]);
    }
    let bytes: &[u8] = bytemuck::cast_slice(&samples);
    let buffer = device.create_buffer(&BufferDescriptor {
        label: Some("ssao_kernel"),
        size: bytes.len() as u64,
        usage: BufferUsage::Uniform,
        memory: BufferMemoryPreference::HostVisible,
    })?;
    device.write_buffer(buffer.as_ref(), 0, bytes)?;
    Ok(buffer)
}

/// Builds the 4x4 random-vector noise texture used to rotate the SSAO kernel per-pixel.
pub fn build_ssao_noise_texture(device: &dyn Device) -> Result<Box<dyn lume_rhi::Texture>, String> {
    let mut rng = Lcg::new(0x5EED_u64 ^ 0xC0FFEE);
    let mut pixels = Vec::with_capacity(4 * 4 * 4);
    for _ in 0..16 {
        let x = rng.next_f32() * 2.0 - 1.0;
        let y = rng.next_f32() * 2.0 - 1.0;
        pixels.extend_from_slice(&[x, y, 0.0, 0.0]);
    }
    let texture = device.create_texture(&TextureDescriptor {
        label: Some("ssao_noise"),
        size: (4, 4, 1),
        format: TextureFormat::Rgba32Float,
        usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        dimension: TextureDimension::D2,
        mip_level_count: 1,
    })?;
    let bytes: &[u8] = bytemuck::cast_slice(&pixels);
    let staging = device.create_buffer(&BufferDescriptor {
        label: Some("ssao_noise_staging"),
        size: bytes.len() as u64,
        usage: BufferUsage::CopySrc,
        memory: BufferMemoryPreference::HostVisible,
    })?;
    device.write_buffer(staging.as_ref(), 0, bytes)?;
    let mut encoder = device.create_command_encoder()?;
    encoder.copy_buffer_to_texture(staging.as_ref(), 0, texture.as_ref(), 0, (0, 0, 0), (4, 4, 1));
    let cmd = encoder.finish()?;
    device.submit(vec![cmd])?;
    Ok(texture)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_scale_grows_with_index() {
        let first = lerp(0.1, 1.0, (0.0_f32 / 64.0).powi(2));
        let last = lerp(0.1, 1.0, (63.0_f32 / 64.0).powi(2));
        assert!(first < last);
        assert!((first - 0.1).abs() < 1e-6);
    }

    #[test]
    fn lcg_stays_in_unit_range() {
        let mut rng = Lcg::new(1);
        for _ in 0..1000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
