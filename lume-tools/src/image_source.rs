//! Concrete [`TextureSource`] backed by already-decoded RGBA8 images, implementing
//! spec §4.3's "nearest-neighbor, wrapped UV" sampling rule for the voxelizer's
//! material resolver. Decoding (PNG/JPEG/KTX/whatever the importer used) happens
//! upstream of this crate; it only owns the sampling math.

use lume_svo::voxelizer::TextureSource;

/// One decoded RGBA8 image, row-major top-to-bottom.
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

impl Image {
    pub fn sample_nearest_wrapped(&self, uv: [f32; 2]) -> [f32; 4] {
        if self.width == 0 || self.height == 0 {
            return [1.0, 1.0, 1.0, 1.0];
        }
        let u = wrap01(uv[0]);
        let v = wrap01(uv[1]);
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        let offset = ((y * self.width + x) * 4) as usize;
        let px = &self.rgba8[offset..offset + 4];
        [px[0] as f32 / 255.0, px[1] as f32 / 255.0, px[2] as f32 / 255.0, px[3] as f32 / 255.0]
    }
}

fn wrap01(v: f32) -> f32 {
    let w = v.fract();
    if w < 0.0 {
        w + 1.0
    } else {
        w
    }
}

/// A texture source over a fixed set of images, indexed the same way the mesh's
/// materials refer to them (glTF texture index, typically).
#[derive(Default)]
pub struct ImageTextureSource {
    images: Vec<Image>,
}

impl ImageTextureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, image: Image) -> u32 {
        let index = self.images.len() as u32;
        self.images.push(image);
        index
    }
}

impl TextureSource for ImageTextureSource {
    fn sample(&self, texture: u32, uv: [f32; 2]) -> [f32; 4] {
        match self.images.get(texture as usize) {
            Some(image) => image.sample_nearest_wrapped(uv),
            None => [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard() -> Image {
        // 2x2: top-left red, top-right green, bottom-left blue, bottom-right white.
        Image {
            width: 2,
            height: 2,
            rgba8: vec![
                255, 0, 0, 255, //
                0, 255, 0, 255, //
                0, 0, 255, 255, //
                255, 255, 255, 255,
            ],
        }
    }

    #[test]
    fn samples_nearest_texel() {
        let image = checkerboard();
        assert_eq!(image.sample_nearest_wrapped([0.0, 0.0]), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(image.sample_nearest_wrapped([0.9, 0.0]), [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(image.sample_nearest_wrapped([0.0, 0.9]), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn wraps_out_of_range_uv() {
        let image = checkerboard();
        assert_eq!(image.sample_nearest_wrapped([1.1, 0.0]), image.sample_nearest_wrapped([0.1, 0.0]));
        assert_eq!(image.sample_nearest_wrapped([-0.1, 0.0]), image.sample_nearest_wrapped([0.9, 0.0]));
    }

    #[test]
    fn unregistered_texture_index_falls_back_to_white() {
        let source = ImageTextureSource::new();
        assert_eq!(source.sample(0, [0.5, 0.5]), [1.0, 1.0, 1.0, 1.0]);
    }
}
