use rand::Rng;

use crate::texture::Texture;

/// Side of the square noise tile; the kernel repeats it across the output.
pub const NOISE_SIZE: u32 = 256;
/// Random vectors per pixel.
pub const NOISE_LAYERS: u32 = 4;
const MAX_RADIUS: f32 = 0.99;

/// Random points inside the ball of radius [`MAX_RADIUS`], one RGBA
/// texel (`w = 0`) for each of `width × height × NOISE_LAYERS` entries.
pub fn noise_samples<R: Rng>(rng: &mut R, width: u32, height: u32) -> Vec<f32> {
    let count = (width * height * NOISE_LAYERS) as usize;
    let mut data = Vec::with_capacity(count * 4);
    for _ in 0..count {
        let radius = rng.gen_range(0.0..MAX_RADIUS);
        let theta = rng.gen_range(0.0..std::f32::consts::TAU);
        let phi = rng.gen_range(-std::f32::consts::FRAC_PI_2..std::f32::consts::FRAC_PI_2);
        let (sin_theta, cos_theta) = theta.sin_cos();
        let (sin_phi, cos_phi) = phi.sin_cos();
        data.extend_from_slice(&[
            radius * cos_theta * cos_phi,
            radius * sin_theta * cos_phi,
            radius * sin_phi,
            0.0,
        ]);
    }
    data
}

/// Per-pixel jitter vectors read by the kernel for rough reflections.
pub struct NoiseImage {
    image: Texture,
}

impl NoiseImage {
    pub fn generate<R: Rng>(device: &wgpu::Device, queue: &wgpu::Queue, rng: &mut R) -> Self {
        let image = Texture::float_rgba(
            device,
            NOISE_SIZE,
            NOISE_SIZE,
            NOISE_LAYERS,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            Some("Noise"),
        );
        image.update_data(queue, &noise_samples(rng, NOISE_SIZE, NOISE_SIZE));
        Self { image }
    }

    pub(crate) fn image(&self) -> &Texture {
        &self.image
    }

    pub fn dispose(self) {
        self.image.destroy();
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn samples_stay_inside_unit_ball() {
        let mut rng = StdRng::seed_from_u64(7);
        let data = noise_samples(&mut rng, 8, 4);

        assert_eq!(data.len(), (8 * 4 * NOISE_LAYERS * 4) as usize);
        for texel in data.chunks_exact(4) {
            let length = glam::Vec3::from_slice(texel).length();
            assert!(length < 1.0, "{texel:?}");
            assert_eq!(texel[3], 0.0);
        }
    }

    #[test]
    fn same_seed_gives_same_noise() {
        let a = noise_samples(&mut StdRng::seed_from_u64(42), 4, 4);
        let b = noise_samples(&mut StdRng::seed_from_u64(42), 4, 4);
        assert_eq!(a, b);
    }
}
