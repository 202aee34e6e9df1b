use crate::{scene::Sphere, texture::Texture};

/// Floats per encoded sphere: `(cx, cy, cz, radius)` then `(r, g, b, roughness)`.
pub const FLOATS_PER_SPHERE: usize = 8;
/// Each sphere occupies one row of two RGBA texels.
pub const TEXELS_PER_SPHERE: u32 = 2;
pub const MAX_CAPACITY: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("cannot encode {count} spheres into a buffer with capacity {capacity}")]
    CapacityExceeded { count: usize, capacity: u32 },
    #[error("sphere capacity {0} is outside 1..={max}", max = MAX_CAPACITY)]
    CapacityOutOfRange(u32),
}

/// CPU side of the sphere image: `capacity × 8` floats, row-major by sphere.
#[derive(Debug, Clone)]
pub struct SphereBuffer {
    data: Vec<f32>,
    capacity: u32,
    len: u32,
}

impl SphereBuffer {
    pub fn with_capacity(capacity: u32) -> Result<Self, EncodeError> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(EncodeError::CapacityOutOfRange(capacity));
        }
        Ok(Self {
            data: vec![0.0; capacity as usize * FLOATS_PER_SPHERE],
            capacity,
            len: 0,
        })
    }

    /// Rewrite the whole buffer from `spheres`; rows past the last sphere are zeroed.
    pub fn encode(&mut self, spheres: &[Sphere]) -> Result<(), EncodeError> {
        if spheres.len() > self.capacity as usize {
            return Err(EncodeError::CapacityExceeded {
                count: spheres.len(),
                capacity: self.capacity,
            });
        }

        self.data.fill(0.0);
        for (row, sphere) in self.data.chunks_exact_mut(FLOATS_PER_SPHERE).zip(spheres) {
            row[0..3].copy_from_slice(&sphere.center().to_array());
            row[3] = sphere.radius();
            row[4..7].copy_from_slice(&sphere.color().to_array());
            row[7] = sphere.roughness();
        }
        self.len = spheres.len() as u32;
        Ok(())
    }

    /// The eight encoded floats of sphere `index`, if it is within capacity.
    pub fn sphere(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(FLOATS_PER_SPHERE)?;
        self.data.get(start..start + FLOATS_PER_SPHERE)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

/// Owns the sphere buffer and its GPU-resident structured image.
///
/// Only obtainable through [`SceneEncoder::allocate`], so there is always an
/// image to bind when a dispatch is prepared.
pub struct SceneEncoder {
    buffer: SphereBuffer,
    image: Texture,
}

impl SceneEncoder {
    pub fn allocate(device: &wgpu::Device, capacity: u32) -> Result<Self, EncodeError> {
        let buffer = SphereBuffer::with_capacity(capacity)?;
        let image = Texture::float_rgba(
            device,
            TEXELS_PER_SPHERE,
            capacity,
            1,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            Some("Sphere data"),
        );
        tracing::debug!(capacity, "allocated sphere image");
        Ok(Self { buffer, image })
    }

    /// Encode `spheres` and re-upload the whole buffer.
    pub fn encode(&mut self, queue: &wgpu::Queue, spheres: &[Sphere]) -> Result<(), EncodeError> {
        self.buffer.encode(spheres)?;
        self.image.update_data(queue, self.buffer.as_slice());
        tracing::debug!(count = spheres.len(), "uploaded sphere image");
        Ok(())
    }

    pub fn sphere_count(&self) -> u32 {
        self.buffer.len()
    }

    pub fn capacity(&self) -> u32 {
        self.buffer.capacity()
    }

    pub fn buffer(&self) -> &SphereBuffer {
        &self.buffer
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
    use glam::Vec3;

    use super::*;

    fn sample_sphere() -> Sphere {
        Sphere::new(Vec3::new(1.0, 2.0, 3.0), 4.0, Vec3::new(0.1, 0.2, 0.3), 0.5).unwrap()
    }

    #[test]
    fn encodes_sphere_at_row_offset() {
        let mut buffer = SphereBuffer::with_capacity(32).unwrap();
        let filler = Sphere::new(Vec3::ZERO, 1.0, Vec3::ONE, 0.0).unwrap();
        let mut spheres = vec![filler; 5];
        spheres.push(sample_sphere());

        buffer.encode(&spheres).unwrap();

        let expected = [1.0, 2.0, 3.0, 4.0, 0.1, 0.2, 0.3, 0.5];
        assert_eq!(buffer.sphere(5).unwrap(), &expected);
        assert_eq!(&buffer.as_slice()[8 * 5..8 * 5 + 8], &expected);
        assert_eq!(buffer.len(), 6);
    }

    #[test]
    fn buffer_spans_full_capacity() {
        let mut buffer = SphereBuffer::with_capacity(32).unwrap();
        buffer.encode(&[sample_sphere()]).unwrap();

        assert_eq!(buffer.as_slice().len(), 32 * FLOATS_PER_SPHERE);
        assert!(buffer.sphere(1).unwrap().iter().all(|&v| v == 0.0));
        assert!(buffer.sphere(32).is_none());
    }

    #[test]
    fn rejects_more_spheres_than_capacity() {
        let mut buffer = SphereBuffer::with_capacity(32).unwrap();
        let spheres = vec![sample_sphere(); 40];

        let err = buffer.encode(&spheres).unwrap_err();
        assert_eq!(
            err,
            EncodeError::CapacityExceeded {
                count: 40,
                capacity: 32
            }
        );
        // nothing was written
        assert!(buffer.is_empty());
        assert!(buffer.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn capacity_must_be_in_range() {
        assert_eq!(
            SphereBuffer::with_capacity(0).unwrap_err(),
            EncodeError::CapacityOutOfRange(0)
        );
        assert!(SphereBuffer::with_capacity(MAX_CAPACITY).is_ok());
        assert!(SphereBuffer::with_capacity(MAX_CAPACITY + 1).is_err());
    }

    #[test]
    fn re_encoding_clears_stale_rows() {
        let mut buffer = SphereBuffer::with_capacity(4).unwrap();
        buffer.encode(&[sample_sphere(), sample_sphere()]).unwrap();
        buffer.encode(&[sample_sphere()]).unwrap();

        assert_eq!(buffer.len(), 1);
        assert!(buffer.sphere(1).unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn uploads_structured_image() {
        let Some((device, queue)) = crate::test_gpu() else {
            return;
        };
        let mut encoder = SceneEncoder::allocate(&device, 32).unwrap();
        encoder.encode(&queue, &[sample_sphere()]).unwrap();

        assert_eq!(encoder.image().width(), TEXELS_PER_SPHERE);
        assert_eq!(encoder.image().height(), 32);
        assert_eq!(encoder.sphere_count(), 1);
        assert!(encoder.encode(&queue, &vec![sample_sphere(); 40]).is_err());
        encoder.dispose();
    }
}
