/// 2D RGBA 32-bit float texture used as either a structured array or a
/// compute target.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    size: wgpu::Extent3d,
}

impl Texture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
    /// Bytes per RGBA32F texel.
    pub const TEXEL_SIZE: u32 = 16;

    /// Create a float texture with `layers` array layers.
    ///
    /// Sampling state is fixed to nearest filtering and repeat wrap so every
    /// backend reads texels identically.
    pub fn float_rgba(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        layers: u32,
        usage: wgpu::TextureUsages,
        label: Option<&str>,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: layers,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage,
            view_formats: &[],
        });

        let dimension = if layers > 1 {
            wgpu::TextureViewDimension::D2Array
        } else {
            wgpu::TextureViewDimension::D2
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label,
            dimension: Some(dimension),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label,
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            size,
        }
    }

    /// Upload the whole texture from tightly packed RGBA floats.
    pub fn update_data(&self, queue: &wgpu::Queue, data: &[f32]) {
        debug_assert_eq!(data.len(), self.texel_count() * 4);
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(data),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(Self::TEXEL_SIZE * self.size.width),
                rows_per_image: Some(self.size.height),
            },
            self.size,
        );
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn texel_count(&self) -> usize {
        (self.size.width * self.size.height * self.size.depth_or_array_layers) as usize
    }

    /// Release the GPU allocation now instead of waiting for the last handle to drop.
    pub fn destroy(self) {
        self.texture.destroy();
    }
}
