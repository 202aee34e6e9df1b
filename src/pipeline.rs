use std::num::NonZeroU64;

use glam::Vec3;
use wgpu::include_wgsl;

use crate::{camera::Camera, encoder::SceneEncoder, noise::NoiseImage, texture::Texture};

/// Fixed bind slots shared with `raytrace.wgsl`.
pub mod slot {
    /// Read-only inputs bound by [`super::DispatchPipeline::prepare`].
    pub const INPUT_GROUP: u32 = 0;
    pub const UNIFORMS: u32 = 0;
    pub const SPHERE_DATA: u32 = 1;
    pub const NOISE: u32 = 2;

    /// Write-only target bound by [`super::PreparedDispatch::dispatch`].
    pub const OUTPUT_GROUP: u32 = 1;
    pub const OUTPUT_IMAGE: u32 = 0;
}

/// Kernel workgroup size; one invocation per pixel.
pub const WORKGROUP_SIZE: [u32; 3] = [1, 1, 1];

/// `viewer` block of the kernel uniforms. Each vector is padded to 16 bytes
/// to match WGSL uniform layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ViewerUniform {
    pub position: Vec3,
    _pad0: f32,
    pub forward: Vec3,
    _pad1: f32,
    pub right: Vec3,
    _pad2: f32,
    pub up: Vec3,
    _pad3: f32,
}

/// Everything the kernel reads from its uniform buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelUniforms {
    pub viewer: ViewerUniform,
    pub sphere_count: f32,
    _pad: [f32; 3],
}

impl KernelUniforms {
    pub fn new(camera: &Camera, sphere_count: u32) -> Self {
        let basis = camera.basis();
        Self {
            viewer: ViewerUniform {
                position: camera.position(),
                _pad0: 0.0,
                forward: basis.forward,
                _pad1: 0.0,
                right: basis.right,
                _pad2: 0.0,
                up: basis.up,
                _pad3: 0.0,
            },
            sphere_count: sphere_count as f32,
            _pad: [0.0; 3],
        }
    }
}

/// Workgroup counts of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGrid {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchGrid {
    pub fn for_extent(width: u32, height: u32) -> Self {
        Self {
            x: width.div_ceil(WORKGROUP_SIZE[0]),
            y: height.div_ceil(WORKGROUP_SIZE[1]),
            z: 1,
        }
    }

    pub fn work_items(&self) -> u64 {
        let [sx, sy, sz] = WORKGROUP_SIZE;
        (self.x * sx) as u64 * (self.y * sy) as u64 * (self.z * sz) as u64
    }
}

/// Compute target the kernel writes and the present stage samples.
///
/// There is no public accessor for its view; sampling goes through
/// [`ImageReady`], which only a finished dispatch hands out.
pub struct OutputImage {
    image: Texture,
}

impl OutputImage {
    pub fn allocate(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let image = Texture::float_rgba(
            device,
            width.max(1),
            height.max(1),
            1,
            wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            Some("Output image"),
        );
        Self { image }
    }

    /// Reallocate when the size changed. Returns whether a new image was created.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        if self.width() == width.max(1) && self.height() == height.max(1) {
            return false;
        }
        let stale = std::mem::replace(self, Self::allocate(device, width, height));
        stale.dispose();
        true
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dispose(self) {
        self.image.destroy();
    }
}

pub struct DispatchPipeline {
    pipeline: wgpu::ComputePipeline,
    input_layout: wgpu::BindGroupLayout,
    output_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
}

impl DispatchPipeline {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(include_wgsl!("asset/shader/raytrace.wgsl"));

        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: slot::UNIFORMS,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<KernelUniforms>() as u64
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: slot::SPHERE_DATA,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: slot::NOISE,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    },
                    count: None,
                },
            ],
            label: Some("kernel_input_bind_group_layout"),
        });

        let output_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: slot::OUTPUT_IMAGE,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: Texture::FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            }],
            label: Some("kernel_output_bind_group_layout"),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Ray Tracing Pipeline Layout"),
            bind_group_layouts: &[&input_layout, &output_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Ray Tracing Pipeline"),
            layout: Some(&layout),
            module: &shader,
            entry_point: "main",
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Kernel Uniforms"),
            size: std::mem::size_of::<KernelUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            input_layout,
            output_layout,
            uniform_buffer,
        }
    }

    /// Upload camera uniforms and bind the read-only scene inputs.
    pub fn prepare<'a>(
        &'a self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera: &Camera,
        spheres: &'a SceneEncoder,
        noise: &'a NoiseImage,
    ) -> PreparedDispatch<'a> {
        let uniforms = KernelUniforms::new(camera, spheres.sphere_count());
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let inputs = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.input_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: slot::UNIFORMS,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: slot::SPHERE_DATA,
                    resource: wgpu::BindingResource::TextureView(&spheres.image().view),
                },
                wgpu::BindGroupEntry {
                    binding: slot::NOISE,
                    resource: wgpu::BindingResource::TextureView(&noise.image().view),
                },
            ],
            label: Some("kernel_input_bind_group"),
        });

        PreparedDispatch {
            pipeline: self,
            inputs,
            uniforms,
        }
    }

    pub fn dispose(self) {
        self.uniform_buffer.destroy();
    }
}

/// Inputs are bound; the only thing left to do is [`PreparedDispatch::dispatch`].
pub struct PreparedDispatch<'a> {
    pipeline: &'a DispatchPipeline,
    inputs: wgpu::BindGroup,
    uniforms: KernelUniforms,
}

impl<'a> PreparedDispatch<'a> {
    pub fn uniforms(&self) -> &KernelUniforms {
        &self.uniforms
    }

    /// Record one invocation per pixel of `output` into `encoder`.
    ///
    /// The compute pass is closed before returning. wgpu places the
    /// storage-write to sampled-read barrier on the output at that pass
    /// boundary, so every later pass recorded against the returned
    /// [`ImageReady`] observes the kernel's writes.
    pub fn dispatch<'o>(
        self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        output: &'o OutputImage,
    ) -> ImageReady<'o> {
        let grid = DispatchGrid::for_extent(output.width(), output.height());

        let outputs = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.pipeline.output_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: slot::OUTPUT_IMAGE,
                resource: wgpu::BindingResource::TextureView(&output.image.view),
            }],
            label: Some("kernel_output_bind_group"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Ray Tracing Pass"),
            });
            compute_pass.set_pipeline(&self.pipeline.pipeline);
            compute_pass.set_bind_group(slot::INPUT_GROUP, &self.inputs, &[]);
            compute_pass.set_bind_group(slot::OUTPUT_GROUP, &outputs, &[]);
            compute_pass.dispatch_workgroups(grid.x, grid.y, grid.z);
        }
        // the write binding does not outlive the pass
        drop(outputs);

        tracing::trace!(?grid, "dispatched ray tracing kernel");
        ImageReady {
            image: output,
            grid,
        }
    }
}

/// Output image after the dispatch barrier; safe to sample.
pub struct ImageReady<'o> {
    image: &'o OutputImage,
    grid: DispatchGrid,
}

impl<'o> ImageReady<'o> {
    pub fn view(&self) -> &'o wgpu::TextureView {
        let image: &'o OutputImage = self.image;
        &image.image.view
    }

    pub fn sampler(&self) -> &'o wgpu::Sampler {
        let image: &'o OutputImage = self.image;
        &image.image.sampler
    }

    pub fn grid(&self) -> DispatchGrid {
        self.grid
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<ViewerUniform>(), 64);
        assert_eq!(std::mem::size_of::<KernelUniforms>(), 80);
        assert_eq!(std::mem::offset_of!(KernelUniforms, sphere_count), 64);
    }

    #[test]
    fn uniforms_carry_camera_basis() {
        let camera = Camera::new(Vec3::new(-5.0, 0.0, 0.0));
        let uniforms = KernelUniforms::new(&camera, 32);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&uniforms));

        assert_eq!(&floats[0..3], &[-5.0, 0.0, 0.0]);
        assert_eq!(&floats[4..7], &camera.forward().to_array());
        assert_eq!(&floats[8..11], &camera.right().to_array());
        assert_eq!(&floats[12..15], &camera.up().to_array());
        assert_eq!(floats[16], 32.0);
    }

    #[test]
    fn grid_issues_one_item_per_pixel() {
        let grid = DispatchGrid::for_extent(400, 300);
        assert_eq!(grid, DispatchGrid { x: 400, y: 300, z: 1 });
        assert_eq!(grid.work_items(), 400 * 300);
    }

    #[test]
    fn kernel_noise_layers_match_noise_image() {
        let source = include_str!("asset/shader/raytrace.wgsl");
        let declaration = format!("const NOISE_LAYERS: u32 = {}u;", crate::noise::NOISE_LAYERS);
        assert!(source.contains(&declaration));
        assert!(!source.contains("textureNumLayers"));
    }

    #[test]
    fn kernel_pipeline_builds_on_adapter() {
        let Some((device, _queue)) = crate::test_gpu() else {
            return;
        };
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = DispatchPipeline::new(&device);
        let error = pollster::block_on(device.pop_error_scope());
        assert!(error.is_none(), "{error:?}");
        pipeline.dispose();
    }

    #[test]
    fn output_image_reallocates_on_resize() {
        let Some((device, _queue)) = crate::test_gpu() else {
            return;
        };
        let mut output = OutputImage::allocate(&device, 800, 600);
        assert!(!output.resize(&device, 800, 600));
        assert!(output.resize(&device, 400, 300));
        assert_eq!((output.width(), output.height()), (400, 300));
        output.dispose();
    }
}
