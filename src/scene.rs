use std::ops::Range;

use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    camera::{Camera, CameraController},
    config::TracerConfig,
    encoder::{EncodeError, SceneEncoder},
    input::FrameInput,
    noise::NoiseImage,
    pipeline::{DispatchPipeline, ImageReady, OutputImage},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SphereError {
    #[error("sphere radius must be positive, got {0}")]
    Radius(f32),
    #[error("sphere color components must be within [0, 1], got {0}")]
    Color(Vec3),
    #[error("sphere roughness must be within [0, 1], got {0}")]
    Roughness(f32),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Sphere(#[from] SphereError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("sphere index {index} is out of range for {count} spheres")]
    SphereIndex { index: usize, count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    color: Vec3,
    roughness: f32,
}

impl Sphere {
    pub fn new(
        center: Vec3,
        radius: f32,
        color: Vec3,
        roughness: f32,
    ) -> Result<Self, SphereError> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(SphereError::Radius(radius));
        }
        if !color.cmpge(Vec3::ZERO).all() || !color.cmple(Vec3::ONE).all() {
            return Err(SphereError::Color(color));
        }
        if !(0.0..=1.0).contains(&roughness) {
            return Err(SphereError::Roughness(roughness));
        }
        Ok(Self {
            center,
            radius,
            color,
            roughness,
        })
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn roughness(&self) -> f32 {
        self.roughness
    }
}

const CENTER_X: Range<f32> = 3.0..10.0;
const CENTER_YZ: Range<f32> = -5.0..5.0;
const RADIUS: Range<f32> = 0.4..1.5;
const COLOR: Range<f32> = 0.3..1.0;
const ROUGHNESS: Range<f32> = 0.1..0.9;

/// CPU-side scene: the camera and the sphere set.
#[derive(Debug, Clone)]
pub struct SceneDescription {
    camera: Camera,
    spheres: Vec<Sphere>,
}

impl SceneDescription {
    pub const CAMERA_START: Vec3 = Vec3::new(-5.0, 0.0, 0.0);

    pub fn new(camera: Camera, spheres: Vec<Sphere>) -> Self {
        Self { camera, spheres }
    }

    /// Random spheres in front of a camera looking down +X.
    pub fn generate<R: Rng>(rng: &mut R, config: &TracerConfig) -> Result<Self, SphereError> {
        let spheres = (0..config.sphere_count)
            .map(|_| random_sphere(rng))
            .collect::<Result<Vec<_>, _>>()?;
        let camera = Camera::new(Self::CAMERA_START)
            .with_speed(config.speed)
            .with_policy(config.movement);
        Ok(Self::new(camera, spheres))
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }
}

fn random_sphere<R: Rng>(rng: &mut R) -> Result<Sphere, SphereError> {
    let center = Vec3::new(
        rng.gen_range(CENTER_X),
        rng.gen_range(CENTER_YZ),
        rng.gen_range(CENTER_YZ),
    );
    let radius = rng.gen_range(RADIUS);
    let color = Vec3::new(
        rng.gen_range(COLOR),
        rng.gen_range(COLOR),
        rng.gen_range(COLOR),
    );
    let roughness = rng.gen_range(ROUGHNESS);
    Sphere::new(center, radius, color, roughness)
}

/// One rendering session: the scene description plus the GPU resources that
/// turn it into an image every frame.
///
/// A `Scene` only exists once its spheres are encoded and every image is
/// allocated; [`Scene::dispose`] consumes it.
pub struct Scene {
    description: SceneDescription,
    controller: CameraController,
    encoder: SceneEncoder,
    noise: NoiseImage,
    output: OutputImage,
    pipeline: DispatchPipeline,
    dirty: bool,
}

impl Scene {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &TracerConfig,
    ) -> Result<Self, SceneError> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let description = SceneDescription::generate(&mut rng, config)?;
        tracing::info!(
            seed = config.seed,
            spheres = description.spheres().len(),
            "generated scene"
        );
        Self::with_description(device, queue, config, description, &mut rng)
    }

    pub fn with_description<R: Rng>(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &TracerConfig,
        description: SceneDescription,
        rng: &mut R,
    ) -> Result<Self, SceneError> {
        let mut encoder = SceneEncoder::allocate(device, config.capacity)?;
        encoder.encode(queue, description.spheres())?;

        let noise = NoiseImage::generate(device, queue, rng);
        let output = OutputImage::allocate(device, config.width, config.height);
        let pipeline = DispatchPipeline::new(device);

        tracing::info!(
            capacity = config.capacity,
            width = output.width(),
            height = output.height(),
            "scene ready"
        );
        Ok(Self {
            description,
            controller: CameraController::new(config.sensitivity),
            encoder,
            noise,
            output,
            pipeline,
            dirty: false,
        })
    }

    pub fn camera(&self) -> &Camera {
        self.description.camera()
    }

    pub fn spheres(&self) -> &[Sphere] {
        self.description.spheres()
    }

    pub fn encoder(&self) -> &SceneEncoder {
        &self.encoder
    }

    pub fn output_size(&self) -> (u32, u32) {
        (self.output.width(), self.output.height())
    }

    /// Returns whether the camera orientation changed.
    pub fn react_to_input(&mut self, input: &FrameInput, delta_time: f32) -> bool {
        self.controller.apply(self.description.camera_mut(), input, delta_time)
    }

    /// Reallocate the output image; the next dispatch covers the new size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.output.resize(device, width, height) {
            tracing::debug!(width, height, "reallocated output image");
        }
    }

    /// Replace one sphere; it is re-encoded before the next dispatch.
    pub fn replace_sphere(&mut self, index: usize, sphere: Sphere) -> Result<(), SceneError> {
        let count = self.description.spheres.len();
        let slot = self
            .description
            .spheres
            .get_mut(index)
            .ok_or(SceneError::SphereIndex { index, count })?;
        *slot = sphere;
        self.dirty = true;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record this frame's ray tracing dispatch into `encoder`.
    pub fn render<'s>(
        &'s mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<ImageReady<'s>, EncodeError> {
        if self.dirty {
            self.encoder.encode(queue, self.description.spheres())?;
            self.dirty = false;
        }

        let prepared = self.pipeline.prepare(
            device,
            queue,
            self.description.camera(),
            &self.encoder,
            &self.noise,
        );
        Ok(prepared.dispatch(device, encoder, &self.output))
    }

    /// End the session and release every GPU resource.
    pub fn dispose(self) {
        self.encoder.dispose();
        self.noise.dispose();
        self.output.dispose();
        self.pipeline.dispose();
        tracing::info!("scene disposed");
    }
}
