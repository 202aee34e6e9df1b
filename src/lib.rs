pub mod application;
pub mod camera;
pub mod config;
pub mod diagnostics;
pub mod encoder;
pub mod input;
pub mod noise;
pub mod pipeline;
pub mod renderer;
pub mod scene;
pub mod texture;
pub mod util;

/// Headless device for tests; `None` when the machine has no usable adapter.
///
/// Callers return early on `None`, so a skip line names the test location.
#[cfg(test)]
#[track_caller]
pub(crate) fn test_gpu() -> Option<(wgpu::Device, wgpu::Queue)> {
    let caller = std::panic::Location::caller();
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let gpu = pollster::block_on(async {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .ok()
    });
    if gpu.is_none() {
        eprintln!("skipping GPU test at {caller}: no usable adapter");
    }
    gpu
}
