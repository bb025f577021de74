//! wgpu device and queue acquisition

use super::super::EngineInitError;

/// Device, queue and limits of the adapter the GPU engine runs on
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_name: String,
    pub max_texture_dim: u32,
}

impl GpuContext {
    /// Acquire a headless device. Tries a hardware adapter first, then the
    /// software fallback adapter.
    pub fn new() -> Result<Self, EngineInitError> {
        match pollster::block_on(Self::new_async(false)) {
            Ok(ctx) => Ok(ctx),
            Err(e) => {
                tracing::debug!("[GPU] Hardware adapter unavailable ({}), trying software fallback", e);
                pollster::block_on(Self::new_async(true))
            }
        }
    }

    async fn new_async(force_fallback: bool) -> Result<Self, EngineInitError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: force_fallback,
            })
            .await
            .ok_or(EngineInitError::NoAdapter)?;

        let adapter_name = adapter.get_info().name;
        let limits = adapter.limits();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("mixpaint GPU"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits {
                        max_texture_dimension_2d: limits.max_texture_dimension_2d,
                        ..wgpu::Limits::downlevel_defaults()
                    },
                },
                None,
            )
            .await
            .map_err(|e| EngineInitError::RequestDevice(e.to_string()))?;

        tracing::info!("[GPU] Adapter: {}", adapter_name);

        Ok(Self {
            device,
            queue,
            adapter_name,
            max_texture_dim: limits.max_texture_dimension_2d,
        })
    }

    pub fn submit_one(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}
