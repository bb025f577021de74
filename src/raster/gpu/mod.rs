//! GPU raster engine
//!
//! Surfaces are `Rgba8Unorm` textures. A dab is one compute dispatch over the
//! clipped dab area (current → target), followed by a texture copy of the
//! same area back into the old current texture, then the roles swap. Falloff
//! is `1 - smoothstep(0, r, d)`. Texture origin is top-left, so presentation
//! needs no flip.

mod context;
mod shaders;

pub use context::GpuContext;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{
    clamp_mix_strength, validate_dimensions, Backend, Dab, DabRegion, EngineInitError,
    PresentationBuffer, RasterEngine, DEFAULT_MIX_STRENGTH,
};
use crate::brush::Stamp;
use crate::color::Color;

const WORKGROUP_SIZE: u32 = 8;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct DabParams {
    color: [f32; 4],
    center_radius: [f32; 4],
    region: [i32; 4],
    stamp: [i32; 4],
}

struct DabPipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl DabPipeline {
    fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("dab_compute_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::DAB_SHADER.into()),
        });

        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("dab_bgl"),
            entries: &[
                texture_entry(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(3),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("dab_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("dab_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "cs_dab",
            compilation_options: Default::default(),
        });

        Self {
            pipeline,
            bind_group_layout,
        }
    }
}

pub struct GpuRasterEngine {
    ctx: GpuContext,
    dab_pipeline: DabPipeline,
    surfaces: [wgpu::Texture; 2],
    current: usize,
    width: u32,
    height: u32,
    mix_strength: f32,
    /// Last uploaded stamp, reused while consecutive dabs share it
    stamp_cache: Option<(Stamp, wgpu::Texture)>,
    staging: Option<(wgpu::Buffer, u64)>,
}

impl GpuRasterEngine {
    pub fn new(width: u32, height: u32) -> Result<Self, EngineInitError> {
        let ctx = GpuContext::new()?;
        validate_dimensions(width, height, ctx.max_texture_dim)?;

        let dab_pipeline = DabPipeline::new(&ctx.device);
        let surfaces = [
            create_surface(&ctx.device, width, height, "surface_front"),
            create_surface(&ctx.device, width, height, "surface_back"),
        ];

        Ok(Self {
            ctx,
            dab_pipeline,
            surfaces,
            current: 0,
            width,
            height,
            mix_strength: DEFAULT_MIX_STRENGTH,
            stamp_cache: None,
            staging: None,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.ctx.adapter_name
    }

    fn upload_surface(&self, index: usize, pixels: &[u8]) {
        self.ctx.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.surfaces[index],
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn stamp_view(&mut self, stamp: &Stamp) -> wgpu::TextureView {
        if let Some((cached, texture)) = &self.stamp_cache {
            if cached == stamp {
                return texture.create_view(&wgpu::TextureViewDescriptor::default());
            }
        }

        let side = stamp.side();
        let extent = wgpu::Extent3d {
            width: side,
            height: side,
            depth_or_array_layers: 1,
        };
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("dab_stamp"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.ctx.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            stamp.alpha(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(side),
                rows_per_image: Some(side),
            },
            extent,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.stamp_cache = Some((stamp.clone(), texture));
        view
    }

    /// Read the current surface back as tightly packed RGBA rows
    fn readback_current(&mut self) -> Option<Vec<u8>> {
        let device = &self.ctx.device;
        let bytes_per_row = aligned_bytes_per_row(self.width);
        let buffer_size = (bytes_per_row * self.height) as u64;

        let reuse = matches!(&self.staging, Some((_, size)) if *size >= buffer_size);
        if !reuse {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("readback_staging"),
                size: buffer_size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.staging = Some((buffer, buffer_size));
        }
        let (staging, _) = self.staging.as_ref()?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.surfaces[self.current],
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.submit_one(encoder);

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("[GPU] Readback map failed: {:?}", e);
                return None;
            }
            Err(e) => {
                tracing::error!("[GPU] Readback channel closed: {:?}", e);
                return None;
            }
        }

        let mapped = slice.get_mapped_range();
        let row = (self.width * 4) as usize;
        let mut pixels = Vec::with_capacity(row * self.height as usize);
        for y in 0..self.height as usize {
            let start = y * bytes_per_row as usize;
            pixels.extend_from_slice(&mapped[start..start + row]);
        }
        drop(mapped);
        staging.unmap();

        Some(pixels)
    }
}

impl RasterEngine for GpuRasterEngine {
    fn backend(&self) -> Backend {
        Backend::Gpu
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, base: Color) {
        let filled = PresentationBuffer::filled(self.width, self.height, base);
        self.upload_surface(0, filled.pixels());
        self.upload_surface(1, filled.pixels());
    }

    fn deposit_dab(&mut self, dab: &Dab, stamp: &Stamp) {
        let Some(region) = DabRegion::new(dab, self.width, self.height) else {
            return;
        };

        let params = DabParams {
            color: [dab.color.r, dab.color.g, dab.color.b, 1.0],
            center_radius: [dab.x, dab.y, dab.diameter / 2.0, self.mix_strength],
            region: [
                region.x0 as i32,
                region.y0 as i32,
                region.x1 as i32,
                region.y1 as i32,
            ],
            stamp: [
                region.origin_x as i32,
                region.origin_y as i32,
                region.span as i32,
                stamp.side() as i32,
            ],
        };

        let stamp_view = self.stamp_view(stamp);

        let device = &self.ctx.device;
        let current = &self.surfaces[self.current];
        let target = &self.surfaces[1 - self.current];

        let params_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("dab_params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let current_view = current.create_view(&wgpu::TextureViewDescriptor::default());
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("dab_bg"),
            layout: &self.dab_pipeline.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&current_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&target_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&stamp_view),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("dab_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("dab_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.dab_pipeline.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                region.width().div_ceil(WORKGROUP_SIZE),
                region.height().div_ceil(WORKGROUP_SIZE),
                1,
            );
        }

        // Sync the outgoing current surface over the dab area
        let origin = wgpu::Origin3d {
            x: region.x0,
            y: region.y0,
            z: 0,
        };
        encoder.copy_texture_to_texture(
            wgpu::ImageCopyTexture {
                texture: target,
                mip_level: 0,
                origin,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyTexture {
                texture: current,
                mip_level: 0,
                origin,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: region.width(),
                height: region.height(),
                depth_or_array_layers: 1,
            },
        );
        self.ctx.submit_one(encoder);

        self.current = 1 - self.current;
    }

    fn present_to(&mut self, target: &mut PresentationBuffer) {
        match self.readback_current() {
            Some(pixels) => target.copy_overlap_from(&pixels, self.width, self.height),
            None => tracing::warn!("[GPU] Present skipped, readback failed"),
        }
    }

    fn ingest_from(&mut self, source: &PresentationBuffer) {
        let mut staged = PresentationBuffer::new(self.width, self.height);
        if source.width() < self.width || source.height() < self.height {
            if let Some(pixels) = self.readback_current() {
                staged.copy_overlap_from(&pixels, self.width, self.height);
            }
        }
        staged.copy_overlap_from(source.pixels(), source.width(), source.height());
        self.upload_surface(0, staged.pixels());
        self.upload_surface(1, staged.pixels());
    }

    fn set_mix_strength(&mut self, strength: f32) {
        self.mix_strength = clamp_mix_strength(strength);
    }

    fn mix_strength(&self) -> f32 {
        self.mix_strength
    }
}

fn create_surface(device: &wgpu::Device, width: u32, height: u32, label: &str) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}
