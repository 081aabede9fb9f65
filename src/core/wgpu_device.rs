use std::path::Path;

use half::f16;

use super::capture::{depad_rows, write_png};
use super::gpu_context::GpuContext;
use super::kernel::{
    workgroup_count, KernelBindings, KernelParams, KernelSlot, KERNEL_ENTRY_POINT, PARAMS_BINDING,
    RESULT_BINDING, SKYBOX_BINDING, SKYBOX_SAMPLER_BINDING,
};
use crate::config::TracerConfig;
use crate::error::{Result, TracerError};
use crate::traits::{BufferDevice, RenderDevice, TargetDevice};

/// Format of the working and converged targets
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

const TARGET_BYTES_PER_PIXEL: u32 = 8;

/// Bound in place of scene buffers that are absent this frame
const PLACEHOLDER_SIZE: u64 = 128;

/// Render target texture plus its default view
pub struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// wgpu implementation of the tracer device
///
/// Owns the tracing kernel pipeline, the accumulation blend pipeline and the
/// skybox bindings. Scene buffers and render targets are created on request
/// and handed out by value.
pub struct WgpuDevice {
    gpu: GpuContext,
    kernel_pipeline: wgpu::ComputePipeline,
    kernel_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    placeholder: wgpu::Buffer,
    skybox_view: wgpu::TextureView,
    skybox_sampler: wgpu::Sampler,
    blend_pipeline: wgpu::RenderPipeline,
    blend_layout: wgpu::BindGroupLayout,
}

impl WgpuDevice {
    pub fn new(gpu: GpuContext, config: &TracerConfig) -> Result<Self> {
        let device = gpu.device();

        let (kernel_pipeline, kernel_layout) = Self::create_kernel_pipeline(device, &config.kernel_path)?;

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Kernel Params Buffer"),
            size: std::mem::size_of::<KernelParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let placeholder = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Placeholder Scene Buffer"),
            size: PLACEHOLDER_SIZE,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let skybox_view = Self::create_skybox(&gpu, config.skybox_path.as_deref())?;
        let skybox_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Skybox Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let (blend_pipeline, blend_layout) = Self::create_blend_pipeline(device);

        log::info!("Tracer device ready, kernel {:?}", config.kernel_path);

        Ok(Self {
            gpu,
            kernel_pipeline,
            kernel_layout,
            params_buffer,
            placeholder,
            skybox_view,
            skybox_sampler,
            blend_pipeline,
            blend_layout,
        })
    }

    fn create_kernel_pipeline(
        device: &wgpu::Device,
        kernel_path: &Path,
    ) -> Result<(wgpu::ComputePipeline, wgpu::BindGroupLayout)> {
        if !kernel_path.exists() {
            return Err(TracerError::missing("kernel source", kernel_path));
        }
        let source = std::fs::read_to_string(kernel_path)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Path Trace Kernel"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let storage_buffer = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let mut entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: PARAMS_BINDING,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: RESULT_BINDING,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: TARGET_FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: SKYBOX_BINDING,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: SKYBOX_SAMPLER_BINDING,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        entries.extend(KernelSlot::ALL.iter().map(|slot| storage_buffer(slot.binding())));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Kernel Bind Group Layout"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Kernel Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Kernel Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(KERNEL_ENTRY_POINT),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(TracerError::Gpu(format!(
                "Kernel {:?} failed validation: {}",
                kernel_path, error
            )));
        }

        Ok((pipeline, bind_group_layout))
    }

    /// Upload the skybox image, or a single mid-grey texel when none is configured
    fn create_skybox(gpu: &GpuContext, path: Option<&Path>) -> Result<wgpu::TextureView> {
        let (pixels, width, height) = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(TracerError::missing("skybox", path));
                }
                let image = image::open(path)?.to_rgba8();
                let (width, height) = image.dimensions();
                log::info!("Loaded skybox {:?} ({}x{})", path, width, height);
                (image.into_raw(), width, height)
            }
            None => (vec![128, 128, 128, 255], 1, 1),
        };

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("Skybox Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue().write_texture(
            texture.as_image_copy(),
            &pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        Ok(texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    /// Fullscreen pass computing `dst * (1 - w) + src * w` through the blend constant
    fn create_blend_pipeline(device: &wgpu::Device) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Accumulate Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/accumulate.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Accumulate Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Accumulate Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let running_average = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::Constant,
            dst_factor: wgpu::BlendFactor::OneMinusConstant,
            operation: wgpu::BlendOperation::Add,
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Accumulate Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: Some(wgpu::BlendState {
                        color: running_average,
                        alpha: running_average,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        (pipeline, bind_group_layout)
    }
}

impl BufferDevice for WgpuDevice {
    type Buffer = wgpu::Buffer;

    fn create_buffer(&self, label: &str, size: u64) -> wgpu::Buffer {
        self.gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, data: &[u8]) {
        self.gpu.queue().write_buffer(buffer, 0, data);
    }

    fn release_buffer(&self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }
}

impl TargetDevice for WgpuDevice {
    type Target = RenderTarget;

    fn create_target(&self, label: &str, width: u32, height: u32) -> RenderTarget {
        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        RenderTarget {
            texture,
            view,
            width,
            height,
        }
    }

    fn release_target(&self, target: RenderTarget) {
        target.texture.destroy();
    }

    fn blend(&self, source: &RenderTarget, destination: &RenderTarget, weight: f32) {
        let device = self.gpu.device();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Accumulate Bind Group"),
            layout: &self.blend_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&source.view),
            }],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Accumulate Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Accumulate Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &destination.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let w = weight as f64;
            render_pass.set_pipeline(&self.blend_pipeline);
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.set_blend_constant(wgpu::Color { r: w, g: w, b: w, a: w });
            render_pass.draw(0..3, 0..1); // Fullscreen triangle
        }

        self.gpu.queue().submit(Some(encoder.finish()));
    }
}

impl RenderDevice for WgpuDevice {
    fn dispatch(
        &self,
        params: &KernelParams,
        bindings: &KernelBindings<'_, wgpu::Buffer>,
        output: &RenderTarget,
    ) -> Result<()> {
        let device = self.gpu.device();
        self.gpu
            .queue()
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: PARAMS_BINDING,
                resource: self.params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: RESULT_BINDING,
                resource: wgpu::BindingResource::TextureView(&output.view),
            },
            wgpu::BindGroupEntry {
                binding: SKYBOX_BINDING,
                resource: wgpu::BindingResource::TextureView(&self.skybox_view),
            },
            wgpu::BindGroupEntry {
                binding: SKYBOX_SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(&self.skybox_sampler),
            },
        ];
        entries.extend(KernelSlot::ALL.iter().map(|&slot| wgpu::BindGroupEntry {
            binding: slot.binding(),
            resource: bindings
                .get(slot)
                .unwrap_or(&self.placeholder)
                .as_entire_binding(),
        }));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Kernel Bind Group"),
            layout: &self.kernel_layout,
            entries: &entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Kernel Encoder"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Kernel Pass"),
                timestamp_writes: None,
            });
            let (groups_x, groups_y) = workgroup_count(output.width, output.height);
            compute_pass.set_pipeline(&self.kernel_pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(groups_x, groups_y, 1);
        }

        self.gpu.queue().submit(Some(encoder.finish()));
        Ok(())
    }

    fn capture(&self, target: &RenderTarget, path: &Path) -> Result<()> {
        let device = self.gpu.device();
        let tight_bytes_per_row = target.width * TARGET_BYTES_PER_PIXEL;
        let padded_bytes_per_row = tight_bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Staging Buffer"),
            size: (padded_bytes_per_row * target.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Capture Encoder"),
        });
        encoder.copy_texture_to_buffer(
            target.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(target.height),
                },
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue().submit(Some(encoder.finish()));

        let padded = self.gpu.read_buffer_sync(&staging)?;
        staging.destroy();

        let tight = depad_rows(
            &padded,
            tight_bytes_per_row as usize,
            padded_bytes_per_row as usize,
            target.height as usize,
        );
        let texels: Vec<f16> = bytemuck::pod_collect_to_vec(&tight);
        write_png(path, target.width, target.height, &texels)
    }
}
