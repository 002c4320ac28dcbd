//! Separable Gaussian blur compute pipeline
//!
//! One pipeline per radius preset and storage format. The weight table and
//! the output format are baked into the shader source when the pipeline is
//! created, so changing either means building a new pipeline.

use wgpu::util::DeviceExt;

use super::context::GpuContext;
use super::error::GpuError;
use super::texture::{FILTER_USAGE, GpuTexel, GpuTexture};
use crate::blur::BlurAxis;
use crate::dispatch::{DispatchGrid, WorkgroupSize};
use crate::image::{Image, ImageSize};
use crate::kernel::KernelRadius;

/// Uniform data for the blur shader
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurUniforms {
    pub tex_size: [i32; 2],
    pub horizontal: u32,
    pub _padding: u32,
}

impl BlurUniforms {
    pub fn new(size: ImageSize, axis: BlurAxis) -> Self {
        Self {
            tex_size: [size.width as i32, size.height as i32],
            horizontal: axis.is_horizontal() as u32,
            _padding: 0,
        }
    }
}

/// WGSL constants selecting the kernel preset
pub fn kernel_preamble(radius: KernelRadius) -> String {
    let weights = radius
        .weights()
        .iter()
        .map(|w| format!("{:?}", w))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "const KERNEL_RADIUS: i32 = {};\nconst WEIGHTS = array<f32, {}>({});\n",
        radius.radius(),
        radius.radius(),
        weights
    )
}

/// WGSL spelling of a float storage format the blur can write
pub fn storage_format_name(format: wgpu::TextureFormat) -> Option<&'static str> {
    match format {
        wgpu::TextureFormat::R32Float => Some("r32float"),
        wgpu::TextureFormat::Rg32Float => Some("rg32float"),
        wgpu::TextureFormat::Rgba32Float => Some("rgba32float"),
        _ => None,
    }
}

/// Gaussian blur pipeline writing float images of one storage format
pub struct GaussianBlurPipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    radius: KernelRadius,
    format: wgpu::TextureFormat,
}

impl GaussianBlurPipeline {
    /// Two-channel (RG32F) blur
    pub fn new(ctx: &GpuContext, radius: KernelRadius) -> Result<Self, GpuError> {
        Self::with_format(ctx, radius, wgpu::TextureFormat::Rg32Float)
    }

    /// Blur for images stored as `T`
    pub fn for_texel<T: GpuTexel>(ctx: &GpuContext, radius: KernelRadius) -> Result<Self, GpuError> {
        Self::with_format(ctx, radius, T::FORMAT)
    }

    pub fn with_format(
        ctx: &GpuContext,
        radius: KernelRadius,
        format: wgpu::TextureFormat,
    ) -> Result<Self, GpuError> {
        let storage_name = storage_format_name(format).ok_or(GpuError::UnsupportedFormat(format))?;
        let local = WorkgroupSize::BLUR;
        ctx.check_workgroup(local.x, local.y)?;

        let device = &ctx.device;

        // Shader source: preset constants + body with the output format swapped in
        let body = include_str!("shaders/gaussian_blur.wgsl").replace("rg32float", storage_name);
        let source = kernel_preamble(radius) + &body;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Gaussian Blur Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        // Bind group layout: input texture, output storage texture, uniforms
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Gaussian Blur Bind Group Layout"),
            entries: &[
                // input (sampled, fetched by texel)
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // output (storage)
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                // uniforms
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
            ],
        });

        // Create pipeline
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Gaussian Blur Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Gaussian Blur Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("blur_main"),
            compilation_options: Default::default(),
            cache: None,
        });

        log::info!("Created GPU gaussian blur pipeline, {} ({:?})", radius, format);

        Ok(Self {
            pipeline,
            bind_group_layout,
            radius,
            format,
        })
    }

    pub fn radius(&self) -> KernelRadius {
        self.radius
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Record one pass from `input` into `output` over the valid extent `size`
    pub fn encode_pass(
        &self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::TextureView,
        output: &wgpu::TextureView,
        axis: BlurAxis,
        size: ImageSize,
    ) {
        let device = &ctx.device;

        // Per-pass uniforms
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Gaussian Blur Uniform Buffer"),
            contents: bytemuck::cast_slice(&[BlurUniforms::new(size, axis)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        // Bind input, output and uniforms
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Gaussian Blur Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(output),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        // Dispatch one invocation per texel of the valid extent
        let grid = DispatchGrid::covering(size, WorkgroupSize::BLUR);
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Gaussian Blur Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(grid.groups_x, grid.groups_y, 1);
    }

    /// `passes` rounds of horizontal then vertical blurring between two
    /// textures. The result ends up back in `image`.
    pub fn blur_passes(
        &self,
        ctx: &GpuContext,
        image: &GpuTexture,
        scratch: &GpuTexture,
        passes: u32,
    ) -> Result<(), GpuError> {
        if image.size != scratch.size {
            return Err(GpuError::SizeMismatch {
                expected: image.size,
                actual: scratch.size,
            });
        }
        for texture in [image, scratch] {
            if texture.format != self.format {
                return Err(GpuError::FormatMismatch {
                    expected: self.format,
                    actual: texture.format,
                });
            }
        }

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Gaussian Blur Encoder"),
        });
        for _ in 0..passes {
            self.encode_pass(ctx, &mut encoder, &image.view, &scratch.view, BlurAxis::Horizontal, image.size);
            self.encode_pass(ctx, &mut encoder, &scratch.view, &image.view, BlurAxis::Vertical, image.size);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
        log::debug!("GPU blur: {} passes over {}x{}", passes, image.size.width, image.size.height);
        Ok(())
    }

    /// Upload, blur and read back. Border texels keep the input values.
    ///
    /// `T` must be the texel type of the pipeline's storage format.
    pub fn blur_2d<T: GpuTexel>(&self, ctx: &GpuContext, input: &Image<T>, passes: u32) -> Result<Image<T>, GpuError> {
        // Both textures start as copies of the input
        let image = GpuTexture::from_image(ctx, "Blur Image", input, FILTER_USAGE);
        let scratch = GpuTexture::from_image(ctx, "Blur Scratch", input, FILTER_USAGE);

        self.blur_passes(ctx, &image, &scratch, passes)?;

        // Read back (blocks until the passes finish)
        image.read(ctx)
    }
}
