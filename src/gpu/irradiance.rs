//! Irradiance convolution compute pipeline

use super::context::GpuContext;
use super::error::GpuError;
use super::texture::{GpuTexel, GpuTexture};
use crate::dispatch::{DispatchGrid, WorkgroupSize};
use crate::image::Image;
use crate::irradiance::{DEGENERATE_COS, HemisphereSampler};

/// WGSL constants describing the hemisphere sample grid
pub fn sampler_preamble(sampler: &HemisphereSampler) -> String {
    format!(
        "const PHI_STEPS: u32 = {}u;\nconst THETA_STEPS: u32 = {}u;\nconst SAMPLE_DELTA: f32 = {:?};\nconst DEGENERATE_COS: f32 = {:?};\n",
        sampler.azimuth_steps(),
        sampler.polar_steps(),
        sampler.delta(),
        DEGENERATE_COS
    )
}

/// Pipeline convolving an equirectangular RGBA environment into an
/// RGBA irradiance image
pub struct IrradiancePipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl IrradiancePipeline {
    pub fn new(ctx: &GpuContext) -> Result<Self, GpuError> {
        let local = WorkgroupSize::CONVOLUTION;
        ctx.check_workgroup(local.x, local.y)?;

        let device = &ctx.device;
        // Shader source: sample grid constants + body
        let source = sampler_preamble(&HemisphereSampler::default())
            + include_str!("shaders/irradiance_convolve.wgsl");
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Irradiance Convolution Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        // Bind group layout: environment texture, output storage texture
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Irradiance Bind Group Layout"),
            entries: &[
                // environment (fetched and filtered in the shader)
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
                        format: wgpu::TextureFormat::Rgba32Float,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        // Create pipeline
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Irradiance Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Irradiance Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("irradiance_main"),
            compilation_options: Default::default(),
            cache: None,
        });

        log::info!("Created GPU irradiance convolution pipeline");

        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }

    /// Record a convolution of `environment` into `output`
    pub fn encode(
        &self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        environment: &GpuTexture,
        output: &GpuTexture,
    ) {
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Irradiance Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&environment.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&output.view),
                },
            ],
        });

        let grid = DispatchGrid::covering(output.size, WorkgroupSize::CONVOLUTION);
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Irradiance Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(grid.groups_x, grid.groups_y, 1);
    }

    /// Upload `environment`, convolve into a `width` x `height` image and read it back
    pub fn convolve<T: GpuTexel>(
        &self,
        ctx: &GpuContext,
        environment: &Image<T>,
        width: u32,
        height: u32,
    ) -> Result<Image<[f32; 4]>, GpuError> {
        // Upload environment as RGBA32F, allocate the output
        let environment: Image<[f32; 4]> = environment.convert();
        let env_texture = GpuTexture::from_image(
            ctx,
            "Environment",
            &environment,
            wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let output = GpuTexture::new(
            ctx,
            "Irradiance Output",
            crate::image::ImageSize::new(width, height),
            wgpu::TextureFormat::Rgba32Float,
            wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
        );

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Irradiance Encoder"),
        });
        self.encode(ctx, &mut encoder, &env_texture, &output);
        ctx.queue.submit(std::iter::once(encoder.finish()));
        log::debug!(
            "GPU irradiance: {}x{} -> {}x{}",
            environment.width(),
            environment.height(),
            width,
            height
        );

        // Read back (blocks until the pass finishes)
        output.read(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irradiance::IrradianceConvolution;
    use crate::sky::SkyConfig;

    #[test]
    fn test_preamble_matches_sampler() {
        let src = sampler_preamble(&HemisphereSampler::default());
        assert!(src.contains("const PHI_STEPS: u32 = 252u;"));
        assert!(src.contains("const THETA_STEPS: u32 = 63u;"));
        assert!(src.contains("const SAMPLE_DELTA: f32 = 0.025;"));
        assert!(src.contains("const DEGENERATE_COS: f32 = 0.999;"));
    }

    #[test]
    fn test_gpu_matches_cpu() {
        let ctx = match GpuContext::new() {
            Ok(ctx) => ctx,
            Err(e) => {
                eprintln!("skipping GPU irradiance test: {}", e);
                return;
            }
        };
        let pipeline = match IrradiancePipeline::new(&ctx) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("skipping GPU irradiance test: {}", e);
                return;
            }
        };

        let env = SkyConfig::default().render(64);
        let gpu = pipeline.convolve(&ctx, &env, 8, 4).expect("GPU convolution");
        let cpu = IrradianceConvolution::new().convolve(&env, 8, 4);

        for (g, c) in gpu.as_slice().iter().zip(cpu.as_slice()) {
            for ch in 0..3 {
                let tolerance = 1e-2 * c[ch].abs().max(1.0);
                assert!((g[ch] - c[ch]).abs() < tolerance, "{:?} vs {:?}", g, c);
            }
            assert_eq!(g[3], 1.0);
        }
    }
}
