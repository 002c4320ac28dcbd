use std::path::{Path, PathBuf};
use std::time::Instant;

use ibl_filters::dispatch::{DispatchGrid, WorkgroupSize, dispatch_sequential};
use ibl_filters::gpu::{GaussianBlurPipeline, GpuContext, IrradiancePipeline};
use ibl_filters::interactive::{InteractiveViewer, ViewerConfig};
use ibl_filters::{
    BlurAxis, HemisphereSampler, Image, IrradianceConvolution, KernelRadius, SeparableBlur, SkyConfig,
    ToneMap, blur_texel, irradiance_texel, save_ppm,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--interactive") => run_interactive(),
        Some("--benchmark") => run_benchmark(),
        Some("--gpu") => run_gpu_check(),
        Some("--ppm") => {
            let dir = args.get(2).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            if let Err(e) = run_ppm(&dir) {
                eprintln!("Error: {}", e);
            }
        }
        _ => {
            println!("IBL Filters");
            println!("Run with --interactive for minifb viewer");
            println!("Run with --benchmark to test performance");
            println!("Run with --gpu to compare GPU and CPU output");
            println!("Run with --ppm <dir> to write preview images");
        }
    }
}

fn run_benchmark() {
    println!("=== Separable Blur Benchmark ===\n");

    let iterations = 10;
    let sizes = [(256u32, 256u32), (512, 512), (1024, 1024)];

    for (width, height) in sizes {
        println!("Image size: {}x{} (RG32F)", width, height);
        println!("-----------------------");

        let input = Image::<[f32; 2]>::from_fn(width, height, |x, y| [(x ^ y) as f32 / 255.0, 1.0]);
        let size = input.size();

        for radius in [KernelRadius::R3, KernelRadius::R6] {
            let blur = SeparableBlur::new(radius);
            let mut output = input.clone();

            let start = Instant::now();
            for _ in 0..iterations {
                blur.dispatch(&input, &mut output, BlurAxis::Horizontal, size);
            }
            let parallel_ms = start.elapsed().as_secs_f64() * 1000.0 / iterations as f64;

            let grid = DispatchGrid::covering(size, WorkgroupSize::BLUR);
            let start = Instant::now();
            for _ in 0..iterations {
                dispatch_sequential(grid, &mut output, |c| {
                    blur_texel(c, size, BlurAxis::Horizontal, radius, &input)
                });
            }
            let sequential_ms = start.elapsed().as_secs_f64() * 1000.0 / iterations as f64;

            println!("  {}", radius);
            println!("    Sequential:      {:.3} ms/pass", sequential_ms);
            println!("    Parallel (rayon): {:.3} ms/pass", parallel_ms);
            println!("    Speedup: {:.2}x", sequential_ms / parallel_ms);
        }
        println!();
    }

    println!("=== Irradiance Convolution Benchmark ===\n");

    let env = SkyConfig::default().render(256);
    let convolution = IrradianceConvolution::new();
    println!(
        "Environment 256x128, {} samples per texel\n",
        convolution.sampler().sample_count()
    );

    for (width, height) in [(16u32, 8u32), (32, 16), (64, 32)] {
        let start = Instant::now();
        let _ = convolution.convolve(&env, width, height);
        let parallel_ms = start.elapsed().as_secs_f64() * 1000.0;

        let sampler = HemisphereSampler::default();
        let mut output = Image::<[f32; 4]>::new(width, height);
        let size = output.size();
        let grid = DispatchGrid::covering(size, WorkgroupSize::CONVOLUTION);
        let start = Instant::now();
        dispatch_sequential(grid, &mut output, |c| irradiance_texel(c, size, &env, &sampler));
        let sequential_ms = start.elapsed().as_secs_f64() * 1000.0;

        println!("Output {}x{}", width, height);
        println!("  Sequential:       {:.1} ms", sequential_ms);
        println!("  Parallel (rayon): {:.1} ms", parallel_ms);
        println!("  Speedup: {:.2}x", sequential_ms / parallel_ms);
    }
    println!();

    match GpuContext::new() {
        Ok(ctx) => benchmark_gpu(&ctx, &env),
        Err(e) => log::warn!("GPU benchmark skipped: {}", e),
    }
}

fn benchmark_gpu(ctx: &GpuContext, env: &Image<[f32; 4]>) {
    println!("=== GPU ({}) ===\n", ctx.adapter_info.name);

    match IrradiancePipeline::new(ctx) {
        Ok(pipeline) => {
            for (width, height) in [(32u32, 16u32), (64, 32), (128, 64)] {
                let start = Instant::now();
                match pipeline.convolve(ctx, env, width, height) {
                    Ok(_) => println!(
                        "  Irradiance {}x{}: {:.1} ms (incl. upload/readback)",
                        width,
                        height,
                        start.elapsed().as_secs_f64() * 1000.0
                    ),
                    Err(e) => eprintln!("  Irradiance {}x{} failed: {}", width, height, e),
                }
            }
        }
        Err(e) => eprintln!("  Irradiance pipeline unavailable: {}", e),
    }

    match GaussianBlurPipeline::new(ctx, KernelRadius::R6) {
        Ok(pipeline) => {
            let input = Image::<[f32; 2]>::from_fn(1024, 1024, |x, y| [(x ^ y) as f32 / 255.0, 1.0]);
            let start = Instant::now();
            match pipeline.blur_2d(ctx, &input, 2) {
                Ok(_) => println!(
                    "  Blur 1024x1024, {} x2: {:.1} ms (incl. upload/readback)",
                    pipeline.radius(),
                    start.elapsed().as_secs_f64() * 1000.0
                ),
                Err(e) => eprintln!("  Blur failed: {}", e),
            }
        }
        Err(e) => eprintln!("  Blur pipeline unavailable: {}", e),
    }
}

fn run_gpu_check() {
    let ctx = match GpuContext::new() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Failed to create GPU context: {}", e);
            return;
        }
    };
    println!("Adapter: {} ({:?})", ctx.adapter_info.name, ctx.adapter_info.backend);

    let env = SkyConfig::default().render(128);

    match IrradiancePipeline::new(&ctx).and_then(|p| p.convolve(&ctx, &env, 16, 8)) {
        Ok(gpu) => {
            let cpu = IrradianceConvolution::new().convolve(&env, 16, 8);
            println!("Irradiance max |GPU - CPU|: {:.6}", max_diff(gpu.as_slice(), cpu.as_slice()));
        }
        Err(e) => eprintln!("Irradiance on GPU failed: {}", e),
    }

    let input: Image<[f32; 2]> = env.convert();
    for radius in KernelRadius::ALL {
        match GaussianBlurPipeline::new(&ctx, radius).and_then(|p| p.blur_2d(&ctx, &input, 1)) {
            Ok(gpu) => {
                let cpu = SeparableBlur::new(radius).blur_2d(&input, 1);
                let diff = gpu
                    .as_slice()
                    .iter()
                    .zip(cpu.as_slice())
                    .map(|(g, c)| (g[0] - c[0]).abs().max((g[1] - c[1]).abs()))
                    .fold(0.0f32, f32::max);
                println!("Blur {} max |GPU - CPU|: {:.6}", radius, diff);
            }
            Err(e) => eprintln!("Blur {} on GPU failed: {}", radius, e),
        }
    }
}

fn max_diff(a: &[[f32; 4]], b: &[[f32; 4]]) -> f32 {
    a.iter()
        .zip(b)
        .flat_map(|(x, y)| x.iter().zip(y).map(|(p, q)| (p - q).abs()))
        .fold(0.0f32, f32::max)
}

fn run_ppm(dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;

    let env = SkyConfig::default().render(256);
    let irradiance = IrradianceConvolution::new().convolve(&env, 32, 16);
    let blurred = SeparableBlur::new(KernelRadius::R6).blur_2d(&env, 3);

    let tone_map = ToneMap::default();
    for (name, image) in [
        ("environment.ppm", &env),
        ("irradiance.ppm", &irradiance),
        ("blurred.ppm", &blurred),
    ] {
        let path = dir.join(name);
        save_ppm(image, &path, tone_map).map_err(|e| format!("{}: {}", path.display(), e))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_interactive() {
    let config = ViewerConfig::default();

    match InteractiveViewer::new(config) {
        Ok(mut viewer) => {
            if let Err(e) = viewer.run() {
                eprintln!("Error: {}", e);
            }
        }
        Err(e) => {
            eprintln!("Failed to create viewer: {}", e);
        }
    }
}
