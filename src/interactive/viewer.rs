//! Interactive viewer - environment map, its irradiance and a blurred copy
//! shown side by side, recomputed whenever a parameter changes

use std::time::Instant;

use glam::Vec3;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::blur::SeparableBlur;
use crate::image::Image;
use crate::irradiance::IrradianceConvolution;
use crate::kernel::KernelRadius;
use crate::render::{ToneMap, pack_rgb, to_rgb8};
use crate::sky::SkyConfig;

/// Configuration for the interactive viewer
#[derive(Clone)]
pub struct ViewerConfig {
    /// Environment map width (height is half)
    pub env_width: u32,
    /// Irradiance map size
    pub irradiance_size: (u32, u32),
    /// Initial blur radius
    pub radius: KernelRadius,
    /// Initial number of horizontal+vertical blur rounds
    pub passes: u32,
    /// Pixel scale factor for every panel
    pub scale: usize,
    /// Exposure applied before tone mapping
    pub exposure: f32,
    pub sky: SkyConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            env_width: 256,
            irradiance_size: (32, 16),
            radius: KernelRadius::R3,
            passes: 2,
            scale: 2,
            exposure: 1.0,
            sky: SkyConfig::default(),
        }
    }
}

/// Three panels: environment | irradiance | blurred environment
pub struct InteractiveViewer {
    config: ViewerConfig,
    window: Window,
    buffer: Vec<u32>,
    panel_size: (usize, usize),
    environment: Image<[f32; 4]>,
    irradiance: Image<[f32; 4]>,
    blurred: Image<[f32; 4]>,
}

impl InteractiveViewer {
    /// Create a new interactive viewer with the given configuration
    pub fn new(config: ViewerConfig) -> Result<Self, String> {
        let panel_w = config.env_width as usize * config.scale;
        let panel_h = (config.env_width as usize / 2).max(1) * config.scale;
        let window_w = panel_w * 3;

        let window = Window::new(
            "IBL Filters - environment | irradiance | blur (ESC to exit)",
            window_w,
            panel_h,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| e.to_string())?;

        Ok(Self {
            buffer: vec![0u32; window_w * panel_h],
            panel_size: (panel_w, panel_h),
            environment: Image::new(0, 0),
            irradiance: Image::new(0, 0),
            blurred: Image::new(0, 0),
            config,
            window,
        })
    }

    /// Run the interactive viewer loop
    pub fn run(&mut self) -> Result<(), String> {
        self.window.set_target_fps(60);

        println!("=== IBL Filter Viewer ===");
        println!("Controls:");
        println!("  1-6        - Blur radius preset");
        println!("  +/-        - Blur passes");
        println!("  Left/Right - Rotate sun");
        println!("  Up/Down    - Raise/lower sun");
        println!("  E/D        - Exposure up/down");
        println!("  ESC        - Exit");
        println!();

        self.recompute_environment();

        let radius_keys = [
            (Key::Key1, KernelRadius::R1),
            (Key::Key2, KernelRadius::R2),
            (Key::Key3, KernelRadius::R3),
            (Key::Key4, KernelRadius::R4),
            (Key::Key5, KernelRadius::R5),
            (Key::Key6, KernelRadius::R6),
        ];

        while self.window.is_open() && !self.window.is_key_down(Key::Escape) {
            let mut env_dirty = false;
            let mut blur_dirty = false;
            let mut display_dirty = false;

            for (key, radius) in radius_keys {
                if self.window.is_key_pressed(key, KeyRepeat::No) && self.config.radius != radius {
                    self.config.radius = radius;
                    println!("Blur: {}", radius);
                    blur_dirty = true;
                }
            }

            if self.window.is_key_pressed(Key::Equal, KeyRepeat::Yes)
                || self.window.is_key_pressed(Key::NumPadPlus, KeyRepeat::Yes)
            {
                self.config.passes = (self.config.passes + 1).min(8);
                println!("Passes: {}", self.config.passes);
                blur_dirty = true;
            }
            if self.window.is_key_pressed(Key::Minus, KeyRepeat::Yes)
                || self.window.is_key_pressed(Key::NumPadMinus, KeyRepeat::Yes)
            {
                self.config.passes = self.config.passes.saturating_sub(1);
                println!("Passes: {}", self.config.passes);
                blur_dirty = true;
            }

            let sun_step = 0.15;
            if self.window.is_key_pressed(Key::Left, KeyRepeat::Yes) {
                self.rotate_sun(sun_step, 0.0);
                env_dirty = true;
            }
            if self.window.is_key_pressed(Key::Right, KeyRepeat::Yes) {
                self.rotate_sun(-sun_step, 0.0);
                env_dirty = true;
            }
            if self.window.is_key_pressed(Key::Up, KeyRepeat::Yes) {
                self.rotate_sun(0.0, sun_step);
                env_dirty = true;
            }
            if self.window.is_key_pressed(Key::Down, KeyRepeat::Yes) {
                self.rotate_sun(0.0, -sun_step);
                env_dirty = true;
            }

            if self.window.is_key_pressed(Key::E, KeyRepeat::Yes) {
                self.config.exposure *= 1.25;
                println!("Exposure: {:.2}", self.config.exposure);
                display_dirty = true;
            }
            if self.window.is_key_pressed(Key::D, KeyRepeat::Yes) {
                self.config.exposure /= 1.25;
                println!("Exposure: {:.2}", self.config.exposure);
                display_dirty = true;
            }

            if env_dirty {
                self.recompute_environment();
            } else if blur_dirty {
                self.recompute_blur();
                self.draw();
            } else if display_dirty {
                self.draw();
            }

            let (panel_w, panel_h) = self.panel_size;
            self.window
                .update_with_buffer(&self.buffer, panel_w * 3, panel_h)
                .map_err(|e| e.to_string())?;
        }

        Ok(())
    }

    /// Move the sun by azimuth/elevation deltas (radians)
    fn rotate_sun(&mut self, d_azimuth: f32, d_elevation: f32) {
        let dir = self.config.sky.sun_direction.normalize_or_zero();
        let azimuth = dir.y.atan2(dir.x) + d_azimuth;
        let elevation = (dir.z.clamp(-1.0, 1.0).asin() + d_elevation).clamp(-1.4, 1.4);
        self.config.sky.sun_direction = Vec3::new(
            elevation.cos() * azimuth.cos(),
            elevation.cos() * azimuth.sin(),
            elevation.sin(),
        );
    }

    fn recompute_environment(&mut self) {
        let start = Instant::now();
        self.environment = self.config.sky.render(self.config.env_width);
        let (w, h) = self.config.irradiance_size;
        self.irradiance = IrradianceConvolution::new().convolve(&self.environment, w, h);
        log::info!("Irradiance {}x{} in {:.1} ms", w, h, start.elapsed().as_secs_f64() * 1000.0);
        self.recompute_blur();
        self.draw();
    }

    fn recompute_blur(&mut self) {
        let start = Instant::now();
        self.blurred = SeparableBlur::new(self.config.radius).blur_2d(&self.environment, self.config.passes);
        log::info!(
            "Blur {} x{} in {:.1} ms",
            self.config.radius,
            self.config.passes,
            start.elapsed().as_secs_f64() * 1000.0
        );
    }

    fn draw(&mut self) {
        let tone_map = ToneMap::Reinhard {
            exposure: self.config.exposure,
        };
        let panels = [&self.environment, &self.irradiance, &self.blurred];
        let (panel_w, panel_h) = self.panel_size;
        let stride = panel_w * 3;

        for (i, image) in panels.into_iter().enumerate() {
            let (img_w, img_h) = (image.width() as usize, image.height() as usize);
            if img_w == 0 || img_h == 0 {
                continue;
            }
            let rgb = to_rgb8(image, tone_map);

            // Nearest-neighbour stretch into the panel
            for py in 0..panel_h {
                let sy = py * img_h / panel_h;
                for px in 0..panel_w {
                    let sx = px * img_w / panel_w;
                    self.buffer[py * stride + i * panel_w + px] = pack_rgb(rgb[sy * img_w + sx]);
                }
            }
        }
    }
}
