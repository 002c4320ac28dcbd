//! Procedural equirectangular environments for previews and benchmarks

use glam::{Vec2, Vec3};

use crate::color::Rgba;
use crate::image::Image;
use crate::irradiance::direction_from_uv;

/// Parameters of the analytic sky
#[derive(Debug, Clone, Copy)]
pub struct SkyConfig {
    pub zenith: Rgba,
    pub horizon: Rgba,
    pub ground: Rgba,
    /// Direction towards the sun (normalized on use)
    pub sun_direction: Vec3,
    /// Angular radius of the sun disc, radians
    pub sun_radius: f32,
    pub sun_radiance: Rgba,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            zenith: Rgba::new(0.15, 0.3, 0.8, 1.0),
            horizon: Rgba::new(0.8, 0.85, 0.9, 1.0),
            ground: Rgba::new(0.2, 0.17, 0.12, 1.0),
            sun_direction: Vec3::new(0.4, 0.3, 0.6),
            sun_radius: 0.08,
            sun_radiance: Rgba::new(40.0, 36.0, 30.0, 1.0),
        }
    }
}

impl SkyConfig {
    /// Radiance seen along `dir`. +Z is up.
    pub fn radiance(&self, dir: Vec3) -> Rgba {
        let elevation = dir.z;
        let base = if elevation >= 0.0 {
            let t = elevation.sqrt();
            self.horizon * (1.0 - t) + self.zenith * t
        } else {
            let t = (-elevation).sqrt().min(1.0);
            self.horizon * (1.0 - t) * 0.5 + self.ground * (0.5 + 0.5 * t)
        };

        let sun_dir = self.sun_direction.normalize_or_zero();
        let angle = dir.dot(sun_dir).clamp(-1.0, 1.0).acos();
        let color = if angle < self.sun_radius {
            self.sun_radiance
        } else {
            base
        };
        color.with_alpha(1.0)
    }

    /// Render the sky into a `width` x `width / 2` equirectangular image
    pub fn render(&self, width: u32) -> Image<[f32; 4]> {
        let height = (width / 2).max(1);
        Image::from_fn(width, height, |x, y| {
            let uv = Vec2::new(
                (x as f32 + 0.5) / width as f32,
                (y as f32 + 0.5) / height as f32,
            );
            self.radiance(direction_from_uv(uv)).to_array()
        })
    }
}

/// Environment of constant radiance
pub fn uniform(width: u32, radiance: Rgba) -> Image<[f32; 4]> {
    Image::filled(width, (width / 2).max(1), radiance.with_alpha(1.0).to_array())
}

/// Environment that is black except for the hemisphere around `dir`
/// (+Z up), which has radiance `radiance`.
pub fn hemisphere(width: u32, dir: Vec3, radiance: Rgba) -> Image<[f32; 4]> {
    let height = (width / 2).max(1);
    let dir = dir.normalize_or_zero();
    Image::from_fn(width, height, |x, y| {
        let uv = Vec2::new(
            (x as f32 + 0.5) / width as f32,
            (y as f32 + 0.5) / height as f32,
        );
        if direction_from_uv(uv).dot(dir) > 0.0 {
            radiance.with_alpha(1.0).to_array()
        } else {
            [0.0, 0.0, 0.0, 1.0]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sky_dimensions() {
        let sky = SkyConfig::default().render(64);
        assert_eq!((sky.width(), sky.height()), (64, 32));
    }

    #[test]
    fn test_sun_is_brightest() {
        let cfg = SkyConfig::default();
        let sun = cfg.radiance(cfg.sun_direction.normalize());
        let zenith = cfg.radiance(Vec3::Z);
        assert!(sun.r > zenith.r * 10.0);
    }

    #[test]
    fn test_ground_darker_than_zenith() {
        let cfg = SkyConfig::default();
        let ground = cfg.radiance(-Vec3::Z);
        let zenith = cfg.radiance(Vec3::Z);
        assert!(ground.b < zenith.b);
    }

    #[test]
    fn test_uniform_environment() {
        let env = uniform(32, Rgba::new(2.0, 1.0, 0.5, 0.0));
        assert_eq!((env.width(), env.height()), (32, 16));
        assert!(env.as_slice().iter().all(|t| *t == [2.0, 1.0, 0.5, 1.0]));
    }
}
