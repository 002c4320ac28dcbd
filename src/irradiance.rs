//! Diffuse irradiance convolution of an equirectangular environment
//!
//! Each output texel is read as a direction on the sphere. The hemisphere
//! around that direction is integrated on a fixed angular grid with
//! cosine-weighted solid-angle terms, then scaled by `PI / sample_count`.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::color::{Rgba, Texel};
use crate::dispatch::{DispatchGrid, WorkgroupSize, dispatch};
use crate::image::{Image, ImageSize, TexelCoord};

/// Angular spacing of hemisphere samples, radians
pub const SAMPLE_DELTA: f32 = 0.025;

/// Reference up axis used to build tangent frames
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Reference used instead of `WORLD_UP` when the normal is (nearly) parallel to it
pub const FALLBACK_UP: Vec3 = Vec3::Z;

/// |N . up| above which the frame switches to `FALLBACK_UP`
pub const DEGENERATE_COS: f32 = 0.999;

/// Unit direction for a normalized equirectangular coordinate.
///
/// Longitude is `2 PI (0.5 - u)`, colatitude is `PI v` measured from +Z.
pub fn direction_from_uv(uv: Vec2) -> Vec3 {
    let lon = 2.0 * PI * (0.5 - uv.x);
    let colat = PI * uv.y;
    let (sin_lon, cos_lon) = lon.sin_cos();
    let (sin_colat, cos_colat) = colat.sin_cos();
    Vec3::new(cos_lon * sin_colat, sin_lon * sin_colat, cos_colat)
}

/// Inverse of [`direction_from_uv`]. `u` is kept in `[0, 1)`.
pub fn uv_from_direction(dir: Vec3) -> Vec2 {
    let mut u = 0.5 - dir.y.atan2(dir.x) / (2.0 * PI);
    if u >= 1.0 {
        u -= 1.0;
    }
    let v = dir.z.clamp(-1.0, 1.0).acos() / PI;
    Vec2::new(u, v)
}

/// Orthonormal basis around a normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentFrame {
    pub right: Vec3,
    pub up: Vec3,
    pub normal: Vec3,
}

impl TangentFrame {
    pub fn new(normal: Vec3) -> Self {
        let reference = if normal.dot(WORLD_UP).abs() > DEGENERATE_COS {
            FALLBACK_UP
        } else {
            WORLD_UP
        };
        let right = reference.cross(normal).normalize();
        let up = normal.cross(right);
        TangentFrame { right, up, normal }
    }

    /// Tangent-space vector to world space
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.right * local.x + self.up * local.y + self.normal * local.z
    }
}

/// Fixed angular grid over the hemisphere.
///
/// Azimuth steps cover `[0, 2 PI)` and polar steps cover `[0, PI / 2)`.
/// Angles are `index * delta`, so the sample count is exact and identical
/// on every platform.
#[derive(Debug, Clone, PartialEq)]
pub struct HemisphereSampler {
    delta: f32,
    /// (sin, cos) per azimuth step
    azimuth: Vec<(f32, f32)>,
    /// (sin, cos) per polar step
    polar: Vec<(f32, f32)>,
}

/// Number of `k >= 0` with `k * delta < limit`
fn step_count(limit: f32, delta: f32) -> usize {
    let mut n = (limit / delta).ceil() as usize;
    while n > 0 && (n - 1) as f32 * delta >= limit {
        n -= 1;
    }
    while (n as f32) * delta < limit {
        n += 1;
    }
    n
}

impl HemisphereSampler {
    pub fn new(delta: f32) -> Self {
        assert!(delta > 0.0, "sample spacing must be positive");
        let angles = |limit: f32| -> Vec<(f32, f32)> {
            (0..step_count(limit, delta))
                .map(|i| (i as f32 * delta).sin_cos())
                .collect()
        };
        HemisphereSampler {
            delta,
            azimuth: angles(2.0 * PI),
            polar: angles(0.5 * PI),
        }
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn azimuth_steps(&self) -> usize {
        self.azimuth.len()
    }

    pub fn polar_steps(&self) -> usize {
        self.polar.len()
    }

    pub fn sample_count(&self) -> usize {
        self.azimuth.len() * self.polar.len()
    }

    /// Visit every sample as (tangent-space direction, cos(theta) * sin(theta))
    #[inline]
    pub fn for_each(&self, mut f: impl FnMut(Vec3, f32)) {
        for &(sin_phi, cos_phi) in &self.azimuth {
            for &(sin_theta, cos_theta) in &self.polar {
                let local = Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta);
                f(local, cos_theta * sin_theta);
            }
        }
    }

    /// Riemann sum of cos(theta) sin(theta) dtheta dphi over the grid; tends to PI
    pub fn cosine_weighted_solid_angle(&self) -> f32 {
        let mut sum = 0.0f64;
        self.for_each(|_, w| sum += w as f64);
        (sum * (self.delta as f64) * (self.delta as f64)) as f32
    }
}

impl Default for HemisphereSampler {
    fn default() -> Self {
        HemisphereSampler::new(SAMPLE_DELTA)
    }
}

/// Irradiance for one output texel, or `None` outside `size`.
///
/// The texel's direction comes from `coord / size`. Alpha is always 1.
pub fn irradiance_texel<T: Texel>(
    coord: TexelCoord,
    size: ImageSize,
    environment: &Image<T>,
    sampler: &HemisphereSampler,
) -> Option<Rgba> {
    if !size.contains(coord) {
        return None;
    }

    let uv = Vec2::new(
        coord.x as f32 / size.width as f32,
        coord.y as f32 / size.height as f32,
    );
    let frame = TangentFrame::new(direction_from_uv(uv));

    let mut irradiance = Rgba::zero();
    sampler.for_each(|local, weight| {
        let sample_uv = uv_from_direction(frame.to_world(local));
        irradiance += environment.sample_equirect(sample_uv.x, sample_uv.y) * weight;
    });

    let irradiance = irradiance * (PI / sampler.sample_count() as f32);
    Some(irradiance.with_alpha(1.0))
}

/// Irradiance convolution dispatcher
#[derive(Debug, Clone, Default)]
pub struct IrradianceConvolution {
    sampler: HemisphereSampler,
}

impl IrradianceConvolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sampler(&self) -> &HemisphereSampler {
        &self.sampler
    }

    /// Convolve `environment` into every texel of `output`. Returns the
    /// number of texels written.
    pub fn dispatch<E: Texel, O: Texel>(&self, environment: &Image<E>, output: &mut Image<O>) -> usize {
        debug_assert!(
            environment.width() == 2 * environment.height(),
            "environment {}x{} is not 2:1 equirectangular",
            environment.width(),
            environment.height()
        );

        let size = output.size();
        let grid = DispatchGrid::covering(size, WorkgroupSize::CONVOLUTION);
        log::debug!(
            "irradiance convolution {}x{} -> {}x{} ({} samples/texel, {}x{} groups)",
            environment.width(),
            environment.height(),
            size.width,
            size.height,
            self.sampler.sample_count(),
            grid.groups_x,
            grid.groups_y
        );
        let sampler = &self.sampler;
        dispatch(grid, output, |coord| irradiance_texel(coord, size, environment, sampler))
    }

    /// Convolve into a new RGBA image of the given size
    pub fn convolve<E: Texel>(&self, environment: &Image<E>, width: u32, height: u32) -> Image<[f32; 4]> {
        let mut output = Image::new(width, height);
        self.dispatch(environment, &mut output);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_grid_size() {
        let sampler = HemisphereSampler::default();
        assert_eq!(sampler.azimuth_steps(), 252);
        assert_eq!(sampler.polar_steps(), 63);
        assert_eq!(sampler.sample_count(), 252 * 63);
    }

    #[test]
    fn test_step_count_exact_multiple() {
        assert_eq!(step_count(1.0, 0.25), 4);
        assert_eq!(step_count(1.0, 0.3), 4);
        assert_eq!(step_count(0.1, 0.5), 1);
    }

    #[test]
    fn test_cosine_weighted_solid_angle_approaches_pi() {
        let integral = HemisphereSampler::default().cosine_weighted_solid_angle();
        assert!((integral - PI).abs() < 0.02, "integral {}", integral);
    }

    #[test]
    fn test_uv_direction_known_points() {
        // v = 0 is the +Z pole, v = 1 the -Z pole
        assert!(direction_from_uv(Vec2::new(0.3, 0.0)).abs_diff_eq(Vec3::Z, 1e-6));
        assert!(direction_from_uv(Vec2::new(0.3, 1.0)).abs_diff_eq(-Vec3::Z, 1e-6));
        // center of the map looks down +X
        assert!(direction_from_uv(Vec2::new(0.5, 0.5)).abs_diff_eq(Vec3::X, 1e-6));
        assert!(direction_from_uv(Vec2::new(0.25, 0.5)).abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn test_u_stays_below_one() {
        let uv = uv_from_direction(Vec3::new(-1.0, -0.0, 0.0));
        assert!(uv.x >= 0.0 && uv.x < 1.0, "u = {}", uv.x);
        let uv = uv_from_direction(Vec3::new(-1.0, 0.0, 0.0));
        assert!(uv.x >= 0.0 && uv.x < 1.0, "u = {}", uv.x);
    }

    #[test]
    fn test_tangent_frame_is_orthonormal() {
        for n in [
            Vec3::new(0.3, 0.4, 0.866).normalize(),
            Vec3::X,
            -Vec3::Z,
            Vec3::Y,
            -Vec3::Y,
            Vec3::new(0.001, 0.9999995, 0.0).normalize(),
        ] {
            let f = TangentFrame::new(n);
            for v in [f.right, f.up, f.normal] {
                assert!((v.length() - 1.0).abs() < 1e-5, "{:?} for {:?}", v, n);
            }
            assert!(f.right.dot(f.up).abs() < 1e-5);
            assert!(f.right.dot(f.normal).abs() < 1e-5);
            assert!(f.up.dot(f.normal).abs() < 1e-5);
            assert!(f.to_world(Vec3::Z).abs_diff_eq(n, 1e-6));
        }
    }

    #[test]
    fn test_out_of_bounds_texel_rejected() {
        let env = Image::<[f32; 4]>::filled(8, 4, [1.0; 4]);
        let sampler = HemisphereSampler::new(0.2);
        let size = ImageSize::new(4, 2);
        assert!(irradiance_texel(TexelCoord::new(4, 0), size, &env, &sampler).is_none());
        assert!(irradiance_texel(TexelCoord::new(0, 2), size, &env, &sampler).is_none());
        assert!(irradiance_texel(TexelCoord::new(3, 1), size, &env, &sampler).is_some());
    }

    #[test]
    fn test_black_environment_gives_black_irradiance() {
        let env = Image::<[f32; 4]>::new(16, 8);
        let out = IrradianceConvolution::new().convolve(&env, 4, 2);
        for t in out.as_slice() {
            assert_eq!(*t, [0.0, 0.0, 0.0, 1.0]);
        }
    }
}
