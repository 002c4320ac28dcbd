//! Texel values and the four-channel accumulator used by both filters
//!
//! Kernels always accumulate in `Rgba`. The `Texel` trait adapts that
//! accumulator to the concrete channel layout of an image, dropping or
//! defaulting channels the same way a storage-image write does.

use std::ops::{Add, AddAssign, Mul};

/// RGBA color with floating point components
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Rgba { r, g, b, a }
    }

    pub const fn splat(v: f32) -> Self {
        Rgba { r: v, g: v, b: v, a: v }
    }

    pub const fn black() -> Self {
        Rgba { r: 0.0, g: 0.0, b: 0.0, a: 1.0 }
    }

    pub const fn zero() -> Self {
        Rgba::splat(0.0)
    }

    /// Replace alpha, keeping the color channels
    pub const fn with_alpha(self, a: f32) -> Self {
        Rgba { a, ..self }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Largest absolute per-channel difference
    pub fn max_abs_diff(self, other: Rgba) -> f32 {
        (self.r - other.r)
            .abs()
            .max((self.g - other.g).abs())
            .max((self.b - other.b).abs())
            .max((self.a - other.a).abs())
    }
}

impl Add for Rgba {
    type Output = Rgba;

    #[inline]
    fn add(self, rhs: Rgba) -> Rgba {
        Rgba::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a + rhs.a)
    }
}

impl AddAssign for Rgba {
    #[inline]
    fn add_assign(&mut self, rhs: Rgba) {
        *self = *self + rhs;
    }
}

impl Mul<f32> for Rgba {
    type Output = Rgba;

    #[inline]
    fn mul(self, s: f32) -> Rgba {
        Rgba::new(self.r * s, self.g * s, self.b * s, self.a * s)
    }
}

impl From<[f32; 4]> for Rgba {
    fn from(v: [f32; 4]) -> Self {
        Rgba::new(v[0], v[1], v[2], v[3])
    }
}

/// A storable pixel value.
///
/// `to_rgba` widens the texel the way a texel fetch does (missing color
/// channels read as 0, missing alpha as 1). `from_rgba` narrows an
/// accumulator to this layout, discarding channels it does not hold.
pub trait Texel: Copy + Default + Send + Sync + 'static {
    /// Number of float channels stored per texel
    const CHANNELS: usize;

    fn to_rgba(self) -> Rgba;

    fn from_rgba(c: Rgba) -> Self;
}

impl Texel for f32 {
    const CHANNELS: usize = 1;

    #[inline]
    fn to_rgba(self) -> Rgba {
        Rgba::new(self, 0.0, 0.0, 1.0)
    }

    #[inline]
    fn from_rgba(c: Rgba) -> Self {
        c.r
    }
}

impl Texel for [f32; 2] {
    const CHANNELS: usize = 2;

    #[inline]
    fn to_rgba(self) -> Rgba {
        Rgba::new(self[0], self[1], 0.0, 1.0)
    }

    #[inline]
    fn from_rgba(c: Rgba) -> Self {
        [c.r, c.g]
    }
}

impl Texel for [f32; 4] {
    const CHANNELS: usize = 4;

    #[inline]
    fn to_rgba(self) -> Rgba {
        Rgba::from(self)
    }

    #[inline]
    fn from_rgba(c: Rgba) -> Self {
        c.to_array()
    }
}

impl Texel for Rgba {
    const CHANNELS: usize = 4;

    #[inline]
    fn to_rgba(self) -> Rgba {
        self
    }

    #[inline]
    fn from_rgba(c: Rgba) -> Self {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_basics() {
        let color = Rgba::new(0.5, 0.75, 0.25, 0.9);
        assert_eq!(color.to_array(), [0.5, 0.75, 0.25, 0.9]);

        let black = Rgba::black();
        assert_eq!(black.to_array(), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(black.with_alpha(0.5).a, 0.5);
    }

    #[test]
    fn test_accumulate() {
        let mut acc = Rgba::new(1.0, 2.0, 3.0, 4.0) * 0.5;
        acc += Rgba::splat(1.0) * 0.25;
        assert_eq!(acc.to_array(), [0.75, 1.25, 1.75, 2.25]);
    }

    #[test]
    fn test_texel_narrowing() {
        let c = Rgba::new(0.1, 0.2, 0.3, 0.4);
        assert_eq!(<[f32; 2]>::from_rgba(c), [0.1, 0.2]);
        assert_eq!(f32::from_rgba(c), 0.1);
        assert_eq!(<[f32; 4]>::from_rgba(c), [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_texel_widening_defaults() {
        assert_eq!([0.5f32, 0.25].to_rgba(), Rgba::new(0.5, 0.25, 0.0, 1.0));
        assert_eq!(2.0f32.to_rgba(), Rgba::new(2.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_max_abs_diff() {
        let a = Rgba::new(1.0, 1.0, 1.0, 1.0);
        let b = Rgba::new(1.0, 0.5, 1.25, 1.0);
        assert_eq!(a.max_abs_diff(b), 0.5);
    }
}
