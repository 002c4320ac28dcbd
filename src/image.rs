//! Flat 2D images addressed by integer texel coordinates
//!
//! Storage is row-major: index = y * width + x. Reads go through `load`
//! (integer fetch) or `sample_equirect` (bilinear, longitude wraps,
//! colatitude clamps). Writes go through `store`.

use crate::color::{Rgba, Texel};

/// Integer coordinate of one texel / one dispatch invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TexelCoord {
    pub x: i32,
    pub y: i32,
}

impl TexelCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        TexelCoord { x, y }
    }

    /// Offset by `step` times `axis`
    #[inline]
    pub const fn offset(self, axis: (i32, i32), step: i32) -> Self {
        TexelCoord {
            x: self.x + axis.0 * step,
            y: self.y + axis.1 * step,
        }
    }
}

/// Extent of an image or of the valid region of a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        ImageSize { width, height }
    }

    pub const fn texel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub const fn contains(self, coord: TexelCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as i64) < self.width as i64
            && (coord.y as i64) < self.height as i64
    }

    /// True when every texel within `margin` of `coord` on both axes is inside
    #[inline]
    pub const fn contains_with_margin(self, coord: TexelCoord, margin: i32) -> bool {
        self.contains(TexelCoord::new(coord.x - margin, coord.y - margin))
            && self.contains(TexelCoord::new(coord.x + margin, coord.y + margin))
    }
}

/// A 2D grid of texels of type `T`
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T: Texel> {
    data: Vec<T>,
    size: ImageSize,
}

impl<T: Texel> Image<T> {
    /// New image with every texel at `T::default()`
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, T::default())
    }

    pub fn filled(width: u32, height: u32, value: T) -> Self {
        let size = ImageSize::new(width, height);
        Image {
            data: vec![value; size.texel_count()],
            size,
        }
    }

    /// Build an image by evaluating `f(x, y)` for every texel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> T) -> Self {
        let size = ImageSize::new(width, height);
        let mut data = Vec::with_capacity(size.texel_count());
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Image { data, size }
    }

    /// Wrap row-major texel data. Returns `None` if the length does not match.
    pub fn from_vec(width: u32, height: u32, data: Vec<T>) -> Option<Self> {
        let size = ImageSize::new(width, height);
        (data.len() == size.texel_count()).then_some(Image { data, size })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.height
    }

    #[inline]
    pub fn size(&self) -> ImageSize {
        self.size
    }

    #[inline]
    fn index(&self, coord: TexelCoord) -> usize {
        debug_assert!(
            self.size.contains(coord),
            "texel {:?} outside image {:?}",
            coord,
            self.size
        );
        coord.y as usize * self.size.width as usize + coord.x as usize
    }

    /// Integer texel fetch. The coordinate must be inside the image.
    #[inline]
    pub fn load(&self, coord: TexelCoord) -> T {
        self.data[self.index(coord)]
    }

    #[inline]
    pub fn store(&mut self, coord: TexelCoord, value: T) {
        let idx = self.index(coord);
        self.data[idx] = value;
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> T {
        self.load(TexelCoord::new(x as i32, y as i32))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Copy texels out with the layout adapted to `U`
    pub fn convert<U: Texel>(&self) -> Image<U> {
        Image {
            data: self.data.iter().map(|t| U::from_rgba(t.to_rgba())).collect(),
            size: self.size,
        }
    }

    /// Bilinear sample of an equirectangular map at normalized `uv`.
    ///
    /// Texel centers sit at `(i + 0.5) / width`. The longitude axis (u)
    /// wraps around the seam; the colatitude axis (v) clamps at the poles.
    pub fn sample_equirect(&self, u: f32, v: f32) -> Rgba {
        let (w, h) = (self.size.width as i32, self.size.height as i32);
        if w == 0 || h == 0 {
            return Rgba::zero();
        }

        // One period of u and a clamped v keep the texel indices small
        let u = u.rem_euclid(1.0);
        let v = v.clamp(0.0, 1.0);
        let px = u * w as f32 - 0.5;
        let py = v * h as f32 - 0.5;
        let x0 = px.floor();
        let y0 = py.floor();
        let fx = px - x0;
        let fy = py - y0;

        let x0 = x0 as i32;
        let y0 = y0 as i32;
        let xa = x0.rem_euclid(w);
        let xb = (x0 + 1).rem_euclid(w);
        let ya = y0.clamp(0, h - 1);
        let yb = (y0 + 1).clamp(0, h - 1);

        let fetch = |x: i32, y: i32| self.load(TexelCoord::new(x, y)).to_rgba();
        let top = fetch(xa, ya) * (1.0 - fx) + fetch(xb, ya) * fx;
        let bottom = fetch(xa, yb) * (1.0 - fx) + fetch(xb, yb) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_layout() {
        let img = Image::<f32>::from_fn(3, 2, |x, y| (y * 10 + x) as f32);
        assert_eq!(img.as_slice(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(img.get(2, 1), 12.0);
    }

    #[test]
    fn test_store_and_load() {
        let mut img = Image::<[f32; 2]>::new(4, 4);
        img.store(TexelCoord::new(1, 3), [0.5, 2.0]);
        assert_eq!(img.load(TexelCoord::new(1, 3)), [0.5, 2.0]);
        assert_eq!(img.load(TexelCoord::new(3, 1)), [0.0, 0.0]);
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(Image::<f32>::from_vec(2, 2, vec![0.0; 3]).is_none());
        assert!(Image::<f32>::from_vec(2, 2, vec![0.0; 4]).is_some());
    }

    #[test]
    fn test_contains_with_margin() {
        let size = ImageSize::new(10, 6);
        assert!(size.contains_with_margin(TexelCoord::new(2, 2), 2));
        assert!(!size.contains_with_margin(TexelCoord::new(1, 2), 2));
        assert!(!size.contains_with_margin(TexelCoord::new(8, 2), 2));
        assert!(size.contains_with_margin(TexelCoord::new(7, 3), 2));
        assert!(!size.contains_with_margin(TexelCoord::new(7, 4), 2));
        assert!(!size.contains(TexelCoord::new(-1, 0)));
    }

    #[test]
    fn test_sample_at_texel_center_is_exact() {
        let img = Image::<f32>::from_fn(4, 2, |x, y| (x + 4 * y) as f32);
        // Center of texel (2, 1)
        let s = img.sample_equirect(2.5 / 4.0, 1.5 / 2.0);
        assert!((s.r - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_sample_wraps_longitude() {
        let img = Image::<f32>::from_fn(4, 1, |x, _| if x == 0 { 1.0 } else if x == 3 { 3.0 } else { 0.0 });
        // u = 0 lies halfway between the centers of texel 3 and texel 0
        let s = img.sample_equirect(0.0, 0.5);
        assert!((s.r - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_sample_clamps_colatitude() {
        let img = Image::<f32>::from_fn(1, 2, |_, y| if y == 0 { 5.0 } else { 1.0 });
        assert!((img.sample_equirect(0.5, 0.0).r - 5.0).abs() < 1e-5);
        assert!((img.sample_equirect(0.5, 1.0).r - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_sample_far_outside_one_period() {
        let img = Image::<f32>::from_fn(4, 2, |x, y| (x + 4 * y) as f32);
        let inside = img.sample_equirect(0.3, 0.4);
        let shifted = img.sample_equirect(7.3, 0.4);
        assert!((inside.r - shifted.r).abs() < 1e-3);

        // Must not overflow the texel index arithmetic
        let _ = img.sample_equirect(f32::INFINITY, 0.5);
        let _ = img.sample_equirect(f32::NAN, f32::NEG_INFINITY);
        assert!(img.sample_equirect(1e12, 0.5).r.is_finite());
        assert!((img.sample_equirect(0.5, -3.0).r - img.sample_equirect(0.5, 0.0).r).abs() < 1e-6);
    }
}
