//! Separable Gaussian blur
//!
//! One pass convolves along a single axis with a fixed-radius symmetric
//! kernel. Texels closer than `radius - 1` to any border are never written;
//! sampling never leaves the image. A full 2D blur is a horizontal pass
//! followed by a vertical pass through an intermediate image.

use crate::color::{Rgba, Texel};
use crate::dispatch::{DispatchGrid, WorkgroupSize, dispatch};
use crate::image::{Image, ImageSize, TexelCoord};
use crate::kernel::KernelRadius;

/// Sampling axis of one blur pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlurAxis {
    Horizontal,
    Vertical,
}

impl BlurAxis {
    /// Axis selected by a `horizontal` flag
    pub fn from_flag(horizontal: bool) -> Self {
        if horizontal {
            BlurAxis::Horizontal
        } else {
            BlurAxis::Vertical
        }
    }

    pub fn is_horizontal(self) -> bool {
        self == BlurAxis::Horizontal
    }

    /// Unit step along this axis
    pub const fn step(self) -> (i32, i32) {
        match self {
            BlurAxis::Horizontal => (1, 0),
            BlurAxis::Vertical => (0, 1),
        }
    }
}

/// Blurred value for one output texel, or `None` when the texel lies in
/// the unfiltered border band.
///
/// `size` is the valid extent shared by input and output; it is passed
/// explicitly because the two may be different subresources. Taps that
/// would fall outside `input` also reject the texel.
pub fn blur_texel<I: Texel>(
    coord: TexelCoord,
    size: ImageSize,
    axis: BlurAxis,
    radius: KernelRadius,
    input: &Image<I>,
) -> Option<Rgba> {
    let margin = radius.margin();
    if !size.contains_with_margin(coord, margin) || !input.size().contains_with_margin(coord, margin) {
        return None;
    }

    let weights = radius.weights();
    let step = axis.step();

    let mut color = input.load(coord).to_rgba() * weights[0];
    for (i, &w) in weights.iter().enumerate().skip(1) {
        let i = i as i32;
        color += input.load(coord.offset(step, i)).to_rgba() * w;
        color += input.load(coord.offset(step, -i)).to_rgba() * w;
    }
    Some(color)
}

/// Separable Gaussian blur with a radius fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeparableBlur {
    radius: KernelRadius,
}

impl SeparableBlur {
    pub fn new(radius: KernelRadius) -> Self {
        debug_assert!(
            radius.is_normalized(),
            "weight table for {} is not normalized",
            radius
        );
        SeparableBlur { radius }
    }

    pub fn radius(&self) -> KernelRadius {
        self.radius
    }

    /// Run one pass over the valid extent `size`. Returns the number of
    /// texels written; border texels keep whatever `output` held.
    pub fn dispatch<I: Texel, O: Texel>(
        &self,
        input: &Image<I>,
        output: &mut Image<O>,
        axis: BlurAxis,
        size: ImageSize,
    ) -> usize {
        debug_assert!(
            size.width <= input.width() && size.height <= input.height(),
            "blur extent {:?} exceeds input {:?}",
            size,
            input.size()
        );
        debug_assert!(
            size.width <= output.width() && size.height <= output.height(),
            "blur extent {:?} exceeds output {:?}",
            size,
            output.size()
        );

        let grid = DispatchGrid::covering(size, WorkgroupSize::BLUR);
        log::debug!(
            "blur pass {:?} {} over {}x{} ({}x{} groups)",
            axis,
            self.radius,
            size.width,
            size.height,
            grid.groups_x,
            grid.groups_y
        );
        let radius = self.radius;
        dispatch(grid, output, |coord| blur_texel(coord, size, axis, radius, input))
    }

    /// `passes` rounds of horizontal then vertical blurring of `image`,
    /// ping-ponging through `scratch`. The result ends up back in `image`.
    ///
    /// `scratch` must match `image` in size. Its border band is never
    /// written, so texels there keep their prior content; seed it with a
    /// copy of `image` when edge coverage matters.
    pub fn blur_passes<T: Texel>(&self, image: &mut Image<T>, scratch: &mut Image<T>, passes: u32) {
        debug_assert_eq!(image.size(), scratch.size(), "scratch image size mismatch");
        let size = image.size();
        for _ in 0..passes {
            self.dispatch(image, scratch, BlurAxis::Horizontal, size);
            self.dispatch(scratch, image, BlurAxis::Vertical, size);
        }
    }

    /// Full 2D blur into a new image. Border texels are copied from `input`.
    pub fn blur_2d<T: Texel>(&self, input: &Image<T>, passes: u32) -> Image<T> {
        let mut image = input.clone();
        let mut scratch = input.clone();
        self.blur_passes(&mut image, &mut scratch, passes);
        image
    }
}

impl Default for SeparableBlur {
    fn default() -> Self {
        SeparableBlur::new(KernelRadius::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(width: u32, height: u32, at: (u32, u32)) -> Image<[f32; 2]> {
        Image::from_fn(width, height, |x, y| if (x, y) == at { [1.0, 0.5] } else { [0.0, 0.0] })
    }

    #[test]
    fn test_axis_from_flag() {
        assert_eq!(BlurAxis::from_flag(true), BlurAxis::Horizontal);
        assert_eq!(BlurAxis::from_flag(false), BlurAxis::Vertical);
        assert_eq!(BlurAxis::Horizontal.step(), (1, 0));
    }

    #[test]
    fn test_border_texel_rejected() {
        let img = impulse(8, 8, (4, 4));
        let size = img.size();
        let r = KernelRadius::R3;
        assert!(blur_texel(TexelCoord::new(1, 4), size, BlurAxis::Horizontal, r, &img).is_none());
        assert!(blur_texel(TexelCoord::new(6, 4), size, BlurAxis::Horizontal, r, &img).is_none());
        // Vertical margin applies to a horizontal pass too
        assert!(blur_texel(TexelCoord::new(4, 1), size, BlurAxis::Horizontal, r, &img).is_none());
        assert!(blur_texel(TexelCoord::new(2, 2), size, BlurAxis::Horizontal, r, &img).is_some());
        assert!(blur_texel(TexelCoord::new(5, 5), size, BlurAxis::Horizontal, r, &img).is_some());
    }

    #[test]
    fn test_impulse_response_is_weight_table() {
        let img = impulse(15, 15, (7, 7));
        let r = KernelRadius::R4;
        for (i, &w) in r.weights().iter().enumerate() {
            for x in [7 + i as i32, 7 - i as i32] {
                let c = blur_texel(TexelCoord::new(x, 7), img.size(), BlurAxis::Horizontal, r, &img)
                    .expect("inside valid region");
                assert!((c.r - w).abs() < 1e-6);
                assert!((c.g - 0.5 * w).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_vertical_pass_ignores_row_neighbors() {
        let img = impulse(9, 9, (4, 4));
        let r = KernelRadius::R3;
        let c = blur_texel(TexelCoord::new(5, 4), img.size(), BlurAxis::Vertical, r, &img)
            .expect("inside valid region");
        assert_eq!(c.r, 0.0);
    }

    #[test]
    fn test_radius_one_is_identity() {
        let img = Image::<[f32; 2]>::from_fn(5, 4, |x, y| [x as f32, y as f32]);
        let mut out = Image::<[f32; 2]>::new(5, 4);
        let written = SeparableBlur::new(KernelRadius::R1).dispatch(&img, &mut out, BlurAxis::Vertical, img.size());
        assert_eq!(written, 20);
        assert_eq!(out, img);
    }

    #[test]
    fn test_dispatch_writes_only_interior() {
        let img = Image::<[f32; 2]>::filled(20, 12, [1.0, 1.0]);
        let mut out = Image::<[f32; 2]>::filled(20, 12, [-1.0, -1.0]);
        let blur = SeparableBlur::new(KernelRadius::R5);
        let written = blur.dispatch(&img, &mut out, BlurAxis::Horizontal, img.size());
        // margin 4 on every side
        assert_eq!(written, (20 - 8) * (12 - 8));
    }

    #[test]
    fn test_output_layout_narrowing() {
        let img = Image::<[f32; 4]>::filled(7, 7, [0.25, 0.5, 0.75, 1.0]);
        let mut out = Image::<[f32; 2]>::new(7, 7);
        SeparableBlur::new(KernelRadius::R2).dispatch(&img, &mut out, BlurAxis::Horizontal, img.size());
        let v = out.get(3, 3);
        assert!((v[0] - 0.25).abs() < 1e-4);
        assert!((v[1] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_smaller_valid_extent() {
        let img = Image::<f32>::filled(16, 16, 1.0);
        let mut out = Image::<f32>::new(16, 16);
        let written = SeparableBlur::new(KernelRadius::R2).dispatch(&img, &mut out, BlurAxis::Horizontal, ImageSize::new(8, 8));
        assert_eq!(written, 6 * 6);
        assert_eq!(out.get(10, 10), 0.0);
    }

    #[test]
    fn test_extent_larger_than_input_is_clipped() {
        let img = Image::<[f32; 2]>::filled(8, 8, [1.0, 1.0]);
        let size = ImageSize::new(16, 16);
        let r = KernelRadius::R2;
        assert!(blur_texel(TexelCoord::new(7, 4), size, BlurAxis::Horizontal, r, &img).is_none());
        assert!(blur_texel(TexelCoord::new(12, 12), size, BlurAxis::Vertical, r, &img).is_none());
        assert!(blur_texel(TexelCoord::new(6, 6), size, BlurAxis::Horizontal, r, &img).is_some());

        let mut out = Image::<[f32; 2]>::filled(16, 16, [-1.0, -1.0]);
        let grid = DispatchGrid::covering(size, WorkgroupSize::BLUR);
        let written = dispatch(grid, &mut out, |c| blur_texel(c, size, BlurAxis::Horizontal, r, &img));
        // margin 1 inside the 8x8 input
        assert_eq!(written, 6 * 6);
        assert_eq!(out.get(8, 8), [-1.0, -1.0]);
        assert_eq!(out.get(15, 0), [-1.0, -1.0]);
    }
}
