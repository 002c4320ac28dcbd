//! CPU dispatch of per-texel kernels
//!
//! Mirrors a 2D compute dispatch: the grid is covered by fixed-size
//! workgroups, every invocation calls the kernel with its own coordinate,
//! and invocations never see each other's results. Workgroup rows are
//! spread across the rayon thread pool.

use rayon::prelude::*;

use crate::color::{Rgba, Texel};
use crate::image::{Image, ImageSize, TexelCoord};

/// Local size of one workgroup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
}

impl WorkgroupSize {
    /// Local size used by the separable blur
    pub const BLUR: WorkgroupSize = WorkgroupSize { x: 32, y: 32 };
    /// Local size used by the irradiance convolution
    pub const CONVOLUTION: WorkgroupSize = WorkgroupSize { x: 8, y: 8 };

    pub const fn invocations(self) -> u32 {
        self.x * self.y
    }
}

/// Number of workgroups needed to cover an extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGrid {
    pub groups_x: u32,
    pub groups_y: u32,
    pub local: WorkgroupSize,
}

impl DispatchGrid {
    pub fn covering(size: ImageSize, local: WorkgroupSize) -> Self {
        DispatchGrid {
            groups_x: size.width.div_ceil(local.x),
            groups_y: size.height.div_ceil(local.y),
            local,
        }
    }

    /// Total invocations along each axis (may exceed the covered extent)
    pub fn invocation_extent(&self) -> ImageSize {
        ImageSize::new(self.groups_x * self.local.x, self.groups_y * self.local.y)
    }

    pub fn invocation_count(&self) -> usize {
        self.invocation_extent().texel_count()
    }
}

/// Run `kernel` once per invocation of `grid` and store every value it
/// returns into `output`. Returns the number of texels written.
///
/// Only the invocations of `grid` run, however large `output` is.
/// Invocations whose coordinate lies outside `output` can never write;
/// whole workgroup rows past the last output row are skipped.
pub fn dispatch<O, K>(grid: DispatchGrid, output: &mut Image<O>, kernel: K) -> usize
where
    O: Texel,
    K: Fn(TexelCoord) -> Option<Rgba> + Sync,
{
    let size = output.size();
    if size.texel_count() == 0 {
        return 0;
    }

    let band_rows = grid.local.y as usize;
    let row_len = size.width as usize;
    let extent = grid.invocation_extent();

    output
        .as_mut_slice()
        .par_chunks_mut(row_len * band_rows)
        .take(grid.groups_y as usize)
        .enumerate()
        .map(|(group_y, band)| {
            let mut written = 0;
            for local_y in 0..grid.local.y {
                let y = group_y as u32 * grid.local.y + local_y;
                for x in 0..extent.width {
                    let coord = TexelCoord::new(x as i32, y as i32);
                    let Some(value) = kernel(coord) else {
                        continue;
                    };
                    if !size.contains(coord) {
                        debug_assert!(false, "kernel wrote outside the image at {:?}", coord);
                        continue;
                    }
                    band[local_y as usize * row_len + x as usize] = O::from_rgba(value);
                    written += 1;
                }
            }
            written
        })
        .sum()
}

/// Sequential reference for `dispatch`. Writes the same texels.
pub fn dispatch_sequential<O, K>(grid: DispatchGrid, output: &mut Image<O>, kernel: K) -> usize
where
    O: Texel,
    K: Fn(TexelCoord) -> Option<Rgba>,
{
    let size = output.size();
    let extent = grid.invocation_extent();
    let mut written = 0;
    for y in 0..extent.height {
        for x in 0..extent.width {
            let coord = TexelCoord::new(x as i32, y as i32);
            if let Some(value) = kernel(coord) {
                if size.contains(coord) {
                    output.store(coord, O::from_rgba(value));
                    written += 1;
                }
            }
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_covers_with_ceiling() {
        let grid = DispatchGrid::covering(ImageSize::new(33, 64), WorkgroupSize::BLUR);
        assert_eq!((grid.groups_x, grid.groups_y), (2, 2));
        assert_eq!(grid.invocation_extent(), ImageSize::new(64, 64));

        let grid = DispatchGrid::covering(ImageSize::new(16, 9), WorkgroupSize::CONVOLUTION);
        assert_eq!((grid.groups_x, grid.groups_y), (2, 2));
        assert_eq!(grid.invocation_count(), 256);
    }

    #[test]
    fn test_local_sizes() {
        assert_eq!(WorkgroupSize::BLUR.invocations(), 1024);
        assert_eq!(WorkgroupSize::CONVOLUTION.invocations(), 64);
    }

    #[test]
    fn test_every_texel_written_once() {
        let mut out = Image::<f32>::new(13, 7);
        let grid = DispatchGrid::covering(out.size(), WorkgroupSize::CONVOLUTION);
        let written = dispatch(grid, &mut out, |c| {
            ImageSize::new(13, 7)
                .contains(c)
                .then(|| Rgba::splat((c.y * 100 + c.x) as f32))
        });
        assert_eq!(written, 13 * 7);
        assert_eq!(out.get(12, 6), 612.0);
        assert_eq!(out.get(0, 3), 300.0);
    }

    #[test]
    fn test_rejected_invocations_leave_output_untouched() {
        let mut out = Image::<f32>::filled(10, 10, -1.0);
        let grid = DispatchGrid::covering(out.size(), WorkgroupSize::BLUR);
        let written = dispatch(grid, &mut out, |c| (c.x == 4 && c.y == 5).then(|| Rgba::splat(2.0)));
        assert_eq!(written, 1);
        assert_eq!(out.get(4, 5), 2.0);
        assert_eq!(out.as_slice().iter().filter(|&&v| v == -1.0).count(), 99);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let kernel = |c: TexelCoord| {
            ImageSize::new(40, 35)
                .contains(c)
                .then(|| Rgba::new(c.x as f32, c.y as f32, 0.5, 1.0))
        };
        let grid = DispatchGrid::covering(ImageSize::new(40, 35), WorkgroupSize::BLUR);
        let mut a = Image::<[f32; 4]>::new(40, 35);
        let mut b = Image::<[f32; 4]>::new(40, 35);
        assert_eq!(dispatch(grid, &mut a, kernel), dispatch_sequential(grid, &mut b, kernel));
        assert_eq!(a, b);
    }

    #[test]
    fn test_output_larger_than_grid() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let grid = DispatchGrid::covering(ImageSize::new(8, 8), WorkgroupSize::BLUR);
        let calls = AtomicUsize::new(0);
        let mut a = Image::<f32>::new(100, 100);
        let mut b = Image::<f32>::new(100, 100);
        let written = dispatch(grid, &mut a, |c| {
            calls.fetch_add(1, Ordering::Relaxed);
            ImageSize::new(100, 100).contains(c).then(|| Rgba::splat(1.0))
        });
        let expected = dispatch_sequential(grid, &mut b, |c| {
            ImageSize::new(100, 100).contains(c).then(|| Rgba::splat(1.0))
        });

        assert_eq!(calls.load(Ordering::Relaxed), grid.invocation_count());
        assert_eq!((written, expected), (1024, 1024));
        assert_eq!(a, b);
        assert_eq!(a.get(32, 0), 0.0);
        assert_eq!(a.get(0, 32), 0.0);
    }
}
