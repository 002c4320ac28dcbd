//! Precomputed half Gaussian weight tables
//!
//! A table of length R holds the center weight at index 0 followed by the
//! weights for offsets 1..R. The full kernel is symmetric, so it spans
//! 2R - 1 taps and `w[0] + 2 * (w[1] + .. + w[R-1])` is 1.

use std::fmt;

const WEIGHTS_1: [f32; 1] = [1.0];
const WEIGHTS_2: [f32; 2] = [0.369521, 0.31524];
const WEIGHTS_3: [f32; 3] = [0.265569, 0.226558, 0.140658];
const WEIGHTS_4: [f32; 4] = [0.235624, 0.201012, 0.124798, 0.056379];
const WEIGHTS_5: [f32; 5] = [0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216];
const WEIGHTS_6: [f32; 6] = [0.22528, 0.192187, 0.119319, 0.053904, 0.017716, 0.004235];

/// Tolerance for the weight-table normalization check
pub const NORMALIZATION_TOLERANCE: f32 = 1e-4;

/// Blur kernel radius preset.
///
/// The radius is fixed when a blur is constructed; each preset carries its
/// own normalized weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum KernelRadius {
    /// 1 tap, identity
    R1,
    /// 3 taps
    R2,
    /// 5 taps
    #[default]
    R3,
    /// 7 taps
    R4,
    /// 9 taps
    R5,
    /// 11 taps
    R6,
}

impl KernelRadius {
    pub const ALL: [KernelRadius; 6] = [
        KernelRadius::R1,
        KernelRadius::R2,
        KernelRadius::R3,
        KernelRadius::R4,
        KernelRadius::R5,
        KernelRadius::R6,
    ];

    /// Preset for a blur-strength slider value. 2..=6 select that radius,
    /// anything else falls back to the identity kernel.
    pub fn from_strength(strength: i32) -> Self {
        match strength {
            6 => KernelRadius::R6,
            5 => KernelRadius::R5,
            4 => KernelRadius::R4,
            3 => KernelRadius::R3,
            2 => KernelRadius::R2,
            _ => KernelRadius::R1,
        }
    }

    /// Number of entries in the half table
    pub const fn radius(self) -> usize {
        match self {
            KernelRadius::R1 => 1,
            KernelRadius::R2 => 2,
            KernelRadius::R3 => 3,
            KernelRadius::R4 => 4,
            KernelRadius::R5 => 5,
            KernelRadius::R6 => 6,
        }
    }

    /// Width of the full 1D kernel in texels
    pub const fn footprint(self) -> usize {
        2 * self.radius() - 1
    }

    /// Texels at each border left unwritten by one pass
    pub const fn margin(self) -> i32 {
        self.radius() as i32 - 1
    }

    pub const fn weights(self) -> &'static [f32] {
        match self {
            KernelRadius::R1 => &WEIGHTS_1,
            KernelRadius::R2 => &WEIGHTS_2,
            KernelRadius::R3 => &WEIGHTS_3,
            KernelRadius::R4 => &WEIGHTS_4,
            KernelRadius::R5 => &WEIGHTS_5,
            KernelRadius::R6 => &WEIGHTS_6,
        }
    }

    /// Sum of the full symmetric kernel
    pub fn kernel_sum(self) -> f32 {
        let w = self.weights();
        w[0] + 2.0 * w[1..].iter().sum::<f32>()
    }

    /// Distance of the full kernel sum from 1
    pub fn normalization_error(self) -> f32 {
        (self.kernel_sum() - 1.0).abs()
    }

    pub fn is_normalized(self) -> bool {
        self.normalization_error() <= NORMALIZATION_TOLERANCE
    }
}

impl TryFrom<u32> for KernelRadius {
    type Error = u32;

    fn try_from(radius: u32) -> Result<Self, Self::Error> {
        KernelRadius::ALL
            .iter()
            .copied()
            .find(|r| r.radius() as u32 == radius)
            .ok_or(radius)
    }
}

impl fmt::Display for KernelRadius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.footprint();
        write!(f, "radius {} ({}x{})", self.radius(), n, n)
    }
}
