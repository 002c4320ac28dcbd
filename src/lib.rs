//! Image-based-lighting filters
//!
//! Two per-texel kernels and the machinery to run them:
//! - a separable Gaussian blur with fixed radius presets
//! - a diffuse irradiance convolution of an equirectangular environment
//!
//! Both are pure functions of (coordinate, extent, input image). The
//! `dispatch` module runs them over a workgroup grid on the CPU; the `gpu`
//! module runs the same kernels as wgpu compute shaders.

pub mod blur;
pub mod color;
pub mod dispatch;
pub mod gpu;
pub mod image;
pub mod interactive;
pub mod irradiance;
pub mod kernel;
pub mod render;
pub mod sky;


// Re-export public API
pub use blur::{BlurAxis, SeparableBlur, blur_texel};
pub use color::{Rgba, Texel};
pub use dispatch::{DispatchGrid, WorkgroupSize};
pub use image::{Image, ImageSize, TexelCoord};
pub use irradiance::{
    HemisphereSampler, IrradianceConvolution, TangentFrame, direction_from_uv, irradiance_texel,
    uv_from_direction,
};
pub use kernel::KernelRadius;
pub use render::{ToneMap, save_ppm};
pub use sky::SkyConfig;
