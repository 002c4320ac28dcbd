//! GPU filtering using wgpu
//!
//! Runs the same blur and irradiance kernels as compute shaders. The CPU
//! implementations in the crate root are the reference these are tested
//! against.

pub mod blur;
pub mod context;
pub mod error;
pub mod irradiance;
pub mod texture;

pub use blur::GaussianBlurPipeline;
pub use context::GpuContext;
pub use error::GpuError;
pub use irradiance::IrradiancePipeline;
pub use texture::{GpuTexel, GpuTexture};
