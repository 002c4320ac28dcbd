//! Errors raised while setting up or running GPU filters

use thiserror::Error;

use crate::image::ImageSize;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error(transparent)]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("workgroup of {requested} invocations exceeds the device limit of {limit}")]
    WorkgroupTooLarge { requested: u32, limit: u32 },
    #[error(transparent)]
    BufferMap(#[from] wgpu::BufferAsyncError),
    #[error("readback callback was dropped before completing")]
    ReadbackDisconnected,
    #[error("texture format {0:?} cannot be used as filter storage")]
    UnsupportedFormat(wgpu::TextureFormat),
    #[error("texture format mismatch: expected {expected:?}, got {actual:?}")]
    FormatMismatch {
        expected: wgpu::TextureFormat,
        actual: wgpu::TextureFormat,
    },
    #[error("image size mismatch: expected {expected:?}, got {actual:?}")]
    SizeMismatch { expected: ImageSize, actual: ImageSize },
}
