//! Float textures shared between host images and compute passes

use std::sync::mpsc;

use super::context::GpuContext;
use super::error::GpuError;
use crate::color::Texel;
use crate::image::{Image, ImageSize};

/// Texel types with a matching wgpu storage format
pub trait GpuTexel: Texel + bytemuck::Pod {
    const FORMAT: wgpu::TextureFormat;
}

impl GpuTexel for f32 {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;
}

impl GpuTexel for [f32; 2] {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg32Float;
}

impl GpuTexel for [f32; 4] {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
}

/// Usage for textures that are read by one pass and written by another
pub const FILTER_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::TEXTURE_BINDING
    .union(wgpu::TextureUsages::STORAGE_BINDING)
    .union(wgpu::TextureUsages::COPY_DST)
    .union(wgpu::TextureUsages::COPY_SRC);

/// A 2D float texture plus its default view
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: ImageSize,
    pub format: wgpu::TextureFormat,
}

impl GpuTexture {
    pub fn new(
        ctx: &GpuContext,
        label: &str,
        size: ImageSize,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        Self {
            texture,
            view,
            size,
            format,
        }
    }

    /// Create a texture holding a copy of `image`
    pub fn from_image<T: GpuTexel>(
        ctx: &GpuContext,
        label: &str,
        image: &Image<T>,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = Self::new(ctx, label, image.size(), T::FORMAT, usage | wgpu::TextureUsages::COPY_DST);
        texture.write(ctx, image);
        texture
    }

    /// Overwrite the texture contents with `image` (sizes must match)
    pub fn write<T: GpuTexel>(&self, ctx: &GpuContext, image: &Image<T>) {
        debug_assert_eq!(self.size, image.size());
        debug_assert_eq!(self.format, T::FORMAT);
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(image.as_slice()),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width() * std::mem::size_of::<T>() as u32),
                rows_per_image: Some(image.height()),
            },
            extent(self.size),
        );
    }

    /// Copy the texture back into a host image. Blocks until the GPU is done.
    pub fn read<T: GpuTexel>(&self, ctx: &GpuContext) -> Result<Image<T>, GpuError> {
        let texel_bytes = std::mem::size_of::<T>() as u32;
        let unpadded_row = self.size.width * texel_bytes;
        let padded_row = unpadded_row.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: padded_row as u64 * self.size.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(self.size.height),
                },
            },
            extent(self.size),
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.wait_idle();
        rx.recv().map_err(|_| GpuError::ReadbackDisconnected)??;

        let texels = {
            let mapped = slice.get_mapped_range();
            mapped
                .chunks(padded_row as usize)
                .flat_map(|row| {
                    row[..unpadded_row as usize]
                        .chunks_exact(texel_bytes as usize)
                        .map(bytemuck::pod_read_unaligned::<T>)
                })
                .collect::<Vec<T>>()
        };
        buffer.unmap();

        let read = texels.len() as u32;
        Image::from_vec(self.size.width, self.size.height, texels).ok_or(GpuError::SizeMismatch {
            expected: self.size,
            actual: ImageSize::new(read, 1),
        })
    }
}

fn extent(size: ImageSize) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}
