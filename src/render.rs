//! Conversion of HDR float images to displayable bytes, and PPM dumps

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::color::Texel;
use crate::image::Image;

/// How HDR values are squeezed into 0..1 before quantizing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneMap {
    /// Clamp after scaling by exposure
    Clamp { exposure: f32 },
    /// Reinhard `c / (1 + c)` after scaling by exposure
    Reinhard { exposure: f32 },
    /// Divide by the image maximum
    Normalize,
}

impl Default for ToneMap {
    fn default() -> Self {
        ToneMap::Reinhard { exposure: 1.0 }
    }
}

/// Convert a float value (0.0-1.0) to a byte (0-255)
#[inline]
pub fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Largest color channel in the image
pub fn max_channel<T: Texel>(image: &Image<T>) -> f32 {
    image
        .as_slice()
        .iter()
        .map(|t| {
            let c = t.to_rgba();
            c.r.max(c.g).max(c.b)
        })
        .fold(0.0f32, f32::max)
}

/// Tone map a whole image to 8-bit RGB triples, row-major
pub fn to_rgb8<T: Texel>(image: &Image<T>, tone_map: ToneMap) -> Vec<[u8; 3]> {
    let scale = match tone_map {
        ToneMap::Normalize => {
            let max = max_channel(image);
            if max > 0.0 { 1.0 / max } else { 1.0 }
        }
        ToneMap::Clamp { exposure } | ToneMap::Reinhard { exposure } => exposure,
    };
    let reinhard = matches!(tone_map, ToneMap::Reinhard { .. });

    image
        .as_slice()
        .iter()
        .map(|t| {
            let c = t.to_rgba() * scale;
            let map = |v: f32| if reinhard { v / (1.0 + v) } else { v };
            [to_byte(map(c.r)), to_byte(map(c.g)), to_byte(map(c.b))]
        })
        .collect()
}

/// Pack an RGB triple into 0x00RRGGBB (minifb layout)
#[inline]
pub fn pack_rgb(rgb: [u8; 3]) -> u32 {
    ((rgb[0] as u32) << 16) | ((rgb[1] as u32) << 8) | rgb[2] as u32
}

/// Save an image to an ASCII PPM file
pub fn save_ppm<T: Texel>(image: &Image<T>, path: impl AsRef<Path>, tone_map: ToneMap) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write_ppm(image, &mut file, tone_map)?;
    file.flush()
}

/// Write an image as ASCII PPM to any writer
pub fn write_ppm<T: Texel, W: Write>(image: &Image<T>, out: &mut W, tone_map: ToneMap) -> io::Result<()> {
    writeln!(out, "P3")?;
    writeln!(out, "{} {}", image.width(), image.height())?;
    writeln!(out, "255")?;

    let pixels = to_rgb8(image, tone_map);
    for row in pixels.chunks(image.width().max(1) as usize) {
        for [r, g, b] in row {
            write!(out, "{} {} {} ", r, g, b)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
