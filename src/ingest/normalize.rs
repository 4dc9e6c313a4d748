//! Device pixel format conversion to packed RGB24.

use anyhow::{anyhow, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    /// Packed 4:2:2, byte order Y0 U Y1 V.
    Yuyv,
    Nv12,
}

impl PixelFormat {
    /// Bytes in one unpadded row of the first plane.
    pub fn row_bytes(self, width: u32) -> usize {
        let width = width as usize;
        match self {
            PixelFormat::Rgb24 => width * 3,
            PixelFormat::Yuyv => width * 2,
            PixelFormat::Nv12 => width,
        }
    }

    /// Rows across all planes. NV12 chroma is a half-height plane sharing
    /// the luma stride.
    pub fn row_count(self, height: u32) -> usize {
        let height = height as usize;
        match self {
            PixelFormat::Rgb24 | PixelFormat::Yuyv => height,
            PixelFormat::Nv12 => height + height / 2,
        }
    }
}

/// Copy exactly `rows` rows of `row_bytes` out of a device buffer whose rows
/// start every `stride` bytes. Row padding and trailing bytes are dropped.
///
/// A stride smaller than `row_bytes` (some drivers report 0) means the rows
/// are packed.
pub fn pack_rows(buffer: &[u8], row_bytes: usize, stride: usize, rows: usize) -> Result<Vec<u8>> {
    let stride = stride.max(row_bytes);
    let needed = match rows {
        0 => 0,
        _ => stride
            .checked_mul(rows - 1)
            .and_then(|v| v.checked_add(row_bytes))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?,
    };
    if buffer.len() < needed {
        return Err(anyhow!(
            "frame buffer too short: need {} bytes ({} rows, stride {}), got {}",
            needed,
            rows,
            stride,
            buffer.len()
        ));
    }
    if stride == row_bytes {
        return Ok(buffer[..needed].to_vec());
    }

    let mut packed = Vec::with_capacity(row_bytes * rows);
    for row in buffer.chunks(stride).take(rows) {
        packed.extend_from_slice(&row[..row_bytes]);
    }
    Ok(packed)
}

pub fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    match format {
        PixelFormat::Rgb24 => {
            let expected = plane_len(width, height, 3)?;
            if pixels.len() != expected {
                return Err(anyhow!(
                    "RGB frame length mismatch: expected {}, got {}",
                    expected,
                    pixels.len()
                ));
            }
            Ok(pixels.to_vec())
        }
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, width, height),
        PixelFormat::Nv12 => nv12_to_rgb(pixels, width, height),
    }
}

fn plane_len(width: u32, height: u32, bytes_per_pixel: usize) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(bytes_per_pixel))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    if width % 2 != 0 {
        return Err(anyhow!("YUYV frame width must be even, got {}", width));
    }
    let expected = plane_len(width, height, 2)?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = Vec::with_capacity(plane_len(width, height, 3)?);
    for chunk in pixels.chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0], chunk[2]] {
            rgb.extend_from_slice(&yuv_to_rgb(y as f32, u, v));
        }
    }
    Ok(rgb)
}

fn nv12_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    let y_plane = plane_len(width, height, 1)?;
    let expected = y_plane
        .checked_add(y_plane / 2)
        .ok_or_else(|| anyhow!("NV12 frame dimensions overflow"))?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "NV12 frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = vec![0u8; y_plane * 3];
    for j in 0..h {
        for i in 0..w {
            let y = pixels[j * w + i] as f32;
            let uv_index = y_plane + (j / 2) * w + (i / 2) * 2;
            let u = pixels[uv_index] as f32 - 128.0;
            let v = pixels[uv_index + 1] as f32 - 128.0;

            let offset = (j * w + i) * 3;
            rgb[offset..offset + 3].copy_from_slice(&yuv_to_rgb(y, u, v));
        }
    }

    Ok(rgb)
}

fn yuv_to_rgb(y: f32, u: f32, v: f32) -> [u8; 3] {
    let r = y + 1.402_f32 * v;
    let g = y - 0.344_136_f32 * u - 0.714_136_f32 * v;
    let b = y + 1.772_f32 * u;
    [clamp_to_u8(r), clamp_to_u8(g), clamp_to_u8(b)]
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
