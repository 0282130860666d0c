use edgecv_core::frame::try_zeroed;
use image::{GrayImage, RgbaImage};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::simd::rgba_to_gray_simd;
use crate::{validate_same_size, ImgprocError, Result};

// Pixels per parallel work item; large enough to keep the SIMD loop busy.
const GRAY_CHUNK_PIXELS: usize = 4096;

pub fn convert_rgba_to_gray(rgba: &RgbaImage) -> Result<GrayImage> {
    convert_rgba_to_gray_in_pool(rgba, None)
}

pub fn convert_rgba_to_gray_in_pool(rgba: &RgbaImage, pool: Option<&ThreadPool>) -> Result<GrayImage> {
    let (w, h) = rgba.dimensions();
    let data = try_zeroed::<u8>(w as usize * h as usize)?;
    let mut gray = GrayImage::from_raw(w, h, data)
        .ok_or_else(|| ImgprocError::DimensionMismatch(format!("gray buffer for {w}x{h}")))?;
    convert_rgba_to_gray_into(rgba, &mut gray, pool)?;
    Ok(gray)
}

/// Write the luminance of `rgba` into an existing gray image of the same size.
pub fn convert_rgba_to_gray_into(
    rgba: &RgbaImage,
    gray: &mut GrayImage,
    pool: Option<&ThreadPool>,
) -> Result<()> {
    validate_same_size(rgba.dimensions(), gray.dimensions())?;

    match pool {
        Some(p) => p.install(|| gray_chunks(rgba, gray)),
        None => gray_chunks(rgba, gray),
    }
    Ok(())
}

fn gray_chunks(rgba: &RgbaImage, gray: &mut GrayImage) {
    // Process in parallel chunks, but use SIMD within each chunk
    gray.par_chunks_mut(GRAY_CHUNK_PIXELS)
        .zip(rgba.as_raw().par_chunks(GRAY_CHUNK_PIXELS * 4))
        .for_each(|(g_chunk, rgba_chunk)| {
            rgba_to_gray_simd(rgba_chunk, g_chunk);
        });
}
