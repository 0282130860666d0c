use edgecv_core::frame::try_zeroed;
use image::GrayImage;
use rayon::prelude::*;
use rayon::ThreadPool;
use wide::f32x8;

use crate::{ImgprocError, Result};

// tan(22.5°) in Q15.
const TG22: i32 = 13573;
const CANNY_SHIFT: i32 = 15;

const NOT_EDGE: u8 = 0;
const WEAK: u8 = 1;
const STRONG: u8 = 2;

/// 3x3 Sobel derivatives of an 8-bit image, row-major.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub width: usize,
    pub height: usize,
    pub dx: Vec<i16>,
    pub dy: Vec<i16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CannyGradient {
    /// `|dx| + |dy|`
    #[default]
    L1,
    /// `sqrt(dx² + dy²)`, compared in squared form.
    L2,
}

/// Hysteresis thresholds for [`canny`], on the gradient-magnitude scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CannyParams {
    low: f32,
    high: f32,
    gradient: CannyGradient,
}

impl CannyParams {
    /// Thresholds are swapped when `low > high`.
    pub fn new(low: f32, high: f32) -> Result<Self> {
        for (name, v) in [("low", low), ("high", high)] {
            if !v.is_finite() || v < 0.0 {
                return Err(ImgprocError::InvalidParameter(format!(
                    "canny {name} threshold must be finite and non-negative, got {v}"
                )));
            }
        }
        let (low, high) = if low > high { (high, low) } else { (low, high) };
        Ok(Self {
            low,
            high,
            gradient: CannyGradient::L1,
        })
    }

    pub fn with_gradient(mut self, gradient: CannyGradient) -> Self {
        self.gradient = gradient;
        self
    }

    pub fn low(&self) -> f32 {
        self.low
    }

    pub fn high(&self) -> f32 {
        self.high
    }

    pub fn gradient(&self) -> CannyGradient {
        self.gradient
    }

    fn magnitude_thresholds(&self) -> (i32, i32) {
        match self.gradient {
            CannyGradient::L1 => (self.low.floor() as i32, self.high.floor() as i32),
            CannyGradient::L2 => {
                let low = self.low.min(32767.0);
                let high = self.high.min(32767.0);
                ((low * low).floor() as i32, (high * high).floor() as i32)
            }
        }
    }
}

#[inline]
fn sobel_at(r0: &[u8], r1: &[u8], r2: &[u8], x: usize) -> (i16, i16) {
    let w = r1.len();
    let xl = x.saturating_sub(1);
    let xr = (x + 1).min(w - 1);

    let gx = (r0[xr] as i32 - r0[xl] as i32)
        + 2 * (r1[xr] as i32 - r1[xl] as i32)
        + (r2[xr] as i32 - r2[xl] as i32);
    let gy = (r2[xl] as i32 + 2 * r2[x] as i32 + r2[xr] as i32)
        - (r0[xl] as i32 + 2 * r0[x] as i32 + r0[xr] as i32);
    (gx as i16, gy as i16)
}

fn sobel_row(r0: &[u8], r1: &[u8], r2: &[u8], dx_row: &mut [i16], dy_row: &mut [i16]) {
    let width = r1.len();

    let load_f32x8 = |slice: &[u8]| -> f32x8 {
        let mut arr = [0.0f32; 8];
        for i in 0..8 {
            arr[i] = slice[i] as f32;
        }
        f32x8::from(arr)
    };

    // Left border, then 8 interior pixels at a time while x+8 stays in bounds.
    let (gx, gy) = sobel_at(r0, r1, r2, 0);
    dx_row[0] = gx;
    dy_row[0] = gy;

    let mut x = 1;
    while x + 9 <= width {
        let p00 = load_f32x8(&r0[x - 1..]);
        let p01 = load_f32x8(&r0[x..]);
        let p02 = load_f32x8(&r0[x + 1..]);
        let p10 = load_f32x8(&r1[x - 1..]);
        let p12 = load_f32x8(&r1[x + 1..]);
        let p20 = load_f32x8(&r2[x - 1..]);
        let p21 = load_f32x8(&r2[x..]);
        let p22 = load_f32x8(&r2[x + 1..]);

        // Integer-valued and bounded by 1020, so the f32 lanes are exact.
        let gx = p02 - p00 + (p12 - p10) * 2.0 + p22 - p20;
        let gy = p20 - p00 + (p21 - p01) * 2.0 + p22 - p02;

        let gx_arr: [f32; 8] = gx.into();
        let gy_arr: [f32; 8] = gy.into();
        for i in 0..8 {
            dx_row[x + i] = gx_arr[i] as i16;
            dy_row[x + i] = gy_arr[i] as i16;
        }
        x += 8;
    }

    // Scalar tail, including the right border
    for cx in x..width {
        let (gx, gy) = sobel_at(r0, r1, r2, cx);
        dx_row[cx] = gx;
        dy_row[cx] = gy;
    }
}

pub fn sobel_gradients(src: &GrayImage) -> Result<Gradients> {
    sobel_gradients_in_pool(src, None)
}

/// Sobel derivatives with replicated borders.
pub fn sobel_gradients_in_pool(src: &GrayImage, pool: Option<&ThreadPool>) -> Result<Gradients> {
    let width = src.width() as usize;
    let height = src.height() as usize;
    let mut dx = try_zeroed::<i16>(width * height)?;
    let mut dy = try_zeroed::<i16>(width * height)?;

    if width > 0 && height > 0 {
        let data = src.as_raw();
        let run = |dx: &mut [i16], dy: &mut [i16]| {
            dx.par_chunks_mut(width)
                .zip(dy.par_chunks_mut(width))
                .enumerate()
                .for_each(|(y, (dx_row, dy_row))| {
                    let row = |yy: usize| &data[yy * width..(yy + 1) * width];
                    let r0 = row(y.saturating_sub(1));
                    let r1 = row(y);
                    let r2 = row((y + 1).min(height - 1));
                    sobel_row(r0, r1, r2, dx_row, dy_row);
                });
        };
        match pool {
            Some(p) => p.install(|| run(dx.as_mut_slice(), dy.as_mut_slice())),
            None => run(dx.as_mut_slice(), dy.as_mut_slice()),
        }
    }

    Ok(Gradients {
        width,
        height,
        dx,
        dy,
    })
}

fn gradient_magnitude(grad: &Gradients, kind: CannyGradient) -> Result<Vec<i32>> {
    let mut mag = try_zeroed::<i32>(grad.dx.len())?;
    mag.par_iter_mut()
        .zip(grad.dx.par_iter().zip(grad.dy.par_iter()))
        .for_each(|(m, (&gx, &gy))| {
            let (gx, gy) = (gx as i32, gy as i32);
            *m = match kind {
                CannyGradient::L1 => gx.abs() + gy.abs(),
                CannyGradient::L2 => gx * gx + gy * gy,
            };
        });
    Ok(mag)
}

/// Classify every pixel as not-edge, weak or strong.
///
/// A pixel survives when its magnitude exceeds `low` and it is a local maximum
/// across the edge. Neighbours outside the image count as zero magnitude.
fn non_max_suppression(grad: &Gradients, mag: &[i32], low: i32, high: i32) -> Result<Vec<u8>> {
    let width = grad.width;
    let height = grad.height;
    let mut state = try_zeroed::<u8>(width * height)?;

    let mag_at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= width as isize || y >= height as isize {
            0
        } else {
            mag[y as usize * width + x as usize]
        }
    };

    state
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, state_row)| {
            let yi = y as isize;
            for x in 0..width {
                let idx = y * width + x;
                let m = mag[idx];
                if m <= low {
                    continue;
                }

                let gx = grad.dx[idx] as i32;
                let gy = grad.dy[idx] as i32;
                let ax = gx.abs();
                let ay = gy.abs() << CANNY_SHIFT;
                let tg22x = ax * TG22;
                let xi = x as isize;

                let is_max = if ay < tg22x {
                    // near-horizontal gradient: compare left/right
                    m > mag_at(xi - 1, yi) && m >= mag_at(xi + 1, yi)
                } else {
                    let tg67x = tg22x + (ax << (CANNY_SHIFT + 1));
                    if ay > tg67x {
                        m > mag_at(xi, yi - 1) && m >= mag_at(xi, yi + 1)
                    } else {
                        let s: isize = if (gx ^ gy) < 0 { -1 } else { 1 };
                        m > mag_at(xi - s, yi - 1) && m > mag_at(xi + s, yi + 1)
                    }
                };

                if is_max {
                    state_row[x] = if m > high { STRONG } else { WEAK };
                }
            }
        });

    Ok(state)
}

fn try_stack(capacity: usize) -> Result<Vec<usize>> {
    let mut stack = Vec::new();
    stack.try_reserve_exact(capacity).map_err(|e| {
        edgecv_core::Error::allocation_failure(format!(
            "cannot reserve hysteresis stack of {capacity} entries: {e}"
        ))
    })?;
    Ok(stack)
}

#[inline]
fn try_push(stack: &mut Vec<usize>, idx: usize) -> Result<()> {
    if stack.len() == stack.capacity() {
        stack.try_reserve(1).map_err(|e| {
            edgecv_core::Error::allocation_failure(format!("cannot grow hysteresis stack: {e}"))
        })?;
    }
    stack.push(idx);
    Ok(())
}

/// Promote weak pixels 8-connected to a strong pixel; everything else is dropped.
fn hysteresis(width: usize, height: usize, mut state: Vec<u8>) -> Result<GrayImage> {
    let strong = state.par_iter().filter(|&&s| s == STRONG).count();
    let mut stack = try_stack(strong)?;
    for (idx, &s) in state.iter().enumerate() {
        if s == STRONG {
            stack.push(idx);
        }
    }

    while let Some(idx) = stack.pop() {
        let (x, y) = (idx % width, idx / width);
        let y0 = y.saturating_sub(1);
        let y1 = (y + 1).min(height - 1);
        let x0 = x.saturating_sub(1);
        let x1 = (x + 1).min(width - 1);
        for ny in y0..=y1 {
            for nx in x0..=x1 {
                let nidx = ny * width + nx;
                if state[nidx] == WEAK {
                    state[nidx] = STRONG;
                    try_push(&mut stack, nidx)?;
                }
            }
        }
    }

    state.par_iter_mut().for_each(|px| {
        *px = if *px == STRONG { 255 } else { NOT_EDGE };
    });

    GrayImage::from_raw(width as u32, height as u32, state)
        .ok_or_else(|| ImgprocError::DimensionMismatch(format!("edge map for {width}x{height}")))
}

/// Canny edge detector: Sobel gradients, non-maximum suppression, hysteresis.
///
/// No smoothing is applied beforehand. The output holds 255 on edges and 0
/// elsewhere.
pub fn canny(src: &GrayImage, params: &CannyParams) -> Result<GrayImage> {
    canny_in_pool(src, params, None)
}

pub fn canny_in_pool(
    src: &GrayImage,
    params: &CannyParams,
    pool: Option<&ThreadPool>,
) -> Result<GrayImage> {
    let width = src.width() as usize;
    let height = src.height() as usize;
    if width == 0 || height == 0 {
        return Ok(GrayImage::new(src.width(), src.height()));
    }

    let (low, high) = params.magnitude_thresholds();
    let run = || -> Result<GrayImage> {
        let grad = sobel_gradients_in_pool(src, None)?;
        let mag = gradient_magnitude(&grad, params.gradient())?;
        let state = non_max_suppression(&grad, &mag, low, high)?;
        hysteresis(width, height, state)
    };

    match pool {
        Some(p) => p.install(run),
        None => run(),
    }
}
