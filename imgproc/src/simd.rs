use wide::f32x8;

// BT.601 luma weights in 14-bit fixed point; they sum to 1 << 14.
pub const LUMA_R: u32 = 4899;
pub const LUMA_G: u32 = 9617;
pub const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

/// Luminance of one RGBA pixel, `0.299 R + 0.587 G + 0.114 B` rounded half up.
/// Alpha does not contribute.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((LUMA_R * r as u32 + LUMA_G * g as u32 + LUMA_B * b as u32 + LUMA_ROUND) >> LUMA_SHIFT) as u8
}

/// Convert packed RGBA to grayscale using SIMD.
///
/// Every intermediate of the fixed-point sum stays below 2^24, so the f32 lanes
/// are exact and the result is bit-identical to [`luma`].
pub fn rgba_to_gray_simd(rgba: &[u8], gray: &mut [u8]) {
    assert_eq!(rgba.len(), gray.len() * 4);

    // Process 8 pixels at a time (32 bytes of RGBA)
    let chunk_size = 8;
    let n = gray.len();
    let n_simd = n - (n % chunk_size);

    let w_r = f32x8::splat(LUMA_R as f32);
    let w_g = f32x8::splat(LUMA_G as f32);
    let w_b = f32x8::splat(LUMA_B as f32);
    let round = f32x8::splat(LUMA_ROUND as f32);
    let scale = f32x8::splat(1.0 / (1u32 << LUMA_SHIFT) as f32);

    for i in (0..n_simd).step_by(chunk_size) {
        let px = &rgba[i * 4..(i + chunk_size) * 4];

        let mut r_arr = [0.0f32; 8];
        let mut g_arr = [0.0f32; 8];
        let mut b_arr = [0.0f32; 8];
        for k in 0..8 {
            r_arr[k] = px[k * 4] as f32;
            g_arr[k] = px[k * 4 + 1] as f32;
            b_arr[k] = px[k * 4 + 2] as f32;
        }

        let sum = f32x8::from(r_arr) * w_r + f32x8::from(g_arr) * w_g + f32x8::from(b_arr) * w_b;
        let gray_arr: [f32; 8] = ((sum + round) * scale).into();

        for k in 0..8 {
            gray[i + k] = gray_arr[k] as u8;
        }
    }

    // Handle remainder
    for i in n_simd..n {
        gray[i] = luma(rgba[i * 4], rgba[i * 4 + 1], rgba[i * 4 + 2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn luma_reference_values() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
        assert_eq!(luma(100, 150, 200), 141);
    }

    #[test]
    fn test_rgba_to_gray_simd_parity() {
        let mut rng = StdRng::seed_from_u64(7);
        // 8 * 5 + 3 pixels: exercises the SIMD body and the scalar tail
        let n = 43;
        let mut rgba = vec![0u8; n * 4];
        rng.fill(&mut rgba[..]);

        let mut gray_simd = vec![0u8; n];
        rgba_to_gray_simd(&rgba, &mut gray_simd);

        let gray_scalar: Vec<u8> = rgba
            .chunks_exact(4)
            .map(|p| luma(p[0], p[1], p[2]))
            .collect();
        assert_eq!(gray_simd, gray_scalar);
    }

    #[test]
    fn alpha_is_ignored() {
        let opaque = [10u8, 20, 30, 255].repeat(8);
        let clear = [10u8, 20, 30, 0].repeat(8);
        let mut a = vec![0u8; 8];
        let mut b = vec![0u8; 8];
        rgba_to_gray_simd(&opaque, &mut a);
        rgba_to_gray_simd(&clear, &mut b);
        assert_eq!(a, b);
    }
}
