//! Edge maps for RGBA camera frames.
//!
//! A frame arrives as a tightly packed RGBA byte buffer plus its width and
//! height. [`process_frame`] validates the buffer, converts it to grayscale,
//! runs Canny with fixed thresholds (80 / 180) and returns one byte per pixel:
//! 255 on edges, 0 elsewhere.
//!
//! ```no_run
//! let (w, h) = (640, 480);
//! let rgba = vec![0u8; w * h * 4];
//! let edges = edgecv::process_frame(&rgba, w as i32, h as i32).unwrap();
//! assert_eq!(edges.len(), w * h);
//! ```

pub use edgecv_core as core;
pub use edgecv_imgproc as imgproc;

pub mod filter;

pub use edgecv_core::frame::{EdgeMap, FrameDims, PixelLayout, RgbaFrame};
pub use edgecv_core::{Error, Result};
pub use filter::{process_frame, FrameEdgeFilter, CANNY_HIGH_THRESHOLD, CANNY_LOW_THRESHOLD};

/// Initialize a single global Rayon thread pool for the frame filter.
///
/// Call this once at application startup before processing frames.
/// Repeated calls are idempotent and return the first initialization result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `EDGECV_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> Result<()> {
    edgecv_core::runtime::init_global_thread_pool(num_threads)
}
