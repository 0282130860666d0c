use std::sync::Arc;

use edgecv_core::frame::{EdgeMap, FrameDims, RgbaFrame};
use edgecv_core::runtime::build_thread_pool;
use edgecv_core::Result;
use edgecv_imgproc::{canny_in_pool, convert_rgba_to_gray_in_pool, CannyParams};
use rayon::ThreadPool;
use tracing::debug;

pub const CANNY_LOW_THRESHOLD: f32 = 80.0;
pub const CANNY_HIGH_THRESHOLD: f32 = 180.0;

/// RGBA frame to binary edge map.
///
/// The filter holds no per-frame state. By default work runs on the global
/// Rayon pool; [`FrameEdgeFilter::with_pool`] pins it to a dedicated one.
#[derive(Debug, Clone, Default)]
pub struct FrameEdgeFilter {
    pool: Option<Arc<ThreadPool>>,
}

impl FrameEdgeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(pool: Arc<ThreadPool>) -> Self {
        Self { pool: Some(pool) }
    }

    /// Dedicated pool of `num_threads` workers.
    pub fn with_threads(num_threads: usize) -> Result<Self> {
        let pool = build_thread_pool(Some(num_threads))?;
        Ok(Self::with_pool(Arc::new(pool)))
    }

    /// Process a raw RGBA buffer. Dimensions are signed, as foreign callers pass them.
    ///
    /// Fails with `InvalidArgument` when a dimension is not positive or the
    /// buffer length differs from `width * height * 4`; nothing is computed
    /// in that case.
    #[tracing::instrument(level = "debug", skip(self, input), fields(len = input.len()))]
    pub fn process(&self, input: &[u8], width: i32, height: i32) -> Result<Vec<u8>> {
        let dims = FrameDims::from_signed(width, height)?;
        let frame = RgbaFrame::new(input, dims)?;
        Ok(self.process_frame(&frame)?.into_vec())
    }

    pub fn process_frame(&self, frame: &RgbaFrame<'_>) -> Result<EdgeMap> {
        let pool = self.pool.as_deref();
        let params = CannyParams::new(CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD)?;

        let rgba = frame.to_rgba_image()?;
        let gray = convert_rgba_to_gray_in_pool(&rgba, pool)?;
        drop(rgba);
        let edges = EdgeMap::from_gray_image(canny_in_pool(&gray, &params, pool)?)?;

        let dims = frame.dims();
        debug!(
            width = dims.width(),
            height = dims.height(),
            edge_pixels = edges.edge_count(),
            "frame filtered"
        );
        Ok(edges)
    }
}

/// Edge map of one RGBA frame using the global pool.
pub fn process_frame(input: &[u8], width: i32, height: i32) -> Result<Vec<u8>> {
    FrameEdgeFilter::new().process(input, width, height)
}
