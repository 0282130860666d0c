//! Frame buffers exchanged with the application layer.
//!
//! Frames are tightly packed, row-major byte buffers: no stride, no padding
//! between rows. An RGBA frame carries four bytes per pixel and an edge map
//! one byte per pixel. A buffer is only accepted when its length matches the
//! declared dimensions exactly.

use image::{DynamicImage, GrayImage, RgbaImage};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// Red, green, blue, alpha; one byte each.
    Rgba8,
    /// Single intensity byte.
    Gray8,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Rgba8 => 4,
            PixelLayout::Gray8 => 1,
        }
    }
}

/// Validated frame dimensions.
///
/// Both sides are non-zero and `width * height * 4` fits in `usize`, so byte
/// lengths derived from a `FrameDims` never overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameDims {
    width: u32,
    height: u32,
}

impl FrameDims {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_argument(format!(
                "frame dimensions must be positive, got {width}x{height}"
            )));
        }
        let fits = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(PixelLayout::Rgba8.channels()))
            .is_some();
        if !fits {
            return Err(Error::invalid_argument(format!(
                "frame of {width}x{height} is too large to address"
            )));
        }
        Ok(Self { width, height })
    }

    /// Dimensions as handed over by foreign callers, which use signed integers.
    pub fn from_signed(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::invalid_argument(format!(
                "frame dimensions must be positive, got {width}x{height}"
            )));
        }
        Self::new(width as u32, height as u32)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn byte_len(&self, layout: PixelLayout) -> usize {
        self.pixel_count() * layout.channels()
    }
}

/// Zero-filled buffer of `len` elements, reporting allocation failure instead of aborting.
pub fn try_zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|e| {
        Error::allocation_failure(format!(
            "cannot reserve {len} elements of {} bytes: {e}",
            std::mem::size_of::<T>()
        ))
    })?;
    buf.resize(len, T::default());
    Ok(buf)
}

/// Owned copy of `src`, reporting allocation failure instead of aborting.
pub fn try_copy_bytes(src: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(src.len()).map_err(|e| {
        Error::allocation_failure(format!("cannot copy {} byte frame: {e}", src.len()))
    })?;
    buf.extend_from_slice(src);
    Ok(buf)
}

/// Borrowed view over a caller-owned RGBA buffer whose length has been checked.
#[derive(Debug, Clone, Copy)]
pub struct RgbaFrame<'a> {
    dims: FrameDims,
    data: &'a [u8],
}

impl<'a> RgbaFrame<'a> {
    pub fn new(data: &'a [u8], dims: FrameDims) -> Result<Self> {
        let expected = dims.byte_len(PixelLayout::Rgba8);
        if data.len() != expected {
            return Err(Error::invalid_argument(format!(
                "RGBA frame of {}x{} needs {expected} bytes, got {}",
                dims.width,
                dims.height,
                data.len()
            )));
        }
        Ok(Self { dims, data })
    }

    pub fn dims(&self) -> FrameDims {
        self.dims
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Independent owned copy; the caller's buffer is never touched again.
    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        let owned = try_copy_bytes(self.data)?;
        RgbaImage::from_raw(self.dims.width, self.dims.height, owned).ok_or_else(|| {
            Error::invalid_argument("RGBA buffer does not match frame dimensions")
        })
    }
}

/// Single-channel edge map, one byte per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMap {
    dims: FrameDims,
    data: Vec<u8>,
}

impl EdgeMap {
    pub fn from_gray_image(image: GrayImage) -> Result<Self> {
        let dims = FrameDims::new(image.width(), image.height())?;
        Ok(Self {
            dims,
            data: image.into_raw(),
        })
    }

    pub fn dims(&self) -> FrameDims {
        self.dims
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Number of pixels marked as edges.
    pub fn edge_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    pub fn into_gray_image(self) -> Option<GrayImage> {
        GrayImage::from_raw(self.dims.width, self.dims.height, self.data)
    }

    /// Opaque RGBA rendition for texture upload (edge = white, background = black).
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        let gray = GrayImage::from_raw(self.dims.width, self.dims.height, self.data.clone())?;
        Some(DynamicImage::ImageLuma8(gray).to_rgba8())
    }
}
