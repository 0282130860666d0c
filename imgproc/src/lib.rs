pub mod color;
pub mod edges;
pub mod simd;

pub use color::*;
pub use edges::*;

pub type Result<T> = std::result::Result<T, ImgprocError>;

#[derive(Debug, thiserror::Error)]
pub enum ImgprocError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error(transparent)]
    Core(#[from] edgecv_core::Error),
}

impl From<ImgprocError> for edgecv_core::Error {
    fn from(err: ImgprocError) -> Self {
        match err {
            ImgprocError::Core(inner) => inner,
            other => edgecv_core::Error::InvalidArgument(other.to_string()),
        }
    }
}

pub fn validate_same_size(a: (u32, u32), b: (u32, u32)) -> Result<()> {
    if a != b {
        return Err(ImgprocError::DimensionMismatch(format!(
            "{}x{} vs {}x{}",
            a.0, a.1, b.0, b.1
        )));
    }
    Ok(())
}
