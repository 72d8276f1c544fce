use std::path::PathBuf;
use thiserror::Error;

/// Result type for hipaudit operations
pub type Result<T> = std::result::Result<T, HipAuditError>;

/// Error types for hipaudit operations
#[derive(Error, Debug)]
pub enum HipAuditError {
    /// Root or data directory does not exist
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// A required input file could not be found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Plot rendering error
    #[error("Render error: {0}")]
    RenderError(String),

    /// Nothing usable was found in the input
    #[error("No data: {0}")]
    NoData(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<String> for HipAuditError {
    fn from(s: String) -> Self {
        HipAuditError::RenderError(s)
    }
}

// Drawing errors are generic over the backend error
impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for HipAuditError
where
    E: std::error::Error + Send + Sync,
{
    fn from(e: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        HipAuditError::RenderError(format!("{}", e))
    }
}
