use thiserror::Error;

/// Crate-wide error type.
///
/// The first block of variants comes from the inherited `core`/`imgproc` kernels.
/// The second block is the detection-pipeline error taxonomy from the error
/// handling design: `InvalidInput`, `InsufficientData`, `DegenerateScene`,
/// `IoFailure`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid image format: {0}")]
    InvalidFormat(String),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Wrong pixel type, empty image, out-of-range parameter at a public API boundary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A template yielded fewer than `featurePointCount` candidate edge or stable points.
    #[error("Insufficient data for template {id}: {reason}")]
    InsufficientData { id: i32, reason: String },

    /// A scene has no depth pixels within the configured range.
    #[error("Degenerate scene: {0}")]
    DegenerateScene(String),

    /// Delegated collaborator I/O failure (dataset loading, persistence).
    #[error("I/O failure: {0}")]
    IoFailure(String),

    /// Trained-data or criteria deserialization failed.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
