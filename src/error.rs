// Error types for the hue_vision engine.
//
// Only input problems are errors. Out-of-range tunables are clamped in
// `config`, and degenerate contours are dropped inside the blob detector.

use thiserror::Error;

/// Main error type for a single frame or for loading static settings.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Failed to decode frame payload: {0}")]
    Payload(#[from] base64::DecodeError),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("No jpeg_b64 provided")]
    MissingFrame,

    #[error("Frame has non-positive dimensions ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("Similarity weights must not all be zero")]
    ZeroWeights,

    #[error("Invalid detector settings: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VisionError {
    /// True for problems caused by the frame or its per-frame configuration.
    /// These abort the current frame only; tracker state is left untouched.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            VisionError::Payload(_)
                | VisionError::Decode(_)
                | VisionError::MissingFrame
                | VisionError::EmptyFrame { .. }
                | VisionError::ZeroWeights
        )
    }
}

/// Result type alias for hue_vision operations.
pub type Result<T> = std::result::Result<T, VisionError>;
