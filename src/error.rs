//! Structured error types for the Quire layout engine.
//!
//! Layout itself never fails: invalid compositions render as inline error
//! blocks and numeric edge cases degrade to empty layouts. The fallible
//! surface is the top-level entry point, where page geometry is validated
//! and the renderer produces the final document bytes.

use thiserror::Error;

/// The unified error type returned by the public Quire API.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The requested page geometry leaves no usable content area.
    #[error("invalid page geometry: {0}")]
    InvalidGeometry(String),

    /// The recorded document could not be serialized to output bytes.
    #[error("failed to serialize document output: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The renderer backend reported a failure while producing bytes.
    #[error("renderer error: {0}")]
    Renderer(String),
}
