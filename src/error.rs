//! Error types for the screenshot pipeline

use crate::Viewport;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Usage message returned when the path does not map to a supported viewport.
pub const USAGE_MESSAGE: &str = concat!(
    "Incorrect API usage. Expects one of: /:url/ or /:url/:size/ or ",
    "/:url/:size/:aspectratio/ or /:url/:size/:aspectratio/:zoom/"
);

/// Errors that can occur while resolving, rendering, or serving a screenshot
#[derive(Error, Debug)]
pub enum Error {
    /// The request path could not be resolved
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Failed to start a rendering session
    #[error("Renderer initialization failed: {0}")]
    Initialization(String),

    /// Failed to load a URL
    #[error("Failed to load URL: {0}")]
    Load(String),

    /// Failed to capture the page
    #[error("Rendering failed: {0}")]
    Render(String),

    /// Navigation did not settle in time
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// HTTP hosting failure
    #[error("Server error: {0}")]
    Server(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// What went wrong while resolving a request path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The url segment is not an absolute URL (or is not decodable)
    #[error("Invalid `url`: {0}")]
    InvalidUrl(String),

    /// The size/aspect-ratio combination has no viewport
    #[error("{}", USAGE_MESSAGE)]
    Usage,

    /// The zoom segment names no known zoom level
    #[error("Invalid `zoom`: {0}")]
    InvalidZoom(String),
}

/// A resolution failure together with whatever viewport was computed before
/// the failure was detected. The placeholder image is sized from it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub viewport: Option<Viewport>,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, viewport: Option<Viewport>) -> Self {
        Self { kind, viewport }
    }
}
