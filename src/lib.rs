//! Pageshot
//!
//! A single-endpoint screenshot service. A request path such as
//! `/https%3A%2F%2Fwww.11ty.dev%2F/small/1:1/smaller/` is resolved into a
//! target URL plus a viewport and device pixel ratio, a headless browser
//! renders the page, and the image (or a placeholder SVG on any failure) is
//! returned as an HTTP response that always carries status 200.
//!
//! # Features
//!
//! - **CDP Backend** (default): renders through headless Chrome via the
//!   Chrome DevTools Protocol
//! - **Pluggable renderer**: the browser sits behind the [`Renderer`] trait,
//!   so tests and alternative backends can drive the same pipeline
//! - **Bounded sessions**: one browser session per request, released on every
//!   exit path
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "cdp")]
//! # fn main() {
//! use pageshot::{CaptureConfig, CaptureRequest, Dispatcher};
//! use pageshot::cdp::ChromeRenderer;
//!
//! let dispatcher = Dispatcher::new(ChromeRenderer::default(), CaptureConfig::default());
//! let request = CaptureRequest::new("/https%3A%2F%2Fexample.com%2F/medium/9:16/");
//! let response = dispatcher.handle(&request);
//! assert_eq!(response.status_code, 200);
//! # }
//! # #[cfg(not(feature = "cdp"))]
//! # fn main() {}
//! ```

use serde::Serialize;
use std::fmt;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result, ValidationError, ValidationErrorKind};

pub mod capture;
pub mod params;
pub mod response;
pub mod server;
pub mod viewport;

#[cfg(feature = "cdp")]
pub mod cdp;

pub use capture::{CaptureResult, Dispatcher};
pub use params::{resolve, AspectRatio, CaptureRequest, ResolvedParameters, SizeClass, ZoomLevel};
pub use response::{Failure, HttpResponse};
pub use server::{ScreenshotServer, ServerConfig, ServerHandle};

/// Upper bound for navigation (load + network quiescence)
pub const DEFAULT_TIMEOUT_MS: u64 = 8500;

/// JPEG quality used for every capture
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Per-capture configuration
///
/// The defaults reproduce the public endpoint's behaviour: an 8.5 second
/// navigation bound, JPEG quality 80, and JavaScript enabled.
///
/// # Examples
///
/// ```
/// let cfg = pageshot::CaptureConfig::default();
/// assert_eq!(cfg.timeout_ms, 8500);
/// assert!(cfg.enable_javascript);
/// ```
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Timeout for navigation in milliseconds
    pub timeout_ms: u64,
    /// Quality passed to the renderer for JPEG captures
    pub jpeg_quality: u8,
    /// Whether the page may run scripts
    pub enable_javascript: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            enable_javascript: true,
        }
    }
}

impl CaptureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Encoded image format produced by a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }

    pub fn mime_type(&self) -> String {
        format!("image/{}", self.as_str())
    }

    /// Quality to request from the renderer; only JPEG is lossy.
    pub fn quality(&self, jpeg_quality: u8) -> Option<u8> {
        match self {
            ImageFormat::Jpeg => Some(jpeg_quality),
            ImageFormat::Png => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Surface presented to the page when a session is launched
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub viewport: Viewport,
    pub device_pixel_ratio: f64,
}

/// How a session should load its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigateOptions {
    /// Bound on the whole navigation; exceeding it is [`Error::Timeout`]
    pub timeout: Duration,
    pub enable_javascript: bool,
}

/// A rendering backend able to start isolated browser sessions.
///
/// Implementations must hand out a fresh session per call; sessions are never
/// shared between requests.
pub trait Renderer {
    type Session: RenderSession;

    /// Launch a session whose viewport and pixel density match `options`
    fn launch(&self, options: &SessionOptions) -> Result<Self::Session>;
}

/// A single live browser session
pub trait RenderSession {
    /// Navigate and wait for the load event plus network quiescence
    fn navigate(&mut self, url: &str, options: &NavigateOptions) -> Result<()>;

    /// Capture the visible viewport as encoded image bytes
    fn capture(&mut self, format: ImageFormat, quality: Option<u8>) -> Result<Vec<u8>>;

    /// Terminate the session and release the browser
    fn close(self) -> Result<()>;
}
