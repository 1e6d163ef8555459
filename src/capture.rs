//! Capture dispatch: one request, one browser session, one response

use crate::params::{resolve, CaptureRequest, ResolvedParameters};
use crate::response::{Failure, HttpResponse};
use crate::{
    CaptureConfig, Error, ImageFormat, NavigateOptions, RenderSession, Renderer, Result,
    SessionOptions,
};
use base64::Engine as Base64Engine;
use log::{debug, info, warn};

/// Encoded image produced by a successful capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl CaptureResult {
    pub fn mime_type(&self) -> String {
        self.format.mime_type()
    }

    /// Transport encoding of the image bytes
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// Owns a live session and closes it when dropped.
///
/// [`SessionGuard::release`] closes explicitly so the caller can observe a
/// close failure; every other exit path (early return, `?`, unwinding) goes
/// through `Drop`.
struct SessionGuard<S: RenderSession> {
    session: Option<S>,
}

impl<S: RenderSession> SessionGuard<S> {
    fn new(session: S) -> Self {
        Self { session: Some(session) }
    }

    fn session(&mut self) -> Result<&mut S> {
        self.session
            .as_mut()
            .ok_or_else(|| Error::Other("Rendering session already released".to_string()))
    }

    fn release(mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => session.close(),
            None => Ok(()),
        }
    }
}

impl<S: RenderSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close() {
                warn!("Failed to close rendering session: {}", e);
            }
        }
    }
}

/// Drives a [`Renderer`] for each request and assembles the HTTP response.
///
/// The dispatcher holds no per-request state; it can be shared across worker
/// threads as long as the renderer can.
pub struct Dispatcher<R> {
    renderer: R,
    config: CaptureConfig,
}

impl<R: Renderer> Dispatcher<R> {
    pub fn new(renderer: R, config: CaptureConfig) -> Self {
        Self { renderer, config }
    }

    /// Render `params.url` and return the encoded image.
    ///
    /// A fresh session is launched and always closed before returning,
    /// whichever way the capture ends.
    pub fn capture(&self, params: &ResolvedParameters) -> Result<CaptureResult> {
        let session = self.renderer.launch(&SessionOptions {
            viewport: params.viewport,
            device_pixel_ratio: params.device_pixel_ratio,
        })?;
        let mut guard = SessionGuard::new(session);

        let navigate = NavigateOptions {
            timeout: self.config.timeout(),
            enable_javascript: self.config.enable_javascript,
        };
        let format = params.image_format;

        let session = guard.session()?;
        session.navigate(params.url.as_str(), &navigate)?;
        let bytes = session.capture(format, format.quality(self.config.jpeg_quality))?;

        if let Err(e) = guard.release() {
            warn!("Failed to close rendering session after capture: {}", e);
        }

        Ok(CaptureResult { bytes, format })
    }

    /// Full request pipeline: resolve, capture, and collapse any failure into
    /// the placeholder response.
    pub fn handle(&self, request: &CaptureRequest) -> HttpResponse {
        debug!("Handling {}", request.raw_path);
        let outcome = self.run(request);
        if let Err(failure) = &outcome {
            warn!("Error {}: {}", request.raw_path, failure.message);
        }
        HttpResponse::from_outcome(outcome)
    }

    fn run(&self, request: &CaptureRequest) -> std::result::Result<CaptureResult, Failure> {
        let params = resolve(&request.raw_path).map_err(Failure::from)?;
        let result = self
            .capture(&params)
            .map_err(|e| Failure::new(e.to_string(), Some(params.viewport)))?;

        info!(
            "{} {} viewport={} size={} dpr={} aspectratio={}",
            params.url,
            params.image_format,
            params.viewport,
            params.size_class,
            params.device_pixel_ratio,
            params.aspect_ratio
        );
        Ok(result)
    }
}
