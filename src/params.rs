//! Request path resolution
//!
//! Turns `/<percent-encoded-url>/[size]/[aspect]/[zoom]/` into a fully
//! populated [`ResolvedParameters`] or a [`ValidationError`] carrying the
//! partially computed viewport.

use crate::error::{ValidationError, ValidationErrorKind};
use crate::{viewport, ImageFormat, Viewport};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Segment prefix that marks a cache-busting token, e.g. `_20210802`
const CACHE_BUST_PREFIX: char = '_';

const DEFAULT_SIZE: &str = "small";
const DEFAULT_ASPECT: &str = "1:1";
const DEFAULT_ZOOM: &str = "standard";

/// Inbound request, reduced to the only thing the pipeline reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub raw_path: String,
}

impl CaptureRequest {
    pub fn new(raw_path: impl Into<String>) -> Self {
        Self { raw_path: raw_path.into() }
    }
}

/// Named target dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
    Opengraph,
}

impl FromStr for SizeClass {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(SizeClass::Small),
            "medium" => Ok(SizeClass::Medium),
            "large" => Ok(SizeClass::Large),
            "opengraph" => Ok(SizeClass::Opengraph),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SizeClass::Small => "small",
            SizeClass::Medium => "medium",
            SizeClass::Large => "large",
            SizeClass::Opengraph => "opengraph",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
}

impl FromStr for AspectRatio {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1:1" => Ok(AspectRatio::Square),
            "9:16" => Ok(AspectRatio::Portrait),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "9:16",
        })
    }
}

/// Pixel density modifier, independent of the size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomLevel {
    Smaller,
    Standard,
    Bigger,
}

impl ZoomLevel {
    pub fn device_pixel_ratio(&self) -> f64 {
        match self {
            ZoomLevel::Smaller => 0.71428571,
            ZoomLevel::Standard => 1.0,
            ZoomLevel::Bigger => 1.4,
        }
    }
}

impl FromStr for ZoomLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smaller" => Ok(ZoomLevel::Smaller),
            "standard" => Ok(ZoomLevel::Standard),
            "bigger" => Ok(ZoomLevel::Bigger),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ZoomLevel::Smaller => "smaller",
            ZoomLevel::Standard => "standard",
            ZoomLevel::Bigger => "bigger",
        })
    }
}

/// Everything needed to perform one capture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedParameters {
    pub url: Url,
    pub size_class: SizeClass,
    pub aspect_ratio: AspectRatio,
    pub zoom_level: ZoomLevel,
    pub viewport: Viewport,
    pub device_pixel_ratio: f64,
    pub image_format: ImageFormat,
}

/// Positional path segments. `None` means absent, empty, or a cache buster.
#[derive(Debug, Default, PartialEq, Eq)]
struct PathTokens<'a> {
    url: Option<&'a str>,
    size: Option<&'a str>,
    aspect: Option<&'a str>,
    zoom: Option<&'a str>,
}

impl<'a> PathTokens<'a> {
    fn split(raw_path: &'a str) -> Self {
        let path = raw_path.split(['?', '#']).next().unwrap_or_default();
        let mut segments = path.trim_matches('/').split('/');
        let url = segments.next().filter(|s| !s.is_empty());
        let mut option = || {
            segments
                .next()
                .filter(|s| !s.is_empty() && !s.starts_with(CACHE_BUST_PREFIX))
        };
        Self {
            url,
            size: option(),
            aspect: option(),
            zoom: option(),
        }
    }
}

/// Resolve a request path. Pure: the same path always yields the same value.
pub fn resolve(raw_path: &str) -> Result<ResolvedParameters, ValidationError> {
    let tokens = PathTokens::split(raw_path);

    let size_token = tokens.size.unwrap_or(DEFAULT_SIZE);
    let aspect_token = tokens.aspect.unwrap_or(DEFAULT_ASPECT);
    let zoom_token = tokens.zoom.unwrap_or(DEFAULT_ZOOM);

    let size = size_token.parse::<SizeClass>().ok();
    let aspect = aspect_token.parse::<AspectRatio>().ok();
    let zoom = zoom_token.parse::<ZoomLevel>().ok();
    let viewport = viewport::lookup(size, aspect, zoom);

    let fail = |kind| ValidationError::new(kind, viewport);

    let url_token = tokens.url.unwrap_or_default();
    let candidate = percent_decode(url_token)
        .ok_or_else(|| fail(ValidationErrorKind::InvalidUrl(url_token.to_string())))?;
    let url = parse_absolute(&candidate)
        .ok_or_else(|| fail(ValidationErrorKind::InvalidUrl(candidate.clone())))?;

    let (Some(size_class), Some(viewport)) = (size, viewport) else {
        return Err(fail(ValidationErrorKind::Usage));
    };
    let zoom_level =
        zoom.ok_or_else(|| fail(ValidationErrorKind::InvalidZoom(zoom_token.to_string())))?;

    Ok(ResolvedParameters {
        url,
        size_class,
        // only opengraph reaches here with an unrecognized aspect, and it ignores it
        aspect_ratio: aspect.unwrap_or(AspectRatio::Square),
        zoom_level,
        viewport,
        device_pixel_ratio: zoom_level.device_pixel_ratio(),
        image_format: ImageFormat::Jpeg,
    })
}

fn parse_absolute(candidate: &str) -> Option<Url> {
    let url = Url::parse(candidate).ok()?;
    url.host_str().filter(|h| !h.is_empty())?;
    Some(url)
}

/// Strict percent-decoding: `+` is literal, malformed escapes and invalid
/// UTF-8 are rejected.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3)?;
                let hi = (hex[0] as char).to_digit(16)?;
                let lo = (hex[1] as char).to_digit(16)?;
                out.push(((hi << 4) | lo) as u8);
                i += 3;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8(out).ok()
}
