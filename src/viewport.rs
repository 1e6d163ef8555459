//! Viewport lookup table
//!
//! A combination with no entry is unsupported. `opengraph` is keyed by zoom
//! instead of aspect ratio: every entry yields a 1200x630 image once the
//! device pixel ratio is applied.

use crate::params::{AspectRatio, SizeClass, ZoomLevel};
use crate::Viewport;

const SIZED: &[(SizeClass, AspectRatio, Viewport)] = &[
    (SizeClass::Small, AspectRatio::Square, Viewport::new(375, 375)),
    (SizeClass::Small, AspectRatio::Portrait, Viewport::new(375, 667)),
    (SizeClass::Medium, AspectRatio::Square, Viewport::new(650, 650)),
    (SizeClass::Medium, AspectRatio::Portrait, Viewport::new(650, 1156)),
    (SizeClass::Large, AspectRatio::Square, Viewport::new(1024, 1024)),
];

const OPENGRAPH: &[(ZoomLevel, Viewport)] = &[
    (ZoomLevel::Bigger, Viewport::new(857, 450)),
    (ZoomLevel::Smaller, Viewport::new(1680, 882)),
];

/// Used for `opengraph` at standard zoom and for unrecognized zoom tokens.
const OPENGRAPH_DEFAULT: Viewport = Viewport::new(1200, 630);

/// Look up a viewport. `None` arguments stand for tokens that did not parse.
pub fn lookup(
    size: Option<SizeClass>,
    aspect: Option<AspectRatio>,
    zoom: Option<ZoomLevel>,
) -> Option<Viewport> {
    match size? {
        SizeClass::Opengraph => Some(
            zoom.and_then(|z| OPENGRAPH.iter().find(|(k, _)| *k == z).map(|(_, v)| *v))
                .unwrap_or(OPENGRAPH_DEFAULT),
        ),
        size => {
            let aspect = aspect?;
            SIZED
                .iter()
                .find(|(s, a, _)| *s == size && *a == aspect)
                .map(|(_, _, v)| *v)
        }
    }
}

/// Every (size, aspect) pair that has a viewport, ignoring `opengraph`.
pub fn supported_combinations() -> impl Iterator<Item = (SizeClass, AspectRatio, Viewport)> {
    SIZED.iter().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_portrait_is_unsupported() {
        assert_eq!(lookup(Some(SizeClass::Large), Some(AspectRatio::Portrait), None), None);
    }

    #[test]
    fn opengraph_ignores_aspect() {
        for aspect in [None, Some(AspectRatio::Square), Some(AspectRatio::Portrait)] {
            assert_eq!(
                lookup(Some(SizeClass::Opengraph), aspect, Some(ZoomLevel::Bigger)),
                Some(Viewport::new(857, 450))
            );
        }
        assert_eq!(lookup(Some(SizeClass::Opengraph), None, None), Some(OPENGRAPH_DEFAULT));
    }

    #[test]
    fn unknown_size_has_no_viewport() {
        assert_eq!(lookup(None, Some(AspectRatio::Square), Some(ZoomLevel::Standard)), None);
    }

    #[test]
    fn opengraph_output_is_always_1200_wide() {
        for zoom in [ZoomLevel::Smaller, ZoomLevel::Standard, ZoomLevel::Bigger] {
            let vp = lookup(Some(SizeClass::Opengraph), None, Some(zoom)).unwrap();
            let width = (vp.width as f64 * zoom.device_pixel_ratio()).round();
            assert!((width - 1200.0).abs() <= 1.0, "{zoom:?} gives {width}");
        }
    }
}
