//! Capture dispatch and response assembly against a scripted renderer

mod common;

use base64::Engine as _;
use common::{FakeRenderer, Script, FAKE_JPEG};
use pageshot::response::{ERROR_HEADER, PLACEHOLDER_MIME};
use pageshot::{resolve, CaptureConfig, CaptureRequest, Dispatcher, Error, ImageFormat, Viewport};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

const PATH: &str = "/https%3A%2F%2Fexample.com%2F/medium/9:16/bigger/";

fn dispatcher(script: Script) -> (Dispatcher<FakeRenderer>, FakeRenderer) {
    let renderer = FakeRenderer::new(script);
    (Dispatcher::new(renderer.clone(), CaptureConfig::default()), renderer)
}

#[test]
fn successful_capture_returns_base64_jpeg() {
    let (d, renderer) = dispatcher(Script::Succeed);
    let response = d.handle(&CaptureRequest::new(PATH));

    assert_eq!(response.status_code, 200);
    assert_eq!(response.content_type(), Some("image/jpeg"));
    assert!(response.is_base64_encoded);
    assert!(!response.is_placeholder());
    let body = base64::engine::general_purpose::STANDARD
        .decode(&response.body)
        .unwrap();
    assert_eq!(body, FAKE_JPEG);

    let sessions = renderer.tally.sessions.lock().unwrap();
    assert_eq!(sessions[0].viewport, Viewport::new(650, 1156));
    assert_eq!(sessions[0].device_pixel_ratio, 1.4);
}

#[test]
fn navigation_uses_timeout_and_javascript_setting() {
    let renderer = FakeRenderer::new(Script::Succeed);
    let config = CaptureConfig { enable_javascript: false, ..Default::default() };
    let d = Dispatcher::new(renderer.clone(), config);
    d.handle(&CaptureRequest::new(PATH));

    let navigations = renderer.tally.navigations.lock().unwrap();
    let (url, options) = &navigations[0];
    assert_eq!(url, "https://example.com/");
    assert_eq!(options.timeout, Duration::from_millis(8500));
    assert!(!options.enable_javascript);
}

#[test]
fn jpeg_is_captured_at_quality_80() {
    let (d, renderer) = dispatcher(Script::Succeed);
    d.handle(&CaptureRequest::new(PATH));
    assert_eq!(*renderer.tally.captures.lock().unwrap(), vec![(ImageFormat::Jpeg, Some(80))]);
}

#[test]
fn session_is_released_exactly_once_on_every_path() {
    for script in [Script::Succeed, Script::TimeOut, Script::FailNavigate, Script::FailCapture] {
        let (d, renderer) = dispatcher(script);
        let response = d.handle(&CaptureRequest::new(PATH));
        assert_eq!(response.status_code, 200, "{script:?}");
        assert_eq!(renderer.tally.launched(), 1, "{script:?}");
        assert_eq!(renderer.tally.closed(), 1, "{script:?}");
    }
}

#[test]
fn session_is_released_when_the_renderer_panics() {
    let (d, renderer) = dispatcher(Script::PanicOnCapture);
    let result = catch_unwind(AssertUnwindSafe(|| d.handle(&CaptureRequest::new(PATH))));
    assert!(result.is_err());
    assert_eq!(renderer.tally.launched(), 1);
    assert_eq!(renderer.tally.closed(), 1);
}

#[test]
fn launch_failure_has_nothing_to_release() {
    let (d, renderer) = dispatcher(Script::FailLaunch);
    let response = d.handle(&CaptureRequest::new(PATH));
    assert!(response.is_placeholder());
    assert_eq!(renderer.tally.launched(), 0);
    assert_eq!(renderer.tally.closed(), 0);
}

#[test]
fn timeout_surfaces_as_capture_error() {
    let (d, _) = dispatcher(Script::TimeOut);
    let params = resolve(PATH).unwrap();
    let err = d.capture(&params).unwrap_err();
    assert!(matches!(err, Error::Timeout(8500)));

    let response = d.handle(&CaptureRequest::new(PATH));
    assert_eq!(response.header(ERROR_HEADER), Some("Navigation timed out after 8500ms"));
}

#[test]
fn capture_failure_placeholder_uses_resolved_viewport() {
    let (d, _) = dispatcher(Script::FailNavigate);
    let response = d.handle(&CaptureRequest::new(PATH));

    assert_eq!(response.status_code, 200);
    assert_eq!(response.content_type(), Some(PLACEHOLDER_MIME));
    assert!(!response.is_base64_encoded);
    assert!(response.header(ERROR_HEADER).unwrap().contains("net::ERR_NAME_NOT_RESOLVED"));
    assert!(response.body.starts_with(r#"<svg width="650" height="1156""#));
}

#[test]
fn validation_failures_never_reach_the_renderer() {
    let cases = [
        ("/not-a-url/", "Invalid `url`: not-a-url"),
        ("/https%3A%2F%2Fexample.com%2F/large/9:16/", "Incorrect API usage"),
        ("/https%3A%2F%2Fexample.com%2F/small/1:1/huge/", "Invalid `zoom`: huge"),
    ];
    for (path, message) in cases {
        let (d, renderer) = dispatcher(Script::Succeed);
        let response = d.handle(&CaptureRequest::new(path));
        assert_eq!(response.status_code, 200);
        assert_eq!(response.content_type(), Some(PLACEHOLDER_MIME));
        assert!(response.header(ERROR_HEADER).unwrap().starts_with(message), "{path}");
        assert_eq!(renderer.tally.launched(), 0);
    }
}

#[test]
fn unsupported_combination_placeholder_has_no_size() {
    let (d, _) = dispatcher(Script::Succeed);
    let response = d.handle(&CaptureRequest::new("/https%3A%2F%2Fexample.com%2F/large/9:16/"));
    assert!(response.body.starts_with("<svg viewBox="));
}
