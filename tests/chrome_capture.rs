//! Real browser captures against a local page server

#![cfg(feature = "cdp")]

use pageshot::cdp::ChromeRenderer;
use pageshot::{CaptureConfig, CaptureRequest, Dispatcher};
use std::sync::Once;
use tiny_http::{Response, Server};

static INIT: Once = Once::new();

/// Start a simple test HTTP server
fn start_page_server() -> String {
    INIT.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18090").unwrap();
            for request in server.incoming_requests() {
                let response = match request.url() {
                    "/" => Response::from_string(
                        r#"<!DOCTYPE html>
<html>
<head><title>Capture Page</title></head>
<body style="background:#1f6feb"><h1>Hello from the capture test</h1></body>
</html>"#,
                    )
                    .with_header(
                        "Content-Type: text/html; charset=utf-8"
                            .parse::<tiny_http::Header>()
                            .unwrap(),
                    ),
                    // never answers within the navigation bound
                    "/slow" => {
                        std::thread::sleep(std::time::Duration::from_secs(3));
                        Response::from_string("<html><body>late</body></html>")
                    }
                    _ => Response::from_string("Not Found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });
        std::thread::sleep(std::time::Duration::from_millis(100));
    });

    "http://127.0.0.1:18090".to_string()
}

fn encode(url: &str) -> String {
    url.replace(':', "%3A").replace('/', "%2F")
}

fn request_for(page: &str, options: &str) -> CaptureRequest {
    CaptureRequest::new(format!("/{}/{}", encode(page), options))
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_capture_jpeg() {
    let base = start_page_server();
    let dispatcher = Dispatcher::new(ChromeRenderer::default(), CaptureConfig::default());

    let response = dispatcher.handle(&request_for(&format!("{}/", base), "small/1:1/"));
    assert_eq!(
        response.content_type(),
        Some("image/jpeg"),
        "{:?}",
        response.header("x-error-message")
    );

    let jpeg = response.body_bytes().unwrap();
    // JPEG files start with the SOI marker
    assert_eq!(&jpeg[0..2], b"\xff\xd8");
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_error_status_page_is_still_captured() {
    let base = start_page_server();
    let dispatcher = Dispatcher::new(ChromeRenderer::default(), CaptureConfig::default());

    let response = dispatcher.handle(&request_for(&format!("{}/missing", base), ""));
    assert_eq!(response.content_type(), Some("image/jpeg"));
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_slow_page_times_out() {
    let base = start_page_server();
    let config = CaptureConfig { timeout_ms: 1000, ..Default::default() };
    let dispatcher = Dispatcher::new(ChromeRenderer::default(), config);

    let response = dispatcher.handle(&request_for(&format!("{}/slow", base), ""));
    assert_eq!(response.status_code, 200);
    assert_eq!(response.content_type(), Some("image/svg+xml"));
    // the page stalls before sending headers, which is still the navigation bound
    assert_eq!(
        response.header("x-error-message"),
        Some("Navigation timed out after 1000ms")
    );
}
