//! HTTP hosting adapter backed by `tiny_http`
//!
//! A fixed pool of worker threads pulls requests off one listener and hands
//! the raw (still percent-encoded) path to [`Dispatcher::handle`].

use crate::capture::Dispatcher;
use crate::params::CaptureRequest;
use crate::response::HttpResponse;
use crate::{Error, Renderer, Result};
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};

const RECV_TIMEOUT: Duration = Duration::from_millis(250);

/// Listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0:8080`; port 0 picks a free port
    pub bind: String,
    /// Number of worker threads, each handling one request at a time
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            workers: num_cpus::get(),
        }
    }
}

/// A bound listener that has not started serving yet
pub struct ScreenshotServer<R> {
    server: Arc<Server>,
    dispatcher: Arc<Dispatcher<R>>,
    workers: usize,
}

/// Handle to a running server
pub struct ServerHandle {
    addr: Option<SocketAddr>,
    shutdown: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl<R> ScreenshotServer<R>
where
    R: Renderer + Send + Sync + 'static,
{
    pub fn bind(config: &ServerConfig, dispatcher: Dispatcher<R>) -> Result<Self> {
        if config.workers == 0 {
            return Err(Error::Config("workers must be at least 1".into()));
        }
        let server = Server::http(config.bind.as_str())
            .map_err(|e| Error::Server(format!("Failed to bind {}: {}", config.bind, e)))?;

        Ok(Self {
            server: Arc::new(server),
            dispatcher: Arc::new(dispatcher),
            workers: config.workers,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Start the worker threads and return immediately
    pub fn spawn(self) -> ServerHandle {
        let addr = self.local_addr();
        let shutdown = Arc::new(AtomicBool::new(false));

        let threads = (0..self.workers)
            .map(|_| {
                let server = self.server.clone();
                let dispatcher = self.dispatcher.clone();
                let shutdown = shutdown.clone();
                thread::spawn(move || worker_loop(&server, &dispatcher, &shutdown))
            })
            .collect();

        if let Some(addr) = addr {
            info!("Listening on http://{} with {} workers", addr, self.workers);
        }

        ServerHandle { addr, shutdown, threads }
    }

    /// Serve until every worker exits
    pub fn run(self) -> Result<()> {
        self.spawn().join()
    }
}

impl ServerHandle {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Stop accepting requests and wait for in-flight ones to finish
    pub fn shutdown(self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        self.join()
    }

    fn join(self) -> Result<()> {
        for t in self.threads {
            t.join().map_err(|_| Error::Server("worker thread panicked".into()))?;
        }
        Ok(())
    }
}

fn worker_loop<R: Renderer>(server: &Server, dispatcher: &Dispatcher<R>, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(RECV_TIMEOUT) {
            Ok(Some(request)) => serve(request, dispatcher),
            Ok(None) => continue,
            Err(e) => {
                warn!("Failed to receive request: {}", e);
                break;
            }
        }
    }
}

fn serve<R: Renderer>(request: Request, dispatcher: &Dispatcher<R>) {
    let method = request.method().clone();
    debug!("{} {}", method, request.url());

    let result = match method {
        Method::Get | Method::Head => {
            let response = dispatcher.handle(&CaptureRequest::new(request.url()));
            let head_only = method == Method::Head;
            into_tiny(&response, head_only)
                .and_then(|r| request.respond(r).map_err(|e| Error::Server(e.to_string())))
        }
        _ => {
            let mut response = Response::from_string("Method Not Allowed").with_status_code(405);
            if let Ok(allow) = Header::from_bytes(&b"Allow"[..], &b"GET, HEAD"[..]) {
                response.add_header(allow);
            }
            request.respond(response).map_err(|e| Error::Server(e.to_string()))
        }
    };

    if let Err(e) = result {
        warn!("Failed to write response: {}", e);
    }
}

fn into_tiny(
    response: &HttpResponse,
    head_only: bool,
) -> Result<Response<std::io::Cursor<Vec<u8>>>> {
    let body = if head_only { Vec::new() } else { response.body_bytes()? };
    let mut out = Response::from_data(body).with_status_code(response.status_code);
    for (name, value) in &response.headers {
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(h) => out.add_header(h),
            Err(()) => warn!("Dropping header {} with a non-ASCII value", name),
        }
    }
    Ok(out)
}
