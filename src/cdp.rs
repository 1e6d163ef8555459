//! Chrome DevTools Protocol renderer (uses the `headless_chrome` crate)

use crate::{Error, ImageFormat, NavigateOptions, RenderSession, Renderer, Result, SessionOptions};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::{Emulation, Page};
use headless_chrome::{Browser, LaunchOptions};
use log::debug;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Browser process settings shared by every session
#[derive(Debug, Clone)]
pub struct ChromeConfig {
    /// Chrome/Chromium binary; `None` lets `headless_chrome` search for one
    pub path: Option<PathBuf>,
    /// Disable only when running as root inside a container
    pub sandbox: bool,
    /// How long an unused browser connection may stay open
    pub idle_browser_timeout: Duration,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            path: None,
            sandbox: true,
            idle_browser_timeout: Duration::from_secs(30),
        }
    }
}

/// Launches one headless Chrome process per session
#[derive(Debug, Clone, Default)]
pub struct ChromeRenderer {
    config: ChromeConfig,
}

impl ChromeRenderer {
    pub fn new(config: ChromeConfig) -> Self {
        Self { config }
    }
}

impl Renderer for ChromeRenderer {
    type Session = ChromeSession;

    fn launch(&self, options: &SessionOptions) -> Result<ChromeSession> {
        // The viewport is the window size; pixel density comes from a launch flag
        let scale_factor = format!("--force-device-scale-factor={}", options.device_pixel_ratio);
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(self.config.sandbox)
            .path(self.config.path.clone())
            .window_size(Some((options.viewport.width, options.viewport.height)))
            .idle_browser_timeout(self.config.idle_browser_timeout)
            .args(vec![OsStr::new(&scale_factor), OsStr::new("--hide-scrollbars")])
            .build()
            .map_err(|e| Error::Initialization(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::Initialization(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::Initialization(format!("Failed to create tab: {}", e)))?;

        debug!(
            "Launched browser session {} at dpr {}",
            options.viewport, options.device_pixel_ratio
        );
        Ok(ChromeSession { browser, tab })
    }
}

/// Lifecycle milestones seen for one document
#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    loaded: bool,
    idle: bool,
}

/// Main-frame lifecycle progress fed by `Page.lifecycleEvent`, keyed by
/// loader id so events from the previous document never count.
#[derive(Debug, Default)]
struct LoadState {
    loaders: Mutex<HashMap<String, Progress>>,
}

impl LoadState {
    fn on_lifecycle(&self, loader_id: &str, name: &str) {
        let Ok(mut loaders) = self.loaders.lock() else {
            return;
        };
        let progress = loaders.entry(loader_id.to_string()).or_default();
        match name {
            "init" => *progress = Progress::default(),
            "load" => progress.loaded = true,
            // Chrome fires this after 500ms with no network connections
            "networkIdle" => progress.idle = true,
            _ => {}
        }
    }

    fn settled(&self, loader_id: &str) -> bool {
        self.loaders
            .lock()
            .map(|loaders| loaders.get(loader_id).is_some_and(|p| p.loaded && p.idle))
            .unwrap_or(false)
    }
}

/// `Page.navigate` blocks until response headers arrive, bounded by the tab's
/// default timeout. A call that fails at or past the deadline is a timeout.
fn navigation_failure(err: impl Display, deadline: Instant, timeout: Duration) -> Error {
    if Instant::now() >= deadline {
        Error::Timeout(timeout.as_millis() as u64)
    } else {
        Error::Load(format!("Navigation failed: {}", err))
    }
}

/// A browser process plus the tab it renders into
pub struct ChromeSession {
    browser: Browser,
    tab: Arc<Tab>,
}

impl RenderSession for ChromeSession {
    fn navigate(&mut self, url: &str, options: &NavigateOptions) -> Result<()> {
        let deadline = Instant::now() + options.timeout;
        self.tab.set_default_timeout(options.timeout);

        if !options.enable_javascript {
            self.tab
                .call_method(Emulation::SetScriptExecutionDisabled { value: true })
                .map_err(|e| {
                    Error::Initialization(format!("Failed to disable JavaScript: {}", e))
                })?;
        }

        let state = Arc::new(LoadState::default());
        let listener_state = state.clone();
        let main_frame = self.tab.get_target_id().clone();
        self.tab
            .add_event_listener(Arc::new(move |event: &Event| {
                if let Event::PageLifecycleEvent(lifecycle) = event {
                    let params = &lifecycle.params;
                    if params.frame_id == main_frame {
                        listener_state.on_lifecycle(&params.loader_id, &params.name);
                    }
                }
            }))
            .map_err(|e| Error::Load(format!("Failed to watch page lifecycle: {}", e)))?;

        let navigation = self
            .tab
            .call_method(Page::Navigate {
                url: url.to_string(),
                referrer: None,
                transition_Type: None,
                frame_id: None,
                referrer_policy: None,
            })
            .map_err(|e| navigation_failure(e, deadline, options.timeout))?;

        if let Some(error_text) = navigation.error_text {
            return Err(Error::Load(format!("Navigation failed: {}", error_text)));
        }
        let Some(loader_id) = navigation.loader_id else {
            return Err(Error::Load("Navigation did not start a new document".to_string()));
        };

        while !state.settled(&loader_id) {
            if Instant::now() >= deadline {
                return Err(Error::Timeout(options.timeout.as_millis() as u64));
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        Ok(())
    }

    fn capture(&mut self, format: ImageFormat, quality: Option<u8>) -> Result<Vec<u8>> {
        let format = match format {
            ImageFormat::Jpeg => Page::CaptureScreenshotFormatOption::Jpeg,
            ImageFormat::Png => Page::CaptureScreenshotFormatOption::Png,
        };

        self.tab
            .capture_screenshot(format, quality.map(u32::from), None, true)
            .map_err(|e| Error::Render(format!("Screenshot failed: {}", e)))
    }

    fn close(self) -> Result<()> {
        // Dropping the browser terminates the child process
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}
