use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pageshot::{CaptureConfig, CaptureRequest, Dispatcher, ScreenshotServer, ServerConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pageshot",
    version,
    about = "Render a percent-encoded URL path into a screenshot"
)]
struct Cli {
    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info", env = "PAGESHOT_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the screenshot endpoint over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080", env = "PAGESHOT_BIND")]
        bind: String,
        /// Worker threads (defaults to the number of CPUs)
        #[arg(long, env = "PAGESHOT_WORKERS")]
        workers: Option<usize>,
        #[command(flatten)]
        capture: CaptureArgs,
    },
    /// Render one request path and print the function-style JSON response
    Render {
        /// Request path, e.g. /https%3A%2F%2Fexample.com%2F/small/1:1/
        path: String,
        /// Write the decoded body (image or placeholder SVG) here instead
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        capture: CaptureArgs,
    },
    /// Print the parameters a request path resolves to
    Resolve { path: String },
}

#[derive(Args)]
struct CaptureArgs {
    /// Navigation timeout in milliseconds
    #[arg(long, default_value_t = pageshot::DEFAULT_TIMEOUT_MS, env = "PAGESHOT_TIMEOUT_MS")]
    timeout_ms: u64,
    /// Disable JavaScript in rendered pages
    #[arg(long, env = "PAGESHOT_NO_JAVASCRIPT")]
    no_javascript: bool,
    /// Chrome/Chromium binary to launch
    #[arg(long, env = "PAGESHOT_CHROME_PATH")]
    chrome_path: Option<PathBuf>,
    /// Launch Chrome without its sandbox (containers running as root)
    #[arg(long, env = "PAGESHOT_NO_SANDBOX")]
    no_sandbox: bool,
}

impl CaptureArgs {
    fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            timeout_ms: self.timeout_ms,
            enable_javascript: !self.no_javascript,
            ..Default::default()
        }
    }

    #[cfg(feature = "cdp")]
    fn dispatcher(&self) -> Dispatcher<pageshot::cdp::ChromeRenderer> {
        let chrome = pageshot::cdp::ChromeConfig {
            path: self.chrome_path.clone(),
            sandbox: !self.no_sandbox,
            ..Default::default()
        };
        Dispatcher::new(pageshot::cdp::ChromeRenderer::new(chrome), self.capture_config())
    }
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Command::Resolve { path } => match pageshot::resolve(&path) {
            Ok(params) => println!("{}", serde_json::to_string_pretty(&params)?),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(2);
            }
        },
        #[cfg(feature = "cdp")]
        Command::Render { path, output, capture } => {
            let response = capture.dispatcher().handle(&CaptureRequest::new(path));
            match output {
                Some(file) => {
                    let bytes = response.body_bytes()?;
                    std::fs::write(&file, bytes)
                        .with_context(|| format!("Failed to write {}", file.display()))?;
                    if let Some(message) = response.header(pageshot::response::ERROR_HEADER) {
                        eprintln!("Wrote placeholder: {}", message);
                    }
                }
                None => println!("{}", serde_json::to_string(&response)?),
            }
        }
        #[cfg(feature = "cdp")]
        Command::Serve { bind, workers, capture } => {
            let config = ServerConfig {
                bind,
                workers: workers.unwrap_or_else(num_cpus::get),
            };
            ScreenshotServer::bind(&config, capture.dispatcher())?.run()?;
        }
        #[cfg(not(feature = "cdp"))]
        Command::Render { .. } | Command::Serve { .. } => {
            anyhow::bail!("this build has no renderer; enable the `cdp` feature");
        }
    }

    Ok(())
}
