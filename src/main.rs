use clap::{Parser, Subcommand};
use imgproc::config::{self, ServiceConfig};
use imgproc::imaging::{ImageBackend, ToolBackend};
use imgproc::pipeline::Pipeline;
use imgproc::protocol::Response;
use imgproc::server::{Server, shutdown_signal};
use imgproc::{client, output, protocol};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imgproc")]
#[command(about = "TCP service that downscales photos with an external tool")]
#[command(long_about = "\
TCP service that downscales photos with an external tool

Clients connect, send one request, and receive one response:

  DOWN-RESOLUTE <source> <destination>

Photos wider than the maximum resolution (500px by default) are scaled to
exactly that width, keeping their aspect ratio, by running:

  ffmpeg -i <source> -s <W>x<H> <destination>

Responses:
  OK                      resized, or already small enough
  INVALID COMMAND GIVEN   unknown verb
  MALFORMED COMMAND       wrong number of fields or bad encoding
  FILE DOES NOT EXIST     source is missing or not a regular file
  UNREADABLE PHOTO        dimensions could not be read
  RESIZE FAILED           the tool could not be run or exited non-zero

Logging goes to stderr and is controlled by RUST_LOG (default: info).
Run 'imgproc gen-config' to generate a documented imgproc.toml.")]
#[command(version = env!("IMGPROC_BUILD_VERSION"))]
struct Cli {
    /// Config file (stock defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Listen address, host:port (overrides IMGPROC_ADDR and the config file)
    #[arg(long, global = true)]
    addr: Option<String>,

    /// Maximum width in pixels
    #[arg(long, global = true)]
    max_resolution: Option<u32>,

    /// Resize tool program
    #[arg(long, global = true)]
    tool: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the service until SIGINT or SIGTERM (the default)
    Serve,
    /// Show the dimensions and resize plan for a photo without running the tool
    Plan {
        /// Photo to inspect
        photo: PathBuf,
    },
    /// Send one DOWN-RESOLUTE request to a running service
    Send {
        /// Source photo path, as seen by the service
        source: PathBuf,
        /// Destination path, as seen by the service
        destination: PathBuf,
    },
    /// Print a stock imgproc.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Command::GenConfig) => {
            print!("{}", config::stock_config_toml());
        }
        Some(Command::Plan { photo }) => {
            let config = resolve_config(&cli)?;
            let pipeline = Pipeline::new(ToolBackend::from_config(&config.tool), &config.resize);
            let metadata = pipeline.backend().identify(photo)?;
            let target = pipeline.target_for(metadata)?;
            output::print_plan(
                photo,
                metadata,
                pipeline.max_resolution(),
                target,
                pipeline.backend().program(),
            );
        }
        Some(Command::Send {
            source,
            destination,
        }) => {
            let config = resolve_config(&cli)?;
            let command = protocol::Command::down_resolute(source, destination);
            let runtime = tokio::runtime::Runtime::new()?;
            let response =
                runtime.block_on(client::send_request(&config.server.address, &command))?;
            output::print_send(&command, &response);
            if response != Response::Ok.as_str() {
                return Err(format!("request was not accepted: {response:?}").into());
            }
        }
        Some(Command::Serve) | None => {
            let config = resolve_config(&cli)?;
            init_tracing();
            serve(config)?;
        }
    }

    Ok(())
}

/// Stock defaults, then the config file, then the environment, then flags.
fn resolve_config(cli: &Cli) -> Result<ServiceConfig, config::ConfigError> {
    let base = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ServiceConfig::default(),
    };
    let mut config = base.with_env_overrides(|key| std::env::var(key).ok());

    if let Some(addr) = &cli.addr {
        config.server.address = addr.clone();
    }
    if let Some(max) = cli.max_resolution {
        config.resize.max_resolution = max;
    }
    if let Some(tool) = &cli.tool {
        config.tool.program = tool.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Log to stderr; `RUST_LOG` overrides the default `info` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Bind, serve until a shutdown signal, then give any header reads still on
/// the blocking pool the grace period before the runtime is torn down.
fn serve(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let grace = config.server.shutdown_grace();
    let pipeline = Pipeline::new(ToolBackend::from_config(&config.tool), &config.resize);

    let result = runtime.block_on(async {
        let server = Server::bind(&config.server, pipeline).await?;
        info!(
            address = %server.local_addr()?,
            max_resolution = config.resize.max_resolution,
            tool = %config.tool.program,
            "image processing service is now running"
        );
        server.run(shutdown_signal()).await
    });

    runtime.shutdown_timeout(grace);
    result?;
    Ok(())
}
