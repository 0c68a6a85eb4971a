//! vmbridge command line entry point
//!
//! Runs a host script against the echo machine and a headless terminal,
//! then prints the script's reporter output and the final screen.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use vmbridge::script::{self, ScriptRunner};
use vmbridge::{Bridge, BridgeConfig, EchoLauncher, HeadlessTerminal, MachineLauncher};

#[derive(Parser)]
#[command(name = "vmbridge", version, about = "Script an emulated machine through a terminal console")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Config file (default: <config dir>/vmbridge/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host script to run; without one the machine is just booted
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// OS to boot when no script is given
    #[arg(long, default_value = "linux")]
    os: String,

    /// Terminal width (default: from config)
    #[arg(short = 'w', long)]
    width: Option<u16>,

    /// Terminal height (default: from config)
    #[arg(short = 't', long)]
    height: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting vmbridge v{}", env!("CARGO_PKG_VERSION"));

    match run(&cli).await {
        Ok(()) => {
            info!("vmbridge finished");
            Ok(())
        }
        Err(e) => {
            error!("vmbridge terminated with error: {:#}", e);
            Err(e)
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = BridgeConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let steps = match &cli.script {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("reading script {}", path.display()))?;
            script::parse(&source)?
        }
        None => vec![script::Step::Start(cli.os.clone())],
    };

    let cols = cli.width.unwrap_or(config.terminal.cols);
    let rows = cli.height.unwrap_or(config.terminal.rows);
    info!("Terminal size: {}x{}", cols, rows);

    let (terminal, events) = HeadlessTerminal::new(rows, cols);
    let launcher: Arc<dyn MachineLauncher> =
        Arc::new(EchoLauncher::new().with_channel(&config.machine.output_channel));
    let bridge = Bridge::new(config, Some(launcher), Box::new(terminal.clone()), events).spawn();

    let runner = ScriptRunner::new(bridge.clone()).with_keyboard(terminal.clone());
    let output = runner.run(&steps).await?;

    // Round trip so output still queued in the bridge reaches the screen.
    bridge.print("", false).await?;

    for line in output {
        println!("{}", line);
    }
    println!("--- screen ({}) ---", bridge.status_record().status_text);
    println!("{}", terminal.screen_text());

    drop(runner);
    drop(bridge);
    Ok(())
}
