use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use common::{TimingConfig, DEFAULT_HOST, DEFAULT_PORT};
use netplay::PlayerSession;
use terminal::app;
use terminal::logging;
use terminal::views::PlayerView;
use tokio::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "beat-player",
    about = "Connect to a recorder and play back the sequence it sends"
)]
struct Args {
    /// Recorder host to dial
    #[arg(long, env = "BEAT_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Recorder port to dial
    #[arg(long, env = "BEAT_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Give up on a dial after this many milliseconds
    #[arg(long, env = "BEAT_CONNECT_TIMEOUT_MS", default_value_t = 5000)]
    connect_timeout_ms: u64,

    /// JSON file overriding the hit windows and points
    #[arg(long, env = "BEAT_TIMING")]
    timing: Option<PathBuf>,

    /// Append logs to this file (the UI owns the terminal)
    #[arg(long, env = "BEAT_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init(args.log_file.as_deref())?;

    let timing = match &args.timing {
        Some(path) => TimingConfig::from_json_file(path)?,
        None => TimingConfig::default(),
    };
    info!("Using timing {:?}", timing);

    let mut view = PlayerView::new(
        PlayerSession::new(timing),
        args.host,
        args.port,
        Duration::from_millis(args.connect_timeout_ms),
    );
    view.connect();

    if let Err(err) = app::run(&mut view).await {
        error!("Player exited with error: {:#}", err);
        eprintln!("Error: {:?}", err);
    }
    Ok(())
}
