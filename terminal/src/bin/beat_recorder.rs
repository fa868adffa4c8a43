use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use common::{RecorderConfig, DEFAULT_PORT};
use netplay::RecorderSession;
use terminal::app;
use terminal::logging;
use terminal::views::RecorderView;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "beat-recorder",
    about = "Record a lane sequence and send it to a connected player"
)]
struct Args {
    /// TCP port to accept the player on
    #[arg(long, env = "BEAT_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Stop recording automatically after this many milliseconds
    #[arg(long, env = "BEAT_MAX_DURATION_MS")]
    max_duration_ms: Option<u64>,

    /// Append logs to this file (the UI owns the terminal)
    #[arg(long, env = "BEAT_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init(args.log_file.as_deref())?;

    let session = RecorderSession::new(RecorderConfig {
        max_duration_ms: args.max_duration_ms,
    });
    info!("Starting recorder on port {}", args.port);

    // A failed bind shows up as the session notice; `l` retries it.
    let mut view = RecorderView::new(session, args.port);
    view.listen();

    if let Err(err) = app::run(&mut view).await {
        error!("Recorder exited with error: {:#}", err);
        eprintln!("Error: {:?}", err);
    }
    Ok(())
}
