// The `hue_vision` binary: a JSON-lines transport around one detection session.
//
// Each stdin line is a request (a frame, `{"ping": true}` or `{"reset": true}`)
// and produces exactly one stdout line. Logs go to stderr so stdout stays a
// clean response stream.

use anyhow::Context;
use clap::Parser;
use hue_vision::{ClientMessage, DetectionSession, DetectorSettings, FrameResponse};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hue_vision", about = "Label and track colored shapes in a stream of frames")]
struct Args {
    /// JSON file overriding the default detector settings.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let settings = match &args.settings {
        Some(path) => DetectorSettings::from_json_file(path)
            .with_context(|| format!("loading detector settings from {}", path.display()))?,
        None => DetectorSettings::default(),
    };

    let (handle, task) = DetectionSession::spawn(settings);
    info!("reading frames from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ClientMessage>(line) {
            Ok(ClientMessage::Ping { .. }) => FrameResponse::ok(),
            Ok(ClientMessage::Reset { .. }) => {
                handle.reset().await?;
                FrameResponse::ok()
            }
            Ok(ClientMessage::Frame(request)) => handle.process(request).await?,
            Err(e) => {
                warn!(error = %e, "unparseable request line");
                FrameResponse::error(format!("Invalid request: {e}"))
            }
        };

        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    info!("stdin closed, shutting down");
    handle.shutdown().await?;
    task.await?;
    Ok(())
}
