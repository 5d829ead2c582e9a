//! veogen CLI
//!
//! Generates a video from a prompt (and optional image) with the fal.ai Veo3
//! model. Progress goes to stderr, the video URL to stdout.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use veogen_cli::download;
use veogen_cli::generate::{self, render_progress};
use veogen_core::{AspectRatio, DurationHint, ImageRef, JobRequest};
use veogen_daemon::gateway::FalClient;
use veogen_daemon::registry::TaskRegistry;
use veogen_daemon::relay::{RelayConfig, TaskRelay};

#[derive(Parser, Debug)]
#[command(name = "veogen")]
#[command(version, about = "Generate a video with fal.ai Veo3", long_about = None)]
struct Cli {
    /// Text prompt describing the video
    prompt: String,

    /// Duration hint: short, medium or long
    #[arg(short, long, default_value = "short")]
    duration: DurationHint,

    /// Aspect ratio: 16:9, 9:16 or 1:1
    #[arg(short, long, default_value = "16:9")]
    aspect_ratio: AspectRatio,

    /// Image to animate
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Save the video to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Project directory holding `.veogen/settings.json`
    #[arg(long, env = "VEOGEN_PROJECT_DIR")]
    project_dir: Option<PathBuf>,

    /// Output logs as JSON
    #[arg(long, env = "VEOGEN_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
#[allow(clippy::print_stdout, clippy::print_stderr)]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    veogen_core::tracing_init::init_tracing("veogen_cli=warn,veogen_daemon=warn", cli.log_json);

    let config = veogen_core::config::load_config(cli.project_dir.as_deref())?;
    let api_key = config.credentials.require_api_key()?;
    let gateway = Arc::new(FalClient::new(&config.gateway, api_key)?);
    let relay = TaskRelay::new(
        gateway,
        Arc::new(TaskRegistry::with_defaults()),
        RelayConfig::from(&config.gateway),
    );

    let mut request = JobRequest::new(cli.prompt)
        .with_duration(cli.duration)
        .with_aspect_ratio(cli.aspect_ratio);
    if let Some(path) = cli.image {
        request = request.with_image(ImageRef::File(path));
    }

    eprintln!("Generating video...");
    let record = generate::run(&relay, request, |progress| {
        eprintln!("{}", render_progress(progress));
    })
    .await?;

    println!("{}", record.video_url);

    if let Some(output) = cli.output {
        let client = download::client()?;
        let bytes = download::download(&client, &record.video_url, &output).await?;
        info!(path = %output.display(), bytes, "Download complete");
        eprintln!("Saved to {}", output.display());
    }
    Ok(())
}
