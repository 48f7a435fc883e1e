//! Command-line caller: runs one merge end-to-end, standing in for the host
//! application's GUI layer.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use muxio::Error;
use muxio::config::Settings;
use muxio::muxer::{MuxOutcome, MuxRequest, Muxer};
use muxio::records::{DownloadRecord, InMemoryRecordStore};
use muxio::units::{self, SizeContext};
use muxio::worker;

#[derive(Debug, Parser)]
#[command(
    name = "muxio",
    version,
    about = "Merge a downloaded video stream and audio stream into one container"
)]
struct Args {
    /// Video elementary stream.
    #[arg(long)]
    video: PathBuf,

    /// Audio elementary stream.
    #[arg(long)]
    audio: PathBuf,

    /// Directory for the merged container (defaults to the video's
    /// directory).
    #[arg(long)]
    target_dir: Option<PathBuf>,

    /// Configured base download directory; with --subfolders, merges landing
    /// there are redirected into its Videos subfolder.
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Sort merged videos into a Videos subfolder.
    #[arg(long)]
    subfolders: bool,

    /// Print the outcome as JSON.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    let json = args.json;

    match run(args).await {
        Ok(outcome) => {
            print_outcome(&outcome, json);
            if !outcome.is_completed() {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

async fn run(args: Args) -> muxio::Result<MuxOutcome> {
    let target_dir = match args.target_dir {
        Some(dir) => dir,
        None => args
            .video
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf(),
    };

    let store = Arc::new(InMemoryRecordStore::new());
    store.insert(record_for("video", &args.video).await?).await;
    store.insert(record_for("audio", &args.audio).await?).await;

    let settings = Settings {
        download_dir: args.download_dir.unwrap_or_else(|| target_dir.clone()),
        use_subfolders: args.subfolders,
    };

    let muxer = Arc::new(Muxer::new(store, settings));
    let request = MuxRequest {
        video_gid: "video".to_string(),
        audio_gid: "audio".to_string(),
        target_dir,
    };

    worker::spawn_merge(muxer, request)
        .await
        .map_err(|_| Error::from(std::io::Error::other("merge task aborted")))
}

/// Build a record from a file on disk, sized the way the download layer
/// would have reported it.
async fn record_for(gid: &str, path: &Path) -> muxio::Result<DownloadRecord> {
    let metadata = tokio::fs::metadata(path).await?;
    Ok(DownloadRecord {
        gid: gid.to_string(),
        path: path.to_path_buf(),
        size: units::format_size(metadata.len(), SizeContext::Size),
    })
}

fn print_outcome(outcome: &MuxOutcome, json: bool) {
    if json {
        match serde_json::to_string_pretty(outcome) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => eprintln!("Error: could not render outcome: {e}"),
        }
        return;
    }

    match outcome {
        MuxOutcome::Completed {
            final_path,
            final_size,
        } => println!("Merged into {} ({final_size})", final_path.display()),
        MuxOutcome::RecordNotFound { gid } => {
            eprintln!("Error: no download record for {gid}");
        }
        MuxOutcome::InsufficientSpace {
            required_bytes,
            available_bytes,
        } => eprintln!(
            "Error: need {} but only {} is free",
            units::format_size(*required_bytes, SizeContext::Size),
            units::format_size(*available_bytes, SizeContext::Size),
        ),
        MuxOutcome::ToolNotFound { message } => {
            eprintln!("Error: merge tool not found: {message}");
        }
        MuxOutcome::ToolError { exit_code, stderr } => {
            match exit_code {
                Some(code) => eprintln!("Error: merge tool failed with exit code {code}"),
                None => eprintln!("Error: merge tool was terminated by a signal"),
            }
            if !stderr.is_empty() {
                eprint!("{stderr}");
            }
        }
        MuxOutcome::SizeFormat { message } => {
            eprintln!("Error: malformed size string: {message}");
        }
        MuxOutcome::Io { message } => eprintln!("Error: {message}"),
    }
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "muxio=debug" } else { "muxio=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    fmt().with_env_filter(filter).with_target(false).init();
}
