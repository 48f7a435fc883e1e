//! Merge orchestration.
//!
//! One linear pipeline per request: resolve both records, check free space,
//! resolve the final name, invoke the merge tool, report a terminal
//! [`MuxOutcome`]. No step is retried; the first failure ends the request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::Error;
use crate::capacity::{CapacityProbe, DiskCapacity};
use crate::config::Settings;
use crate::naming::{self, ExtensionOverrides};
use crate::records::{DownloadRecord, RecordStore};
use crate::tool::{FfmpegMerger, MergeTool};
use crate::units::{self, SizeContext};

/// One merge request: both streams confirmed complete, merge the result
/// into `target_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuxRequest {
    pub video_gid: String,
    pub audio_gid: String,
    pub target_dir: PathBuf,
}

/// Terminal outcome of a merge request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MuxOutcome {
    /// The merged container exists at `final_path`; `final_size` is the
    /// human-readable sum of both input sizes.
    Completed {
        final_path: PathBuf,
        final_size: String,
    },
    /// A referenced download has no record; nothing was attempted.
    RecordNotFound { gid: String },
    /// Known free space is below the summed input size; the tool was never
    /// invoked.
    InsufficientSpace {
        required_bytes: u64,
        available_bytes: u64,
    },
    /// The merge tool executable could not be located.
    ToolNotFound { message: String },
    /// The tool exited non-zero; `stderr` is its captured error stream.
    ToolError {
        exit_code: Option<i32>,
        stderr: String,
    },
    /// A stored size string failed to parse: an upstream data defect, not a
    /// user-actionable error.
    SizeFormat { message: String },
    /// Filesystem failure while preparing or cleaning up the output path.
    Io { message: String },
}

impl MuxOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, MuxOutcome::Completed { .. })
    }

    pub fn final_path(&self) -> Option<&Path> {
        match self {
            MuxOutcome::Completed { final_path, .. } => Some(final_path),
            _ => None,
        }
    }
}

impl From<Error> for MuxOutcome {
    fn from(error: Error) -> Self {
        match error {
            Error::RecordNotFound { gid } => MuxOutcome::RecordNotFound { gid },
            Error::InsufficientSpace {
                required_bytes,
                available_bytes,
            } => MuxOutcome::InsufficientSpace {
                required_bytes,
                available_bytes,
            },
            Error::ToolNotFound(message) => MuxOutcome::ToolNotFound { message },
            Error::ToolError { exit_code, stderr } => MuxOutcome::ToolError { exit_code, stderr },
            Error::SizeFormat(message) => MuxOutcome::SizeFormat { message },
            Error::Io(e) => MuxOutcome::Io {
                message: e.to_string(),
            },
        }
    }
}

/// Drives the end-to-end merge pipeline, one request per call.
///
/// Holds no mutable state: concurrent calls for different requests are
/// independent. The tool invocation blocks the calling task until the
/// external process exits, so callers on an interactive path should go
/// through [`crate::worker::spawn_merge`].
pub struct Muxer {
    store: Arc<dyn RecordStore>,
    capacity: Arc<dyn CapacityProbe>,
    tool: Arc<dyn MergeTool>,
    settings: Settings,
    overrides: ExtensionOverrides,
}

impl Muxer {
    pub fn new(store: Arc<dyn RecordStore>, settings: Settings) -> Self {
        Self {
            store,
            capacity: Arc::new(DiskCapacity),
            tool: Arc::new(FfmpegMerger::from_env()),
            settings,
            overrides: ExtensionOverrides::default(),
        }
    }

    pub fn with_capacity(mut self, capacity: Arc<dyn CapacityProbe>) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn MergeTool>) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_overrides(mut self, overrides: ExtensionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Run the pipeline to its terminal outcome.
    pub async fn run(&self, request: &MuxRequest) -> MuxOutcome {
        debug!(
            video_gid = %request.video_gid,
            audio_gid = %request.audio_gid,
            target_dir = %request.target_dir.display(),
            "merge initiated"
        );

        match self.try_run(request).await {
            Ok((final_path, final_size)) => {
                info!(path = %final_path.display(), size = %final_size, "merge completed");
                MuxOutcome::Completed {
                    final_path,
                    final_size,
                }
            }
            Err(e) => {
                if matches!(e, Error::SizeFormat(_)) {
                    error!(error = %e, "size string defect in download records");
                }
                MuxOutcome::from(e)
            }
        }
    }

    async fn try_run(&self, request: &MuxRequest) -> crate::Result<(PathBuf, String)> {
        let video = self.lookup(&request.video_gid).await?;
        let audio = self.lookup(&request.audio_gid).await?;
        debug!(
            video = %video.path.display(),
            audio = %audio.path.display(),
            "records resolved"
        );

        let required_bytes =
            units::parse_size(&video.size)?.saturating_add(units::parse_size(&audio.size)?);
        if let Some(available_bytes) = self.capacity.free_bytes(&request.target_dir) {
            if required_bytes > available_bytes {
                warn!(
                    required_bytes,
                    available_bytes, "refusing merge: not enough free space"
                );
                return Err(Error::InsufficientSpace {
                    required_bytes,
                    available_bytes,
                });
            }
        } else {
            debug!("free space unknown, proceeding without the check");
        }

        let source_name = video
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let reserved = naming::reserve_final_name(
            &source_name,
            &request.target_dir,
            &self.overrides,
            &self.settings,
        )?;
        debug!(path = %reserved.path().display(), "final name resolved");

        let output = reserved.yield_to_writer()?;
        match self.tool.merge(&video.path, &audio.path, &output).await {
            Ok(()) => {
                let final_size = units::format_size(required_bytes, SizeContext::Size);
                Ok((output, final_size))
            }
            Err(e) => {
                remove_partial_output(&output);
                Err(e)
            }
        }
    }

    async fn lookup(&self, gid: &str) -> crate::Result<DownloadRecord> {
        self.store
            .get(gid)
            .await
            .ok_or_else(|| Error::RecordNotFound {
                gid: gid.to_string(),
            })
    }
}

/// Best-effort removal of whatever the failed tool run left behind.
fn remove_partial_output(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "could not remove partial output");
        }
    }
}
