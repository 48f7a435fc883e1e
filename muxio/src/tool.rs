//! External merge tool invocation.
//!
//! The tool remultiplexes a video elementary stream and an audio elementary
//! stream into one container without re-encoding. Only the way the
//! executable is located differs per platform; the argument vector does not.

use std::env;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::{Error, Result};

/// Environment variable overriding the tool's location.
pub const TOOL_PATH_ENV: &str = "FFMPEG_PATH";

/// Remultiplexes a video stream and an audio stream into one container.
#[async_trait]
pub trait MergeTool: Send + Sync {
    /// Run the tool to completion. `Ok(())` means exit code zero and an
    /// output file at `output`.
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;
}

/// How the tool executable is found, decided once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolLocation {
    /// Resolved through the OS executable search path.
    SearchPath(String),
    /// A file shipped alongside the running application's own executable.
    BesideExecutable(String),
    /// An explicit path, e.g. from [`TOOL_PATH_ENV`].
    Explicit(PathBuf),
}

impl Default for ToolLocation {
    fn default() -> Self {
        if cfg!(windows) {
            ToolLocation::BesideExecutable("ffmpeg.exe".to_string())
        } else if cfg!(target_os = "macos") {
            ToolLocation::BesideExecutable("ffmpeg".to_string())
        } else {
            ToolLocation::SearchPath("ffmpeg".to_string())
        }
    }
}

/// ffmpeg-backed merge tool.
pub struct FfmpegMerger {
    location: ToolLocation,
}

impl FfmpegMerger {
    pub fn new() -> Self {
        Self {
            location: ToolLocation::default(),
        }
    }

    /// Honor a `FFMPEG_PATH` override, falling back to platform lookup.
    pub fn from_env() -> Self {
        match env::var(TOOL_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::with_location(ToolLocation::Explicit(path.into())),
            _ => Self::new(),
        }
    }

    pub fn with_location(location: ToolLocation) -> Self {
        Self { location }
    }

    /// Resolve the executable for the configured location.
    fn locate(&self) -> Result<PathBuf> {
        match &self.location {
            ToolLocation::SearchPath(name) => Ok(PathBuf::from(name)),
            ToolLocation::Explicit(path) => Ok(path.clone()),
            ToolLocation::BesideExecutable(name) => {
                let exe = env::current_exe().map_err(|e| {
                    Error::ToolNotFound(format!("cannot locate own executable: {e}"))
                })?;
                let dir = exe.parent().unwrap_or_else(|| Path::new("."));
                let path = dir.join(name);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(Error::ToolNotFound(format!(
                        "{name} missing beside {}",
                        dir.display()
                    )))
                }
            }
        }
    }

    /// Stream-copy invocation: both inputs, duration bounded by the shorter
    /// one, first video stream of input 0 and first audio stream of input 1,
    /// errors only, `-strict -2` for experimental audio codecs. Must match
    /// the deployed tool exactly.
    fn build_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        vec![
            OsString::from("-i"),
            OsString::from(video),
            OsString::from("-i"),
            OsString::from(audio),
            OsString::from("-c"),
            OsString::from("copy"),
            OsString::from("-shortest"),
            OsString::from("-map"),
            OsString::from("0:v:0"),
            OsString::from("-map"),
            OsString::from("1:a:0"),
            OsString::from("-loglevel"),
            OsString::from("error"),
            OsString::from("-strict"),
            OsString::from("-2"),
            OsString::from(output),
        ]
    }
}

impl Default for FfmpegMerger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MergeTool for FfmpegMerger {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        let program = self.locate()?;
        let args = Self::build_args(video, audio, output);
        debug!(tool = %program.display(), ?args, "invoking merge tool");

        let mut cmd = process_utils::tool_command(&program);
        cmd.args(&args);

        let tool_output = process_utils::run_capture(&mut cmd).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::ToolNotFound(format!("{} could not be executed", program.display()))
            } else {
                Error::Io(e)
            }
        })?;

        if tool_output.status.success() {
            Ok(())
        } else {
            Err(Error::ToolError {
                exit_code: tool_output.exit_code(),
                stderr: tool_output.stderr,
            })
        }
    }
}
