//! Child-process plumbing for external tool invocations.
//!
//! External tools are run to completion with their error stream captured;
//! on Windows, child processes are created without a transient console
//! window.

use std::ffi::OsStr;
use std::process::Stdio;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Suppress the console window a child process would otherwise open.
///
/// On non-Windows targets this is a no-op.
pub fn hide_console_window(cmd: &mut tokio::process::Command) {
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.as_std_mut().creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(windows))]
    {
        let _ = cmd;
    }
}

/// Build a command configured for a run-to-completion tool invocation:
/// stdin closed, stdout and stderr piped, no console window on Windows.
pub fn tool_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    hide_console_window(&mut cmd);
    cmd
}

/// Exit status plus the tool's captured error stream.
///
/// Stdout is drained (a full pipe would block the child) but discarded;
/// stderr is decoded permissively, replacing invalid byte sequences.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: std::process::ExitStatus,
    pub stderr: String,
}

impl ToolOutput {
    /// Exit code, when the process exited normally rather than by signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Run a command to completion, capturing its error stream.
pub async fn run_capture(cmd: &mut tokio::process::Command) -> std::io::Result<ToolOutput> {
    let output = cmd.output().await?;
    Ok(ToolOutput {
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
