// External-tool probing and bounded subprocess execution

use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use super::errors::DownloadError;

/// Probe subprocesses get a hard bound so a wedged binary cannot hang the
/// caller forever.
pub const PROBE_TIMEOUT_SECS: u64 = 10;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Keep child processes from flashing a console window on Windows.
pub(crate) fn hide_console(cmd: &mut TokioCommand) {
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);
    #[cfg(not(windows))]
    let _ = cmd;
}

/// Run a command to completion with a timeout, capturing stdout and stderr.
/// The child is killed if the bound expires.
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut cmd = TokioCommand::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    hide_console(&mut cmd);

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DownloadError::ToolNotFound(program.to_string())
        } else {
            DownloadError::ToolFailed(format!("failed to start {}: {}", program, e))
        }
    })?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::ToolFailed(format!("no stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::ToolFailed(format!("no stderr from {}", program)))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf).await;
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr_pipe.read_to_end(&mut buf).await;
        buf
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status_res) => {
            let status = status_res
                .map_err(|e| DownloadError::ToolFailed(format!("failed to wait for {}: {}", program, e)))?;
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::ToolFailed(format!(
                "{} timed out after {}s",
                program, timeout_secs
            )))
        }
    }
}

/// Verify that the given merge/media tool is invocable.
///
/// Runs `<tool> -version` with output discarded. Launch failure, non-zero
/// exit, abnormal termination and timeout all count as unavailable. An
/// empty argument probes the bare `ffmpeg` name from PATH.
pub async fn ensure_tool_available(tool: &str) -> Result<(), DownloadError> {
    let name = if tool.is_empty() { "ffmpeg" } else { tool };

    match run_output_with_timeout(name, &["-version".to_string()], PROBE_TIMEOUT_SECS).await {
        Ok(out) if out.status.success() => Ok(()),
        Ok(_) | Err(_) => {
            eprintln!("[tools] probe failed for {}", name);
            Err(DownloadError::ToolNotFound(name.to_string()))
        }
    }
}
