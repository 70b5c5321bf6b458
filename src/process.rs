//! Subprocess execution with live output streaming
//!
//! Commands are invoked with an explicit argv list (no shell round-trip)
//! and both pipes are drained by concurrent tasks so a full buffer on one
//! stream can never stall the other. The call blocks until the child
//! exits and surfaces the exit status to the caller, which translates a
//! non-zero status into its own stage error.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

async fn drain_lines<R>(stream: R, mut log: impl FnMut(&str))
where
    R: AsyncRead + Unpin,
{
    // Read raw bytes rather than `lines()`: build tools may emit
    // non-UTF-8 output, and one bad byte must not stop the drain.
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                log(line.trim_end_matches(['\r', '\n']));
            }
            Err(e) => {
                warn!(error = %e, "Stopped draining child output stream");
                break;
            }
        }
    }
}

/// Runs a command, streaming stdout to `info!` and stderr to `warn!`,
/// and returns its exit status once it terminates.
pub async fn run(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
) -> Result<ExitStatus, ProcessError> {
    info!(program, ?args, cwd = ?cwd.map(Path::display), "Executing command");

    let mut command = Command::new(program);
    command
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: program.to_string(),
        source,
    })?;

    // Ownership of the pipes moves into the drain tasks; spawn() with
    // Stdio::piped always populates them.
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let prog = program.to_string();
    let stdout_task = tokio::spawn(async move {
        if let Some(stream) = stdout {
            drain_lines(stream, |line| info!(program = %prog, "{}", line)).await;
        }
    });
    let prog = program.to_string();
    let stderr_task = tokio::spawn(async move {
        if let Some(stream) = stderr {
            drain_lines(stream, |line| warn!(program = %prog, "{}", line)).await;
        }
    });

    let status = child.wait().await.map_err(|source| ProcessError::Io {
        program: program.to_string(),
        source,
    })?;

    // Drain tasks finish once the pipes hit EOF; ignore join panics from
    // aborted runtimes.
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    debug!(program, code = ?status.code(), "Command exited");
    Ok(status)
}

/// Runs a shell command line in the given directory.
///
/// Build commands from the config are user-authored command lines
/// ("npm install && npm run build"), so these go through `sh -c` rather
/// than argv splitting. Everything shippy invokes on its own behalf uses
/// [`run`] with an explicit argv.
pub async fn run_shell(command_line: &str, cwd: &Path) -> Result<ExitStatus, ProcessError> {
    run("sh", &["-c", command_line], Some(cwd)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_success() {
        let status = run("true", &[], None).await.unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_run_nonzero_exit() {
        let status = run("false", &[], None).await.unwrap();
        assert!(!status.success());
        assert_eq!(status.code(), Some(1));
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let result = run("definitely-not-a-real-binary", &[], None).await;
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_run_respects_cwd() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker"), "x").unwrap();

        let status = run("ls", &["marker"], Some(dir.path())).await.unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_run_drains_large_output() {
        // Enough output on both streams to overflow a pipe buffer if one
        // were read only after the other completed.
        let script = "seq 1 20000; seq 1 20000 1>&2";
        let dir = TempDir::new().unwrap();
        let status = run_shell(script, dir.path()).await.unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_drain_lines_tolerates_invalid_utf8() {
        // A non-UTF-8 byte mid-stream must not stop the drain; later
        // lines still come through (lossily converted).
        let data: &[u8] = b"before\nbin\xff\xfeary\nafter\n";

        let mut lines = Vec::new();
        drain_lines(data, |line| lines.push(line.to_string())).await;

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "before");
        assert_eq!(lines[2], "after");
        assert!(lines[1].starts_with("bin"));
    }

    #[tokio::test]
    async fn test_drain_lines_handles_missing_trailing_newline() {
        let data: &[u8] = b"only line";

        let mut lines = Vec::new();
        drain_lines(data, |line| lines.push(line.to_string())).await;

        assert_eq!(lines, vec!["only line".to_string()]);
    }

    #[tokio::test]
    async fn test_run_shell_command_line() {
        let dir = TempDir::new().unwrap();
        let status = run_shell("touch created && test -f created", dir.path())
            .await
            .unwrap();
        assert!(status.success());
        assert!(dir.path().join("created").exists());
    }
}
