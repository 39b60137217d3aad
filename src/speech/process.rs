//! Child process execution for the synthesis and playback engines
//!
//! Arguments are always passed as a vector; nothing goes through a shell.
//! Children are spawned with `kill_on_drop`, so dropping the returned future
//! (for example when a deadline expires) terminates the process.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// How a finished child process exited
#[derive(Debug)]
pub struct Exit {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub success: bool,
    pub stderr: String,
}

/// Run `program args...` to completion, optionally feeding `stdin`
///
/// # Errors
///
/// Returns error if the process cannot be spawned or waited on
pub async fn run<I, S>(program: &Path, args: I, stdin: Option<&[u8]>) -> std::io::Result<Exit>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    if let (Some(payload), Some(mut pipe)) = (stdin, child.stdin.take()) {
        // An engine that exits early closes its end; its exit status says why
        match pipe.write_all(payload).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Err(e) => return Err(e),
        }
        // Close stdin so the engine sees EOF
        drop(pipe);
    }

    let output = child.wait_with_output().await?;

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !stderr.is_empty() {
        tracing::debug!(program = %program.display(), stderr = %stderr, "child stderr");
    }

    Ok(Exit {
        code: output.status.code(),
        success: output.status.success(),
        stderr,
    })
}
