//! Agent subprocess lifecycle
//!
//! Spawns an agent CLI as a child process, streams its output to the
//! terminal while capturing it, enforces an optional timeout, and forwards
//! interrupt/terminate signals to the child's whole process group so that
//! grandchildren spawned by the agent die with it.

use super::agent::AgentKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// One agent invocation. Constructed fresh per spawn; never reused.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub agent: AgentKind,
    pub prompt: String,
    pub working_dir: PathBuf,
    pub model: Option<String>,
    pub timeout: Option<Duration>,
}

/// Captured output of a finished agent process.
///
/// A process killed by a signal has no exit code; that case is normalized
/// to 1 so callers can always branch on an integer.
#[derive(Debug)]
pub struct SpawnResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("'{command}' could not be started: {source}. Please ensure it is installed and in your PATH.")]
    Launch {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {}s", .timeout.as_secs())]
    Timeout {
        command: &'static str,
        timeout: Duration,
    },

    #[error("'{command}' was interrupted")]
    Interrupted { command: &'static str },

    #[error("failed to read agent output: {0}")]
    Io(#[from] std::io::Error),
}

/// Seam between the orchestrator and the operating system.
///
/// The orchestrator and iteration tests drive a scripted implementation;
/// production uses [`ProcessSpawner`].
#[async_trait::async_trait]
pub trait AgentSpawner: Send + Sync {
    async fn spawn(&self, request: SpawnRequest) -> Result<SpawnResult, SpawnError>;
}

/// Spawns real agent processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessSpawner;

#[async_trait::async_trait]
impl AgentSpawner for ProcessSpawner {
    async fn spawn(&self, request: SpawnRequest) -> Result<SpawnResult, SpawnError> {
        let command = request.agent.command();
        let args = request.agent.build_args(&request.prompt, request.model.as_deref());
        run_streaming(command, &args, &request.working_dir, request.timeout).await
    }
}

/// Run a command non-interactively, streaming stdout/stderr through to the
/// parent's streams while accumulating both for the caller.
///
/// stdin is inherited so the agent sees the same terminal the user does.
/// The child is made leader of a fresh process group; timeout expiry or a
/// forwarded signal kills the whole group, not just the direct child.
pub(crate) async fn run_streaming(
    command: &'static str,
    args: &[String],
    working_dir: &std::path::Path,
    timeout: Option<Duration>,
) -> Result<SpawnResult, SpawnError> {
    let mut cmd = Command::new(command);
    cmd.args(args)
        .current_dir(working_dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .spawn()
        .map_err(|source| SpawnError::Launch { command, source })?;

    // Drain both pipes concurrently to avoid backpressure deadlock when the
    // agent interleaves heavy stdout and stderr traffic.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SpawnError::Io(std::io::Error::other("stdout pipe unavailable")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| SpawnError::Io(std::io::Error::other("stderr pipe unavailable")))?;

    let stdout_task = stream_lines(stdout, false);
    let stderr_task = stream_lines(stderr, true);

    let status = tokio::select! {
        status = child.wait() => status?,
        elapsed = expiry(timeout) => {
            // A timed-out agent gets no grace period
            terminate_group(&mut child, KILL_SIGNAL).await;
            stdout_task.abort();
            stderr_task.abort();
            return Err(SpawnError::Timeout { command, timeout: elapsed });
        }
        signal = shutdown_signal() => {
            terminate_group(&mut child, signal).await;
            stdout_task.abort();
            stderr_task.abort();
            return Err(SpawnError::Interrupted { command });
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    Ok(SpawnResult {
        // killed-by-signal leaves no code; normalize to failure
        exit_code: status.code().unwrap_or(1),
        stdout,
        stderr,
    })
}

/// Echo each line to the parent's matching stream as it arrives, and keep a
/// copy for marker parsing and error reporting.
fn stream_lines<R>(reader: R, to_stderr: bool) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut captured = String::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if to_stderr {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
            captured.push_str(&line);
            captured.push('\n');
        }
        captured
    })
}

/// Pending forever when no timeout is configured.
async fn expiry(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(duration) => {
            tokio::time::sleep(duration).await;
            duration
        }
        None => std::future::pending().await,
    }
}

#[cfg(unix)]
const KILL_SIGNAL: i32 = libc::SIGKILL;
#[cfg(not(unix))]
const KILL_SIGNAL: i32 = 0;

/// Resolve when the host process receives an interrupt or terminate signal,
/// yielding the signal to forward to the child.
///
/// The signal streams are registered when this future is first polled and
/// dropped with it, so handlers never outlive the spawn call that installed
/// them, no matter which select arm wins.
#[cfg(unix)]
async fn shutdown_signal() -> i32 {
    use tokio::signal::unix::{signal, SignalKind};

    match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
        (Ok(mut interrupt), Ok(mut terminate)) => {
            tokio::select! {
                _ = interrupt.recv() => libc::SIGINT,
                _ = terminate.recv() => libc::SIGTERM,
            }
        }
        // No way to observe signals; let the other select arms decide.
        _ => std::future::pending().await,
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> i32 {
    match tokio::signal::ctrl_c().await {
        Ok(()) => 0,
        Err(_) => std::future::pending().await,
    }
}

/// Deliver `signal` to the child's entire process group, then reap the child.
///
/// The group kill catches grandchildren that inherited the group; the direct
/// kill afterwards covers the non-unix path and any race where the group is
/// already gone.
async fn terminate_group(child: &mut Child, signal: i32) {
    kill_process_group(child, signal);
    let _ = child.start_kill();
    let _ = child.wait().await;
}

#[cfg(unix)]
fn kill_process_group(child: &Child, signal: i32) {
    if let Some(pid) = child.id() {
        let pgid = unsafe { libc::getpgid(pid as libc::pid_t) };
        if pgid != -1 {
            unsafe {
                libc::killpg(pgid, signal);
            }
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child, _signal: i32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Instant;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_exit_code_passes_through() {
        let result = run_streaming("sh", &args(&["-c", "exit 7"]), Path::new("."), None)
            .await
            .unwrap();
        assert_eq!(result.exit_code, 7);
    }

    #[tokio::test]
    async fn test_stdout_and_stderr_captured_separately() {
        let result = run_streaming(
            "sh",
            &args(&["-c", "echo out; echo err >&2"]),
            Path::new("."),
            None,
        )
        .await
        .unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
    }

    #[tokio::test]
    async fn test_prompt_like_arg_not_shell_interpreted() {
        // A single argv entry with metacharacters must arrive literally
        let result = run_streaming(
            "printf",
            &args(&["%s", "`date` && $HOME; rm -rf /"]),
            Path::new("."),
            None,
        )
        .await
        .unwrap();
        assert_eq!(result.stdout.trim_end(), "`date` && $HOME; rm -rf /");
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let err = run_streaming("taskd-no-such-agent", &[], Path::new("."), None)
            .await
            .unwrap_err();
        match &err {
            SpawnError::Launch { command, .. } => assert_eq!(*command, "taskd-no-such-agent"),
            other => panic!("expected Launch error, got {:?}", other),
        }
        // Launch errors carry installation guidance for the user
        assert!(err.to_string().contains("installed and in your PATH"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_death_normalized_to_one() {
        // A child killed by a signal has no exit code; spawn reports 1
        let result = run_streaming("sh", &args(&["-c", "kill -9 $$"]), Path::new("."), None)
            .await
            .unwrap();
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_timeout_kills_long_running_process() {
        let started = Instant::now();
        let err = run_streaming(
            "sh",
            &args(&["-c", "sleep 30"]),
            Path::new("."),
            Some(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SpawnError::Timeout { .. }));
        // The kill must not wait out the child's sleep
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_grandchildren_in_group() {
        // The child forks a grandchild that would outlive a naive kill.
        // Killing the process group must take the whole tree down quickly.
        let started = Instant::now();
        let err = run_streaming(
            "sh",
            &args(&["-c", "sh -c 'sleep 30' & wait"]),
            Path::new("."),
            Some(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SpawnError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_working_dir_respected() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_streaming("pwd", &[], dir.path(), None).await.unwrap();
        let reported = std::fs::canonicalize(result.stdout.trim_end()).unwrap();
        let expected = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(reported, expected);
    }
}
