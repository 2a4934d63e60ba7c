//! Remote command execution over SSH
//!
//! Every invocation spawns one fresh `ssh(1)` client process, which in turn
//! opens one fresh SSH session on the remote side. There is no pooling and no
//! retry; a call either yields the remote stdout or a single terminal error.

use crate::error::RemoteError;
use log::{debug, info, warn};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// TCP/auth establishment limit passed to the ssh client
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// How often the child is polled while waiting for exit
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Seam between the collectors and the SSH transport.
///
/// Collectors depend on this trait so they can be exercised against canned
/// output in tests.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Sync {
    /// Run a shell command on the remote host and return its stdout
    fn run(&self, command: &str) -> Result<String, RemoteError>;
}

/// Executes commands on one remote host via the system ssh client
#[derive(Debug, Clone)]
pub struct SshRunner {
    host: String,
    user: String,
    key_path: Option<PathBuf>,
    command_timeout: Duration,
}

impl SshRunner {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        key_path: Option<PathBuf>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            key_path,
            command_timeout,
        }
    }

    fn build_command(&self, command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new")
            .arg("-o")
            .arg(format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"));
        if let Some(key) = &self.key_path {
            cmd.arg("-i").arg(key);
        }
        cmd.arg(format!("{}@{}", self.user, self.host));
        cmd.arg(command);
        cmd
    }
}

impl CommandRunner for SshRunner {
    fn run(&self, command: &str) -> Result<String, RemoteError> {
        info!("Connecting to {}@{} via SSH", self.user, self.host);
        debug!("Running remote command: {command}");
        execute(self.build_command(command), self.command_timeout)
    }
}

/// Spawn the client process, enforce the deadline, and map the exit status.
///
/// The child and its pipes are reaped on every exit path; on timeout the
/// child is killed before the error is returned.
fn execute(mut cmd: Command, timeout: Duration) -> Result<String, RemoteError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| RemoteError::ConnectionFailed(format!("failed to spawn ssh client: {e}")))?;

    let stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| RemoteError::ConnectionFailed("ssh stdout was not captured".to_string()))?;
    let stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| RemoteError::ConnectionFailed("ssh stderr was not captured".to_string()))?;

    // Drain both pipes off-thread so a chatty child cannot deadlock on a
    // full pipe buffer while we poll for exit.
    let stdout_reader = thread::spawn(move || read_pipe(stdout_pipe));
    let stderr_reader = thread::spawn(move || read_pipe(stderr_pipe));

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            warn!("Remote command exceeded {}s deadline, killing client", timeout.as_secs());
            if let Err(e) = child.kill() {
                warn!("Failed to kill timed-out ssh client: {e}");
            }
            let _ = child.wait();
            return Err(RemoteError::Timeout {
                seconds: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = join_reader(stdout_reader)?;
    let stderr = join_reader(stderr_reader)?;

    if status.success() {
        return Ok(stdout);
    }

    match status.code() {
        // 255 is the ssh client's own failure channel (connect/auth errors);
        // None means the child was killed by a signal before finishing.
        Some(255) | None => Err(RemoteError::ConnectionFailed(stderr.trim().to_string())),
        Some(exit_code) => Err(RemoteError::CommandFailed { exit_code, stderr }),
    }
}

fn read_pipe(mut pipe: impl Read) -> std::io::Result<String> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn join_reader(handle: thread::JoinHandle<std::io::Result<String>>) -> Result<String, RemoteError> {
    handle
        .join()
        .map_err(|_| RemoteError::ConnectionFailed("pipe reader thread panicked".to_string()))?
        .map_err(RemoteError::from)
}
