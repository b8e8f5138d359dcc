//! Subprocess-based task runner.

use async_trait::async_trait;
use chrono::Utc;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::runner::TaskRunner;
use super::types::{TaskOutcome, TaskResult, TaskSpec};

/// How long to keep draining stdout/stderr after the process is gone.
const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Runs tasks as child processes.
///
/// The subject key is passed as the last argument. Both output streams are
/// read concurrently with the process so that a chatty task cannot block on
/// a full pipe, and so that output produced before a timeout is kept.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    drain_grace: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    /// Creates a runner with default settings.
    pub fn new() -> Self {
        Self {
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    /// Sets how long output streams may stay open after the process ends.
    ///
    /// A task that leaves a background child holding its stdout would
    /// otherwise keep the runner waiting forever.
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    fn classify(status: ExitStatus) -> TaskOutcome {
        match status.code() {
            Some(code) => TaskOutcome::Exited { code },
            None => TaskOutcome::Terminated {
                signal: termination_signal(&status),
            },
        }
    }
}

#[cfg(unix)]
fn termination_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Output collected so far by a stream reader.
///
/// The buffer is shared so that what was read before an abort is kept.
type OutputBuffer = Arc<Mutex<Vec<u8>>>;

struct StreamReader {
    buffer: OutputBuffer,
    handle: JoinHandle<()>,
}

impl StreamReader {
    fn spawn<R: AsyncRead + Unpin + Send + 'static>(mut reader: R) -> Self {
        let buffer: OutputBuffer = Arc::default();
        let sink = Arc::clone(&buffer);
        let handle = tokio::spawn(async move {
            let mut chunk = [0u8; 8192];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                    Err(e) => {
                        debug!("Output stream closed with error: {}", e);
                        break;
                    }
                }
            }
        });
        Self { buffer, handle }
    }

    /// Waits up to `grace` for the stream to close, then returns what was read.
    async fn collect(mut self, grace: Duration, task: &str, stream: &str) -> String {
        match tokio::time::timeout(grace, &mut self.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(task, stream, "Output reader failed: {}", e),
            Err(_) => {
                self.handle.abort();
                warn!(task, stream, "Output stream still open after process exit, giving up");
            }
        }
        let bytes = match self.buffer.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

async fn collect_stream(
    reader: Option<StreamReader>,
    grace: Duration,
    task: &str,
    stream: &str,
) -> String {
    match reader {
        Some(reader) => reader.collect(grace, task, stream).await,
        None => String::new(),
    }
}

fn log_output(task: &str, stdout: &str, stderr: &str) {
    for line in stdout.lines() {
        info!(task, "[stdout] {}", line);
    }
    for line in stderr.lines() {
        warn!(task, "[stderr] {}", line);
    }
}

#[async_trait]
impl TaskRunner for ProcessRunner {
    fn name(&self) -> &str {
        "process"
    }

    async fn run(&self, task: &TaskSpec, subject: &str, timeout: Duration) -> TaskResult {
        let started_at = Utc::now();
        let start = Instant::now();

        info!(task = %task.name, subject, program = %task.program, "Starting task");

        let mut command = Command::new(&task.program);
        command
            .args(task.command_args(subject))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = task.working_dir {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let reason = if e.kind() == std::io::ErrorKind::NotFound {
                    format!("program not found: {}", task.program)
                } else {
                    e.to_string()
                };
                error!(task = %task.name, subject, "Failed to launch task: {}", reason);
                return TaskResult::new(
                    &task.name,
                    TaskOutcome::LaunchFailed { reason },
                    String::new(),
                    String::new(),
                    started_at,
                    start.elapsed(),
                );
            }
        };

        let stdout = child.stdout.take().map(StreamReader::spawn);
        let stderr = child.stderr.take().map(StreamReader::spawn);

        let outcome = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => Self::classify(status),
            Ok(Err(e)) => TaskOutcome::Crashed {
                reason: format!("failed to wait for process: {}", e),
            },
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(task = %task.name, "Failed to kill timed out process: {}", e);
                }
                TaskOutcome::TimedOut {
                    timeout_ms: timeout.as_millis() as u64,
                }
            }
        };

        let (stdout, stderr) = tokio::join!(
            collect_stream(stdout, self.drain_grace, &task.name, "stdout"),
            collect_stream(stderr, self.drain_grace, &task.name, "stderr"),
        );
        log_output(&task.name, &stdout, &stderr);

        let result = TaskResult::new(
            &task.name,
            outcome,
            stdout,
            stderr,
            started_at,
            start.elapsed(),
        );

        if result.success {
            info!(
                task = %task.name,
                subject,
                duration_ms = result.duration_ms,
                "Task completed"
            );
        } else {
            error!(
                task = %task.name,
                subject,
                duration_ms = result.duration_ms,
                "Task failed: {}",
                result.outcome
            );
        }

        result
    }
}
