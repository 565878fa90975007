use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{ShortsError, ShortsResult};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// An external program invocation, built up argument by argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Program name for log and error messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// `true` if `arg` appears verbatim as one argument.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Value following the first occurrence of `flag`, if any.
    pub fn arg_after(&self, flag: &str) -> Option<&OsStr> {
        let pos = self.args.iter().position(|a| a == flag)?;
        self.args.get(pos + 1).map(OsString::as_os_str)
    }
}

impl std::fmt::Display for ToolCommand {
    /// Shell-like rendering; arguments containing whitespace are single-quoted.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished tool invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Bounds applied to one invocation.
#[derive(Clone, Debug, Default)]
pub struct RunLimits {
    /// Kill the process once this much wall time has passed.
    pub timeout: Option<Duration>,
    /// Kill the process as soon as this token is cancelled.
    pub cancel: CancelToken,
}

impl RunLimits {
    pub fn new(timeout: Option<Duration>, cancel: CancelToken) -> Self {
        Self { timeout, cancel }
    }
}

/// Seam between the encoder and the operating system.
///
/// A non-zero exit is reported through [`ToolOutput::status`], not as an error. Errors are
/// reserved for failing to run at all, timeouts (`ToolTimeout`) and cancellation
/// (`Cancelled`).
pub trait ToolRunner: Send + Sync {
    fn run(&self, cmd: &ToolCommand, limits: &RunLimits) -> ShortsResult<ToolOutput>;
}

/// Runs commands as child processes of the current one.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, cmd: &ToolCommand, limits: &RunLimits) -> ShortsResult<ToolOutput> {
        tracing::debug!(command = %cmd, "running external tool");
        let mut child = Command::new(cmd.program())
            .args(cmd.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ShortsError::tool(format!(
                    "failed to spawn '{}' (is it installed and on PATH?): {e}",
                    cmd.program_name()
                ))
            })?;

        let stdout_drain = drain(child.stdout.take());
        let stderr_drain = drain(child.stderr.take());
        let started = Instant::now();

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    kill_and_reap(&mut child);
                    return Err(ShortsError::tool(format!(
                        "failed to wait for '{}': {e}",
                        cmd.program_name()
                    )));
                }
            }
            if limits.cancel.is_cancelled() {
                kill_and_reap(&mut child);
                tracing::warn!(program = %cmd.program_name(), "external tool killed on cancellation");
                return Err(ShortsError::Cancelled);
            }
            if let Some(timeout) = limits.timeout
                && started.elapsed() >= timeout
            {
                kill_and_reap(&mut child);
                return Err(ShortsError::ToolTimeout {
                    program: cmd.program_name(),
                    secs: timeout.as_secs_f64(),
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        Ok(ToolOutput {
            status: status.code(),
            stdout: join_drain(stdout_drain, "stdout")?,
            stderr: join_drain(stderr_drain, "stderr")?,
        })
    }
}

type Drain = Option<JoinHandle<std::io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(src: Option<R>) -> Drain {
    src.map(|mut src| {
        std::thread::spawn(move || {
            let mut bytes = Vec::new();
            src.read_to_end(&mut bytes)?;
            Ok(bytes)
        })
    })
}

fn join_drain(handle: Drain, stream: &str) -> ShortsResult<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| ShortsError::tool(format!("{stream} drain thread panicked")))?
            .map_err(|e| ShortsError::tool(format!("{stream} read failed: {e}"))),
        None => Ok(Vec::new()),
    }
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Last `max_lines` non-empty lines of tool output, for compact diagnostics.
pub fn tail_lines(text: &str, max_lines: usize) -> String {
    let lines = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>();
    let skip = lines.len().saturating_sub(max_lines);
    lines[skip..].join("\n")
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ShortsResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `program -version` runs and exits successfully.
pub fn is_tool_on_path(program: &OsStr) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/command.rs"]
mod tests;
