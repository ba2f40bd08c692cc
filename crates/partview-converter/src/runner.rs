//! External process execution with merged output capture.
//!
//! Converter tools report progress on stderr and results on stdout, and
//! the callers want one transcript. Both pipes are framed into lines and
//! merged in arrival order while the child runs, so neither pipe can fill
//! up and stall the child.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::process::Command;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tracing::{debug, error, warn};

use crate::error::ConversionError;

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    /// Executable name or path.
    pub program: String,
    /// Arguments in order.
    pub args: Vec<String>,
    /// Working directory for the child, if not inherited.
    pub working_dir: Option<PathBuf>,
}

impl ProcessCommand {
    /// Create a command with leading arguments.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// What a finished process left behind.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code; -1 when the process was terminated by a signal.
    pub exit_code: i32,
    /// stdout and stderr merged line by line, newline-terminated.
    pub output: String,
    /// Wall-clock time from spawn to exit.
    pub duration: Duration,
}

impl ProcessOutput {
    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external tools under a per-invocation deadline.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    /// Create a runner that kills any process outliving `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `command` to completion.
    ///
    /// A non-zero exit is returned as data. Errors are limited to launch
    /// failures, pipe I/O failures, and the deadline expiring.
    pub async fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput, ConversionError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so helpers forked by the tool die with it.
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        debug!(
            program = %command.program,
            args = ?command.args,
            timeout_s = self.timeout.as_secs(),
            "Spawning external process"
        );

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| ConversionError::ProcessLaunch {
            program: command.program.clone(),
            source,
        })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ConversionError::Io(std::io::Error::other(
                "child pipes were not captured",
            )));
        };

        let drain_and_wait = async {
            let mut lines = futures::stream::select(
                FramedRead::new(stdout, line_codec()),
                FramedRead::new(stderr, line_codec()),
            );
            let mut output = String::new();
            while let Some(frame) = lines.next().await {
                match frame {
                    Ok(line) => {
                        let text = String::from_utf8_lossy(&line);
                        output.push_str(text.strip_suffix('\r').unwrap_or(&*text));
                        output.push('\n');
                    }
                    Err(e) => {
                        warn!(program = %command.program, error = %e, "Output pipe read failed")
                    }
                }
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, output))
        };

        match tokio::time::timeout(self.timeout, drain_and_wait).await {
            Ok(Ok((status, output))) => {
                let exit_code = status.code().unwrap_or(-1);
                let duration = start.elapsed();
                debug!(
                    program = %command.program,
                    exit_code,
                    elapsed_ms = duration.as_millis() as u64,
                    "External process finished"
                );
                Ok(ProcessOutput {
                    exit_code,
                    output,
                    duration,
                })
            }
            Ok(Err(e)) => Err(ConversionError::Io(e)),
            Err(_) => {
                error!(
                    program = %command.program,
                    timeout_s = self.timeout.as_secs(),
                    "External process timed out, killing"
                );
                #[cfg(unix)]
                if let Some(pid) = child.id() {
                    if let Err(e) = kill_process_group(pid) {
                        warn!(
                            program = %command.program,
                            error = %e,
                            "Failed to kill process group"
                        );
                    }
                }
                if let Err(e) = child.kill().await {
                    warn!(
                        program = %command.program,
                        error = %e,
                        "Failed to kill timed-out process"
                    );
                }
                Err(ConversionError::ProcessTimeout {
                    program: command.program.clone(),
                    timeout_seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}

fn line_codec() -> AnyDelimiterCodec {
    AnyDelimiterCodec::new(b"\n".to_vec(), b"\n".to_vec())
}

/// Send SIGKILL to the process group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(pid).map_err(std::io::Error::other)?;
    // SAFETY: killpg takes plain integers and touches no memory.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}
