//! External command execution.
//!
//! Every command gets its working directory through [`Command::current_dir`];
//! the process-wide current directory is never touched, so any number of
//! commands can run at once from different worker threads.

use std::borrow::Cow;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Outcome of one external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// The command line that was run.
    pub command: String,
    /// Directory the command ran in.
    pub cwd: PathBuf,
    /// Whether the command exited with status zero.
    pub success: bool,
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// Captured standard output (empty when streamed).
    pub stdout: String,
    /// Captured standard error (empty when streamed).
    pub stderr: String,
}

/// Runs shell command lines in a given directory.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    timeout: Option<Duration>,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs `command_line` in `cwd`, capturing its output.
    ///
    /// # Errors
    ///
    /// A non-zero exit (or timeout) is an error unless `tolerate_failure` is
    /// set, in which case it is logged and reported through
    /// [`CommandOutput::success`].
    pub fn run(
        &self,
        command_line: &str,
        cwd: &Path,
        tolerate_failure: bool,
    ) -> Result<CommandOutput> {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let outcome = self.execute(command_line, cwd, |child| {
            let mut out_pipe = child.stdout.take();
            let mut err_pipe = child.stderr.take();
            std::thread::scope(|s| {
                let out = s.spawn(|| {
                    if let Some(pipe) = out_pipe.as_mut() {
                        let _ = pipe.read_to_end(&mut stdout);
                    }
                });
                let err = s.spawn(|| {
                    if let Some(pipe) = err_pipe.as_mut() {
                        let _ = pipe.read_to_end(&mut stderr);
                    }
                });
                let status = self.wait(child, command_line, cwd);
                let _ = out.join();
                let _ = err.join();
                status
            })
        });

        let mut output = self.finish(command_line, cwd, outcome, tolerate_failure)?;
        output.stdout = String::from_utf8_lossy(&stdout).into_owned();
        output.stderr = String::from_utf8_lossy(&stderr).into_owned();
        Ok(output)
    }

    /// Runs `command_line` in `cwd`, handing each output line to `on_line` as
    /// it arrives. The flag is `true` for lines from standard error.
    pub fn exec_and_stream<F>(
        &self,
        command_line: &str,
        cwd: &Path,
        tolerate_failure: bool,
        on_line: F,
    ) -> Result<CommandOutput>
    where
        F: Fn(&str, bool) + Sync,
    {
        let outcome = self.execute(command_line, cwd, |child| {
            let out_pipe = child.stdout.take();
            let err_pipe = child.stderr.take();
            std::thread::scope(|s| {
                let on_line = &on_line;
                let out = s.spawn(move || {
                    if let Some(pipe) = out_pipe {
                        pump_lines(pipe, |line| on_line(line, false));
                    }
                });
                let err = s.spawn(move || {
                    if let Some(pipe) = err_pipe {
                        pump_lines(pipe, |line| on_line(line, true));
                    }
                });
                let status = self.wait(child, command_line, cwd);
                let _ = out.join();
                let _ = err.join();
                status
            })
        });

        self.finish(command_line, cwd, outcome, tolerate_failure)
    }

    fn execute<F>(&self, command_line: &str, cwd: &Path, drive: F) -> Result<ExitStatus>
    where
        F: FnOnce(&mut Child) -> Result<ExitStatus>,
    {
        validate(command_line)?;
        info!(command = command_line, path = %cwd.display(), "running");

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(command_line)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // A timed command gets its own process group so that everything it
        // starts can be killed together on expiry.
        #[cfg(unix)]
        if self.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command
            .spawn()
            .map_err(|e| Error::CommandExecution {
                command: command_line.to_string(),
                path: cwd.to_path_buf(),
                message: format!("failed to spawn: {}", e),
            })?;

        drive(&mut child)
    }

    fn wait(&self, child: &mut Child, command_line: &str, cwd: &Path) -> Result<ExitStatus> {
        let wait_error = |e: std::io::Error| Error::CommandExecution {
            command: command_line.to_string(),
            path: cwd.to_path_buf(),
            message: format!("failed to wait for process: {}", e),
        };

        let Some(timeout) = self.timeout else {
            return child.wait().map_err(wait_error);
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(wait_error)? {
                return Ok(status);
            }
            if started.elapsed() >= timeout {
                kill_process_group(child);
                let _ = child.wait();
                return Err(Error::CommandTimeout {
                    command: command_line.to_string(),
                    path: cwd.to_path_buf(),
                    timeout,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn finish(
        &self,
        command_line: &str,
        cwd: &Path,
        outcome: Result<ExitStatus>,
        tolerate_failure: bool,
    ) -> Result<CommandOutput> {
        let mut output = CommandOutput {
            command: command_line.to_string(),
            cwd: cwd.to_path_buf(),
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        };

        let failure = match outcome {
            Ok(status) if status.success() => {
                output.success = true;
                output.exit_code = status.code();
                return Ok(output);
            }
            Ok(status) => {
                output.exit_code = status.code();
                Error::CommandExecution {
                    command: command_line.to_string(),
                    path: cwd.to_path_buf(),
                    message: match status.code() {
                        Some(code) => format!("exited with status {}", code),
                        None => "terminated by signal".to_string(),
                    },
                }
            }
            Err(e @ Error::CommandTimeout { .. }) => e,
            Err(e) => return Err(e),
        };

        if tolerate_failure {
            warn!(error = %failure, "command failed, continuing");
            Ok(output)
        } else {
            Err(failure)
        }
    }
}

/// Kills the child and every process in its group, so grandchildren holding
/// the output pipes die with it.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    match i32::try_from(child.id()) {
        // SAFETY: the child was spawned as the leader of its own process group,
        // so a negative pid addresses exactly that group.
        Ok(pid) => unsafe {
            libc::kill(-pid, libc::SIGKILL);
        },
        Err(_) => {
            let _ = child.kill();
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
}

fn validate(command_line: &str) -> Result<()> {
    if command_line.trim().is_empty() {
        return Err(Error::InvalidCommand("command cannot be empty".to_string()));
    }
    if command_line.contains('\0') {
        return Err(Error::InvalidCommand(format!(
            "command contains a NUL byte: {:?}",
            command_line
        )));
    }
    Ok(())
}

/// Quotes `arg` for `sh` so it reaches the program as a single argument.
///
/// Words made only of characters the shell treats literally are returned
/// unchanged; anything else is wrapped in single quotes.
pub fn shell_quote(arg: &str) -> Cow<'_, str> {
    let literal = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,^".contains(c));
    if literal {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', "'\\''")))
    }
}

fn pump_lines<R: Read>(pipe: R, mut on_line: impl FnMut(&str)) {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                on_line(line.trim_end_matches(['\n', '\r']));
            }
        }
    }
}
