//! Builder for executing external tool commands with timeout support.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Number of trailing stderr lines kept for error messages when streaming.
const STDERR_TAIL_LINES: usize = 20;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8). When streaming, only the
    /// trailing lines are retained.
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use gf_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> gf_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-version")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            current_dir: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Run the process with `dir` as its working directory.
    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Arguments accumulated so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`gf_core::Error::Tool`] if spawning fails, the process times
    /// out, or it exits with a non-zero status (message includes stderr).
    pub async fn execute(&self) -> gf_core::Result<ToolOutput> {
        let program_name = self.program_name();

        let child = self
            .build()
            .spawn()
            .map_err(|e| gf_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(gf_core::Error::tool(
                        program_name,
                        format!(
                            "exited with status {}: {}",
                            output.status,
                            tool_output.stderr.trim()
                        ),
                    ));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(gf_core::Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            // The child is killed on drop.
            Err(_elapsed) => Err(gf_core::Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }

    /// Execute the command, handing each stderr line to `on_line` as it
    /// arrives.
    ///
    /// Only the last few stderr lines are kept in the returned output and in
    /// the error message on failure.
    pub async fn execute_streaming<F>(&self, mut on_line: F) -> gf_core::Result<ToolOutput>
    where
        F: FnMut(&str) + Send,
    {
        let program_name = self.program_name();

        let mut child = self
            .build()
            .spawn()
            .map_err(|e| gf_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let (Some(stderr), Some(mut stdout)) = (child.stderr.take(), child.stdout.take()) else {
            return Err(gf_core::Error::tool(
                program_name,
                "stdio pipes were not captured",
            ));
        };

        let read_stderr = async {
            let mut reader = BufReader::new(stderr);
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                if reader.read_until(b'\n', &mut buf).await? == 0 {
                    break;
                }
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']);
                on_line(line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.to_string());
            }
            Ok::<_, std::io::Error>(tail)
        };

        let read_stdout = async {
            let mut out = Vec::new();
            stdout.read_to_end(&mut out).await?;
            Ok::<_, std::io::Error>(out)
        };

        let run = async {
            let (tail, out) = tokio::try_join!(read_stderr, read_stdout)?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, out, tail))
        };

        match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok((status, out, tail))) => {
                let stderr = tail.into_iter().collect::<Vec<_>>().join("\n");
                if !status.success() {
                    return Err(gf_core::Error::tool(
                        program_name,
                        format!("exited with status {status}: {}", stderr.trim()),
                    ));
                }
                Ok(ToolOutput {
                    status,
                    stdout: String::from_utf8_lossy(&out).to_string(),
                    stderr,
                })
            }
            Ok(Err(e)) => Err(gf_core::Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => Err(gf_core::Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}
