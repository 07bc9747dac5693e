//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, trace, warn};

use reel_models::EncodingConfig;

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Upper bound on the stderr kept for diagnostics.
pub const MAX_STDERR_BYTES: usize = 10 * 1024;

/// Metric recording wall time of every FFmpeg invocation.
pub const FFMPEG_DURATION_METRIC: &str = "reel_ffmpeg_duration_seconds";

/// One `-i` input together with the arguments that precede it.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegInput {
    pub args: Vec<String>,
    pub path: PathBuf,
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegCommand {
    /// Inputs in `-i` order
    inputs: Vec<FfmpegInput>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the last -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command with a single input.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![FfmpegInput {
                args: Vec::new(),
                path: input.as_ref().to_path_buf(),
            }],
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Append another input. Subsequent input arguments apply to it.
    pub fn add_input(mut self, input: impl AsRef<Path>) -> Self {
        self.inputs.push(FfmpegInput {
            args: Vec::new(),
            path: input.as_ref().to_path_buf(),
        });
        self
    }

    /// Add an argument placed before the most recently added input.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        if let Some(input) = self.inputs.last_mut() {
            input.args.push(arg.into());
        }
        self
    }

    /// Add multiple input arguments.
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(input) = self.inputs.last_mut() {
            input.args.extend(args.into_iter().map(Into::into));
        }
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set video filter graph.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set audio filter graph.
    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-af").output_arg(filter)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Copy all streams without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Apply a full encoding configuration.
    pub fn encoding(self, encoding: &EncodingConfig) -> Self {
        self.output_args(encoding.to_ffmpeg_args())
    }

    /// Inputs in order.
    pub fn inputs(&self) -> &[FfmpegInput] {
        &self.inputs
    }

    /// Output path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Output arguments.
    pub fn get_output_args(&self) -> &[String] {
        &self.output_args
    }

    /// Value following `flag` in the output arguments, e.g. the `-vf` graph.
    pub fn output_value(&self, flag: &str) -> Option<&str> {
        self.output_args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|i| self.output_args.get(i + 1))
            .map(String::as_str)
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Overwrite flag
        if self.overwrite {
            args.push("-y".to_string());
        }

        // Diagnostics are limited to errors; progress comes from -progress
        args.push("-v".to_string());
        args.push("error".to_string());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Tail of a process's diagnostic output, bounded in bytes.
#[derive(Debug, Default)]
pub struct StderrTail {
    lines: VecDeque<String>,
    bytes: usize,
    max_bytes: usize,
}

impl StderrTail {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            bytes: 0,
            max_bytes,
        }
    }

    /// Append a line, dropping the oldest lines once over budget.
    pub fn push(&mut self, line: &str) {
        let mut line = line.to_string();
        if line.len() > self.max_bytes {
            let mut cut = line.len() - self.max_bytes;
            while !line.is_char_boundary(cut) {
                cut += 1;
            }
            line = line.split_off(cut);
        }

        self.bytes += line.len() + 1;
        self.lines.push_back(line);

        while self.bytes > self.max_bytes + 1 {
            match self.lines.pop_front() {
                Some(dropped) => self.bytes -= dropped.len() + 1,
                None => break,
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Joined contents, `None` when nothing was captured.
    pub fn into_string(self) -> Option<String> {
        if self.lines.is_empty() {
            None
        } else {
            Some(Vec::from(self.lines).join("\n"))
        }
    }
}

/// Runner for FFmpeg commands with a timeout and bounded stderr capture.
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
    /// Binary to invoke
    program: String,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self {
            timeout_secs: None,
            program: "ffmpeg".to_string(),
        }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Invoke a different binary with the same argument contract.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Run an FFmpeg command.
    ///
    /// Progress records are traced; the last one is logged when the run ends.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        which::which(&self.program).map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.program, args.join(" "));

        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        let mut reader = BufReader::new(stderr).lines();

        // Progress records are parsed, everything else is kept for diagnostics
        let stderr_handle = tokio::spawn(async move {
            let mut current_progress = FfmpegProgress::default();
            let mut last_progress = None;
            let mut tail = StderrTail::new(MAX_STDERR_BYTES);

            while let Ok(Some(line)) = reader.next_line().await {
                if is_progress_line(&line) {
                    if let Some(progress) = parse_progress_line(&line, &mut current_progress) {
                        trace!(frame = progress.frame, speed = progress.speed, "FFmpeg progress");
                        last_progress = Some(progress);
                    }
                } else if !line.trim().is_empty() {
                    tail.push(&line);
                }
            }

            (tail, last_progress)
        });

        let result = self.wait_for_completion(&mut child).await;
        let (tail, last_progress) = stderr_handle.await.unwrap_or_default();
        let stderr_tail = tail.into_string();

        if let Some(progress) = last_progress {
            debug!(
                frames = progress.frame,
                out_time_ms = progress.out_time_ms,
                speed = progress.speed,
                complete = progress.is_complete,
                "FFmpeg finished encoding"
            );
        }

        let outcome = match &result {
            Ok(()) => "success",
            Err(MediaError::Timeout(_)) => "timeout",
            Err(_) => "failure",
        };
        metrics::histogram!(FFMPEG_DURATION_METRIC, "outcome" => outcome)
            .record(started.elapsed().as_secs_f64());

        match result {
            Err(MediaError::FfmpegFailed {
                message, exit_code, ..
            }) => Err(MediaError::FfmpegFailed {
                message,
                stderr: stderr_tail,
                exit_code,
            }),
            other => other,
        }
    }

    /// Wait for child process, killing it when the timeout elapses.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<()> {
        let status = match self.timeout_secs {
            Some(timeout_secs) => {
                match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait()).await {
                    Ok(status) => status?,
                    Err(_) => {
                        warn!(
                            "FFmpeg timed out after {} seconds, killing process",
                            timeout_secs
                        );
                        if let Err(e) = child.kill().await {
                            warn!(error = %e, "Failed to kill timed out FFmpeg process");
                        }
                        return Err(MediaError::Timeout(timeout_secs));
                    }
                }
            }
            None => child.wait().await?,
        };

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                None,
                status.code(),
            ))
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}
