//! Structured subprocess invocation
//!
//! Runs external commands with explicit argument lists and explicit
//! environment maps (never through a shell), appends their combined
//! stdout/stderr to a log file, and scans the output for progress
//! percentages as tools like cmake print them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Subprocess errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Command could not be spawned
    #[error("Failed to spawn '{program}': {error}")]
    Spawn { program: String, error: String },

    /// Command ran but exited non-zero
    #[error("'{program}' exited with {status}")]
    NonZeroExit { program: String, status: String },

    /// IO error while capturing output or writing the log
    #[error("IO error while running '{program}': {error}")]
    Io { program: String, error: String },
}

/// Progress callback invoked with each newly observed percentage
pub type ProgressCallback = Box<dyn Fn(u8) + Send + Sync>;

/// A fully specified external command
///
/// Arguments and environment overrides are kept as explicit lists and
/// maps; nothing here is ever interpolated into a shell string.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Program to execute (resolved via PATH)
    pub program: String,
    /// Argument list
    pub args: Vec<String>,
    /// Environment variable overrides, merged over the inherited environment
    pub env: HashMap<String, String>,
    /// Working directory, if different from the current one
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a command with arguments and no environment overrides
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().collect(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Set environment variable overrides
    #[must_use]
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }
}

/// Run a command, appending combined output to `log`
///
/// Each line of stdout and stderr is written to the log. When a line
/// contains percentage tokens (`NN%`), the last token on the line is
/// reported through `progress`. A non-zero exit status is an error.
pub async fn run_logged(
    spec: &CommandSpec,
    log: &mut tokio::fs::File,
    progress: Option<&ProgressCallback>,
) -> Result<(), ProcessError> {
    let io_err = |e: std::io::Error| ProcessError::Io {
        program: spec.program.clone(),
        error: e.to_string(),
    };

    // Record the invocation itself so the log reads as a session transcript
    let header = format!("$ {} {}\n", spec.program, spec.args.join(" "));
    log.write_all(header.as_bytes()).await.map_err(io_err)?;

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .envs(&spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(ref cwd) = spec.cwd {
        cmd.current_dir(cwd);
    }

    let mut child = cmd.spawn().map_err(|e| ProcessError::Spawn {
        program: spec.program.clone(),
        error: e.to_string(),
    })?;

    let (tx, mut rx) = mpsc::channel::<String>(64);
    if let Some(stdout) = child.stdout.take() {
        spawn_line_forwarder(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_forwarder(stderr, tx.clone());
    }
    drop(tx);

    // Single consumer keeps the log writes ordered
    while let Some(line) = rx.recv().await {
        log.write_all(line.as_bytes()).await.map_err(io_err)?;
        log.write_all(b"\n").await.map_err(io_err)?;

        if let (Some(cb), Some(pct)) = (progress, last_percent(&line)) {
            cb(pct);
        }
    }
    log.flush().await.map_err(io_err)?;

    let status = child.wait().await.map_err(io_err)?;
    if status.success() {
        Ok(())
    } else {
        Err(ProcessError::NonZeroExit {
            program: spec.program.clone(),
            status: status.to_string(),
        })
    }
}

fn spawn_line_forwarder(
    reader: impl tokio::io::AsyncRead + Unpin + Send + 'static,
    tx: mpsc::Sender<String>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
}

/// Extract the last `NN%` token from a chunk of output, if any
///
/// The most recent token wins, not the maximum: build systems interleave
/// sub-make progress counters and the newest one reflects reality.
pub fn last_percent(chunk: &str) -> Option<u8> {
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    let re = PERCENT.get_or_init(|| Regex::new(r"(\d+)%").expect("valid regex"));
    re.captures_iter(chunk)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .last()
        .map(|p| p.min(100) as u8)
}
