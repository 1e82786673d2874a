/*!
 * External process invocation with a time budget.
 */

use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::errors::ToolError;

/// One external command to run
#[derive(Debug, Clone)]
pub struct ToolCommand {
    /// Name used in error messages
    pub tool: String,
    /// Executable
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Time budget in seconds
    pub timeout_secs: u64,
}

impl ToolCommand {
    pub fn new(tool: impl Into<String>, program: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
            timeout_secs,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().to_string())
    }

    /// Run to completion and require a zero exit status
    pub async fn run(&self) -> Result<Output, ToolError> {
        debug!("Running {} {}", self.program, self.args.join(" "));

        let child = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output();

        let timeout_duration = Duration::from_secs(self.timeout_secs);
        let output = tokio::select! {
            result = child => {
                result.map_err(|e| ToolError::Spawn {
                    tool: self.tool.clone(),
                    message: e.to_string(),
                })?
            },
            _ = tokio::time::sleep(timeout_duration) => {
                return Err(ToolError::Timeout {
                    tool: self.tool.clone(),
                    secs: self.timeout_secs,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let filtered = filter_tool_stderr(&stderr);
            error!("{} exited with {}: {}", self.tool, output.status, filtered);
            return Err(ToolError::failed(&self.tool, filtered));
        }

        Ok(output)
    }
}

// @const: Indented `libavutil      58.  2.100 / 58.  2.100` banner lines
static LIBRARY_BANNER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+lib[a-z0-9_]+\s+\d+\.\s*\d+\.\s*\d+").expect("valid regex"));

/// Keep only meaningful stderr lines, dropping ffmpeg's banner, build
/// configuration and stream metadata.
pub fn filter_tool_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "Input #",
        "Metadata:",
        "Duration:",
        "Stream #",
        "encoder",
        "handler_name",
        "major_brand",
        "minor_version",
        "compatible_brands",
        "Output #",
        "Stream mapping:",
        "Press [q]",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .filter(|line| !LIBRARY_BANNER_REGEX.is_match(line))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
