/*!
 * Common test utilities for the deck2video test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use deck2video::errors::PipelineError;
use deck2video::pipeline::artifacts::{audio_file_name, RenderDialect};
use deck2video::pipeline::{Pipeline, RunOptions, RunReport};
use deck2video::tools::mock::MockToolchain;

/// Two-slide Marp deck, both slides narrated
pub const MARP_DECK: &str = "---\nmarp: true\ntheme: default\n---\n\n# Welcome\n\n<!-- Hello and welcome to the talk. -->\n\n---\n\n# Details\n\n<!-- Here are the details. -->\n";

/// Two-slide Slidev deck; the second slide has its own front matter
pub const SLIDEV_DECK: &str = "---\ntheme: seriph\ntransition: fade\n---\n\n# Welcome\n\n<!--\nHello from Slidev.\n-->\n\n---\nlayout: center\n---\n\n# Centered\n\n<!--\nCentered note.\n-->\n";

/// Marp deck whose second slide embeds `clip.mp4`
pub const MARP_DECK_WITH_VIDEO: &str = "---\nmarp: true\n---\n\n# Intro\n\n<!-- Intro narration. -->\n\n---\n\n# Demo\n<!-- video: clip.mp4 -->\n<!-- Watch the demo. -->\n";

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &PathBuf, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Writes `talk.md` with `content` into `dir`
pub fn create_deck(dir: &PathBuf, content: &str) -> Result<PathBuf> {
    create_test_file(dir, "talk.md", content)
}

/// Fills `workspace` with render and audio artifacts for slides `1..=count`
pub fn populate_workspace(workspace: &Path, dialect: RenderDialect, count: usize) -> Result<()> {
    fs::create_dir_all(workspace)?;
    for index in 1..=count {
        fs::write(workspace.join(dialect.file_name(index)), b"image")?;
        fs::write(workspace.join(audio_file_name(index)), b"audio")?;
    }
    Ok(())
}

/// Runs `options` against the mock toolchain with a default frame rate of 24
pub async fn run_with_mock(mock: &MockToolchain, options: RunOptions) -> Result<RunReport, PipelineError> {
    init_logging();
    Pipeline::new(options, 24, mock.collaborators()).run().await
}

/// Contents of a file as a string, empty if unreadable
pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

/// Routes library logs through env_logger when RUST_LOG is set
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
