/*!
 * Integration tests for the deck2video binary's argument handling.
 *
 * These only cover paths that end before any external tool runs.
 */

use anyhow::Result;
use std::path::Path;
use std::process::{Command, Output};

use crate::common;

fn deck2video(args: &[&str], config_dir: &Path) -> Result<Output> {
    let config = config_dir.join("conf.json");
    let output = Command::new(env!("CARGO_BIN_EXE_deck2video"))
        .args(args)
        .arg("--config")
        .arg(&config)
        .output()?;
    Ok(output)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Test that conflicting resume flags are rejected up front
#[test]
fn test_cli_withReassembleAndRedo_shouldExitWithUsageError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("work");

    let output = deck2video(
        &[
            deck.to_str().unwrap(),
            "--reassemble",
            "--redo-slides",
            "1",
            "--temp-dir",
            workspace.to_str().unwrap(),
        ],
        temp_dir.path(),
    )?;

    assert_eq!(output.status.code(), Some(2));
    assert!(!workspace.exists());
    Ok(())
}

/// Test an invalid selection expression
#[test]
fn test_cli_withInvalidSelection_shouldExitWithUsageError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("work");
    std::fs::create_dir_all(&workspace)?;

    let output = deck2video(
        &[deck.to_str().unwrap(), "--redo-slides", "0,2", "--temp-dir", workspace.to_str().unwrap()],
        temp_dir.path(),
    )?;

    assert_eq!(output.status.code(), Some(2));
    let message = stderr(&output);
    assert!(message.contains("Invalid slide number '0'"), "stderr: {}", message);
    assert!(!message.contains("panicked"));
    Ok(())
}

/// Test a missing input file
#[test]
fn test_cli_withMissingInput_shouldExitWithUsageError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let missing = temp_dir.path().join("missing.md");

    let output = deck2video(&[missing.to_str().unwrap()], temp_dir.path())?;

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Input file not found"));
    Ok(())
}

/// Test --reassemble without --temp-dir
#[test]
fn test_cli_reassembleWithoutTempDir_shouldExitWithUsageError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;

    let output = deck2video(&[deck.to_str().unwrap(), "--reassemble"], temp_dir.path())?;

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("--temp-dir"));
    Ok(())
}

/// Test shell completion generation
#[test]
fn test_cli_completions_shouldPrintScript() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_deck2video"))
        .args(["completions", "bash"])
        .output()?;

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("deck2video"));
    Ok(())
}

/// Test that an invalid configuration stops the run with a general failure
#[test]
fn test_cli_withInvalidConfig_shouldExitWithFailure() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let deck = common::create_deck(&dir, common::MARP_DECK)?;
    common::create_test_file(&dir, "conf.json", r#"{ "video": { "default_fps": 0 } }"#)?;

    let output = deck2video(&[deck.to_str().unwrap()], temp_dir.path())?;

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("video.default_fps"));
    Ok(())
}
