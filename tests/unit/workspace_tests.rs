/*!
 * Tests for workspace creation and retention
 */

use anyhow::Result;
use std::fs;

use deck2video::pipeline::artifacts::RenderDialect;
use deck2video::pipeline::{Retention, Workspace, WorkspaceOrigin};
use crate::common;

/// Test that a generated workspace is removed after success
#[test]
fn test_finishSuccess_generatedWorkspace_shouldBeDiscarded() -> Result<()> {
    let workspace = Workspace::create_or_reuse(None)?;
    let path = workspace.path().to_path_buf();
    assert_eq!(workspace.origin(), WorkspaceOrigin::Generated);
    assert!(path.is_dir());

    assert_eq!(workspace.finish_success(false), Retention::Discarded);
    assert!(!path.exists());
    Ok(())
}

/// Test the keep flag on a generated workspace
#[test]
fn test_finishSuccess_withKeep_shouldRetainGeneratedWorkspace() -> Result<()> {
    let workspace = Workspace::create_or_reuse(None)?;
    let path = workspace.path().to_path_buf();

    assert_eq!(workspace.finish_success(true), Retention::Kept);
    assert!(path.is_dir());
    fs::remove_dir_all(&path)?;
    Ok(())
}

/// Test that a workspace that cannot be removed is reported as kept
#[cfg(unix)]
#[test]
fn test_finishSuccess_whenRemovalFails_shouldKeepWithoutError() -> Result<()> {
    let workspace = Workspace::create_or_reuse(None)?;
    let path = workspace.path().to_path_buf();
    // remove_dir_all refuses a plain file
    fs::remove_dir(&path)?;
    fs::write(&path, b"not a directory")?;

    assert_eq!(workspace.finish_success(false), Retention::Kept);
    assert!(path.is_file());
    fs::remove_file(&path)?;
    Ok(())
}

/// Test that a supplied workspace is created and always kept
#[test]
fn test_createOrReuse_suppliedMissingDir_shouldCreateAndKeep() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let requested = temp_dir.path().join("nested").join("work");

    let workspace = Workspace::create_or_reuse(Some(&requested))?;
    assert_eq!(workspace.origin(), WorkspaceOrigin::Supplied);
    assert!(requested.is_dir());

    assert_eq!(workspace.finish_success(false), Retention::Kept);
    assert!(requested.is_dir());
    Ok(())
}

/// Test that failure always preserves the directory
#[test]
fn test_preserveAfterFailure_generatedWorkspace_shouldKeep() -> Result<()> {
    let workspace = Workspace::create_or_reuse(None)?;
    let path = workspace.path().to_path_buf();

    assert_eq!(workspace.preserve_after_failure(), Retention::Kept);
    assert!(path.is_dir());
    fs::remove_dir_all(&path)?;
    Ok(())
}

/// Test that only artifacts are cleared
#[test]
fn test_clearArtifacts_shouldRemoveOnlyArtifactFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let ws_path = temp_dir.path().to_path_buf();
    common::populate_workspace(&ws_path, RenderDialect::Png, 2)?;
    fs::write(ws_path.join(RenderDialect::Bare.file_name(1)), b"")?;
    common::create_test_file(&ws_path, "notes.txt", "keep me")?;

    let workspace = Workspace::create_or_reuse(Some(&ws_path))?;
    assert_eq!(workspace.clear_artifacts()?, 5);
    assert!(ws_path.join("notes.txt").is_file());
    assert!(!ws_path.join("audio_001.wav").exists());
    Ok(())
}
