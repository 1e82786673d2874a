/*!
 * Integration tests for failure handling and workspace retention
 */

use anyhow::Result;
use std::fs;

use deck2video::errors::{PipelineError, ToolError, VideoRefError};
use deck2video::pipeline::{PipelineMode, RenderDialect, RunOptions, SlideSelection};
use deck2video::tools::mock::{MockStage, MockToolchain};
use crate::common;

/// Test that every collaborator failure in a full run keeps the generated workspace
#[tokio::test]
async fn test_fullRun_collaboratorFailure_shouldPreserveGeneratedWorkspace() -> Result<()> {
    for stage in [MockStage::Render, MockStage::Synthesize, MockStage::Assemble] {
        let temp_dir = common::create_temp_dir()?;
        let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
        let mock = MockToolchain::failing_at(stage, "ffmpeg exploded");

        let err = common::run_with_mock(&mock, RunOptions::new(&deck)).await.unwrap_err();

        assert!(err.is_tool_failure(), "{:?} failure should be a tool error", stage);
        assert!(err.to_string().contains("ffmpeg exploded"));
        let workspace = mock.workspace().expect("a collaborator saw the workspace");
        assert!(workspace.is_dir(), "workspace removed after {:?} failure", stage);
        fs::remove_dir_all(&workspace)?;
    }
    Ok(())
}

/// Test that the original error is returned unchanged
#[tokio::test]
async fn test_fullRun_assemblerFailure_shouldReturnOriginalError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("work");
    let mock = MockToolchain::failing_at(MockStage::Assemble, "ffmpeg exploded");

    let err = common::run_with_mock(&mock, RunOptions::new(&deck).with_workspace(&workspace))
        .await
        .unwrap_err();

    match err {
        PipelineError::Tool(ToolError::Failed { message, .. }) => assert_eq!(message, "ffmpeg exploded"),
        other => panic!("expected the assembler error, got {:?}", other),
    }
    assert!(workspace.join("slides.001").is_file());
    assert!(workspace.join("audio_002.wav").is_file());
    Ok(())
}

/// Test failures in the resume modes
#[tokio::test]
async fn test_resumeModes_collaboratorFailure_shouldPreserveWorkspace() -> Result<()> {
    let modes = [
        (PipelineMode::Reassemble, MockStage::Assemble),
        (PipelineMode::RedoSlides(SlideSelection::parse("1")?), MockStage::Synthesize),
        (PipelineMode::RedoSlides(SlideSelection::parse("2")?), MockStage::Assemble),
    ];
    for (mode, stage) in modes {
        let temp_dir = common::create_temp_dir()?;
        let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
        let workspace = temp_dir.path().join("work");
        common::populate_workspace(&workspace, RenderDialect::Png, 2)?;
        let mock = MockToolchain::failing_at(stage, "boom");

        let options = RunOptions::new(&deck).with_workspace(&workspace).with_mode(mode);
        let err = common::run_with_mock(&mock, options).await.unwrap_err();

        assert!(err.is_tool_failure());
        assert!(workspace.join("slides.001.png").is_file());
        assert!(workspace.join("audio_001.wav").is_file());
    }
    Ok(())
}

/// Test that an escaping video reference stops the run before rendering
#[tokio::test]
async fn test_fullRun_withEscapingVideo_shouldFailBeforeRender() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let talks = temp_dir.path().join("talks");
    fs::create_dir_all(&talks)?;
    common::create_test_file(&temp_dir.path().to_path_buf(), "secret.mp4", "video")?;
    let deck = common::create_deck(
        &talks,
        "---\nmarp: true\n---\n\n# One\n<!-- video: ../secret.mp4 -->\n<!-- Narration. -->\n",
    )?;
    let workspace = temp_dir.path().join("work");
    let mock = MockToolchain::new();

    let err = common::run_with_mock(&mock, RunOptions::new(&deck).with_workspace(&workspace))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::VideoRef(VideoRefError::OutsideDeckDirectory { index: 1, .. })));
    assert_eq!(mock.call_count(MockStage::Render), 0);
    assert_eq!(mock.call_count(MockStage::Synthesize), 0);
    assert!(workspace.is_dir());
    Ok(())
}

/// Test that a missing video stops the run
#[tokio::test]
async fn test_fullRun_withMissingVideo_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK_WITH_VIDEO)?;
    let mock = MockToolchain::new();

    let options = RunOptions::new(&deck).with_workspace(temp_dir.path().join("work"));
    let err = common::run_with_mock(&mock, options).await.unwrap_err();

    assert!(matches!(err, PipelineError::VideoRef(VideoRefError::NotFound { index: 2, .. })));
    assert_eq!(mock.call_count(MockStage::Render), 0);
    Ok(())
}

/// Test that a failed preflight happens before the workspace exists
#[tokio::test]
async fn test_fullRun_preflightFailure_shouldNotCreateWorkspace() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("work");
    let mock = MockToolchain::failing_at(MockStage::Preflight, "ffmpeg not found");

    let err = common::run_with_mock(&mock, RunOptions::new(&deck).with_workspace(&workspace))
        .await
        .unwrap_err();

    assert!(err.is_tool_failure());
    assert!(!workspace.exists());
    assert_eq!(mock.stages(), vec![MockStage::Preflight]);
    Ok(())
}

/// Test a detector failure
#[tokio::test]
async fn test_fullRun_detectorFailure_shouldKeepSuppliedWorkspace() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("work");
    let mock = MockToolchain::failing_at(MockStage::Detect, "unreadable");

    let err = common::run_with_mock(&mock, RunOptions::new(&deck).with_workspace(&workspace))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("unreadable"));
    assert!(workspace.is_dir());
    assert_eq!(mock.call_count(MockStage::Parse), 0);
    Ok(())
}
