/*!
 * Integration tests for --reassemble and --redo-slides
 */

use anyhow::Result;

use deck2video::errors::{DiscoveryError, PipelineError, UsageError};
use deck2video::pipeline::{FpsSource, PipelineMode, RenderDialect, Retention, RunOptions, SlideSelection};
use deck2video::tools::mock::{MockStage, MockToolchain, ToolCall};
use crate::common;

fn redo(expr: &str) -> PipelineMode {
    PipelineMode::RedoSlides(SlideSelection::parse(expr).expect("valid selection"))
}

/// Test that reassembly only parses and assembles
#[tokio::test]
async fn test_reassemble_withPopulatedWorkspace_shouldOnlyParseAndAssemble() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("work");
    common::populate_workspace(&workspace, RenderDialect::Png, 2)?;
    let mock = MockToolchain::new();

    let options = RunOptions::new(&deck)
        .with_workspace(&workspace)
        .with_mode(PipelineMode::Reassemble);
    let report = common::run_with_mock(&mock, options).await?;

    assert_eq!(
        mock.stages(),
        vec![MockStage::Preflight, MockStage::Detect, MockStage::Parse, MockStage::Assemble]
    );
    assert_eq!(mock.call_count(MockStage::Render), 0);
    assert_eq!(mock.call_count(MockStage::Synthesize), 0);
    assert_eq!(report.retention, Retention::Kept);
    assert!(workspace.join("slides.001.png").is_file());
    Ok(())
}

/// Test the mixed-dialect workspace through the whole pipeline
#[tokio::test]
async fn test_reassemble_withBothDialects_shouldAssemblePngImages() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("work");
    common::populate_workspace(&workspace, RenderDialect::Png, 2)?;
    std::fs::write(workspace.join("slides.001"), b"old")?;
    std::fs::write(workspace.join("slides.002"), b"old")?;
    let mock = MockToolchain::new();

    let options = RunOptions::new(&deck)
        .with_workspace(&workspace)
        .with_mode(PipelineMode::Reassemble);
    common::run_with_mock(&mock, options).await?;

    let images = mock.calls().into_iter().find_map(|c| match c {
        ToolCall::Assemble(request) => Some(request.images),
        _ => None,
    });
    assert_eq!(
        images,
        Some(vec![workspace.join("slides.001.png"), workspace.join("slides.002.png")])
    );
    Ok(())
}

/// Test that resume modes need --temp-dir
#[tokio::test]
async fn test_reassemble_withoutWorkspace_shouldBeUsageError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let mock = MockToolchain::new();

    let err = common::run_with_mock(&mock, RunOptions::new(&deck).with_mode(PipelineMode::Reassemble))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Usage(UsageError::WorkspaceRequired { .. })));
    assert!(mock.calls().is_empty());
    Ok(())
}

/// Test that the workspace must already exist
#[tokio::test]
async fn test_redoSlides_withMissingWorkspace_shouldBeUsageError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("never-created");
    let mock = MockToolchain::new();

    let options = RunOptions::new(&deck).with_workspace(&workspace).with_mode(redo("1"));
    let err = common::run_with_mock(&mock, options).await.unwrap_err();

    assert!(matches!(err, PipelineError::Usage(UsageError::WorkspaceNotFound(_))));
    assert!(!workspace.exists());
    assert!(mock.calls().is_empty());
    Ok(())
}

/// Test an empty workspace
#[tokio::test]
async fn test_reassemble_withEmptyWorkspace_shouldFailDiscovery() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("work");
    std::fs::create_dir_all(&workspace)?;
    let mock = MockToolchain::new();

    let options = RunOptions::new(&deck)
        .with_workspace(&workspace)
        .with_mode(PipelineMode::Reassemble);
    let err = common::run_with_mock(&mock, options).await.unwrap_err();

    assert!(matches!(err, PipelineError::Discovery(DiscoveryError::NoImages(_))));
    assert_eq!(err.exit_code(), 1);
    assert!(workspace.is_dir());
    assert_eq!(mock.call_count(MockStage::Assemble), 0);
    Ok(())
}

/// Test artifacts left by a deck with a different slide count
#[tokio::test]
async fn test_reassemble_withArtifactsForOtherDeck_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("work");
    common::populate_workspace(&workspace, RenderDialect::Png, 3)?;
    let mock = MockToolchain::new();

    let options = RunOptions::new(&deck)
        .with_workspace(&workspace)
        .with_mode(PipelineMode::Reassemble);
    let err = common::run_with_mock(&mock, options).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Discovery(DiscoveryError::SlideCountMismatch { artifacts: 3, slides: 2 })
    ));
    assert_eq!(mock.call_count(MockStage::Assemble), 0);
    Ok(())
}

/// Test that only the selected slide is re-synthesized
#[tokio::test]
async fn test_redoSlides_secondSlide_shouldSynthesizeOnlyIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("work");
    common::populate_workspace(&workspace, RenderDialect::Png, 2)?;
    let mock = MockToolchain::new();

    let options = RunOptions::new(&deck).with_workspace(&workspace).with_mode(redo("2"));
    let report = common::run_with_mock(&mock, options).await?;

    let synthesized: Vec<Vec<usize>> = mock
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ToolCall::Synthesize { slides, .. } => Some(slides),
            _ => None,
        })
        .collect();
    assert_eq!(synthesized, vec![vec![2]]);
    assert_eq!(mock.call_count(MockStage::Render), 0);
    assert_eq!(mock.call_count(MockStage::Assemble), 1);
    assert_eq!(report.slides, 2);

    assert_eq!(common::read(&workspace.join("audio_001.wav")), "audio");
    assert_eq!(common::read(&workspace.join("audio_002.wav")), "Here are the details.");
    assert_eq!(common::read(&workspace.join("slides.002.png")), "image");
    Ok(())
}

/// Test that redo refuses a workspace left by a different deck before writing to it
#[tokio::test]
async fn test_redoSlides_withArtifactsForOtherDeck_shouldFailBeforeSynthesis() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("work");
    common::populate_workspace(&workspace, RenderDialect::Png, 3)?;
    let mock = MockToolchain::new();

    let options = RunOptions::new(&deck).with_workspace(&workspace).with_mode(redo("2"));
    let err = common::run_with_mock(&mock, options).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Discovery(DiscoveryError::SlideCountMismatch { artifacts: 3, slides: 2 })
    ));
    assert_eq!(mock.call_count(MockStage::Synthesize), 0);
    assert_eq!(common::read(&workspace.join("audio_002.wav")), "audio");
    Ok(())
}

/// Test an index past the end of the deck
#[tokio::test]
async fn test_redoSlides_withOutOfRangeIndex_shouldFailAfterParse() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = common::create_deck(&temp_dir.path().to_path_buf(), common::MARP_DECK)?;
    let workspace = temp_dir.path().join("work");
    common::populate_workspace(&workspace, RenderDialect::Png, 2)?;
    let mock = MockToolchain::new();

    let options = RunOptions::new(&deck).with_workspace(&workspace).with_mode(redo("1,5"));
    let err = common::run_with_mock(&mock, options).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Usage(UsageError::SlideOutOfRange { index: 5, count: 2 })
    ));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(
        mock.stages(),
        vec![MockStage::Preflight, MockStage::Detect, MockStage::Parse]
    );
    assert_eq!(common::read(&workspace.join("audio_001.wav")), "audio");
    Ok(())
}

/// Test that redo passes slide videos and probes the frame rate
#[tokio::test]
async fn test_redoSlides_withSlideVideo_shouldProbeAndPassVideos() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let deck = common::create_deck(&dir, common::MARP_DECK_WITH_VIDEO)?;
    let clip = common::create_test_file(&dir, "clip.mp4", "video")?;
    let workspace = dir.join("work");
    common::populate_workspace(&workspace, RenderDialect::Png, 2)?;
    let mock = MockToolchain::new().with_probe_rate(29.97);

    let options = RunOptions::new(&deck).with_workspace(&workspace).with_mode(redo("2"));
    let report = common::run_with_mock(&mock, options).await?;

    assert_eq!(report.fps, 30);
    let request = mock
        .calls()
        .into_iter()
        .find_map(|c| match c {
            ToolCall::Assemble(request) => Some(request),
            _ => None,
        })
        .expect("assemble was called");
    assert_eq!(request.videos, vec![None, Some(clip.canonicalize()?)]);
    assert_eq!(request.fps, 30);
    Ok(())
}

/// Test that reassembly resolves slide videos afresh and probes the frame rate
#[tokio::test]
async fn test_reassemble_withSlideVideo_shouldProbeAndPassVideos() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let deck = common::create_deck(&dir, common::MARP_DECK_WITH_VIDEO)?;
    let clip = common::create_test_file(&dir, "clip.mp4", "video")?;
    let workspace = dir.join("work");
    common::populate_workspace(&workspace, RenderDialect::Bare, 2)?;
    let mock = MockToolchain::new().with_probe_rate(29.97);

    let options = RunOptions::new(&deck)
        .with_workspace(&workspace)
        .with_mode(PipelineMode::Reassemble);
    let report = common::run_with_mock(&mock, options).await?;

    assert_eq!((report.fps, report.fps_source), (30, FpsSource::Probed));
    let probes: Vec<ToolCall> = mock
        .calls()
        .into_iter()
        .filter(|c| c.stage() == MockStage::Probe)
        .collect();
    assert_eq!(probes, vec![ToolCall::Probe(clip.canonicalize()?)]);

    let request = mock
        .calls()
        .into_iter()
        .find_map(|c| match c {
            ToolCall::Assemble(request) => Some(request),
            _ => None,
        })
        .expect("assemble was called");
    assert_eq!(request.fps, 30);
    assert_eq!(request.videos, vec![None, Some(clip.canonicalize()?)]);
    assert_eq!(request.images, vec![workspace.join("slides.001"), workspace.join("slides.002")]);
    Ok(())
}
