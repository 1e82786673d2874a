/*!
 * Pipeline orchestration.
 *
 * `Pipeline::run` validates the request, prepares the workspace and then
 * walks the stages for the selected mode:
 *
 * - `Full`: parse, render, synthesize every slide, assemble
 * - `Reassemble`: parse, discover existing artifacts, assemble
 * - `RedoSlides`: parse, check the existing artifacts, synthesize the
 *   selected slides, discover again, assemble
 *
 * Usage errors are raised before the workspace exists. Any later failure
 * preserves the workspace and returns the original error unchanged.
 */

use log::{debug, info};
use std::path::PathBuf;

use super::artifacts::discover;
use super::frame_rate::{resolve_fps, FpsSource};
use super::video_refs::{resolve_video_references, video_paths};
use super::workspace::{Retention, Workspace};
use super::{PipelineMode, RunOptions};
use crate::deck::{DeckBackend, DeckFormat, FormatDetector, FormatSelection, Slide};
use crate::errors::{DiscoveryError, PipelineError, UsageError};
use crate::pronunciation::Pronunciations;
use crate::tools::{AssemblyRequest, Assembler, FrameRateProbe, NarrationSynthesizer, VoiceSelection};

/// The collaborators a run calls out to
#[derive(Debug)]
pub struct Collaborators {
    pub detector: Box<dyn FormatDetector>,
    pub marp: Box<dyn DeckBackend>,
    pub slidev: Box<dyn DeckBackend>,
    pub synthesizer: Box<dyn NarrationSynthesizer>,
    pub probe: Box<dyn FrameRateProbe>,
    pub assembler: Box<dyn Assembler>,
}

impl Collaborators {
    /// Backend for `format`
    pub fn backend(&self, format: DeckFormat) -> &dyn DeckBackend {
        match format {
            DeckFormat::Marp => self.marp.as_ref(),
            DeckFormat::Slidev => self.slidev.as_ref(),
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Video that was written
    pub output: PathBuf,
    /// Workspace used by the run
    pub workspace: PathBuf,
    /// Whether the workspace still exists
    pub retention: Retention,
    /// Number of slides assembled
    pub slides: usize,
    /// Output frame rate
    pub fps: u32,
    /// Where the frame rate came from
    pub fps_source: FpsSource,
    /// Format the deck was handled as
    pub format: DeckFormat,
}

/// What the stages produced, before retention is applied
struct StageOutcome {
    slides: usize,
    fps: u32,
    fps_source: FpsSource,
    format: DeckFormat,
}

/// One configured run
#[derive(Debug)]
pub struct Pipeline {
    options: RunOptions,
    default_fps: u32,
    tools: Collaborators,
}

impl Pipeline {
    pub fn new(options: RunOptions, default_fps: u32, tools: Collaborators) -> Self {
        Self {
            options,
            default_fps,
            tools,
        }
    }

    /// Execute the run
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let options = &self.options;
        options.validate()?;
        if !options.input.is_file() {
            return Err(UsageError::InputNotFound(options.input.clone()).into());
        }
        let voice = self.load_voice()?;

        self.tools.assembler.preflight().await?;

        let workspace = Workspace::create_or_reuse(options.workspace.as_deref())?;
        info!("Starting {} for {:?}", options.mode, options.input);

        match self.run_stages(&workspace, &voice).await {
            Ok(outcome) => {
                let path = workspace.path().to_path_buf();
                let retention = workspace.finish_success(options.keep_workspace);
                info!("Finished: {:?}", options.output_path());
                Ok(RunReport {
                    output: options.output_path(),
                    workspace: path,
                    retention,
                    slides: outcome.slides,
                    fps: outcome.fps,
                    fps_source: outcome.fps_source,
                    format: outcome.format,
                })
            }
            Err(err) => {
                workspace.preserve_after_failure();
                Err(err)
            }
        }
    }

    fn load_voice(&self) -> Result<VoiceSelection, UsageError> {
        let pronunciations = match &self.options.pronunciations {
            Some(path) => Pronunciations::load(path)?,
            None => Pronunciations::default(),
        };
        Ok(VoiceSelection {
            reference: self.options.voice.clone(),
            pronunciations,
        })
    }

    async fn select_format(&self) -> Result<DeckFormat, PipelineError> {
        match self.options.format {
            FormatSelection::Fixed(format) => Ok(format),
            FormatSelection::Auto => {
                let format = self.tools.detector.detect(&self.options.input).await?;
                info!("Detected {} deck", format);
                Ok(format)
            }
        }
    }

    async fn run_stages(
        &self,
        ws: &Workspace,
        voice: &VoiceSelection,
    ) -> Result<StageOutcome, PipelineError> {
        let options = &self.options;
        let workspace = ws.path();
        let backend = self.tools.backend(self.select_format().await?);

        let slides = backend.parse(&options.input).await?;
        info!("Parsed {} slide(s) from {} deck", slides.len(), backend.format());

        if let PipelineMode::RedoSlides(selection) = &options.mode {
            selection.validate_against(slides.len())?;
        }

        let videos = resolve_video_references(&slides, &options.input)?;

        let (images, audio) = match &options.mode {
            PipelineMode::Full => {
                let cleared = ws.clear_artifacts()?;
                if cleared > 0 {
                    debug!("Cleared {} artifact(s) from a previous run", cleared);
                }
                let images = backend.render(&options.input, &slides, workspace).await?;
                info!("Rendered {} slide image(s)", images.len());
                let audio = self
                    .tools
                    .synthesizer
                    .synthesize(&slides, workspace, voice)
                    .await?;
                (images, audio)
            }
            PipelineMode::Reassemble => {
                let found = discover(workspace)?;
                check_slide_count(found.len(), slides.len())?;
                info!(
                    "Reassembling from {} existing slide(s) ({} images)",
                    found.len(),
                    found.dialect.label()
                );
                (found.images, found.audio)
            }
            PipelineMode::RedoSlides(selection) => {
                // The workspace must belong to this deck before anything is written
                let existing = discover(workspace)?;
                check_slide_count(existing.len(), slides.len())?;

                let subset: Vec<Slide> = slides
                    .iter()
                    .filter(|s| selection.contains(s.index))
                    .cloned()
                    .collect();
                info!(
                    "Re-synthesizing narration for slide(s) {}; slide images are reused as rendered",
                    selection
                );
                self.tools
                    .synthesizer
                    .synthesize(&subset, workspace, voice)
                    .await?;

                let found = discover(workspace)?;
                check_slide_count(found.len(), slides.len())?;
                (found.images, found.audio)
            }
        };

        if images.len() != slides.len() || audio.len() != slides.len() {
            return Err(PipelineError::AssemblyPrecondition {
                images: images.len(),
                audio: audio.len(),
                slides: slides.len(),
            });
        }

        let (fps, fps_source) = resolve_fps(
            options.fps,
            &videos,
            self.tools.probe.as_ref(),
            self.default_fps,
        )
        .await?;

        let request = AssemblyRequest {
            images,
            audio,
            output: options.output_path(),
            videos: video_paths(&videos),
            fps,
            audio_padding_ms: options.audio_padding_ms,
            workspace: workspace.to_path_buf(),
        };
        debug!("Assembly request: {:?}", request);
        self.tools.assembler.assemble(&request).await?;

        Ok(StageOutcome {
            slides: slides.len(),
            fps,
            fps_source,
            format: backend.format(),
        })
    }
}

fn check_slide_count(artifacts: usize, slides: usize) -> Result<(), DiscoveryError> {
    if artifacts != slides {
        return Err(DiscoveryError::SlideCountMismatch { artifacts, slides });
    }
    Ok(())
}
