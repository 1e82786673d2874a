/*!
 * Deck-to-video pipeline.
 *
 * Stages hand off through files in a workspace directory, named by slide
 * index. That convention is what lets a later run skip straight to
 * assembly (`Reassemble`) or re-synthesize narration for a few slides
 * (`RedoSlides`) while reusing everything else.
 *
 * - `selection`: slide selection expressions
 * - `artifacts`: artifact naming and workspace discovery
 * - `video_refs`: validation of embedded video paths
 * - `frame_rate`: output frame-rate policy
 * - `workspace`: workspace creation and retention
 * - `orchestrator`: mode state machine driving the collaborators
 */

pub mod artifacts;
pub mod frame_rate;
pub mod orchestrator;
pub mod selection;
pub mod video_refs;
pub mod workspace;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::deck::FormatSelection;
use crate::errors::UsageError;

pub use artifacts::{discover, DiscoveredArtifacts, RenderDialect};
pub use frame_rate::{resolve_fps, FpsSource};
pub use orchestrator::{Collaborators, Pipeline, RunReport};
pub use selection::SlideSelection;
pub use video_refs::{resolve_video_references, ResolvedVideo};
pub use workspace::{Retention, Workspace, WorkspaceOrigin};

/// Which stages a run executes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// Render, synthesize and assemble everything
    #[default]
    Full,
    /// Assemble from an existing workspace only
    Reassemble,
    /// Re-synthesize narration for the selected slides, then assemble
    RedoSlides(SlideSelection),
}

impl PipelineMode {
    /// Build the mode from the two mutually exclusive CLI flags
    pub fn from_flags(reassemble: bool, redo_slides: Option<&str>) -> Result<Self, UsageError> {
        match (reassemble, redo_slides) {
            (true, Some(_)) => Err(UsageError::ConflictingModes),
            (true, None) => Ok(Self::Reassemble),
            (false, Some(expr)) => Ok(Self::RedoSlides(SlideSelection::parse(expr)?)),
            (false, None) => Ok(Self::Full),
        }
    }

    /// Whether the mode resumes a previous run's workspace
    pub fn resumes_workspace(&self) -> bool {
        !matches!(self, Self::Full)
    }

    /// Flag-style name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::Full => "full run",
            Self::Reassemble => "--reassemble",
            Self::RedoSlides(_) => "--redo-slides",
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RedoSlides(selection) => write!(f, "--redo-slides {}", selection),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Everything a single invocation asks for, fixed before the run starts
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Deck document
    pub input: PathBuf,

    /// Output video; defaults to the input with an `.mp4` extension
    pub output: Option<PathBuf>,

    /// Deck format, or auto-detection
    pub format: FormatSelection,

    /// Explicit output frame rate
    pub fps: Option<u32>,

    /// Silence appended after each slide's narration
    pub audio_padding_ms: u32,

    /// Workspace to use instead of a generated one
    pub workspace: Option<PathBuf>,

    /// Keep a generated workspace after success
    pub keep_workspace: bool,

    /// Reference voice sample for the synthesizer
    pub voice: Option<PathBuf>,

    /// JSON file of pronunciation overrides
    pub pronunciations: Option<PathBuf>,

    /// Stages to run
    pub mode: PipelineMode,
}

impl RunOptions {
    /// Options for a full run of `input` with every default
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            format: FormatSelection::Auto,
            fps: None,
            audio_padding_ms: 0,
            workspace: None,
            keep_workspace: false,
            voice: None,
            pronunciations: None,
            mode: PipelineMode::Full,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_format(mut self, format: FormatSelection) -> Self {
        self.format = format;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn with_audio_padding_ms(mut self, padding: u32) -> Self {
        self.audio_padding_ms = padding;
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn with_keep_workspace(mut self, keep: bool) -> Self {
        self.keep_workspace = keep;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<PathBuf>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_pronunciations(mut self, path: impl Into<PathBuf>) -> Self {
        self.pronunciations = Some(path.into());
        self
    }

    pub fn with_mode(mut self, mode: PipelineMode) -> Self {
        self.mode = mode;
        self
    }

    /// Where the video will be written
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }

    /// Checks that need nothing but the options themselves.
    ///
    /// Resume modes need a workspace path that already exists.
    pub fn validate(&self) -> Result<(), UsageError> {
        if !self.mode.resumes_workspace() {
            return Ok(());
        }
        match &self.workspace {
            None => Err(UsageError::WorkspaceRequired {
                mode: self.mode.name(),
            }),
            Some(dir) if !dir.is_dir() => Err(UsageError::WorkspaceNotFound(dir.clone())),
            Some(_) => Ok(()),
        }
    }
}

/// `talk.md` becomes `talk.mp4` next to it
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("mp4")
}
