/*!
 * Slide decks and the backends that parse and render them.
 *
 * Two markdown deck formats are supported, Marp and Slidev. Each has a
 * `DeckBackend` that parses the document into `Slide`s and renders those
 * slides to images in the workspace. The backend is chosen once per run,
 * either pinned by the caller or picked by a `FormatDetector`.
 */

use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};

use crate::errors::ToolError;
use crate::pipeline::artifacts::{scan_render_set, RenderDialect};

pub mod markdown;
pub mod marp;
pub mod slidev;

pub use marp::MarpBackend;
pub use slidev::SlidevBackend;

/// One slide of a parsed deck
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    // @field: 1-based position in the document
    pub index: usize,

    // @field: Slide content with comments stripped
    pub body: String,

    // @field: Speaker notes used as narration
    pub notes: Option<String>,

    // @field: Video reference relative to the deck file
    pub video: Option<String>,
}

impl Slide {
    pub fn new(index: usize, body: impl Into<String>) -> Self {
        Self {
            index,
            body: body.into(),
            notes: None,
            video: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_video(mut self, video: impl Into<String>) -> Self {
        self.video = Some(video.into());
        self
    }

    /// Whether there is narration text for this slide
    pub fn has_notes(&self) -> bool {
        self.notes.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

/// Supported deck formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeckFormat {
    Marp,
    Slidev,
}

impl DeckFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marp => "marp",
            Self::Slidev => "slidev",
        }
    }
}

impl fmt::Display for DeckFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Caller's format choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatSelection {
    /// Ask the detector
    #[default]
    Auto,
    /// Use this format without detection
    Fixed(DeckFormat),
}

/// Parse and render capability for one deck format
#[async_trait]
pub trait DeckBackend: Send + Sync + Debug {
    /// Format handled by this backend
    fn format(&self) -> DeckFormat;

    /// Parse a deck document into slides in document order
    async fn parse(&self, document: &Path) -> Result<Vec<Slide>, ToolError>;

    /// Render every slide to an image artifact in `workspace`.
    ///
    /// Returns the artifact paths in slide order.
    async fn render(
        &self,
        document: &Path,
        slides: &[Slide],
        workspace: &Path,
    ) -> Result<Vec<PathBuf>, ToolError>;
}

/// Decides the deck format of a document
#[async_trait]
pub trait FormatDetector: Send + Sync + Debug {
    async fn detect(&self, document: &Path) -> Result<DeckFormat, ToolError>;
}

/// Render artifacts a renderer left in `workspace`, checked against the
/// number of slides it was asked to render
pub(crate) fn collect_rendered(
    tool: &str,
    workspace: &Path,
    expected: usize,
) -> Result<Vec<PathBuf>, ToolError> {
    let found = scan_render_set(workspace, &RenderDialect::RANKED)
        .map_err(|e| ToolError::failed(tool, e.to_string()))?;

    let images = found.map(|(_, images)| images).unwrap_or_default();
    if images.len() != expected {
        return Err(ToolError::failed(
            tool,
            format!("rendered {} image(s) for {} slide(s)", images.len(), expected),
        ));
    }
    Ok(images)
}

/// Detects the format from the document's front matter
#[derive(Debug, Default, Clone, Copy)]
pub struct FrontMatterDetector;

#[async_trait]
impl FormatDetector for FrontMatterDetector {
    async fn detect(&self, document: &Path) -> Result<DeckFormat, ToolError> {
        let text = tokio::fs::read_to_string(document)
            .await
            .map_err(|e| ToolError::io(format!("reading {:?}", document), e))?;
        Ok(markdown::detect_format(&text))
    }
}
