/*!
 * Recording mock collaborators for testing.
 *
 * `MockToolchain` hands out one mock per collaborator seam. All of them
 * share a single call log so tests can assert on stage order:
 * - `MockToolchain::new()` - every stage succeeds and writes real artifacts
 * - `MockToolchain::failing_at(stage, message)` - the given stage fails
 * - `with_detected_format`, `with_probe_rate`, `with_slides` tune behavior
 *
 * Backends, synthesizer and assembler write placeholder files where the real
 * tools would, so discovery and retention behave as in a real run.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{AssemblyRequest, Assembler, FrameRateProbe, NarrationSynthesizer, VoiceSelection};
use crate::deck::marp::parse_marp;
use crate::deck::slidev::parse_slidev;
use crate::deck::{DeckBackend, DeckFormat, FormatDetector, Slide};
use crate::errors::ToolError;
use crate::pipeline::artifacts::{audio_file_name, RenderDialect};
use crate::pipeline::Collaborators;

/// Collaborator stage a call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStage {
    Detect,
    Parse,
    Render,
    Synthesize,
    Probe,
    Preflight,
    Assemble,
}

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Detect(PathBuf),
    Parse(DeckFormat),
    Render {
        format: DeckFormat,
        slides: Vec<usize>,
        workspace: PathBuf,
    },
    Synthesize {
        slides: Vec<usize>,
        voice: Option<PathBuf>,
        workspace: PathBuf,
    },
    Probe(PathBuf),
    Preflight,
    Assemble(AssemblyRequest),
}

impl ToolCall {
    pub fn stage(&self) -> MockStage {
        match self {
            Self::Detect(_) => MockStage::Detect,
            Self::Parse(_) => MockStage::Parse,
            Self::Render { .. } => MockStage::Render,
            Self::Synthesize { .. } => MockStage::Synthesize,
            Self::Probe(_) => MockStage::Probe,
            Self::Preflight => MockStage::Preflight,
            Self::Assemble(_) => MockStage::Assemble,
        }
    }
}

/// Shared configuration and call log behind every mock collaborator
#[derive(Debug, Clone)]
pub struct MockToolchain {
    calls: Arc<Mutex<Vec<ToolCall>>>,
    detected: DeckFormat,
    probe_rate: f64,
    slides: Option<Vec<Slide>>,
    failure: Option<(MockStage, String)>,
}

impl Default for MockToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockToolchain {
    /// A toolchain where every stage succeeds
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            detected: DeckFormat::Marp,
            probe_rate: 30.0,
            slides: None,
            failure: None,
        }
    }

    /// A toolchain whose `stage` fails with `message`
    pub fn failing_at(stage: MockStage, message: impl Into<String>) -> Self {
        let mut mock = Self::new();
        mock.failure = Some((stage, message.into()));
        mock
    }

    /// Format the detector reports
    pub fn with_detected_format(mut self, format: DeckFormat) -> Self {
        self.detected = format;
        self
    }

    /// Rate the probe reports for any file
    pub fn with_probe_rate(mut self, rate: f64) -> Self {
        self.probe_rate = rate;
        self
    }

    /// Slides the backends return instead of parsing the document
    pub fn with_slides(mut self, slides: Vec<Slide>) -> Self {
        self.slides = Some(slides);
        self
    }

    /// Boxed collaborators sharing this toolchain's call log
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            detector: Box::new(MockDetector(self.clone())),
            marp: Box::new(MockBackend {
                format: DeckFormat::Marp,
                toolchain: self.clone(),
            }),
            slidev: Box::new(MockBackend {
                format: DeckFormat::Slidev,
                toolchain: self.clone(),
            }),
            synthesizer: Box::new(MockSynthesizer(self.clone())),
            probe: Box::new(MockProbe(self.clone())),
            assembler: Box::new(MockAssembler(self.clone())),
        }
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().clone()
    }

    /// Stage of every call so far, in order
    pub fn stages(&self) -> Vec<MockStage> {
        self.calls.lock().iter().map(ToolCall::stage).collect()
    }

    /// Workspace seen by the first collaborator that was handed one
    pub fn workspace(&self) -> Option<PathBuf> {
        self.calls.lock().iter().find_map(|call| match call {
            ToolCall::Render { workspace, .. } | ToolCall::Synthesize { workspace, .. } => {
                Some(workspace.clone())
            }
            ToolCall::Assemble(request) => Some(request.workspace.clone()),
            _ => None,
        })
    }

    /// Number of calls made to `stage`
    pub fn call_count(&self, stage: MockStage) -> usize {
        self.calls.lock().iter().filter(|c| c.stage() == stage).count()
    }

    /// Record `call`, then fail if its stage is configured to fail
    fn record(&self, call: ToolCall) -> Result<(), ToolError> {
        let stage = call.stage();
        self.calls.lock().push(call);
        match &self.failure {
            Some((failing, message)) if *failing == stage => {
                Err(ToolError::failed(format!("{:?}", stage).to_lowercase(), message.clone()))
            }
            _ => Ok(()),
        }
    }
}

fn write_placeholder(path: &Path, content: &[u8]) -> Result<(), ToolError> {
    std::fs::write(path, content).map_err(|e| ToolError::io(format!("writing {:?}", path), e))
}

#[derive(Debug)]
struct MockDetector(MockToolchain);

#[async_trait]
impl FormatDetector for MockDetector {
    async fn detect(&self, document: &Path) -> Result<DeckFormat, ToolError> {
        self.0.record(ToolCall::Detect(document.to_path_buf()))?;
        Ok(self.0.detected)
    }
}

/// Marp mocks render bare `slides.NNN`; Slidev mocks render `slides.NNN.png`
#[derive(Debug)]
struct MockBackend {
    format: DeckFormat,
    toolchain: MockToolchain,
}

#[async_trait]
impl DeckBackend for MockBackend {
    fn format(&self) -> DeckFormat {
        self.format
    }

    async fn parse(&self, document: &Path) -> Result<Vec<Slide>, ToolError> {
        self.toolchain.record(ToolCall::Parse(self.format))?;
        if let Some(slides) = &self.toolchain.slides {
            return Ok(slides.clone());
        }
        let text = std::fs::read_to_string(document)
            .map_err(|e| ToolError::io(format!("reading {:?}", document), e))?;
        match self.format {
            DeckFormat::Marp => parse_marp(&text, document),
            DeckFormat::Slidev => parse_slidev(&text, document),
        }
    }

    async fn render(
        &self,
        _document: &Path,
        slides: &[Slide],
        workspace: &Path,
    ) -> Result<Vec<PathBuf>, ToolError> {
        self.toolchain.record(ToolCall::Render {
            format: self.format,
            slides: slides.iter().map(|s| s.index).collect(),
            workspace: workspace.to_path_buf(),
        })?;

        let dialect = match self.format {
            DeckFormat::Marp => RenderDialect::Bare,
            DeckFormat::Slidev => RenderDialect::Png,
        };
        slides
            .iter()
            .map(|slide| {
                let path = workspace.join(dialect.file_name(slide.index));
                write_placeholder(&path, slide.body.as_bytes())?;
                Ok(path)
            })
            .collect()
    }
}

/// Writes the narration text each audio file would speak
#[derive(Debug)]
struct MockSynthesizer(MockToolchain);

#[async_trait]
impl NarrationSynthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        slides: &[Slide],
        workspace: &Path,
        voice: &VoiceSelection,
    ) -> Result<Vec<PathBuf>, ToolError> {
        self.0.record(ToolCall::Synthesize {
            slides: slides.iter().map(|s| s.index).collect(),
            voice: voice.reference.clone(),
            workspace: workspace.to_path_buf(),
        })?;

        slides
            .iter()
            .map(|slide| {
                let path = workspace.join(audio_file_name(slide.index));
                let spoken = slide
                    .notes
                    .as_deref()
                    .map(|n| voice.pronunciations.apply(n))
                    .unwrap_or_default();
                write_placeholder(&path, spoken.as_bytes())?;
                Ok(path)
            })
            .collect()
    }
}

#[derive(Debug)]
struct MockProbe(MockToolchain);

#[async_trait]
impl FrameRateProbe for MockProbe {
    async fn probe(&self, path: &Path) -> Result<f64, ToolError> {
        self.0.record(ToolCall::Probe(path.to_path_buf()))?;
        Ok(self.0.probe_rate)
    }
}

#[derive(Debug)]
struct MockAssembler(MockToolchain);

#[async_trait]
impl Assembler for MockAssembler {
    async fn preflight(&self) -> Result<(), ToolError> {
        self.0.record(ToolCall::Preflight)
    }

    async fn assemble(&self, request: &AssemblyRequest) -> Result<(), ToolError> {
        self.0.record(ToolCall::Assemble(request.clone()))?;
        if let Some(parent) = request.output.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolError::io(format!("creating {:?}", parent), e))?;
        }
        write_placeholder(&request.output, b"mp4")
    }
}
