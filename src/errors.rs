/*!
 * Error types for the deck2video application.
 *
 * The taxonomy mirrors how a run can fail: the caller asked for something
 * impossible (`UsageError`), a resumed workspace is not usable
 * (`DiscoveryError`), an embedded video reference is unsafe or missing
 * (`VideoRefError`), or one of the external tools failed (`ToolError`).
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors caused by invalid invocations, detected before any tool runs
#[derive(Error, Debug)]
pub enum UsageError {
    /// The input deck does not exist
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The slide selection expression was empty
    #[error("Slide selection is empty")]
    EmptySelection,

    /// A token in the slide selection is not a positive integer
    #[error("Invalid slide number '{token}': slide numbers must be integers starting at 1")]
    InvalidSlideNumber {
        /// The offending token, trimmed
        token: String,
    },

    /// A selected slide does not exist in the parsed deck
    #[error("Slide {index} is out of range: the deck has {count} slide(s)")]
    SlideOutOfRange {
        /// Requested slide index
        index: usize,
        /// Number of slides in the deck
        count: usize,
    },

    /// --reassemble and --redo-slides were both given
    #[error("--reassemble and --redo-slides cannot be used together")]
    ConflictingModes,

    /// A resume mode was requested without a workspace path
    #[error("{mode} requires --temp-dir pointing at a previous run's workspace")]
    WorkspaceRequired {
        /// Human name of the mode
        mode: &'static str,
    },

    /// The workspace given for a resume mode does not exist
    #[error("Workspace directory not found: {}", .0.display())]
    WorkspaceNotFound(PathBuf),

    /// The pronunciation file could not be found
    #[error("Pronunciations file not found: {}", .0.display())]
    PronunciationsNotFound(PathBuf),

    /// The pronunciation file is not a JSON object of strings
    #[error("Invalid pronunciations file {}: {message}", .path.display())]
    InvalidPronunciations {
        /// File that failed to load
        path: PathBuf,
        /// Parser message
        message: String,
    },
}

/// Errors raised while discovering artifacts in an existing workspace
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// No render artifacts in any dialect
    #[error("No slide images found in {}", .0.display())]
    NoImages(PathBuf),

    /// No audio artifacts
    #[error("No audio files found in {}", .0.display())]
    NoAudio(PathBuf),

    /// Image and audio counts differ
    #[error("Found {images} slide image(s) but {audio} audio file(s) in {}", .dir.display())]
    CountMismatch {
        /// Workspace that was scanned
        dir: PathBuf,
        /// Render artifact count
        images: usize,
        /// Audio artifact count
        audio: usize,
    },

    /// Artifact counts disagree with the parsed deck
    #[error("Workspace has {artifacts} slide(s) worth of artifacts but the deck has {slides} slide(s)")]
    SlideCountMismatch {
        /// Number of artifact pairs
        artifacts: usize,
        /// Number of parsed slides
        slides: usize,
    },

    /// The workspace could not be read
    #[error("Failed to read workspace {}: {source}", .dir.display())]
    Io {
        /// Workspace that was scanned
        dir: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while resolving embedded video references
#[derive(Error, Debug)]
pub enum VideoRefError {
    /// The reference resolves outside the deck directory
    #[error("Video path for slide {index} escapes the input directory: {reference}")]
    OutsideDeckDirectory {
        /// Slide carrying the reference
        index: usize,
        /// Reference as written in the deck
        reference: String,
    },

    /// The referenced file does not exist
    #[error("Video file not found for slide {index}: {}", .path.display())]
    NotFound {
        /// Slide carrying the reference
        index: usize,
        /// Path the reference resolved to
        path: PathBuf,
    },

    /// The deck directory itself could not be canonicalized
    #[error("Cannot resolve input directory {}: {source}", .dir.display())]
    DeckDirectory {
        /// Directory containing the deck
        dir: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Failures reported by external collaborators (parser, renderer, TTS, ffmpeg)
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool could not be started
    #[error("Failed to execute {tool}: {message}")]
    Spawn {
        /// Tool name
        tool: String,
        /// Spawn error message
        message: String,
    },

    /// The tool ran and reported failure
    #[error("{tool} failed: {message}")]
    Failed {
        /// Tool name
        tool: String,
        /// Filtered stderr or a description
        message: String,
    },

    /// The tool exceeded its time budget
    #[error("{tool} timed out after {secs} seconds")]
    Timeout {
        /// Tool name
        tool: String,
        /// Configured timeout
        secs: u64,
    },

    /// The deck could not be parsed
    #[error("Failed to parse {}: {message}", .path.display())]
    Format {
        /// Deck path
        path: PathBuf,
        /// What was wrong
        message: String,
    },

    /// Local file handling around a tool invocation failed
    #[error("I/O error during {context}: {source}")]
    Io {
        /// What was being done
        context: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Shorthand for a failed tool with a message
    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an I/O failure with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Errors with the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A value is outside its allowed range
    #[error("Invalid configuration value for {field}: {message}")]
    InvalidValue {
        /// Dotted field path
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

/// Top-level error returned by a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid invocation
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// Resumed workspace is unusable
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Embedded video reference rejected
    #[error(transparent)]
    VideoRef(#[from] VideoRefError),

    /// External collaborator failed
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Configuration rejected by validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Render and audio artifacts disagree with the slide count
    #[error("Artifact count mismatch before assembly: {images} image(s), {audio} audio file(s), {slides} slide(s)")]
    AssemblyPrecondition {
        /// Render artifact count
        images: usize,
        /// Audio artifact count
        audio: usize,
        /// Parsed slide count
        slides: usize,
    },

    /// The workspace could not be created or removed
    #[error("Workspace error at {}: {source}", .path.display())]
    Workspace {
        /// Workspace path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Process exit status for this error: 2 for usage errors, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            _ => 1,
        }
    }

    /// Whether this error was raised by an external collaborator
    pub fn is_tool_failure(&self) -> bool {
        matches!(self, Self::Tool(_))
    }
}
