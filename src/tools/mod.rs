/*!
 * External collaborators used by the pipeline after parsing.
 *
 * - `tts`: narration synthesis through a configurable TTS command
 * - `ffmpeg`: frame-rate probing and video assembly
 * - `process`: shared process runner with timeouts
 * - `mock`: recording doubles for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::deck::Slide;
use crate::errors::ToolError;
use crate::pronunciation::Pronunciations;

pub mod ffmpeg;
pub mod mock;
pub mod process;
pub mod tts;

pub use ffmpeg::{FfmpegAssembler, Ffprobe};
pub use tts::CommandSynthesizer;

/// Voice options handed to the synthesizer
#[derive(Debug, Clone, Default)]
pub struct VoiceSelection {
    /// Reference voice sample, if the engine clones voices
    pub reference: Option<PathBuf>,
    /// Word replacements applied before synthesis
    pub pronunciations: Pronunciations,
}

/// Turns slide notes into narration clips
#[async_trait]
pub trait NarrationSynthesizer: Send + Sync + Debug {
    /// Write one audio artifact per slide into `workspace`, named by slide
    /// index, and return their paths in the order of `slides`
    async fn synthesize(
        &self,
        slides: &[Slide],
        workspace: &Path,
        voice: &VoiceSelection,
    ) -> Result<Vec<PathBuf>, ToolError>;
}

/// Reads the native frame rate of a video file
#[async_trait]
pub trait FrameRateProbe: Send + Sync + Debug {
    async fn probe(&self, path: &Path) -> Result<f64, ToolError>;
}

/// Everything the assembler needs to produce the final video
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyRequest {
    /// Slide images in slide order
    pub images: Vec<PathBuf>,
    /// Narration clips in slide order
    pub audio: Vec<PathBuf>,
    /// Final video path
    pub output: PathBuf,
    /// Clip replacing each slide's image, if any
    pub videos: Vec<Option<PathBuf>>,
    /// Output frame rate
    pub fps: u32,
    /// Silence appended after each narration clip
    pub audio_padding_ms: u32,
    /// Scratch directory for intermediate files
    pub workspace: PathBuf,
}

/// Muxes images, narration and clips into the output video
#[async_trait]
pub trait Assembler: Send + Sync + Debug {
    /// Check that the encoder is usable before any work starts
    async fn preflight(&self) -> Result<(), ToolError> {
        Ok(())
    }

    async fn assemble(&self, request: &AssemblyRequest) -> Result<(), ToolError>;
}
