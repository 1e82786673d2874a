use log::debug;

use crate::app_config::Config;
use crate::deck::{FrontMatterDetector, MarpBackend, SlidevBackend};
use crate::errors::PipelineError;
use crate::pipeline::{Collaborators, Pipeline, RunOptions, RunReport};
use crate::tools::{CommandSynthesizer, FfmpegAssembler, Ffprobe};

// @module: Application controller wiring configuration to the pipeline

/// Main application controller for deck to video conversion
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a controller with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Collaborators backed by the configured external tools
    pub fn collaborators(&self) -> Collaborators {
        let tools = &self.config.tools;
        Collaborators {
            detector: Box::new(FrontMatterDetector),
            marp: Box::new(MarpBackend::from_config(tools)),
            slidev: Box::new(SlidevBackend::from_config(tools)),
            synthesizer: Box::new(CommandSynthesizer::from_config(&self.config)),
            probe: Box::new(Ffprobe::from_config(&self.config)),
            assembler: Box::new(FfmpegAssembler::from_config(&self.config)),
        }
    }

    /// Build the pipeline for `options` with the given collaborators
    pub fn pipeline(&self, options: RunOptions, tools: Collaborators) -> Pipeline {
        Pipeline::new(options, self.config.video.default_fps, tools)
    }

    /// Run one conversion with the real toolchain
    pub async fn run(&self, options: RunOptions) -> Result<RunReport, PipelineError> {
        debug!("Running with options: {:?}", options);
        self.pipeline(options, self.collaborators()).run().await
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}
