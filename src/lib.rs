/*!
 * # deck2video - narrated videos from slide decks
 *
 * A Rust library that turns a Marp or Slidev markdown deck into a narrated
 * video by orchestrating a slide renderer, a text-to-speech engine and
 * ffmpeg.
 *
 * ## Features
 *
 * - Full runs: render, synthesize and assemble
 * - `--reassemble`: mux again from an existing workspace
 * - `--redo-slides`: re-narrate a subset of slides, reuse everything else
 * - Embedded slide videos with path validation and frame-rate probing
 * - Pronunciation overrides for the narration text
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `deck`: Slide model, Marp and Slidev parsing/rendering backends
 * - `pipeline`: The orchestrator and its pure building blocks:
 *   - `pipeline::selection`: Slide selection expressions
 *   - `pipeline::artifacts`: Artifact naming and discovery
 *   - `pipeline::video_refs`: Embedded video path validation
 *   - `pipeline::frame_rate`: Output frame-rate policy
 *   - `pipeline::workspace`: Workspace lifecycle
 * - `tools`: TTS, ffprobe and ffmpeg adapters plus recording mocks
 * - `pronunciation`: Pronunciation overrides
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod deck;
pub mod errors;
pub mod file_utils;
pub mod pipeline;
pub mod pronunciation;
pub mod tools;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use deck::{DeckFormat, FormatSelection, Slide};
pub use errors::{
    ConfigError, DiscoveryError, PipelineError, ToolError, UsageError, VideoRefError,
};
pub use pipeline::{Pipeline, PipelineMode, RunOptions, RunReport, SlideSelection};
