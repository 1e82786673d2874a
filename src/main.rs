// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use deck2video::app_config::{self, Config};
use deck2video::app_controller::Controller;
use deck2video::deck::{DeckFormat, FormatSelection};
use deck2video::errors::PipelineError;
use deck2video::pipeline::{PipelineMode, RunOptions};

/// CLI wrapper for the deck format selector
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFormat {
    Auto,
    Marp,
    Slidev,
}

impl From<CliFormat> for FormatSelection {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Auto => FormatSelection::Auto,
            CliFormat::Marp => FormatSelection::Fixed(DeckFormat::Marp),
            CliFormat::Slidev => FormatSelection::Fixed(DeckFormat::Slidev),
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for deck2video
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// deck2video - turn a slide deck into a narrated video
///
/// Renders each slide to an image, synthesizes the speaker notes as
/// narration and muxes everything into a single video.
#[derive(Parser, Debug)]
#[command(name = "deck2video")]
#[command(version)]
#[command(about = "Turn a Marp or Slidev deck into a narrated video")]
#[command(long_about = "deck2video renders a Marp or Slidev deck to images, speaks the speaker notes with a TTS engine and assembles a video.

EXAMPLES:
    deck2video talk.md                                   # Full run, writes talk.mp4
    deck2video talk.md -o out/talk.mp4 --fps 30          # Custom output and frame rate
    deck2video talk.md --temp-dir work --keep-temp       # Keep artifacts for later runs
    deck2video talk.md --temp-dir work --reassemble      # Re-mux existing artifacts only
    deck2video talk.md --temp-dir work --redo-slides 2,5 # Re-narrate slides 2 and 5
    deck2video completions bash > deck2video.bash        # Generate bash completions

CONFIGURATION:
    Tool paths, TTS command and encoder settings are read from --config, or from
    <config dir>/deck2video/conf.json when present. A missing --config file is
    created with defaults.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Deck document (Marp or Slidev markdown)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output video path (default: input with .mp4 extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Deck format
    #[arg(long, value_enum, default_value = "auto")]
    format: CliFormat,

    /// Output frame rate (default: probed from the first slide video, else config)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    fps: Option<u32>,

    /// Silence appended after each slide's narration, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 0)]
    audio_padding: u32,

    /// Workspace directory for intermediate files
    #[arg(long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,

    /// Keep the generated workspace after a successful run
    #[arg(long)]
    keep_temp: bool,

    /// Reference voice sample for the TTS engine
    #[arg(long, value_name = "WAV")]
    voice: Option<PathBuf>,

    /// JSON file mapping words to how they should be spoken
    #[arg(long, value_name = "JSON")]
    pronunciations: Option<PathBuf>,

    /// Only assemble the video from an existing workspace
    #[arg(long, conflicts_with = "redo_slides")]
    reassemble: bool,

    /// Re-synthesize narration for these slides (e.g. "2,5") and reassemble
    #[arg(long, value_name = "LIST")]
    redo_slides: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger; the level can change later via log::set_max_level
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger);
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and prefix for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "error:"),
            Level::Warn => ("\x1B[1;33m", "warn: "),
            Level::Info => ("\x1B[1;32m", ""),
            Level::Debug => ("\x1B[1;36m", "debug:"),
            Level::Trace => ("\x1B[1;35m", "trace:"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, prefix) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                color,
                now,
                prefix,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    // Info until the config or --log-level says otherwise
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "deck2video", &mut std::io::stdout());
        return;
    }

    let Some(input) = cli.input.clone() else {
        CommandLineOptions::command()
            .error(ErrorKind::MissingRequiredArgument, "the INPUT deck is required")
            .exit()
    };

    let code = match run(cli, input).await {
        Ok(()) => 0,
        Err(err) => match err.downcast_ref::<PipelineError>() {
            Some(pipeline_error) => {
                error!("{}", pipeline_error);
                pipeline_error.exit_code()
            }
            None => {
                error!("{:#}", err);
                1
            }
        },
    };
    log::logger().flush();
    std::process::exit(code);
}

async fn run(cli: CommandLineOptions, input: PathBuf) -> Result<()> {
    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mode = PipelineMode::from_flags(cli.reassemble, cli.redo_slides.as_deref())
        .map_err(PipelineError::from)?;

    let mut config =
        Config::resolve(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    } else {
        log::set_max_level(config.log_level.to_level_filter());
    }
    config.validate().map_err(PipelineError::from)?;

    let mut options = RunOptions::new(input)
        .with_format(cli.format.into())
        .with_audio_padding_ms(cli.audio_padding)
        .with_keep_workspace(cli.keep_temp)
        .with_mode(mode);
    if let Some(output) = cli.output {
        options = options.with_output(output);
    }
    if let Some(fps) = cli.fps {
        options = options.with_fps(fps);
    }
    if let Some(dir) = cli.temp_dir {
        options = options.with_workspace(dir);
    }
    if let Some(voice) = cli.voice {
        options = options.with_voice(voice);
    }
    if let Some(path) = cli.pronunciations {
        options = options.with_pronunciations(path);
    }

    let controller = Controller::with_config(config);
    let report = controller.run(options).await?;

    info!(
        "Success: {:?} ({} slide(s), {} fps)",
        report.output, report.slides, report.fps
    );
    Ok(())
}
