use anyhow::{Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

/// Application configuration module
/// Tool locations, timeouts and encoding settings. Loaded once at startup
/// and never mutated afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// External tool locations and time budgets
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Narration synthesizer settings
    #[serde(default)]
    pub tts: TtsConfig,

    /// Output encoding settings
    #[serde(default)]
    pub video: VideoConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// External tool locations
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolsConfig {
    // @field: ffmpeg executable
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    // @field: ffprobe executable
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,

    // @field: Marp CLI executable
    #[serde(default = "default_marp")]
    pub marp: String,

    // @field: Slidev CLI executable
    #[serde(default = "default_slidev")]
    pub slidev: String,

    // @field: Render timeout seconds
    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,

    // @field: Per-invocation ffmpeg timeout seconds
    #[serde(default = "default_ffmpeg_timeout_secs")]
    pub ffmpeg_timeout_secs: u64,

    // @field: ffprobe timeout seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            marp: default_marp(),
            slidev: default_slidev(),
            render_timeout_secs: default_render_timeout_secs(),
            ffmpeg_timeout_secs: default_ffmpeg_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

/// Text-to-speech command settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TtsConfig {
    /// Executable that turns text into a WAV file
    #[serde(default = "default_tts_command")]
    pub command: String,

    /// Argument template.
    /// Placeholders: {text}, {text_file}, {output}, {voice}.
    /// When no voice is selected, a `{voice}` argument is dropped together
    /// with the flag right before it.
    #[serde(default = "default_tts_args")]
    pub args: Vec<String>,

    /// Timeout per slide in seconds
    #[serde(default = "default_tts_timeout_secs")]
    pub timeout_secs: u64,

    /// Length of the silent clip written for slides without notes
    #[serde(default = "default_silence_secs")]
    pub silence_secs: f32,

    /// Sample rate of generated silence
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            command: default_tts_command(),
            args: default_tts_args(),
            timeout_secs: default_tts_timeout_secs(),
            silence_secs: default_silence_secs(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// Output video settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VideoConfig {
    /// Frame rate when none is given and no slide embeds a video
    #[serde(default = "default_fps")]
    pub default_fps: u32,

    /// Output width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// ffmpeg video codec
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Constant rate factor for the video codec
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// ffmpeg audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate, e.g. "192k"
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            default_fps: default_fps(),
            width: default_width(),
            height: default_height(),
            codec: default_video_codec(),
            crf: default_crf(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

impl Config {
    /// Default location: `<config dir>/deck2video/conf.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("deck2video").join("conf.json"))
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the configuration for this run.
    ///
    /// An explicit path that does not exist gets a default file written to
    /// it. Without an explicit path the default location is read if present,
    /// otherwise built-in defaults are used.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                warn!("Config file not found at '{}', creating default config.", path.display());
                let config = Config::default();
                config.save(path)?;
                Ok(config)
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Config::default()),
            },
        }
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_empty = [
            ("tools.ffmpeg", &self.tools.ffmpeg),
            ("tools.ffprobe", &self.tools.ffprobe),
            ("tools.marp", &self.tools.marp),
            ("tools.slidev", &self.tools.slidev),
            ("tts.command", &self.tts.command),
            ("video.codec", &self.video.codec),
            ("video.audio_codec", &self.video.audio_codec),
        ];
        for (field, value) in non_empty {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: "must not be empty".to_string(),
                });
            }
        }

        let timeouts = [
            ("tools.render_timeout_secs", self.tools.render_timeout_secs),
            ("tools.ffmpeg_timeout_secs", self.tools.ffmpeg_timeout_secs),
            ("tools.probe_timeout_secs", self.tools.probe_timeout_secs),
            ("tts.timeout_secs", self.tts.timeout_secs),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: "must be greater than 0".to_string(),
                });
            }
        }

        if self.video.default_fps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "video.default_fps",
                message: "must be greater than 0".to_string(),
            });
        }

        // libx264 with yuv420p needs even dimensions
        for (field, value) in [("video.width", self.video.width), ("video.height", self.video.height)] {
            if value == 0 || value % 2 != 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: format!("must be a positive even number, got {}", value),
                });
            }
        }

        if !self.tts.silence_secs.is_finite() || self.tts.silence_secs <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "tts.silence_secs",
                message: "must be a positive number".to_string(),
            });
        }

        Ok(())
    }
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_marp() -> String {
    "marp".to_string()
}

fn default_slidev() -> String {
    "slidev".to_string()
}

fn default_render_timeout_secs() -> u64 {
    600
}

fn default_ffmpeg_timeout_secs() -> u64 {
    1800
}

fn default_probe_timeout_secs() -> u64 {
    60
}

fn default_tts_command() -> String {
    "tts".to_string()
}

fn default_tts_args() -> Vec<String> {
    ["--text", "{text}", "--speaker_wav", "{voice}", "--out_path", "{output}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_tts_timeout_secs() -> u64 {
    300
}

fn default_silence_secs() -> f32 {
    1.0
}

fn default_sample_rate() -> u32 {
    24000
}

fn default_fps() -> u32 {
    24
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_crf() -> u8 {
    23
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}
