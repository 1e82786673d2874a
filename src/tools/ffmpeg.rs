/*!
 * ffprobe frame-rate/duration probing and ffmpeg video assembly.
 *
 * Assembly renders one segment per slide (still image or embedded clip,
 * with narration padded by the requested silence) and then joins the
 * segments with the concat demuxer.
 */

use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::process::ToolCommand;
use super::{AssemblyRequest, Assembler, FrameRateProbe};
use crate::app_config::{Config, VideoConfig};
use crate::errors::ToolError;
use crate::file_utils::FileManager;

/// ffprobe wrapper
#[derive(Debug, Clone)]
pub struct Ffprobe {
    program: String,
    timeout_secs: u64,
}

impl Ffprobe {
    pub fn new(program: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            timeout_secs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.tools.ffprobe.clone(), config.tools.probe_timeout_secs)
    }

    async fn query(&self, path: &Path, entries: &str, streams: Option<&str>) -> Result<Value, ToolError> {
        let mut command = ToolCommand::new("ffprobe", &self.program, self.timeout_secs)
            .args(["-v", "error"]);
        if let Some(selector) = streams {
            command = command.args(["-select_streams", selector]);
        }
        let output = command
            .args(["-show_entries", entries, "-of", "json"])
            .path_arg(path)
            .run()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&stdout)
            .map_err(|e| ToolError::failed("ffprobe", format!("unparsable output for {:?}: {}", path, e)))
    }

    /// Duration of a media file in seconds
    pub async fn duration(&self, path: &Path) -> Result<f64, ToolError> {
        let json = self.query(path, "format=duration", None).await?;
        json.get("format")
            .and_then(|f| f.get("duration"))
            .and_then(|d| d.as_str())
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| ToolError::failed("ffprobe", format!("no duration reported for {:?}", path)))
    }
}

/// Parse an ffprobe rate such as `30000/1001` or `25`
pub fn parse_rate(rate: &str) -> Option<f64> {
    let rate = rate.trim();
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => rate.parse().ok(),
    }
}

#[async_trait]
impl FrameRateProbe for Ffprobe {
    async fn probe(&self, path: &Path) -> Result<f64, ToolError> {
        let json = self.query(path, "stream=r_frame_rate", Some("v:0")).await?;
        let rate = json
            .get("streams")
            .and_then(|s| s.as_array())
            .and_then(|s| s.first())
            .and_then(|s| s.get("r_frame_rate"))
            .and_then(|r| r.as_str())
            .and_then(parse_rate)
            .ok_or_else(|| ToolError::failed("ffprobe", format!("no video frame rate in {:?}", path)))?;
        debug!("Probed {:.3} fps for {:?}", rate, path);
        Ok(rate)
    }
}

/// ffmpeg-based assembler
#[derive(Debug, Clone)]
pub struct FfmpegAssembler {
    program: String,
    timeout_secs: u64,
    video: VideoConfig,
    probe: Ffprobe,
}

impl FfmpegAssembler {
    pub fn new(program: impl Into<String>, timeout_secs: u64, video: VideoConfig, probe: Ffprobe) -> Self {
        Self {
            program: program.into(),
            timeout_secs,
            video,
            probe,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.tools.ffmpeg.clone(),
            config.tools.ffmpeg_timeout_secs,
            config.video.clone(),
            Ffprobe::from_config(config),
        )
    }

    fn command(&self) -> ToolCommand {
        ToolCommand::new("ffmpeg", &self.program, self.timeout_secs).args(["-y", "-v", "error"])
    }

    /// Scale and letterbox to the output size at the output frame rate
    fn video_filter(&self, fps: u32) -> String {
        let (w, h) = (self.video.width, self.video.height);
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p"
        )
    }

    fn encoder_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.video.codec.clone(),
            "-crf".to_string(),
            self.video.crf.to_string(),
            "-c:a".to_string(),
            self.video.audio_codec.clone(),
            "-b:a".to_string(),
            self.video.audio_bitrate.clone(),
            "-ar".to_string(),
            "48000".to_string(),
            "-ac".to_string(),
            "2".to_string(),
        ]
    }

    async fn render_segment(
        &self,
        image: &Path,
        audio: &Path,
        video: Option<&Path>,
        fps: u32,
        padding_secs: f64,
        segment: &Path,
    ) -> Result<(), ToolError> {
        let narration = self.probe.duration(audio).await?;
        let mut duration = narration + padding_secs;

        let command = match video {
            Some(clip) => {
                let clip_duration = self.probe.duration(clip).await?;
                duration = duration.max(clip_duration);
                self.command().arg("-i").path_arg(clip)
            }
            None => {
                let mut command = self
                    .command()
                    .args(["-f", "image2", "-pattern_type", "none"]);
                // Bare render artifacts carry no extension to infer the codec from
                if image.extension().is_none() {
                    command = command.args(["-c:v", "png"]);
                }
                command
                    .args(["-loop", "1", "-framerate"])
                    .arg(fps.to_string())
                    .arg("-i")
                    .path_arg(image)
            }
        };

        let filter = format!(
            "[0:v]{},tpad=stop_mode=clone:stop_duration={:.3}[v];[1:a]apad=whole_dur={:.3}[a]",
            self.video_filter(fps),
            duration,
            duration
        );

        command
            .arg("-i")
            .path_arg(audio)
            .args(["-filter_complex", &filter, "-map", "[v]", "-map", "[a]", "-t"])
            .arg(format!("{:.3}", duration))
            .args(self.encoder_args())
            .path_arg(segment)
            .run()
            .await?;
        Ok(())
    }
}

/// Line for the concat demuxer list, quoting single quotes
fn concat_entry(path: &Path) -> String {
    format!("file '{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

#[async_trait]
impl Assembler for FfmpegAssembler {
    async fn preflight(&self) -> Result<(), ToolError> {
        ToolCommand::new("ffmpeg", &self.program, 30)
            .arg("-version")
            .run()
            .await
            .map(|_| ())
            .map_err(|e| match e {
                ToolError::Spawn { tool, message } => ToolError::Spawn {
                    tool,
                    message: format!("{} (is ffmpeg installed and on PATH?)", message),
                },
                other => other,
            })
    }

    async fn assemble(&self, request: &AssemblyRequest) -> Result<(), ToolError> {
        let count = request.images.len();
        if request.audio.len() != count || request.videos.len() != count {
            return Err(ToolError::failed(
                "ffmpeg",
                format!(
                    "mismatched inputs: {} image(s), {} audio clip(s), {} video slot(s)",
                    count,
                    request.audio.len(),
                    request.videos.len()
                ),
            ));
        }

        info!("Assembling {} slide(s) at {} fps", count, request.fps);
        let padding_secs = f64::from(request.audio_padding_ms) / 1000.0;

        let mut segments: Vec<PathBuf> = Vec::with_capacity(count);
        for (i, ((image, audio), video)) in request
            .images
            .iter()
            .zip(&request.audio)
            .zip(&request.videos)
            .enumerate()
        {
            let segment = request.workspace.join(format!("segment_{:03}.mp4", i + 1));
            debug!("Rendering segment {} of {}", i + 1, count);
            self.render_segment(image, audio, video.as_deref(), request.fps, padding_secs, &segment)
                .await?;
            segments.push(segment);
        }

        let list_path = request.workspace.join("concat.txt");
        let list = segments
            .iter()
            .map(|s| concat_entry(s))
            .collect::<Vec<_>>()
            .join("\n");
        FileManager::write_to_file(&list_path, &list)
            .map_err(|e| ToolError::failed("ffmpeg", format!("{:#}", e)))?;

        if let Some(parent) = request.output.parent() {
            FileManager::ensure_dir(parent)
                .map_err(|e| ToolError::io(format!("creating {:?}", parent), e))?;
        }

        self.command()
            .args(["-f", "concat", "-safe", "0", "-i"])
            .path_arg(&list_path)
            .args(["-c", "copy", "-movflags", "+faststart"])
            .path_arg(&request.output)
            .run()
            .await?;

        info!("Wrote {:?}", request.output);
        Ok(())
    }
}
