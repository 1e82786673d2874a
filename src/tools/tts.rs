/*!
 * Narration synthesis through an external TTS command.
 */

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::path::{Path, PathBuf};

use super::process::ToolCommand;
use super::{NarrationSynthesizer, VoiceSelection};
use crate::app_config::{Config, TtsConfig};
use crate::deck::Slide;
use crate::errors::ToolError;
use crate::pipeline::artifacts::audio_file_name;

/// Runs the configured TTS command once per narrated slide and writes
/// silence for slides without notes
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    tts: TtsConfig,
    ffmpeg: String,
    ffmpeg_timeout_secs: u64,
}

impl CommandSynthesizer {
    pub fn new(tts: TtsConfig, ffmpeg: impl Into<String>, ffmpeg_timeout_secs: u64) -> Self {
        Self {
            tts,
            ffmpeg: ffmpeg.into(),
            ffmpeg_timeout_secs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.tts.clone(),
            config.tools.ffmpeg.clone(),
            config.tools.ffmpeg_timeout_secs,
        )
    }

    async fn narrate(
        &self,
        slide: &Slide,
        text: &str,
        workspace: &Path,
        output: &Path,
        voice: Option<&Path>,
    ) -> Result<(), ToolError> {
        let text_file = workspace.join(format!("narration_{:03}.txt", slide.index));
        tokio::fs::write(&text_file, text)
            .await
            .map_err(|e| ToolError::io(format!("writing {:?}", text_file), e))?;

        let args = expand_args(&self.tts.args, text, &text_file, output, voice);
        ToolCommand::new("tts", &self.tts.command, self.tts.timeout_secs)
            .args(args)
            .run()
            .await?;
        Ok(())
    }

    async fn silence(&self, output: &Path) -> Result<(), ToolError> {
        ToolCommand::new("ffmpeg", &self.ffmpeg, self.ffmpeg_timeout_secs)
            .args(["-y", "-v", "error", "-f", "lavfi", "-i"])
            .arg(format!("anullsrc=r={}:cl=mono", self.tts.sample_rate))
            .arg("-t")
            .arg(format!("{:.3}", self.tts.silence_secs))
            .path_arg(output)
            .run()
            .await?;
        Ok(())
    }
}

/// Fill the argument template for one slide.
///
/// Without a voice, a `{voice}` argument and the flag before it are dropped.
pub fn expand_args(
    template: &[String],
    text: &str,
    text_file: &Path,
    output: &Path,
    voice: Option<&Path>,
) -> Vec<String> {
    let mut args: Vec<String> = Vec::with_capacity(template.len());
    for arg in template {
        if arg.contains("{voice}") && voice.is_none() {
            if args.last().is_some_and(|prev| prev.starts_with('-')) {
                args.pop();
            }
            continue;
        }
        let voice_str = voice.map(|v| v.to_string_lossy().to_string()).unwrap_or_default();
        args.push(
            arg.replace("{text_file}", &text_file.to_string_lossy())
                .replace("{output}", &output.to_string_lossy())
                .replace("{voice}", &voice_str)
                .replace("{text}", text),
        );
    }
    args
}

#[async_trait]
impl NarrationSynthesizer for CommandSynthesizer {
    async fn synthesize(
        &self,
        slides: &[Slide],
        workspace: &Path,
        voice: &VoiceSelection,
    ) -> Result<Vec<PathBuf>, ToolError> {
        info!("Synthesizing narration for {} slide(s)", slides.len());

        let progress_bar = ProgressBar::new(slides.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} slides {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));

        self.synthesize_reporting(slides, workspace, voice, &progress_bar)
            .await
    }
}

impl CommandSynthesizer {
    /// Run every slide, finishing `progress_bar` on success and abandoning it
    /// on the first failure
    async fn synthesize_reporting(
        &self,
        slides: &[Slide],
        workspace: &Path,
        voice: &VoiceSelection,
        progress_bar: &ProgressBar,
    ) -> Result<Vec<PathBuf>, ToolError> {
        let mut produced = Vec::with_capacity(slides.len());
        for slide in slides {
            progress_bar.set_message(format!("slide {}", slide.index));
            match self.synthesize_one(slide, workspace, voice).await {
                Ok(output) => produced.push(output),
                Err(e) => {
                    progress_bar.abandon_with_message(format!("failed at slide {}", slide.index));
                    return Err(e);
                }
            }
            progress_bar.inc(1);
        }

        progress_bar.finish_and_clear();
        Ok(produced)
    }

    async fn synthesize_one(
        &self,
        slide: &Slide,
        workspace: &Path,
        voice: &VoiceSelection,
    ) -> Result<PathBuf, ToolError> {
        let output = workspace.join(audio_file_name(slide.index));

        // A stale clip must not pass for fresh output
        if output.exists() {
            tokio::fs::remove_file(&output)
                .await
                .map_err(|e| ToolError::io(format!("removing {:?}", output), e))?;
        }

        match slide.notes.as_deref().filter(|_| slide.has_notes()) {
            Some(notes) => {
                let text = voice.pronunciations.apply(notes);
                self.narrate(slide, &text, workspace, &output, voice.reference.as_deref())
                    .await?;
            }
            None => {
                debug!("Slide {} has no notes, writing silence", slide.index);
                self.silence(&output).await?;
            }
        }

        if !output.is_file() {
            return Err(ToolError::failed(
                "tts",
                format!("no audio produced for slide {} at {:?}", slide.index, output),
            ));
        }
        Ok(output)
    }
}
