/*!
 * Marp decks: parsing and rendering through `marp-cli`.
 */

use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};

use super::markdown::{self, Comment};
use super::{collect_rendered, DeckBackend, DeckFormat, Slide};
use crate::app_config::ToolsConfig;
use crate::errors::ToolError;
use crate::tools::process::ToolCommand;

/// Marp deck backend
#[derive(Debug, Clone)]
pub struct MarpBackend {
    program: String,
    timeout_secs: u64,
}

impl MarpBackend {
    pub fn new(program: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            timeout_secs,
        }
    }

    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(tools.marp.clone(), tools.render_timeout_secs)
    }
}

/// Parse Marp markdown into slides.
///
/// Every `---` chunk after the front matter is a slide. Non-directive
/// comments are notes, joined with blank lines.
pub fn parse_marp(text: &str, path: &Path) -> Result<Vec<Slide>, ToolError> {
    let document = markdown::split_front_matter(text);
    let chunks = markdown::split_slides(&document.content);

    if chunks.iter().all(|c| c.trim().is_empty()) {
        return Err(ToolError::Format {
            path: path.to_path_buf(),
            message: "deck contains no slides".to_string(),
        });
    }

    let slides = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let comments = markdown::comments(chunk);
            let notes: Vec<&str> = comments
                .iter()
                .filter_map(|c| match c {
                    Comment::Note(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect();

            Slide {
                index: i + 1,
                body: markdown::strip_comments(chunk),
                notes: (!notes.is_empty()).then(|| notes.join("\n\n")),
                video: markdown::video_reference(&comments),
            }
        })
        .collect();

    Ok(slides)
}

#[async_trait]
impl DeckBackend for MarpBackend {
    fn format(&self) -> DeckFormat {
        DeckFormat::Marp
    }

    async fn parse(&self, document: &Path) -> Result<Vec<Slide>, ToolError> {
        let text = tokio::fs::read_to_string(document)
            .await
            .map_err(|e| ToolError::io(format!("reading {:?}", document), e))?;
        parse_marp(&text, document)
    }

    async fn render(
        &self,
        document: &Path,
        slides: &[Slide],
        workspace: &Path,
    ) -> Result<Vec<PathBuf>, ToolError> {
        info!("Rendering {} slide(s) with Marp", slides.len());

        // marp appends .NNN to the output stem
        ToolCommand::new("marp", &self.program, self.timeout_secs)
            .path_arg(document)
            .args(["--images", "png", "--allow-local-files", "--output"])
            .path_arg(&workspace.join("slides"))
            .run()
            .await?;

        collect_rendered("marp", workspace, slides.len())
    }
}
