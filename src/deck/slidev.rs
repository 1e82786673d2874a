/*!
 * Slidev decks: parsing and rendering through `slidev export`.
 *
 * Slidev differs from Marp in two ways that matter here: a slide may open
 * with its own front matter block, which looks like an extra `---` chunk,
 * and the notes are the last comment of the slide.
 */

use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};

use super::markdown::{self, Comment};
use super::{collect_rendered, DeckBackend, DeckFormat, Slide};
use crate::app_config::ToolsConfig;
use crate::errors::ToolError;
use crate::file_utils::FileManager;
use crate::pipeline::artifacts::RenderDialect;
use crate::tools::process::ToolCommand;

/// Slidev deck backend
#[derive(Debug, Clone)]
pub struct SlidevBackend {
    program: String,
    timeout_secs: u64,
}

impl SlidevBackend {
    pub fn new(program: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            timeout_secs,
        }
    }

    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(tools.slidev.clone(), tools.render_timeout_secs)
    }
}

/// Group raw `---` chunks into slides, folding per-slide front matter into
/// the chunk that follows it
fn group_chunks(chunks: Vec<String>) -> Vec<String> {
    let mut grouped = Vec::new();
    let mut iter = chunks.into_iter().peekable();
    let mut first = true;

    while let Some(chunk) = iter.next() {
        // The first chunk follows the headmatter and is always content
        if !first && markdown::is_yaml_block(&chunk) && iter.peek().is_some() {
            if let Some(next) = iter.next() {
                grouped.push(next);
            }
        } else {
            grouped.push(chunk);
        }
        first = false;
    }
    grouped
}

/// Parse Slidev markdown into slides
pub fn parse_slidev(text: &str, path: &Path) -> Result<Vec<Slide>, ToolError> {
    let document = markdown::split_front_matter(text);
    let chunks = group_chunks(markdown::split_slides(&document.content));

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
            let notes = comments.iter().rev().find_map(|c| match c {
                Comment::Note(text) => Some(text.clone()),
                _ => None,
            });

            Slide {
                index: i + 1,
                body: markdown::strip_comments(chunk),
                notes,
                video: markdown::video_reference(&comments),
            }
        })
        .collect();

    Ok(slides)
}

/// Move `<export dir>/N.png` files to `slides.NNN.png` in the workspace
fn normalize_export(export_dir: &Path, workspace: &Path) -> Result<usize, ToolError> {
    let files = FileManager::list_files(export_dir)
        .map_err(|e| ToolError::io(format!("listing {:?}", export_dir), e))?;

    let mut moved = 0;
    for file in files {
        let index = file
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<usize>().ok());
        let is_png = file
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if let (Some(index), true) = (index, is_png) {
            let target = workspace.join(RenderDialect::Png.file_name(index));
            std::fs::rename(&file, &target)
                .map_err(|e| ToolError::io(format!("moving {:?}", file), e))?;
            moved += 1;
        }
    }

    std::fs::remove_dir_all(export_dir)
        .map_err(|e| ToolError::io(format!("removing {:?}", export_dir), e))?;
    debug!("Normalized {} exported slide image(s)", moved);
    Ok(moved)
}

#[async_trait]
impl DeckBackend for SlidevBackend {
    fn format(&self) -> DeckFormat {
        DeckFormat::Slidev
    }

    async fn parse(&self, document: &Path) -> Result<Vec<Slide>, ToolError> {
        let text = tokio::fs::read_to_string(document)
            .await
            .map_err(|e| ToolError::io(format!("reading {:?}", document), e))?;
        parse_slidev(&text, document)
    }

    async fn render(
        &self,
        document: &Path,
        slides: &[Slide],
        workspace: &Path,
    ) -> Result<Vec<PathBuf>, ToolError> {
        info!("Rendering {} slide(s) with Slidev", slides.len());

        let export_dir = workspace.join("slidev-export");
        ToolCommand::new("slidev", &self.program, self.timeout_secs)
            .arg("export")
            .path_arg(document)
            .args(["--format", "png", "--output"])
            .path_arg(&export_dir)
            .run()
            .await?;

        if FileManager::dir_exists(&export_dir) {
            normalize_export(&export_dir, workspace)?;
        }

        collect_rendered("slidev", workspace, slides.len())
    }
}
