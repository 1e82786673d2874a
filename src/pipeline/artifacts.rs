/*!
 * Artifact naming convention and workspace discovery.
 *
 * Every stage hands its output to the next through files named by slide
 * index. Render artifacts come in competing dialects depending on which
 * renderer produced them; discovery walks `RenderDialect::RANKED` and the
 * first dialect with any files is authoritative.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::errors::DiscoveryError;
use crate::file_utils::FileManager;

static PNG_RENDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^slides\.(\d+)\.png$").expect("valid regex"));

static BARE_RENDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^slides\.(\d+)$").expect("valid regex"));

static AUDIO_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^audio_(\d+)\.wav$").expect("valid regex"));

/// Naming dialect of a render artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderDialect {
    /// `slides.NNN.png`
    Png,
    /// `slides.NNN`
    Bare,
}

impl RenderDialect {
    /// Dialects in order of preference
    pub const RANKED: [RenderDialect; 2] = [RenderDialect::Png, RenderDialect::Bare];

    /// Expected file name for a slide in this dialect
    pub fn file_name(self, index: usize) -> String {
        match self {
            Self::Png => format!("slides.{:03}.png", index),
            Self::Bare => format!("slides.{:03}", index),
        }
    }

    /// Slide index embedded in a file name, if it belongs to this dialect
    pub fn index_of(self, file_name: &str) -> Option<usize> {
        let regex = match self {
            Self::Png => &PNG_RENDER_REGEX,
            Self::Bare => &BARE_RENDER_REGEX,
        };
        capture_index(regex, file_name)
    }

    /// Short label used in logs
    pub fn label(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Bare => "bare",
        }
    }
}

/// Expected file name of the narration clip for a slide
pub fn audio_file_name(index: usize) -> String {
    format!("audio_{:03}.wav", index)
}

/// Slide index embedded in an audio artifact name
pub fn audio_index_of(file_name: &str) -> Option<usize> {
    capture_index(&AUDIO_REGEX, file_name)
}

fn capture_index(regex: &Regex, file_name: &str) -> Option<usize> {
    regex
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Image and audio sequences recovered from a workspace, aligned by position
#[derive(Debug, Clone)]
pub struct DiscoveredArtifacts {
    /// Dialect the render set was taken from
    pub dialect: RenderDialect,
    /// Render artifacts sorted by slide index
    pub images: Vec<PathBuf>,
    /// Audio artifacts sorted by slide index
    pub audio: Vec<PathBuf>,
}

impl DiscoveredArtifacts {
    /// Number of slides covered
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Never true for a successful discovery
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Files in `dir` accepted by `matcher`, sorted by the index it extracts
pub fn scan<F>(dir: &Path, matcher: F) -> Result<Vec<PathBuf>, DiscoveryError>
where
    F: Fn(&str) -> Option<usize>,
{
    let files = FileManager::list_files(dir).map_err(|source| DiscoveryError::Io {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut indexed: Vec<(usize, PathBuf)> = files
        .into_iter()
        .filter_map(|path| {
            let index = path.file_name().and_then(|n| n.to_str()).and_then(&matcher)?;
            Some((index, path))
        })
        .collect();

    indexed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    Ok(indexed.into_iter().map(|(_, path)| path).collect())
}

/// First non-empty render set among `ranked` dialects
pub fn scan_render_set(
    dir: &Path,
    ranked: &[RenderDialect],
) -> Result<Option<(RenderDialect, Vec<PathBuf>)>, DiscoveryError> {
    for &dialect in ranked {
        let found = scan(dir, |name| dialect.index_of(name))?;
        if !found.is_empty() {
            return Ok(Some((dialect, found)));
        }
        debug!("No {} render artifacts in {:?}", dialect.label(), dir);
    }
    Ok(None)
}

/// Discover render and audio artifacts using the default dialect ranking
pub fn discover(dir: &Path) -> Result<DiscoveredArtifacts, DiscoveryError> {
    discover_with(dir, &RenderDialect::RANKED)
}

/// Discover render and audio artifacts with an explicit dialect ranking.
///
/// Fails if no dialect yields images, if there is no audio, or if the two
/// counts differ. No attempt is made to pair up partial sets.
pub fn discover_with(
    dir: &Path,
    ranked: &[RenderDialect],
) -> Result<DiscoveredArtifacts, DiscoveryError> {
    let (dialect, images) =
        scan_render_set(dir, ranked)?.ok_or_else(|| DiscoveryError::NoImages(dir.to_path_buf()))?;

    let audio = scan(dir, audio_index_of)?;
    if audio.is_empty() {
        return Err(DiscoveryError::NoAudio(dir.to_path_buf()));
    }

    if images.len() != audio.len() {
        return Err(DiscoveryError::CountMismatch {
            dir: dir.to_path_buf(),
            images: images.len(),
            audio: audio.len(),
        });
    }

    debug!(
        "Discovered {} slide(s) in {:?} ({} dialect)",
        images.len(),
        dir,
        dialect.label()
    );

    Ok(DiscoveredArtifacts {
        dialect,
        images,
        audio,
    })
}
