/*!
 * Resolution of per-slide embedded video references.
 *
 * A deck may point a slide at a video clip with a path relative to the
 * deck file. The reference is canonicalized the way the OS would open it
 * and trusted only when the result stays inside the deck's own directory.
 * References that do not exist are still checked lexically so traversal is
 * reported ahead of absence.
 */

use log::debug;
use std::path::{Component, Path, PathBuf};

use crate::deck::Slide;
use crate::errors::VideoRefError;

/// A validated video reference and the slide it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVideo {
    /// Slide carrying the reference
    pub slide_index: usize,
    /// Canonical absolute path of the clip
    pub path: PathBuf,
}

/// Directory that video references are resolved against
pub fn deck_directory(input: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Resolve every slide's video reference.
///
/// The result is parallel to `slides`: `None` where a slide has no video.
pub fn resolve_video_references(
    slides: &[Slide],
    input: &Path,
) -> Result<Vec<Option<ResolvedVideo>>, VideoRefError> {
    let dir = deck_directory(input);
    let base = dir
        .canonicalize()
        .map_err(|source| VideoRefError::DeckDirectory { dir: dir.clone(), source })?;

    slides
        .iter()
        .map(|slide| match slide.video.as_deref() {
            Some(reference) => resolve_one(&base, slide.index, reference).map(Some),
            None => Ok(None),
        })
        .collect()
}

/// Plain paths from resolved references, keeping positional alignment
pub fn video_paths(resolved: &[Option<ResolvedVideo>]) -> Vec<Option<PathBuf>> {
    resolved
        .iter()
        .map(|r| r.as_ref().map(|v| v.path.clone()))
        .collect()
}

fn resolve_one(base: &Path, index: usize, reference: &str) -> Result<ResolvedVideo, VideoRefError> {
    let outside = || VideoRefError::OutsideDeckDirectory {
        index,
        reference: reference.to_string(),
    };

    let joined = base.join(reference);
    let canonical = match joined.canonicalize() {
        Ok(canonical) => canonical,
        Err(_) => {
            // Nothing to resolve; still report traversal before absence
            let candidate = normalize_lexically(&joined);
            if !candidate.starts_with(base) {
                return Err(outside());
            }
            return Err(VideoRefError::NotFound {
                index,
                path: candidate,
            });
        }
    };

    // Symlinks are followed before `..` is applied, as the OS does
    if !canonical.starts_with(base) {
        return Err(outside());
    }
    if !canonical.is_file() {
        return Err(VideoRefError::NotFound {
            index,
            path: canonical,
        });
    }

    debug!("Slide {} video resolved to {:?}", index, canonical);
    Ok(ResolvedVideo {
        slide_index: index,
        path: canonical,
    })
}

/// Fold `.` and `..` components without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
