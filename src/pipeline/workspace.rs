/*!
 * Workspace lifecycle: creation or reuse of the artifact directory and the
 * retain/discard decision at the end of a run.
 */

use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use super::artifacts::{audio_index_of, RenderDialect};
use crate::errors::PipelineError;
use crate::file_utils::FileManager;

/// How the workspace came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceOrigin {
    /// Created under the system temp dir for this run
    Generated,
    /// Path given by the caller
    Supplied,
}

/// What happened to the workspace when the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Directory was removed
    Discarded,
    /// Directory was left in place
    Kept,
}

/// Directory holding every artifact of a run
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    origin: WorkspaceOrigin,
}

impl Workspace {
    /// Reuse `requested` (creating it if needed) or generate a fresh directory
    pub fn create_or_reuse(requested: Option<&Path>) -> Result<Self, PipelineError> {
        match requested {
            Some(path) => {
                FileManager::ensure_dir(path).map_err(|source| PipelineError::Workspace {
                    path: path.to_path_buf(),
                    source,
                })?;
                debug!("Using workspace {:?}", path);
                Ok(Self {
                    path: path.to_path_buf(),
                    origin: WorkspaceOrigin::Supplied,
                })
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("deck2video_")
                    .tempdir()
                    .map_err(|source| PipelineError::Workspace {
                        path: std::env::temp_dir(),
                        source,
                    })?;
                #[allow(deprecated)]
                let path = dir.into_path();
                debug!("Created workspace {:?}", path);
                Ok(Self {
                    path,
                    origin: WorkspaceOrigin::Generated,
                })
            }
        }
    }

    /// Workspace directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the directory was supplied by the caller
    pub fn origin(&self) -> WorkspaceOrigin {
        self.origin
    }

    /// Remove render and audio artifacts left by earlier runs.
    ///
    /// Returns the number of files removed. Other files are left alone.
    pub fn clear_artifacts(&self) -> Result<usize, PipelineError> {
        let files = FileManager::list_files(&self.path).map_err(|source| self.error(source))?;
        let mut removed = 0;
        for file in files {
            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let is_artifact = RenderDialect::RANKED
                .iter()
                .any(|d| d.index_of(name).is_some())
                || audio_index_of(name).is_some();
            if is_artifact {
                fs::remove_file(&file).map_err(|source| self.error(source))?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("Removed {} stale artifact(s) from {:?}", removed, self.path);
        }
        Ok(removed)
    }

    /// Apply the retention policy after a successful run.
    ///
    /// Supplied workspaces are always kept since a later resume run needs
    /// them. Generated ones are removed unless `keep` is set. The output is
    /// already written at this point, so a failed removal only keeps the
    /// directory.
    pub fn finish_success(self, keep: bool) -> Retention {
        if keep || self.origin == WorkspaceOrigin::Supplied {
            println!("Temp files kept at: {}", self.path.display());
            return Retention::Kept;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => {
                debug!("Removed workspace {:?}", self.path);
                Retention::Discarded
            }
            Err(e) => {
                warn!("Could not remove workspace {:?}: {}", self.path, e);
                println!("Temp files kept at: {}", self.path.display());
                Retention::Kept
            }
        }
    }

    /// Keep the workspace after a failure so the run can be resumed
    pub fn preserve_after_failure(self) -> Retention {
        warn!("Run failed; workspace preserved for --reassemble or --redo-slides");
        println!("Temp files kept at: {}", self.path.display());
        Retention::Kept
    }

    fn error(&self, source: std::io::Error) -> PipelineError {
        PipelineError::Workspace {
            path: self.path.clone(),
            source,
        }
    }
}
