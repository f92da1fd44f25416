//! Scene export collaborator.
//!
//! The dispatcher never talks to a scene graph directly. Something upstream writes the
//! scene description file before dispatch begins, and a failed export means no renderer
//! process is started.

use crate::error::{DispatchError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Produces a scene description file on disk.
#[async_trait]
pub trait SceneExporter: Send + Sync {
    /// Write the scene called `scene_name` to `destination`.
    ///
    /// Must complete (the file fully written) before returning `Ok`.
    async fn export(&self, scene_name: &str, destination: &Path) -> Result<()>;
}

/// Exporter for scenes that already exist as project files.
///
/// Places the source project file at the export destination, copying it unless it is
/// already there.
#[derive(Debug, Clone)]
pub struct ProjectFileExporter {
    source: PathBuf,
}

impl ProjectFileExporter {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

#[async_trait]
impl SceneExporter for ProjectFileExporter {
    async fn export(&self, scene_name: &str, destination: &Path) -> Result<()> {
        let metadata = tokio::fs::metadata(&self.source).await.map_err(|e| {
            DispatchError::export(
                scene_name,
                format!("cannot read {}: {e}", self.source.display()),
            )
        })?;
        if !metadata.is_file() || metadata.len() == 0 {
            return Err(DispatchError::export(
                scene_name,
                format!("{} is not a non-empty file", self.source.display()),
            ));
        }

        if same_file(&self.source, destination).await {
            log::debug!("Scene {scene_name} already at {}", destination.display());
            return Ok(());
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| DispatchError::OutputDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::copy(&self.source, destination)
            .await
            .map_err(|e| {
                DispatchError::export(
                    scene_name,
                    format!("cannot write {}: {e}", destination.display()),
                )
            })?;
        log::info!("Exported scene {scene_name} to {}", destination.display());
        Ok(())
    }
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (
        tokio::fs::canonicalize(a).await,
        tokio::fs::canonicalize(b).await,
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn copies_project_file_into_place() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.appleseed");
        std::fs::write(&source, "<project/>").unwrap();
        let destination = temp.path().join("work").join("shot.appleseed");

        ProjectFileExporter::new(&source)
            .export("shot", &destination)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "<project/>");
    }

    #[tokio::test]
    async fn exporting_onto_itself_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("shot.appleseed");
        std::fs::write(&source, "<project/>").unwrap();

        ProjectFileExporter::new(&source)
            .export("shot", &source)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&source).unwrap(), "<project/>");
    }

    #[tokio::test]
    async fn missing_or_empty_source_fails() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("shot.appleseed");

        let err = ProjectFileExporter::new(temp.path().join("absent.appleseed"))
            .export("shot", &destination)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::ExportFailed { .. }));

        let empty = temp.path().join("empty.appleseed");
        std::fs::write(&empty, "").unwrap();
        let err = ProjectFileExporter::new(&empty)
            .export("shot", &destination)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::ExportFailed { ref scene, .. } if scene == "shot"));
        assert!(!destination.exists());
    }
}
