//! Artifact discovery inside the model directory

use crate::config::{ArtifactNames, InferenceConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// What was found in the model directory
///
/// Finding nothing is a valid outcome; the service falls back in that case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub artifact: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
}

/// Looks for artifacts by a fixed priority list of file names
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    base_dir: PathBuf,
    names: ArtifactNames,
}

impl ArtifactLocator {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            names: ArtifactNames::default(),
        }
    }

    pub fn from_config(config: &InferenceConfig) -> Self {
        Self {
            base_dir: config.model_dir.clone(),
            names: config.artifacts.clone(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Artifact candidates, highest priority first
    pub fn candidates(&self) -> [PathBuf; 2] {
        [
            self.base_dir.join(&self.names.preferred),
            self.base_dir.join(&self.names.legacy),
        ]
    }

    /// Existence checks only; nothing is opened
    pub fn locate(&self) -> ArtifactLocation {
        let artifact = self.candidates().into_iter().find(|path| path.is_file());
        let manifest = Some(self.base_dir.join(&self.names.manifest)).filter(|path| path.is_file());

        debug!(
            dir = %self.base_dir.display(),
            artifact = ?artifact,
            manifest = ?manifest,
            "Located model files"
        );

        ArtifactLocation { artifact, manifest }
    }
}

/// Locate artifacts under `base_dir` with the default file names
pub fn locate(base_dir: impl Into<PathBuf>) -> ArtifactLocation {
    ArtifactLocator::new(base_dir).locate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(locate(dir.path()), ArtifactLocation::default());
    }

    #[test]
    fn test_missing_dir() {
        let location = locate("/nonexistent/reviewsense/model");
        assert!(location.artifact.is_none());
        assert!(location.manifest.is_none());
    }

    #[test]
    fn test_preferred_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ensemble.json"), "{}").unwrap();
        fs::write(dir.path().join("ensemble_soft.json"), "{}").unwrap();

        let location = locate(dir.path());
        assert_eq!(location.artifact, Some(dir.path().join("ensemble_soft.json")));
    }

    #[test]
    fn test_legacy_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ensemble.json"), "{}").unwrap();
        fs::write(dir.path().join("manifest.json"), "{}").unwrap();

        let location = locate(dir.path());
        assert_eq!(location.artifact, Some(dir.path().join("ensemble.json")));
        assert_eq!(location.manifest, Some(dir.path().join("manifest.json")));
    }

    #[test]
    fn test_directories_are_not_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("ensemble_soft.json")).unwrap();

        assert!(locate(dir.path()).artifact.is_none());
    }

    #[test]
    fn test_manifest_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("manifest.json"), "{}").unwrap();

        let location = locate(dir.path());
        assert!(location.artifact.is_none());
        assert!(location.manifest.is_some());
    }
}
