//! Checkpoint persistence for conflict recovery.
//!
//! The checkpoint is the manifest re-serialized with its `resume` block
//! populated, written to a fixed filename inside the workspace. It is
//! the only durable state bridging two invocations: a resume reads it
//! back, validates it, and picks up where the conflicted run stopped.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::{
    error::{ManifestError, RebranchError},
    manifest::{Manifest, ManifestFile, ResumeState},
};

/// Fixed checkpoint filename inside the workspace.
pub const CHECKPOINT_FILE: &str = "rebranch-resume.yaml";

/// Reads and writes conflict checkpoints for a workspace.
pub struct CheckpointStore;

impl CheckpointStore {
    /// Path of the checkpoint file for a workspace.
    #[must_use]
    pub fn path_for(workspace: &Path) -> PathBuf {
        workspace.join(CHECKPOINT_FILE)
    }

    /// Write a checkpoint: the plan plus the given resume state.
    ///
    /// The write is atomic (temp file then rename) so a crash mid-write
    /// can never leave a truncated checkpoint behind.
    pub fn write(
        workspace: &Path,
        manifest: &Manifest,
        mut resume: ResumeState,
    ) -> Result<PathBuf, RebranchError> {
        resume.created_at = Some(Utc::now());

        let mut plan = manifest.clone();
        plan.resume = Some(resume);
        let file = ManifestFile { rebase_conf: plan };

        let contents = serde_yaml::to_string(&file).map_err(|e| ManifestError::InvalidValue {
            field: "resume".to_string(),
            message: format!("failed to serialize checkpoint: {e}"),
        })?;

        let path = Self::path_for(workspace);
        let temp_path = path.with_extension("yaml.tmp");

        std::fs::write(&temp_path, &contents)?;
        std::fs::rename(&temp_path, &path)?;

        info!(checkpoint = %path.display(), "conflict checkpoint written");
        Ok(path)
    }

    /// Load and validate the checkpoint from a workspace.
    ///
    /// Returns the plan and the resume state separately; the loaded
    /// manifest's own `resume` slot is cleared so plan and progress
    /// never alias.
    pub fn load(workspace: &Path) -> Result<(Manifest, ResumeState), RebranchError> {
        let path = Self::path_for(workspace);
        if !path.exists() {
            return Err(ManifestError::CheckpointMissing { path }.into());
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|e| ManifestError::FileReadError {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let file: ManifestFile =
            serde_yaml::from_str(&contents).map_err(|e| ManifestError::ParseError {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let mut manifest = file.rebase_conf;
        let resume = manifest
            .resume
            .take()
            .ok_or(ManifestError::InvalidValue {
                field: "resume".to_string(),
                message: "checkpoint has no resume state".to_string(),
            })?;

        resume.validate()?;
        manifest.validate()?;

        Ok((manifest, resume))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    use crate::manifest::{Base, RemoteSpec, TagPolicy, Topic, SCHEMA_VERSION};

    fn sample_manifest() -> Manifest {
        let mut remotes = BTreeMap::new();
        remotes.insert(
            "upstream".to_string(),
            RemoteSpec {
                url: "ssh://git@example.com/repo.git".to_string(),
            },
        );
        Manifest {
            topics: vec![
                Topic::Pick {
                    name: "auth-fix".to_string(),
                    remote: "upstream".to_string(),
                    base: "v1.0".to_string(),
                    tip: "auth-fix-tip".to_string(),
                },
                Topic::Tag {
                    name: "milestone-1".to_string(),
                    suffix: None,
                },
            ],
            remotes,
            rr_cache: PathBuf::from("/abs/rr-cache"),
            base: Base {
                remote: "upstream".to_string(),
                reference: "main".to_string(),
            },
            resume: None,
        }
    }

    fn sample_resume() -> ResumeState {
        ResumeState {
            schema_version: SCHEMA_VERSION,
            conflict_topic: "auth-fix".to_string(),
            persistent_refs: vec!["mytag".to_string()],
            tags: TagPolicy {
                persistent: true,
                suffix: Some("20240101".to_string()),
            },
            repo: PathBuf::from("/abs/src/repo"),
            branch: "next".to_string(),
            rr_cache: PathBuf::from("/abs/rr-cache"),
            created_at: None,
        }
    }

    /// # Test: Checkpoint Round Trip
    ///
    /// Verifies that a written checkpoint loads back with the same plan
    /// and progress.
    ///
    /// ## Test Scenario
    /// - Write a checkpoint for a two-topic manifest
    /// - Load it from the same workspace
    ///
    /// ## Expected Outcome
    /// - The loaded manifest matches and its resume slot is cleared
    /// - The resume state carries the conflict topic and refs
    /// - A created-at timestamp was stamped on write
    #[test]
    fn test_checkpoint_round_trip() {
        let workspace = TempDir::new().unwrap();

        let path =
            CheckpointStore::write(workspace.path(), &sample_manifest(), sample_resume()).unwrap();
        assert_eq!(path.file_name().unwrap(), CHECKPOINT_FILE);

        let (manifest, resume) = CheckpointStore::load(workspace.path()).unwrap();
        assert_eq!(manifest.topics.len(), 2);
        assert!(manifest.resume.is_none());
        assert_eq!(resume.conflict_topic, "auth-fix");
        assert_eq!(resume.persistent_refs, vec!["mytag".to_string()]);
        assert!(resume.tags.persistent);
        assert!(resume.created_at.is_some());
    }

    /// # Test: Missing Checkpoint
    ///
    /// Verifies the error when no checkpoint exists in a workspace.
    ///
    /// ## Test Scenario
    /// - Load from an empty directory
    ///
    /// ## Expected Outcome
    /// - CheckpointMissing naming the expected path
    #[test]
    fn test_checkpoint_missing() {
        let workspace = TempDir::new().unwrap();
        let err = CheckpointStore::load(workspace.path()).unwrap_err();
        assert!(err.to_string().contains(CHECKPOINT_FILE));
    }

    /// # Test: Checkpoint Without Resume State
    ///
    /// Verifies that a plain manifest dropped at the checkpoint path is
    /// rejected.
    ///
    /// ## Test Scenario
    /// - Serialize a manifest without resume to the checkpoint filename
    /// - Load it
    ///
    /// ## Expected Outcome
    /// - The load fails naming the missing resume state
    #[test]
    fn test_checkpoint_without_resume() {
        let workspace = TempDir::new().unwrap();
        let file = ManifestFile {
            rebase_conf: sample_manifest(),
        };
        std::fs::write(
            CheckpointStore::path_for(workspace.path()),
            serde_yaml::to_string(&file).unwrap(),
        )
        .unwrap();

        let err = CheckpointStore::load(workspace.path()).unwrap_err();
        assert!(err.to_string().contains("no resume state"));
    }

    /// # Test: Incompatible Schema Version Rejected
    ///
    /// Verifies that a checkpoint from a newer build fails validation.
    ///
    /// ## Test Scenario
    /// - Write a checkpoint whose resume carries a future schema version
    /// - Load it
    ///
    /// ## Expected Outcome
    /// - The load fails with a schema version mismatch
    #[test]
    fn test_checkpoint_schema_mismatch() {
        let workspace = TempDir::new().unwrap();
        let mut resume = sample_resume();
        resume.schema_version = SCHEMA_VERSION + 5;

        CheckpointStore::write(workspace.path(), &sample_manifest(), resume).unwrap();

        let err = CheckpointStore::load(workspace.path()).unwrap_err();
        assert!(err.to_string().contains("schema version"));
    }

    /// # Test: No Temp File Left Behind
    ///
    /// Verifies that the atomic write leaves only the final file.
    ///
    /// ## Test Scenario
    /// - Write a checkpoint and list the workspace directory
    ///
    /// ## Expected Outcome
    /// - Only the checkpoint file exists, no .tmp remnant
    #[test]
    fn test_no_temp_file_left() {
        let workspace = TempDir::new().unwrap();
        CheckpointStore::write(workspace.path(), &sample_manifest(), sample_resume()).unwrap();

        let entries: Vec<String> = std::fs::read_dir(workspace.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec![CHECKPOINT_FILE.to_string()]);
    }
}
