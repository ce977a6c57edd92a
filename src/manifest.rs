//! Manifest model: the parsed, validated rebase plan.
//!
//! A manifest is a YAML document under a single `rebase-conf` key. It
//! declares the ordered topic list, the remotes they come from, the
//! recorded-resolution cache location and the base the new branch grows
//! from. The optional `resume` block is only ever written by rebranch
//! itself as part of a conflict checkpoint.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

/// Checkpoint schema version understood by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// Top-level manifest document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    #[serde(rename = "rebase-conf")]
    pub rebase_conf: Manifest,
}

/// The rebase plan. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Topics in application order.
    pub topics: Vec<Topic>,

    /// Remote name to spec. Topics refer to these by name.
    #[serde(default)]
    pub remotes: BTreeMap<String, RemoteSpec>,

    /// Recorded-resolution cache directory. Relative paths are resolved
    /// against the manifest's own location at load time.
    #[serde(rename = "rr-cache")]
    pub rr_cache: PathBuf,

    /// Where the rebuilt branch starts.
    pub base: Base,

    /// Resume state, present only in checkpoints written after a conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<ResumeState>,
}

/// A single remote declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSpec {
    pub url: String,
}

/// Base of the rebuilt branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Base {
    pub remote: String,
    #[serde(rename = "ref")]
    pub reference: String,
}

/// A unit of work in the plan.
///
/// The `action` field selects the variant; unknown actions are rejected
/// at deserialization time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Topic {
    /// Cherry-pick the commits in `base..tip` from `remote`.
    Pick {
        name: String,
        remote: String,
        base: String,
        tip: String,
    },
    /// Place a tag at the current position instead of picking commits.
    Tag {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suffix: Option<String>,
    },
}

impl Topic {
    /// The topic's name, independent of variant.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Topic::Pick { name, .. } | Topic::Tag { name, .. } => name,
        }
    }
}

/// Whether applied pick topics get a persistent tag, and with what suffix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagPolicy {
    /// Tags created for applied pick topics are pushed on success.
    #[serde(default)]
    pub persistent: bool,
    /// Appended to generated tag names as `-<suffix>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// Durable progress written once per conflict.
///
/// This is deliberately a separate struct from [`Manifest`]: the plan is
/// immutable, the progress is not, and serializing one into the other's
/// `resume` slot is the only place they meet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeState {
    /// Version of this schema, bumped on incompatible change.
    #[serde(rename = "schema-version", default = "default_schema_version")]
    pub schema_version: u32,

    /// Name of the topic whose cherry-pick stalled.
    #[serde(rename = "conflict-topic")]
    pub conflict_topic: String,

    /// Refs that must be published on eventual success. Grows
    /// monotonically; never loses a member across resumes.
    #[serde(rename = "persistent-refs", default)]
    pub persistent_refs: Vec<String>,

    /// Tag policy the run was started with.
    #[serde(default)]
    pub tags: TagPolicy,

    /// Absolute path of the source repository.
    pub repo: PathBuf,

    /// Name of the branch being rebuilt.
    pub branch: String,

    /// Absolute path of the canonical recorded-resolution cache.
    #[serde(rename = "rr-cache")]
    pub rr_cache: PathBuf,

    /// When the checkpoint was written.
    #[serde(rename = "created-at", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Manifest {
    /// Load and validate a manifest from a YAML file.
    ///
    /// Relative `rr-cache` paths are resolved against the manifest's
    /// parent directory.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ManifestError::FileReadError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let file: ManifestFile =
            serde_yaml::from_str(&contents).map_err(|e| ManifestError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut manifest = file.rebase_conf;

        if manifest.rr_cache.is_relative() {
            let parent = path.parent().unwrap_or_else(|| Path::new("."));
            manifest.rr_cache = parent.join(&manifest.rr_cache);
        }

        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate referential integrity of the plan.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.topics.is_empty() {
            return Err(ManifestError::InvalidValue {
                field: "topics".to_string(),
                message: "at least one topic is required".to_string(),
            });
        }

        if self.remotes.contains_key(crate::core::workspace::LOCAL_REMOTE) {
            return Err(ManifestError::InvalidValue {
                field: "remotes".to_string(),
                message: format!(
                    "'{}' is reserved for the implicit source-repository remote",
                    crate::core::workspace::LOCAL_REMOTE
                ),
            });
        }

        for topic in &self.topics {
            if let Topic::Pick { name, remote, .. } = topic {
                if remote != crate::core::workspace::LOCAL_REMOTE
                    && !self.remotes.contains_key(remote)
                {
                    return Err(ManifestError::UnknownRemote {
                        topic: name.clone(),
                        remote: remote.clone(),
                    });
                }
            }
        }

        if self.base.remote != crate::core::workspace::LOCAL_REMOTE
            && !self.remotes.contains_key(&self.base.remote)
        {
            return Err(ManifestError::UnknownRemote {
                topic: "base".to_string(),
                remote: self.base.remote.clone(),
            });
        }

        Ok(())
    }
}

impl ResumeState {
    /// Validate a resume state read back from a checkpoint.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ManifestError::SchemaVersionMismatch {
                found: self.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        if self.conflict_topic.is_empty() {
            return Err(ManifestError::InvalidValue {
                field: "resume.conflict-topic".to_string(),
                message: "must name the conflicted topic".to_string(),
            });
        }
        if self.branch.is_empty() {
            return Err(ManifestError::InvalidValue {
                field: "resume.branch".to_string(),
                message: "must name the branch being rebuilt".to_string(),
            });
        }
        if !self.repo.is_absolute() {
            return Err(ManifestError::InvalidValue {
                field: "resume.repo".to_string(),
                message: format!("must be an absolute path, got {}", self.repo.display()),
            });
        }
        Ok(())
    }
}
