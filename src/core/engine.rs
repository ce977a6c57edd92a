//! The cherry-pick orchestration state machine.
//!
//! The engine walks the topic list in manifest order. Pick topics fetch
//! their range and replay it onto the working branch; tag topics drop a
//! marker at the current position. A stall goes to the rerere resolver;
//! a conflict the cache cannot cover ends the invocation with a
//! checkpoint. Exhausting the list adds the branch itself to the
//! publishable refs and reports completion.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::{
    error::RebranchError,
    git::{self, CherryPickResult},
    manifest::{Manifest, ResumeState, TagPolicy, Topic, SCHEMA_VERSION},
};

use super::{
    checkpoint::CheckpointStore,
    rerere::{RepoBackend, RerereResolver, Resolution},
};

/// Terminal result of one engine invocation.
#[derive(Debug)]
pub enum EngineOutcome {
    /// Every topic applied; `refs` is the final publishable set.
    Completed { refs: Vec<String> },
    /// A topic stalled on a novel conflict; a checkpoint was written.
    Conflict {
        topic: String,
        checkpoint: PathBuf,
        files: Vec<String>,
    },
}

/// Tag name for an applied pick topic: `topic-<name>[-<suffix>]`.
#[must_use]
pub fn pick_tag_name(topic: &str, policy: &TagPolicy) -> String {
    match &policy.suffix {
        Some(suffix) => format!("topic-{topic}-{suffix}"),
        None => format!("topic-{topic}"),
    }
}

/// Tag name for an explicit tag topic: `<name>[-<suffix>]`, no prefix.
#[must_use]
pub fn marker_tag_name(name: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{name}-{suffix}"),
        None => name.to_string(),
    }
}

/// Orchestrates topic application inside one workspace.
pub struct CherryPickEngine<'a> {
    workspace: &'a Path,
    manifest: &'a Manifest,
    source_repo: PathBuf,
    branch: String,
    tags: TagPolicy,
    resolver: RerereResolver,
}

impl<'a> CherryPickEngine<'a> {
    pub fn new(
        workspace: &'a Path,
        manifest: &'a Manifest,
        source_repo: &Path,
        branch: String,
        tags: TagPolicy,
    ) -> Self {
        CherryPickEngine {
            workspace,
            manifest,
            source_repo: source_repo.to_path_buf(),
            branch,
            tags,
            resolver: RerereResolver::new(),
        }
    }

    /// Run all topics from the start of the plan.
    #[instrument(skip(self), fields(branch = %self.branch))]
    pub fn run(&self) -> Result<EngineOutcome, RebranchError> {
        self.apply_topics(&self.manifest.topics, Vec::new())
    }

    /// Resume after a conflict.
    ///
    /// Finishes the interrupted cherry-pick (the operator has committed
    /// the resolution), tags the now complete topic, then applies the
    /// topics after the conflicted one. The conflicted topic is never
    /// retried from scratch.
    #[instrument(skip(self, resume), fields(topic = %resume.conflict_topic))]
    pub fn resume(&self, resume: &ResumeState) -> Result<EngineOutcome, RebranchError> {
        let changes = git::worktree_changes(self.workspace)?;
        if !changes.is_empty() {
            return Err(RebranchError::DirtyWorkspace {
                count: changes.len(),
                files: changes,
            });
        }

        let position = self
            .manifest
            .topics
            .iter()
            .position(|t| t.name() == resume.conflict_topic)
            .ok_or_else(|| crate::error::ManifestError::InvalidValue {
                field: "resume.conflict-topic".to_string(),
                message: format!(
                    "topic '{}' is not in the manifest",
                    resume.conflict_topic
                ),
            })?;

        let backend = RepoBackend::new(self.workspace);
        match self.resolver.finish(&backend)? {
            Resolution::Unresolvable { files } => {
                // A later commit of the same topic is also novel: stop
                // again on the same topic with the same pending refs.
                let checkpoint = self.write_checkpoint(
                    &resume.conflict_topic,
                    resume.persistent_refs.clone(),
                )?;
                Ok(EngineOutcome::Conflict {
                    topic: resume.conflict_topic.clone(),
                    checkpoint,
                    files,
                })
            }
            Resolution::Resolved => {
                let mut refs = resume.persistent_refs.clone();
                info!(topic = %resume.conflict_topic, "interrupted topic finished");

                // The conflicted topic is a pick by construction; tag it
                // the same way a clean application would have.
                if matches!(self.manifest.topics[position], Topic::Pick { .. }) {
                    let tag = pick_tag_name(&resume.conflict_topic, &self.tags);
                    git::tag(self.workspace, &tag)?;
                    if self.tags.persistent {
                        refs.push(tag);
                    }
                }

                self.apply_topics(&self.manifest.topics[position + 1..], refs)
            }
        }
    }

    /// Apply `topics` in order, extending `refs` as tags accumulate.
    fn apply_topics(
        &self,
        topics: &[Topic],
        mut refs: Vec<String>,
    ) -> Result<EngineOutcome, RebranchError> {
        for topic in topics {
            match topic {
                Topic::Tag { name, suffix } => {
                    let tag = marker_tag_name(name, suffix.as_deref());
                    info!(tag = %tag, "placing marker tag");
                    git::tag(self.workspace, &tag)?;
                    // Explicit markers are always published
                    refs.push(tag);
                }
                Topic::Pick {
                    name,
                    remote,
                    base,
                    tip,
                } => {
                    if let Some(outcome) = self.apply_pick(name, remote, base, tip, &mut refs)? {
                        return Ok(outcome);
                    }
                }
            }
        }

        refs.push(self.branch.clone());
        info!(refs = refs.len(), "all topics applied");
        Ok(EngineOutcome::Completed { refs })
    }

    /// Apply one pick topic. Returns `Some(Conflict)` when it checkpoints.
    fn apply_pick(
        &self,
        name: &str,
        remote: &str,
        base: &str,
        tip: &str,
        refs: &mut Vec<String>,
    ) -> Result<Option<EngineOutcome>, RebranchError> {
        info!(topic = name, remote, base, tip, "applying pick topic");
        git::fetch(self.workspace, remote, &[base, tip])?;

        let range = format!("{remote}/{base}..{remote}/{tip}");
        let applied = match git::cherry_pick_range(self.workspace, &range)? {
            CherryPickResult::Applied => true,
            CherryPickResult::Stalled => {
                let backend = RepoBackend::new(self.workspace);
                match self.resolver.resolve(&backend)? {
                    Resolution::Resolved => true,
                    Resolution::Unresolvable { files } => {
                        warn!(topic = name, files = files.len(), "unresolvable conflict");
                        // Snapshot the refs as of just before this topic
                        let checkpoint = self.write_checkpoint(name, refs.clone())?;
                        return Ok(Some(EngineOutcome::Conflict {
                            topic: name.to_string(),
                            checkpoint,
                            files,
                        }));
                    }
                }
            }
        };

        if applied {
            let tag = pick_tag_name(name, &self.tags);
            git::tag(self.workspace, &tag)?;
            info!(topic = name, tag = %tag, "pick topic applied");
            if self.tags.persistent {
                refs.push(tag);
            }
        }

        Ok(None)
    }

    fn write_checkpoint(
        &self,
        conflict_topic: &str,
        persistent_refs: Vec<String>,
    ) -> Result<PathBuf, RebranchError> {
        let resume = ResumeState {
            schema_version: SCHEMA_VERSION,
            conflict_topic: conflict_topic.to_string(),
            persistent_refs,
            tags: self.tags.clone(),
            repo: self.source_repo.clone(),
            branch: self.branch.clone(),
            rr_cache: self.manifest.rr_cache.clone(),
            created_at: None,
        };
        CheckpointStore::write(self.workspace, self.manifest, resume)
    }
}
