//! Read-only per-tag commit statistics.
//!
//! Walks `base..tip`, finds the tagged boundary commits, and reports how
//! many commits each segment between adjacent tagged boundaries holds.
//! Shares no state with the engine; on a branch the engine built, the
//! boundaries are exactly the topic tags.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{error::RebranchError, git};

/// One stretch of history ending at a tagged boundary.
#[derive(Debug, PartialEq, Eq)]
pub struct Segment {
    /// Tags at the boundary commit (comma-joined when several).
    pub label: String,
    /// Commits in this segment.
    pub commits: usize,
}

/// The full report over `base..tip`.
#[derive(Debug)]
pub struct StatReport {
    pub segments: Vec<Segment>,
    /// Total commits in `base..tip`.
    pub total: usize,
}

impl StatReport {
    /// A segment's share of the total, in percent.
    #[must_use]
    pub fn percentage(&self, segment: &Segment) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            segment.commits as f64 * 100.0 / self.total as f64
        }
    }
}

/// Builds per-tag segment reports over a repository.
pub struct StatReporter {
    repo: PathBuf,
}

impl StatReporter {
    #[must_use]
    pub fn new(repo: &Path) -> Self {
        StatReporter {
            repo: repo.to_path_buf(),
        }
    }

    /// Count commits per tagged segment between `base` and `tip`.
    ///
    /// Segments telescope: the counts sum to the total for the linear
    /// histories the engine produces.
    pub fn report(&self, base: &str, tip: &str) -> Result<StatReport, RebranchError> {
        let range = format!("{base}..{tip}");
        let total = git::rev_list_count(&self.repo, &range)?;
        let boundaries = git::decorated_commits(&self.repo, &range)?;
        debug!(range = %range, total, boundaries = boundaries.len(), "building stat report");

        let tip_commit = git::rev_parse(&self.repo, tip)?;
        let mut segments = Vec::new();
        let mut cursor = base.to_string();

        for commit in boundaries {
            let tags = git::tags_at(&self.repo, &commit)?;
            if tags.is_empty() {
                // Branch decorations without tags are not report boundaries
                continue;
            }
            let commits = git::rev_list_count(&self.repo, &format!("{cursor}..{commit}"))?;
            segments.push(Segment {
                label: tags.join(", "),
                commits,
            });
            cursor = commit;
        }

        // Whatever lies past the last tagged boundary belongs to the tip
        if git::rev_parse(&self.repo, &cursor)? != tip_commit {
            let commits = git::rev_list_count(&self.repo, &format!("{cursor}..{tip}"))?;
            if commits > 0 {
                segments.push(Segment {
                    label: tip.to_string(),
                    commits,
                });
            }
        }

        Ok(StatReport { segments, total })
    }
}
