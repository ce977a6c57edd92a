//! Ref publication after a fully successful run.
//!
//! Two steps, in order: export the workspace's recorded-resolution cache
//! back over the canonical path (so resolutions learned this run help
//! future ones), then force-push every accumulated ref to the source
//! repository. Pushes are independent; a failed ref never rolls back
//! the ones already pushed.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::{error::{GitError, RebranchError}, git};

use super::workspace::{copy_dir_recursive, LOCAL_REMOTE};

/// Per-ref outcome of a publication pass.
#[derive(Debug, Default)]
pub struct PublishReport {
    /// Refs that landed in the source repository.
    pub pushed: Vec<String>,
    /// Refs that failed, with the git error for each.
    pub failed: Vec<(String, GitError)>,
}

impl PublishReport {
    /// Whether every ref was pushed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Publishes the results of a completed run.
pub struct RefPublisher {
    workspace: PathBuf,
}

impl RefPublisher {
    #[must_use]
    pub fn new(workspace: &Path) -> Self {
        RefPublisher {
            workspace: workspace.to_path_buf(),
        }
    }

    /// Export the rerere cache and push `refs` back to the source.
    pub fn publish(
        &self,
        canonical_cache: &Path,
        refs: &[String],
    ) -> Result<PublishReport, RebranchError> {
        self.export_rr_cache(canonical_cache)?;

        let mut report = PublishReport::default();
        for reference in refs {
            match git::push_force(&self.workspace, LOCAL_REMOTE, reference) {
                Ok(()) => {
                    info!(reference = %reference, "ref pushed");
                    report.pushed.push(reference.clone());
                }
                Err(e) => {
                    error!(reference = %reference, error = %e, "ref push failed");
                    report.failed.push((reference.clone(), e));
                }
            }
        }
        Ok(report)
    }

    /// Copy the workspace's rerere records over the canonical cache.
    fn export_rr_cache(&self, canonical: &Path) -> Result<(), RebranchError> {
        let workspace_cache = git::git_path(&self.workspace, "rr-cache")?;
        if !workspace_cache.exists() {
            debug!("workspace recorded no resolutions, nothing to export");
            return Ok(());
        }
        copy_dir_recursive(&workspace_cache, canonical)?;
        info!(cache = %canonical.display(), "recorded-resolution cache exported");
        Ok(())
    }
}
