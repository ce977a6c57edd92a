//! Disposable workspace lifecycle.
//!
//! A workspace is a shared-object-store clone of the source repository at
//! a fresh temporary path. It carries its own working tree and index, has
//! rerere enabled with unlimited retention, starts with the canonical
//! recorded-resolution cache imported, and knows every remote the
//! manifest declares plus the implicit `localrepo` remote pointing back
//! at the source.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{
    error::{GitError, RebranchError},
    git,
    manifest::Manifest,
};

/// Reserved remote name pointing back at the source repository.
pub const LOCAL_REMOTE: &str = "localrepo";

/// Retention period (in days) applied to rerere records in the workspace.
/// Effectively unlimited so imported resolutions never expire mid-run.
const RERERE_RETENTION_DAYS: &str = "36500";

/// A disposable working copy owned by one engine run.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Create a workspace for a fresh run.
    ///
    /// Clones `source` with a shared object store into a new temp
    /// directory, enables rerere, imports the recorded-resolution cache,
    /// registers remotes and checks out `branch` at the manifest's base.
    ///
    /// Any failure here is fatal to the run: nothing has been applied
    /// yet, so the partially built directory is removed before returning.
    pub fn create(source: &Path, branch: &str, manifest: &Manifest) -> Result<Self, RebranchError> {
        if !source.exists() {
            return Err(GitError::PathNotFound {
                path: source.to_path_buf(),
            }
            .into());
        }
        if !git::is_git_repo(source) {
            return Err(GitError::NotARepository {
                path: source.to_path_buf(),
            }
            .into());
        }

        let temp = tempfile::Builder::new().prefix("rebranch-").tempdir()?;
        // Cleanup is policy-driven (keep on conflict, delete on success),
        // so the directory must outlive the TempDir handle.
        let path = temp.keep();

        let workspace = Workspace { path };
        match workspace.populate(source, branch, manifest) {
            Ok(()) => {
                info!(workspace = %workspace.path.display(), branch, "workspace ready");
                Ok(workspace)
            }
            Err(e) => {
                if let Err(cleanup) = std::fs::remove_dir_all(&workspace.path) {
                    warn!(
                        workspace = %workspace.path.display(),
                        error = %cleanup,
                        "failed to remove partially built workspace"
                    );
                }
                Err(e)
            }
        }
    }

    fn populate(&self, source: &Path, branch: &str, manifest: &Manifest) -> Result<(), RebranchError> {
        git::clone_shared(source, &self.path)?;
        git::rename_remote(&self.path, "origin", LOCAL_REMOTE)?;

        git::config_set(&self.path, "rerere.enabled", "true")?;
        git::config_set(&self.path, "rerere.autoUpdate", "true")?;
        git::config_set(&self.path, "gc.rerereResolved", RERERE_RETENTION_DAYS)?;
        git::config_set(&self.path, "gc.rerereUnresolved", RERERE_RETENTION_DAYS)?;

        self.import_rr_cache(&manifest.rr_cache)?;

        for (name, remote) in &manifest.remotes {
            git::add_remote(&self.path, name, &remote.url)?;
        }

        git::fetch(&self.path, &manifest.base.remote, &[&manifest.base.reference])?;
        git::checkout_new_branch(
            &self.path,
            branch,
            &format!("{}/{}", manifest.base.remote, manifest.base.reference),
        )?;

        Ok(())
    }

    /// Open an existing workspace for a resume.
    pub fn open(path: &Path) -> Result<Self, RebranchError> {
        if !path.exists() {
            return Err(GitError::PathNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        if !git::is_git_repo(path) {
            return Err(GitError::NotARepository {
                path: path.to_path_buf(),
            }
            .into());
        }
        Ok(Workspace {
            path: path.to_path_buf(),
        })
    }

    /// The workspace root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy the canonical recorded-resolution cache into the workspace.
    ///
    /// A missing canonical cache is not an error: the first run of a new
    /// plan starts with nothing recorded.
    fn import_rr_cache(&self, canonical: &Path) -> Result<(), RebranchError> {
        if !canonical.exists() {
            debug!(cache = %canonical.display(), "no recorded-resolution cache to import");
            return Ok(());
        }
        let target = git::git_path(&self.path, "rr-cache")?;
        copy_dir_recursive(canonical, &target)?;
        info!(cache = %canonical.display(), "imported recorded-resolution cache");
        Ok(())
    }

    /// Delete the workspace directory.
    ///
    /// Failure is logged but never masks the run's own outcome.
    pub fn delete(self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!(
                workspace = %self.path.display(),
                error = %e,
                "failed to delete workspace"
            );
        } else {
            debug!(workspace = %self.path.display(), "workspace deleted");
        }
    }
}

/// Recursively copy a directory tree, creating `dest` as needed.
pub(crate) fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<(), std::io::Error> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
