//! Unified error handling for the rebranch library.
//!
//! This module provides an error hierarchy using `thiserror` for better
//! programmatic error handling and more informative error messages.
//!
//! ## Error Categories
//!
//! - [`GitError`]: Errors from git subprocess invocations
//! - [`ManifestError`]: Errors from manifest and checkpoint loading/validation
//!
//! ## Example
//!
//! ```rust,no_run
//! use rebranch::error::{RebranchError, GitError};
//!
//! fn example() -> Result<(), RebranchError> {
//!     // Errors are automatically converted via From trait
//!     Err(GitError::PathNotFound { path: "/missing".into() })?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the rebranch library.
///
/// This enum encompasses all possible errors that can occur while
/// building a workspace, replaying topics, and publishing refs.
#[derive(Error, Debug)]
pub enum RebranchError {
    /// An error occurred during a git operation.
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// An error occurred while loading or validating a manifest or checkpoint.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// The workspace has uncommitted changes that block a resume.
    #[error(
        "Workspace has uncommitted changes in {count} file(s); \
         commit the conflict resolution (`git cherry-pick --continue`) or stash \
         unrelated changes before resuming"
    )]
    DirtyWorkspace {
        /// Number of modified files.
        count: usize,
        /// The modified file paths.
        files: Vec<String>,
    },

    /// An I/O error occurred outside of a git subprocess.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A generic error for cases not covered by specific error types.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Errors that can occur during git operations.
#[derive(Error, Debug, Clone)]
pub enum GitError {
    /// The specified path is not a valid git repository.
    #[error("Not a valid git repository: {path}")]
    NotARepository {
        /// Path that was expected to be a repository.
        path: PathBuf,
    },

    /// The repository path does not exist.
    #[error("Repository path does not exist: {path}")]
    PathNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// A git clone operation failed.
    #[error("Failed to clone repository: {message}")]
    CloneFailed {
        /// Error message from git.
        message: String,
    },

    /// Failed to fetch from a remote.
    #[error("Failed to fetch '{remote}': {message}")]
    FetchFailed {
        /// Name of the remote.
        remote: String,
        /// Error message from git.
        message: String,
    },

    /// Failed to push a ref to a remote.
    #[error("Failed to push '{reference}' to '{remote}': {message}")]
    PushFailed {
        /// The ref that could not be pushed.
        reference: String,
        /// Name of the remote.
        remote: String,
        /// Error message from git.
        message: String,
    },

    /// A git command execution failed.
    #[error("Git command failed: {command} - {message}")]
    CommandFailed {
        /// The git command that failed.
        command: String,
        /// Error message from git.
        message: String,
    },
}

/// Errors that can occur while loading manifests and resume checkpoints.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Failed to read the manifest file.
    #[error("Failed to read manifest at {path}: {message}")]
    FileReadError {
        /// Path to the manifest file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to parse the manifest file.
    #[error("Failed to parse manifest at {path}: {message}")]
    ParseError {
        /// Path to the manifest file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// An invalid value was provided for a manifest field.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Name of the field with invalid value.
        field: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// A topic references a remote that is not declared in the manifest.
    #[error("Topic '{topic}' references undeclared remote '{remote}'")]
    UnknownRemote {
        /// Name of the topic.
        topic: String,
        /// Name of the missing remote.
        remote: String,
    },

    /// No resume checkpoint was found in the workspace.
    #[error("No resume checkpoint found at {path}; was this workspace created by a conflicted run?")]
    CheckpointMissing {
        /// Expected checkpoint path.
        path: PathBuf,
    },

    /// The checkpoint was written by an incompatible version.
    #[error("Unsupported checkpoint schema version {found} (expected {expected})")]
    SchemaVersionMismatch {
        /// Version found in the checkpoint.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },
}

/// Type alias for Results using RebranchError.
///
/// Note: This is not re-exported from the crate root to avoid shadowing `anyhow::Result`.
/// Use explicitly as `error::Result<T>` when needed.
pub type RebranchResult<T> = std::result::Result<T, RebranchError>;
