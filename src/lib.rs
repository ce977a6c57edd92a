//! # Rebranch
//!
//! Rebuilds an integration branch by cherry-picking a set of topic
//! branches onto a moving base. This library provides:
//!
//! - Manifest parsing and validation for rebase plans
//! - Disposable shared-clone workspaces with rerere enabled
//! - A resumable cherry-pick orchestration engine
//! - Automatic conflict resolution from a recorded-resolution cache
//! - Checkpointed conflict recovery and ref publication
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use rebranch::manifest::{Manifest, TagPolicy};
//! use rebranch::core::{engine::CherryPickEngine, workspace::Workspace};
//!
//! # fn main() -> anyhow::Result<()> {
//! let manifest = Manifest::load(Path::new("rebase.yaml"))?;
//! let source = Path::new("/src/repo");
//! let workspace = Workspace::create(source, "next", &manifest)?;
//!
//! let engine = CherryPickEngine::new(
//!     workspace.path(),
//!     &manifest,
//!     source,
//!     "next".to_string(),
//!     TagPolicy::default(),
//! );
//! let outcome = engine.run()?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod git;
pub mod logging;
pub mod manifest;

// Re-export commonly used types for convenience
pub use error::{GitError, ManifestError, RebranchError};
pub use manifest::{Manifest, ResumeState, TagPolicy, Topic};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short hash of the commit this build was produced from
pub const GIT_HASH: &str = env!("GIT_HASH");
