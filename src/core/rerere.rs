//! Automatic conflict resolution driven by the recorded-resolution cache.
//!
//! When a range cherry-pick stalls, git has already consulted rerere for
//! the conflicting commit. With `rerere.autoUpdate` on, a known conflict
//! comes back fully staged; an unknown one leaves unresolved entries in
//! the index. The resolver's job is to turn "fully staged" into a commit
//! and keep the sequence moving until it either finishes or hits a
//! conflict the cache has never seen.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    error::GitError,
    git::{self, ContinueResult},
};

/// Sequencer operations the resolver needs.
///
/// The engine hands the resolver a live repository; tests hand it a
/// scripted fake to exercise the loop without git.
pub trait CherryPickBackend {
    /// Files with unresolved conflict entries in the index.
    fn unresolved_files(&self) -> Result<Vec<String>, GitError>;
    /// Whether the staged change-set is empty.
    fn staged_is_empty(&self) -> Result<bool, GitError>;
    /// Commit the staged resolution with the prepared message.
    fn commit_resolution(&self) -> Result<(), GitError>;
    /// Skip the current (now empty) commit and keep replaying.
    fn skip_current(&self) -> Result<ContinueResult, GitError>;
    /// Continue the stalled sequence.
    fn continue_sequence(&self) -> Result<ContinueResult, GitError>;
    /// Commits still queued in the sequencer.
    fn remaining_commits(&self) -> Result<usize, GitError>;
}

/// Live backend over a workspace repository.
pub struct RepoBackend {
    repo: PathBuf,
}

impl RepoBackend {
    #[must_use]
    pub fn new(repo: &Path) -> Self {
        RepoBackend {
            repo: repo.to_path_buf(),
        }
    }
}

impl CherryPickBackend for RepoBackend {
    fn unresolved_files(&self) -> Result<Vec<String>, GitError> {
        git::unresolved_files(&self.repo)
    }

    fn staged_is_empty(&self) -> Result<bool, GitError> {
        git::staged_is_empty(&self.repo)
    }

    fn commit_resolution(&self) -> Result<(), GitError> {
        git::commit_no_edit(&self.repo)
    }

    fn skip_current(&self) -> Result<ContinueResult, GitError> {
        git::cherry_pick_skip(&self.repo)
    }

    fn continue_sequence(&self) -> Result<ContinueResult, GitError> {
        git::cherry_pick_continue(&self.repo)
    }

    fn remaining_commits(&self) -> Result<usize, GitError> {
        git::sequencer_remaining(&self.repo)
    }
}

/// Outcome of a resolution attempt.
#[derive(Debug)]
pub enum Resolution {
    /// The whole range applied; the sequence is finished.
    Resolved,
    /// A conflict the cache cannot resolve. The sequencer is left
    /// stalled for the operator.
    Unresolvable { files: Vec<String> },
}

/// Drives the resolve-commit-continue loop on a stalled cherry-pick.
#[derive(Debug, Default)]
pub struct RerereResolver;

impl RerereResolver {
    #[must_use]
    pub fn new() -> Self {
        RerereResolver
    }

    /// Resolve a freshly stalled cherry-pick.
    ///
    /// Each iteration handles exactly one stalled commit, so the loop is
    /// bounded by the number of commits still queued when we start.
    pub fn resolve(&self, backend: &dyn CherryPickBackend) -> Result<Resolution, GitError> {
        // One slack iteration for the final --continue that reports
        // nothing left to do.
        let budget = backend.remaining_commits()?.max(1) + 1;

        for round in 0..budget {
            let files = backend.unresolved_files()?;
            if !files.is_empty() {
                info!(round, files = files.len(), "conflict not covered by recorded resolutions");
                return Ok(Resolution::Unresolvable { files });
            }

            // rerere supplied (and staged) a full resolution for this commit
            let step = if backend.staged_is_empty()? {
                debug!(round, "recorded resolution is a no-op, skipping commit");
                backend.skip_current()?
            } else {
                debug!(round, "committing recorded resolution");
                backend.commit_resolution()?;
                backend.continue_sequence()?
            };

            if step == ContinueResult::Finished {
                info!(rounds = round + 1, "cherry-pick range fully auto-resolved");
                return Ok(Resolution::Resolved);
            }
        }

        Err(GitError::CommandFailed {
            command: "git cherry-pick --continue".to_string(),
            message: format!("resolution loop did not terminate within {budget} steps"),
        })
    }

    /// Finish a sequence interrupted in a previous invocation.
    ///
    /// The operator has committed their resolution by hand, so the first
    /// move is a plain continue; any later stall goes back through the
    /// normal resolve loop.
    pub fn finish(&self, backend: &dyn CherryPickBackend) -> Result<Resolution, GitError> {
        match backend.continue_sequence()? {
            ContinueResult::Finished => Ok(Resolution::Resolved),
            ContinueResult::Stalled => self.resolve(backend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// One scripted stall in the fake sequence.
    struct ScriptedStall {
        unresolved: Vec<String>,
        staged_empty: bool,
    }

    /// Fake backend replaying a fixed sequence of stalls.
    struct FakeBackend {
        stalls: RefCell<Vec<ScriptedStall>>,
        commits: RefCell<usize>,
        skips: RefCell<usize>,
        remaining: usize,
    }

    impl FakeBackend {
        fn new(stalls: Vec<ScriptedStall>) -> Self {
            let remaining = stalls.len();
            FakeBackend {
                stalls: RefCell::new(stalls),
                commits: RefCell::new(0),
                skips: RefCell::new(0),
                remaining,
            }
        }

        fn current<T>(&self, f: impl Fn(&ScriptedStall) -> T) -> T {
            f(&self.stalls.borrow()[0])
        }

        fn advance(&self) -> ContinueResult {
            let mut stalls = self.stalls.borrow_mut();
            stalls.remove(0);
            if stalls.is_empty() {
                ContinueResult::Finished
            } else {
                ContinueResult::Stalled
            }
        }
    }

    impl CherryPickBackend for FakeBackend {
        fn unresolved_files(&self) -> Result<Vec<String>, GitError> {
            Ok(self.current(|s| s.unresolved.clone()))
        }

        fn staged_is_empty(&self) -> Result<bool, GitError> {
            Ok(self.current(|s| s.staged_empty))
        }

        fn commit_resolution(&self) -> Result<(), GitError> {
            *self.commits.borrow_mut() += 1;
            Ok(())
        }

        fn skip_current(&self) -> Result<ContinueResult, GitError> {
            *self.skips.borrow_mut() += 1;
            Ok(self.advance())
        }

        fn continue_sequence(&self) -> Result<ContinueResult, GitError> {
            Ok(self.advance())
        }

        fn remaining_commits(&self) -> Result<usize, GitError> {
            Ok(self.remaining)
        }
    }

    fn resolved_stall() -> ScriptedStall {
        ScriptedStall {
            unresolved: vec![],
            staged_empty: false,
        }
    }

    /// # Test: Single Auto-Resolved Stall
    ///
    /// Verifies that one rerere-staged conflict is committed and the
    /// sequence completes.
    ///
    /// ## Test Scenario
    /// - Fake backend with one stall whose resolution is fully staged
    ///
    /// ## Expected Outcome
    /// - Resolution is Resolved after exactly one commit and no skips
    #[test]
    fn test_single_resolved_stall() {
        let backend = FakeBackend::new(vec![resolved_stall()]);
        let resolution = RerereResolver::new().resolve(&backend).unwrap();

        assert!(matches!(resolution, Resolution::Resolved));
        assert_eq!(*backend.commits.borrow(), 1);
        assert_eq!(*backend.skips.borrow(), 0);
    }

    /// # Test: Multi-Stall Resolution
    ///
    /// Verifies that consecutive auto-resolvable stalls are all committed.
    ///
    /// ## Test Scenario
    /// - Fake backend with three stalls, each fully staged by the cache
    ///
    /// ## Expected Outcome
    /// - Resolution is Resolved after three commits
    #[test]
    fn test_multiple_resolved_stalls() {
        let backend = FakeBackend::new(vec![resolved_stall(), resolved_stall(), resolved_stall()]);
        let resolution = RerereResolver::new().resolve(&backend).unwrap();

        assert!(matches!(resolution, Resolution::Resolved));
        assert_eq!(*backend.commits.borrow(), 3);
    }

    /// # Test: Empty Resolution Skips the Commit
    ///
    /// Verifies that a resolution with no net change skips instead of
    /// committing, without halting the loop.
    ///
    /// ## Test Scenario
    /// - First stall resolves to an empty staged set, second to a real one
    ///
    /// ## Expected Outcome
    /// - One skip, one commit, sequence Resolved
    #[test]
    fn test_empty_resolution_skips() {
        let backend = FakeBackend::new(vec![
            ScriptedStall {
                unresolved: vec![],
                staged_empty: true,
            },
            resolved_stall(),
        ]);
        let resolution = RerereResolver::new().resolve(&backend).unwrap();

        assert!(matches!(resolution, Resolution::Resolved));
        assert_eq!(*backend.skips.borrow(), 1);
        assert_eq!(*backend.commits.borrow(), 1);
    }

    /// # Test: Novel Conflict Surfaces Immediately
    ///
    /// Verifies that unresolved conflict entries stop the loop and are
    /// reported to the caller.
    ///
    /// ## Test Scenario
    /// - First stall has unresolved files the cache cannot cover
    ///
    /// ## Expected Outcome
    /// - Resolution is Unresolvable listing the files, nothing committed
    #[test]
    fn test_unresolvable_conflict() {
        let backend = FakeBackend::new(vec![ScriptedStall {
            unresolved: vec!["src/auth.rs".to_string()],
            staged_empty: false,
        }]);
        let resolution = RerereResolver::new().resolve(&backend).unwrap();

        match resolution {
            Resolution::Unresolvable { files } => {
                assert_eq!(files, vec!["src/auth.rs".to_string()]);
            }
            Resolution::Resolved => panic!("expected unresolvable conflict"),
        }
        assert_eq!(*backend.commits.borrow(), 0);
    }

    /// # Test: Unresolvable After Auto-Resolved Commits
    ///
    /// Verifies that earlier auto-resolutions are kept when a later
    /// commit turns out to be novel.
    ///
    /// ## Test Scenario
    /// - First stall auto-resolves, second has unresolved files
    ///
    /// ## Expected Outcome
    /// - One commit happened, then Unresolvable is reported
    #[test]
    fn test_unresolvable_after_progress() {
        let backend = FakeBackend::new(vec![
            resolved_stall(),
            ScriptedStall {
                unresolved: vec!["src/db.rs".to_string()],
                staged_empty: false,
            },
        ]);
        let resolution = RerereResolver::new().resolve(&backend).unwrap();

        assert!(matches!(resolution, Resolution::Unresolvable { .. }));
        assert_eq!(*backend.commits.borrow(), 1);
    }

    /// # Test: Finish After Manual Resolution
    ///
    /// Verifies the resume path where the operator already committed the
    /// conflicted commit by hand.
    ///
    /// ## Test Scenario
    /// - finish() against a backend whose first continue completes
    /// - finish() against a backend that stalls once more, resolvably
    ///
    /// ## Expected Outcome
    /// - Both runs end Resolved; the second commits the later stall
    #[test]
    fn test_finish_paths() {
        // Continue completes immediately: the manual commit was the last one.
        let backend = FakeBackend::new(vec![resolved_stall()]);
        let resolution = RerereResolver::new().finish(&backend).unwrap();
        assert!(matches!(resolution, Resolution::Resolved));
        assert_eq!(*backend.commits.borrow(), 0);

        // Continue stalls again on an auto-resolvable commit.
        let backend = FakeBackend::new(vec![resolved_stall(), resolved_stall()]);
        let resolution = RerereResolver::new().finish(&backend).unwrap();
        assert!(matches!(resolution, Resolution::Resolved));
        assert_eq!(*backend.commits.borrow(), 1);
    }
}
