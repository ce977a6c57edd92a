//! Git subprocess plumbing.
//!
//! All repository manipulation goes through the `git` binary rather than a
//! bindings crate: rerere replay and `cherry-pick --continue` are sequencer
//! features that only the CLI exposes, and the workspace a conflicted run
//! leaves behind must be a plain repository an operator can work in with
//! their own git.

use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use crate::error::GitError;

/// Run a git command in `repo` and capture its output.
fn run_git(repo: &Path, args: &[&str]) -> Result<Output, GitError> {
    Command::new("git")
        .current_dir(repo)
        .args(args)
        .output()
        .map_err(|e| GitError::CommandFailed {
            command: format!("git {}", args.join(" ")),
            message: e.to_string(),
        })
}

/// Run a git command and fail unless it exits zero.
fn expect_success(repo: &Path, args: &[&str]) -> Result<Output, GitError> {
    let output = run_git(repo, args)?;
    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command: format!("git {}", args.join(" ")),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

fn stdout_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Check whether `path` is inside a git repository.
#[must_use]
pub fn is_git_repo(path: &Path) -> bool {
    run_git(path, &["rev-parse", "--git-dir"])
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Clone `source` into `dest` sharing the object store.
///
/// `--no-checkout` keeps the initial clone cheap; the caller checks out
/// the working branch explicitly afterwards.
pub fn clone_shared(source: &Path, dest: &Path) -> Result<(), GitError> {
    let source_str = source.to_string_lossy();
    let dest_str = dest.to_string_lossy();
    let output = Command::new("git")
        .args(["clone", "--shared", "--no-checkout", &source_str, &dest_str])
        .output()
        .map_err(|e| GitError::CloneFailed {
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(GitError::CloneFailed {
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Set a repository-local config value.
pub fn config_set(repo: &Path, key: &str, value: &str) -> Result<(), GitError> {
    expect_success(repo, &["config", key, value])?;
    Ok(())
}

/// Add a named remote.
pub fn add_remote(repo: &Path, name: &str, url: &str) -> Result<(), GitError> {
    expect_success(repo, &["remote", "add", name, url])?;
    Ok(())
}

/// Rename a remote.
pub fn rename_remote(repo: &Path, from: &str, to: &str) -> Result<(), GitError> {
    expect_success(repo, &["remote", "rename", from, to])?;
    Ok(())
}

/// Fetch branches from a remote into its remote-tracking namespace.
///
/// With an empty `branches` slice the remote's full branch set is fetched.
pub fn fetch(repo: &Path, remote: &str, branches: &[&str]) -> Result<(), GitError> {
    let mut args = vec!["fetch".to_string(), remote.to_string()];
    for branch in branches {
        // Explicit refspecs so an ad-hoc fetch still lands under refs/remotes/
        args.push(format!(
            "+refs/heads/{branch}:refs/remotes/{remote}/{branch}"
        ));
    }
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = run_git(repo, &arg_refs)?;
    if !output.status.success() {
        return Err(GitError::FetchFailed {
            remote: remote.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Create and check out a new branch starting at `start_point`.
pub fn checkout_new_branch(repo: &Path, branch: &str, start_point: &str) -> Result<(), GitError> {
    expect_success(repo, &["checkout", "-b", branch, start_point])?;
    Ok(())
}

/// Outcome of starting a range cherry-pick.
#[derive(Debug)]
pub enum CherryPickResult {
    /// Every commit in the range applied cleanly.
    Applied,
    /// The sequencer stopped on a conflicting commit.
    Stalled,
}

/// Outcome of advancing a stalled cherry-pick sequence.
#[derive(Debug, PartialEq, Eq)]
pub enum ContinueResult {
    /// The sequence ran to completion (or none was in progress).
    Finished,
    /// The sequence stopped again on a conflicting commit.
    Stalled,
}

/// Cherry-pick a commit range (`base..tip`) onto the current branch.
pub fn cherry_pick_range(repo: &Path, range: &str) -> Result<CherryPickResult, GitError> {
    let output = run_git(repo, &["cherry-pick", range])?;

    if output.status.success() {
        return Ok(CherryPickResult::Applied);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("conflict") || stderr.contains("CONFLICT") {
        Ok(CherryPickResult::Stalled)
    } else {
        Err(GitError::CommandFailed {
            command: format!("git cherry-pick {range}"),
            message: stderr.trim().to_string(),
        })
    }
}

/// Classify the outcome of `cherry-pick --continue` / `--skip`.
fn classify_sequencer_step(command: &str, output: &Output) -> Result<ContinueResult, GitError> {
    if output.status.success() {
        return Ok(ContinueResult::Finished);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("no cherry-pick or revert in progress") {
        // The operator already finished the sequence by hand
        return Ok(ContinueResult::Finished);
    }
    if stderr.contains("conflict") || stderr.contains("CONFLICT") {
        return Ok(ContinueResult::Stalled);
    }
    Err(GitError::CommandFailed {
        command: command.to_string(),
        message: stderr.trim().to_string(),
    })
}

/// Continue a stalled cherry-pick sequence.
///
/// `core.editor=true` keeps git from opening an editor for the replayed
/// commit message.
pub fn cherry_pick_continue(repo: &Path) -> Result<ContinueResult, GitError> {
    let output = run_git(
        repo,
        &["-c", "core.editor=true", "cherry-pick", "--continue"],
    )?;
    classify_sequencer_step("git cherry-pick --continue", &output)
}

/// Skip the current commit and keep replaying the rest of the sequence.
pub fn cherry_pick_skip(repo: &Path) -> Result<ContinueResult, GitError> {
    let output = run_git(repo, &["cherry-pick", "--skip"])?;
    classify_sequencer_step("git cherry-pick --skip", &output)
}

/// Commit the currently staged tree with the message prepared by the
/// stalled cherry-pick.
pub fn commit_no_edit(repo: &Path) -> Result<(), GitError> {
    expect_success(repo, &["-c", "core.editor=true", "commit", "--no-edit"])?;
    Ok(())
}

/// List files that still carry unresolved conflict entries.
pub fn unresolved_files(repo: &Path) -> Result<Vec<String>, GitError> {
    let output = expect_success(repo, &["diff", "--name-only", "--diff-filter=U"])?;
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Check whether the index holds no staged changes against HEAD.
pub fn staged_is_empty(repo: &Path) -> Result<bool, GitError> {
    let output = run_git(repo, &["diff", "--cached", "--quiet"])?;
    match output.status.code() {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        _ => Err(GitError::CommandFailed {
            command: "git diff --cached --quiet".to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
    }
}

/// Check whether tracked files in the worktree are clean.
///
/// Untracked files (the resume checkpoint among them) do not count.
pub fn worktree_changes(repo: &Path) -> Result<Vec<String>, GitError> {
    let output = expect_success(repo, &["status", "--porcelain", "--untracked-files=no"])?;
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Count the commits still queued in the cherry-pick sequencer.
///
/// While a range pick is stalled the todo file still lists the current
/// commit, so its pick count alone is the pending total. A
/// single-commit cherry-pick has no sequencer directory; there the
/// pending `CHERRY_PICK_HEAD` counts as one.
pub fn sequencer_remaining(repo: &Path) -> Result<usize, GitError> {
    let todo = git_path(repo, "sequencer/todo")?;
    if let Ok(contents) = std::fs::read_to_string(&todo) {
        return Ok(contents
            .lines()
            .filter(|line| line.starts_with("pick"))
            .count());
    }
    if git_path(repo, "CHERRY_PICK_HEAD")?.exists() {
        return Ok(1);
    }
    Ok(0)
}

/// Resolve a path inside the repository's git directory.
pub fn git_path(repo: &Path, name: &str) -> Result<PathBuf, GitError> {
    let output = expect_success(repo, &["rev-parse", "--git-path", name])?;
    let path = PathBuf::from(stdout_string(&output));
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(repo.join(path))
    }
}

/// Create or move a lightweight tag at HEAD.
pub fn tag(repo: &Path, name: &str) -> Result<(), GitError> {
    expect_success(repo, &["tag", "--force", name])?;
    Ok(())
}

/// List tags pointing at a commit.
pub fn tags_at(repo: &Path, commit: &str) -> Result<Vec<String>, GitError> {
    let output = expect_success(repo, &["tag", "--points-at", commit])?;
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Force-push a single ref to a remote.
pub fn push_force(repo: &Path, remote: &str, reference: &str) -> Result<(), GitError> {
    let output = run_git(repo, &["push", "--force", remote, reference])?;
    if !output.status.success() {
        return Err(GitError::PushFailed {
            reference: reference.to_string(),
            remote: remote.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Count the commits reachable through `range` (e.g. `base..tip`).
pub fn rev_list_count(repo: &Path, range: &str) -> Result<usize, GitError> {
    let output = expect_success(repo, &["rev-list", "--count", range])?;
    stdout_string(&output)
        .parse()
        .map_err(|e: std::num::ParseIntError| GitError::CommandFailed {
            command: format!("git rev-list --count {range}"),
            message: e.to_string(),
        })
}

/// Resolve a revision to its full commit hash.
pub fn rev_parse(repo: &Path, rev: &str) -> Result<String, GitError> {
    let output = expect_success(repo, &["rev-parse", "--verify", &format!("{rev}^{{commit}}")])?;
    Ok(stdout_string(&output))
}

/// List ref-decorated commits in `range`, oldest first.
///
/// These are the commits where a branch or tag boundary sits, which is
/// exactly the skeleton a segment report needs.
pub fn decorated_commits(repo: &Path, range: &str) -> Result<Vec<String>, GitError> {
    let output = expect_success(
        repo,
        &[
            "log",
            "--simplify-by-decoration",
            "--format=%H",
            "--reverse",
            range,
        ],
    )?;
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
