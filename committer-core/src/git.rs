// git collaborator - reads go through git2, writes that should honour hooks
// and credential helpers shell out to the git binary

use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use git2::{
    DiffFormat, DiffOptions, DiffStatsFormat, Reference, Repository, StatusOptions, Tree,
};
use tracing::{debug, trace};

use crate::error::GitError;

/// width used when rendering `--stat` style output
const STAT_WIDTH: usize = 80;

/// everything the commit flow needs from version control
pub trait Vcs {
    fn is_repository(&self) -> bool;
    fn has_staged_changes(&self) -> Result<bool, GitError>;
    /// any staged, unstaged or untracked change
    fn is_dirty(&self) -> Result<bool, GitError>;
    fn stage_all(&self) -> Result<(), GitError>;
    /// staged changes with zero lines of context
    fn diff(&self) -> Result<String, GitError>;
    /// `--stat` summary of the staged changes
    fn stats(&self) -> Result<String, GitError>;
    fn commit(&self, message: &str) -> Result<(), GitError>;
    fn push(&self) -> Result<(), GitError>;
    fn tag(&self, name: &str) -> Result<(), GitError>;
    fn push_tags(&self) -> Result<(), GitError>;
}

/// a working tree on disk
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Repository, GitError> {
        Repository::discover(&self.path).map_err(|e| {
            debug!(path = %self.path.display(), error = %e, "repository discovery failed");
            GitError::NotARepository
        })
    }

    /// staged diff of index against HEAD (or the empty tree before the first commit)
    fn staged_diff<'r>(&self, repo: &'r Repository) -> Result<git2::Diff<'r>, GitError> {
        let head_tree = head_tree(repo)?;
        let mut opts = DiffOptions::new();
        opts.context_lines(0).show_binary(false);
        Ok(repo.diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))?)
    }

    fn run_git(&self, args: &[&str]) -> Result<String, GitError> {
        trace!(cmd = %format!("git {}", args.join(" ")), path = %self.path.display(), "running git command");

        let output = StdCommand::new("git")
            .current_dir(&self.path)
            .args(args)
            .output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(GitError::CommandFailed {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

fn head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, GitError> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_tree()?)),
        // unborn branch: nothing committed yet
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch || e.code() == git2::ErrorCode::NotFound => {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

impl Vcs for GitRepo {
    fn is_repository(&self) -> bool {
        self.open().is_ok()
    }

    fn has_staged_changes(&self) -> Result<bool, GitError> {
        let repo = self.open()?;
        let diff = self.staged_diff(&repo)?;
        Ok(diff.deltas().count() > 0)
    }

    fn is_dirty(&self) -> Result<bool, GitError> {
        let repo = self.open()?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .include_ignored(false)
            .recurse_untracked_dirs(false);
        Ok(!repo.statuses(Some(&mut opts))?.is_empty())
    }

    fn stage_all(&self) -> Result<(), GitError> {
        self.run_git(&["add", "--all"])?;
        debug!(path = %self.path.display(), "staged all changes");
        Ok(())
    }

    fn diff(&self) -> Result<String, GitError> {
        let repo = self.open()?;
        let diff = self.staged_diff(&repo)?;

        let mut patch = String::new();
        diff.print(DiffFormat::Patch, |_, _, line| {
            // file and hunk headers carry their own text; content lines need the origin marker
            if matches!(line.origin(), '+' | '-' | ' ') {
                patch.push(line.origin());
            }
            patch.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;

        debug!(bytes = patch.len(), "read staged diff");
        Ok(patch)
    }

    fn stats(&self) -> Result<String, GitError> {
        let repo = self.open()?;
        let diff = self.staged_diff(&repo)?;
        let buf = diff.stats()?.to_buf(DiffStatsFormat::FULL, STAT_WIDTH)?;
        Ok(buf.as_str().unwrap_or_default().to_string())
    }

    fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run_git(&["commit", "-m", message])?;
        debug!(path = %self.path.display(), "created commit");
        Ok(())
    }

    fn push(&self) -> Result<(), GitError> {
        self.run_git(&["push"]).map(|_| ())
    }

    fn tag(&self, name: &str) -> Result<(), GitError> {
        if !is_valid_tag_name(name) {
            return Err(GitError::InvalidTag(name.to_string()));
        }

        let repo = self.open()?;
        let head = repo.head()?.peel(git2::ObjectType::Commit)?;
        repo.tag_lightweight(name, &head, false)?;
        debug!(tag = name, "created tag");
        Ok(())
    }

    fn push_tags(&self) -> Result<(), GitError> {
        self.run_git(&["push", "--tags"]).map(|_| ())
    }
}

/// whether `name` can be used as `refs/tags/<name>`
pub fn is_valid_tag_name(name: &str) -> bool {
    !name.trim().is_empty() && Reference::is_valid_name(&format!("refs/tags/{name}"))
}
