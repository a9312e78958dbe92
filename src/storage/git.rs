//! Git adapter
//!
//! Drives the `git` binary with porcelain and plumbing commands. Commits
//! are assembled by hand (`add`, `write-tree`, `commit-tree`, `update-ref`)
//! so that exactly the requested files end up in each commit.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Output};

use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Please clean the staged files from the git index before committing!")]
    DirtyWorkingTree,

    #[error("Could not resolve the git {role} identity; set user.name and user.email")]
    MissingIdentity { role: IdentityRole },

    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("Failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("{0} is not a git repository")]
    NotARepository(PathBuf),
}

/// Which side of a commit an identity is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRole {
    Author,
    Committer,
}

impl fmt::Display for IdentityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityRole::Author => f.write_str("author"),
            IdentityRole::Committer => f.write_str("committer"),
        }
    }
}

/// A name and email attributed to a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

/// Author and committer resolved for the next commit
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identities {
    pub author: Option<Signature>,
    pub committer: Option<Signature>,
}

impl Identities {
    /// Resolves both identities from environment and git config lookups
    ///
    /// The environment variable always wins. After that the committer
    /// prefers `committer.*`, then `user.*`, then `author.*`; the author
    /// checks `author.*`, then `user.*`, then `committer.*`.
    pub fn resolve<E, C>(env: E, config: C) -> Self
    where
        E: Fn(&str) -> Option<String>,
        C: Fn(&str) -> Option<String>,
    {
        let pick = |env_key: &str, config_keys: [&str; 3]| {
            env(env_key)
                .filter(|v| !v.is_empty())
                .or_else(|| {
                    config_keys
                        .iter()
                        .find_map(|&key| config(key).filter(|v| !v.is_empty()))
                })
        };

        let committer = signature(
            pick(
                "GIT_COMMITTER_NAME",
                ["committer.name", "user.name", "author.name"],
            ),
            pick(
                "GIT_COMMITTER_EMAIL",
                ["committer.email", "user.email", "author.email"],
            ),
        );

        let author = signature(
            pick(
                "GIT_AUTHOR_NAME",
                ["author.name", "user.name", "committer.name"],
            ),
            pick(
                "GIT_AUTHOR_EMAIL",
                ["author.email", "user.email", "committer.email"],
            ),
        );

        Self { author, committer }
    }

    fn require(self) -> Result<(Signature, Signature), GitError> {
        let author = self.author.ok_or(GitError::MissingIdentity {
            role: IdentityRole::Author,
        })?;
        let committer = self.committer.ok_or(GitError::MissingIdentity {
            role: IdentityRole::Committer,
        })?;
        Ok((author, committer))
    }
}

fn signature(name: Option<String>, email: Option<String>) -> Option<Signature> {
    match (name, email) {
        (Some(name), Some(email)) => Some(Signature { name, email }),
        _ => None,
    }
}

/// One line of `git status --porcelain`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub code: String,
    pub path: String,
}

/// Parses `git status --porcelain=v1 -z` output
///
/// Renames and copies carry an extra NUL-separated source path, which is
/// skipped.
pub fn parse_porcelain(output: &str) -> Vec<StatusEntry> {
    let mut entries = Vec::new();
    let mut fields = output.split('\0').filter(|f| !f.is_empty());

    while let Some(field) = fields.next() {
        if field.len() < 4 || !field.is_char_boundary(3) {
            continue;
        }
        let (code, path) = field.split_at(3);
        let code = code[..2].to_string();

        if code.starts_with('R') || code.starts_with('C') {
            fields.next();
        }

        entries.push(StatusEntry {
            code,
            path: path.to_string(),
        });
    }

    entries
}

/// Converts a workdir-relative path to git's `/`-separated form
pub fn git_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Operations the object store needs from version control
pub trait VersionControl {
    /// Returns true when every changed path is in `excluding`
    fn is_clean_status(&self, excluding: &[String]) -> Result<bool, GitError>;

    /// Fails with [`GitError::DirtyWorkingTree`] unless the tree is clean
    fn ensure_clean_status(&self, excluding: &[String]) -> Result<(), GitError> {
        if self.is_clean_status(excluding)? {
            Ok(())
        } else {
            Err(GitError::DirtyWorkingTree)
        }
    }

    /// Resolves author and committer for the next commit
    fn identities(&self) -> Result<Identities, GitError>;

    /// Commits exactly `files` (relative to the workdir) and returns the
    /// new commit id
    fn create_commit(
        &self,
        title: &str,
        body: Option<&str>,
        files: &[PathBuf],
    ) -> Result<String, GitError>;
}

/// A git repository with a working tree
#[derive(Debug, Clone)]
pub struct GitRepository {
    workdir: PathBuf,
}

impl GitRepository {
    /// Opens the repository containing `path`
    pub fn discover(path: &Path) -> Result<Self, GitError> {
        let output = git_command(path)
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .map_err(GitError::Spawn)?;

        if !output.status.success() {
            return Err(GitError::NotARepository(path.to_path_buf()));
        }

        let workdir = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Self {
            workdir: PathBuf::from(workdir),
        })
    }

    /// Returns true if git recognizes `path` as (part of) a repository
    pub fn is_repository(path: &Path) -> bool {
        if !path.is_dir() {
            return false;
        }

        git_command(path)
            .args(["rev-parse", "--git-dir"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Creates an empty repository at `path`
    pub fn init(path: &Path) -> Result<Self, GitError> {
        let repo = Self {
            workdir: path.to_path_buf(),
        };
        repo.run(&["init", "--quiet", "."])?;
        Ok(repo)
    }

    /// Returns the working tree root
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Returns the commit the current branch points to, if any
    pub fn head_commit(&self) -> Result<Option<String>, GitError> {
        let output = self.output(&["rev-parse", "--verify", "--quiet", "HEAD^{commit}"])?;
        if output.status.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Returns the full message of a commit
    #[cfg(test)]
    fn commit_message(&self, rev: &str) -> Result<String, GitError> {
        self.run(&["log", "-1", "--format=%B", rev])
    }

    /// Number of commits reachable from HEAD
    #[cfg(test)]
    fn commit_count(&self) -> Result<usize, GitError> {
        if self.head_commit()?.is_none() {
            return Ok(0);
        }
        let count = self.run(&["rev-list", "--count", "HEAD"])?;
        Ok(count.trim().parse().unwrap_or(0))
    }

    /// Lists changed, staged and untracked paths
    pub fn status(&self) -> Result<Vec<StatusEntry>, GitError> {
        let output = self.run(&["status", "--porcelain=v1", "-z", "--untracked-files=all"])?;
        Ok(parse_porcelain(&output))
    }

    /// Reads a config value as git sees it from the workdir
    pub fn config_value(&self, key: &str) -> Result<Option<String>, GitError> {
        let output = self.output(&["config", "--get", key])?;
        if output.status.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Sets a repository-local config value
    #[cfg(test)]
    fn set_config(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.run(&["config", "--local", key, value]).map(|_| ())
    }

    fn write_commit(
        &self,
        title: &str,
        body: Option<&str>,
        parent: Option<&str>,
        author: &Signature,
        committer: &Signature,
    ) -> Result<String, GitError> {
        let tree = self.run(&["write-tree"])?.trim().to_string();

        let mut args = vec!["commit-tree", tree.as_str()];
        if let Some(parent) = parent {
            args.extend(["-p", parent]);
        }
        args.extend(["-m", title]);
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            args.extend(["-m", body]);
        }

        let mut command = self.command();
        command
            .args(&args)
            .env("GIT_AUTHOR_NAME", &author.name)
            .env("GIT_AUTHOR_EMAIL", &author.email)
            .env("GIT_COMMITTER_NAME", &committer.name)
            .env("GIT_COMMITTER_EMAIL", &committer.email);
        let commit = check("commit-tree", command.output().map_err(GitError::Spawn)?)?
            .trim()
            .to_string();

        let reflog = format!("commit: {}", title);
        let mut update = vec!["update-ref", "-m", reflog.as_str(), "HEAD", commit.as_str()];
        if let Some(parent) = parent {
            update.push(parent);
        }
        self.run(&update)?;

        Ok(commit)
    }

    /// Drops `paths` from the index after a failed commit
    fn unstage(&self, paths: &[String], has_parent: bool) {
        let mut args: Vec<&str> = if has_parent {
            vec!["reset", "--quiet", "HEAD", "--"]
        } else {
            vec!["rm", "--cached", "--quiet", "--ignore-unmatch", "--"]
        };
        args.extend(paths.iter().map(String::as_str));

        if let Err(e) = self.run(&args) {
            warn!("Failed to unstage {}: {}", paths.join(", "), e);
        }
    }

    fn command(&self) -> Command {
        git_command(&self.workdir)
    }

    fn output(&self, args: &[&str]) -> Result<Output, GitError> {
        self.command().args(args).output().map_err(GitError::Spawn)
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let name = args.first().copied().unwrap_or_default();
        check(name, self.output(args)?)
    }
}

impl VersionControl for GitRepository {
    fn is_clean_status(&self, excluding: &[String]) -> Result<bool, GitError> {
        Ok(self
            .status()?
            .iter()
            .all(|entry| excluding.contains(&entry.path)))
    }

    fn identities(&self) -> Result<Identities, GitError> {
        let mut config = Vec::new();
        for key in [
            "committer.name",
            "committer.email",
            "user.name",
            "user.email",
            "author.name",
            "author.email",
        ] {
            if let Some(value) = self.config_value(key)? {
                config.push((key, value));
            }
        }

        Ok(Identities::resolve(
            |key| std::env::var(key).ok(),
            |key| {
                config
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.clone())
            },
        ))
    }

    fn create_commit(
        &self,
        title: &str,
        body: Option<&str>,
        files: &[PathBuf],
    ) -> Result<String, GitError> {
        let paths: Vec<String> = files.iter().map(|f| git_path(f)).collect();

        self.ensure_clean_status(&paths)?;
        let (author, committer) = self.identities()?.require()?;
        let parent = self.head_commit()?;

        let mut add = vec!["add", "--"];
        add.extend(paths.iter().map(String::as_str));
        self.run(&add)?;

        match self.write_commit(title, body, parent.as_deref(), &author, &committer) {
            Ok(commit) => {
                debug!("Created commit {} ({})", commit, title);
                Ok(commit)
            }
            Err(e) => {
                self.unstage(&paths, parent.is_some());
                Err(e)
            }
        }
    }
}

fn git_command(dir: &Path) -> Command {
    let mut command = Command::new("git");
    command
        .current_dir(dir)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .env_remove("GIT_INDEX_FILE");
    command
}

fn check(name: &str, output: Output) -> Result<String, GitError> {
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(GitError::Command {
            command: name.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn test_repo() -> (TempDir, GitRepository) {
        let dir = TempDir::new().unwrap();
        let repo = GitRepository::init(dir.path()).unwrap();
        repo.set_config("user.name", "Test User").unwrap();
        repo.set_config("user.email", "test@example.com").unwrap();
        (dir, repo)
    }

    #[test]
    fn env_overrides_config() {
        let ids = Identities::resolve(
            lookup(&[
                ("GIT_AUTHOR_NAME", "Env Author"),
                ("GIT_AUTHOR_EMAIL", "env@example.com"),
            ]),
            lookup(&[("user.name", "User"), ("user.email", "user@example.com")]),
        );

        let author = ids.author.unwrap();
        assert_eq!(author.name, "Env Author");
        assert_eq!(author.email, "env@example.com");

        let committer = ids.committer.unwrap();
        assert_eq!(committer.name, "User");
        assert_eq!(committer.email, "user@example.com");
    }

    #[test]
    fn committer_and_author_fallback_orders() {
        let ids = Identities::resolve(
            lookup(&[]),
            lookup(&[
                ("author.name", "Ann"),
                ("author.email", "ann@example.com"),
                ("committer.name", "Cid"),
                ("committer.email", "cid@example.com"),
                ("user.name", "Uma"),
                ("user.email", "uma@example.com"),
            ]),
        );

        assert_eq!(ids.author.unwrap().name, "Ann");
        assert_eq!(ids.committer.unwrap().name, "Cid");
    }

    #[test]
    fn committer_falls_back_to_author_last() {
        let ids = Identities::resolve(
            lookup(&[]),
            lookup(&[("author.name", "Ann"), ("author.email", "ann@example.com")]),
        );

        assert_eq!(ids.committer.unwrap().email, "ann@example.com");
    }

    #[test]
    fn missing_email_leaves_identity_unresolved() {
        let ids = Identities::resolve(lookup(&[]), lookup(&[("user.name", "Uma")]));
        assert!(ids.author.is_none());
        assert!(ids.committer.is_none());
        assert!(matches!(
            ids.require(),
            Err(GitError::MissingIdentity {
                role: IdentityRole::Author
            })
        ));
    }

    #[test]
    fn porcelain_parsing() {
        let output = "?? objects/a.yml\0 M notes.txt\0R  new.txt\0old.txt\0A  staged.txt\0";
        let entries = parse_porcelain(output);
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["objects/a.yml", "notes.txt", "new.txt", "staged.txt"]
        );
        assert_eq!(entries[0].code, "??");
        assert_eq!(entries[2].code, "R ");
    }

    #[test]
    fn git_paths_use_forward_slashes() {
        let path = Path::new("objects").join("sub").join("x.yml");
        assert_eq!(git_path(&path), "objects/sub/x.yml");
    }

    #[test]
    fn init_and_discover() {
        let dir = TempDir::new().unwrap();
        assert!(!GitRepository::is_repository(&dir.path().join(".git")));

        GitRepository::init(dir.path()).unwrap();
        assert!(GitRepository::is_repository(&dir.path().join(".git")));

        let repo = GitRepository::discover(dir.path()).unwrap();
        assert_eq!(
            repo.workdir().canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn clean_status_honours_exclusions() {
        let (dir, repo) = test_repo();
        assert!(repo.is_clean_status(&[]).unwrap());

        fs::write(dir.path().join("stray.txt"), "x").unwrap();
        assert!(!repo.is_clean_status(&[]).unwrap());
        assert!(repo.is_clean_status(&["stray.txt".to_string()]).unwrap());
        assert!(matches!(
            repo.ensure_clean_status(&[]),
            Err(GitError::DirtyWorkingTree)
        ));
    }

    #[test]
    fn commits_only_the_given_files() {
        let (dir, repo) = test_repo();
        fs::create_dir_all(dir.path().join("objects")).unwrap();
        fs::write(dir.path().join("objects/one.yml"), "---\n").unwrap();

        let first = repo
            .create_commit(
                "create(task): one",
                Some("Reference: one"),
                &[PathBuf::from("objects/one.yml")],
            )
            .unwrap();

        assert_eq!(repo.head_commit().unwrap().as_deref(), Some(first.as_str()));
        assert_eq!(
            repo.commit_message(&first).unwrap().trim_end(),
            "create(task): one\n\nReference: one"
        );

        fs::write(dir.path().join("objects/two.yml"), "---\n").unwrap();
        repo.create_commit("create(task): two", None, &[PathBuf::from("objects/two.yml")])
            .unwrap();

        assert_eq!(repo.commit_count().unwrap(), 2);
        assert!(repo.is_clean_status(&[]).unwrap());
    }

    #[test]
    fn dirty_tree_blocks_commit() {
        let (dir, repo) = test_repo();
        fs::write(dir.path().join("stray.txt"), "x").unwrap();
        fs::write(dir.path().join("wanted.yml"), "---\n").unwrap();

        let result = repo.create_commit("title", None, &[PathBuf::from("wanted.yml")]);

        assert!(matches!(result, Err(GitError::DirtyWorkingTree)));
        assert_eq!(repo.commit_count().unwrap(), 0);
    }

    /// Blocks ref updates on the current branch
    fn lock_branch(dir: &Path, repo: &GitRepository) -> PathBuf {
        let branch = repo.run(&["symbolic-ref", "--short", "HEAD"]).unwrap();
        let lock = dir
            .join(".git")
            .join("refs")
            .join("heads")
            .join(format!("{}.lock", branch.trim()));
        fs::create_dir_all(lock.parent().unwrap()).unwrap();
        fs::write(&lock, "").unwrap();
        lock
    }

    #[test]
    fn failed_first_commit_clears_index() {
        let (dir, repo) = test_repo();
        fs::write(dir.path().join("wanted.yml"), "---\n").unwrap();
        lock_branch(dir.path(), &repo);

        let result = repo.create_commit("title", None, &[PathBuf::from("wanted.yml")]);

        assert!(matches!(result, Err(GitError::Command { .. })));
        assert_eq!(repo.head_commit().unwrap(), None);
        assert_eq!(
            repo.status().unwrap(),
            vec![StatusEntry {
                code: "??".to_string(),
                path: "wanted.yml".to_string(),
            }]
        );
    }

    #[test]
    fn failed_commit_resets_index_to_head() {
        let (dir, repo) = test_repo();
        fs::write(dir.path().join("one.yml"), "---\n").unwrap();
        let first = repo
            .create_commit("one", None, &[PathBuf::from("one.yml")])
            .unwrap();

        fs::write(dir.path().join("two.yml"), "---\n").unwrap();
        let lock = lock_branch(dir.path(), &repo);

        let result = repo.create_commit("two", None, &[PathBuf::from("two.yml")]);

        assert!(matches!(result, Err(GitError::Command { .. })));
        assert_eq!(repo.head_commit().unwrap().as_deref(), Some(first.as_str()));
        let status = repo.status().unwrap();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].code, "??");

        fs::remove_file(lock).unwrap();
        repo.create_commit("two", None, &[PathBuf::from("two.yml")])
            .unwrap();
        assert_eq!(repo.commit_count().unwrap(), 2);
    }
}
