//! git-backed package fetching
//!
//! Clones the remote into a staging directory next to the destination, checks
//! out the requested ref, records `HEAD`, and moves the package root onto the
//! destination with a rename.

use crate::manifest::{is_clean_subdir, Source};
use crate::packages::cancel::Cancellation;
use crate::packages::fetch::{FetchError, FetchErrorKind, Fetcher};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

/// How often a running git process checks for cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Fetcher that shells out to the `git` executable
#[derive(Debug, Clone)]
pub struct GitFetcher {
    git: String,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl GitFetcher {
    pub fn new() -> Self {
        Self::with_binary("git")
    }

    /// Use a specific git executable (name on PATH or absolute path)
    pub fn with_binary(git: impl Into<String>) -> Self {
        Self { git: git.into() }
    }

    /// Run git, killing it if `cancel` fires. Returns trimmed stdout.
    fn run_git(
        &self,
        args: &[&str],
        cwd: Option<&Path>,
        cancel: &Cancellation,
    ) -> Result<String, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::cancelled());
        }

        let mut cmd = Command::new(&self.git);
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        tracing::trace!(git = %self.git, ?args, "running git");

        let mut child = cmd.spawn().map_err(|e| {
            FetchError::new(
                FetchErrorKind::Other,
                format!("failed to execute {}: {}", self.git, e),
            )
        })?;

        // Drain pipes on their own threads so a chatty git cannot block on a full pipe
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(FetchError::cancelled());
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(FetchError::new(
                        FetchErrorKind::Other,
                        format!("failed to wait for git: {}", e),
                    ))
                }
            }
        };

        let stdout = stdout.map(join_reader).unwrap_or_default();
        let stderr = stderr.map(join_reader).unwrap_or_default();

        if !status.success() {
            let stderr = stderr.trim();
            return Err(FetchError::new(
                classify_git_error(stderr),
                format!("git {} failed: {}", args.first().unwrap_or(&""), stderr),
            ));
        }

        Ok(stdout.trim().to_string())
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Sort git's stderr into a failure class.
pub fn classify_git_error(stderr: &str) -> FetchErrorKind {
    let lower = stderr.to_lowercase();

    const AUTH: &[&str] = &[
        "permission denied",
        "authentication failed",
        "could not read username",
        "could not read password",
        "terminal prompts disabled",
        "host key verification failed",
    ];
    const NOT_FOUND: &[&str] = &[
        "not found",
        "does not exist",
        "did not match any",
        "unknown revision",
        "couldn't find remote ref",
        "does not appear to be a git repository",
    ];
    const NETWORK: &[&str] = &[
        "could not resolve host",
        "connection refused",
        "connection timed out",
        "timed out",
        "network is unreachable",
        "connection reset",
        "unable to access",
        "early eof",
    ];

    if AUTH.iter().any(|p| lower.contains(p)) {
        FetchErrorKind::Auth
    } else if NOT_FOUND.iter().any(|p| lower.contains(p)) {
        FetchErrorKind::NotFound
    } else if NETWORK.iter().any(|p| lower.contains(p)) {
        FetchErrorKind::Network
    } else {
        FetchErrorKind::Other
    }
}

/// The destination must end in a plain directory name, so replacing it only
/// touches that one entry of its parent.
fn is_plain_dest(dest: &Path) -> bool {
    let Some(name) = dest.file_name() else {
        return false;
    };
    // `file_name` skips a trailing `.`; compare with the path as written
    dest.to_string_lossy()
        .trim_end_matches(std::path::is_separator)
        .ends_with(&*name.to_string_lossy())
}

fn io_error(context: &str, path: &Path, e: std::io::Error) -> FetchError {
    FetchError::new(
        FetchErrorKind::Other,
        format!("{} {}: {}", context, path.display(), e),
    )
}

fn path_arg(path: &Path) -> Result<&str, FetchError> {
    path.to_str().ok_or_else(|| {
        FetchError::new(
            FetchErrorKind::Other,
            format!("path is not valid UTF-8: {}", path.display()),
        )
    })
}

impl Fetcher for GitFetcher {
    fn fetch(
        &self,
        source: &Source,
        version: &str,
        dest: &Path,
        cancel: &Cancellation,
    ) -> Result<String, FetchError> {
        let Source::Git(git) = source;

        if !is_plain_dest(dest) {
            return Err(FetchError::new(
                FetchErrorKind::Other,
                format!("refusing to install into {}", dest.display()),
            ));
        }
        if !is_clean_subdir(&git.subdir) {
            return Err(FetchError::new(
                FetchErrorKind::Other,
                format!("subdirectory '{}' escapes the repository", git.subdir),
            ));
        }
        if version.starts_with('-') {
            return Err(FetchError::new(
                FetchErrorKind::Other,
                format!("invalid version '{}'", version),
            ));
        }

        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| io_error("failed to create", &parent, e))?;

        // Staging lives beside the destination so the final move is a rename
        let staging = tempfile::Builder::new()
            .prefix(".jb-staging-")
            .tempdir_in(&parent)
            .map_err(|e| io_error("failed to create staging dir in", &parent, e))?;
        let checkout = staging.path().join("repo");
        let checkout_arg = path_arg(&checkout)?;

        tracing::debug!(remote = %git.remote, version, "cloning");
        self.run_git(
            &["clone", "--quiet", "--no-checkout", "--", &git.remote, checkout_arg],
            None,
            cancel,
        )?;
        self.run_git(
            &["checkout", "--quiet", "--force", version, "--"],
            Some(&checkout),
            cancel,
        )?;
        let revision = self.run_git(&["rev-parse", "HEAD"], Some(&checkout), cancel)?;

        let package_root = if git.subdir.is_empty() {
            let dot_git = checkout.join(".git");
            std::fs::remove_dir_all(&dot_git)
                .map_err(|e| io_error("failed to remove", &dot_git, e))?;
            checkout.clone()
        } else {
            checkout.join(&git.subdir)
        };

        if !package_root.is_dir() {
            return Err(FetchError::new(
                FetchErrorKind::NotFound,
                format!(
                    "subdirectory '{}' does not exist in {} at {}",
                    git.subdir, git.remote, version
                ),
            ));
        }

        // Symlinks inside the repository must not lead the move outside the checkout
        let inside = match (package_root.canonicalize(), checkout.canonicalize()) {
            (Ok(root), Ok(base)) => root.starts_with(base),
            _ => false,
        };
        if !inside {
            return Err(FetchError::new(
                FetchErrorKind::Other,
                format!(
                    "subdirectory '{}' resolves outside of {}",
                    git.subdir, git.remote
                ),
            ));
        }

        if cancel.is_cancelled() {
            return Err(FetchError::cancelled());
        }

        if dest.exists() {
            std::fs::remove_dir_all(dest).map_err(|e| io_error("failed to remove", dest, e))?;
        }
        std::fs::rename(&package_root, dest)
            .map_err(|e| io_error("failed to move package into", dest, e))?;

        tracing::debug!(remote = %git.remote, version, %revision, dest = %dest.display(), "fetched");
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth() {
        assert_eq!(
            classify_git_error("git@github.com: Permission denied (publickey).\nfatal: Could not read from remote repository."),
            FetchErrorKind::Auth
        );
        assert_eq!(
            classify_git_error("fatal: could not read Username for 'https://github.com': terminal prompts disabled"),
            FetchErrorKind::Auth
        );
    }

    #[test]
    fn test_classify_not_found() {
        assert_eq!(
            classify_git_error("error: pathspec 'v9.9.9' did not match any file(s) known to git"),
            FetchErrorKind::NotFound
        );
        assert_eq!(
            classify_git_error("fatal: repository 'https://github.com/foo/nope/' not found"),
            FetchErrorKind::NotFound
        );
    }

    #[test]
    fn test_classify_network() {
        assert_eq!(
            classify_git_error("fatal: unable to access 'https://github.com/foo/bar/': Could not resolve host: github.com"),
            FetchErrorKind::Network
        );
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(
            classify_git_error("fatal: index file corrupt"),
            FetchErrorKind::Other
        );
    }

    #[test]
    fn test_missing_binary_is_other() {
        let fetcher = GitFetcher::with_binary("jb-definitely-not-a-git-binary");
        let err = fetcher
            .run_git(&["--version"], None, &Cancellation::new())
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Other);
        assert!(err.message.contains("failed to execute"));
    }

    #[test]
    fn test_is_plain_dest() {
        assert!(is_plain_dest(Path::new("/work/vendor/grafonnet")));
        assert!(is_plain_dest(Path::new("vendor/grafonnet/")));
        assert!(!is_plain_dest(Path::new("/work/vendor/..")));
        assert!(!is_plain_dest(Path::new("/work/vendor/.")));
        assert!(!is_plain_dest(Path::new("/")));
    }

    #[test]
    fn test_unsafe_destination_is_left_alone() {
        let temp = tempfile::TempDir::new().unwrap();
        let project = temp.path().join("project");
        std::fs::create_dir_all(project.join("vendor")).unwrap();
        std::fs::write(project.join("precious.txt"), "keep").unwrap();

        // Fails before git runs, so no binary is needed
        let fetcher = GitFetcher::with_binary("jb-definitely-not-a-git-binary");
        let source = Source::git("https://github.com/foo/bar", "sub");
        let err = fetcher
            .fetch(&source, "master", &project.join("vendor/.."), &Cancellation::new())
            .unwrap_err();

        assert!(err.message.contains("refusing to install"));
        assert!(project.join("precious.txt").exists());
    }

    #[test]
    fn test_escaping_subdir_and_option_version_are_refused() {
        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("vendor/x");
        let fetcher = GitFetcher::with_binary("jb-definitely-not-a-git-binary");

        let escaping = Source::git("https://github.com/foo/bar", "../../x");
        let err = fetcher
            .fetch(&escaping, "master", &dest, &Cancellation::new())
            .unwrap_err();
        assert!(err.message.contains("escapes the repository"));

        let plain = Source::git("https://github.com/foo/bar", "");
        let err = fetcher
            .fetch(&plain, "--orphan=x", &dest, &Cancellation::new())
            .unwrap_err();
        assert!(err.message.contains("invalid version"));
        assert!(!temp.path().join("vendor").exists());
    }

    #[test]
    fn test_cancelled_token_skips_git() {
        let token = Cancellation::new();
        token.cancel();
        let err = GitFetcher::new()
            .run_git(&["--version"], None, &token)
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
