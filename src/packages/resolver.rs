//! Package source string resolution
//!
//! Turns user-supplied location strings into dependencies. Two families are
//! recognized, tried in order:
//!
//! - SSH git remotes: `git+ssh://git@<host>:<org>/<repo>.git[/<subdir>][@<version>]`
//! - GitHub slugs: `github.com/<user>/<repo>[/<subdir>][@<version>]`
//!
//! A family is selected by its most general pattern; inside the family the
//! shape variants are tried from most to least specific, because the less
//! specific patterns also match the longer forms.

use crate::error::{Error, Result};
use crate::manifest::{is_clean_subdir, Dependency, Source, DEFAULT_VERSION};
use regex::{Captures, Regex};

#[derive(Debug, Clone, Copy)]
enum FamilyKind {
    GitSsh,
    GitHub,
}

/// One shape within a family, with the capture groups holding subdir/version
struct Variant {
    pattern: Regex,
    subdir_group: Option<usize>,
    version_group: Option<usize>,
}

struct Family {
    kind: FamilyKind,
    /// Most general pattern; a match commits the string to this family
    gate: Regex,
    /// Most specific first. The last variant is the bare form and matches
    /// whatever the gate matches.
    variants: Vec<Variant>,
}

const GIT_SSH_PREFIX: &str = r"git\+ssh://git@([^:]+):([^/]+)/([^/]+)\.git";
const GITHUB_PREFIX: &str = r"github\.com/([-_a-zA-Z0-9]+)/([-_a-zA-Z0-9]+)";

fn pattern(prefix: &str, suffix: &str) -> Regex {
    Regex::new(&format!("{}{}", prefix, suffix)).unwrap()
}

fn variant(prefix: &str, suffix: &str, subdir: Option<usize>, version: Option<usize>) -> Variant {
    Variant {
        pattern: pattern(prefix, suffix),
        subdir_group: subdir,
        version_group: version,
    }
}

lazy_static::lazy_static! {
    static ref FAMILIES: Vec<Family> = vec![
        Family {
            kind: FamilyKind::GitSsh,
            gate: pattern(GIT_SSH_PREFIX, ""),
            variants: vec![
                variant(GIT_SSH_PREFIX, "/(.*)@(.*)", Some(4), Some(5)),
                variant(GIT_SSH_PREFIX, "/(.*)", Some(4), None),
                variant(GIT_SSH_PREFIX, "@(.*)", None, Some(4)),
                variant(GIT_SSH_PREFIX, "", None, None),
            ],
        },
        Family {
            kind: FamilyKind::GitHub,
            gate: pattern(GITHUB_PREFIX, ""),
            variants: vec![
                variant(GITHUB_PREFIX, "/(.*)@(.*)", Some(3), Some(4)),
                variant(GITHUB_PREFIX, "/(.*)", Some(3), None),
                variant(GITHUB_PREFIX, "@(.*)", None, Some(3)),
                variant(GITHUB_PREFIX, "", None, None),
            ],
        },
    ];
}

/// Resolve a source string into a dependency.
///
/// Returns `None` when the string belongs to neither family, or when its
/// subdir has empty, `.` or `..` segments or its version starts with `-`.
///
/// # Examples
///
/// ```
/// use jsonnet_bundler::packages::resolver::resolve;
///
/// let dep = resolve("github.com/foo/bar/sub/dir@v1.0").unwrap();
/// assert_eq!(dep.name, "dir");
/// assert_eq!(dep.source.remote(), "https://github.com/foo/bar");
/// assert_eq!(dep.source.subdir(), "sub/dir");
/// assert_eq!(dep.version, "v1.0");
///
/// assert!(resolve("not-a-url").is_none());
/// ```
pub fn resolve(raw: &str) -> Option<Dependency> {
    let family = FAMILIES.iter().find(|f| f.gate.is_match(raw))?;

    let (variant, caps) = family
        .variants
        .iter()
        .find_map(|v| v.pattern.captures(raw).map(|caps| (v, caps)))?;

    let subdir = variant
        .subdir_group
        .and_then(|i| caps.get(i))
        .map(|m| clean_subdir(m.as_str()))
        .unwrap_or_default();
    // The subdir must stay inside the repository and name a real directory
    if !is_clean_subdir(&subdir) {
        return None;
    }

    let version = variant
        .version_group
        .and_then(|i| caps.get(i))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_VERSION);
    if version.starts_with('-') {
        return None;
    }

    Some(family.kind.build(&caps, subdir, version))
}

/// Resolve a source string, turning an unrecognized one into an error.
pub fn parse_dependency(raw: &str) -> Result<Dependency> {
    resolve(raw).ok_or_else(|| Error::UnrecognizedSource(raw.to_string()))
}

impl FamilyKind {
    fn build(self, caps: &Captures<'_>, subdir: String, version: &str) -> Dependency {
        match self {
            FamilyKind::GitSsh => {
                let (host, org, repo) = (&caps[1], &caps[2], &caps[3]);
                Dependency::new(
                    repo,
                    Source::git(format!("git@{}:{}/{}", host, org, repo), subdir),
                    version,
                )
            }
            FamilyKind::GitHub => {
                let (user, repo) = (&caps[1], &caps[2]);
                // Sub-packages of a monorepo are named after their directory
                let name = match subdir.rsplit('/').next() {
                    Some(base) if !base.is_empty() => base.to_string(),
                    _ => repo.to_string(),
                };
                Dependency::new(
                    name,
                    Source::git(format!("https://github.com/{}/{}", user, repo), subdir),
                    version,
                )
            }
        }
    }
}

fn clean_subdir(raw: &str) -> String {
    raw.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::JsonnetFile;

    fn assert_resolves(raw: &str, name: &str, remote: &str, subdir: &str, version: &str) {
        let dep = resolve(raw).unwrap_or_else(|| panic!("{} should resolve", raw));
        assert_eq!(dep.name, name, "name for {}", raw);
        assert_eq!(dep.source.remote(), remote, "remote for {}", raw);
        assert_eq!(dep.source.subdir(), subdir, "subdir for {}", raw);
        assert_eq!(dep.version, version, "version for {}", raw);
    }

    #[test]
    fn test_git_ssh_subdir_and_version() {
        assert_resolves(
            "git+ssh://git@example.com:org/repo.git/lib@v2",
            "repo",
            "git@example.com:org/repo",
            "lib",
            "v2",
        );
    }

    #[test]
    fn test_git_ssh_subdir_only() {
        assert_resolves(
            "git+ssh://git@github.com:ksonnet/ksonnet-lib.git/ksonnet.beta.3",
            "ksonnet-lib",
            "git@github.com:ksonnet/ksonnet-lib",
            "ksonnet.beta.3",
            "master",
        );
    }

    #[test]
    fn test_git_ssh_version_only() {
        assert_resolves(
            "git+ssh://git@gitlab.internal:infra/mixins.git@release-1.2",
            "mixins",
            "git@gitlab.internal:infra/mixins",
            "",
            "release-1.2",
        );
    }

    #[test]
    fn test_git_ssh_bare() {
        assert_resolves(
            "git+ssh://git@github.com:grafana/grafonnet-lib.git",
            "grafonnet-lib",
            "git@github.com:grafana/grafonnet-lib",
            "",
            "master",
        );
    }

    #[test]
    fn test_git_ssh_nested_subdir_keeps_repo_name() {
        assert_resolves(
            "git+ssh://git@example.com:org/repo.git/a/b/c@v3",
            "repo",
            "git@example.com:org/repo",
            "a/b/c",
            "v3",
        );
    }

    #[test]
    fn test_github_subdir_and_version() {
        assert_resolves(
            "github.com/foo/bar/sub/dir@v1.0",
            "dir",
            "https://github.com/foo/bar",
            "sub/dir",
            "v1.0",
        );
    }

    #[test]
    fn test_github_subdir_only() {
        assert_resolves(
            "github.com/grafana/grafonnet-lib/grafonnet",
            "grafonnet",
            "https://github.com/grafana/grafonnet-lib",
            "grafonnet",
            "master",
        );
    }

    #[test]
    fn test_github_version_only() {
        assert_resolves(
            "github.com/foo/bar@v0.3.1",
            "bar",
            "https://github.com/foo/bar",
            "",
            "v0.3.1",
        );
    }

    #[test]
    fn test_github_bare() {
        assert_resolves(
            "github.com/foo/bar",
            "bar",
            "https://github.com/foo/bar",
            "",
            "master",
        );
    }

    #[test]
    fn test_github_with_scheme_prefix() {
        assert_resolves(
            "https://github.com/kubernetes-monitoring/kubernetes-mixin@main",
            "kubernetes-mixin",
            "https://github.com/kubernetes-monitoring/kubernetes-mixin",
            "",
            "main",
        );
    }

    #[test]
    fn test_github_trailing_slash_subdir_is_cleaned() {
        assert_resolves(
            "github.com/foo/bar/sub/dir/",
            "dir",
            "https://github.com/foo/bar",
            "sub/dir",
            "master",
        );
    }

    #[test]
    fn test_github_empty_subdir_falls_back_to_repo_name() {
        assert_resolves(
            "github.com/foo/bar/",
            "bar",
            "https://github.com/foo/bar",
            "",
            "master",
        );
    }

    #[test]
    fn test_empty_version_defaults_to_master() {
        assert_resolves(
            "github.com/foo/bar@",
            "bar",
            "https://github.com/foo/bar",
            "",
            "master",
        );
    }

    #[test]
    fn test_version_after_subdir_uses_last_at() {
        // The subdir pattern is greedy, so the last '@' separates the version
        assert_resolves(
            "github.com/foo/bar/pkg@name@v2",
            "pkg@name",
            "https://github.com/foo/bar",
            "pkg@name",
            "v2",
        );
    }

    #[test]
    fn test_ssh_family_wins_over_github_family() {
        // An SSH remote on github.com must not be treated as a web slug
        let dep = resolve("git+ssh://git@github.com:foo/bar.git/sub@v1").unwrap();
        assert_eq!(dep.source.remote(), "git@github.com:foo/bar");
        assert_eq!(dep.name, "bar");
    }

    #[test]
    fn test_unrecognized() {
        for raw in [
            "not-a-url",
            "",
            "gitlab.com/foo/bar",
            "git+ssh://git@example.com/org/repo.git",
            "github.com/foo",
            "https://example.com/foo/bar.git",
        ] {
            assert!(resolve(raw).is_none(), "{:?} should be unrecognized", raw);
        }
    }

    #[test]
    fn test_dot_segments_in_subdir_are_rejected() {
        for raw in [
            "github.com/foo/bar/sub/..",
            "github.com/foo/bar/..",
            "github.com/foo/bar/./lib@v1",
            "github.com/foo/bar/a//b",
            "git+ssh://git@h:o/r.git/../../x",
            "git+ssh://git@h:o/r.git/lib/..@v1",
        ] {
            assert!(resolve(raw).is_none(), "{:?} should be rejected", raw);
            assert!(matches!(
                parse_dependency(raw),
                Err(Error::UnrecognizedSource(_))
            ));
        }
    }

    #[test]
    fn test_option_like_version_is_rejected() {
        assert!(resolve("github.com/foo/bar@--orphan").is_none());
        assert!(resolve("git+ssh://git@h:o/r.git/lib@-b").is_none());
    }

    #[test]
    fn test_resolved_dependencies_pass_validation() {
        for raw in [
            "github.com/foo/bar/sub/dir@v1.0",
            "github.com/foo/bar/",
            "git+ssh://git@example.com:org/repo.git/lib@v2",
        ] {
            let file = JsonnetFile::new(vec![resolve(raw).unwrap()]);
            assert_eq!(file.validate(), Ok(()), "{}", raw);
        }
    }

    #[test]
    fn test_parse_dependency_error() {
        match parse_dependency("not-a-url") {
            Err(Error::UnrecognizedSource(raw)) => assert_eq!(raw, "not-a-url"),
            other => panic!("Expected UnrecognizedSource, got {:?}", other),
        }
    }

    #[test]
    fn test_tables_shared_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    resolve(&format!("github.com/user{}/repo{}@v{}", i, i, i)).unwrap()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let dep = handle.join().unwrap();
            assert_eq!(dep.name, format!("repo{}", i));
            assert_eq!(dep.version, format!("v{}", i));
        }
    }
}
