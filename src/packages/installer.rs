//! Install/update orchestration
//!
//! Fetches every manifest dependency into the vendor directory and assembles
//! a lock that mirrors the manifest order with concrete revisions. The run is
//! all-or-nothing: a failed or cancelled fetch returns an error and no lock
//! is produced.

use crate::error::{Error, Result};
use crate::manifest::file::{load_optional, lock_path_for, save};
use crate::manifest::{Dependency, Lock, Manifest};
use crate::packages::cancel::Cancellation;
use crate::packages::fetch::{FetchError, Fetcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Default number of concurrent fetches
pub const DEFAULT_JOBS: usize = 4;

/// How an existing lockfile influences version selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Keep revisions pinned by the lock, resolve only what it lacks (`jb install`)
    UseExistingLock,
    /// Ignore the lock and resolve every manifest version again (`jb update`)
    ForceReresolve,
}

/// One unit of fetch work, in manifest order
#[derive(Debug)]
struct PlannedFetch<'a> {
    dependency: &'a Dependency,
    version: String,
    dest: PathBuf,
    pinned: bool,
}

/// Drives a [`Fetcher`] over a manifest
pub struct Installer<'a, F: Fetcher> {
    fetcher: &'a F,
    jobs: usize,
}

impl<'a, F: Fetcher> Installer<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self {
            fetcher,
            jobs: DEFAULT_JOBS,
        }
    }

    /// Set the number of concurrent fetches (at least 1)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Resolve and fetch every dependency of `manifest` into `cache_dir`.
    ///
    /// The existing lock next to `manifest_path` is consulted only under
    /// [`ResolutionPolicy::UseExistingLock`]. Nothing is written to disk
    /// except the packages themselves; see [`Installer::install_and_persist`].
    pub fn install(
        &self,
        cancel: &Cancellation,
        policy: ResolutionPolicy,
        manifest_path: &Path,
        manifest: &Manifest,
        cache_dir: &Path,
    ) -> Result<Lock> {
        // Names become directories under cache_dir, so check them before touching disk
        manifest
            .validate()
            .map_err(|message| Error::manifest_load(manifest_path, message))?;

        std::fs::create_dir_all(cache_dir).map_err(|source| Error::CacheDir {
            path: cache_dir.to_path_buf(),
            source,
        })?;

        let existing = match policy {
            ResolutionPolicy::UseExistingLock => load_optional(&lock_path_for(manifest_path))?,
            ResolutionPolicy::ForceReresolve => None,
        };

        let plan = plan_fetches(manifest, existing.as_ref(), cache_dir);
        tracing::info!(
            dependencies = plan.len(),
            pinned = plan.iter().filter(|p| p.pinned).count(),
            ?policy,
            cache_dir = %cache_dir.display(),
            "resolving dependencies"
        );

        let results = self.fetch_all(cancel, &plan);

        // Caller cancellation wins over whatever the workers reported
        if cancel.is_cancelled() {
            let name = first_unfinished(&plan, &results);
            return Err(Error::Cancelled { name });
        }

        let mut revisions = Vec::with_capacity(plan.len());
        let mut cancelled_at = None;
        for (planned, result) in plan.iter().zip(results) {
            match result {
                Some(Ok(revision)) => revisions.push(revision),
                Some(Err(e)) if !e.is_cancelled() => {
                    return Err(Error::Resolution {
                        name: planned.dependency.name.clone(),
                        source: e,
                    })
                }
                _ => {
                    cancelled_at.get_or_insert_with(|| planned.dependency.name.clone());
                }
            }
        }
        if let Some(name) = cancelled_at {
            return Err(Error::Cancelled { name });
        }

        let lock = Lock::new(
            plan.iter()
                .zip(revisions)
                .map(|(planned, revision)| {
                    Dependency::new(
                        planned.dependency.name.clone(),
                        planned.dependency.source.clone(),
                        revision,
                    )
                })
                .collect(),
        );
        Ok(lock)
    }

    /// Run [`Installer::install`] and atomically write the lock next to the manifest.
    pub fn install_and_persist(
        &self,
        cancel: &Cancellation,
        policy: ResolutionPolicy,
        manifest_path: &Path,
        manifest: &Manifest,
        cache_dir: &Path,
    ) -> Result<Lock> {
        let lock = self.install(cancel, policy, manifest_path, manifest, cache_dir)?;
        let lock_path = lock_path_for(manifest_path);
        save(&lock_path, &lock)?;
        tracing::info!(path = %lock_path.display(), entries = lock.len(), "lock written");
        Ok(lock)
    }

    /// Fetch all planned dependencies on a bounded set of scoped threads.
    ///
    /// Results are indexed by plan position. A slot stays `None` if its fetch
    /// never started because the run was already cancelled.
    fn fetch_all(
        &self,
        cancel: &Cancellation,
        plan: &[PlannedFetch<'_>],
    ) -> Vec<Option<std::result::Result<String, FetchError>>> {
        let abort = cancel.child();
        let next = AtomicUsize::new(0);
        let results = Mutex::new((0..plan.len()).map(|_| None).collect::<Vec<_>>());
        let workers = self.jobs.min(plan.len());

        std::thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(planned) = plan.get(index) else {
                        break;
                    };
                    if abort.is_cancelled() {
                        break;
                    }

                    let dep = planned.dependency;
                    tracing::debug!(
                        name = %dep.name,
                        remote = %dep.source.remote(),
                        version = %planned.version,
                        pinned = planned.pinned,
                        "fetching"
                    );
                    let result =
                        self.fetcher
                            .fetch(&dep.source, &planned.version, &planned.dest, &abort);

                    match &result {
                        Ok(revision) => {
                            tracing::info!(name = %dep.name, %revision, "installed")
                        }
                        Err(e) if e.is_cancelled() => {
                            tracing::debug!(name = %dep.name, "fetch cancelled")
                        }
                        Err(e) => {
                            tracing::warn!(name = %dep.name, error = %e, "fetch failed");
                            abort.cancel();
                        }
                    }

                    if let Ok(mut slots) = results.lock() {
                        slots[index] = Some(result);
                    }
                });
            }
        });

        results.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

/// Pick the version to fetch for each dependency.
///
/// A lock entry pins a dependency only if it has the same name and source;
/// a changed source means the manifest entry is effectively new.
fn plan_fetches<'a>(
    manifest: &'a Manifest,
    existing: Option<&Lock>,
    cache_dir: &Path,
) -> Vec<PlannedFetch<'a>> {
    manifest
        .dependencies
        .iter()
        .map(|dep| {
            let locked = existing
                .and_then(|lock| lock.get(&dep.name))
                .filter(|locked| locked.source == dep.source);
            PlannedFetch {
                dependency: dep,
                version: locked
                    .map(|l| l.version.clone())
                    .unwrap_or_else(|| dep.version.clone()),
                dest: cache_dir.join(&dep.name),
                pinned: locked.is_some(),
            }
        })
        .collect()
}

fn first_unfinished(
    plan: &[PlannedFetch<'_>],
    results: &[Option<std::result::Result<String, FetchError>>],
) -> String {
    plan.iter()
        .zip(results)
        .find(|(_, r)| !matches!(r, Some(Ok(_))))
        .or_else(|| plan.iter().zip(results).last())
        .map(|(p, _)| p.dependency.name.clone())
        .unwrap_or_default()
}

/// Install with the crate's configured defaults, writing the lock.
///
/// Convenience wrapper used by the CLI commands.
pub fn run_install<F: Fetcher>(
    fetcher: &F,
    jobs: usize,
    cancel: &Cancellation,
    policy: ResolutionPolicy,
    manifest_path: &Path,
    manifest: &Manifest,
    cache_dir: &Path,
) -> Result<Lock> {
    Installer::new(fetcher)
        .with_jobs(jobs)
        .install_and_persist(cancel, policy, manifest_path, manifest, cache_dir)
}
