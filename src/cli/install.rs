//! `jb install` command implementation
//!
//! Fetches every dependency in jsonnetfile.json into the vendor directory and
//! writes jsonnetfile.lock.json. Revisions already pinned in the lockfile are
//! reused. Package URLs given on the command line are added to the manifest,
//! which is only rewritten after the install succeeds.

use crate::cli::Settings;
use crate::error::{Error, Result};
use crate::manifest::{Lock, Manifest};
use crate::packages::cancel::{cancel_after, Cancellation};
use crate::packages::git::GitFetcher;
use crate::packages::installer::{run_install, ResolutionPolicy};
use crate::packages::resolver::parse_dependency;
use crate::project::Project;
use crate::utils::output::{print_info, print_package, print_success};
use clap::Args;

#[derive(Args, Default)]
#[command(after_help = "\
Examples:
  jb install                                          Install from jsonnetfile.json
  jb install github.com/grafana/jsonnet-libs/grafana-builder
                                                      Add and install a package
  jb install git+ssh://git@github.com:org/repo.git@v1.2
                                                      Add a package over SSH")]
pub struct InstallArgs {
    /// Packages to add, e.g. github.com/user/repo/subdir@version
    #[arg(value_name = "URI")]
    pub packages: Vec<String>,
}

pub fn execute(args: &InstallArgs, project: &Project, settings: &Settings) -> Result<()> {
    let mut manifest = project.load_manifest()?;

    // Parse everything before touching the network so a typo fetches nothing
    for raw in &args.packages {
        let dependency = parse_dependency(raw)?;
        tracing::info!(name = %dependency.name, version = %dependency.version, "adding dependency");
        manifest.upsert(dependency);
    }
    manifest
        .validate()
        .map_err(|message| Error::manifest_load(project.manifest_path(), message))?;

    let lock = fetch_and_lock(project, &manifest, settings, ResolutionPolicy::UseExistingLock)?;

    if !args.packages.is_empty() {
        project.save_manifest(&manifest)?;
    }

    report(&lock, settings);
    Ok(())
}

/// Run the installer with the configured fetcher, job count and timeout.
pub(crate) fn fetch_and_lock(
    project: &Project,
    manifest: &Manifest,
    settings: &Settings,
    policy: ResolutionPolicy,
) -> Result<Lock> {
    let fetcher = GitFetcher::with_binary(settings.git.clone());
    let cancel = Cancellation::new();
    let _watchdog = settings
        .timeout
        .map(|timeout| cancel_after(cancel.clone(), timeout));

    let vendor = project.vendor_dir(&settings.home);
    print_info(&format!(
        "Fetching {} package(s) into {}",
        manifest.len(),
        vendor.display()
    ));

    run_install(
        &fetcher,
        settings.jobs,
        &cancel,
        policy,
        &project.manifest_path(),
        manifest,
        &vendor,
    )
}

pub(crate) fn report(lock: &Lock, settings: &Settings) {
    for dependency in &lock.dependencies {
        print_package(&dependency.name, &dependency.version);
    }
    print_success(&format!(
        "{} package(s) installed into {}",
        lock.len(),
        settings.home.display()
    ));
}
