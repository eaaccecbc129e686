//! `jb update` command implementation
//!
//! Re-resolves every dependency to the current tip of its requested version,
//! ignoring the revisions pinned in jsonnetfile.lock.json.

use crate::cli::install::{fetch_and_lock, report};
use crate::cli::Settings;
use crate::error::Result;
use crate::packages::installer::ResolutionPolicy;
use crate::project::Project;
use clap::Args;

#[derive(Args, Default)]
#[command(after_help = "\
Examples:
  jb update                               Update all packages and rewrite the lockfile
  jb update --timeout 300                 Give up after five minutes")]
pub struct UpdateArgs {}

pub fn execute(_args: &UpdateArgs, project: &Project, settings: &Settings) -> Result<()> {
    let manifest = project.load_manifest()?;
    let lock = fetch_and_lock(project, &manifest, settings, ResolutionPolicy::ForceReresolve)?;
    report(&lock, settings);
    Ok(())
}
