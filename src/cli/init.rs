//! `jb init` command implementation
//!
//! Creates an empty jsonnetfile.json in the current directory. No packages are
//! fetched and no lockfile is written.

use crate::error::Result;
use crate::project::Project;
use crate::utils::output::print_success;
use clap::Args;

#[derive(Args)]
#[command(after_help = "\
Examples:
  jb init                                 Create jsonnetfile.json
  jb init --force                         Replace an existing jsonnetfile.json")]
pub struct InitArgs {
    /// Overwrite an existing jsonnetfile.json
    #[arg(long)]
    pub force: bool,
}

pub fn execute(args: &InitArgs, project: &Project) -> Result<()> {
    let path = project.init(args.force)?;
    tracing::info!(path = %path.display(), force = args.force, "initialized");
    print_success(&format!("Initialized {}", path.display()));
    Ok(())
}
