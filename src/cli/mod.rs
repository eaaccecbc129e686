pub mod init;
pub mod install;
pub mod update;

use crate::error::Result;
use crate::packages::installer::DEFAULT_JOBS;
use crate::project::user_config::{load_user_config, UserConfig};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Vendor directory used when neither a flag nor the user config sets one
pub const DEFAULT_HOME: &str = "vendor";

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// The directory used to cache packages in [default: vendor]
    #[arg(long = "jsonnetpkg-home", value_name = "DIR", global = true)]
    pub home: Option<PathBuf>,

    /// Number of packages to fetch concurrently
    #[arg(short, long, value_name = "N", global = true, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Abort the install if it runs longer than this many seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Effective settings after merging flags, user config and defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub home: PathBuf,
    pub jobs: usize,
    pub timeout: Option<Duration>,
    pub git: String,
}

impl GlobalArgs {
    /// Merge flags over the user configuration file.
    pub fn resolve(&self) -> Result<Settings> {
        let user = load_user_config()?.unwrap_or_default();
        Ok(self.merge(&user))
    }

    /// Flags win over user config, user config over built-in defaults.
    pub fn merge(&self, user: &UserConfig) -> Settings {
        Settings {
            home: self
                .home
                .clone()
                .or_else(|| user.home.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME)),
            jobs: self
                .jobs
                .map(usize::from)
                .or(user.jobs)
                .unwrap_or(DEFAULT_JOBS),
            timeout: self
                .timeout
                .or(user.timeout_secs)
                .map(Duration::from_secs),
            git: user.git.clone().unwrap_or_else(|| "git".to_string()),
        }
    }
}
