use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, Subcommand};
use jsonnet_bundler::cli::{self, GlobalArgs};
use jsonnet_bundler::error::codes::exit_code_for;
use jsonnet_bundler::error::Result;
use jsonnet_bundler::project::Project;
use jsonnet_bundler::utils::logging::init_logging;
use jsonnet_bundler::utils::output::print_error;
use std::process;

#[derive(Parser)]
#[command(name = "jb")]
#[command(version)]
#[command(about = "A jsonnet package manager")]
#[command(
    long_about = "jb vendors jsonnet libraries from git repositories and pins the exact \
revisions it fetched in jsonnetfile.lock.json."
)]
#[command(after_help = "\
Getting started:
  jb init                                     Create jsonnetfile.json
  jb install github.com/user/repo/lib@v1.0    Add and install a package
  jb install                                  Install everything (same as plain 'jb')
  jb update                                   Re-resolve all packages")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new empty jsonnetfile
    #[command(display_order = 1)]
    Init(cli::init::InitArgs),
    /// Install all dependencies, optionally adding new ones
    #[command(display_order = 2)]
    Install(cli::install::InstallArgs),
    /// Update all dependencies and rewrite the lockfile
    #[command(display_order = 3)]
    Update(cli::update::UpdateArgs),
}

/// Handle clap parse errors with suggestions for common mistakes
fn handle_parse_error(mut err: clap::Error) -> ! {
    if err.kind() == ErrorKind::InvalidSubcommand {
        if let Some(ContextValue::String(cmd)) = err.get(ContextKind::InvalidSubcommand) {
            let suggestions = match cmd.as_str() {
                "add" | "get" | "fetch" => Some(vec![
                    "use 'jb install <uri>' to add a package: jb install github.com/user/repo"
                        .into(),
                ]),
                "upgrade" => Some(vec!["use 'jb update' to re-resolve packages".into()]),
                _ => None,
            };
            if let Some(suggestions) = suggestions {
                err.insert(
                    ContextKind::Suggested,
                    ContextValue::StyledStrs(suggestions),
                );
            }
        }
    }
    err.exit()
}

fn run(cli: &Cli) -> Result<()> {
    let settings = cli.global.resolve()?;
    tracing::debug!(?settings, "effective settings");
    let project = Project::current()?;

    match &cli.command {
        Some(Commands::Init(args)) => cli::init::execute(args, &project),
        Some(Commands::Install(args)) => cli::install::execute(args, &project, &settings),
        Some(Commands::Update(args)) => cli::update::execute(args, &project, &settings),
        None => cli::install::execute(&Default::default(), &project, &settings),
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => handle_parse_error(e),
    };

    init_logging(cli.global.verbose);

    if let Err(e) = run(&cli) {
        print_error(&e.to_string());
        process::exit(exit_code_for(&e));
    }
}
