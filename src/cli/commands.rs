use crate::workspace::DEFAULT_WORKDIR_BASE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Builds and deploys docker-compose stacks from a repository commit hash
#[derive(Parser, Debug)]
#[command(
    name = "shippy",
    about = "Builds and deploys docker-compose stacks from a repository commit hash",
    version,
    long_about = "shippy fetches the source snapshot for a commit, packages it into a \
                  labeled data-volume image, generates a docker-compose manifest, and \
                  brings the stack up under a project name derived from the application \
                  and commit."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Increase verbosity (debug-level logging)"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        default_value = DEFAULT_WORKDIR_BASE,
        help = "Base directory for per-deploy workspaces"
    )]
    pub workdir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Build and deploy the stack for a commit",
        long_about = "Downloads the commit archive, builds the data-volume image, \
                      generates the compose manifest, and starts the stack.\n\n\
                      Examples:\n  \
                      shippy deploy buildconfig.json abc123\n  \
                      shippy deploy --workdir /var/lib/shippy buildconfig.json abc123"
    )]
    Deploy(StackArgs),

    #[command(about = "Stop the running stack for a commit without removing it")]
    Stop(StackArgs),

    #[command(about = "Tear down the stack for a commit and remove its images")]
    Terminate(StackArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct StackArgs {
    #[arg(value_name = "CONFIGPATH", help = "Path to the build config file")]
    pub configpath: PathBuf,

    #[arg(value_name = "SHA", help = "Commit hash to build source from")]
    pub sha: String,
}
