use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vos",
    about = "Versioned object store: staging server and uploader",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the VOS server
    Serve(ServeArgs),
    /// Print the default server configuration as TOML
    Config,
    /// Upload a file to a branch through the staging protocol
    Upload(UploadArgs),
    /// Show the object staged at a path
    Stat(StatArgs),
    /// Commit a branch, sealing everything staged on it
    Commit(CommitArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Server configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<String>,
}

/// Server connection options shared by the client commands.
#[derive(Args)]
pub struct RemoteArgs {
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    pub server: String,
    /// Bearer token sent with every request
    #[arg(long, env = "VOS_TOKEN")]
    pub token: Option<String>,
    #[arg(long)]
    pub repository: String,
    #[arg(long, default_value = "main")]
    pub branch: String,
}

#[derive(Args)]
pub struct UploadArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,
    /// Logical path on the branch
    #[arg(long)]
    pub path: String,
    #[arg(long)]
    pub content_type: Option<String>,
    /// Give up after this many conflicting rounds
    #[arg(long, default_value = "5")]
    pub max_attempts: u32,
    /// File to upload
    pub file: PathBuf,
}

#[derive(Args)]
pub struct StatArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,
    #[arg(long)]
    pub path: String,
}

#[derive(Args)]
pub struct CommitArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,
}
