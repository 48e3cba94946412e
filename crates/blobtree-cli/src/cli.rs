use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blobtree",
    about = "blobtree: run storage scripts against a fresh in-memory tree",
    version,
)]
pub struct Cli {
    /// Script to run, one command per line. Reads stdin when omitted.
    pub script: Option<PathBuf>,

    /// Driver configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Keep running after a command fails
    #[arg(long)]
    pub keep_going: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// One line of a script.
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
pub struct ScriptLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace a file's content
    Put(PutArgs),
    /// Print a file's content
    Get(PathArgs),
    /// Print a file's content from an offset
    Read(ReadArgs),
    /// Stage text through a write session, then commit or cancel
    Write(WriteArgs),
    /// Show metadata for a path
    Stat(PathArgs),
    /// List the direct children of a directory
    Ls(PathArgs),
    /// Show a directory and everything below it
    Tree(TreeArgs),
    /// Move a file or directory
    Mv(MoveArgs),
    /// Delete a file or directory
    Rm(PathArgs),
}

#[derive(Args, Debug)]
pub struct PathArgs {
    pub path: String,
}

#[derive(Args, Debug)]
pub struct PutArgs {
    pub path: String,
    /// Text to store, spacing kept as written
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub text: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    pub path: String,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub offset: i64,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    pub path: String,
    /// Keep existing content instead of truncating it
    #[arg(long)]
    pub append: bool,
    /// Cancel the session instead of committing it
    #[arg(long)]
    pub cancel: bool,
    /// Text to stage, spacing kept as written
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub text: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TreeArgs {
    #[arg(default_value = "/")]
    pub path: String,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    pub src: String,
    pub dst: String,
}
