// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Global connection flags plus the get, put, sh and version subcommands.

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use sshctl::config::Mode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sshctl")]
#[command(about = "Copy files to, from, or run scripts on many hosts over SSH")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print per-host reports as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every remote operation.
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Login user [default: root]
    #[arg(short, long, global = true)]
    pub username: Option<String>,

    /// Login password
    #[arg(short, long, global = true)]
    pub password: Option<String>,

    /// Remote hosts, as host or host:port (comma separated or repeated)
    #[arg(short, long = "remote", global = true, value_delimiter = ',')]
    pub remote: Vec<String>,

    /// SSH port [default: 22]
    #[arg(long, global = true)]
    pub port: Option<u32>,

    /// Connect and shell timeout in seconds, 0 for none [default: 0]
    #[arg(short, long, global = true)]
    pub timeout: Option<u64>,

    /// YAML inventory with hosts and credentials
    #[arg(short, long, global = true)]
    pub inventory: Option<PathBuf>,

    /// Dispatch mode [default: parallel for get/put, sequential for sh]
    #[arg(long, global = true, value_enum)]
    pub mode: Option<ModeArg>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Parallel,
    Sequential,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Parallel => Mode::Parallel,
            ModeArg::Sequential => Mode::Sequential,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a file from every host
    #[command(visible_aliases = ["download", "down"])]
    Get {
        /// Remote file path
        remote: String,
        /// Local destination; "{host}" is replaced by each host's name
        local: PathBuf,
    },

    /// Upload a file to every host
    #[command(visible_aliases = ["upload", "up"])]
    Put {
        /// Local file path
        local: PathBuf,
        /// Remote destination
        remote: String,
    },

    /// Run a shell command or script on every host
    #[command(visible_aliases = ["exec", "shell", "bash"])]
    #[command(group(ArgGroup::new("input").required(true).args(["command", "file"])))]
    Sh {
        /// Command line to run
        #[arg(short, long)]
        command: Option<String>,
        /// Script file to run, "-" for standard input
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print version information
    #[command(visible_aliases = ["v", "ver"])]
    Version,
}
