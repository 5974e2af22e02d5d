use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the LSM programs and pin them with their maps
    Load {
        /// Compiled eBPF object to load instead of the built-in one
        #[arg(long)]
        object: Option<PathBuf>,
    },
    /// Detach the LSM programs and destroy every pinned map
    Reset,
    /// Create (or reuse) an agent identity and install its manifest
    #[command(name = "addagent")]
    AddAgent {
        /// Path to the agent manifest (YAML)
        manifest: PathBuf,
        /// Compile and print the entries without creating the user or writing the tables
        #[arg(long)]
        dry_run: bool,
    },
    /// Run a command under an agent identity
    Run {
        /// Agent name, without the account prefix
        agentname: String,
        /// Command and its arguments
        #[arg(
            required = true,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            num_args = 1..
        )]
        command: Vec<String>,
    },
    /// Print the installed policy entries
    Dump(DumpArgs),
    /// Print the device and inode identity of a path
    Stat {
        path: PathBuf,
    },
    /// Evaluate a file access for an agent against the live tables
    Check(CheckArgs),
    /// Evaluate an IPv4 connect for an agent against the live tables
    #[command(name = "check-connect")]
    CheckConnect {
        agentname: String,
        /// Destination as ip:port
        target: String,
    },
    /// Stream traced decisions from the kernel
    Trace {
        /// Stop after this many events
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

#[derive(Parser, Debug)]
pub struct DumpArgs {
    /// Also print the socket table
    #[arg(long)]
    pub sockets: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    pub agentname: String,
    pub path: PathBuf,
    #[arg(long)]
    pub read: bool,
    #[arg(long)]
    pub write: bool,
    #[arg(long)]
    pub exec: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
