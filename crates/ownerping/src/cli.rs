use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ownerping – tell the code owner their daily build failed
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Activate verbose output (-v, -vv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Notify the code owner through the chat webhook
    Notify {
        /// Resolve and print the message without posting it
        #[arg(long)]
        dry_run: bool,
    },
    /// Encrypt a plaintext user table with ENV_USER_ENCRYPTION_KEY
    Encrypt {
        /// Plaintext CSV with gh-username and wso2-id columns
        #[arg(short, long, value_name = "CSV")]
        input: PathBuf,

        /// Destination (defaults to the configured encrypted table)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print a freshly generated encryption key
    Keygen,
    /// Print build information
    Version {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
