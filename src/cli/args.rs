//! Defines the command-line arguments and subcommands for the shorthand CLI.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "shorthand",
    version,
    about = "Find and check {{shorthand|units}} in text files."
)]
pub struct ShorthandArgs {
    #[command(subcommand)]
    pub command: Command,

    /// YAML or JSON engine config (grammar and substitution options).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log more; repeat for debug and trace output.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every innermost unit with its name and arguments.
    Scan {
        /// A file, or a directory to walk.
        #[arg(required = true)]
        path: PathBuf,
        /// Only read files with these extensions when walking a directory.
        #[arg(long = "ext", value_delimiter = ',')]
        extensions: Vec<String>,
    },
    /// Report unbalanced delimiters and malformed argument lists.
    Check {
        /// A file, or a directory to walk.
        #[arg(required = true)]
        path: PathBuf,
        /// Only read files with these extensions when walking a directory.
        #[arg(long = "ext", value_delimiter = ',')]
        extensions: Vec<String>,
    },
}
