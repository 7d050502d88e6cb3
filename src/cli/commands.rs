//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

use crate::models::HardwareProfile;

#[derive(Parser)]
#[command(name = "vedarag")]
#[command(about = "Ask questions over a collection of spiritual texts")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: config.toml, then config.example.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer a single question
    Ask {
        /// The question to answer
        question: String,
        /// Number of sources to retrieve (1-15, default: decided by question complexity)
        #[arg(short, long)]
        sources: Option<usize>,
        /// Hardware profile selecting the model chain (default: from config)
        #[arg(short, long, value_enum)]
        profile: Option<ProfileArg>,
        /// Show retrieval details and sources grouped by category
        #[arg(long)]
        show_context: bool,
    },
    /// Ask questions interactively
    Interactive {
        /// Hardware profile selecting the model chain (default: from config)
        #[arg(short, long, value_enum)]
        profile: Option<ProfileArg>,
    },
    /// Check vector store and generation service health
    Check {
        /// Hardware profile whose chain is checked (default: from config)
        #[arg(short, long, value_enum)]
        profile: Option<ProfileArg>,
    },
    /// Show stored passage counts per category
    Stats,
    /// Show the model candidate chain
    Chain {
        /// Hardware profile (default: from config)
        #[arg(short, long, value_enum)]
        profile: Option<ProfileArg>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileArg {
    Gpu,
    Cpu,
}

impl From<ProfileArg> for HardwareProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Gpu => Self::Gpu,
            ProfileArg::Cpu => Self::Cpu,
        }
    }
}
