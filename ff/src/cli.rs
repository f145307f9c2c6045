//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// FlowForge - batch orchestrator for LLM-assisted code transformation
#[derive(Parser)]
#[command(
    name = "ff",
    about = "Orchestrates batches of LLM-backed code transformation workflows",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP control API
    Serve {
        /// Listen port (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Execute one persisted task end-to-end
    Run {
        /// Task (stream group) id from the multi-stream document
        task_id: String,
    },

    /// Execute every idle executable task under the concurrency cap
    RunAll,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_command() {
        let cli = Cli::parse_from(["ff"]);
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_serve_with_port() {
        let cli = Cli::parse_from(["ff", "serve", "--port", "8080"]);
        assert!(matches!(cli.command, Some(Command::Serve { port: Some(8080) })));
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from(["ff", "run", "abc123-task-login"]);
        match cli.command {
            Some(Command::Run { task_id }) => assert_eq!(task_id, "abc123-task-login"),
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_run_all() {
        let cli = Cli::parse_from(["ff", "run-all"]);
        assert!(matches!(cli.command, Some(Command::RunAll)));
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["ff", "-c", "/etc/flowforge.yml", "serve"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/flowforge.yml")));
    }
}
