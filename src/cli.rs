use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "fieldtrack", version, about = "Field visit location tracking")]
pub struct Cli {
    /// Directory holding settings.json and the durable store.
    #[arg(long, global = true, env = "FIELDTRACK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the bearer token used for every API call.
    Token { value: String },
    /// List the visit tasks assigned to this agent.
    Tasks,
    /// Start a visit and keep tracking until interrupted.
    Start { task_id: String },
    /// Continue tracking the visit left active by an earlier run.
    Resume,
    /// Save the stop location for the active visit.
    Stop,
    /// Mark a task complete and stop tracking.
    Complete { task_id: String },
    /// Show lifecycle, pointer and sampler status.
    Status,
}

impl Cli {
    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldtrack")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        let cli = Cli::try_parse_from(["fieldtrack", "--data-dir", "/tmp/ft", "start", "T1"]).unwrap();
        assert_eq!(cli.resolve_data_dir(), PathBuf::from("/tmp/ft"));
        assert!(matches!(cli.command, Command::Start { ref task_id } if task_id == "T1"));

        let cli = Cli::try_parse_from(["fieldtrack", "complete", "T3"]).unwrap();
        assert!(matches!(cli.command, Command::Complete { ref task_id } if task_id == "T3"));

        assert!(Cli::try_parse_from(["fieldtrack", "start"]).is_err());
    }
}
