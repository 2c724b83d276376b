//! CLI module for cure-sync.
//!
//! A thin shell over [`CureContext`](crate::CureContext) for checking a
//! project's content from a terminal: one-shot startup, sync, language listing,
//! and a watch mode that prints realtime updates.
//!
//! ```ignore
//! use cure_sync::cli::{parse_args, run_cli_command};
//!
//! let command = parse_args(std::env::args());
//! run_cli_command(command).await?;
//! ```

pub mod args;
pub mod commands;
pub mod version;

pub use args::{parse_args, CliCommand, USAGE};
pub use version::{handle_version_command, VERSION};

use color_eyre::Result;

/// Run a parsed CLI command.
pub async fn run_cli_command(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Version => {
            handle_version_command();
            Ok(())
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        CliCommand::Watch => commands::handle_watch_command().await,
        CliCommand::Sync(name) => commands::handle_sync_command(name).await,
        CliCommand::Languages => commands::handle_languages_command().await,
        CliCommand::Run => commands::handle_run_command().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_version_and_help_need_no_configuration() {
        assert!(run_cli_command(CliCommand::Version).await.is_ok());
        assert!(run_cli_command(CliCommand::Help).await.is_ok());
    }
}
