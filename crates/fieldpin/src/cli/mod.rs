//! Command-line interface for fieldpin.
//!
//! This module provides the CLI structure and command handlers for the
//! `fieldpin` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CatalogCommand, ConfigCommand, OutputFormat, PinsCommand, RenderCommand, StatusCommand,
    SuggestCommand,
};

/// fieldpin - Keep custom field values across records
///
/// Manages the field catalog and pinned values, and shows which custom
/// fields a record would render with the current pins.
#[derive(Debug, Parser)]
#[command(name = "fieldpin")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the field catalog
    #[command(subcommand)]
    Catalog(CatalogCommand),

    /// Manage pins
    #[command(subcommand)]
    Pins(PinsCommand),

    /// Show the fields a record renders with
    Render(RenderCommand),

    /// Suggest previously pinned values for a field
    Suggest(SuggestCommand),

    /// Show storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn status_cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "fieldpin");
    }

    #[test]
    fn test_verbosity_flags() {
        use crate::logging::Verbosity;

        assert_eq!(status_cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(3, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(status_cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(status_cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_catalog_add() {
        let cli = Cli::try_parse_from(["fieldpin", "catalog", "add", "Color"]).unwrap();
        match cli.command {
            Command::Catalog(CatalogCommand::Add { name }) => assert_eq!(name, "Color"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_pins_pin() {
        let cli = Cli::try_parse_from(["fieldpin", "pins", "pin", "7", "Rojo"]).unwrap();
        match cli.command {
            Command::Pins(PinsCommand::Pin { field_id, value }) => {
                assert_eq!(field_id, "7");
                assert_eq!(value, "Rojo");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_pins_pin_list() {
        let cli = Cli::try_parse_from(["fieldpin", "pins", "pin-list", "1", "2", "3"]).unwrap();
        match cli.command {
            Command::Pins(PinsCommand::PinList { field_ids }) => {
                assert_eq!(field_ids, vec!["1", "2", "3"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_pins_show_json() {
        let cli = Cli::try_parse_from(["fieldpin", "pins", "show", "-f", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Pins(PinsCommand::Show {
                format: OutputFormat::Json
            })
        ));
    }

    #[test]
    fn test_parse_render() {
        let cli =
            Cli::try_parse_from(["fieldpin", "render", "record.json", "--no-pin-mode"]).unwrap();
        match cli.command {
            Command::Render(cmd) => {
                assert_eq!(cmd.record, PathBuf::from("record.json"));
                assert!(cmd.no_pin_mode);
                assert_eq!(cmd.format, OutputFormat::Plain);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_suggest() {
        let cli = Cli::try_parse_from(["fieldpin", "suggest", "3", "ro", "-l", "5"]).unwrap();
        match cli.command {
            Command::Suggest(cmd) => {
                assert_eq!(cmd.field_id, "3");
                assert_eq!(cmd.query, "ro");
                assert_eq!(cmd.limit, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["fieldpin", "-c", "/custom/config.toml", "status"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["fieldpin", "status", "-v", "-v"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Status(_)));
    }

    #[test]
    fn test_parse_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["fieldpin"]).is_err());
    }
}
