//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Catalog commands.
#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// List catalog fields
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Add a field to the catalog
    Add {
        /// Name of the new field
        name: String,
    },
}

/// Pin commands.
#[derive(Debug, Subcommand)]
pub enum PinsCommand {
    /// Show stored pins
    Show {
        /// Output format (json prints the legacy key-value map)
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Pin a field with a value
    Pin {
        /// Catalog id of the field
        field_id: String,

        /// Value to pin
        value: String,
    },

    /// Remove the pin of a field
    Unpin {
        /// Catalog id of the field
        field_id: String,
    },

    /// Pin the list of fields
    PinList {
        /// Catalog ids of the member fields, in order
        field_ids: Vec<String>,
    },

    /// Remove the list pin
    UnpinList,

    /// Replace stored pins with a legacy JSON pin map
    Import {
        /// JSON file holding the pin map
        file: PathBuf,
    },

    /// Write stored pins as a legacy JSON pin map
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Render command arguments.
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// JSON file with `currentFields` and `formValues`
    pub record: PathBuf,

    /// Ignore pins for this render
    #[arg(long)]
    pub no_pin_mode: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Suggest command arguments.
#[derive(Debug, Args)]
pub struct SuggestCommand {
    /// Catalog id of the field
    pub field_id: String,

    /// Text typed so far
    pub query: String,

    /// Maximum number of suggestions (defaults to the configured limit)
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_output_format_value_names() {
        let names: Vec<_> = OutputFormat::value_variants()
            .iter()
            .filter_map(ValueEnum::to_possible_value)
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["plain", "json"]);
    }
}
