//! OSDU CLI Library
//!
//! Command-line client for an OSDU data platform.
//!
//! # Overview
//!
//! - **Configuration**: layered `[section]` file with `OSDU_{SECTION}_{KEY}`
//!   environment overrides (`osdu config`)
//! - **Authentication**: refresh-token or interactive device sign-in, refreshed
//!   transparently when the access token expires
//! - **Ingestion**: batched submission of manifest records to the ingestion
//!   workflow (`osdu ingest`)
//! - **Run tracking**: status of workflow runs, optionally waiting for them
//!   (`osdu status`)
//! - **Verification**: search for ingested record ids (`osdu verify`)
//! - **Services**: search, schema, legal, entitlements, unit and workflow
//!   commands, plus a readiness check of every service (`osdu health`)

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod dataload;
pub mod error;
pub mod progress;

// Re-export commonly used types
pub use api::OsduClient;
pub use config::CliConfig;
pub use error::{CliError, Result};

use api::MemberRole;
use clap::{Parser, Subcommand};
use commands::OutputFormat;
use std::path::PathBuf;

/// OSDU - command-line client for OSDU data platforms
#[derive(Parser, Debug)]
#[command(name = "osdu")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration directory
    #[arg(long, env = "OSDU_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest manifest files
    Ingest {
        /// Manifest file or directory of manifests
        #[arg(short, long)]
        path: PathBuf,

        /// Directory with files to upload for work-products
        #[arg(short, long)]
        files: Option<PathBuf>,

        /// Records per workflow run (defaults to one run per manifest)
        #[arg(short, long)]
        batch: Option<usize>,

        /// File receiving the run ids, one per line
        #[arg(short = 'l', long)]
        runid_log: Option<PathBuf>,

        /// Wait for the runs to complete
        #[arg(short, long)]
        wait: bool,

        /// Seconds between status checks while waiting
        #[arg(long, default_value_t = dataload::status::DEFAULT_POLL_INTERVAL_SECS)]
        poll_interval: u64,

        /// Only submit records that search cannot find yet
        #[arg(long)]
        skip_existing: bool,

        /// Ids per search query when skipping existing records
        #[arg(long, default_value_t = dataload::verify::DEFAULT_VERIFY_BATCH_SIZE)]
        verify_batch: usize,

        /// Build and log batches without submitting them
        #[arg(long)]
        simulate: bool,
    },

    /// Show status of workflow runs
    Status {
        /// Run id to check
        #[arg(short, long, conflicts_with = "runid_log")]
        runid: Option<String>,

        /// File of run ids written by 'osdu ingest --runid-log'
        #[arg(short = 'l', long)]
        runid_log: Option<PathBuf>,

        /// Wait until no run is running
        #[arg(short, long)]
        wait: bool,

        /// Seconds between status checks while waiting
        #[arg(long, default_value_t = dataload::status::DEFAULT_POLL_INTERVAL_SECS)]
        poll_interval: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },

    /// Verify that manifest records exist
    Verify {
        /// Manifest file or directory of manifests
        #[arg(short, long)]
        path: PathBuf,

        /// Ids per search query
        #[arg(short, long, default_value_t = dataload::verify::DEFAULT_VERIFY_BATCH_SIZE)]
        batch: usize,

        /// Fill batches across files instead of flushing after each file
        #[arg(long)]
        batch_across_files: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Search for records
    Search {
        #[command(subcommand)]
        command: SearchCommand,
    },

    /// List, get and register schemas
    Schema {
        #[command(subcommand)]
        command: SchemaCommand,
    },

    /// Legal tags of the partition
    Legal {
        #[command(subcommand)]
        command: LegalCommand,
    },

    /// Groups and group membership
    Entitlements {
        #[command(subcommand)]
        command: EntitlementsCommand,
    },

    /// Unit catalog
    Unit {
        #[command(subcommand)]
        command: UnitCommand,
    },

    /// List, register and unregister workflows
    Workflow {
        #[command(subcommand)]
        command: WorkflowCommand,
    },

    /// Listings across the platform
    List {
        #[command(subcommand)]
        command: ListCommand,
    },

    /// Check readiness of the platform services
    Health,

    /// Show version information
    Version,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Get configuration value
    Get {
        /// Configuration key
        key: String,

        /// Configuration section
        #[arg(long, default_value = config::CORE_SECTION)]
        section: String,
    },

    /// Set configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,

        /// Configuration section
        #[arg(long, default_value = config::CORE_SECTION)]
        section: String,
    },

    /// Show all configuration of a section
    List {
        /// Configuration section
        #[arg(long, default_value = config::CORE_SECTION)]
        section: String,
    },
}

/// Search subcommands
#[derive(Subcommand, Debug)]
pub enum SearchCommand {
    /// Search for a record id
    Id {
        /// Record id
        id: String,
    },

    /// Search with a query string
    Query {
        /// Kind pattern
        #[arg(short, long, default_value = commands::search::DEFAULT_SEARCH_KIND)]
        kind: String,

        /// Query string
        #[arg(short, long)]
        query: Option<String>,

        /// Maximum results
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Schema subcommands
#[derive(Subcommand, Debug)]
pub enum SchemaCommand {
    /// List schemas
    List {
        /// Authority to filter by
        #[arg(short, long)]
        authority: Option<String>,

        /// Entity to filter by
        #[arg(short, long)]
        entity: Option<String>,

        /// Source to filter by
        #[arg(short, long)]
        source: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },

    /// Get a schema
    Get {
        /// Kind of the schema
        #[arg(short, long)]
        kind: String,
    },

    /// Register schema files
    Add {
        /// Schema file or directory of schemas
        #[arg(short, long)]
        path: PathBuf,

        /// Kind of the schema, 'authority:source:entity:major.minor.patch'
        #[arg(short, long)]
        kind: String,

        /// Status of the schema
        #[arg(long, default_value = commands::schema::DEFAULT_SCHEMA_STATUS)]
        status: String,
    },
}

/// Legal subcommands
#[derive(Subcommand, Debug)]
pub enum LegalCommand {
    /// List legal tags
    #[command(name = "listtags")]
    ListTags {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },
}

/// Entitlements subcommands
#[derive(Subcommand, Debug)]
pub enum EntitlementsCommand {
    /// List groups you have access to
    #[command(name = "mygroups")]
    MyGroups {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },

    /// Manage members of a group
    Members {
        #[command(subcommand)]
        command: MembersCommand,
    },
}

/// Group membership subcommands
#[derive(Subcommand, Debug)]
pub enum MembersCommand {
    /// List members of a group
    List {
        /// Email address of the group
        #[arg(short, long)]
        group: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },

    /// Add a member to a group
    Add {
        /// Email of the member
        #[arg(short, long)]
        member: String,

        /// Email address of the group
        #[arg(short, long)]
        group: String,

        /// Role of the member
        #[arg(short, long, value_enum, default_value_t = MemberRole::Member)]
        role: MemberRole,
    },

    /// Remove a member from a group
    Remove {
        /// Email of the member
        #[arg(short, long)]
        member: String,

        /// Email address of the group
        #[arg(short, long)]
        group: String,
    },
}

/// Unit subcommands
#[derive(Subcommand, Debug)]
pub enum UnitCommand {
    /// List units
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },
}

/// Workflow subcommands
#[derive(Subcommand, Debug)]
pub enum WorkflowCommand {
    /// List registered workflows
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },

    /// Register a workflow
    Register {
        /// DAG name
        #[arg(short, long)]
        name: String,

        /// Description
        #[arg(short, long)]
        description: String,
    },

    /// Unregister a workflow
    Unregister {
        /// DAG name
        #[arg(short, long)]
        name: String,
    },
}

/// Listing subcommands
#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// Record counts per kind
    Records {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest() {
        let cli = Cli::try_parse_from([
            "osdu", "ingest", "-p", "data/", "-b", "50", "--runid-log", "runs.log", "--skip-existing",
        ])
        .unwrap();

        match cli.command {
            Commands::Ingest {
                path,
                batch,
                runid_log,
                skip_existing,
                simulate,
                ..
            } => {
                assert_eq!(path, PathBuf::from("data/"));
                assert_eq!(batch, Some(50));
                assert_eq!(runid_log, Some(PathBuf::from("runs.log")));
                assert!(skip_existing);
                assert!(!simulate);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_status_runid_conflicts_with_log() {
        let result = Cli::try_parse_from(["osdu", "status", "-r", "a", "-l", "runs.log"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_service_commands() {
        let cli = Cli::try_parse_from([
            "osdu", "entitlements", "members", "add", "-m", "jane@example.com", "-g",
            "users@opendes.example.com", "-r", "owner",
        ])
        .unwrap();
        match cli.command {
            Commands::Entitlements {
                command: EntitlementsCommand::Members {
                    command: MembersCommand::Add { member, role, .. },
                },
            } => {
                assert_eq!(member, "jane@example.com");
                assert_eq!(role, MemberRole::Owner);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["osdu", "legal", "listtags", "-o", "table"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Legal {
                command: LegalCommand::ListTags {
                    output: OutputFormat::Table
                }
            }
        ));

        let cli = Cli::try_parse_from(["osdu", "search", "query", "-q", "data.Name:x"]).unwrap();
        match cli.command {
            Commands::Search {
                command: SearchCommand::Query { kind, query, limit },
            } => {
                assert_eq!(kind, "*:*:*:*");
                assert_eq!(query.as_deref(), Some("data.Name:x"));
                assert!(limit.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_config_section_defaults_to_core() {
        let cli = Cli::try_parse_from(["osdu", "config", "get", "server"]).unwrap();
        match cli.command {
            Commands::Config {
                command: ConfigCommand::Get { key, section },
            } => {
                assert_eq!(key, "server");
                assert_eq!(section, "core");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
