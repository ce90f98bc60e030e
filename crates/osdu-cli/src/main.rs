//! OSDU CLI - Main entry point

use clap::Parser;
use osdu_cli::commands::{
    self, ingest::IngestOptions, schema::SchemaFilter, status::RunSelection,
};
use osdu_cli::error::EXIT_INTERRUPTED;
use osdu_cli::{
    CliConfig, Cli, Commands, ConfigCommand, EntitlementsCommand, LegalCommand, ListCommand,
    MembersCommand, SchemaCommand, SearchCommand, UnitCommand, WorkflowCommand,
};
use osdu_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use std::time::Duration;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Verbose mode logs debug to the console, otherwise warnings only
    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("osdu-cli")
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::from_env_with(log_config.clone()).unwrap_or(log_config);

    // The CLI works without logging, so a failed init is ignored
    let _guard = init_logging(&log_config).ok().flatten();

    let result = tokio::select! {
        result = execute_command(&cli) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted by user");
            eprintln!("Interrupted");
            process::exit(EXIT_INTERRUPTED);
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> osdu_cli::Result<()> {
    let mut config = match &cli.config_dir {
        Some(dir) => CliConfig::load_from(dir)?,
        None => CliConfig::load()?,
    };

    match &cli.command {
        Commands::Ingest {
            path,
            files,
            batch,
            runid_log,
            wait,
            poll_interval,
            skip_existing,
            verify_batch,
            simulate,
        } => {
            let options = IngestOptions {
                path: path.clone(),
                files: files.clone(),
                batch_size: *batch,
                runid_log: runid_log.clone(),
                wait: *wait,
                poll_interval: Duration::from_secs(*poll_interval),
                skip_existing: *skip_existing,
                verify_batch_size: *verify_batch,
                simulate: *simulate,
            };
            commands::ingest::run(&config, options).await
        }

        Commands::Status {
            runid,
            runid_log,
            wait,
            poll_interval,
            output,
        } => {
            let selection = RunSelection::from_args(runid.clone(), runid_log.clone())?;
            commands::status::run(
                &config,
                selection,
                *wait,
                Duration::from_secs(*poll_interval),
                *output,
            )
            .await
        }

        Commands::Verify {
            path,
            batch,
            batch_across_files,
        } => commands::verify::run(&config, path, *batch, *batch_across_files).await,

        Commands::Config { command } => match command {
            ConfigCommand::Get { key, section } => commands::config::get(&config, section, key),
            ConfigCommand::Set {
                key,
                value,
                section,
            } => commands::config::set(&mut config, section, key, value),
            ConfigCommand::List { section } => commands::config::list(&config, section),
        },

        Commands::Search { command } => match command {
            SearchCommand::Id { id } => commands::search::run_by_id(&config, id).await,
            SearchCommand::Query { kind, query, limit } => {
                commands::search::run_query(&config, kind, query.as_deref(), *limit).await
            }
        },

        Commands::Schema { command } => match command {
            SchemaCommand::List {
                authority,
                entity,
                source,
                output,
            } => {
                let filter = SchemaFilter {
                    authority: authority.clone(),
                    entity: entity.clone(),
                    source: source.clone(),
                };
                commands::schema::run_list(&config, &filter, *output).await
            }
            SchemaCommand::Get { kind } => commands::schema::run_get(&config, kind).await,
            SchemaCommand::Add { path, kind, status } => {
                commands::schema::run_add(&config, path, kind, status).await
            }
        },

        Commands::Legal { command } => match command {
            LegalCommand::ListTags { output } => {
                commands::legal::run_list_tags(&config, *output).await
            }
        },

        Commands::Entitlements { command } => match command {
            EntitlementsCommand::MyGroups { output } => {
                commands::entitlements::run_my_groups(&config, *output).await
            }
            EntitlementsCommand::Members { command } => match command {
                MembersCommand::List { group, output } => {
                    commands::entitlements::run_members(&config, group, *output).await
                }
                MembersCommand::Add {
                    member,
                    group,
                    role,
                } => commands::entitlements::run_add_member(&config, group, member, *role).await,
                MembersCommand::Remove { member, group } => {
                    commands::entitlements::run_remove_member(&config, group, member).await
                }
            },
        },

        Commands::Unit { command } => match command {
            UnitCommand::List { output } => commands::unit::run_list(&config, *output).await,
        },

        Commands::Workflow { command } => match command {
            WorkflowCommand::List { output } => {
                commands::workflow::run_list(&config, *output).await
            }
            WorkflowCommand::Register { name, description } => {
                commands::workflow::run_register(&config, name, description).await
            }
            WorkflowCommand::Unregister { name } => {
                commands::workflow::run_unregister(&config, name).await
            }
        },

        Commands::List { command } => match command {
            ListCommand::Records { output } => {
                commands::search::run_record_counts(&config, *output).await
            }
        },

        Commands::Health => commands::health::run(&config).await,

        Commands::Version => {
            commands::version::run(&config);
            Ok(())
        }
    }
}
