//! Projtree CLI Binary
//!
//! Thin command-line front end over the reconciliation core, mirroring the
//! tree the editor integration renders: list orgs/tasks/flows/services, show
//! detail, and run actions through the project CLI.

use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use owo_colors::OwoColorize;
use projtree::actions::ActionService;
use projtree::derive::org_status;
use projtree::listing::{ListingService, ServiceTypeGroup};
use projtree::logging::init_logging;
use projtree::present::{group_named_records, TreeNode};
use projtree::runner::SystemCliRunner;
use projtree::settings::SettingsLoader;
use projtree::types::{record_is, record_str, Record};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::error;

/// Projtree - project CLI state, reconciled
#[derive(Parser)]
#[command(name = "projtree")]
#[command(about = "Surfaces project CLI state (orgs, tasks, flows, services) as a reconciled tree")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    workspace: PathBuf,

    /// Output format (text or json)
    #[arg(long, default_value = "text")]
    format: String,

    /// Enable verbose logging (default: off)
    #[arg(long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Org commands (list, info, set-default, remove)
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },
    /// Task commands (list, run)
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Flow commands (list, run)
    Flow {
        #[command(subcommand)]
        command: FlowCommands,
    },
    /// Service commands (list, info, connect)
    Service {
        #[command(subcommand)]
        command: ServiceCommands,
    },
}

#[derive(Subcommand)]
enum OrgCommands {
    /// List reconciled orgs
    List,
    /// Show org detail
    Info { alias: String },
    /// Make an org the project default
    SetDefault { alias: String },
    /// Clear the project default org
    ClearDefault,
    /// Remove a connected org
    Remove { alias: String },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// List reconciled tasks, grouped
    List,
    /// Run a task
    Run {
        name: String,
        /// Extra arguments passed through to the project CLI
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
}

#[derive(Subcommand)]
enum FlowCommands {
    /// List reconciled flows, grouped
    List,
    /// Run a flow
    Run {
        name: String,
        /// Extra arguments passed through to the project CLI
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ServiceCommands {
    /// List connected services by type
    List,
    /// Show service detail
    Info { service_type: String, name: String },
    /// Connect a service
    Connect {
        service_type: String,
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match SettingsLoader::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let mut logging = settings.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Err(e) = init_logging(Some(&logging)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let runner = Arc::new(SystemCliRunner::new(settings.cli.command.clone()));
    let listing = ListingService::new(runner.clone(), settings.clone());
    let actions = ActionService::new(runner);

    match execute(&cli, &listing, &actions).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

async fn execute(
    cli: &Cli,
    listing: &ListingService,
    actions: &ActionService,
) -> anyhow::Result<String> {
    let root = cli.workspace.as_path();
    let json = cli.format == "json";

    match &cli.command {
        Commands::Org { command } => match command {
            OrgCommands::List => {
                let orgs = listing.list_orgs(root).await?;
                Ok(if json {
                    to_json(&orgs)
                } else {
                    let mut output = format_orgs_text(&orgs);
                    for notice in listing.expiry_notices(&orgs) {
                        output.push('\n');
                        output.push_str(&notice.yellow().to_string());
                    }
                    output
                })
            }
            OrgCommands::Info { alias } => {
                let record = listing.org_info(root, alias).await?;
                Ok(if json {
                    to_json(&record)
                } else {
                    format_record_text(&record)
                })
            }
            OrgCommands::SetDefault { alias } => Ok(actions.set_default_org(root, alias).await?),
            OrgCommands::ClearDefault => Ok(actions.clear_default_org(root).await?),
            OrgCommands::Remove { alias } => Ok(actions.remove_org(root, alias).await?),
        },
        Commands::Task { command } => match command {
            TaskCommands::List => {
                let tasks = listing.list_tasks(root).await?;
                Ok(format_grouped(&tasks, json))
            }
            TaskCommands::Run { name, args } => Ok(actions.run_task(root, name, args).await?),
        },
        Commands::Flow { command } => match command {
            FlowCommands::List => {
                let flows = listing.list_flows(root).await?;
                Ok(format_grouped(&flows, json))
            }
            FlowCommands::Run { name, args } => Ok(actions.run_flow(root, name, args).await?),
        },
        Commands::Service { command } => match command {
            ServiceCommands::List => {
                let groups = listing.list_services(root).await?;
                Ok(if json {
                    to_json(&groups)
                } else {
                    format_services_text(&groups)
                })
            }
            ServiceCommands::Info { service_type, name } => {
                let record = listing.service_info(root, service_type, name).await?;
                Ok(if json {
                    to_json(&record)
                } else {
                    format_record_text(&record)
                })
            }
            ServiceCommands::Connect { service_type, name } => {
                let output = actions
                    .connect_service(root, service_type, name.as_deref())
                    .await?;
                Ok(output)
            }
        },
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn format_grouped(records: &[Record], json: bool) -> String {
    let nodes = group_named_records(records);
    if json {
        return to_json(&nodes);
    }
    let mut lines = Vec::new();
    render_nodes(&nodes, 0, &mut lines);
    lines.join("\n")
}

fn render_nodes(nodes: &[TreeNode], depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            TreeNode::Group { label, children } => {
                lines.push(format!("{}{}", indent, label.bold()));
                render_nodes(children, depth + 1, lines);
            }
            TreeNode::Item { label, description } => match description {
                Some(description) => lines.push(format!("{}{} - {}", indent, label, description)),
                None => lines.push(format!("{}{}", indent, label)),
            },
            TreeNode::Error { message } => {
                lines.push(format!("{}{}", indent, message.red()));
            }
        }
    }
}

fn format_orgs_text(orgs: &[Record]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Alias", "Status", "Instance", "Default"]);
    for org in orgs {
        let status = org_status(org);
        let status_cell = if status.status_line == "Expired" {
            status.status_line.red().to_string()
        } else {
            status.status_line.clone()
        };
        table.add_row(vec![
            record_str(org, &["alias"]).unwrap_or("").to_string(),
            status_cell,
            record_str(org, projtree::types::DOMAIN_KEYS)
                .unwrap_or("")
                .to_string(),
            if record_is(org, &["is_default", "default"]) {
                "*".green().to_string()
            } else {
                String::new()
            },
        ]);
    }
    table.to_string()
}

fn format_services_text(groups: &[ServiceTypeGroup]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Type", "Name", "Default", "Description"]);
    for group in groups {
        for service in &group.services {
            table.add_row(vec![
                group.service_type.clone(),
                service.name.clone(),
                if service.is_default {
                    "*".green().to_string()
                } else {
                    String::new()
                },
                service.description.clone().unwrap_or_default(),
            ]);
        }
    }
    table.to_string()
}

fn format_record_text(record: &Record) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Key", "Value"]);
    for (key, value) in record {
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        table.add_row(vec![key.clone(), rendered]);
    }
    table.to_string()
}
