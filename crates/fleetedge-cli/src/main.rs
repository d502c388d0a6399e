//! FleetEdge CLI.
//!
//! Evaluates access requests against the FleetEdge policies and prints the
//! decision trace.
//!
//! # Quick Start
//!
//! ```bash
//! # Run the bundled regression scenarios
//! fleetedge scenarios
//!
//! # Ask a single question
//! fleetedge authorize --actor svc-routing \
//!     --action vehicle:update:load_balance --resource veh-tipper-5
//!
//! # Walk a JIT grant through its lifecycle
//! fleetedge jit simulate --actor usr-dispatch \
//!     --permission vehicle:update:route --hours 2 --check-after-hours 1 3
//! ```

mod commands;
mod style;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// FleetEdge - explainable access control for fleet operations.
#[derive(Parser)]
#[command(name = "fleetedge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    /// Project directory holding fleetedge.toml.
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for decisions and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// Output format for `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Text,
    Json,
    Toml,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Decide a single access request against the fleet fixture.
    Authorize {
        /// Actor id (e.g. svc-routing).
        #[arg(long)]
        actor: String,

        /// Action name (e.g. vehicle:update:load_balance).
        #[arg(long)]
        action: String,

        /// Resource id (e.g. veh-tipper-5).
        #[arg(long)]
        resource: String,

        /// JSON policy file replacing the built-in policies.
        #[arg(long)]
        policies: Option<PathBuf>,

        /// Context attribute as key=value (repeatable).
        #[arg(short, long = "context", value_name = "KEY=VALUE")]
        context: Vec<String>,

        /// Evaluation time (RFC 3339); defaults to now.
        #[arg(long)]
        at: Option<String>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Run the built-in regression scenarios.
    Scenarios {
        /// Print every trace, not only the summary.
        #[arg(long)]
        traces: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Policy file commands.
    #[command(subcommand)]
    Policy(PolicyCommands),

    /// Just-in-time grant commands.
    #[command(subcommand)]
    Jit(JitCommands),

    /// Configuration commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// Validate a JSON policy file against the fleet schema.
    Validate {
        /// Path to a JSON array of policies.
        file: PathBuf,
    },

    /// Show what changes between two policy files.
    Diff {
        /// Current policies.
        old: PathBuf,

        /// Proposed policies.
        new: PathBuf,
    },

    /// List the built-in fleet policies.
    List {
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Subcommand)]
enum JitCommands {
    /// Request, decide and exercise a JIT grant, then print the audit log.
    Simulate {
        /// Actor requesting the grant.
        #[arg(long)]
        actor: String,

        /// Permission to request (repeatable).
        #[arg(long = "permission", required = true)]
        permissions: Vec<String>,

        /// Resource the triggering event concerns.
        #[arg(long)]
        resource: Option<String>,

        /// Grant duration in hours.
        #[arg(long, default_value = "2")]
        hours: u32,

        /// Approve the grant (default).
        #[arg(long, conflicts_with = "deny")]
        approve: bool,

        /// Deny the grant.
        #[arg(long)]
        deny: bool,

        /// Hours after approval at which to check the grant (repeatable).
        #[arg(long, num_args = 1.., default_values_t = vec![1, 3])]
        check_after_hours: Vec<u32>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show {
        #[arg(short, long, value_enum, default_value = "text")]
        format: ConfigFormat,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = fleetedge::ConfigLoader::new()
        .with_project_dir(&cli.project)
        .load()
        .context("Failed to load configuration")?;

    // RUST_LOG wins; otherwise --verbose, then the configured level.
    let default_level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    style::set_no_color(cli.no_color);
    tracing::debug!(project = %cli.project.display(), "Configuration loaded");

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Authorize {
            actor,
            action,
            resource,
            policies,
            context,
            at,
            format,
        } => commands::authorize::run(
            &config,
            &commands::authorize::Args {
                actor,
                action,
                resource,
                policies,
                context,
                at,
            },
            format,
        ),
        Commands::Scenarios { traces, format } => commands::scenarios::run(&config, traces, format),
        Commands::Policy(cmd) => match cmd {
            PolicyCommands::Validate { file } => commands::policy::validate(&file),
            PolicyCommands::Diff { old, new } => commands::policy::diff(&old, &new),
            PolicyCommands::List { format } => commands::policy::list(format),
        },
        Commands::Jit(cmd) => match cmd {
            JitCommands::Simulate {
                actor,
                permissions,
                resource,
                hours,
                approve: _,
                deny,
                check_after_hours,
            } => commands::jit::simulate(
                &config,
                &commands::jit::SimulateArgs {
                    actor,
                    permissions,
                    resource,
                    hours,
                    deny,
                    check_after_hours,
                },
            ),
        },
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show { format } => commands::config::show(&config, format),
        },
    }
}
