mod commands;
mod context;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arm")]
#[command(about = "Read and reconcile Azure Resource Manager resources", long_about = None)]
struct Cli {
    /// Provider configuration file (default: discovered armflow.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Record reads in .armflow/state.json
    #[arg(long, global = true)]
    save: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information
    Version,
    /// Print the effective feature flags as JSON
    Features,
    /// Management groups
    #[command(subcommand)]
    Mg(MgCommands),
    /// Management group subscription associations
    #[command(subcommand)]
    Association(AssociationCommands),
    /// Virtual networks
    #[command(subcommand)]
    Vnet(ReadCommands),
    /// Subnets
    #[command(subcommand)]
    Subnet(ReadCommands),
}

#[derive(Subcommand)]
pub enum MgCommands {
    /// Read a management group into a state record
    Read {
        /// Management group ARM id
        id: String,
    },
    /// Plan the subscription membership of a group, optionally applying it
    Reconcile {
        /// Management group name
        name: String,
        /// Subscription that should belong to the group (repeatable)
        #[arg(short, long = "subscription")]
        subscriptions: Vec<String>,
        /// Apply the plan instead of only printing it
        #[arg(long)]
        apply: bool,
    },
    /// Wait until a newly created group becomes readable
    WaitCreated {
        /// Management group name
        name: String,
        /// Give up after this many seconds
        #[arg(long, default_value = "1800")]
        timeout: u64,
    },
}

#[derive(Subcommand)]
pub enum AssociationCommands {
    /// Read an association into a state record
    Read {
        /// Association id (`/managementGroup/{group}/subscription/{subscription}`)
        id: String,
    },
    /// Wait until the subscription shows up in (or leaves) the group
    Wait {
        /// Association id
        id: String,
        /// Wait for the association to disappear instead
        #[arg(long)]
        gone: bool,
        /// Give up after this many seconds
        #[arg(long, default_value = "300")]
        timeout: u64,
    },
}

#[derive(Subcommand)]
pub enum ReadCommands {
    /// Read the resource into a state record
    Read {
        /// Resource ARM id
        id: String,
    },
}

/// Commands that talk to Resource Manager
enum RemoteCommand {
    Mg(MgCommands),
    Association(AssociationCommands),
    Vnet(String),
    Subnet(String),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Version and feature flags need no credentials
    let command = match cli.command {
        Commands::Version => {
            print_version();
            return Ok(());
        }
        Commands::Features => {
            let config = context::load_config(cli.config.as_deref())?;
            return commands::features::handle(&config);
        }
        Commands::Mg(cmd) => RemoteCommand::Mg(cmd),
        Commands::Association(cmd) => RemoteCommand::Association(cmd),
        Commands::Vnet(ReadCommands::Read { id }) => RemoteCommand::Vnet(id),
        Commands::Subnet(ReadCommands::Read { id }) => RemoteCommand::Subnet(id),
    };

    let config = context::load_config(cli.config.as_deref())?;
    let ctx = context::Context::new(&config, cli.save)?;

    match command {
        RemoteCommand::Mg(cmd) => commands::mg::handle(&ctx, cmd).await?,
        RemoteCommand::Association(cmd) => commands::association::handle(&ctx, cmd).await?,
        RemoteCommand::Vnet(id) => commands::network::read_virtual_network(&ctx, &id).await?,
        RemoteCommand::Subnet(id) => commands::network::read_subnet(&ctx, &id).await?,
    }

    Ok(())
}

fn print_version() {
    println!("armflow {}", env!("CARGO_PKG_VERSION"));
    for service in armflow_azure::supported_services() {
        println!("  {}", service.name());
        for resource in service.resources() {
            println!("    {}", resource.type_name);
        }
    }
}
