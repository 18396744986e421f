//! gpreg: resolve group policy into a local registry store.
//!
//! Usage:
//!   gpreg update --source /var/lib/gpreg/policy --user S-1-5-21-1-2-3-1001
//!   gpreg query --user S-1-5-21-1-2-3-1001 --prefix Software\\Policies
//!   gpreg info

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gpreg_cli::{DirectorySource, entry_lines, summarize};
use gpreg_reconcile::{ReconcileConfig, Reconciler};
use gpreg_store::{HostInfo, RegistryStore};
use gpreg_types::{Principal, Sid};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "gpreg")]
#[command(about = "Resolve group policy into a local registry store")]
struct Args {
    /// Path to the registry store
    #[arg(long, global = true, default_value = "/var/cache/gpreg/registry.sqlite")]
    db: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, merge and persist policy for the machine and the given users
    Update {
        /// Directory holding machine.json and users/<SID>.json
        #[arg(long)]
        source: PathBuf,

        /// User SID to reconcile (repeatable)
        #[arg(long = "user")]
        users: Vec<Sid>,

        /// Per-principal fetch timeout in seconds
        #[arg(long, default_value = "30")]
        timeout_secs: u64,

        /// Machine account SID recorded in host metadata
        #[arg(long)]
        machine_sid: Option<Sid>,

        /// Machine name recorded in host metadata
        #[arg(long)]
        machine_name: Option<String>,

        /// Domain recorded in host metadata
        #[arg(long)]
        domain: Option<String>,
    },

    /// Print resolved entries as JSON lines
    Query {
        /// Query a user hive instead of the machine hive
        #[arg(long)]
        user: Option<Sid>,

        /// Only entries whose key path starts with this prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Print host metadata as JSON
    Info,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match args.command {
        Command::Update {
            source,
            users,
            timeout_secs,
            machine_sid,
            machine_name,
            domain,
        } => {
            if let Some(parent) = args.db.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let store = open_store(&args.db)?;
            let config = ReconcileConfig {
                fetch_timeout: Duration::from_secs(timeout_secs),
                host: HostInfo {
                    machine_sid,
                    machine_name,
                    domain,
                    cache_dir: args.db.parent().map(PathBuf::from),
                    last_update: None,
                },
            };

            let mut reconciler =
                Reconciler::new(store, Arc::new(DirectorySource::new(source)), config);
            let report = reconciler.reconcile(&users).await;
            for line in summarize(&report) {
                println!("{}", line);
            }

            if report.has_failures() {
                warn!("One or more hives failed to persist");
                return Ok(ExitCode::FAILURE);
            }
            info!("Update complete");
        }
        Command::Query { user, prefix } => {
            let store = open_store(&args.db)?;
            let principal = user.map_or(Principal::Machine, Principal::User);
            for line in entry_lines(&store, &principal, &prefix)? {
                println!("{}", line);
            }
        }
        Command::Info => {
            let store = open_store(&args.db)?;
            println!("{}", serde_json::to_string_pretty(store.host_info())?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn open_store(path: &std::path::Path) -> Result<RegistryStore> {
    RegistryStore::open(path)
        .with_context(|| format!("Failed to open registry store {}", path.display()))
}
