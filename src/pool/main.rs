use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[path = "../pool/mod.rs"]
mod pool;
#[path = "../shared/mod.rs"]
mod shared;

use pool::docker_backend::DockerBackend;
use pool::{PoolSettings, StoragePool, UnitUsage};
use shared::PoolConfig;

#[derive(Parser)]
#[command(name = "drivepool")]
#[command(about = "Stores files across capacity-bounded Docker storage units")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload files, provisioning a new unit when none has room
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Show used and available bytes per unit
    Usage {
        #[arg(long)]
        json: bool,
    },
    /// List the units owned by this pool
    List,
    /// Create a new empty unit
    Provision,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_path) = PoolConfig::load_default()?;
    let _logging = shared::logging::init_service_logging(&config.log_dir, "drivepool")?;
    tracing::debug!("Using config {}", config_path.display());

    let backend = DockerBackend::connect().context("could not connect to the Docker engine")?;
    let pool = StoragePool::new(Arc::new(backend), PoolSettings::from_config(&config));

    match args.command {
        Command::Upload { paths } => {
            for path in paths {
                let unit = pool
                    .upload_file_with_check(&path)
                    .await
                    .with_context(|| format!("upload of {} failed", path.display()))?;
                println!("{} -> {}", path.display(), unit.name);
            }
        }
        Command::Usage { json } => {
            let report = pool.get_unit_disk_usage().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_usage_table(&report);
            }
        }
        Command::List => {
            for unit in pool.list_units().await? {
                println!("{}\t{}", unit.id, unit.name);
            }
        }
        Command::Provision => {
            let unit = pool.provision_unit().await?;
            println!("{}\t{}", unit.id, unit.name);
        }
    }

    Ok(())
}

fn print_usage_table(report: &[UnitUsage]) {
    if report.is_empty() {
        println!("No usage data available");
        return;
    }

    println!("{:<14} {:<48} {:>16} {:>16}", "ID", "NAME", "USED", "AVAILABLE");
    for unit in report {
        println!(
            "{:<14} {:<48} {:>16} {:>16}",
            short_id(&unit.id),
            unit.name,
            unit.used_bytes,
            unit.available_bytes
        );
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(12).collect()
}
