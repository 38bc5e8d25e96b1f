use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing::{error, info};

use lanbilling_tools::cli::{SelectionArgs, close_gateway, connect_gateway};
use lanbilling_tools::error::{ToolError, ToolResult};
use lanbilling_tools::logging::init_logging;
use lanbilling_tools::models::RecordFilter;
use lanbilling_tools::report::open_report;
use lanbilling_tools::rpc::RpcGateway;
use lanbilling_tools::services::clone_service::TariffCloner;
use lanbilling_tools::services::migration_service::VgroupMigrator;
use lanbilling_tools::services::{agent_service, vgroup_service};
use lanbilling_tools::version::VERSION;

/// Migrates non-archived vgroups to another agent. Vgroups that already
/// belong to that agent are left alone.
#[derive(Parser, Debug)]
#[command(name = "migrate_vgroups", version = VERSION, about, long_about = None)]
struct Cli {
    /// Agent the selected vgroups are migrated to
    #[arg(long, value_name = "AGENT_ID", value_parser = clap::value_parser!(i64).range(0..))]
    destination_agent_id: i64,
    /// Tariff type of the tariffs assigned to migrated vgroups
    #[arg(long, value_name = "TARIFF_TYPE", value_parser = clap::value_parser!(i64).range(1..))]
    destination_tariff_type: i64,
    /// Name prefix of the tariffs assigned to migrated vgroups
    #[arg(long, value_name = "PREFIX")]
    destination_tariff_prefix: Option<String>,
    /// Write a CSV report of every processed vgroup to this file
    #[arg(long, value_name = "FILENAME")]
    export_report: Option<PathBuf>,
    #[command(flatten)]
    selection: SelectionArgs,
}

async fn run(gw: &mut dyn RpcGateway, cli: &Cli, filter: &RecordFilter) -> ToolResult<()> {
    let mut report = open_report(cli.export_report.as_deref())?;

    let destination = agent_service::find_agent(gw, cli.destination_agent_id).await?;
    info!(agent_id = destination.id, agent_name = %destination.name, "Destination agent found.");

    info!("Fetching source vgroups.");
    let sources = vgroup_service::fetch_vgroups(gw, filter).await?;
    info!(count = sources.len(), "Selected vgroups fetched.");

    let cloner = TariffCloner::load(
        gw,
        cli.destination_tariff_type,
        cli.destination_tariff_prefix.clone(),
    )
    .await?;

    let migrator = VgroupMigrator::new(destination, &cloner);
    migrator.migrate_batch(gw, &sources, report.as_mut()).await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging("migrate_vgroups");
    info!(version = VERSION, "Starting vgroup migration tool.");

    if cli.selection.vgroup_agent_id == Some(cli.destination_agent_id) {
        info!(
            agent_id = cli.destination_agent_id,
            "Destination agent and vgroup agent are the same. Nothing to do."
        );
        return Ok(());
    }
    if cli.selection.archived_vgroups {
        return Err(ToolError::InvalidArguments(
            "archived vgroups can not be migrated".to_string(),
        )
        .into());
    }

    let mut filter = cli.selection.to_filter()?;
    filter.archived = Some(false);

    let mut gw = connect_gateway().await?;
    let result = run(&mut gw, &cli, &filter).await;
    close_gateway(&mut gw).await;

    if let Err(e) = &result {
        error!(error = %e, "Vgroup migration failed.");
    }
    Ok(result?)
}
