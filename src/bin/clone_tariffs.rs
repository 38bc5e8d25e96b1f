use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing::{error, info};

use lanbilling_tools::cli::{SelectionArgs, close_gateway, connect_gateway};
use lanbilling_tools::error::ToolResult;
use lanbilling_tools::logging::init_logging;
use lanbilling_tools::models::RecordFilter;
use lanbilling_tools::report::open_report;
use lanbilling_tools::rpc::RpcGateway;
use lanbilling_tools::services::clone_service::TariffCloner;
use lanbilling_tools::services::tariff_service;
use lanbilling_tools::version::VERSION;

/// Clones the selected tariffs into another tariff type, reusing equal
/// tariffs that already exist there.
#[derive(Parser, Debug)]
#[command(name = "clone_tariffs", version = VERSION, about, long_about = None)]
struct Cli {
    /// Tariff type the selected tariffs are cloned into
    #[arg(long, value_name = "TARIFF_TYPE", value_parser = clap::value_parser!(i64).range(1..))]
    destination_tariff_type: i64,
    /// Prefix added to the names of cloned tariffs
    #[arg(long, value_name = "PREFIX")]
    destination_tariff_prefix: Option<String>,
    /// Write a CSV report of every processed tariff to this file
    #[arg(long, value_name = "FILENAME")]
    export_report: Option<PathBuf>,
    #[command(flatten)]
    selection: SelectionArgs,
}

async fn run(gw: &mut dyn RpcGateway, cli: &Cli, filter: &RecordFilter) -> ToolResult<()> {
    info!("Fetching source tariffs.");
    let sources = tariff_service::fetch_tariffs(gw, filter, None).await?;
    info!(count = sources.len(), "Selected tariffs fetched.");

    let cloner = TariffCloner::load(
        gw,
        cli.destination_tariff_type,
        cli.destination_tariff_prefix.clone(),
    )
    .await?;

    let mut report = open_report(cli.export_report.as_deref())?;
    cloner.process_batch(gw, &sources, report.as_mut()).await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging("clone_tariffs");
    info!(version = VERSION, "Starting tariff clone tool.");

    let filter = cli.selection.to_filter()?;
    let mut gw = connect_gateway().await?;
    let result = run(&mut gw, &cli, &filter).await;
    close_gateway(&mut gw).await;

    if let Err(e) = &result {
        error!(error = %e, "Tariff cloning failed.");
    }
    Ok(result?)
}
