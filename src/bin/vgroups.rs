use clap::Parser;
use std::error::Error;
use tracing::{error, info};

use lanbilling_tools::cli::{SelectionArgs, close_gateway, connect_gateway};
use lanbilling_tools::logging::init_logging;
use lanbilling_tools::report::stdout_report;
use lanbilling_tools::services::export_service;
use lanbilling_tools::version::VERSION;

/// Exports vgroups to standard output as CSV. Everything is exported unless
/// the selection says otherwise.
#[derive(Parser, Debug)]
#[command(name = "vgroups", version = VERSION, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    selection: SelectionArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging("vgroups");
    info!(version = VERSION, "Starting vgroup export.");

    let filter = cli.selection.to_filter()?;
    let mut gw = connect_gateway().await?;
    let mut report = stdout_report();
    let result = export_service::export_vgroups(&mut gw, &filter, &mut report).await;
    close_gateway(&mut gw).await;

    if let Err(e) = &result {
        error!(error = %e, "Vgroup export failed.");
    }
    result?;
    Ok(())
}
