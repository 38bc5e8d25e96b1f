use clap::Parser;
use std::error::Error;
use tracing::{error, info};

use lanbilling_tools::cli::{SelectionArgs, close_gateway, connect_gateway};
use lanbilling_tools::logging::init_logging;
use lanbilling_tools::report::stdout_report;
use lanbilling_tools::services::update_service::{self, VgroupUpdate};
use lanbilling_tools::version::VERSION;

/// Bulk updater for vgroup detail flags. Every vgroup is updated unless the
/// selection says otherwise; each updated vgroup is reported on standard output.
#[derive(Parser, Debug)]
#[command(name = "update_vgroups", version = VERSION, about, long_about = None)]
struct Cli {
    /// Set (1) or unset (0) the ipdet option
    #[arg(long, value_name = "BOOL_FLAG", value_parser = clap::value_parser!(i64).range(0..=1))]
    update_ip_details: Option<i64>,
    /// Set (1) or unset (0) the portdet option
    #[arg(long, value_name = "BOOL_FLAG", value_parser = clap::value_parser!(i64).range(0..=1))]
    update_port_details: Option<i64>,
    #[command(flatten)]
    selection: SelectionArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging("update_vgroups");
    info!(version = VERSION, "Starting vgroup bulk update.");

    let update = VgroupUpdate {
        ip_details: cli.update_ip_details,
        port_details: cli.update_port_details,
    };
    update.validate()?;
    let filter = cli.selection.to_filter()?;

    let mut gw = connect_gateway().await?;
    let mut report = stdout_report();
    let result = update_service::update_vgroups(&mut gw, &filter, &update, &mut report).await;
    close_gateway(&mut gw).await;

    if let Err(e) = &result {
        error!(error = %e, "Vgroup update failed.");
    }
    result?;
    Ok(())
}
