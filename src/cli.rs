//! Arguments and session setup shared by the binaries.

use clap::Args;
use tracing::warn;

use crate::config::{LanbillingConfig, prompt_password};
use crate::error::ToolResult;
use crate::models::RecordFilter;
use crate::rpc::{ReauthGateway, SessionTransport, SoapSession};

/// Record selection flags. Every flag narrows the selection; none selects all.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Lowest tariff id to select
    #[arg(long, value_name = "TAR_ID", value_parser = clap::value_parser!(i64).range(0..))]
    pub from_tar_id: Option<i64>,
    /// Highest tariff id to select
    #[arg(long, value_name = "TAR_ID", value_parser = clap::value_parser!(i64).range(0..))]
    pub to_tar_id: Option<i64>,
    /// Lowest vgroup id to select
    #[arg(long, value_name = "VG_ID", value_parser = clap::value_parser!(i64).range(0..))]
    pub from_vg_id: Option<i64>,
    /// Highest vgroup id to select
    #[arg(long, value_name = "VG_ID", value_parser = clap::value_parser!(i64).range(0..))]
    pub to_vg_id: Option<i64>,
    /// Vgroup login pattern to search for
    #[arg(long, value_name = "PATTERN")]
    pub login: Option<String>,
    /// Select vgroups of this agent only
    #[arg(long, value_name = "AGENT_ID", value_parser = clap::value_parser!(i64).range(0..))]
    pub vgroup_agent_id: Option<i64>,
    /// Select archived vgroups only
    #[arg(long, conflicts_with = "non_archived_vgroups")]
    pub archived_vgroups: bool,
    /// Select vgroups that are not archived
    #[arg(long)]
    pub non_archived_vgroups: bool,
}

impl SelectionArgs {
    pub fn archived(&self) -> Option<bool> {
        if self.archived_vgroups {
            Some(true)
        } else if self.non_archived_vgroups {
            Some(false)
        } else {
            None
        }
    }

    /// Builds and validates the record filter.
    pub fn to_filter(&self) -> ToolResult<RecordFilter> {
        let filter = RecordFilter {
            from_tar_id: self.from_tar_id,
            to_tar_id: self.to_tar_id,
            from_vg_id: self.from_vg_id,
            to_vg_id: self.to_vg_id,
            login: self.login.clone(),
            agent_id: self.vgroup_agent_id,
            archived: self.archived(),
        };
        filter.validate()?;
        Ok(filter)
    }
}

/// Reads the configuration and prepares an authenticated gateway. The login
/// itself happens on the first call.
pub async fn connect_gateway() -> ToolResult<ReauthGateway<SoapSession>> {
    let config = LanbillingConfig::from_env(prompt_password)?;
    let session = SoapSession::connect(&config).await?;
    Ok(ReauthGateway::new(session))
}

/// Ends the session. A failed logout is logged and otherwise ignored.
pub async fn close_gateway<T: SessionTransport>(gw: &mut ReauthGateway<T>) {
    if let Err(e) = gw.close().await {
        warn!(error = %e, "Logout failed.");
    }
}
