use tracing::info;

use crate::error::{ToolError, ToolResult};
use crate::models::{RecordFilter, VgroupDetail};
use crate::report::{ReportRow, ReportSink};
use crate::rpc::RpcGateway;
use crate::services::vgroup_service;

/// Detail flags written to every selected vgroup. `None` leaves a flag as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VgroupUpdate {
    pub ip_details: Option<i64>,
    pub port_details: Option<i64>,
}

impl VgroupUpdate {
    pub fn validate(&self) -> ToolResult<()> {
        if self.ip_details.is_none() && self.port_details.is_none() {
            return Err(ToolError::InvalidArguments(
                "at least one update option must be specified".to_string(),
            ));
        }
        for (name, value) in [
            ("update-ip-details", self.ip_details),
            ("update-port-details", self.port_details),
        ] {
            if value.is_some_and(|v| v != 0 && v != 1) {
                return Err(ToolError::InvalidArguments(format!(
                    "invalid value for \"{name}\": expected 0 or 1"
                )));
            }
        }
        Ok(())
    }

    pub fn apply(&self, detail: &mut VgroupDetail) {
        if let Some(ip) = self.ip_details {
            detail.vgroup.ip_details = Some(ip);
        }
        if let Some(port) = self.port_details {
            detail.vgroup.port_details = Some(port);
        }
    }

    fn to_row(&self, vgroup_id: i64) -> ReportRow {
        ReportRow::new()
            .field("vgid", vgroup_id)
            .optional("ipdet", self.ip_details)
            .optional("portdet", self.port_details)
    }
}

/// Applies `update` to every vgroup `filter` selects, one save per vgroup.
pub async fn update_vgroups(
    gw: &mut dyn RpcGateway,
    filter: &RecordFilter,
    update: &VgroupUpdate,
    report: &mut dyn ReportSink,
) -> ToolResult<usize> {
    update.validate()?;
    let vgroups = vgroup_service::fetch_vgroups(gw, filter).await?;
    for summary in &vgroups {
        let mut detail = vgroup_service::get_vgroup(gw, summary.vgroup_id).await?;
        update.apply(&mut detail);
        vgroup_service::save_vgroup(gw, &detail).await?;
        info!(
            vgid = summary.vgroup_id,
            ipdet = ?update.ip_details,
            portdet = ?update.port_details,
            "Vgroup updated."
        );
        report.write_row(&update.to_row(summary.vgroup_id))?;
    }
    report.finish()?;
    Ok(vgroups.len())
}
