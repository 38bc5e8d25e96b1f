use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{ToolError, ToolResult};
use crate::models::RecordFilter;
use crate::report::{ReportRow, ReportSink};
use crate::rpc::RpcGateway;
use crate::services::{tariff_service, vgroup_service};

/// Column left out of tariff exports.
pub const TARIFF_OMITTED_FIELDS: &[&str] = &["catnumbers"];
/// Column left out of vgroup exports.
pub const VGROUP_OMITTED_FIELDS: &[&str] = &["address"];

fn record_row<T: Serialize>(record: &T, omit: &[&str]) -> ToolResult<ReportRow> {
    match serde_json::to_value(record)? {
        Value::Object(object) => Ok(ReportRow::from_object(&object, omit)),
        other => Err(ToolError::Inconsistent(format!(
            "exported record is not an object: {other}"
        ))),
    }
}

/// Writes the body of every selected tariff; returns the number of rows.
pub async fn export_tariffs(
    gw: &mut dyn RpcGateway,
    filter: &RecordFilter,
    tariff_type: Option<i64>,
    report: &mut dyn ReportSink,
) -> ToolResult<usize> {
    let tariffs = tariff_service::fetch_tariffs(gw, filter, tariff_type).await?;
    for record in &tariffs {
        report.write_row(&record_row(&record.tariff, TARIFF_OMITTED_FIELDS)?)?;
    }
    report.finish()?;
    info!(count = tariffs.len(), "Tariffs exported.");
    Ok(tariffs.len())
}

/// Writes the listing row of every selected vgroup; returns the number of rows.
pub async fn export_vgroups(
    gw: &mut dyn RpcGateway,
    filter: &RecordFilter,
    report: &mut dyn ReportSink,
) -> ToolResult<usize> {
    let vgroups = vgroup_service::fetch_vgroups(gw, filter).await?;
    for vgroup in &vgroups {
        report.write_row(&record_row(vgroup, VGROUP_OMITTED_FIELDS)?)?;
    }
    report.finish()?;
    info!(count = vgroups.len(), "Vgroups exported.");
    Ok(vgroups.len())
}
