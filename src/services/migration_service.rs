//! Moves vgroups from their current agent to a destination agent.
//!
//! A vgroup can not change agents in place, so it is re-created: the source is
//! put on hold and renamed out of the way, a copy is created under the
//! destination agent, the copy gets an equivalent tariff from the destination
//! category and is then released. Nothing is rolled back when a step fails.

use chrono::{Local, NaiveDateTime, Timelike};
use tracing::{info, warn};

use crate::error::{ToolError, ToolResult};
use crate::models::{Agent, VgroupDetail, VgroupSummary};
use crate::report::{ReportRow, ReportSink};
use crate::rpc::RpcGateway;
use crate::services::clone_service::TariffCloner;
use crate::services::{tariff_service, vgroup_service};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    AlreadyThere,
    Unsupported,
    NoEquivalentTariff,
    Migrated {
        equal_tariff_id: i64,
        result_vgroup_id: i64,
    },
}

/// One report line of the migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationEntry {
    pub source_vgroup_id: i64,
    pub source_agent_id: i64,
    pub source_tariff_id: i64,
    pub outcome: MigrationOutcome,
}

impl MigrationEntry {
    pub fn to_row(&self) -> ReportRow {
        let (skipped, supported, equal, result) = match self.outcome {
            MigrationOutcome::AlreadyThere => (true, None, None, Some(self.source_vgroup_id)),
            MigrationOutcome::Unsupported => (true, Some(false), None, None),
            MigrationOutcome::NoEquivalentTariff => (true, Some(true), None, None),
            MigrationOutcome::Migrated {
                equal_tariff_id,
                result_vgroup_id,
            } => (
                false,
                Some(true),
                Some(equal_tariff_id),
                Some(result_vgroup_id),
            ),
        };
        ReportRow::new()
            .field("source_vgid", self.source_vgroup_id)
            .field("source_id", self.source_agent_id)
            .field("source_tarid", self.source_tariff_id)
            .field("skipped", skipped)
            .optional("supported", supported)
            .optional("equal_tarid", equal)
            .optional("result_vgid", result)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSummary {
    pub already_there: usize,
    pub unsupported: usize,
    pub no_equivalent_tariff: usize,
    pub migrated: usize,
}

impl MigrationSummary {
    fn record(&mut self, outcome: &MigrationOutcome) {
        match outcome {
            MigrationOutcome::AlreadyThere => self.already_there += 1,
            MigrationOutcome::Unsupported => self.unsupported += 1,
            MigrationOutcome::NoEquivalentTariff => self.no_equivalent_tariff += 1,
            MigrationOutcome::Migrated { .. } => self.migrated += 1,
        }
    }
}

/// Login the source vgroup is renamed to once it is put on hold. The
/// timestamp carries microseconds only when they are not zero.
pub fn disabled_login(login: &str, at: NaiveDateTime) -> String {
    let stamp = if at.nanosecond() / 1_000 == 0 {
        at.format("%Y-%m-%dT%H:%M:%S")
    } else {
        at.format("%Y-%m-%dT%H:%M:%S%.6f")
    };
    format!("{login}-disabled-{stamp}")
}

/// Copy of `source` renamed to `login`, leaving everything else as it was.
pub fn renamed_vgroup(source: &VgroupDetail, login: &str) -> VgroupDetail {
    let mut renamed = source.clone();
    renamed.vgroup.login = login.to_string();
    renamed
}

/// Insert request for the copy of `source` under `destination`. The tariff
/// is cleared and assigned separately once the copy exists.
pub fn migrated_vgroup(source: &VgroupDetail, destination: &Agent) -> VgroupDetail {
    let mut created = source.clone();
    created.vgroup.vgroup_id = 0;
    created.vgroup.agent_id = destination.id;
    created.vgroup.tariff_id = 0;
    created.vgroup.uid = None;
    created.agent_name = Some(destination.name.clone());
    created
}

pub struct VgroupMigrator<'a> {
    destination: Agent,
    tariffs: &'a TariffCloner,
}

impl<'a> VgroupMigrator<'a> {
    pub fn new(destination: Agent, tariffs: &'a TariffCloner) -> Self {
        Self {
            destination,
            tariffs,
        }
    }

    pub fn destination(&self) -> &Agent {
        &self.destination
    }

    /// Migrates one vgroup and writes its report row. For a migrated vgroup
    /// the row is written as soon as the copy exists.
    pub async fn migrate(
        &self,
        gw: &mut dyn RpcGateway,
        source: &VgroupSummary,
        report: &mut dyn ReportSink,
    ) -> ToolResult<MigrationOutcome> {
        let source_id = source.vgroup_id;
        info!(vgid = source_id, "Migrating vgroup.");
        let mut entry = MigrationEntry {
            source_vgroup_id: source_id,
            source_agent_id: source.agent_id,
            source_tariff_id: source.tariff_id,
            outcome: MigrationOutcome::AlreadyThere,
        };

        if source.agent_id == self.destination.id {
            info!(vgid = source_id, "Vgroup is at the destination agent already.");
            report.write_row(&entry.to_row())?;
            return Ok(entry.outcome);
        }

        let detail = vgroup_service::get_vgroup(gw, source_id).await?;
        if !detail.is_migratable() {
            warn!(
                vgid = source_id,
                reasons = ?detail.unsupported_reasons(),
                "Unsupported vgroup spotted. Skipping."
            );
            entry.outcome = MigrationOutcome::Unsupported;
            report.write_row(&entry.to_row())?;
            return Ok(entry.outcome);
        }

        let mut current = tariff_service::get_tariff(gw, source.tariff_id).await?;
        if current.len() != 1 {
            return Err(ToolError::Inconsistent(format!(
                "tariff {} of vgroup {source_id} resolved to {} records",
                source.tariff_id,
                current.len()
            )));
        }
        let current = current.remove(0);
        info!(vgid = source_id, tar_id = current.id(), "Current tariff found.");

        let Some(equal) = self.tariffs.find_equal(&current) else {
            warn!(
                vgid = source_id,
                tar_id = current.id(),
                "Unable to migrate vgroup. Tariff does not have a suitable analog."
            );
            entry.outcome = MigrationOutcome::NoEquivalentTariff;
            report.write_row(&entry.to_row())?;
            return Ok(entry.outcome);
        };
        let equal_tariff_id = equal.id();
        info!(
            vgid = source_id,
            tar_id = current.id(),
            equal_tar_id = equal_tariff_id,
            "Equal tariff found."
        );

        let agent_id = self.destination.id;
        vgroup_service::disable_vgroup(gw, source_id, agent_id).await?;
        info!(vgid = source_id, "Vgroup disabled.");

        // Saved whole, so built from the record as it stands after the hold.
        let held = vgroup_service::get_vgroup(gw, source_id).await?;
        let hidden_login = disabled_login(&detail.vgroup.login, Local::now().naive_local());
        vgroup_service::save_vgroup(gw, &renamed_vgroup(&held, &hidden_login)).await?;
        info!(vgid = source_id, login = %hidden_login, "Vgroup login renamed.");

        let result_vgroup_id =
            vgroup_service::save_vgroup(gw, &migrated_vgroup(&detail, &self.destination)).await?;
        info!(vgid = result_vgroup_id, source_vgid = source_id, "New vgroup created.");
        entry.outcome = MigrationOutcome::Migrated {
            equal_tariff_id,
            result_vgroup_id,
        };
        report.write_row(&entry.to_row())?;

        vgroup_service::assign_tariff(gw, result_vgroup_id, agent_id, equal_tariff_id).await?;
        info!(vgid = result_vgroup_id, tar_id = equal_tariff_id, "Tariff assigned.");

        vgroup_service::unblock_vgroup(gw, result_vgroup_id, agent_id).await?;
        info!(
            vgid = result_vgroup_id,
            source_vgid = source_id,
            "Vgroup migrated to the destination agent."
        );
        Ok(entry.outcome)
    }

    /// Migrates `sources` in order; the first remote error ends the run.
    pub async fn migrate_batch(
        &self,
        gw: &mut dyn RpcGateway,
        sources: &[VgroupSummary],
        report: &mut dyn ReportSink,
    ) -> ToolResult<MigrationSummary> {
        let mut summary = MigrationSummary::default();
        for source in sources {
            let outcome = self.migrate(gw, source, report).await?;
            summary.record(&outcome);
        }
        report.finish()?;
        info!(
            already_there = summary.already_there,
            unsupported = summary.unsupported,
            no_equivalent_tariff = summary.no_equivalent_tariff,
            migrated = summary.migrated,
            "Vgroup migration finished."
        );
        Ok(summary)
    }
}
