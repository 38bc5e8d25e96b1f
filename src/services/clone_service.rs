//! Tariff equivalence and cloning.
//!
//! A [`TariffCloner`] holds a snapshot of the tariffs already present in a
//! destination category. For every source tariff it either finds an
//! equivalent tariff in that snapshot or creates a copy of the source in the
//! destination category. Equivalence means equal rate shapes and equal
//! commercial terms; identity, naming and bookkeeping fields are ignored,
//! except that a configured name prefix must link the two display names.

use tracing::{info, warn};

use crate::error::{ToolError, ToolResult};
use crate::models::{RecordFilter, TariffRecord};
use crate::report::{ReportRow, ReportSink};
use crate::rpc::RpcGateway;
use crate::services::tariff_service;

/// What happened to one source tariff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneOutcome {
    /// The source already belongs to the destination category.
    AlreadyTarget { source_id: i64 },
    /// An equivalent tariff exists; nothing was created.
    Equal { source_id: i64, equal_id: i64 },
    Cloned { source_id: i64, cloned_id: i64 },
}

impl CloneOutcome {
    pub fn source_id(&self) -> i64 {
        match *self {
            CloneOutcome::AlreadyTarget { source_id }
            | CloneOutcome::Equal { source_id, .. }
            | CloneOutcome::Cloned { source_id, .. } => source_id,
        }
    }

    pub fn equal_id(&self) -> Option<i64> {
        match *self {
            CloneOutcome::AlreadyTarget { source_id } => Some(source_id),
            CloneOutcome::Equal { equal_id, .. } => Some(equal_id),
            CloneOutcome::Cloned { .. } => None,
        }
    }

    pub fn cloned_id(&self) -> Option<i64> {
        match *self {
            CloneOutcome::Cloned { cloned_id, .. } => Some(cloned_id),
            _ => None,
        }
    }

    pub fn to_row(&self) -> ReportRow {
        ReportRow::new()
            .field("source_tar_id", self.source_id())
            .optional("equal_tar_id", self.equal_id())
            .optional("cloned_tar_id", self.cloned_id())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CloneSummary {
    pub already_target: usize,
    pub equal: usize,
    pub cloned: usize,
}

impl CloneSummary {
    fn record(&mut self, outcome: &CloneOutcome) {
        match outcome {
            CloneOutcome::AlreadyTarget { .. } => self.already_target += 1,
            CloneOutcome::Equal { .. } => self.equal += 1,
            CloneOutcome::Cloned { .. } => self.cloned += 1,
        }
    }
}

pub struct TariffCloner {
    target_category: i64,
    prefix: Option<String>,
    current_tariffs: Vec<TariffRecord>,
}

impl TariffCloner {
    pub fn new(
        target_category: i64,
        prefix: Option<String>,
        current_tariffs: Vec<TariffRecord>,
    ) -> Self {
        Self {
            target_category,
            prefix,
            current_tariffs,
        }
    }

    /// Fetches the destination category once and keeps it for the whole run.
    pub async fn load(
        gw: &mut dyn RpcGateway,
        target_category: i64,
        prefix: Option<String>,
    ) -> ToolResult<Self> {
        if target_category <= 0 {
            return Err(ToolError::InvalidArguments(format!(
                "destination tariff type must be positive, got {target_category}"
            )));
        }
        let current =
            tariff_service::fetch_tariffs(gw, &RecordFilter::default(), Some(target_category))
                .await?;
        info!(
            count = current.len(),
            tariff_type = target_category,
            "Tariffs with destination type fetched."
        );
        Ok(Self::new(target_category, prefix, current))
    }

    pub fn target_category(&self) -> i64 {
        self.target_category
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn current_tariffs(&self) -> &[TariffRecord] {
        &self.current_tariffs
    }

    pub fn is_supported(&self, tariff: &TariffRecord) -> bool {
        tariff.is_supported()
    }

    /// Whether `candidate` offers the same terms as `source`. With a prefix
    /// configured, the candidate must also be named `prefix + source name`,
    /// which makes the relation one-directional.
    pub fn compare(&self, source: &TariffRecord, candidate: &TariffRecord) -> bool {
        if source.size_shapes != candidate.size_shapes
            || source.time_shapes != candidate.time_shapes
        {
            return false;
        }
        if let Some(prefix) = &self.prefix {
            let expected = format!("{prefix}{}", source.tariff.display_name);
            if candidate.tariff.display_name != expected {
                return false;
            }
        }
        source.tariff.same_terms(&candidate.tariff)
    }

    /// The record submitted to create a copy of `source` in the destination
    /// category. Shapes are never carried over.
    pub fn build_clone_request(&self, source: &TariffRecord) -> TariffRecord {
        let mut tariff = source.tariff.clone();
        tariff.id = 0;
        tariff.category_type = self.target_category;
        tariff.uuid = None;
        tariff.sale_dictionary_id = None;
        if let Some(prefix) = &self.prefix {
            tariff.display_name = format!("{prefix}{}", tariff.display_name);
        }
        TariffRecord {
            tariff,
            size_shapes: Vec::new(),
            time_shapes: Vec::new(),
            extra: Default::default(),
        }
    }

    pub async fn clone_tariff(
        &self,
        gw: &mut dyn RpcGateway,
        source: &TariffRecord,
    ) -> ToolResult<i64> {
        let request = self.build_clone_request(source);
        tariff_service::save_tariff(gw, &request).await
    }

    /// First supported equivalent in fetch order. Equivalent but unsupported
    /// candidates are passed over.
    pub fn find_equal(&self, source: &TariffRecord) -> Option<&TariffRecord> {
        for candidate in &self.current_tariffs {
            if !self.compare(source, candidate) {
                continue;
            }
            if self.is_supported(candidate) {
                return Some(candidate);
            }
            info!(
                tar_id = candidate.id(),
                reasons = ?candidate.unsupported_reasons(),
                "Skipping unsupported tariff."
            );
        }
        None
    }

    /// Handles one source tariff. An unsupported source is an error.
    pub async fn process(
        &self,
        gw: &mut dyn RpcGateway,
        source: &TariffRecord,
    ) -> ToolResult<CloneOutcome> {
        let source_id = source.id();
        if source.category_type() == self.target_category {
            info!(tar_id = source_id, "Skipping tariff. Tariff has destination type already.");
            return Ok(CloneOutcome::AlreadyTarget { source_id });
        }

        if !self.is_supported(source) {
            warn!(
                tar_id = source_id,
                reasons = ?source.unsupported_reasons(),
                "Unsupported tariff spotted."
            );
            return Err(ToolError::UnsupportedTariff(source_id));
        }

        if let Some(equal) = self.find_equal(source) {
            info!(
                tar_id = source_id,
                equal_tar_id = equal.id(),
                "Skipping tariff. Equal tariff was found."
            );
            return Ok(CloneOutcome::Equal {
                source_id,
                equal_id: equal.id(),
            });
        }

        info!(tar_id = source_id, "Tariff will be cloned.");
        let cloned_id = self.clone_tariff(gw, source).await?;
        info!(tar_id = source_id, cloned_tar_id = cloned_id, "Tariff cloned.");
        Ok(CloneOutcome::Cloned {
            source_id,
            cloned_id,
        })
    }

    /// Processes `sources` in order, writing each outcome to `report` as soon
    /// as it is known. Stops at the first error; rows already written stay.
    pub async fn process_batch(
        &self,
        gw: &mut dyn RpcGateway,
        sources: &[TariffRecord],
        report: &mut dyn ReportSink,
    ) -> ToolResult<CloneSummary> {
        let mut summary = CloneSummary::default();
        for source in sources {
            let outcome = self.process(gw, source).await?;
            report.write_row(&outcome.to_row())?;
            summary.record(&outcome);
        }
        report.finish()?;
        info!(
            already_target = summary.already_target,
            equal = summary.equal,
            cloned = summary.cloned,
            "Tariff cloning finished."
        );
        Ok(summary)
    }
}
