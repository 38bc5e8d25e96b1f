use serde_json::json;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::error::ToolResult;
use crate::models::{RecordFilter, TariffListItem, TariffRecord};
use crate::rpc::{self, RpcGateway};
use crate::services::vgroup_service;

/// Every record `getTarif` returns for one id.
pub async fn get_tariff(gw: &mut dyn RpcGateway, tariff_id: i64) -> ToolResult<Vec<TariffRecord>> {
    let values = gw.call(rpc::GET_TARIFF, &[("id", json!(tariff_id))]).await?;
    let records = values
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<TariffRecord>, _>>()?;
    Ok(records)
}

async fn list_tariff_ids(gw: &mut dyn RpcGateway) -> ToolResult<Vec<i64>> {
    let values = gw.call(rpc::GET_TARIFFS, &[]).await?;
    let mut ids = Vec::with_capacity(values.len());
    for value in values {
        let item: TariffListItem = serde_json::from_value(value)?;
        ids.push(item.id);
    }
    Ok(ids)
}

/// Selects tariffs by `filter`.
///
/// Vgroup criteria select the tariffs assigned to matching vgroups; without
/// them the tariff id range is applied to the full listing. Ids that do not
/// resolve to exactly one tariff are dropped. `tariff_type` narrows the result
/// to one category.
pub async fn fetch_tariffs(
    gw: &mut dyn RpcGateway,
    filter: &RecordFilter,
    tariff_type: Option<i64>,
) -> ToolResult<Vec<TariffRecord>> {
    let tariff_ids: Vec<i64> = if filter.selects_by_vgroup() {
        let vgroups = vgroup_service::fetch_vgroups(gw, filter).await?;
        let ids: BTreeSet<i64> = vgroups.iter().map(|v| v.tariff_id).collect();
        ids.into_iter().collect()
    } else if let Some(tariff_id) = filter.single_tariff_id() {
        vec![tariff_id]
    } else {
        list_tariff_ids(gw)
            .await?
            .into_iter()
            .filter(|id| filter.matches_tariff_id(*id))
            .collect()
    };
    debug!(count = tariff_ids.len(), "Resolving selected tariff ids.");

    let mut tariffs = Vec::new();
    for tariff_id in tariff_ids {
        let mut records = get_tariff(gw, tariff_id).await?;
        if records.len() != 1 {
            warn!(
                tar_id = tariff_id,
                found = records.len(),
                "Tariff did not resolve to a single record. Skipping."
            );
            continue;
        }
        let record = records.remove(0);
        if tariff_type.is_some_and(|t| record.category_type() != t) {
            continue;
        }
        tariffs.push(record);
    }
    info!(count = tariffs.len(), tariff_type = ?tariff_type, "Tariffs fetched.");
    Ok(tariffs)
}

/// Submits a tariff with `insupdTarif`; returns the id the server reports.
pub async fn save_tariff(gw: &mut dyn RpcGateway, tariff: &TariffRecord) -> ToolResult<i64> {
    let val = serde_json::to_value(tariff)?;
    let values = gw
        .call(rpc::SAVE_TARIFF, &[("isInsert", json!(0)), ("val", val)])
        .await?;
    Ok(rpc::returned_id(rpc::SAVE_TARIFF, &values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeBilling, tariff};

    #[tokio::test]
    async fn test_fetch_by_range_and_type() {
        let mut billing = FakeBilling::new();
        billing.add_tariff(tariff(1, 1, "A"));
        billing.add_tariff(tariff(2, 2, "B"));
        billing.add_tariff(tariff(3, 1, "C"));
        billing.add_tariff(tariff(4, 1, "D"));

        let filter = RecordFilter {
            from_tar_id: Some(2),
            ..Default::default()
        };
        let tariffs = fetch_tariffs(&mut billing, &filter, Some(1)).await.unwrap();
        let ids: Vec<i64> = tariffs.iter().map(TariffRecord::id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_single_id_skips_listing() {
        let mut billing = FakeBilling::new();
        billing.add_tariff(tariff(5, 1, "A"));

        let filter = RecordFilter {
            from_tar_id: Some(5),
            to_tar_id: Some(5),
            ..Default::default()
        };
        let tariffs = fetch_tariffs(&mut billing, &filter, None).await.unwrap();
        assert_eq!(tariffs.len(), 1);
        assert_eq!(billing.calls_to(rpc::GET_TARIFFS), 0);
        assert_eq!(billing.calls_to(rpc::GET_TARIFF), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_dropped() {
        let mut billing = FakeBilling::new();
        let filter = RecordFilter {
            from_tar_id: Some(9),
            to_tar_id: Some(9),
            ..Default::default()
        };
        assert!(fetch_tariffs(&mut billing, &filter, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vgroup_criteria_select_assigned_tariffs() {
        let mut billing = FakeBilling::new();
        billing.add_tariff(tariff(1, 1, "A"));
        billing.add_tariff(tariff(2, 1, "B"));
        billing.add_tariff(tariff(3, 1, "C"));
        billing.add_vgroup(10, 7, 3, "alice");
        billing.add_vgroup(11, 7, 1, "bob");
        billing.add_vgroup(12, 8, 2, "carol");
        billing.add_vgroup(13, 7, 3, "dave");

        let filter = RecordFilter {
            agent_id: Some(7),
            ..Default::default()
        };
        let tariffs = fetch_tariffs(&mut billing, &filter, None).await.unwrap();
        let ids: Vec<i64> = tariffs.iter().map(TariffRecord::id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_save_returns_new_id() {
        let mut billing = FakeBilling::new();
        let mut record = tariff(0, 2, "New");
        record.tariff.uuid = None;
        let id = save_tariff(&mut billing, &record).await.unwrap();
        assert_eq!(billing.tariff(id).unwrap().tariff.display_name, "New");
    }
}
