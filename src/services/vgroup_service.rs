use serde_json::json;
use tracing::{debug, info};

use crate::error::{ToolError, ToolResult};
use crate::models::{RecordFilter, VgroupDetail, VgroupSummary};
use crate::rpc::{self, RpcGateway};

/// `blkreq` code for an administrative hold.
pub const BLOCK_ADMINISTRATIVE: i64 = 10;
/// `blkreq` code that clears any block.
pub const BLOCK_NONE: i64 = 0;

/// Selects vgroups with one `getVgroups` call, applying id ranges the server
/// was not asked for on the client. Listing order is kept.
pub async fn fetch_vgroups(
    gw: &mut dyn RpcGateway,
    filter: &RecordFilter,
) -> ToolResult<Vec<VgroupSummary>> {
    let flt = filter.vgroup_request();
    debug!(filter = %flt, "Requesting vgroups.");
    let values = gw.call(rpc::GET_VGROUPS, &[("flt", flt)]).await?;

    let mut vgroups = Vec::with_capacity(values.len());
    for value in values {
        let vgroup: VgroupSummary = serde_json::from_value(value)?;
        if filter.matches_vgroup(&vgroup) {
            vgroups.push(vgroup);
        }
    }
    info!(count = vgroups.len(), "Vgroups fetched.");
    Ok(vgroups)
}

/// Full vgroup record. Anything other than exactly one result is treated as
/// inconsistent remote data.
pub async fn get_vgroup(gw: &mut dyn RpcGateway, vgroup_id: i64) -> ToolResult<VgroupDetail> {
    let mut values = gw.call(rpc::GET_VGROUP, &[("id", json!(vgroup_id))]).await?;
    if values.len() != 1 {
        return Err(ToolError::Inconsistent(format!(
            "getVgroup({vgroup_id}) returned {} records",
            values.len()
        )));
    }
    Ok(serde_json::from_value(values.remove(0))?)
}

/// Submits a vgroup with `insupdVgroup`. A zero `vgid` creates a new vgroup;
/// the returned id is the created or updated one.
pub async fn save_vgroup(gw: &mut dyn RpcGateway, vgroup: &VgroupDetail) -> ToolResult<i64> {
    let val = serde_json::to_value(vgroup)?;
    let values = gw
        .call(rpc::SAVE_VGROUP, &[("isInsert", json!(0)), ("val", val)])
        .await?;
    Ok(rpc::returned_id(rpc::SAVE_VGROUP, &values)?)
}

async fn set_block(
    gw: &mut dyn RpcGateway,
    vgroup_id: i64,
    agent_id: i64,
    block: i64,
) -> ToolResult<()> {
    let val = json!({"recordid": 0, "vgid": vgroup_id, "id": agent_id, "blkreq": block});
    gw.call(rpc::SET_BLOCK, &[("val", val)]).await?;
    Ok(())
}

/// Puts the vgroup on administrative hold on behalf of `agent_id`.
pub async fn disable_vgroup(
    gw: &mut dyn RpcGateway,
    vgroup_id: i64,
    agent_id: i64,
) -> ToolResult<()> {
    set_block(gw, vgroup_id, agent_id, BLOCK_ADMINISTRATIVE).await
}

pub async fn unblock_vgroup(
    gw: &mut dyn RpcGateway,
    vgroup_id: i64,
    agent_id: i64,
) -> ToolResult<()> {
    set_block(gw, vgroup_id, agent_id, BLOCK_NONE).await
}

/// Schedules `tariff_id` for the vgroup through a tariff assignment record.
pub async fn assign_tariff(
    gw: &mut dyn RpcGateway,
    vgroup_id: i64,
    agent_id: i64,
    tariff_id: i64,
) -> ToolResult<()> {
    let val = json!({"recordid": 0, "vgid": vgroup_id, "id": agent_id, "tarid": tariff_id});
    gw.call(rpc::ASSIGN_TARIFF, &[("val", val)]).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBilling;

    #[tokio::test]
    async fn test_fetch_filters_on_server_and_client() {
        let mut billing = FakeBilling::new();
        billing.add_vgroup(1, 7, 3, "alice");
        billing.add_vgroup(2, 7, 4, "bob");
        billing.add_vgroup(3, 8, 4, "carol");
        billing.add_vgroup(4, 7, 5, "dave");

        let filter = RecordFilter {
            agent_id: Some(7),
            from_tar_id: Some(4),
            ..Default::default()
        };
        let vgroups = fetch_vgroups(&mut billing, &filter).await.unwrap();
        let ids: Vec<i64> = vgroups.iter().map(|v| v.vgroup_id).collect();
        assert_eq!(ids, vec![2, 4]);
        assert_eq!(billing.last_args(rpc::GET_VGROUPS)[0].1, json!({"agentid": 7}));
    }

    #[tokio::test]
    async fn test_get_vgroup_requires_one_record() {
        let mut billing = FakeBilling::new();
        billing.add_vgroup(1, 7, 3, "alice");

        assert_eq!(get_vgroup(&mut billing, 1).await.unwrap().vgroup.login, "alice");
        assert!(matches!(
            get_vgroup(&mut billing, 2).await,
            Err(ToolError::Inconsistent(_))
        ));
    }

    #[tokio::test]
    async fn test_block_requests() {
        let mut billing = FakeBilling::new();
        billing.add_vgroup(1, 7, 3, "alice");

        disable_vgroup(&mut billing, 1, 9).await.unwrap();
        assert_eq!(
            billing.last_args(rpc::SET_BLOCK)[0].1,
            json!({"recordid": 0, "vgid": 1, "id": 9, "blkreq": 10})
        );
        assert_eq!(billing.detail(1).unwrap().vgroup.blocked, 10);

        unblock_vgroup(&mut billing, 1, 9).await.unwrap();
        assert_eq!(billing.detail(1).unwrap().vgroup.blocked, 0);
    }

    #[tokio::test]
    async fn test_assign_tariff() {
        let mut billing = FakeBilling::new();
        billing.add_vgroup(1, 7, 3, "alice");

        assign_tariff(&mut billing, 1, 7, 42).await.unwrap();
        assert_eq!(billing.detail(1).unwrap().vgroup.tariff_id, 42);
    }
}
