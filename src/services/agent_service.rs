use tracing::info;

use crate::error::{ToolError, ToolResult};
use crate::models::Agent;
use crate::rpc::{self, RpcGateway};

pub async fn get_agents(gw: &mut dyn RpcGateway) -> ToolResult<Vec<Agent>> {
    let values = gw.call(rpc::GET_AGENTS, &[]).await?;
    let agents = values
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Agent>, _>>()?;
    info!(count = agents.len(), "Agents fetched.");
    Ok(agents)
}

pub async fn find_agent(gw: &mut dyn RpcGateway, agent_id: i64) -> ToolResult<Agent> {
    get_agents(gw)
        .await?
        .into_iter()
        .find(|agent| agent.id == agent_id)
        .ok_or(ToolError::AgentNotFound(agent_id))
}
