use thiserror::Error;

use crate::config::ConfigError;
use crate::rpc::RpcError;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Unsupported tariff spotted (tar_id={0})")]
    UnsupportedTariff(i64),
    #[error("Inconsistent remote data: {0}")]
    Inconsistent(String),
    #[error("Unable to find the specified agent (id={0})")]
    AgentNotFound(i64),
    #[error("Report error: {0}")]
    Report(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ToolResult<T> = Result<T, ToolError>;
