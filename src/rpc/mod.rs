//! Remote procedure calls against the LANBilling SOAP API.
//!
//! [`RpcGateway`] is the seam the services talk to. The production
//! implementation is a [`ReauthGateway`] wrapped around a [`SoapSession`];
//! tests substitute an in-memory billing fake.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod reauth;
pub mod session;
pub mod soap;

pub use reauth::ReauthGateway;
pub use session::SoapSession;

pub const LOGIN: &str = "Login";
pub const LOGOUT: &str = "Logout";
pub const GET_TARIFFS: &str = "getTarifs";
pub const GET_TARIFF: &str = "getTarif";
pub const SAVE_TARIFF: &str = "insupdTarif";
pub const GET_VGROUPS: &str = "getVgroups";
pub const GET_VGROUP: &str = "getVgroup";
pub const SAVE_VGROUP: &str = "insupdVgroup";
pub const GET_AGENTS: &str = "getAgents";
pub const SET_BLOCK: &str = "insBlkRasp";
pub const ASSIGN_TARIFF: &str = "insTarRasp";

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Remote fault [{code}]: {message}")]
    Fault { code: String, message: String },
    #[error("Session expired: {0}")]
    SessionExpired(String),
    #[error("Failed to encode request: {0}")]
    Encode(String),
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("Unexpected result of {method}: {detail}")]
    UnexpectedResult { method: String, detail: String },
}

/// Named arguments of one remote call, in wire order.
pub type RpcArgs<'a> = [(&'a str, Value)];

/// Dispatches named remote operations.
///
/// The result holds every `ret` element of the response: listings return
/// one entry per record, `insupd*` calls return a single id.
#[async_trait]
pub trait RpcGateway: Send {
    async fn call(&mut self, method: &str, args: &RpcArgs<'_>) -> Result<Vec<Value>, RpcError>;
}

/// A transport that owns an authenticated session.
#[async_trait]
pub trait SessionTransport: Send {
    async fn login(&mut self) -> Result<(), RpcError>;

    async fn logout(&mut self) -> Result<(), RpcError>;

    /// Runs one call on the current session without any retry.
    async fn invoke(&mut self, method: &str, args: &RpcArgs<'_>) -> Result<Vec<Value>, RpcError>;
}

/// Reads the id returned by an `insupd*`-style call.
pub fn returned_id(method: &str, values: &[Value]) -> Result<i64, RpcError> {
    let unexpected = |detail: String| RpcError::UnexpectedResult {
        method: method.to_string(),
        detail,
    };
    let value = match values {
        [value] => value,
        _ => return Err(unexpected(format!("expected one value, got {}", values.len()))),
    };
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| unexpected(format!("not an integer id: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| unexpected(format!("not an integer id: {s:?}"))),
        other => Err(unexpected(format!("not an integer id: {other}"))),
    }
}
