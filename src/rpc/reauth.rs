use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::{RpcArgs, RpcError, RpcGateway, SessionTransport};

/// Gateway that opens the session on first use and, when the server reports
/// the session as expired, logs in again and repeats the same call once.
/// A second expiry on the retried call is returned to the caller.
pub struct ReauthGateway<T> {
    transport: T,
    logged_in: bool,
}

impl<T: SessionTransport> ReauthGateway<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            logged_in: false,
        }
    }

    pub async fn open(&mut self) -> Result<(), RpcError> {
        self.transport.login().await?;
        self.logged_in = true;
        Ok(())
    }

    /// Ends the session if one was opened. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), RpcError> {
        if !self.logged_in {
            return Ok(());
        }
        self.logged_in = false;
        self.transport.logout().await
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: SessionTransport> RpcGateway for ReauthGateway<T> {
    async fn call(&mut self, method: &str, args: &RpcArgs<'_>) -> Result<Vec<Value>, RpcError> {
        if !self.logged_in {
            self.open().await?;
        }
        match self.transport.invoke(method, args).await {
            Err(RpcError::SessionExpired(reason)) => {
                warn!(method, reason = %reason, "Billing session expired. Logging in again.");
                self.open().await?;
                info!(method, "Retrying call after re-login.");
                self.transport.invoke(method, args).await
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Transport that reports an expired session a fixed number of times.
    #[derive(Default)]
    struct FlakyTransport {
        expiries_left: usize,
        logins: usize,
        logouts: usize,
        invocations: Vec<String>,
    }

    #[async_trait]
    impl SessionTransport for FlakyTransport {
        async fn login(&mut self) -> Result<(), RpcError> {
            self.logins += 1;
            Ok(())
        }

        async fn logout(&mut self) -> Result<(), RpcError> {
            self.logouts += 1;
            Ok(())
        }

        async fn invoke(
            &mut self,
            method: &str,
            _args: &RpcArgs<'_>,
        ) -> Result<Vec<Value>, RpcError> {
            self.invocations.push(method.to_string());
            if self.expiries_left > 0 {
                self.expiries_left -= 1;
                return Err(RpcError::SessionExpired("error_auth".to_string()));
            }
            Ok(vec![json!("1")])
        }
    }

    #[tokio::test]
    async fn test_logs_in_lazily() {
        let mut gateway = ReauthGateway::new(FlakyTransport::default());
        gateway.call("getAgents", &[]).await.unwrap();
        gateway.call("getAgents", &[]).await.unwrap();
        assert_eq!(gateway.transport().logins, 1);
        assert_eq!(gateway.transport().invocations.len(), 2);
    }

    #[tokio::test]
    async fn test_retries_once_after_expiry() {
        let mut gateway = ReauthGateway::new(FlakyTransport {
            expiries_left: 1,
            ..Default::default()
        });
        let result = gateway.call("getVgroup", &[("id", json!(5))]).await.unwrap();
        assert_eq!(result, vec![json!("1")]);
        assert_eq!(gateway.transport().logins, 2);
        assert_eq!(gateway.transport().invocations, vec!["getVgroup", "getVgroup"]);
    }

    #[tokio::test]
    async fn test_second_expiry_propagates() {
        let mut gateway = ReauthGateway::new(FlakyTransport {
            expiries_left: 2,
            ..Default::default()
        });
        let result = gateway.call("getVgroup", &[]).await;
        assert!(matches!(result, Err(RpcError::SessionExpired(_))));
        assert_eq!(gateway.transport().invocations.len(), 2);
    }

    #[tokio::test]
    async fn test_other_faults_are_not_retried() {
        struct Failing;

        #[async_trait]
        impl SessionTransport for Failing {
            async fn login(&mut self) -> Result<(), RpcError> {
                Ok(())
            }
            async fn logout(&mut self) -> Result<(), RpcError> {
                Ok(())
            }
            async fn invoke(
                &mut self,
                _method: &str,
                _args: &RpcArgs<'_>,
            ) -> Result<Vec<Value>, RpcError> {
                Err(RpcError::Fault {
                    code: "Server".to_string(),
                    message: "boom".to_string(),
                })
            }
        }

        let mut gateway = ReauthGateway::new(Failing);
        assert!(matches!(
            gateway.call("getTarif", &[]).await,
            Err(RpcError::Fault { .. })
        ));
    }

    #[tokio::test]
    async fn test_close_only_after_open() {
        let mut gateway = ReauthGateway::new(FlakyTransport::default());
        gateway.close().await.unwrap();
        assert_eq!(gateway.transport().logouts, 0);

        gateway.call("getAgents", &[]).await.unwrap();
        gateway.close().await.unwrap();
        gateway.close().await.unwrap();
        assert_eq!(gateway.transport().logouts, 1);
    }
}
