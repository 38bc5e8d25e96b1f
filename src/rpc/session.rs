use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

use super::{LOGIN, LOGOUT, RpcArgs, RpcError, SessionTransport, soap};
use crate::config::LanbillingConfig;

const REQUEST_TIMEOUT_SECONDS: u64 = 300;

/// SOAP transport bound to one billing endpoint.
///
/// The session itself lives in the client's cookie store, so every call made
/// after `login` reuses it until `logout` or until the server drops it.
pub struct SoapSession {
    client: Client,
    endpoint: String,
    login: String,
    password: String,
}

impl SoapSession {
    /// Builds the HTTP client and resolves the endpoint. Does not log in.
    pub async fn connect(config: &LanbillingConfig) -> Result<Self, RpcError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        let endpoint = match &config.soap_proxy_address {
            Some(address) => address.clone(),
            None => Self::endpoint_from_wsdl(&client, &config.wsdl_url).await?,
        };
        info!(endpoint = %endpoint, "Resolved billing SOAP endpoint.");

        Ok(Self {
            client,
            endpoint,
            login: config.login.clone(),
            password: config.password.clone(),
        })
    }

    async fn endpoint_from_wsdl(client: &Client, wsdl_url: &str) -> Result<String, RpcError> {
        info!(wsdl_url = %wsdl_url, "Fetching WSDL.");
        let wsdl = client
            .get(wsdl_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        soap::wsdl_location(&wsdl)?.ok_or_else(|| {
            RpcError::Decode(format!("WSDL at {wsdl_url} declares no service address"))
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SessionTransport for SoapSession {
    async fn login(&mut self) -> Result<(), RpcError> {
        let args = [
            ("login", json!(self.login)),
            ("pass", json!(self.password)),
        ];
        self.invoke(LOGIN, &args).await?;
        info!(login = %self.login, "Logged in to billing.");
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), RpcError> {
        self.invoke(LOGOUT, &[]).await?;
        info!("Logged out from billing.");
        Ok(())
    }

    async fn invoke(&mut self, method: &str, args: &RpcArgs<'_>) -> Result<Vec<Value>, RpcError> {
        let body = soap::encode_request(method, args)?;
        debug!(method, "Sending SOAP request.");

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{}#{}\"", soap::API_NS, method))
            .body(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        // Faults arrive with HTTP 500, so the envelope is decoded before the
        // status is looked at.
        match soap::decode_response(&text) {
            Err(RpcError::Decode(detail)) if !status.is_success() => Err(RpcError::Fault {
                code: status.as_u16().to_string(),
                message: detail,
            }),
            result => result,
        }
    }
}
