//! HTTP client for the migrator contract's node API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::MigrationConfig;
use crate::migration::ports::{BalanceOracle, OffLedgerGateway, RequestReceipt};
use crate::migration::MigrationError;

const CONTRACT_NAME: &str = "legacymigration";
const BALANCE_FUNCTION: &str = "getMigratableBalance";
const ADDRESS_ARGUMENT_KEY: &str = "0x61";

#[derive(Debug, Deserialize)]
struct CallViewResponse {
    #[serde(rename = "Items", default)]
    items: Vec<CallViewItem>,
}

#[derive(Debug, Deserialize)]
struct CallViewItem {
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Error", default)]
    error: String,
}

#[derive(Debug, Clone)]
pub struct MigratorClient {
    http: reqwest::Client,
    base_url: String,
    chain_id: String,
    receipt_wait_seconds: u32,
    request_timeout: Duration,
}

impl MigratorClient {
    pub fn new(config: &MigrationConfig) -> Result<Self, MigrationError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| network("build http client", &err))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chain_id: config.chain_id.clone(),
            receipt_wait_seconds: config.receipt_wait_seconds,
            request_timeout: config.request_timeout,
        })
    }

    fn chain_url(&self, path: &str) -> String {
        format!("{}/v1/chains/{}/{}", self.base_url, self.chain_id, path)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, MigrationError> {
        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                MigrationError::Timeout {
                    operation,
                    after: self.request_timeout,
                }
            } else {
                network(operation, &err)
            }
        })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body: ApiError = response.json().await.unwrap_or_default();
            return Err(MigrationError::RequestRejected {
                status: Some(status.as_u16()),
                message: format!("Message: {}, Error: {}", body.message, body.error),
            });
        }
        Ok(response)
    }
}

fn network(operation: &'static str, err: &reqwest::Error) -> MigrationError {
    MigrationError::Network {
        operation,
        message: err.to_string(),
    }
}

/// Reads the view result as a little-endian u64 from its first 8 bytes.
pub fn decode_balance(value: &str) -> Result<u64, MigrationError> {
    let bytes = hex::decode(value.strip_prefix("0x").unwrap_or(value))
        .map_err(|err| MigrationError::Encoding(format!("balance: {err}")))?;
    let mut buf = [0_u8; 8];
    let take = bytes.len().min(8);
    buf[..take].copy_from_slice(&bytes[..take]);
    Ok(u64::from_le_bytes(buf))
}

#[async_trait]
impl BalanceOracle for MigratorClient {
    async fn migratable_balance(&self, address_hex: &str) -> Result<u64, MigrationError> {
        let body = json!({
            "functionName": BALANCE_FUNCTION,
            "contractName": CONTRACT_NAME,
            "arguments": { "Items": [{ "key": ADDRESS_ARGUMENT_KEY, "value": address_hex }] },
        });
        let response = self
            .send(
                "fetch migratable balance",
                self.http.post(self.chain_url("callview")).json(&body),
            )
            .await?;
        let view: CallViewResponse = response
            .json()
            .await
            .map_err(|err| network("decode migratable balance", &err))?;
        match view.items.first() {
            Some(item) => decode_balance(&item.value),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl OffLedgerGateway for MigratorClient {
    async fn submit_off_ledger_request(&self, request_hex: &str) -> Result<(), MigrationError> {
        let body = json!({ "request": request_hex, "chainId": self.chain_id });
        self.send(
            "submit off-ledger request",
            self.http
                .post(format!("{}/v1/requests/offledger", self.base_url))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn wait_for_receipt(&self, request_id: &str) -> Result<RequestReceipt, MigrationError> {
        let url = self.chain_url(&format!("requests/{request_id}/wait"));
        let response = self
            .send(
                "wait for request receipt",
                self.http.get(url).query(&[
                    ("timeoutSeconds", self.receipt_wait_seconds.to_string()),
                    ("waitForL1Confirmation", "true".to_string()),
                ]),
            )
            .await?;
        response
            .json()
            .await
            .map_err(|err| network("decode request receipt", &err))
    }
}
