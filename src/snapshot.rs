//! Polling of the published network-upgrade variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::migration::MigrationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChrysalisVariables {
    pub snapshot: bool,
}

type Validator = fn(&serde_json::Value) -> Result<(), String>;

const VALIDATORS: &[Validator] = &[is_object, has_snapshot_flag];

fn is_object(value: &serde_json::Value) -> Result<(), String> {
    if value.is_object() {
        Ok(())
    } else {
        Err("payload is not an object".into())
    }
}

fn has_snapshot_flag(value: &serde_json::Value) -> Result<(), String> {
    match value.get("snapshot") {
        Some(serde_json::Value::Bool(_)) => Ok(()),
        Some(_) => Err("`snapshot` is not a boolean".into()),
        None => Err("`snapshot` is missing".into()),
    }
}

/// Runs every validator over `payload` before deserialising it.
pub fn parse_variables(payload: serde_json::Value) -> Result<ChrysalisVariables, MigrationError> {
    for validator in VALIDATORS {
        validator(&payload).map_err(MigrationError::ProtocolViolation)?;
    }
    Ok(serde_json::from_value(payload)?)
}

pub async fn fetch_chrysalis_variables(
    http: &reqwest::Client,
    endpoint: &str,
    timeout: Duration,
) -> Result<ChrysalisVariables, MigrationError> {
    let operation = "fetch chrysalis variables";
    let fetch = async {
        let response = http
            .get(endpoint)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| MigrationError::Network {
                operation,
                message: err.to_string(),
            })?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|err| MigrationError::Network {
                operation,
                message: err.to_string(),
            })
    };
    let payload = tokio::time::timeout(timeout, fetch)
        .await
        .map_err(|_| MigrationError::Timeout {
            operation,
            after: timeout,
        })??;
    parse_variables(payload)
}

/// Fetches the variables every `interval` and hands each outcome to
/// `on_update`. The task runs until aborted.
pub fn poll_chrysalis_snapshot<F>(
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    interval: Duration,
    on_update: F,
) -> JoinHandle<()>
where
    F: Fn(Result<ChrysalisVariables, MigrationError>) + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let outcome = fetch_chrysalis_variables(&http, &endpoint, timeout).await;
            if let Err(err) = &outcome {
                tracing::warn!(
                    target: "legacy_migration",
                    event = "chrysalis_poll_failed",
                    error = %err,
                    "could not refresh network upgrade variables"
                );
            }
            on_update(outcome);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_boolean_snapshot() {
        let vars = parse_variables(json!({ "snapshot": true, "extra": 1 })).unwrap();
        assert!(vars.snapshot);
    }

    #[test]
    fn rejects_malformed_payloads() {
        for payload in [json!([]), json!({}), json!({ "snapshot": "yes" })] {
            assert!(matches!(
                parse_variables(payload),
                Err(MigrationError::ProtocolViolation(_))
            ));
        }
    }
}
