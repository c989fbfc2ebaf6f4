#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use legacy_migration::migration::ports::{BalanceOracle, OffLedgerGateway};
use legacy_migration::migration::scanner::address_to_hex;
use legacy_migration::{MigrationConfig, MigrationError, MigratorClient};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the stub saw on the wire.
struct Captured {
    request_line: String,
    body: Value,
}

/// Serves exactly one HTTP exchange on a random local port.
async fn serve_once(
    status: u16,
    response: &'static str,
    delay: Duration,
) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut chunk = [0_u8; 4096];
        let header_end = loop {
            let read = socket.read(&mut chunk).await.unwrap();
            assert!(read > 0, "connection closed before headers");
            raw.extend_from_slice(&chunk[..read]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .map(|(_, value)| value.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        while raw.len() < header_end + content_length {
            let read = socket.read(&mut chunk).await.unwrap();
            assert!(read > 0, "connection closed before body");
            raw.extend_from_slice(&chunk[..read]);
        }

        tokio::time::sleep(delay).await;
        let reply = format!(
            "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{response}",
            response.len()
        );
        let _ = socket.write_all(reply.as_bytes()).await;
        let _ = socket.shutdown().await;

        let body = &raw[header_end..header_end + content_length];
        Captured {
            request_line: head.lines().next().unwrap_or_default().to_string(),
            body: if body.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(body).unwrap()
            },
        }
    });
    (base_url, handle)
}

fn client(base_url: String) -> (MigratorClient, MigrationConfig) {
    let config = MigrationConfig {
        base_url,
        request_timeout: Duration::from_millis(500),
        ..MigrationConfig::production()
    };
    (MigratorClient::new(&config).unwrap(), config)
}

#[tokio::test]
async fn balance_query_posts_callview_body() {
    let (base_url, server) = serve_once(
        200,
        r#"{"Items":[{"key":"0x61","value":"0x40420f0000000000"}]}"#,
        Duration::ZERO,
    )
    .await;
    let (client, config) = client(base_url);
    let address = address_to_hex(&"A".repeat(81));

    let balance = client.migratable_balance(&address).await.unwrap();
    assert_eq!(balance, 1_000_000);

    let seen = server.await.unwrap();
    assert_eq!(
        seen.request_line,
        format!("POST /v1/chains/{}/callview HTTP/1.1", config.chain_id)
    );
    assert_eq!(seen.body["functionName"], "getMigratableBalance");
    assert_eq!(seen.body["contractName"], "legacymigration");
    assert_eq!(seen.body["arguments"]["Items"][0]["key"], "0x61");
    assert_eq!(seen.body["arguments"]["Items"][0]["value"], address.as_str());
}

#[tokio::test]
async fn empty_view_result_reads_as_zero() {
    let (base_url, server) = serve_once(200, r#"{"Items":[]}"#, Duration::ZERO).await;
    let (client, _) = client(base_url);
    assert_eq!(client.migratable_balance("0x41").await.unwrap(), 0);
    server.await.unwrap();
}

#[tokio::test]
async fn client_error_status_is_a_final_rejection() {
    let (base_url, server) = serve_once(
        400,
        r#"{"Message":"invalid request","Error":"bad signature"}"#,
        Duration::ZERO,
    )
    .await;
    let (client, config) = client(base_url);

    let err = client
        .submit_off_ledger_request("0x01ab")
        .await
        .unwrap_err();
    match &err {
        MigrationError::RequestRejected { status, message } => {
            assert_eq!(*status, Some(400));
            assert_eq!(message, "Message: invalid request, Error: bad signature");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!err.is_retryable());

    let seen = server.await.unwrap();
    assert_eq!(seen.request_line, "POST /v1/requests/offledger HTTP/1.1");
    assert_eq!(seen.body["request"], "0x01ab");
    assert_eq!(seen.body["chainId"], config.chain_id.as_str());
}

#[tokio::test]
async fn server_error_status_can_be_retried() {
    let (base_url, server) = serve_once(503, "{}", Duration::ZERO).await;
    let (client, _) = client(base_url);
    let err = client.submit_off_ledger_request("0x01").await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::RequestRejected {
            status: Some(503),
            ..
        }
    ));
    assert!(err.is_retryable());
    server.await.unwrap();
}

#[tokio::test]
async fn receipt_wait_asks_for_l1_confirmation() {
    let (base_url, server) = serve_once(
        200,
        r#"{"errorMessage":"out of gas","gasBurned":7}"#,
        Duration::ZERO,
    )
    .await;
    let (client, config) = client(base_url);

    let receipt = client.wait_for_receipt("0xabcd").await.unwrap();
    assert_eq!(receipt.error_message.as_deref(), Some("out of gas"));
    assert_eq!(receipt.extra["gasBurned"], 7);

    let seen = server.await.unwrap();
    assert_eq!(
        seen.request_line,
        format!(
            "GET /v1/chains/{}/requests/0xabcd/wait?timeoutSeconds=5&waitForL1Confirmation=true HTTP/1.1",
            config.chain_id
        )
    );
}

#[tokio::test]
async fn slow_node_surfaces_as_timeout() {
    let (base_url, server) = serve_once(200, "{}", Duration::from_secs(3)).await;
    let (client, _) = client(base_url);

    let err = client.migratable_balance("0x41").await.unwrap_err();
    match &err {
        MigrationError::Timeout { after, .. } => assert_eq!(*after, Duration::from_millis(500)),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.is_retryable());
    server.abort();
}
