use anyhow::Result;
use httpmock::prelude::*;
use reimburse_flow::{
    connect, extract, Claim, Claimant, EnvConfig, ReimburseError, ReimbursementOutcome,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::Duration;

fn config_for(server: &MockServer) -> EnvConfig {
    EnvConfig {
        base_url: server.base_url(),
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        timeout_seconds: 5,
        retry_attempts: 0,
        retry_delay_ms: 1,
        auto_approval_limit: dec!(100),
        currency: "TSD".to_string(),
    }
}

fn alice_claim(amount: Decimal) -> Claim {
    Claim::new(amount, "Lunch with client", Claimant::new("a@x.com", "Alice")).unwrap()
}

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
    mock_token_value(server, "tok").await
}

async fn mock_token_value<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
    let token = token.to_string();
    server
        .mock_async(move |when, then| {
            when.method(POST)
                .path("/oauth/token")
                .body_contains("client_credentials");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"access_token": token, "expires_in": 3600}));
        })
        .await
}

async fn mock_task<'a>(
    server: &'a MockServer,
    instruction: &str,
    body: serde_json::Value,
) -> httpmock::Mock<'a> {
    let instruction = instruction.to_string();
    server
        .mock_async(move |when, then| {
            when.method(POST).path("/tasks").body_contains(instruction);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(body);
        })
        .await
}

async fn mock_existing_payee_and_wallet(server: &MockServer) {
    mock_task(
        server,
        "get payee with email a@x.com",
        json!({"status": "completed", "artifacts": [{"type": "payee", "content": {"id": "pd_1"}}]}),
    )
    .await;
    mock_task(
        server,
        "list all wallets",
        json!({
            "status": "completed",
            "artifacts": [{"type": "wallet", "content": {"currency": "TSD", "balance": 5000}}]
        }),
    )
    .await;
}

#[tokio::test]
async fn test_small_claim_is_reimbursed_end_to_end() -> Result<()> {
    let server = MockServer::start_async().await;
    let token = mock_token(&server).await;
    mock_existing_payee_and_wallet(&server).await;
    let transfer = mock_task(
        &server,
        "send $45 TSD to a@x.com for Lunch with client",
        json!({
            "status": "completed",
            "artifacts": [{"type": "transaction", "content": {"id": "tx_1"}}]
        }),
    )
    .await;

    let workflow = connect(&config_for(&server))?;
    let claim = extract("Lunch with client - $45", Claimant::new("a@x.com", "Alice"))?;
    let outcome = workflow.process(&claim).await?;

    assert_eq!(
        outcome,
        ReimbursementOutcome::Reimbursed {
            amount: dec!(45),
            transaction_id: "tx_1".to_string()
        }
    );
    transfer.assert_hits_async(1).await;
    // 同一個客戶端只認證一次
    token.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn test_large_claim_requires_approval_without_transfer() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    mock_existing_payee_and_wallet(&server).await;
    let transfer = mock_task(&server, "send $", json!({"status": "completed"})).await;

    let workflow = connect(&config_for(&server))?;
    let outcome = workflow.process(&alice_claim(dec!(1500))).await?;

    match outcome {
        ReimbursementOutcome::RequiresApproval { amount, reason } => {
            assert_eq!(amount, dec!(1500));
            assert!(reason.contains("exceeds auto-approval limit of 100"));
        }
        other => panic!("expected RequiresApproval, got {:?}", other),
    }
    transfer.assert_hits_async(0).await;
    Ok(())
}

#[tokio::test]
async fn test_insufficient_funds_is_rejected() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    mock_existing_payee_and_wallet(&server).await;
    mock_task(
        &server,
        "send $45 TSD",
        json!({"status": "failed", "error": {"message": "insufficient funds"}}),
    )
    .await;

    let workflow = connect(&config_for(&server))?;
    let outcome = workflow.process(&alice_claim(dec!(45))).await?;

    assert_eq!(
        outcome,
        ReimbursementOutcome::Rejected {
            reason: "insufficient funds".to_string()
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_transfer_still_in_progress_is_reimbursed() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    mock_existing_payee_and_wallet(&server).await;
    mock_task(
        &server,
        "send $45 TSD",
        json!({
            "status": "in_progress",
            "artifacts": [{"type": "transaction", "content": {"id": "tx_p"}}]
        }),
    )
    .await;

    let workflow = connect(&config_for(&server))?;

    assert_eq!(
        workflow.process(&alice_claim(dec!(45))).await?,
        ReimbursementOutcome::Reimbursed {
            amount: dec!(45),
            transaction_id: "tx_p".to_string()
        }
    );
    assert!(workflow
        .process_or_reject(&alice_claim(dec!(45)))
        .await
        .is_reimbursed());
    Ok(())
}

#[tokio::test]
async fn test_missing_transaction_artifact_yields_unknown_id() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    mock_existing_payee_and_wallet(&server).await;
    mock_task(
        &server,
        "send $45 TSD",
        json!({"status": "completed", "artifacts": [{"type": "note", "content": "queued"}]}),
    )
    .await;

    let workflow = connect(&config_for(&server))?;
    let outcome = workflow.process(&alice_claim(dec!(45))).await?;

    assert_eq!(outcome.transaction_id(), Some("unknown"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_payee_is_created_before_transfer() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    mock_task(
        &server,
        "get payee with email a@x.com",
        json!({"status": "failed", "error": {"message": "payee not found"}}),
    )
    .await;
    let create = mock_task(
        &server,
        "create a new payee named Alice with email a@x.com",
        json!({"status": "completed"}),
    )
    .await;
    mock_task(&server, "list all wallets", json!({"status": "completed"})).await;
    mock_task(
        &server,
        "send $20 TSD",
        json!({
            "status": "completed",
            "artifacts": [{"type": "transaction", "content": {"id": "tx_20"}}]
        }),
    )
    .await;

    let workflow = connect(&config_for(&server))?;
    let outcome = workflow.process(&alice_claim(dec!(20))).await?;

    assert_eq!(outcome.transaction_id(), Some("tx_20"));
    create.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn test_lookup_and_creation_failure_stops_before_settlement() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/tasks")
                .body_contains("get payee with email");
            then.status(502).body("bad gateway");
        })
        .await;
    mock_task(
        &server,
        "create a new payee",
        json!({"status": "failed", "error": {"message": "payee service unavailable"}}),
    )
    .await;
    let transfer = mock_task(&server, "send $", json!({"status": "completed"})).await;

    let workflow = connect(&config_for(&server))?;
    let result = workflow.process(&alice_claim(dec!(20))).await;

    match result {
        Err(ReimburseError::ServiceRejected { operation, message }) => {
            assert_eq!(operation, "create_payee");
            assert_eq!(message, "payee service unavailable");
        }
        other => panic!("expected create_payee failure, got {:?}", other),
    }
    transfer.assert_hits_async(0).await;
    Ok(())
}

#[tokio::test]
async fn test_malformed_wallet_response_aborts_claim() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    mock_task(
        &server,
        "get payee with email",
        json!({"status": "completed"}),
    )
    .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/tasks").body_contains("list all wallets");
            then.status(200).body("<html>maintenance</html>");
        })
        .await;
    let transfer = mock_task(&server, "send $", json!({"status": "completed"})).await;

    let workflow = connect(&config_for(&server))?;
    let err = workflow.process(&alice_claim(dec!(20))).await.unwrap_err();

    assert!(matches!(err, ReimburseError::MalformedResponse { .. }));
    assert!(err.is_infrastructure());
    transfer.assert_hits_async(0).await;
    Ok(())
}

#[tokio::test]
async fn test_rejected_credentials_surface_as_auth_error() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(401).body("invalid client");
        })
        .await;

    let workflow = connect(&config_for(&server))?;
    let err = workflow.process(&alice_claim(dec!(20))).await.unwrap_err();

    assert!(matches!(err, ReimburseError::AuthError { .. }));
    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_renewed_mid_session() -> Result<()> {
    let server = MockServer::start_async().await;
    let mut first_token = mock_token_value(&server, "stale").await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/tasks")
                .header("Authorization", "Bearer stale")
                .body_contains("test connection");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"status": "completed"}));
        })
        .await;

    let workflow = connect(&config_for(&server))?;
    assert!(workflow.test_connection().await);

    // 服務端讓舊 token 失效並改發新 token
    first_token.delete_async().await;
    let second_token = mock_token_value(&server, "fresh").await;
    let rejected = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/tasks")
                .header("Authorization", "Bearer stale")
                .body_contains("get transaction status");
            then.status(401).body("token expired");
        })
        .await;
    let accepted = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/tasks")
                .header("Authorization", "Bearer fresh")
                .body_contains("get transaction status for tx_1");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "status": "completed",
                    "artifacts": [{"type": "transaction_status", "content": {"status": "completed"}}]
                }));
        })
        .await;

    assert_eq!(workflow.transaction_status("tx_1").await?, "completed");
    rejected.assert_hits_async(1).await;
    accepted.assert_hits_async(1).await;
    second_token.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn test_token_rejected_twice_is_auth_error() -> Result<()> {
    let server = MockServer::start_async().await;
    let token = mock_token(&server).await;
    let tasks = server
        .mock_async(|when, then| {
            when.method(POST).path("/tasks");
            then.status(403).body("forbidden");
        })
        .await;

    let workflow = connect(&config_for(&server))?;
    let err = workflow.transaction_status("tx_1").await.unwrap_err();

    assert!(matches!(err, ReimburseError::AuthError { .. }));
    // 只重新認證一次，不會無限重試
    token.assert_hits_async(2).await;
    tasks.assert_hits_async(2).await;
    Ok(())
}

#[tokio::test]
async fn test_slow_settlement_times_out() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    mock_existing_payee_and_wallet(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/tasks").body_contains("send $");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({"status": "completed"}));
        })
        .await;

    let mut config = config_for(&server);
    config.timeout_seconds = 1;
    let workflow = connect(&config)?;

    let err = workflow.process(&alice_claim(dec!(45))).await.unwrap_err();
    assert!(matches!(err, ReimburseError::Timeout { .. }));

    match workflow.process_or_reject(&alice_claim(dec!(45))).await {
        ReimbursementOutcome::Rejected { reason } => assert!(reason.contains("did not answer")),
        other => panic!("expected Rejected, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_transaction_status_lookup() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    mock_task(
        &server,
        "get transaction status for tx_1",
        json!({
            "status": "completed",
            "artifacts": [{"type": "transaction_status", "content": {"status": "completed"}}]
        }),
    )
    .await;
    mock_task(
        &server,
        "get transaction status for tx_missing",
        json!({"status": "failed", "error": {"message": "transaction not found"}}),
    )
    .await;

    let workflow = connect(&config_for(&server))?;

    assert_eq!(workflow.transaction_status("tx_1").await?, "completed");
    let err = workflow.transaction_status("tx_missing").await.unwrap_err();
    assert_eq!(err.to_string(), "transaction not found");
    Ok(())
}

#[tokio::test]
async fn test_connection_check_reports_reachability() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    mock_task(&server, "test connection", json!({"status": "completed"})).await;

    let workflow = connect(&config_for(&server))?;
    assert!(workflow.test_connection().await);

    let broken = MockServer::start_async().await;
    mock_token(&broken).await;
    broken
        .mock_async(|when, then| {
            when.method(POST).path("/tasks");
            then.status(500).body("boom");
        })
        .await;

    let workflow = connect(&config_for(&broken))?;
    assert!(!workflow.test_connection().await);
    Ok(())
}
