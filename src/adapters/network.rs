use crate::domain::model::{
    Payee, PayeeRegistration, TaskResponse, TaskStatus, TransferReceipt, TransferRequest, Wallet,
};
use crate::domain::ports::{PaymentNetwork, TaskAgent};
use crate::utils::error::{ReimburseError, Result};
use crate::utils::retry::RetryPolicy;
use async_trait::async_trait;

pub const UNKNOWN: &str = "unknown";

const TRANSACTION_ARTIFACT: &str = "transaction";
const STATUS_ARTIFACT: &str = "transaction_status";
const PAYEE_ARTIFACT: &str = "payee";

/// Instruction templates understood by the payment agent.
pub mod instructions {
    use crate::domain::model::TransferRequest;

    pub fn get_payee(email: &str) -> String {
        format!("get payee with email {}", single_line(email))
    }

    pub fn create_payee(email: &str, name: &str) -> String {
        format!(
            "create a new payee named {} with email {}",
            single_line(name),
            single_line(email)
        )
    }

    pub fn list_wallets() -> String {
        "list all wallets".to_string()
    }

    pub fn send(request: &TransferRequest) -> String {
        format!(
            "send ${} {} to {} for {}",
            request.amount,
            single_line(&request.currency),
            single_line(&request.payee_email),
            single_line(&request.memo)
        )
    }

    pub fn transaction_status(transaction_id: &str) -> String {
        format!("get transaction status for {}", single_line(transaction_id))
    }

    pub fn ping() -> String {
        "test connection".to_string()
    }

    // 使用者輸入不得夾帶換行變成第二句指令
    fn single_line(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// `PaymentNetwork` over a natural-language `TaskAgent`.
pub struct AgentPaymentNetwork<A: TaskAgent> {
    agent: A,
    retry: RetryPolicy,
}

impl<A: TaskAgent> AgentPaymentNetwork<A> {
    pub fn new(agent: A, retry: RetryPolicy) -> Self {
        Self { agent, retry }
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    async fn ask_once(&self, instruction: &str) -> Result<TaskResponse> {
        self.agent.ask(instruction).await
    }

    async fn ask_with_retry(&self, operation: &str, instruction: &str) -> Result<TaskResponse> {
        self.retry
            .run(operation, || self.agent.ask(instruction))
            .await
    }
}

/// 依 status 判斷成功與否；failed 轉成 ServiceRejected
fn completed(operation: &str, response: TaskResponse, fallback: &str) -> Result<TaskResponse> {
    match response.status {
        TaskStatus::Completed => Ok(response),
        TaskStatus::Failed => Err(ReimburseError::ServiceRejected {
            operation: operation.to_string(),
            message: response.error_message().unwrap_or(fallback).to_string(),
        }),
        TaskStatus::Other => Err(ReimburseError::MalformedResponse {
            operation: operation.to_string(),
            message: "task finished without a completed or failed status".to_string(),
        }),
    }
}

fn is_duplicate_payee(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("already exists")
        || message.contains("already registered")
        || message.contains("duplicate")
}

fn parse_wallets(response: &TaskResponse) -> Vec<Wallet> {
    let mut wallets = Vec::new();
    for artifact in &response.artifacts {
        let entries = match artifact.kind.as_str() {
            "wallet" => vec![artifact.content.clone()],
            "wallets" => match &artifact.content {
                serde_json::Value::Array(items) => items.clone(),
                other => other
                    .get("wallets")
                    .and_then(|w| w.as_array())
                    .cloned()
                    .unwrap_or_default(),
            },
            _ => continue,
        };

        for entry in entries {
            match serde_json::from_value::<Wallet>(entry) {
                Ok(wallet) => wallets.push(wallet),
                Err(e) => tracing::debug!("Skipping unrecognised wallet entry: {}", e),
            }
        }
    }
    wallets
}

#[async_trait]
impl<A: TaskAgent> PaymentNetwork for AgentPaymentNetwork<A> {
    async fn resolve_payee(&self, email: &str) -> Result<Option<Payee>> {
        let response = self
            .ask_with_retry("resolve_payee", &instructions::get_payee(email))
            .await?;

        match completed("resolve_payee", response, "Payee not found") {
            Ok(response) => Ok(Some(Payee {
                email: email.to_string(),
                name: response.artifact_text(PAYEE_ARTIFACT, "name"),
                id: response.artifact_text(PAYEE_ARTIFACT, "id"),
            })),
            Err(ReimburseError::ServiceRejected { message, .. }) => {
                tracing::debug!("No payee for {}: {}", email, message);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_payee(&self, email: &str, name: &str) -> Result<PayeeRegistration> {
        let response = self
            .ask_once(&instructions::create_payee(email, name))
            .await?;

        match completed("create_payee", response, "Failed to create payee") {
            Ok(_) => Ok(PayeeRegistration::Created),
            Err(ReimburseError::ServiceRejected { message, .. }) if is_duplicate_payee(&message) => {
                Ok(PayeeRegistration::AlreadyRegistered)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_wallets(&self) -> Result<Vec<Wallet>> {
        let response = self
            .ask_with_retry("list_wallets", &instructions::list_wallets())
            .await?;
        let response = completed("list_wallets", response, "Failed to get wallets")?;
        Ok(parse_wallets(&response))
    }

    async fn submit_transfer(&self, request: &TransferRequest) -> Result<TransferReceipt> {
        // 不重試，避免重複撥款
        let response = self.ask_once(&instructions::send(request)).await?;

        // 只有明確的 failed 才算拒絕；其他狀態代表服務已受理
        match response.status {
            TaskStatus::Failed => {
                return Err(ReimburseError::ServiceRejected {
                    operation: "submit_transfer".to_string(),
                    message: response
                        .error_message()
                        .unwrap_or("Failed to process transaction")
                        .to_string(),
                })
            }
            TaskStatus::Completed => {}
            TaskStatus::Other => {
                tracing::warn!("⚠️ Transfer accepted without a completed status; treating as settled")
            }
        }

        let transaction_id = match response.artifact_text(TRANSACTION_ARTIFACT, "id") {
            Some(id) => id,
            None => {
                tracing::warn!("Transfer accepted without a transaction artifact");
                UNKNOWN.to_string()
            }
        };
        Ok(TransferReceipt { transaction_id })
    }

    async fn transaction_status(&self, transaction_id: &str) -> Result<String> {
        let response = self
            .ask_with_retry(
                "transaction_status",
                &instructions::transaction_status(transaction_id),
            )
            .await?;
        let response = completed(
            "transaction_status",
            response,
            "Failed to get transaction status",
        )?;

        Ok(response
            .artifact_text(STATUS_ARTIFACT, "status")
            .unwrap_or_else(|| UNKNOWN.to_string()))
    }

    async fn ping(&self) -> Result<bool> {
        let response = self
            .ask_with_retry("ping", &instructions::ping())
            .await?;
        Ok(response.is_completed())
    }
}
