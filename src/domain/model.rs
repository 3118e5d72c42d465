use crate::utils::error::ExtractionFailure;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 申請人身分（由 UI 的登入狀態提供）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claimant {
    pub email: String,
    pub name: String,
}

impl Claimant {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }

    fn validate(&self) -> Result<(), ExtractionFailure> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ExtractionFailure::InvalidClaimant {
                field: "email".to_string(),
                reason: format!("'{}' is not an email address", self.email),
            });
        }
        if self.name.trim().is_empty() {
            return Err(ExtractionFailure::InvalidClaimant {
                field: "name".to_string(),
                reason: "name cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// A normalized expense submission. Fields are private so a `Claim` can only
/// exist after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    amount: Decimal,
    description: String,
    claimant_email: String,
    claimant_name: String,
}

impl Claim {
    pub fn new(
        amount: Decimal,
        description: impl Into<String>,
        claimant: Claimant,
    ) -> Result<Self, ExtractionFailure> {
        if amount <= Decimal::ZERO {
            return Err(ExtractionFailure::NonPositiveAmount);
        }
        let description = description.into().trim().to_string();
        if description.is_empty() {
            return Err(ExtractionFailure::EmptyDescription);
        }
        claimant.validate()?;

        Ok(Self {
            amount,
            description,
            claimant_email: claimant.email.trim().to_string(),
            claimant_name: claimant.name.trim().to_string(),
        })
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn claimant_email(&self) -> &str {
        &self.claimant_email
    }

    pub fn claimant_name(&self) -> &str {
        &self.claimant_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payee {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayeeRegistration {
    Created,
    AlreadyRegistered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    #[serde(default)]
    pub name: Option<String>,
    pub currency: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub amount: Decimal,
    pub currency: String,
    pub payee_email: String,
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub transaction_id: String,
}

/// 申請的三種終局
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReimbursementOutcome {
    Reimbursed {
        amount: Decimal,
        transaction_id: String,
    },
    RequiresApproval {
        amount: Decimal,
        reason: String,
    },
    Rejected {
        reason: String,
    },
}

impl ReimbursementOutcome {
    pub fn is_reimbursed(&self) -> bool {
        matches!(self, ReimbursementOutcome::Reimbursed { .. })
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            ReimbursementOutcome::Reimbursed { transaction_id, .. } => Some(transaction_id),
            _ => None,
        }
    }
}

impl fmt::Display for ReimbursementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReimbursementOutcome::Reimbursed {
                amount,
                transaction_id,
            } => write!(f, "Reimbursed ${} (transaction {})", amount, transaction_id),
            ReimbursementOutcome::RequiresApproval { amount, reason } => {
                write!(f, "${} requires manual approval: {}", amount, reason)
            }
            ReimbursementOutcome::Rejected { reason } => write!(f, "Rejected: {}", reason),
        }
    }
}

// ---- 付款服務 ask 介面的回應格式 ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
    Failed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub status: TaskStatus,
    #[serde(default)]
    pub error: Option<TaskError>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl TaskResponse {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == TaskStatus::Failed
    }

    /// 第一個符合 type 標籤的 artifact
    pub fn artifact(&self, kind: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    /// Reads a scalar field from the first artifact tagged `kind`.
    ///
    /// Numeric ids come back as their decimal text; blank strings count as
    /// missing.
    pub fn artifact_text(&self, kind: &str, field: &str) -> Option<String> {
        let value = self.artifact(kind).and_then(|a| a.content.get(field))?;
        let text = match value {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(text).filter(|t| !t.is_empty())
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .filter(|m| !m.trim().is_empty())
    }
}
