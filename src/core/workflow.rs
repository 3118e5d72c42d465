use crate::core::policy::{ApprovalPolicy, PolicyDecision};
use crate::domain::model::{
    Claim, PayeeRegistration, ReimbursementOutcome, TransferRequest, Wallet,
};
use crate::domain::ports::PaymentNetwork;
use crate::utils::error::{ReimburseError, Result};

pub const DEFAULT_CURRENCY: &str = "TSD";

/// Drives a claim through payee resolution, wallet check, policy and
/// settlement. Holds no per-claim state, so one instance can serve
/// concurrent claims.
pub struct ReimbursementWorkflow<N: PaymentNetwork> {
    network: N,
    policy: ApprovalPolicy,
    currency: String,
}

impl<N: PaymentNetwork> ReimbursementWorkflow<N> {
    pub fn new(network: N, policy: ApprovalPolicy) -> Self {
        Self {
            network,
            policy,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn policy(&self) -> &ApprovalPolicy {
        &self.policy
    }

    /// Business outcomes come back as `Ok`; `Err` is always an infrastructure
    /// failure (creation, wallet check, transport, malformed response).
    #[tracing::instrument(
        name = "claim",
        skip_all,
        fields(
            claimant = %claim.claimant_email(),
            amount = %claim.amount(),
            outcome = tracing::field::Empty
        )
    )]
    pub async fn process(&self, claim: &Claim) -> Result<ReimbursementOutcome> {
        let result = self.run(claim).await;
        let outcome = match &result {
            Ok(ReimbursementOutcome::Reimbursed { .. }) => "reimbursed",
            Ok(ReimbursementOutcome::RequiresApproval { .. }) => "requires_approval",
            Ok(ReimbursementOutcome::Rejected { .. }) => "rejected",
            Err(_) => "error",
        };
        tracing::Span::current().record("outcome", outcome);
        result
    }

    async fn run(&self, claim: &Claim) -> Result<ReimbursementOutcome> {
        tracing::info!(
            "🧾 Processing claim of ${} for {} ({})",
            claim.amount(),
            claim.claimant_email(),
            claim.description()
        );

        // 1. 受款人
        self.ensure_payee(claim).await?;

        // 2. 錢包（僅供診斷）
        let wallets = self.network.list_wallets().await?;
        log_wallets(&wallets);

        // 3. 核准政策
        if let PolicyDecision::RequiresApproval { reason } = self.policy.evaluate(claim.amount())
        {
            tracing::info!("⏸️ Claim held for manual approval: {}", reason);
            return Ok(ReimbursementOutcome::RequiresApproval {
                amount: claim.amount(),
                reason,
            });
        }

        // 4. 撥款
        let request = TransferRequest {
            amount: claim.amount(),
            currency: self.currency.clone(),
            payee_email: claim.claimant_email().to_string(),
            memo: claim.description().to_string(),
        };

        match self.network.submit_transfer(&request).await {
            Ok(receipt) => {
                tracing::info!(
                    "✅ Reimbursed ${} to {} (transaction {})",
                    claim.amount(),
                    claim.claimant_email(),
                    receipt.transaction_id
                );
                Ok(ReimbursementOutcome::Reimbursed {
                    amount: claim.amount(),
                    transaction_id: receipt.transaction_id,
                })
            }
            Err(ReimburseError::ServiceRejected { message, .. }) => {
                tracing::warn!("❌ Settlement rejected by payment service: {}", message);
                Ok(ReimbursementOutcome::Rejected { reason: message })
            }
            Err(e) => Err(e),
        }
    }

    /// Like [`process`](Self::process), but folds infrastructure failures into
    /// `Rejected` with the error text as the reason. Callers that only render
    /// an outcome can use this; nothing is retried.
    pub async fn process_or_reject(&self, claim: &Claim) -> ReimbursementOutcome {
        match self.process(claim).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    "❌ Claim failed: {} (Category: {:?}, Severity: {:?})",
                    e,
                    e.category(),
                    e.severity()
                );
                ReimbursementOutcome::Rejected {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub async fn transaction_status(&self, transaction_id: &str) -> Result<String> {
        let status = self.network.transaction_status(transaction_id).await?;
        tracing::debug!("Transaction {} status: {}", transaction_id, status);
        Ok(status)
    }

    /// Diagnostics only; never fails.
    pub async fn test_connection(&self) -> bool {
        match self.network.ping().await {
            Ok(connected) => connected,
            Err(e) => {
                tracing::warn!("Connection test failed: {}", e);
                false
            }
        }
    }

    async fn ensure_payee(&self, claim: &Claim) -> Result<()> {
        let email = claim.claimant_email();

        // 查詢失敗與查無此人無法分辨，一律視為不存在
        let existing = match self.network.resolve_payee(email).await {
            Ok(payee) => payee,
            Err(e) => {
                tracing::warn!("Payee lookup for {} failed, treating as absent: {}", email, e);
                None
            }
        };

        if existing.is_some() {
            tracing::debug!("Payee exists: {}", email);
            return Ok(());
        }

        match self
            .network
            .create_payee(email, claim.claimant_name())
            .await?
        {
            PayeeRegistration::Created => {
                tracing::info!("👤 Created payee: {} ({})", claim.claimant_name(), email)
            }
            PayeeRegistration::AlreadyRegistered => {
                tracing::debug!("Payee {} already registered", email)
            }
        }
        Ok(())
    }
}

fn log_wallets(wallets: &[Wallet]) {
    if wallets.is_empty() {
        tracing::debug!("Wallet listing returned no balances");
    }
    for wallet in wallets {
        tracing::debug!(
            "💰 Wallet {}: {} {}",
            wallet.name.as_deref().unwrap_or("-"),
            wallet.balance,
            wallet.currency
        );
    }
}
