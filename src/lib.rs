pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;
pub use config::{EnvConfig, TomlConfig};

pub use adapters::{AgentPaymentNetwork, PaymanClient};
pub use core::intake::extract;
pub use core::policy::ApprovalPolicy;
pub use core::workflow::ReimbursementWorkflow;
pub use domain::model::{Claim, Claimant, ReimbursementOutcome};
pub use domain::ports::{ConfigProvider, PaymentNetwork, TaskAgent};
pub use utils::error::{ExtractionFailure, ReimburseError, Result};

/// Workflow wired to the HTTP payment service.
pub type HttpWorkflow = ReimbursementWorkflow<AgentPaymentNetwork<PaymanClient>>;

/// 依設定建立 HTTP 客戶端與工作流程；生命週期由呼叫端管理
pub fn connect<C: ConfigProvider + ?Sized>(config: &C) -> Result<HttpWorkflow> {
    let client = PaymanClient::from_config(config)?;
    let network = AgentPaymentNetwork::new(client, crate::config::retry_policy(config));
    let policy = ApprovalPolicy::new(config.auto_approval_limit());

    Ok(ReimbursementWorkflow::new(network, policy).with_currency(config.currency()))
}
