use crate::domain::model::{
    Payee, PayeeRegistration, TaskResponse, TransferReceipt, TransferRequest, Wallet,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// The external payment network, one method per operation the workflow needs.
#[async_trait]
pub trait PaymentNetwork: Send + Sync {
    /// `Ok(None)` when the service reports no such payee.
    async fn resolve_payee(&self, email: &str) -> Result<Option<Payee>>;
    async fn create_payee(&self, email: &str, name: &str) -> Result<PayeeRegistration>;
    async fn list_wallets(&self) -> Result<Vec<Wallet>>;
    async fn submit_transfer(&self, request: &TransferRequest) -> Result<TransferReceipt>;
    async fn transaction_status(&self, transaction_id: &str) -> Result<String>;
    async fn ping(&self) -> Result<bool>;
}

#[async_trait]
impl<T: PaymentNetwork + ?Sized> PaymentNetwork for Arc<T> {
    async fn resolve_payee(&self, email: &str) -> Result<Option<Payee>> {
        (**self).resolve_payee(email).await
    }

    async fn create_payee(&self, email: &str, name: &str) -> Result<PayeeRegistration> {
        (**self).create_payee(email, name).await
    }

    async fn list_wallets(&self) -> Result<Vec<Wallet>> {
        (**self).list_wallets().await
    }

    async fn submit_transfer(&self, request: &TransferRequest) -> Result<TransferReceipt> {
        (**self).submit_transfer(request).await
    }

    async fn transaction_status(&self, transaction_id: &str) -> Result<String> {
        (**self).transaction_status(transaction_id).await
    }

    async fn ping(&self) -> Result<bool> {
        (**self).ping().await
    }
}

/// 自然語言指令通道：送出一句指令，取回結構化回應
#[async_trait]
pub trait TaskAgent: Send + Sync {
    async fn ask(&self, instruction: &str) -> Result<TaskResponse>;
}

#[async_trait]
impl<T: TaskAgent + ?Sized> TaskAgent for Arc<T> {
    async fn ask(&self, instruction: &str) -> Result<TaskResponse> {
        (**self).ask(instruction).await
    }
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn client_id(&self) -> &str;
    fn client_secret(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn retry_attempts(&self) -> u32;
    fn retry_delay(&self) -> Duration;
    fn auto_approval_limit(&self) -> Decimal;
    fn currency(&self) -> &str;
}
