#[cfg(feature = "cli")]
pub mod cli;
pub mod env;
pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::retry::RetryPolicy;
use crate::utils::validation::{
    validate_currency_code, validate_positive_decimal, validate_range, validate_secret,
    validate_url,
};

pub use env::EnvConfig;
pub use toml_config::TomlConfig;

pub const DEFAULT_BASE_URL: &str = "https://agent.payman.ai/api";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 2;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 250;
pub const MAX_TIMEOUT_SECONDS: u64 = 300;
pub const MAX_RETRY_ATTEMPTS: u32 = 5;

pub fn retry_policy<C: ConfigProvider + ?Sized>(config: &C) -> RetryPolicy {
    RetryPolicy::new(config.retry_attempts(), config.retry_delay())
}

/// TOML 與環境變數兩種來源共用的檢查；`field` 把設定項目名稱轉成來源中的欄位名稱
pub(crate) fn validate_provider<C, F>(config: &C, field: F) -> Result<()>
where
    C: ConfigProvider + ?Sized,
    F: Fn(&str) -> String,
{
    validate_url(&field("base_url"), config.base_url())?;
    validate_secret(&field("client_id"), config.client_id())?;
    validate_secret(&field("client_secret"), config.client_secret())?;
    validate_range(
        &field("timeout_seconds"),
        config.request_timeout().as_secs(),
        1,
        MAX_TIMEOUT_SECONDS,
    )?;
    validate_range(
        &field("retry_attempts"),
        config.retry_attempts(),
        0,
        MAX_RETRY_ATTEMPTS,
    )?;
    validate_positive_decimal(&field("auto_approval_limit"), config.auto_approval_limit())?;
    validate_currency_code(&field("currency"), config.currency())?;
    Ok(())
}
