use crate::config::{
    validate_provider, DEFAULT_BASE_URL, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_TIMEOUT_SECONDS,
};
use crate::core::policy::DEFAULT_AUTO_APPROVAL_LIMIT;
use crate::core::workflow::DEFAULT_CURRENCY;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ReimburseError, Result};
use crate::utils::validation::Validate;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

pub const BASE_URL_VAR: &str = "PAYMAN_BASE_URL";
pub const CLIENT_ID_VAR: &str = "PAYMAN_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "PAYMAN_CLIENT_SECRET";
pub const TIMEOUT_VAR: &str = "PAYMAN_TIMEOUT_SECONDS";
pub const RETRY_ATTEMPTS_VAR: &str = "PAYMAN_RETRY_ATTEMPTS";
pub const RETRY_DELAY_VAR: &str = "PAYMAN_RETRY_DELAY_MS";
pub const LIMIT_VAR: &str = "REIMBURSE_AUTO_APPROVAL_LIMIT";
pub const CURRENCY_VAR: &str = "REIMBURSE_CURRENCY";

/// 由環境變數（或 .env）組成的設定
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub auto_approval_limit: Decimal,
    pub currency: String,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Credentials are required;
    /// everything else falls back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ReimburseError::MissingConfigError {
                    field: key.to_string(),
                })
        };

        Ok(Self {
            base_url: lookup(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client_id: required(CLIENT_ID_VAR)?,
            client_secret: required(CLIENT_SECRET_VAR)?,
            timeout_seconds: parse_or(&lookup, TIMEOUT_VAR, DEFAULT_TIMEOUT_SECONDS)?,
            retry_attempts: parse_or(&lookup, RETRY_ATTEMPTS_VAR, DEFAULT_RETRY_ATTEMPTS)?,
            retry_delay_ms: parse_or(&lookup, RETRY_DELAY_VAR, DEFAULT_RETRY_DELAY_MS)?,
            auto_approval_limit: parse_or(&lookup, LIMIT_VAR, DEFAULT_AUTO_APPROVAL_LIMIT)?,
            currency: lookup(CURRENCY_VAR).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        })
    }

    fn field_name(name: &str) -> String {
        match name {
            "base_url" => BASE_URL_VAR,
            "client_id" => CLIENT_ID_VAR,
            "client_secret" => CLIENT_SECRET_VAR,
            "timeout_seconds" => TIMEOUT_VAR,
            "retry_attempts" => RETRY_ATTEMPTS_VAR,
            "auto_approval_limit" => LIMIT_VAR,
            "currency" => CURRENCY_VAR,
            other => other,
        }
        .to_string()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ReimburseError::InvalidConfigValueError {
                field: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

impl ConfigProvider for EnvConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn client_secret(&self) -> &str {
        &self.client_secret
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    fn auto_approval_limit(&self) -> Decimal {
        self.auto_approval_limit
    }

    fn currency(&self) -> &str {
        &self.currency
    }
}

impl Validate for EnvConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self, Self::field_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_credentials_with_defaults() {
        let config = EnvConfig::from_lookup(lookup(&[
            (CLIENT_ID_VAR, "id"),
            (CLIENT_SECRET_VAR, "secret"),
        ]))
        .unwrap();

        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.auto_approval_limit(), dec!(100));
        assert_eq!(config.currency(), "TSD");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = EnvConfig::from_lookup(lookup(&[
            (CLIENT_ID_VAR, "id"),
            (CLIENT_SECRET_VAR, "secret"),
            (BASE_URL_VAR, "http://localhost:9000"),
            (TIMEOUT_VAR, "5"),
            (RETRY_ATTEMPTS_VAR, "0"),
            (LIMIT_VAR, "75.50"),
            (CURRENCY_VAR, "USD"),
        ]))
        .unwrap();

        assert_eq!(config.base_url(), "http://localhost:9000");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.retry_attempts(), 0);
        assert_eq!(config.auto_approval_limit(), dec!(75.50));
        assert_eq!(config.currency(), "USD");
    }

    #[test]
    fn test_missing_secret() {
        let result = EnvConfig::from_lookup(lookup(&[(CLIENT_ID_VAR, "id")]));
        match result {
            Err(ReimburseError::MissingConfigError { field }) => {
                assert_eq!(field, CLIENT_SECRET_VAR)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_number_is_reported() {
        let result = EnvConfig::from_lookup(lookup(&[
            (CLIENT_ID_VAR, "id"),
            (CLIENT_SECRET_VAR, "secret"),
            (TIMEOUT_VAR, "soon"),
        ]));
        assert!(matches!(
            result,
            Err(ReimburseError::InvalidConfigValueError { ref field, .. }) if field == TIMEOUT_VAR
        ));
    }

    #[test]
    fn test_validation_names_env_var() {
        let config = EnvConfig::from_lookup(lookup(&[
            (CLIENT_ID_VAR, "id"),
            (CLIENT_SECRET_VAR, "secret"),
            (TIMEOUT_VAR, "0"),
        ]))
        .unwrap();

        match config.validate() {
            Err(ReimburseError::InvalidConfigValueError { field, .. }) => {
                assert_eq!(field, TIMEOUT_VAR)
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
