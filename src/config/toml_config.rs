use crate::config::{
    validate_provider, DEFAULT_BASE_URL, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_TIMEOUT_SECONDS,
};
use crate::core::policy::DEFAULT_AUTO_APPROVAL_LIMIT;
use crate::core::workflow::DEFAULT_CURRENCY;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ReimburseError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{validate_non_empty_string, Validate};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub auto_approval_limit: Option<Decimal>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "compact" 或 "json"
    pub format: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReimburseError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ReimburseError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PAYMAN_CLIENT_SECRET})，未設定者保留原字串
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// `[logging] format`; unset or unrecognised values fall back to compact.
    pub fn log_format(&self) -> LogFormat {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .and_then(|f| f.parse().ok())
            .unwrap_or_default()
    }

    fn field_name(name: &str) -> String {
        match name {
            "auto_approval_limit" | "currency" => format!("policy.{}", name),
            _ => format!("service.{}", name),
        }
    }
}

impl ConfigProvider for TomlConfig {
    fn base_url(&self) -> &str {
        &self.service.base_url
    }

    fn client_id(&self) -> &str {
        &self.service.client_id
    }

    fn client_secret(&self) -> &str {
        &self.service.client_secret
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    fn retry_attempts(&self) -> u32 {
        self.service.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS)
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.service.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS))
    }

    fn auto_approval_limit(&self) -> Decimal {
        self.policy
            .auto_approval_limit
            .unwrap_or(DEFAULT_AUTO_APPROVAL_LIMIT)
    }

    fn currency(&self) -> &str {
        self.policy.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        // 未被替換的 ${VAR} 代表環境變數沒設定
        for (field, value) in [
            ("service.client_id", &self.service.client_id),
            ("service.client_secret", &self.service.client_secret),
        ] {
            if let Some(caps) = ENV_VAR.captures(value) {
                return Err(ReimburseError::MissingConfigError {
                    field: format!("{} (environment variable {} is not set)", field, &caps[1]),
                });
            }
        }

        validate_provider(self, Self::field_name)?;

        if let Some(format) = self.logging.as_ref().and_then(|l| l.format.as_deref()) {
            validate_non_empty_string("logging.format", format)?;
            if let Err(reason) = format.parse::<LogFormat>() {
                return Err(ReimburseError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.to_string(),
                    reason: format!("{}; supported formats: compact, json", reason),
                });
            }
        }
        Ok(())
    }
}
