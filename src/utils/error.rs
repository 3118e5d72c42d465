use thiserror::Error;

/// 本地輸入驗證失敗，不會送到付款服務
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("No amount found in expense description (expected something like \"$45\" or \"$12.50\")")]
    MissingAmount,

    #[error("Amount could not be parsed: {0}")]
    InvalidAmount(String),

    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Expense description is empty")]
    EmptyDescription,

    #[error("Invalid claimant {field}: {reason}")]
    InvalidClaimant { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ReimburseError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Extraction(#[from] ExtractionFailure),

    /// 服務明確回覆 failed
    #[error("{message}")]
    ServiceRejected { operation: String, message: String },

    #[error("Payment service did not answer {operation} within {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Payment service returned HTTP {status} for {operation}: {message}")]
    HttpStatus {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("Authentication with payment service failed: {message}")]
    AuthError { message: String },

    #[error("Malformed response for {operation}: {message}")]
    MalformedResponse { operation: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Configuration,
    Network,
    Service,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReimburseError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReimburseError::Extraction(_) => ErrorCategory::Validation,
            ReimburseError::ConfigError { .. }
            | ReimburseError::MissingConfigError { .. }
            | ReimburseError::InvalidConfigValueError { .. }
            | ReimburseError::ConfigValidationError { .. }
            | ReimburseError::IoError(_) => ErrorCategory::Configuration,
            ReimburseError::ApiError(_)
            | ReimburseError::HttpStatus { .. }
            | ReimburseError::Timeout { .. }
            | ReimburseError::AuthError { .. } => ErrorCategory::Network,
            ReimburseError::ServiceRejected { .. } => ErrorCategory::Service,
            ReimburseError::SerializationError(_) | ReimburseError::MalformedResponse { .. } => {
                ErrorCategory::Data
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::Service => ErrorSeverity::Medium,
            ErrorCategory::Network | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// 外部呼叫本身出問題（非業務拒絕、非本地輸入錯誤）
    pub fn is_infrastructure(&self) -> bool {
        !matches!(
            self.category(),
            ErrorCategory::Validation | ErrorCategory::Configuration
        )
    }

    /// 只有暫時性的傳輸錯誤值得重試
    pub fn is_retryable(&self) -> bool {
        match self {
            ReimburseError::Timeout { .. } => true,
            ReimburseError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            ReimburseError::ApiError(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ReimburseError::Extraction(_) => {
                "Describe the expense with an amount, e.g. 'Lunch with client - $45'"
            }
            ReimburseError::ServiceRejected { .. } => {
                "Review the payment service message and resubmit the claim"
            }
            ReimburseError::Timeout { .. }
            | ReimburseError::ApiError(_)
            | ReimburseError::HttpStatus { .. } => {
                "Check network connectivity to the payment service and try again"
            }
            ReimburseError::AuthError { .. } => {
                "Verify PAYMAN_CLIENT_ID and PAYMAN_CLIENT_SECRET"
            }
            ReimburseError::MalformedResponse { .. } | ReimburseError::SerializationError(_) => {
                "The payment service returned an unexpected payload; retry later or contact support"
            }
            ReimburseError::IoError(_) => "Check that the configuration file exists and is readable",
            ReimburseError::ConfigError { .. }
            | ReimburseError::MissingConfigError { .. }
            | ReimburseError::InvalidConfigValueError { .. }
            | ReimburseError::ConfigValidationError { .. } => {
                "Fix the configuration file or environment variables"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Validation => format!("Could not read the expense: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Payment service unreachable: {}", self),
            ErrorCategory::Service => format!("Payment service refused the request: {}", self),
            ErrorCategory::Data => format!("Unexpected payment service response: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReimburseError>;
