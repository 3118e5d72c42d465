use crate::domain::model::TaskResponse;
use crate::domain::ports::{ConfigProvider, TaskAgent};
use crate::utils::error::{ReimburseError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

// 提前換發，避免 token 在請求途中過期
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .map(|at| Instant::now() + TOKEN_REFRESH_MARGIN < at)
            .unwrap_or(true)
    }
}

#[derive(Debug, Serialize)]
struct TaskRequest<'a> {
    instruction: &'a str,
}

/// 付款服務的 HTTP 客戶端
///
/// Authenticates with client credentials on first use and keeps the bearer
/// token until it nears `expires_in` or the service answers 401/403. A
/// rejected token is replaced and the task resent once. Construct one per
/// process and share it; every request carries the configured timeout.
pub struct PaymanClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
    token: RwLock<Option<CachedToken>>,
}

impl PaymanClient {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("reimburse-flow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            client_id: config.client_id().to_string(),
            client_secret: config.client_secret().to_string(),
            timeout: config.request_timeout(),
            token: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn transport_error(&self, operation: &str, error: reqwest::Error) -> ReimburseError {
        if error.is_timeout() {
            ReimburseError::Timeout {
                operation: operation.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            ReimburseError::ApiError(error)
        }
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let mut guard = self.token.write().await;
        // 等鎖期間可能已有其他請求完成認證
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        tracing::debug!("🔑 Requesting access token from {}", self.endpoint("oauth/token"));

        let response = self
            .client
            .post(self.endpoint("oauth/token"))
            .json(&TokenRequest {
                grant_type: "client_credentials",
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            })
            .send()
            .await
            .map_err(|e| self.transport_error("authenticate", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReimburseError::AuthError {
                message: format!("token endpoint returned {}: {}", status, body.trim()),
            });
        }

        let body: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| ReimburseError::MalformedResponse {
                    operation: "authenticate".to_string(),
                    message: e.to_string(),
                })?;
        Ok(CachedToken {
            value: body.access_token,
            expires_at: body
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }

    /// 只清掉被拒絕的那一個；其他請求可能已經換發新 token
    async fn invalidate_token(&self, rejected: &str) {
        let mut guard = self.token.write().await;
        if guard.as_ref().is_some_and(|t| t.value == rejected) {
            *guard = None;
        }
    }

    async fn post_task(&self, token: &str, instruction: &str) -> Result<reqwest::Response> {
        self.client
            .post(self.endpoint("tasks"))
            .bearer_auth(token)
            .json(&TaskRequest { instruction })
            .send()
            .await
            .map_err(|e| self.transport_error("ask", e))
    }
}

fn is_auth_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

#[async_trait]
impl TaskAgent for PaymanClient {
    async fn ask(&self, instruction: &str) -> Result<TaskResponse> {
        let token = self.access_token().await?;

        tracing::debug!("📡 Asking payment service: {}", instruction);
        let mut response = self.post_task(&token, instruction).await?;

        // 401/403 表示服務沒有執行該任務，換發 token 後重送一次是安全的
        if is_auth_rejection(response.status()) {
            tracing::warn!(
                "🔑 Access token rejected ({}), re-authenticating",
                response.status()
            );
            self.invalidate_token(&token).await;
            let token = self.access_token().await?;
            response = self.post_task(&token, instruction).await?;

            if is_auth_rejection(response.status()) {
                self.invalidate_token(&token).await;
                return Err(ReimburseError::AuthError {
                    message: format!("payment service answered {}", response.status()),
                });
            }
        }

        let status = response.status();
        tracing::debug!("📡 Payment service response status: {}", status);

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error("ask", e))?;

        match serde_json::from_str::<TaskResponse>(&body) {
            Ok(task) => Ok(task),
            Err(_) if !status.is_success() => Err(ReimburseError::HttpStatus {
                operation: "ask".to_string(),
                status: status.as_u16(),
                message: body.trim().to_string(),
            }),
            Err(e) => Err(ReimburseError::MalformedResponse {
                operation: "ask".to_string(),
                message: e.to_string(),
            }),
        }
    }
}
