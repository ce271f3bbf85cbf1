use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use porton_core::{
    Identity,
    audit::{AuditEvent, AuditQuery},
    error::ValidationError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl From<&Identity> for UserResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.account_id.as_i64(),
            username: identity.username.clone(),
            role: identity.role.to_string(),
        }
    }
}

/// Successful login: both tokens plus the authenticated user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub user: UserResponse,
}

/// Successful refresh: a fresh access token only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutAllResponse {
    pub message: String,
    pub tokens_revoked: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Query parameters accepted by the audit listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    pub username: Option<String>,
    pub action: Option<String>,
    pub success: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl TryFrom<LogsQuery> for AuditQuery {
    type Error = ValidationError;

    fn try_from(query: LogsQuery) -> Result<Self, ValidationError> {
        Ok(AuditQuery {
            actor_id: None,
            username_like: query.username,
            action: query.action.as_deref().map(str::parse).transpose()?,
            success: query.success,
            from: query.from,
            to: query.to,
            limit: query.limit,
            offset: query.offset,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<AuditEvent>,
    pub total: u64,
}

/// Client address and agent as seen at the HTTP boundary.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl From<&ConnectionInfo> for porton_core::ClientInfo {
    fn from(info: &ConnectionInfo) -> Self {
        porton_core::ClientInfo::new(info.ip.clone(), info.user_agent.clone())
    }
}
