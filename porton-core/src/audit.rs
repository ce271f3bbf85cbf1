//! Audit trail types.
//!
//! Every authentication-boundary request produces exactly one audit event,
//! on every code path including early validation failures. Events are
//! append-only and immutable once written; the detail payload is an opaque
//! structured blob stored and returned verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::account::{AccountId, Identity, Role};
use crate::client::ClientInfo;
use crate::error::ValidationError;

/// The enumerated authentication actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    LoginSuccess,
    LoginFailure,
    AccountLocked,
    RefreshSuccess,
    RefreshFailure,
    Logout,
    LogoutAll,
}

impl AuditAction {
    /// Stable wire/storage tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::LoginSuccess => "AUTH_LOGIN_SUCCESS",
            AuditAction::LoginFailure => "AUTH_LOGIN_FAIL",
            AuditAction::AccountLocked => "AUTH_ACCOUNT_LOCKED",
            AuditAction::RefreshSuccess => "AUTH_REFRESH_SUCCESS",
            AuditAction::RefreshFailure => "AUTH_REFRESH_FAIL",
            AuditAction::Logout => "AUTH_LOGOUT",
            AuditAction::LogoutAll => "AUTH_LOGOUT_ALL",
        }
    }
}

impl FromStr for AuditAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTH_LOGIN_SUCCESS" => Ok(AuditAction::LoginSuccess),
            "AUTH_LOGIN_FAIL" => Ok(AuditAction::LoginFailure),
            "AUTH_ACCOUNT_LOCKED" => Ok(AuditAction::AccountLocked),
            "AUTH_REFRESH_SUCCESS" => Ok(AuditAction::RefreshSuccess),
            "AUTH_REFRESH_FAIL" => Ok(AuditAction::RefreshFailure),
            "AUTH_LOGOUT" => Ok(AuditAction::Logout),
            "AUTH_LOGOUT_ALL" => Ok(AuditAction::LogoutAll),
            other => Err(ValidationError::InvalidField(format!(
                "unknown audit action: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable audit event, as read back from the store.
///
/// Actor fields are all nullable: a failed identification attempt has no
/// resolved actor, only whatever username the caller claimed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: i64,
    pub actor_id: Option<AccountId>,
    pub actor_username: Option<String>,
    pub actor_role: Option<Role>,
    pub action: AuditAction,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub success: bool,
    pub status_code: Option<u16>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Builder-style payload for appending an event.
#[derive(Debug, Clone)]
pub struct NewAuditEvent {
    pub actor_id: Option<AccountId>,
    pub actor_username: Option<String>,
    pub actor_role: Option<Role>,
    pub action: AuditAction,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub success: bool,
    pub status_code: Option<u16>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl NewAuditEvent {
    pub fn new(action: AuditAction, success: bool) -> Self {
        Self {
            actor_id: None,
            actor_username: None,
            actor_role: None,
            action,
            entity: Some("auth".to_string()),
            entity_id: None,
            success,
            status_code: None,
            ip_address: None,
            user_agent: None,
            details: None,
        }
    }

    /// Attach a fully resolved actor.
    pub fn actor(mut self, identity: &Identity) -> Self {
        self.actor_id = Some(identity.account_id);
        self.actor_username = Some(identity.username.clone());
        self.actor_role = Some(identity.role);
        self
    }

    /// Attach only a claimed username (failed identification).
    pub fn claimed_username(mut self, username: &str) -> Self {
        self.actor_username = Some(username.to_string());
        self
    }

    pub fn client(mut self, client: &ClientInfo) -> Self {
        self.ip_address = client.ip_address.clone();
        self.user_agent = client.user_agent.clone();
        self
    }

    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Filter for the admin audit listing.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub actor_id: Option<AccountId>,
    /// Substring match on the actor username.
    pub username_like: Option<String>,
    pub action: Option<AuditAction>,
    pub success: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl AuditQuery {
    pub const DEFAULT_LIMIT: u32 = 200;
    pub const MAX_LIMIT: u32 = 500;

    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).min(Self::MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

/// One page of audit events plus the unfiltered total for the query.
#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    pub events: Vec<AuditEvent>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_tags_round_trip() {
        for action in [
            AuditAction::LoginSuccess,
            AuditAction::LoginFailure,
            AuditAction::AccountLocked,
            AuditAction::RefreshSuccess,
            AuditAction::RefreshFailure,
            AuditAction::Logout,
            AuditAction::LogoutAll,
        ] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
        assert!("AUTH_PASSWORD_RESET".parse::<AuditAction>().is_err());
    }

    #[test]
    fn test_new_event_builder() {
        let identity = Identity {
            account_id: AccountId::new(7),
            username: "alice".to_string(),
            role: Role::Admin,
        };
        let client = ClientInfo::new(Some("10.1.2.3".to_string()), Some("curl/8".to_string()));

        let event = NewAuditEvent::new(AuditAction::LoginSuccess, true)
            .actor(&identity)
            .client(&client)
            .status_code(200)
            .details(json!({ "user_id": 7 }));

        assert_eq!(event.actor_id, Some(AccountId::new(7)));
        assert_eq!(event.actor_role, Some(Role::Admin));
        assert_eq!(event.ip_address.as_deref(), Some("10.1.2.3"));
        assert_eq!(event.status_code, Some(200));
        assert_eq!(event.entity.as_deref(), Some("auth"));
    }

    #[test]
    fn test_claimed_username_has_no_actor_id() {
        let event = NewAuditEvent::new(AuditAction::LoginFailure, false).claimed_username("ghost");
        assert_eq!(event.actor_id, None);
        assert_eq!(event.actor_username.as_deref(), Some("ghost"));
        assert_eq!(event.actor_role, None);
    }

    #[test]
    fn test_query_limit_clamped() {
        let query = AuditQuery {
            limit: Some(9000),
            ..Default::default()
        };
        assert_eq!(query.effective_limit(), AuditQuery::MAX_LIMIT);
        assert_eq!(AuditQuery::default().effective_limit(), AuditQuery::DEFAULT_LIMIT);
    }
}
