//! Accounts, roles and the capability table.
//!
//! Accounts are owned by the credential store. The core reads them for
//! authentication decisions and mutates only the lockout columns; creating or
//! editing accounts is an administrative concern outside this crate.
//!
//! | Field             | Type               | Description                                   |
//! | ----------------- | ------------------ | --------------------------------------------- |
//! | `id`              | `AccountId`        | Numeric row id, stable for the account.       |
//! | `username`        | `String`           | Unique login name, immutable within the core. |
//! | `role`            | `Role`             | Closed role enumeration.                      |
//! | `is_active`       | `bool`             | Deactivated accounts are denied everything.   |
//! | `failed_attempts` | `u32`              | Consecutive failed logins, 0 after success.   |
//! | `locked_until`    | `Option<DateTime>` | Non-null while a lockout is in force.         |
//! | `last_failed_at`  | `Option<DateTime>` | Informational.                                |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

/// Numeric identifier of an account row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    pub fn new(id: i64) -> Self {
        AccountId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for AccountId {
    fn from(id: i64) -> Self {
        AccountId(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed enumeration of roles.
///
/// Authorization is decided through [`Role::can`] against the capability
/// table below, never through string comparison at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Clerk,
}

/// Operations that can be gated on a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Create, deactivate and edit accounts.
    ManageAccounts,
    /// Read the audit trail.
    ViewAuditLog,
    /// Create and edit business records.
    ManageRecords,
    /// Export business records.
    ExportRecords,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Clerk => "clerk",
        }
    }

    /// The capability table. One place, checked everywhere.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Admin => &[
                Permission::ManageAccounts,
                Permission::ViewAuditLog,
                Permission::ManageRecords,
                Permission::ExportRecords,
            ],
            Role::Manager => &[
                Permission::ViewAuditLog,
                Permission::ManageRecords,
                Permission::ExportRecords,
            ],
            Role::Clerk => &[Permission::ManageRecords],
        }
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "clerk" => Ok(Role::Clerk),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An account as read from the credential store.
///
/// The password hash is deliberately not part of this struct; it is fetched
/// separately and only on the code path that actually compares it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub role: Role,
    pub is_active: bool,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A lockout is in force only while `locked_until` lies in the future.
    /// Once `now` passes it the account behaves as unlocked even before the
    /// counters are explicitly reset.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// True when a past `locked_until` is still recorded and should be
    /// lazily cleared on the next evaluation.
    pub fn lock_expired(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until <= now)
    }

    pub fn identity(&self) -> Identity {
        Identity {
            account_id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// The validated output of access-token authentication: who is calling and
/// with what role. This is the only thing downstream routes consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub account_id: AccountId,
    pub username: String,
    pub role: Role,
}

/// Lockout columns as returned by the atomic failure-recording update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutCounters {
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account(locked_until: Option<DateTime<Utc>>) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(1),
            username: "alice".to_string(),
            role: Role::Clerk,
            is_active: true,
            failed_attempts: 0,
            locked_until,
            last_failed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Admin, Role::Manager, Role::Clerk] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("direccion".parse::<Role>().is_err());
    }

    #[test]
    fn test_capability_table() {
        assert!(Role::Admin.can(Permission::ManageAccounts));
        assert!(Role::Admin.can(Permission::ViewAuditLog));
        assert!(Role::Manager.can(Permission::ViewAuditLog));
        assert!(!Role::Manager.can(Permission::ManageAccounts));
        assert!(Role::Clerk.can(Permission::ManageRecords));
        assert!(!Role::Clerk.can(Permission::ViewAuditLog));
    }

    #[test]
    fn test_lock_state_is_time_relative() {
        let now = Utc::now();

        let unlocked = account(None);
        assert!(!unlocked.is_locked(now));
        assert!(!unlocked.lock_expired(now));

        let locked = account(Some(now + Duration::minutes(5)));
        assert!(locked.is_locked(now));
        assert!(!locked.lock_expired(now));

        // The same row, evaluated after the lock window passed.
        let stale = account(Some(now - Duration::seconds(1)));
        assert!(!stale.is_locked(now));
        assert!(stale.lock_expired(now));
    }

    #[test]
    fn test_identity_echoes_account() {
        let acct = account(None);
        let identity = acct.identity();
        assert_eq!(identity.account_id, acct.id);
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.role, Role::Clerk);
    }

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&Role::Manager).unwrap();
        assert_eq!(json, "\"manager\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
