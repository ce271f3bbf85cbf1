//! Client metadata attached to authentication requests.

use serde::{Deserialize, Serialize};

/// Where a request came from, as far as the boundary can tell.
///
/// Both fields are optional: direct socket connections may have no forwarded
/// address and non-browser clients often send no user agent. The rate limiter
/// keys on `ip_address` and falls back to a shared bucket when it is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address,
            user_agent,
        }
    }

    /// Rate-limiter key. Unknown addresses share one bucket rather than
    /// bypassing the limiter entirely.
    pub fn limiter_key(&self) -> &str {
        self.ip_address.as_deref().unwrap_or("unknown")
    }
}
