//! Services implementing the authentication core's behaviour over the
//! repository traits.

pub mod access_token;
pub mod audit;
pub mod lockout;
pub mod password;
pub mod rate_limit;
pub mod refresh;

pub use access_token::AccessTokenService;
pub use audit::AuditService;
pub use lockout::{LockoutGate, LockoutService};
pub use password::PasswordVerifier;
pub use rate_limit::{LoginRateLimiter, RateLimitDecision};
pub use refresh::RefreshTokenService;
