use async_trait::async_trait;

use crate::{
    Error,
    audit::{AuditEvent, AuditPage, AuditQuery, NewAuditEvent},
};

/// Repository for the append-only audit trail.
///
/// There is deliberately no update or delete operation; events are immutable
/// once written.
#[async_trait]
pub trait AuditRepository: Send + Sync + 'static {
    /// Append one event. A failure here must propagate to the caller; the
    /// boundary fails closed rather than responding without a trail.
    async fn append(&self, event: NewAuditEvent) -> Result<AuditEvent, Error>;

    /// Filtered, paged listing, newest first.
    async fn query(&self, query: &AuditQuery) -> Result<AuditPage, Error>;
}
