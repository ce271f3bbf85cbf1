//! Audit trail recording and querying.
//!
//! Recording fails closed: an append error propagates to the boundary, which
//! must then fail the whole request rather than respond without a trail.

use std::sync::Arc;

use crate::{
    Error,
    audit::{AuditEvent, AuditPage, AuditQuery, NewAuditEvent},
    repositories::{AuditRepository, AuditRepositoryProvider},
};

#[derive(Clone)]
pub struct AuditService<P: AuditRepositoryProvider> {
    provider: Arc<P>,
}

impl<P: AuditRepositoryProvider> AuditService<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Append one event to the trail.
    ///
    /// An append failure is logged and then propagated; the caller must not
    /// swallow it.
    pub async fn record(&self, event: NewAuditEvent) -> Result<AuditEvent, Error> {
        match self.provider.audit().append(event).await {
            Ok(stored) => Ok(stored),
            Err(err) => {
                tracing::error!(error = %err, "failed to append audit event");
                Err(err)
            }
        }
    }

    /// Filtered, paged listing, newest first. Limit is clamped by the query.
    pub async fn query(&self, query: &AuditQuery) -> Result<AuditPage, Error> {
        self.provider.audit().query(query).await
    }
}
