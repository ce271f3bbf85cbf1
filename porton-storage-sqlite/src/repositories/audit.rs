use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use porton_core::{
    Error,
    account::AccountId,
    audit::{AuditEvent, AuditPage, AuditQuery, NewAuditEvent},
    error::StorageError,
    repositories::AuditRepository,
};

use crate::from_unix;

#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteAuditEvent {
    id: i64,
    actor_id: Option<i64>,
    actor_username: Option<String>,
    actor_role: Option<String>,
    action: String,
    entity: Option<String>,
    entity_id: Option<String>,
    success: bool,
    status_code: Option<i64>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    details: Option<String>,
    created_at: i64,
}

impl TryFrom<SqliteAuditEvent> for AuditEvent {
    type Error = Error;

    fn try_from(row: SqliteAuditEvent) -> Result<Self, Error> {
        let details = row
            .details
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(AuditEvent {
            id: row.id,
            actor_id: row.actor_id.map(AccountId::new),
            actor_username: row.actor_username,
            actor_role: row.actor_role.map(|r| r.parse()).transpose()?,
            action: row.action.parse()?,
            entity: row.entity,
            entity_id: row.entity_id,
            success: row.success,
            status_code: row.status_code.map(|c| c as u16),
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            details,
            created_at: from_unix(row.created_at),
        })
    }
}

pub struct SqliteAuditRepository {
    pool: SqlitePool,
}

impl SqliteAuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn push_filters<'q>(builder: &mut QueryBuilder<'q, Sqlite>, query: &'q AuditQuery) {
        if let Some(actor_id) = query.actor_id {
            builder.push(" AND actor_id = ").push_bind(actor_id.as_i64());
        }
        if let Some(username) = &query.username_like {
            builder
                .push(" AND actor_username LIKE ")
                .push_bind(format!("%{username}%"));
        }
        if let Some(action) = query.action {
            builder.push(" AND action = ").push_bind(action.as_str());
        }
        if let Some(success) = query.success {
            builder.push(" AND success = ").push_bind(success);
        }
        if let Some(from) = query.from {
            builder.push(" AND created_at >= ").push_bind(from.timestamp());
        }
        if let Some(to) = query.to {
            builder.push(" AND created_at <= ").push_bind(to.timestamp());
        }
    }
}

#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    async fn append(&self, event: NewAuditEvent) -> Result<AuditEvent, Error> {
        let details = event
            .details
            .as_ref()
            .map(|d| serde_json::to_string(d))
            .transpose()
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        let row = sqlx::query_as::<_, SqliteAuditEvent>(
            r#"
            INSERT INTO audit_log
                (actor_id, actor_username, actor_role, action, entity, entity_id,
                 success, status_code, ip_address, user_agent, details, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            RETURNING *
            "#,
        )
        .bind(event.actor_id.map(|id| id.as_i64()))
        .bind(&event.actor_username)
        .bind(event.actor_role.map(|r| r.as_str()))
        .bind(event.action.as_str())
        .bind(&event.entity)
        .bind(&event.entity_id)
        .bind(event.success)
        .bind(event.status_code.map(|c| c as i64))
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(details)
        .bind(chrono::Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        row.try_into()
    }

    async fn query(&self, query: &AuditQuery) -> Result<AuditPage, Error> {
        let mut count_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM audit_log WHERE 1=1");
        Self::push_filters(&mut count_builder, query);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM audit_log WHERE 1=1");
        Self::push_filters(&mut builder, query);
        builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(query.effective_limit() as i64)
            .push(" OFFSET ")
            .push_bind(query.effective_offset() as i64);

        let rows = builder
            .build_query_as::<SqliteAuditEvent>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        let events = rows
            .into_iter()
            .map(AuditEvent::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AuditPage {
            events,
            total: total as u64,
        })
    }
}
