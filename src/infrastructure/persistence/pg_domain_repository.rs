//! PostgreSQL implementation of domain repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{BindingStatus, DomainBinding, TargetType};
use crate::domain::repositories::DomainRepository;
use crate::error::AppError;

/// PostgreSQL repository for custom domain bindings.
pub struct PgDomainRepository {
    pool: Arc<PgPool>,
}

impl PgDomainRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BindingRow {
    domain: String,
    owner_id: i64,
    status: String,
    target_type: String,
}

impl From<BindingRow> for DomainBinding {
    fn from(r: BindingRow) -> Self {
        DomainBinding {
            domain: r.domain,
            owner_id: r.owner_id,
            status: BindingStatus::parse(&r.status),
            target_type: TargetType::parse(&r.target_type),
        }
    }
}

#[async_trait]
impl DomainRepository for PgDomainRepository {
    async fn find_binding(&self, host: &str) -> Result<Option<DomainBinding>, AppError> {
        let row = sqlx::query_as::<_, BindingRow>(
            r#"
            SELECT domain, owner_id, status, target_type
            FROM domain_bindings
            WHERE domain = $1
            "#,
        )
        .bind(host)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(DomainBinding::from))
    }

    async fn find_public_handle(&self, owner_id: i64) -> Result<Option<String>, AppError> {
        let handle = sqlx::query_scalar::<_, Option<String>>(
            "SELECT handle FROM profiles WHERE id = $1",
        )
        .bind(owner_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(handle.flatten().filter(|h| !h.is_empty()))
    }
}
