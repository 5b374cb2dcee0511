//! PostgreSQL implementation of the click event store.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{ClickEvent, MinimalClickEvent};
use crate::domain::repositories::ClickRepository;
use crate::error::AppError;

/// Channel name stored with minimal events.
const MINIMAL_CHANNEL: &str = "minimal";

/// Appends rows to `link_clicks`.
pub struct PgClickRepository {
    pool: Arc<PgPool>,
}

impl PgClickRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClickRepository for PgClickRepository {
    async fn append(&self, event: ClickEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO link_clicks (
                link_id, clicked_at, referrer, device, os, browser, country,
                visitor_id, destination_url, language, screen_width, screen_height,
                timezone, utm_source, utm_medium, utm_campaign, utm_term, utm_content,
                channel
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(event.link_id)
        .bind(event.timestamp)
        .bind(&event.referrer)
        .bind(&event.device)
        .bind(&event.os)
        .bind(&event.browser)
        .bind(&event.country)
        .bind(&event.visitor_id)
        .bind(&event.destination_url)
        .bind(&event.language)
        .bind(event.screen_width)
        .bind(event.screen_height)
        .bind(&event.timezone)
        .bind(&event.utm.source)
        .bind(&event.utm.medium)
        .bind(&event.utm.campaign)
        .bind(&event.utm.term)
        .bind(&event.utm.content)
        .bind(event.channel)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn append_minimal(&self, event: MinimalClickEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO link_clicks (link_id, clicked_at, device, os, channel)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.link_id)
        .bind(event.timestamp)
        .bind(&event.device)
        .bind(&event.os)
        .bind(MINIMAL_CHANNEL)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
