//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::types::Json;
use std::sync::Arc;
use tracing::warn;

use crate::domain::entities::{Link, LinkMetadata, LinkType};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// PostgreSQL repository for link retrieval and click counters.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    id: i64,
    short_code: String,
    original_url: String,
    link_type: String,
    metadata: Json<LinkMetadata>,
    created_at: DateTime<Utc>,
    expiration_date: Option<DateTime<Utc>>,
    start_date: Option<DateTime<Utc>>,
    max_clicks: Option<i64>,
    clicks: i64,
    last_clicked_at: Option<DateTime<Utc>>,
    password: Option<String>,
    // Decoded leniently in `From<LinkRow>`.
    smart_redirects: Option<Json<Value>>,
    geo_redirects: Option<Json<Value>>,
    ab_test_config: Option<Json<Value>>,
}

/// Decodes an override column, dropping JSON `null` and unreadable values.
fn decode_override<T: DeserializeOwned>(
    code: &str,
    column: &'static str,
    value: Option<Json<Value>>,
) -> Option<T> {
    let value = value?.0;
    if value.is_null() {
        return None;
    }

    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(code, column, error = %e, "Ignoring unreadable link override");
            None
        }
    }
}

impl From<LinkRow> for Link {
    fn from(r: LinkRow) -> Self {
        let smart_redirects = decode_override(&r.short_code, "smart_redirects", r.smart_redirects);
        let geo_redirects = decode_override(&r.short_code, "geo_redirects", r.geo_redirects);
        let ab_test_config = decode_override(&r.short_code, "ab_test_config", r.ab_test_config);

        Link {
            id: r.id,
            short_code: r.short_code,
            original_url: r.original_url,
            link_type: LinkType::from(r.link_type),
            metadata: r.metadata.0,
            created_at: r.created_at,
            expiration_date: r.expiration_date,
            start_date: r.start_date,
            max_clicks: r.max_clicks,
            clicks: r.clicks,
            last_clicked_at: r.last_clicked_at,
            password: r.password,
            smart_redirects,
            geo_redirects,
            ab_test_config,
        }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, short_code, original_url, link_type, metadata, created_at,
                   expiration_date, start_date, max_clicks, clicks, last_clicked_at,
                   password, smart_redirects, geo_redirects, ab_test_config
            FROM links
            WHERE short_code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Link::from))
    }

    async fn increment_clicks(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET clicks = clicks + 1,
                last_clicked_at = GREATEST(COALESCE(last_clicked_at, $2), $2)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(
                "Link not found",
                json!({ "link_id": id }),
            ));
        }

        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::SmartRedirects;

    fn row(
        smart_redirects: Option<Value>,
        geo_redirects: Option<Value>,
        ab_test_config: Option<Value>,
    ) -> LinkRow {
        LinkRow {
            id: 1,
            short_code: "promo".to_string(),
            original_url: "https://example.com".to_string(),
            link_type: "link".to_string(),
            metadata: Json(LinkMetadata::default()),
            created_at: Utc::now(),
            expiration_date: None,
            start_date: None,
            max_clicks: None,
            clicks: 0,
            last_clicked_at: None,
            password: None,
            smart_redirects: smart_redirects.map(Json),
            geo_redirects: geo_redirects.map(Json),
            ab_test_config: ab_test_config.map(Json),
        }
    }

    #[test]
    fn test_well_formed_overrides_are_decoded() {
        let link = Link::from(row(
            Some(json!({ "ios": "https://example.com/ios" })),
            Some(json!({ "US": "https://example.com/us" })),
            Some(json!({
                "enabled": true,
                "variants": [{ "url": "https://example.com/a", "weight": 50.0 }]
            })),
        ));

        assert_eq!(
            link.smart_redirects,
            Some(SmartRedirects {
                ios: Some("https://example.com/ios".to_string()),
                ..Default::default()
            })
        );
        assert_eq!(
            link.geo_redirects.unwrap().get("US").map(String::as_str),
            Some("https://example.com/us")
        );
        assert_eq!(link.ab_test_config.unwrap().variants.len(), 1);
    }

    #[test]
    fn test_json_null_overrides_are_absent() {
        let link = Link::from(row(Some(Value::Null), Some(Value::Null), Some(Value::Null)));

        assert_eq!(link.smart_redirects, None);
        assert_eq!(link.geo_redirects, None);
        assert_eq!(link.ab_test_config, None);
        assert_eq!(link.original_url, "https://example.com");
    }

    #[test]
    fn test_malformed_overrides_do_not_break_the_link() {
        let link = Link::from(row(
            Some(json!("https://example.com/ios")),
            Some(json!({ "US": 42 })),
            Some(json!({ "enabled": true, "variants": [{ "url": "https://example.com/a" }] })),
        ));

        assert_eq!(link.smart_redirects, None);
        assert_eq!(link.geo_redirects, None);
        assert_eq!(link.ab_test_config, None);
        assert_eq!(link.short_code, "promo");
    }
}
