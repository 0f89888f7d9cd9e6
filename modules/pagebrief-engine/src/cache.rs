//! URL-keyed summary persistence.
//!
//! The store keeps the provider response envelope verbatim in a JSONB
//! column; lookups re-normalize it into a [`SummaryRecord`] through the same
//! path a live call uses. Writes are upserts, so a concurrent duplicate
//! summarization of one URL resolves to last-writer-wins instead of a
//! constraint violation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use llm_client::Envelope;
use pagebrief_common::{CacheError, CacheResult, SummaryRecord, TokenUsage};

#[async_trait]
pub trait SummaryCache: Send + Sync {
    /// Fetch the cached summary for a URL, if one exists.
    async fn lookup(&self, url: &str) -> CacheResult<Option<SummaryRecord>>;

    /// Upsert the provider envelope for a URL. A second store for the same
    /// URL overwrites the payload and bumps `updated_at`.
    async fn store(&self, url: &str, envelope: &Envelope, word_count: usize) -> CacheResult<()>;
}

pub struct PgSummaryCache {
    pool: PgPool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SummaryRow {
    url: String,
    summary: serde_json::Value,
    word_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SummaryRow {
    fn into_record(self) -> CacheResult<SummaryRecord> {
        let envelope: Envelope = serde_json::from_value(self.summary)
            .map_err(|e| CacheError::Envelope(e.to_string()))?;
        let completion = envelope
            .normalize()
            .map_err(|e| CacheError::Envelope(e.to_string()))?;

        Ok(SummaryRecord {
            url: self.url,
            summary_text: completion.text,
            model_id: completion.model,
            token_usage: TokenUsage {
                input_tokens: completion.usage.input_tokens,
                output_tokens: completion.usage.output_tokens,
            },
            word_count: self.word_count.max(0) as usize,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgSummaryCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> CacheResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CacheError::Database(e.into()))?;
        info!("Summary cache migrations applied");
        Ok(())
    }
}

#[async_trait]
impl SummaryCache for PgSummaryCache {
    async fn lookup(&self, url: &str) -> CacheResult<Option<SummaryRecord>> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT url, summary, word_count, created_at, updated_at
            FROM url_summaries
            WHERE url = $1
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SummaryRow::into_record).transpose()
    }

    async fn store(&self, url: &str, envelope: &Envelope, word_count: usize) -> CacheResult<()> {
        let summary =
            serde_json::to_value(envelope).map_err(|e| CacheError::Envelope(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO url_summaries (url, summary, word_count)
            VALUES ($1, $2, $3)
            ON CONFLICT (url) DO UPDATE
            SET summary = EXCLUDED.summary,
                word_count = EXCLUDED.word_count,
                updated_at = now()
            "#,
        )
        .bind(url)
        .bind(&summary)
        .bind(word_count as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
