//! Schema management for the PostgreSQL storage backend.
//!
//! APODs live in a single `apod` table keyed by date, with the full record
//! kept as JSONB.

use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

pub const APOD_TABLE: &str = "apod";

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS apod (
        date TEXT PRIMARY KEY,
        id UUID NOT NULL UNIQUE,
        resource JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_MEDIA_TYPE_INDEX_SQL: &str = r#"
    CREATE INDEX IF NOT EXISTS apod_media_type_idx ON apod ((resource->>'media_type'))
"#;

/// Creates the `apod` table and its indexes if they are missing.
#[instrument(skip(pool))]
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for sql in [CREATE_TABLE_SQL, CREATE_MEDIA_TYPE_INDEX_SQL] {
        sqlx_core::query::query(sql)
            .execute(pool)
            .await
            .map_err(PostgresError::from)?;
    }
    info!(table = APOD_TABLE, "APOD schema ready");
    Ok(())
}
