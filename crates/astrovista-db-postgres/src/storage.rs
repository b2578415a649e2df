//! `ApodStorage` implementation over PostgreSQL.

use astrovista_core::{Apod, ApodDate};
use astrovista_storage::{
    ApodStorage, DateRange, SearchPage, SearchQuery, StorageError, with_new_id,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::PostgresConfig;
use crate::error::{PG_UNIQUE_VIOLATION, PostgresError, has_pg_error_code};
use crate::{pool, schema};

/// PostgreSQL-backed APOD storage.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connects to the database and optionally creates the schema.
    pub async fn new(config: PostgresConfig) -> crate::Result<Self> {
        let pool = pool::create_pool(&config).await?;
        if config.ensure_schema {
            schema::ensure_schema(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Wraps an existing pool. The schema is assumed to exist.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode(resource: Value) -> Result<Apod, StorageError> {
    serde_json::from_value(resource).map_err(|e| PostgresError::from(e).into())
}

fn decode_all(rows: Vec<Value>) -> Result<Vec<Apod>, StorageError> {
    rows.into_iter().map(decode).collect()
}

fn sql_error(err: sqlx_core::error::Error) -> StorageError {
    PostgresError::from(err).into()
}

/// Escapes `LIKE` metacharacters so user input matches literally.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 2);
    escaped.push('%');
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// A `WHERE` clause with its positional text parameters.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct WhereClause {
    pub sql: String,
    pub params: Vec<String>,
}

pub(crate) fn build_where(query: &SearchQuery) -> WhereClause {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    if let Some(media_type) = &query.media_type {
        params.push(media_type.as_str().to_string());
        conditions.push(format!("resource->>'media_type' = ${}", params.len()));
    }
    if let Some(text) = &query.text {
        params.push(escape_like(text));
        let n = params.len();
        conditions.push(format!(
            "(resource->>'title' ILIKE ${n} OR resource->>'explanation' ILIKE ${n})"
        ));
    }
    if let Some(start) = &query.start {
        params.push(start.to_string());
        conditions.push(format!("date >= ${}", params.len()));
    }
    if let Some(end) = &query.end {
        params.push(end.to_string());
        conditions.push(format!("date <= ${}", params.len()));
    }

    let sql = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    WhereClause { sql, params }
}

#[async_trait]
impl ApodStorage for PostgresStorage {
    #[instrument(skip(self))]
    async fn latest(&self) -> Result<Option<Apod>, StorageError> {
        let row: Option<Value> =
            query_scalar("SELECT resource FROM apod ORDER BY date DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(sql_error)?;
        row.map(decode).transpose()
    }

    #[instrument(skip(self), fields(date = %date))]
    async fn find_by_date(&self, date: &ApodDate) -> Result<Option<Apod>, StorageError> {
        let row: Option<Value> = query_scalar("SELECT resource FROM apod WHERE date = $1")
            .bind(date.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(sql_error)?;
        row.map(decode).transpose()
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Apod>, StorageError> {
        let rows: Vec<Value> = query_scalar("SELECT resource FROM apod ORDER BY date DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(sql_error)?;
        decode_all(rows)
    }

    #[instrument(skip(self))]
    async fn date_range(&self, range: &DateRange) -> Result<Vec<Apod>, StorageError> {
        let rows: Vec<Value> = match range.start {
            Some(start) => query_scalar::<_, Value>(
                "SELECT resource FROM apod WHERE date >= $1 AND date <= $2 ORDER BY date ASC",
            )
            .bind(start.to_string())
            .bind(range.end.to_string())
            .fetch_all(&self.pool)
            .await,
            None => query_scalar::<_, Value>(
                "SELECT resource FROM apod WHERE date <= $1 ORDER BY date ASC",
            )
                .bind(range.end.to_string())
                .fetch_all(&self.pool)
                .await,
        }
        .map_err(sql_error)?;
        decode_all(rows)
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, StorageError> {
        let clause = build_where(query);

        let count_sql = format!("SELECT COUNT(*) FROM apod{}", clause.sql);
        let mut count = query_scalar::<_, i64>(&count_sql);
        for param in &clause.params {
            count = count.bind(param.as_str());
        }
        let total = count.fetch_one(&self.pool).await.map_err(|e| {
            tracing::warn!(error = %e, "Count query failed");
            sql_error(e)
        })?;

        let offset = i64::try_from(query.offset())
            .map_err(|_| StorageError::invalid_query("page offset out of range"))?;
        let page_sql = format!(
            "SELECT resource FROM apod{} ORDER BY date {} LIMIT {} OFFSET {}",
            clause.sql,
            query.sort.as_sql(),
            query.per_page,
            offset
        );
        let mut page = query_scalar::<_, Value>(&page_sql);
        for param in &clause.params {
            page = page.bind(param.as_str());
        }
        let rows = page.fetch_all(&self.pool).await.map_err(sql_error)?;

        Ok(SearchPage::new(total.max(0) as u64, decode_all(rows)?))
    }

    #[instrument(skip(self, apod), fields(date = %apod.date))]
    async fn insert(&self, apod: Apod) -> Result<Apod, StorageError> {
        let stored = with_new_id(apod);
        let id = stored.id.unwrap_or_else(Uuid::new_v4);
        let resource = serde_json::to_value(&stored).map_err(PostgresError::from)?;

        let inserted: Option<Uuid> = query_scalar(
            "INSERT INTO apod (date, id, resource) VALUES ($1, $2, $3)
             ON CONFLICT (date) DO NOTHING
             RETURNING id",
        )
        .bind(stored.date.to_string())
        .bind(id)
        .bind(resource)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if has_pg_error_code(&e, PG_UNIQUE_VIOLATION) {
                StorageError::already_exists(stored.date.to_string())
            } else {
                sql_error(e)
            }
        })?;

        match inserted {
            Some(_) => {
                debug!("APOD inserted");
                Ok(stored)
            }
            None => Err(StorageError::already_exists(stored.date.to_string())),
        }
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx_core::query::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(sql_error)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrovista_storage::MediaTypeFilter;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("galaxy"), "%galaxy%");
        assert_eq!(escape_like("100%_off"), "%100\\%\\_off%");
        assert_eq!(escape_like("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_build_where_empty() {
        assert_eq!(build_where(&SearchQuery::new()), WhereClause::default());
    }

    #[test]
    fn test_build_where_all_filters() {
        let query = SearchQuery::new()
            .with_media_type(MediaTypeFilter::Image)
            .with_text("nebula")
            .with_dates(
                Some("2023-01-01".parse().unwrap()),
                Some("2023-12-31".parse().unwrap()),
            );
        let clause = build_where(&query);
        assert_eq!(
            clause.sql,
            " WHERE resource->>'media_type' = $1 AND \
             (resource->>'title' ILIKE $2 OR resource->>'explanation' ILIKE $2) AND \
             date >= $3 AND date <= $4"
        );
        assert_eq!(
            clause.params,
            ["image", "%nebula%", "2023-01-01", "2023-12-31"]
        );
    }

    #[test]
    fn test_build_where_numbers_params_densely() {
        let query = SearchQuery::new()
            .with_dates(None, Some("2023-12-31".parse().unwrap()));
        let clause = build_where(&query);
        assert_eq!(clause.sql, " WHERE date <= $1");
        assert_eq!(clause.params, ["2023-12-31"]);
    }
}
