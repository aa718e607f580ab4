use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::core::clock::Clock;
use crate::core::errors::RiskError;
use crate::report::{RiskLevel, TokenReport, TokenSummary};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    /// Clamps `page` to >= 1 and `per_page` to `1..=100`.
    pub fn new(page: u32, per_page: u32, total: u64) -> Self {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        Self { page, per_page, total, pages: total.div_ceil(u64::from(per_page)) }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub tokens: Vec<TokenSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_tokens: u64,
    pub fraud_tokens: u64,
    pub safe_tokens: u64,
    pub recent_24h: u64,
    /// Share of fraud rows, one decimal
    pub fraud_percentage: f64,
}

impl CacheStats {
    pub fn new(total_tokens: u64, fraud_tokens: u64, safe_tokens: u64, recent_24h: u64) -> Self {
        let fraud_percentage = if total_tokens > 0 {
            round1(fraud_tokens as f64 / total_tokens as f64 * 100.0)
        } else {
            0.0
        };
        Self { total_tokens, fraud_tokens, safe_tokens, recent_24h, fraud_percentage }
    }
}

pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Report cache
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Newest report for `token_id` fetched no earlier than `now - ttl`.
    async fn get_fresh(
        &self,
        token_id: &str,
        ttl: chrono::Duration,
    ) -> Result<Option<TokenReport>, RiskError>;

    /// Append a report row. Rows are never updated.
    async fn put(&self, report: &TokenReport) -> Result<i64, RiskError>;

    async fn list(&self, page: u32, per_page: u32) -> Result<Page, RiskError>;

    async fn stats(&self) -> Result<CacheStats, RiskError>;
}

#[derive(Debug)]
pub struct SqliteReportStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    is_memory: bool,
}

impl SqliteReportStore {
    pub async fn new_with_url(
        database_url: &str,
        max_connections: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let db_url = normalize_sqlite_url(database_url);
        let is_memory = db_url.contains(":memory:");

        let safe_db_url_info = match db_url.split_once("://") {
            Some((scheme, rest)) => format!("{}://(redacted, len={})", scheme, rest.len()),
            None => "(invalid db_url format)".to_string(),
        };
        info!(db = %safe_db_url_info, "[storage] connecting to database");

        let mut connect_options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| anyhow::anyhow!("Invalid database URL: {}", e))?
            .create_if_missing(true);
        if !is_memory {
            connect_options = connect_options
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        }

        // every connection to :memory: opens its own database, so keep exactly one alive
        let pool_options = if is_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .acquire_timeout(Duration::from_secs(30))
                .idle_timeout(Duration::from_secs(600))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

        let store = Self { pool, clock, is_memory };
        store.initialize_schema().await?;

        info!("Report store initialized");
        Ok(store)
    }

    pub fn is_in_memory(&self) -> bool {
        self.is_memory
    }

    async fn initialize_schema(&self) -> Result<()> {
        debug!("Initializing token_reports schema");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS token_reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token_id TEXT NOT NULL,
                name TEXT NOT NULL,
                symbol TEXT NOT NULL,
                score_normalised REAL NOT NULL DEFAULT 0,
                risk_level TEXT NOT NULL,
                price REAL NOT NULL DEFAULT 0,
                holders INTEGER NOT NULL DEFAULT 0,
                liquidity REAL NOT NULL DEFAULT 0,
                market_cap REAL NOT NULL DEFAULT 0,
                creator_holdings_pct REAL NOT NULL DEFAULT 0,
                detected_at TEXT NOT NULL DEFAULT '',
                fetched_at INTEGER NOT NULL,
                raw_json TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create token_reports table: {}", e))?;

        for ddl in [
            "CREATE INDEX IF NOT EXISTS idx_token_reports_token_id ON token_reports(token_id)",
            "CREATE INDEX IF NOT EXISTS idx_token_reports_fetched_at ON token_reports(fetched_at)",
            "CREATE INDEX IF NOT EXISTS idx_token_reports_token_fetched ON token_reports(token_id, fetched_at)",
        ] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create index: {}", e))?;
        }

        debug!("Schema ready");
        Ok(())
    }

    async fn count(&self, sql: &str, since_ms: Option<i64>) -> Result<u64, RiskError> {
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        if let Some(ms) = since_ms {
            query = query.bind(ms);
        }
        let n = query.fetch_one(&self.pool).await?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}

/// Accept `sqlite:path` as well as `sqlite://path` and create the parent
/// directory of file-backed databases.
fn normalize_sqlite_url(database_url: &str) -> String {
    let mut db_url = database_url.to_string();
    if db_url.starts_with("sqlite:") && !db_url.starts_with("sqlite://") {
        db_url = db_url.replacen("sqlite:", "sqlite://", 1);
    }

    if let Some(path) = db_url.strip_prefix("sqlite://") {
        let path_only = path.split_once('?').map(|(p, _)| p).unwrap_or(path);
        if path_only != ":memory:" && !path_only.is_empty() {
            if let Some(parent) = std::path::Path::new(path_only).parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(e) = std::fs::create_dir_all(parent) {
                        warn!("Failed to create database dir {:?}: {}", parent, e);
                    }
                }
            }
        }
    }
    db_url
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, RiskError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| RiskError::Storage(format!("fetched_at out of range: {}", ms)))
}

fn summary_from_row(row: &SqliteRow) -> Result<TokenSummary, RiskError> {
    Ok(TokenSummary {
        id: row.try_get("id")?,
        token_id: row.try_get("token_id")?,
        name: row.try_get("name")?,
        symbol: row.try_get("symbol")?,
        risk_level: RiskLevel::parse_lenient(&row.try_get::<String, _>("risk_level")?),
        score_normalised: row.try_get("score_normalised")?,
        price: row.try_get("price")?,
        market_cap: row.try_get("market_cap")?,
        liquidity: row.try_get("liquidity")?,
        holders: row.try_get("holders")?,
        creator_holdings_pct: row.try_get("creator_holdings_pct")?,
        detected_at: row.try_get("detected_at")?,
        fetched_at: millis_to_datetime(row.try_get("fetched_at")?)?,
    })
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn get_fresh(
        &self,
        token_id: &str,
        ttl: chrono::Duration,
    ) -> Result<Option<TokenReport>, RiskError> {
        let cutoff = (self.clock.now() - ttl).timestamp_millis();

        let row = sqlx::query(
            r#"
            SELECT * FROM token_reports
            WHERE token_id = ? AND fetched_at >= ?
            ORDER BY fetched_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(token_id)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            debug!(%token_id, "cache miss");
            return Ok(None);
        };

        let raw: String = row.try_get("raw_json")?;
        let raw_json = match serde_json::from_str::<Value>(&raw) {
            Ok(v) => v,
            Err(e) => {
                let err = RiskError::from(e);
                warn!(%token_id, error = %err, "cached raw_json unreadable, using empty object");
                Value::Object(Default::default())
            }
        };

        Ok(Some(TokenReport {
            token_id: row.try_get("token_id")?,
            name: row.try_get("name")?,
            symbol: row.try_get("symbol")?,
            score_normalised: row.try_get("score_normalised")?,
            risk_level: RiskLevel::parse_lenient(&row.try_get::<String, _>("risk_level")?),
            price: row.try_get("price")?,
            holders: row.try_get("holders")?,
            liquidity: row.try_get("liquidity")?,
            market_cap: row.try_get("market_cap")?,
            creator_holdings_pct: row.try_get("creator_holdings_pct")?,
            detected_at: row.try_get("detected_at")?,
            fetched_at: millis_to_datetime(row.try_get("fetched_at")?)?,
            raw_json,
        }))
    }

    async fn put(&self, report: &TokenReport) -> Result<i64, RiskError> {
        let result = sqlx::query(
            r#"
            INSERT INTO token_reports (
                token_id, name, symbol, score_normalised, risk_level,
                price, holders, liquidity, market_cap, creator_holdings_pct,
                detected_at, fetched_at, raw_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&report.token_id)
        .bind(&report.name)
        .bind(&report.symbol)
        .bind(report.score_normalised)
        .bind(report.risk_level.as_str())
        .bind(report.price)
        .bind(report.holders)
        .bind(report.liquidity)
        .bind(report.market_cap)
        .bind(report.creator_holdings_pct)
        .bind(&report.detected_at)
        .bind(report.fetched_at.timestamp_millis())
        .bind(report.raw_json.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RiskError::Persistence(format!("Failed to save token report: {}", e)))?;

        debug!(token_id = %report.token_id, "report stored");
        Ok(result.last_insert_rowid())
    }

    async fn list(&self, page: u32, per_page: u32) -> Result<Page, RiskError> {
        let total = self.count("SELECT COUNT(*) FROM token_reports", None).await?;
        let pagination = Pagination::new(page, per_page, total);

        let rows = sqlx::query(
            r#"
            SELECT
                id, token_id, name, symbol, risk_level, score_normalised,
                price, market_cap, liquidity, holders, creator_holdings_pct,
                detected_at, fetched_at
            FROM token_reports
            ORDER BY fetched_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(i64::from(pagination.per_page))
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let tokens = rows.iter().map(summary_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page { tokens, pagination })
    }

    async fn stats(&self) -> Result<CacheStats, RiskError> {
        let since = (self.clock.now() - chrono::Duration::hours(24)).timestamp_millis();

        let total = self.count("SELECT COUNT(*) FROM token_reports", None).await?;
        let fraud = self
            .count("SELECT COUNT(*) FROM token_reports WHERE risk_level = 'Fraud'", None)
            .await?;
        let safe = self
            .count("SELECT COUNT(*) FROM token_reports WHERE risk_level = 'Safe'", None)
            .await?;
        let recent = self
            .count("SELECT COUNT(*) FROM token_reports WHERE fetched_at >= ?", Some(since))
            .await?;

        Ok(CacheStats::new(total, fraud, safe, recent))
    }
}
