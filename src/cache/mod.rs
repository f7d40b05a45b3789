//! SQLite-backed scan cache.
//!
//! Reports are stored as JSON keyed by the SHA-256 of the canonical URL.
//! The cache is strictly an optimization: read errors degrade to a cache
//! miss and the scan proceeds, so a corrupt or locked database never blocks
//! scanning.

use anyhow::{Context, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::time::Duration;

use crate::models::ScanReport;

/// Cached verdicts older than this are treated as misses by default.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS scans (
        url_hash    TEXT PRIMARY KEY,
        url         TEXT NOT NULL,
        report_json TEXT NOT NULL,
        created_at  INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_scans_created_at ON scans (created_at)",
];

/// Aggregate statistics over the cached scan history.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    /// Number of cached scans.
    pub total: u64,
    /// Number of cached scans with a malicious verdict.
    pub malicious: u64,
    /// Mean domain entropy across cached scans.
    pub avg_entropy: f64,
    /// Scan count per hosting country of the final domain.
    pub country_counts: HashMap<String, u64>,
}

/// Scan cache over a single SQLite database.
pub struct ScanCache {
    pool: SqlitePool,
}

impl ScanCache {
    /// Opens (and creates, if needed) a cache at `path`.
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open scan cache at {path}"))?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Opens an in-memory cache (used by tests).
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().in_memory(true))
            .await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    fn key(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    /// Looks up a fresh cached report for a canonical URL.
    ///
    /// Stale entries and read errors both come back as `None`.
    pub async fn get(&self, url: &str, max_age: Duration) -> Option<ScanReport> {
        let cutoff = Utc::now().timestamp_millis() - max_age.as_millis() as i64;
        let row = sqlx::query(
            "SELECT report_json FROM scans WHERE url_hash = ? AND created_at >= ?",
        )
        .bind(Self::key(url))
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(Some(row)) => {
                let json: String = row.get("report_json");
                match serde_json::from_str(&json) {
                    Ok(report) => Some(report),
                    Err(e) => {
                        log::warn!("Discarding undecodable cache entry for {url}: {e}");
                        None
                    }
                }
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Cache read failed for {url}: {e}");
                None
            }
        }
    }

    /// Stores a report, replacing any previous entry for the same URL.
    pub async fn set(&self, report: &ScanReport) -> Result<()> {
        let json = serde_json::to_string(report)?;
        sqlx::query(
            "INSERT OR REPLACE INTO scans (url_hash, url, report_json, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(Self::key(&report.url))
        .bind(&report.url)
        .bind(json)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns the most recent cached reports, newest first.
    pub async fn history(&self, limit: u32) -> Result<Vec<ScanReport>> {
        let rows = sqlx::query(
            "SELECT report_json FROM scans ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            let json: String = row.get("report_json");
            match serde_json::from_str(&json) {
                Ok(report) => reports.push(report),
                Err(e) => log::warn!("Skipping undecodable history entry: {e}"),
            }
        }
        Ok(reports)
    }

    /// Computes aggregate statistics over the full cached history.
    pub async fn stats(&self) -> Result<CacheStats> {
        let rows = sqlx::query("SELECT report_json FROM scans")
            .fetch_all(&self.pool)
            .await?;

        let mut total = 0u64;
        let mut malicious = 0u64;
        let mut entropy_sum = 0f64;
        let mut country_counts: HashMap<String, u64> = HashMap::new();
        for row in rows {
            let json: String = row.get("report_json");
            let Ok(report) = serde_json::from_str::<ScanReport>(&json) else {
                continue;
            };
            total += 1;
            if report.is_malicious {
                malicious += 1;
            }
            entropy_sum += report.heuristics.entropy;
            if let Some(geo) = &report.geo {
                *country_counts.entry(geo.country.clone()).or_default() += 1;
            }
        }

        Ok(CacheStats {
            total,
            malicious,
            avg_entropy: if total > 0 {
                entropy_sum / total as f64
            } else {
                0.0
            },
            country_counts,
        })
    }
}
