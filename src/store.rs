//! Append-only SQLite log of observed prices.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeDelta, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::info;

const CHECK_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
// Rows stamped by SQLite's CURRENT_TIMESTAMP, always UTC.
const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid check date {0:?} in store")]
    Timestamp(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub check_date: DateTime<Utc>,
    pub current_price: f64,
    pub previous_price: Option<f64>,
}

pub struct PriceStore {
    conn: Connection,
}

impl PriceStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        info!("price store ready at {}", path.display());
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Appends an observation and returns the price it replaced, if any.
    pub fn record_observation(
        &mut self,
        url: &str,
        name: &str,
        price: f64,
    ) -> Result<Option<f64>, StoreError> {
        let tx = self.conn.transaction()?;

        let previous: Option<f64> = tx
            .query_row(
                "SELECT current_price FROM product_prices
                 WHERE product_url = ?1
                 ORDER BY check_date DESC, id DESC
                 LIMIT 1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        let latest: Option<String> =
            tx.query_row("SELECT MAX(check_date) FROM product_prices", [], |row| {
                row.get(0)
            })?;
        let check_date = next_check_date(latest.as_deref().map(parse_check_date).transpose()?);

        tx.execute(
            "INSERT INTO product_prices (product_url, product_name, current_price, previous_price, check_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                url,
                name,
                price,
                previous,
                check_date.format(CHECK_DATE_FORMAT).to_string()
            ],
        )?;
        tx.commit()?;

        Ok(previous)
    }

    /// Most recent `limit` observations for `url`, newest first.
    pub fn history(&self, url: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT check_date, current_price, previous_price FROM product_prices
             WHERE product_url = ?1
             ORDER BY check_date DESC, id DESC
             LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![url, limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, Option<f64>>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (check_date, current_price, previous_price) = row?;
            entries.push(HistoryEntry {
                check_date: parse_check_date(&check_date)?,
                current_price,
                previous_price,
            });
        }
        Ok(entries)
    }
}

fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS product_prices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_url TEXT NOT NULL,
            product_name TEXT,
            current_price REAL NOT NULL,
            previous_price REAL,
            check_date TEXT NOT NULL,
            UNIQUE(product_url, check_date)
        );
        CREATE INDEX IF NOT EXISTS idx_product_prices_url_date
            ON product_prices(product_url, check_date);
        "#,
    )
}

// Stamps are strictly increasing even when the clock has not moved on.
fn next_check_date(latest: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    match latest {
        Some(latest) if now <= latest => latest + TimeDelta::microseconds(1),
        _ => now,
    }
}

fn parse_check_date(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, SQLITE_TIMESTAMP_FORMAT).map(|date| date.and_utc())
        })
        .map_err(|_| StoreError::Timestamp(raw.to_string()))
}
