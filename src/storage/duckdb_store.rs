use super::facts::{
    BreakdownRow, CustomEvent, DailyStat, Dimension, PageView, StatDelta, Visit, TIMESTAMP_READ_FORMAT,
    TIMESTAMP_WRITE_FORMAT,
};
use super::{
    hash_api_key, normalize_domain, AccountId, AnalyticsStore, ApiKeyAuthenticator,
    DomainRegistry, StoreError,
};
use crate::query::range::DateInterval;
use chrono::{NaiveDate, NaiveDateTime};
use duckdb::types::Type;
use duckdb::{Connection, OptionalExt, Row};
use parking_lot::Mutex;
use std::path::Path;

/// DuckDB-backed store implementing the fact, rollup, registry and key contracts.
///
/// A single connection is shared behind a mutex; every statement executes
/// while holding it, and the rollup upsert is one `ON CONFLICT` statement.
pub struct DuckDbStore {
    conn: Mutex<Connection>,
}

impl DuckDbStore {
    /// Open an on-disk database, or an in-memory one when `path` is `None`,
    /// and bring its schema up to date.
    pub fn open(path: Option<&Path>) -> Result<Self, StoreError> {
        let conn = match path {
            Some(p) => Connection::open(p)?,
            None => Connection::open_in_memory()?,
        };
        crate::storage::migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(None)
    }

    /// Returns the account owning `api_key`, creating it on first sight.
    pub fn register_account(&self, api_key: &str) -> Result<AccountId, StoreError> {
        let key_hash = hash_api_key(api_key);
        let conn = self.conn.lock();
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM accounts WHERE api_key_hash = ?",
                [&key_hash],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(AccountId(id));
        }

        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO accounts (id, api_key_hash) VALUES (?, ?)",
            duckdb::params![id, key_hash],
        )?;
        Ok(AccountId(id))
    }

    /// Register `domain` for `account`. Returns the normalized domain.
    ///
    /// A domain that is already registered keeps its original owner.
    pub fn register_domain(&self, account: &AccountId, domain: &str) -> Result<String, StoreError> {
        let domain = normalize_domain(domain);
        self.conn.lock().execute(
            "INSERT INTO domains (domain, account_id) VALUES (?, ?) ON CONFLICT (domain) DO NOTHING",
            duckdb::params![domain, account.0],
        )?;
        Ok(domain)
    }
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_WRITE_FORMAT).to_string()
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> Result<NaiveDateTime, duckdb::Error> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_READ_FORMAT)
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn date_at(row: &Row<'_>, idx: usize) -> Result<NaiveDate, duckdb::Error> {
    let raw: String = row.get(idx)?;
    raw.parse::<NaiveDate>()
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl AnalyticsStore for DuckDbStore {
    fn insert_visit(&self, visit: &Visit) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO visits (id, domain, session_id, visitor_id, source, device_type, os,
             country, screen_width, screen_height, language, utm_source, utm_medium,
             utm_campaign, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            duckdb::params![
                visit.id,
                visit.domain,
                visit.session_id,
                visit.visitor_id,
                visit.source,
                visit.device_type,
                visit.os,
                visit.country,
                visit.screen_width,
                visit.screen_height,
                visit.language,
                visit.utm_source,
                visit.utm_medium,
                visit.utm_campaign,
                format_timestamp(&visit.created_at),
            ],
        )?;
        Ok(())
    }

    fn insert_page_view(&self, page_view: &PageView) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO page_views (id, domain, path, visitor_id, session_id, device_type, os,
             country, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            duckdb::params![
                page_view.id,
                page_view.domain,
                page_view.path,
                page_view.visitor_id,
                page_view.session_id,
                page_view.device_type,
                page_view.os,
                page_view.country,
                format_timestamp(&page_view.created_at),
            ],
        )?;
        Ok(())
    }

    fn insert_event(&self, event: &CustomEvent) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO events (id, domain, event_name, message, created_at)
             VALUES (?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            duckdb::params![
                event.id,
                event.domain,
                event.event_name,
                event.message,
                format_timestamp(&event.created_at),
            ],
        )?;
        Ok(())
    }

    fn upsert_daily_stat(
        &self,
        domain: &str,
        date: NaiveDate,
        delta: StatDelta,
    ) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO daily_stats (domain, date, visits, unique_visitors, page_views)
             VALUES (?, CAST(? AS DATE), ?, ?, ?)
             ON CONFLICT (domain, date) DO UPDATE SET
                 visits = daily_stats.visits + EXCLUDED.visits,
                 unique_visitors = daily_stats.unique_visitors + EXCLUDED.unique_visitors,
                 page_views = daily_stats.page_views + EXCLUDED.page_views",
            duckdb::params![
                domain,
                date.to_string(),
                delta.visits,
                delta.unique_visitors,
                delta.page_views,
            ],
        )?;
        Ok(())
    }

    fn visits(&self, domain: &str, interval: DateInterval) -> Result<Vec<Visit>, StoreError> {
        let (start, end) = interval.timestamp_bounds();
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, domain, session_id, visitor_id, source, device_type, os, country,
                    screen_width, screen_height, language, utm_source, utm_medium, utm_campaign,
                    strftime(created_at, '%Y-%m-%d %H:%M:%S.%f')
             FROM visits
             WHERE domain = ? AND created_at >= CAST(? AS TIMESTAMP) AND created_at < CAST(? AS TIMESTAMP)
             ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map(duckdb::params![domain, start, end], |row| {
                Ok(Visit {
                    id: row.get(0)?,
                    domain: row.get(1)?,
                    session_id: row.get(2)?,
                    visitor_id: row.get(3)?,
                    source: row.get(4)?,
                    device_type: row.get(5)?,
                    os: row.get(6)?,
                    country: row.get(7)?,
                    screen_width: row.get(8)?,
                    screen_height: row.get(9)?,
                    language: row.get(10)?,
                    utm_source: row.get(11)?,
                    utm_medium: row.get(12)?,
                    utm_campaign: row.get(13)?,
                    created_at: timestamp_at(row, 14)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn page_views(
        &self,
        domain: &str,
        interval: DateInterval,
    ) -> Result<Vec<PageView>, StoreError> {
        let (start, end) = interval.timestamp_bounds();
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, domain, path, visitor_id, session_id, device_type, os, country,
                    strftime(created_at, '%Y-%m-%d %H:%M:%S.%f')
             FROM page_views
             WHERE domain = ? AND created_at >= CAST(? AS TIMESTAMP) AND created_at < CAST(? AS TIMESTAMP)
             ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map(duckdb::params![domain, start, end], |row| {
                Ok(PageView {
                    id: row.get(0)?,
                    domain: row.get(1)?,
                    path: row.get(2)?,
                    visitor_id: row.get(3)?,
                    session_id: row.get(4)?,
                    device_type: row.get(5)?,
                    os: row.get(6)?,
                    country: row.get(7)?,
                    created_at: timestamp_at(row, 8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn events(
        &self,
        domain: &str,
        interval: DateInterval,
    ) -> Result<Vec<CustomEvent>, StoreError> {
        let (start, end) = interval.timestamp_bounds();
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, domain, event_name, message,
                    strftime(created_at, '%Y-%m-%d %H:%M:%S.%f')
             FROM events
             WHERE domain = ? AND created_at >= CAST(? AS TIMESTAMP) AND created_at < CAST(? AS TIMESTAMP)
             ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map(duckdb::params![domain, start, end], |row| {
                Ok(CustomEvent {
                    id: row.get(0)?,
                    domain: row.get(1)?,
                    event_name: row.get(2)?,
                    message: row.get(3)?,
                    created_at: timestamp_at(row, 4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn daily_stats(
        &self,
        domain: &str,
        interval: DateInterval,
    ) -> Result<Vec<DailyStat>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT domain, CAST(date AS VARCHAR), visits, unique_visitors, page_views
             FROM daily_stats
             WHERE domain = ? AND date >= CAST(? AS DATE) AND date <= CAST(? AS DATE)
             ORDER BY date",
        )?;
        let rows = stmt
            .query_map(
                duckdb::params![domain, interval.start.to_string(), interval.end.to_string()],
                |row| {
                    Ok(DailyStat {
                        domain: row.get(0)?,
                        date: date_at(row, 1)?,
                        visits: row.get(2)?,
                        unique_visitors: row.get(3)?,
                        page_views: row.get(4)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn breakdown(
        &self,
        domain: &str,
        interval: DateInterval,
        dimension: Dimension,
    ) -> Result<Vec<BreakdownRow>, StoreError> {
        let col = dimension.column_name();
        let (start, end) = interval.timestamp_bounds();

        // Using format! for column name is safe here since it comes from a fixed enum
        let sql = format!(
            "SELECT {col} AS dim_value, COUNT(*) AS cnt
             FROM visits
             WHERE domain = ? AND created_at >= CAST(? AS TIMESTAMP) AND created_at < CAST(? AS TIMESTAMP)
             GROUP BY dim_value
             ORDER BY cnt DESC, dim_value"
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(duckdb::params![domain, start, end], |row| {
                Ok(BreakdownRow {
                    value: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl DomainRegistry for DuckDbStore {
    fn owner_of(&self, domain: &str) -> Result<Option<AccountId>, StoreError> {
        let owner: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT account_id FROM domains WHERE domain = ?",
                [domain],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner.map(AccountId))
    }
}

impl ApiKeyAuthenticator for DuckDbStore {
    fn authenticate(&self, api_key: &str) -> Result<Option<AccountId>, StoreError> {
        if api_key.is_empty() {
            return Ok(None);
        }
        let key_hash = hash_api_key(api_key);
        let account: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT id FROM accounts WHERE api_key_hash = ?",
                [&key_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(account.map(AccountId))
    }
}
