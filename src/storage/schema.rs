use duckdb::Connection;

/// Accounts own domains and hold the hashed API key for the custom-event path.
pub const CREATE_ACCOUNTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS accounts (
    id              VARCHAR PRIMARY KEY,
    api_key_hash    VARCHAR NOT NULL UNIQUE,
    created_at      TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
";

/// Registered hostnames, stored normalized (lower-case, no `www.`).
pub const CREATE_DOMAINS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS domains (
    domain          VARCHAR PRIMARY KEY,
    account_id      VARCHAR NOT NULL,
    created_at      TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
";

pub const CREATE_VISITS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS visits (
    id              VARCHAR NOT NULL,
    domain          VARCHAR NOT NULL,
    session_id      VARCHAR,
    visitor_id      VARCHAR NOT NULL,
    source          VARCHAR NOT NULL,
    device_type     VARCHAR NOT NULL,
    os              VARCHAR NOT NULL,
    country         VARCHAR NOT NULL,
    screen_width    INTEGER,
    screen_height   INTEGER,
    language        VARCHAR,
    utm_source      VARCHAR,
    utm_medium      VARCHAR,
    utm_campaign    VARCHAR,
    created_at      TIMESTAMP NOT NULL
)
";

pub const CREATE_PAGE_VIEWS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS page_views (
    id              VARCHAR NOT NULL,
    domain          VARCHAR NOT NULL,
    path            VARCHAR NOT NULL,
    visitor_id      VARCHAR NOT NULL,
    session_id      VARCHAR,
    device_type     VARCHAR NOT NULL,
    os              VARCHAR NOT NULL,
    country         VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL
)
";

pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS events (
    id              VARCHAR NOT NULL,
    domain          VARCHAR NOT NULL,
    event_name      VARCHAR NOT NULL,
    message         VARCHAR,
    created_at      TIMESTAMP NOT NULL
)
";

/// The only contended table: one row per (domain, date), mutated through
/// `INSERT ... ON CONFLICT DO UPDATE`.
pub const CREATE_DAILY_STATS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS daily_stats (
    domain          VARCHAR NOT NULL,
    date            DATE NOT NULL,
    visits          UBIGINT NOT NULL DEFAULT 0,
    unique_visitors UBIGINT NOT NULL DEFAULT 0,
    page_views      UBIGINT NOT NULL DEFAULT 0,
    PRIMARY KEY (domain, date)
)
";

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), duckdb::Error> {
    conn.execute_batch(CREATE_ACCOUNTS_TABLE)?;
    conn.execute_batch(CREATE_DOMAINS_TABLE)?;
    conn.execute_batch(CREATE_VISITS_TABLE)?;
    conn.execute_batch(CREATE_PAGE_VIEWS_TABLE)?;
    conn.execute_batch(CREATE_EVENTS_TABLE)?;
    conn.execute_batch(CREATE_DAILY_STATS_TABLE)?;
    Ok(())
}
