//! SQLite persistence: schema, the reference catalog tables and the
//! document-style arrival history.
//!
//! Tables are created on open and never migrated. Bus stop codes are stored
//! as TEXT so leading zeros survive. `BusRoutes` refers to stops and services
//! by key only; a route may name a stop or service the catalog lacks.

pub mod catalog;

use std::path::Path;

use tracing::debug;

use crate::error::Result;

pub use catalog::{CatalogRecord, SqliteCatalog};
pub use rusqlite::Connection;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS BusStops (
    BusStopCode TEXT PRIMARY KEY,
    RoadName TEXT,
    Description TEXT,
    Latitude REAL,
    Longitude REAL
);

CREATE TABLE IF NOT EXISTS BusServices (
    ServiceNo TEXT PRIMARY KEY,
    Operator TEXT,
    Direction INTEGER,
    Category TEXT,
    OriginCode TEXT,
    DestinationCode TEXT,
    AM_Peak_Freq TEXT,
    AM_Offpeak_Freq TEXT,
    PM_Peak_Freq TEXT,
    PM_Offpeak_Freq TEXT,
    LoopDesc TEXT
);

CREATE TABLE IF NOT EXISTS BusRoutes (
    RouteID INTEGER PRIMARY KEY AUTOINCREMENT,
    ServiceNo TEXT,
    Operator TEXT,
    Direction INTEGER,
    StopSequence INTEGER,
    BusStopCode TEXT,
    Distance REAL,
    WD_FirstBus TEXT,
    WD_LastBus TEXT,
    SAT_FirstBus TEXT,
    SAT_LastBus TEXT,
    SUN_FirstBus TEXT,
    SUN_LastBus TEXT
);

CREATE INDEX IF NOT EXISTS BusRoutesNaturalKey
    ON BusRoutes (ServiceNo, Direction, StopSequence, BusStopCode);

CREATE TABLE IF NOT EXISTS FavoriteStop (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    BusStopCode TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS FavoriteService (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    ServiceNo TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS FavoriteRecords (
    ID TEXT PRIMARY KEY,
    Codes TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS BusArrivalData (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    BusStopCode TEXT NOT NULL,
    Date TEXT NOT NULL,
    Document TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS BusArrivalDataStop ON BusArrivalData (BusStopCode);
CREATE INDEX IF NOT EXISTS BusArrivalDataDate ON BusArrivalData (Date);
"#;

/// Open (or create) a database file and make sure every table exists.
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Opening database");
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Row count of a table, for reports and tests.
pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let count = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        for table in [
            "BusStops",
            "BusServices",
            "BusRoutes",
            "FavoriteStop",
            "FavoriteService",
            "FavoriteRecords",
            "BusArrivalData",
        ] {
            assert_eq!(count_rows(&conn, table).unwrap(), 0, "{table}");
        }
    }

    #[test]
    fn test_route_without_parent_rows_is_accepted() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO BusRoutes (ServiceNo, Direction, StopSequence, BusStopCode) \
             VALUES ('10', 1, 1, '75009')",
            [],
        )
        .unwrap();

        assert_eq!(count_rows(&conn, "BusRoutes").unwrap(), 1);
        assert_eq!(count_rows(&conn, "BusStops").unwrap(), 0);
    }
}
