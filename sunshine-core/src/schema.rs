//! Database schema and migrations.

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );",
    )?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| row.get(0))
        .optional()?
        .unwrap_or(0);

    if version < 1 {
        create_schema_v1(conn)?;
    }

    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}

fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS location (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            location_setting TEXT NOT NULL UNIQUE,
            city_name TEXT NOT NULL,
            coord_lat REAL NOT NULL,
            coord_long REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS weather (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            location_id INTEGER NOT NULL REFERENCES location(id),
            date INTEGER NOT NULL,
            short_desc TEXT NOT NULL,
            weather_id INTEGER NOT NULL,
            min_temp REAL NOT NULL,
            max_temp REAL NOT NULL,
            humidity REAL NOT NULL,
            pressure REAL NOT NULL,
            wind REAL NOT NULL,
            degrees REAL NOT NULL,
            UNIQUE (location_id, date)
        );

        CREATE INDEX IF NOT EXISTS idx_weather_location_date ON weather(location_id, date);",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('location', 'weather')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }
}
