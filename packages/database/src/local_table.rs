//! CSV-backed `DuckDB` tables.
//!
//! CSV files are imported with every column typed as text. Numbers and
//! timestamps are parsed later by the shared field mapping, which keeps the
//! coercion rules identical for local and remote data.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use duckdb::Connection;
use duckdb::types::Value as DuckValue;
use hotspot_source::{
    FetchReport, RawRecord, RecordQuery, RecordSource, SourceError, StopReason, paging,
};

use crate::DbError;

/// A single table inside a `DuckDB` database.
///
/// `duckdb::Connection` is `Send` but not `Sync`, so it sits behind a
/// `Mutex`.
pub struct LocalTable {
    conn: Mutex<Connection>,
    table: String,
}

impl LocalTable {
    /// Wraps an existing connection and table name.
    #[must_use]
    pub fn new(conn: Connection, table: impl Into<String>) -> Self {
        Self {
            conn: Mutex::new(conn),
            table: table.into(),
        }
    }

    /// Imports `csv_path` into `table`, replacing any previous contents.
    ///
    /// The database lives in memory unless `db_path` is given.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the file cannot be read or the import fails.
    pub fn load_csv(db_path: Option<&Path>, csv_path: &Path, table: &str) -> Result<Self, DbError> {
        if !csv_path.is_file() {
            return Err(DbError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("CSV file not found: {}", csv_path.display()),
            )));
        }

        let conn = match db_path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };

        let path_literal = csv_path.to_string_lossy().replace('\'', "''");
        conn.execute_batch(&format!(
            "CREATE OR REPLACE TABLE \"{}\" AS \
             SELECT * FROM read_csv('{path_literal}', header = true, all_varchar = true)",
            table.replace('"', "\"\""),
        ))?;

        let local = Self::new(conn, table);
        log::info!(
            "Table '{}' created with {} rows from {}",
            local.table,
            local.row_count()?,
            csv_path.display()
        );
        Ok(local)
    }

    /// The table name, used as the query resource.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of rows in the table.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the count query fails.
    pub fn row_count(&self) -> Result<u64, DbError> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", self.table.replace('"', "\"\"")),
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Runs `sql` and returns the rows keyed by column name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the statement fails.
    pub fn query(&self, sql: &str) -> Result<Vec<RawRecord>, DbError> {
        log::debug!("Local SQL: {sql}");
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([])?;

        let names: Vec<String> = rows
            .as_ref()
            .map(duckdb::Statement::column_names)
            .unwrap_or_default();

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = RawRecord::new();
            for (i, name) in names.iter().enumerate() {
                let value: DuckValue = row.get(i)?;
                record.insert(name.clone(), to_json(value));
            }
            records.push(record);
        }

        Ok(records)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn to_json(value: DuckValue) -> serde_json::Value {
    use serde_json::Value;

    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::from(i),
        DuckValue::SmallInt(i) => Value::from(i),
        DuckValue::Int(i) => Value::from(i),
        DuckValue::BigInt(i) => Value::from(i),
        DuckValue::UTinyInt(i) => Value::from(i),
        DuckValue::USmallInt(i) => Value::from(i),
        DuckValue::UInt(i) => Value::from(i),
        DuckValue::UBigInt(i) => Value::from(i),
        DuckValue::Float(f) => Value::from(f64::from(f)),
        DuckValue::Double(f) => Value::from(f),
        DuckValue::Text(s) => Value::String(s),
        other => Value::String(format!("{other:?}")),
    }
}

/// [`RecordSource`] over a [`LocalTable`]. The whole result is read in one
/// statement, so there is never more than one request.
pub struct LocalTableSource {
    id: String,
    table: LocalTable,
}

impl LocalTableSource {
    #[must_use]
    pub fn new(id: impl Into<String>, table: LocalTable) -> Self {
        Self {
            id: id.into(),
            table,
        }
    }

    /// The wrapped table.
    #[must_use]
    pub const fn table(&self) -> &LocalTable {
        &self.table
    }
}

fn backend(e: &DbError) -> SourceError {
    SourceError::Backend {
        message: e.to_string(),
    }
}

#[async_trait]
impl RecordSource for LocalTableSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self, query: &RecordQuery) -> Result<FetchReport, SourceError> {
        let records = self.table.query(&query.select_sql()).map_err(|e| backend(&e))?;
        log::info!("[{}] {} rows from {}", self.id, records.len(), query.resource());
        Ok(FetchReport {
            records,
            requests: 1,
            stop: StopReason::Exhausted,
        })
    }

    async fn count(&self, query: &RecordQuery) -> Result<u64, SourceError> {
        let rows = self.table.query(&query.count_sql()).map_err(|e| backend(&e))?;
        paging::parse_count(&rows)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use hotspot_source::parsing::FieldMapping;

    use super::*;

    fn write_csv(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("hotspot_database_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    const CRIMES: &str = "\
OFFENSE_DESCRIPTION,HOUR,Lat,Long
DRUGS - POSSESSION,7,42.35,-71.06
DRUGS - POSSESSION,8,42.36,-71.07
DRUGS - POSSESSION,13,42.37,-71.08
LARCENY,8,42.30,-71.10
LARCENY,9,,
";

    #[test]
    fn loads_csv_as_text_columns() {
        let path = write_csv("loads.csv", CRIMES);
        let table = LocalTable::load_csv(None, &path, "crime_reports").unwrap();
        assert_eq!(table.row_count().unwrap(), 5);

        let rows = table
            .query(&RecordQuery::new("crime_reports").select(["HOUR", "Lat"]).select_sql())
            .unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0]["HOUR"], serde_json::json!("7"));
        assert!(rows[4]["Lat"].is_null());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn fetch_applies_filters() {
        let path = write_csv("filters.csv", CRIMES);
        let table = LocalTable::load_csv(None, &path, "crime_reports").unwrap();
        let source = LocalTableSource::new("crimes", table);

        let query = RecordQuery::new("crime_reports")
            .select(["Lat", "Long"])
            .where_equals("OFFENSE_DESCRIPTION", "DRUGS - POSSESSION")
            .where_in("HOUR", ["7", "8", "9"])
            .where_not_null("Lat");

        let report = source.fetch(&query).await.unwrap();
        assert_eq!(report.requests, 1);
        assert_eq!(report.stop, StopReason::Exhausted);

        let set = report.into_event_set(&FieldMapping::lat_lon("Lat", "Long"), "drugs");
        assert_eq!(set.len(), 2);
        assert_eq!(set.events[0].coordinates(), Some((42.35, -71.06)));

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn count_matches_filter() {
        let path = write_csv("count.csv", CRIMES);
        let table = LocalTable::load_csv(None, &path, "crime_reports").unwrap();
        let source = LocalTableSource::new("crimes", table);

        let total = source
            .count(&RecordQuery::new("crime_reports").where_equals("OFFENSE_DESCRIPTION", "LARCENY"))
            .await
            .unwrap();
        assert_eq!(total, 2);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_csv_is_an_error() {
        let missing = std::env::temp_dir().join("hotspot_database_tests/does_not_exist.csv");
        assert!(matches!(
            LocalTable::load_csv(None, &missing, "t"),
            Err(DbError::Io(_))
        ));
    }
}
