//! SQL statement builder for record queries.
//!
//! The same [`RecordQuery`] renders to a paged statement for the remote
//! CKAN service, a count statement, and a plain statement for local
//! tables. Every literal is emitted as a quoted string so the statements
//! work against both typed (`PostgreSQL`) and all-text (`DuckDB` CSV import)
//! columns.

use std::fmt::Write as _;

/// Column used to keep page boundaries stable on the CKAN datastore.
pub const DEFAULT_SORT_KEY: &str = "_id";

/// A row filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column = 'value'`
    Equals {
        /// Column name.
        column: String,
        /// Expected value.
        value: String,
    },
    /// `column IN ('a', 'b', ...)`
    InList {
        /// Column name.
        column: String,
        /// Accepted values.
        values: Vec<String>,
    },
    /// `column IS NOT NULL`
    NotNull {
        /// Column name.
        column: String,
    },
    /// `column >= 'start' AND column < 'end'`
    Range {
        /// Column name.
        column: String,
        /// Inclusive lower bound.
        start: String,
        /// Exclusive upper bound.
        end: String,
    },
}

impl Predicate {
    fn render(&self, out: &mut String) {
        match self {
            Self::Equals { column, value } => {
                let _ = write!(out, "{} = {}", quote_ident(column), quote_literal(value));
            }
            Self::InList { column, values } => {
                let list = values
                    .iter()
                    .map(|v| quote_literal(v))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = write!(out, "{} IN ({list})", quote_ident(column));
            }
            Self::NotNull { column } => {
                let _ = write!(out, "{} IS NOT NULL", quote_ident(column));
            }
            Self::Range { column, start, end } => {
                let col = quote_ident(column);
                let _ = write!(
                    out,
                    "{col} >= {} AND {col} < {}",
                    quote_literal(start),
                    quote_literal(end)
                );
            }
        }
    }
}

/// A query against one resource (remote datastore resource ID or local
/// table name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    resource: String,
    columns: Vec<String>,
    predicates: Vec<Predicate>,
    sort_key: Option<String>,
}

impl RecordQuery {
    /// Selects every column of `resource`, sorted by [`DEFAULT_SORT_KEY`]
    /// when paged.
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            columns: Vec::new(),
            predicates: Vec::new(),
            sort_key: Some(DEFAULT_SORT_KEY.to_string()),
        }
    }

    /// The resource being queried.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Restricts the selected columns. An empty list means `*`.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a predicate; predicates are joined with `AND`.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    #[must_use]
    pub fn where_equals(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(Predicate::Equals {
            column: column.into(),
            value: value.into(),
        })
    }

    #[must_use]
    pub fn where_in<I, S>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter(Predicate::InList {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    #[must_use]
    pub fn where_not_null(self, column: impl Into<String>) -> Self {
        self.filter(Predicate::NotNull {
            column: column.into(),
        })
    }

    #[must_use]
    pub fn where_range(
        self,
        column: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        self.filter(Predicate::Range {
            column: column.into(),
            start: start.into(),
            end: end.into(),
        })
    }

    /// Restricts `column` to the calendar year `year`.
    #[must_use]
    pub fn in_year(self, column: impl Into<String>, year: i32) -> Self {
        self.where_range(
            column,
            format!("{year}-01-01T00:00:00"),
            format!("{}-01-01T00:00:00", year + 1),
        )
    }

    /// Changes the paging sort key. `None` disables `ORDER BY`.
    #[must_use]
    pub fn sorted_by(mut self, key: Option<&str>) -> Self {
        self.sort_key = key.map(ToString::to_string);
        self
    }

    /// Statement without ordering or paging.
    #[must_use]
    pub fn select_sql(&self) -> String {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut sql = format!("SELECT {columns} FROM {}", quote_ident(&self.resource));
        self.render_where(&mut sql);
        sql
    }

    /// Statement for one page of `limit` rows starting at `offset`.
    #[must_use]
    pub fn page_sql(&self, limit: u64, offset: u64) -> String {
        let mut sql = self.select_sql();
        if let Some(key) = &self.sort_key {
            let _ = write!(sql, " ORDER BY {}", quote_ident(key));
        }
        let _ = write!(sql, " LIMIT {limit} OFFSET {offset}");
        sql
    }

    /// Statement returning a single `count` column.
    #[must_use]
    pub fn count_sql(&self) -> String {
        let mut sql = format!("SELECT COUNT(*) AS count FROM {}", quote_ident(&self.resource));
        self.render_where(&mut sql);
        sql
    }

    fn render_where(&self, sql: &mut String) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            predicate.render(sql);
        }
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_yearly_permit_page() {
        let query = RecordQuery::new("6ddcd912-32a0-43df-9908-63574f8c7e77").in_year("issued_date", 2023);
        assert_eq!(
            query.page_sql(32000, 0),
            "SELECT * FROM \"6ddcd912-32a0-43df-9908-63574f8c7e77\" \
             WHERE \"issued_date\" >= '2023-01-01T00:00:00' \
             AND \"issued_date\" < '2024-01-01T00:00:00' \
             ORDER BY \"_id\" LIMIT 32000 OFFSET 0"
        );
    }

    #[test]
    fn renders_count() {
        let query = RecordQuery::new("res").in_year("issued_date", 2024);
        assert_eq!(
            query.count_sql(),
            "SELECT COUNT(*) AS count FROM \"res\" \
             WHERE \"issued_date\" >= '2024-01-01T00:00:00' \
             AND \"issued_date\" < '2025-01-01T00:00:00'"
        );
    }

    #[test]
    fn renders_columns_and_filters_without_paging() {
        let query = RecordQuery::new("crime_reports")
            .select(["Lat", "Long"])
            .where_equals("OFFENSE_DESCRIPTION", "DRUGS - POSSESSION/ SALE/ MANUFACTURING/ USE")
            .where_in("HOUR", ["7", "8", "9"])
            .where_not_null("Lat");
        assert_eq!(
            query.select_sql(),
            "SELECT \"Lat\", \"Long\" FROM \"crime_reports\" \
             WHERE \"OFFENSE_DESCRIPTION\" = 'DRUGS - POSSESSION/ SALE/ MANUFACTURING/ USE' \
             AND \"HOUR\" IN ('7', '8', '9') \
             AND \"Lat\" IS NOT NULL"
        );
    }

    #[test]
    fn escapes_quotes() {
        let query = RecordQuery::new("t\"x").where_equals("case_title", "O'Brien");
        assert_eq!(
            query.select_sql(),
            "SELECT * FROM \"t\"\"x\" WHERE \"case_title\" = 'O''Brien'"
        );
    }

    #[test]
    fn paging_without_sort_key() {
        let query = RecordQuery::new("t").sorted_by(None);
        assert_eq!(query.page_sql(10, 20), "SELECT * FROM \"t\" LIMIT 10 OFFSET 20");
    }
}
