//! Insertion driver interface.
//!
//! A [`RowSink`] persists generated tables in the order it receives them,
//! which is always dependency order. Sink failures are passed through to the
//! caller untouched, tagged with the table being inserted.

mod json;
mod sql;

pub use json::{JsonLinesSink, JsonSink};
pub use sql::{SqlDialect, SqlSink, SqlSinkOptions};

use crate::generate::GeneratedTable;

/// Destination for generated rows
pub trait RowSink {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist every row of one table, returning the number of rows written
    fn insert_table(&mut self, table: &GeneratedTable) -> Result<u64, Self::Error>;

    /// Called once after the last table
    fn finish(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A sink failure, naming the table being inserted
#[derive(Debug, thiserror::Error)]
#[error("failed to insert rows into `{table}`: {source}")]
pub struct InsertError<E> {
    pub table: String,
    #[source]
    pub source: E,
}

impl<E> InsertError<E> {
    pub fn new(table: impl Into<String>, source: E) -> Self {
        Self {
            table: table.into(),
            source,
        }
    }
}

/// Per-table outcome of an insertion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
    /// (table, rows written) in insertion order
    pub tables: Vec<(String, u64)>,
}

impl InsertReport {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|(_, n)| n).sum()
    }
}

/// Insert one table, tagging a failure with its name
pub fn insert_one<S: RowSink + ?Sized>(sink: &mut S, table: &GeneratedTable) -> Result<u64, InsertError<S::Error>> {
    sink.insert_table(table)
        .map_err(|e| InsertError::new(&table.name, e))
}

/// Finish a sink after its last table
pub fn finish<S: RowSink + ?Sized>(sink: &mut S) -> Result<(), InsertError<S::Error>> {
    sink.finish().map_err(|e| InsertError::new(FINISH_TABLE, e))
}

/// Table name reported when `finish` fails
pub const FINISH_TABLE: &str = "<finish>";

/// Insert tables in order, stopping at the first failure. `finish` is only
/// called when every table succeeded.
pub fn insert_all<'t, S, I>(sink: &mut S, tables: I) -> Result<InsertReport, InsertError<S::Error>>
where
    S: RowSink + ?Sized,
    I: IntoIterator<Item = &'t GeneratedTable>,
{
    let mut report = InsertReport::default();
    for table in tables {
        let written = insert_one(sink, table)?;
        report.tables.push((table.name.clone(), written));
    }
    finish(sink)?;
    Ok(report)
}

/// Keeps every table in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub tables: Vec<GeneratedTable>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowSink for MemorySink {
    type Error = std::convert::Infallible;

    fn insert_table(&mut self, table: &GeneratedTable) -> Result<u64, Self::Error> {
        self.tables.push(table.clone());
        Ok(table.rows.len() as u64)
    }
}
