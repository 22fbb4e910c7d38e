//! Key values recorded during one generation run.

use super::GeneratedRow;
use crate::schema::{ColumnId, TableId};
use crate::value::Value;
use ahash::AHashMap;

/// Key column values of one generated table
#[derive(Debug, Clone, Default)]
pub struct RecordedKeys {
    /// Recorded columns, sorted by ordinal
    pub columns: Vec<ColumnId>,
    /// One entry per generated row, aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

impl RecordedKeys {
    fn position(&self, column: ColumnId) -> Option<usize> {
        self.columns.binary_search(&column).ok()
    }

    /// Value of a recorded column in one row
    pub fn value(&self, row: usize, column: ColumnId) -> Option<&Value> {
        let pos = self.position(column)?;
        self.rows.get(row).and_then(|r| r.get(pos))
    }

    /// Indices of rows whose values in all the given columns are non-null
    pub fn candidates(&self, columns: &[ColumnId]) -> Vec<usize> {
        let Some(positions) = columns
            .iter()
            .map(|c| self.position(*c))
            .collect::<Option<Vec<_>>>()
        else {
            return Vec::new();
        };

        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| positions.iter().all(|&p| !row[p].is_null()))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Per-table key values generated so far in a run.
///
/// Created at the start of a run and dropped with it. A table's keys are
/// recorded only once its whole batch exists, so later tables sample from
/// complete batches only.
#[derive(Debug, Default)]
pub struct GenerationContext {
    tables: AHashMap<TableId, RecordedKeys>,
}

impl GenerationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the given key columns of a finished batch
    pub fn record(&mut self, table: TableId, columns: &[ColumnId], rows: &[GeneratedRow]) {
        let mut columns = columns.to_vec();
        columns.sort();
        columns.dedup();

        let recorded = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.values[c.0 as usize].clone())
                    .collect()
            })
            .collect();

        self.tables.insert(
            table,
            RecordedKeys {
                columns,
                rows: recorded,
            },
        );
    }

    /// Keys of a table, if it has been generated
    pub fn keys(&self, table: TableId) -> Option<&RecordedKeys> {
        self.tables.get(&table)
    }
}
