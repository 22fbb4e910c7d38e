//! JSON and JSON Lines output.

use super::RowSink;
use crate::generate::{GeneratedRow, GeneratedTable};
use serde::Serialize;
use std::io::{self, Write};

/// Writes `{"seed": .., "tables": [{"name", "columns", "rows"}, ..]}`,
/// streaming one table at a time
pub struct JsonSink<W: Write> {
    writer: W,
    seed: u64,
    tables_written: usize,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W, seed: u64) -> Self {
        Self {
            writer,
            seed,
            tables_written: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RowSink for JsonSink<W> {
    type Error = io::Error;

    fn insert_table(&mut self, table: &GeneratedTable) -> io::Result<u64> {
        if self.tables_written == 0 {
            write!(self.writer, "{{\"seed\":{},\"tables\":[", self.seed)?;
        } else {
            self.writer.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.writer, table)?;
        self.tables_written += 1;
        Ok(table.rows.len() as u64)
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.tables_written == 0 {
            write!(self.writer, "{{\"seed\":{},\"tables\":[", self.seed)?;
        }
        self.writer.write_all(b"]}\n")?;
        self.writer.flush()
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    table: &'a str,
    row: &'a GeneratedRow,
}

/// Writes one `{"table": .., "row": {..}}` object per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RowSink for JsonLinesSink<W> {
    type Error = io::Error;

    fn insert_table(&mut self, table: &GeneratedTable) -> io::Result<u64> {
        for row in &table.rows {
            serde_json::to_writer(
                &mut self.writer,
                &JsonLine {
                    table: &table.name,
                    row,
                },
            )?;
            self.writer.write_all(b"\n")?;
        }
        Ok(table.rows.len() as u64)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
