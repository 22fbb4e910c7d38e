//! SQL INSERT script output.

use super::RowSink;
use crate::generate::GeneratedTable;
use crate::value::{Value, DATETIME_FORMAT};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// MSSQL rejects multi-row INSERTs above this many rows
const MSSQL_MAX_ROWS_PER_INSERT: usize = 1000;

/// Target SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    #[default]
    MySql,
    Postgres,
    Sqlite,
    Mssql,
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(SqlDialect::MySql),
            "postgres" | "postgresql" | "pg" => Ok(SqlDialect::Postgres),
            "sqlite" | "sqlite3" => Ok(SqlDialect::Sqlite),
            "mssql" | "sqlserver" | "tsql" => Ok(SqlDialect::Mssql),
            _ => Err(format!(
                "Unknown dialect: {}. Valid options: mysql, postgres, sqlite, mssql",
                s
            )),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::MySql => write!(f, "mysql"),
            SqlDialect::Postgres => write!(f, "postgres"),
            SqlDialect::Sqlite => write!(f, "sqlite"),
            SqlDialect::Mssql => write!(f, "mssql"),
        }
    }
}

impl SqlDialect {
    /// Quote an identifier based on dialect
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            SqlDialect::MySql => format!("`{}`", name.replace('`', "``")),
            SqlDialect::Postgres | SqlDialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
            SqlDialect::Mssql => format!("[{}]", name.replace(']', "]]")),
        }
    }

    /// Format a string literal with dialect escaping
    pub fn format_string(&self, value: &str) -> String {
        match self {
            SqlDialect::MySql => {
                let escaped = value
                    .replace('\\', "\\\\")
                    .replace('\'', "\\'")
                    .replace('\n', "\\n")
                    .replace('\r', "\\r")
                    .replace('\t', "\\t")
                    .replace('\0', "\\0");
                format!("'{}'", escaped)
            }
            SqlDialect::Postgres | SqlDialect::Sqlite => format!("'{}'", value.replace('\'', "''")),
            SqlDialect::Mssql => format!("N'{}'", value.replace('\'', "''")),
        }
    }

    /// Format a value as a SQL literal
    pub fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) if n.is_finite() => n.to_string(),
            Value::Float(_) => "NULL".to_string(),
            Value::Text(s) => self.format_string(s),
            Value::Bool(b) => match self {
                SqlDialect::MySql | SqlDialect::Postgres => {
                    (if *b { "TRUE" } else { "FALSE" }).to_string()
                }
                SqlDialect::Sqlite | SqlDialect::Mssql => (if *b { "1" } else { "0" }).to_string(),
            },
            Value::DateTime(dt) => format!("'{}'", dt.format(DATETIME_FORMAT)),
            Value::Bytes(b) => match self {
                SqlDialect::MySql | SqlDialect::Sqlite => format!("X'{}'", hex::encode(b)),
                SqlDialect::Postgres => format!("'\\x{}'", hex::encode(b)),
                SqlDialect::Mssql => format!("0x{}", hex::encode(b)),
            },
        }
    }

    fn begin_transaction(&self) -> &'static str {
        match self {
            SqlDialect::MySql => "START TRANSACTION;",
            SqlDialect::Postgres | SqlDialect::Sqlite => "BEGIN;",
            SqlDialect::Mssql => "BEGIN TRANSACTION;",
        }
    }
}

/// Options for [`SqlSink`]
#[derive(Debug, Clone)]
pub struct SqlSinkOptions {
    pub dialect: SqlDialect,
    /// Rows per INSERT statement
    pub batch_size: usize,
    /// Wrap the script in a transaction
    pub transaction: bool,
    /// Comment lines written at the top of the script
    pub header: Vec<String>,
}

impl Default for SqlSinkOptions {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::MySql,
            batch_size: 100,
            transaction: false,
            header: Vec::new(),
        }
    }
}

/// Writes generated tables as multi-row INSERT statements
pub struct SqlSink<W: Write> {
    writer: W,
    options: SqlSinkOptions,
    started: bool,
}

impl<W: Write> SqlSink<W> {
    pub fn new(writer: W, options: SqlSinkOptions) -> Self {
        Self {
            writer,
            options,
            started: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Rows per INSERT, capped for dialects that limit it
    fn batch_size(&self) -> usize {
        let size = self.options.batch_size.max(1);
        match self.options.dialect {
            SqlDialect::Mssql => size.min(MSSQL_MAX_ROWS_PER_INSERT),
            _ => size,
        }
    }

    fn write_header(&mut self) -> io::Result<()> {
        for line in &self.options.header {
            writeln!(self.writer, "-- {}", line)?;
        }
        writeln!(self.writer, "-- Dialect: {}", self.options.dialect)?;
        writeln!(self.writer)?;

        match self.options.dialect {
            SqlDialect::MySql => writeln!(self.writer, "SET NAMES utf8mb4;")?,
            SqlDialect::Postgres => writeln!(self.writer, "SET client_encoding = 'UTF8';")?,
            SqlDialect::Sqlite => writeln!(self.writer, "PRAGMA foreign_keys = ON;")?,
            SqlDialect::Mssql => writeln!(self.writer, "SET NOCOUNT ON;")?,
        }
        if self.options.transaction {
            writeln!(self.writer, "{}", self.options.dialect.begin_transaction())?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn ensure_started(&mut self) -> io::Result<()> {
        if !self.started {
            self.started = true;
            self.write_header()?;
        }
        Ok(())
    }
}

impl<W: Write> RowSink for SqlSink<W> {
    type Error = io::Error;

    fn insert_table(&mut self, table: &GeneratedTable) -> io::Result<u64> {
        self.ensure_started()?;

        let dialect = self.options.dialect;
        writeln!(self.writer, "-- Table: {} ({} rows)", table.name, table.rows.len())?;
        if table.rows.is_empty() {
            writeln!(self.writer)?;
            return Ok(0);
        }

        let quoted_name = dialect.quote_identifier(&table.name);
        let columns = table
            .columns
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");

        for chunk in table.rows.chunks(self.batch_size()) {
            writeln!(self.writer, "INSERT INTO {} ({}) VALUES", quoted_name, columns)?;
            for (i, row) in chunk.iter().enumerate() {
                if i > 0 {
                    self.writer.write_all(b",\n")?;
                }
                let values = row
                    .values
                    .iter()
                    .map(|v| dialect.format_value(v))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(self.writer, "({})", values)?;
            }
            self.writer.write_all(b";\n")?;
        }
        writeln!(self.writer)?;

        Ok(table.rows.len() as u64)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.ensure_started()?;
        if self.options.transaction {
            writeln!(self.writer, "COMMIT;")?;
        }
        self.writer.flush()
    }
}
