//! Schema model for FK-aware dummy data generation.
//!
//! This module provides:
//! - Data models for tables, columns, primary keys and foreign keys
//! - Adapters that build a schema from SQL DDL or a YAML/JSON schema file
//! - Dependency graph construction with topological sorting
//! - Cycle detection for circular FK relationships

mod ddl;
mod file;
mod graph;

pub use ddl::*;
pub use file::*;
pub use graph::*;

use ahash::{AHashMap, AHashSet};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a table within a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

/// Unique identifier for a column within a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub u16);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnId({})", self.0)
    }
}

/// Column type tag. Closed set; every tag has a value generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Integer types: INT, BIGINT, SMALLINT, SERIAL, ...
    Integer,
    /// Text types: CHAR, VARCHAR, TEXT, UUID, ...
    Text,
    /// Boolean type
    Boolean,
    /// Floating point and decimal types
    Float,
    /// Date/time types
    DateTime,
    /// Binary types: BLOB, BYTEA, VARBINARY, ...
    Binary,
    /// Enumeration with its allowed variants
    Enum(Vec<String>),
}

impl ColumnType {
    /// Parse a SQL type string into a ColumnType.
    /// Supports MySQL, PostgreSQL, SQLite and MSSQL spellings; unknown types
    /// fall back to text.
    pub fn from_sql_type(type_str: &str) -> Self {
        let type_lower = type_str.trim().to_lowercase();
        let base_type = type_lower
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or(&type_lower)
            .trim();

        match base_type {
            "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint" | "int2"
            | "int4" | "int8" | "serial" | "smallserial" | "bigserial" => {
                // MySQL booleans are TINYINT(1)
                if base_type == "tinyint" && type_lower.starts_with("tinyint(1)") {
                    ColumnType::Boolean
                } else {
                    ColumnType::Integer
                }
            }
            "decimal" | "numeric" | "float" | "double" | "real" | "float4" | "float8"
            | "money" => ColumnType::Float,
            "date" | "datetime" | "datetime2" | "timestamp" | "timestamptz" | "time"
            | "timetz" | "year" => ColumnType::DateTime,
            "bool" | "boolean" | "bit" => ColumnType::Boolean,
            "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob"
            | "bytea" | "image" => ColumnType::Binary,
            "enum" => ColumnType::Enum(parse_enum_variants(type_str)),
            _ => ColumnType::Text,
        }
    }

    /// Short tag name used in messages and configuration
    pub fn tag(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Float => "float",
            ColumnType::DateTime => "datetime",
            ColumnType::Binary => "binary",
            ColumnType::Enum(_) => "enum",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Enum(variants) => write!(f, "enum({})", variants.join(", ")),
            other => f.write_str(other.tag()),
        }
    }
}

/// Extract the quoted variants of `ENUM('a','b')`
fn parse_enum_variants(type_str: &str) -> Vec<String> {
    let Some(start) = type_str.find('(') else {
        return Vec::new();
    };
    let Some(end) = type_str.rfind(')') else {
        return Vec::new();
    };
    if end <= start {
        return Vec::new();
    }

    type_str[start + 1..end]
        .split(',')
        .map(|v| v.trim().trim_matches('\'').trim_matches('"').replace("''", "'"))
        .filter(|v| !v.is_empty())
        .collect()
}

/// Foreign key reference from a column to a column of another (or the same) table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    /// Referenced table name
    pub table: String,
    /// Referenced column name
    pub column: String,
    /// Constraint name; columns sharing target table and constraint form one
    /// multi-column foreign key
    pub constraint: Option<String>,
    /// Resolved target (set by [`Schema::resolve_foreign_keys`])
    pub target: Option<(TableId, ColumnId)>,
}

impl ForeignKeyRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            constraint: None,
            target: None,
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }
}

/// Column definition within a table
#[derive(Debug, Clone)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Column type
    pub col_type: ColumnType,
    /// Position in table (0-indexed)
    pub ordinal: ColumnId,
    /// Whether this column is part of the primary key
    pub is_primary_key: bool,
    /// Whether this column allows NULL values
    pub is_nullable: bool,
    /// Outgoing foreign key reference
    pub foreign_key: Option<ForeignKeyRef>,
}

impl Column {
    /// Create a non-nullable, non-key column. The ordinal is assigned by
    /// [`TableSchema::add_column`].
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
            ordinal: ColumnId(0),
            is_primary_key: false,
            is_nullable: false,
            foreign_key: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.is_nullable = false;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = nullable;
        self
    }

    pub fn references(mut self, fk: ForeignKeyRef) -> Self {
        self.foreign_key = Some(fk);
        self
    }

    /// Check if this column is a foreign key
    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }
}

/// A resolved foreign key edge between two columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FkEdge {
    pub from_table: TableId,
    pub from_column: ColumnId,
    pub to_table: TableId,
    pub to_column: ColumnId,
}

impl FkEdge {
    pub fn is_self_reference(&self) -> bool {
        self.from_table == self.to_table
    }
}

/// Complete table schema definition
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Table ID within the schema
    pub id: TableId,
    /// Column definitions in order
    pub columns: Vec<Column>,
    /// Primary key column IDs (ordered for composite PKs)
    pub primary_key: Vec<ColumnId>,
}

impl TableSchema {
    /// Create a new empty table schema
    pub fn new(name: String, id: TableId) -> Self {
        Self {
            name,
            id,
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Append a column, assigning its ordinal and registering it in the
    /// primary key when flagged
    pub fn add_column(&mut self, mut column: Column) -> ColumnId {
        let id = ColumnId(self.columns.len() as u16);
        column.ordinal = id;
        if column.is_primary_key {
            column.is_nullable = false;
            self.primary_key.push(id);
        }
        self.columns.push(column);
        id
    }

    /// Mark a column as (part of) the primary key. Returns false if the column
    /// does not exist.
    pub fn mark_primary_key(&mut self, name: &str) -> bool {
        let Some(col) = self
            .columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
        else {
            return false;
        };
        col.is_primary_key = true;
        col.is_nullable = false;
        if !self.primary_key.contains(&col.ordinal) {
            self.primary_key.push(col.ordinal);
        }
        true
    }

    /// Get a column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Get a mutable column by name
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Get column ID by name
    pub fn get_column_id(&self, name: &str) -> Option<ColumnId> {
        self.get_column(name).map(|c| c.ordinal)
    }

    /// Get column by ID
    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(id.0 as usize)
    }

    /// Check if column is part of the primary key
    pub fn is_pk_column(&self, col_id: ColumnId) -> bool {
        self.primary_key.contains(&col_id)
    }

    /// Get all FK column IDs
    pub fn fk_column_ids(&self) -> Vec<ColumnId> {
        self.columns
            .iter()
            .filter(|c| c.is_foreign_key())
            .map(|c| c.ordinal)
            .collect()
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Schema invariant violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate table `{0}`")]
    DuplicateTable(String),

    #[error("duplicate column `{column}` in table `{table}`")]
    DuplicateColumn { table: String, column: String },

    #[error("table `{0}` has no columns")]
    EmptyTable(String),

    #[error("column `{table}.{column}` references unknown table `{referenced}`")]
    UnknownReferencedTable {
        table: String,
        column: String,
        referenced: String,
    },

    #[error(
        "column `{table}.{column}` references unknown column `{referenced_table}.{referenced_column}`"
    )]
    UnknownReferencedColumn {
        table: String,
        column: String,
        referenced_table: String,
        referenced_column: String,
    },
}

/// Complete database schema
#[derive(Debug, Clone)]
pub struct Schema {
    /// Map from table name to table ID
    pub tables: AHashMap<String, TableId>,
    /// Table schemas indexed by TableId
    pub table_schemas: Vec<TableSchema>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self {
            tables: AHashMap::new(),
            table_schemas: Vec::new(),
        }
    }

    /// Get table ID by name (case-insensitive)
    pub fn get_table_id(&self, name: &str) -> Option<TableId> {
        if let Some(&id) = self.tables.get(name) {
            return Some(id);
        }
        let name_lower = name.to_lowercase();
        self.tables
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, &id)| id)
    }

    /// Get table schema by ID
    pub fn table(&self, id: TableId) -> Option<&TableSchema> {
        self.table_schemas.get(id.0 as usize)
    }

    /// Get mutable table schema by ID
    pub fn table_mut(&mut self, id: TableId) -> Option<&mut TableSchema> {
        self.table_schemas.get_mut(id.0 as usize)
    }

    /// Get table schema by name
    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.get_table_id(name).and_then(|id| self.table(id))
    }

    /// Add a new table schema, returning its ID
    pub fn add_table(&mut self, mut schema: TableSchema) -> TableId {
        let id = TableId(self.table_schemas.len() as u32);
        schema.id = id;
        self.tables.insert(schema.name.clone(), id);
        self.table_schemas.push(schema);
        id
    }

    /// Check the schema invariants and resolve every foreign key to its
    /// target table and column.
    pub fn resolve_foreign_keys(&mut self) -> Result<(), SchemaError> {
        let mut seen_tables = AHashSet::new();
        for table in &self.table_schemas {
            if !seen_tables.insert(table.name.to_lowercase()) {
                return Err(SchemaError::DuplicateTable(table.name.clone()));
            }
            if table.columns.is_empty() {
                return Err(SchemaError::EmptyTable(table.name.clone()));
            }
            let mut seen_columns = AHashSet::new();
            for col in &table.columns {
                if !seen_columns.insert(col.name.to_lowercase()) {
                    return Err(SchemaError::DuplicateColumn {
                        table: table.name.clone(),
                        column: col.name.clone(),
                    });
                }
            }
        }

        let mut targets: Vec<(TableId, ColumnId, TableId, ColumnId)> = Vec::new();
        for table in &self.table_schemas {
            for col in &table.columns {
                let Some(fk) = &col.foreign_key else {
                    continue;
                };
                let target_table = self.get_table(&fk.table).ok_or_else(|| {
                    SchemaError::UnknownReferencedTable {
                        table: table.name.clone(),
                        column: col.name.clone(),
                        referenced: fk.table.clone(),
                    }
                })?;
                let target_col = target_table.get_column(&fk.column).ok_or_else(|| {
                    SchemaError::UnknownReferencedColumn {
                        table: table.name.clone(),
                        column: col.name.clone(),
                        referenced_table: target_table.name.clone(),
                        referenced_column: fk.column.clone(),
                    }
                })?;
                if target_col.col_type != col.col_type {
                    tracing::warn!(
                        "`{}.{}` ({}) references `{}.{}` ({}); generated values follow the referenced column",
                        table.name,
                        col.name,
                        col.col_type,
                        target_table.name,
                        target_col.name,
                        target_col.col_type
                    );
                }
                targets.push((table.id, col.ordinal, target_table.id, target_col.ordinal));
            }
        }

        for (table_id, col_id, target_table, target_col) in targets {
            if let Some(fk) = self.table_schemas[table_id.0 as usize].columns[col_id.0 as usize]
                .foreign_key
                .as_mut()
            {
                fk.target = Some((target_table, target_col));
            }
        }

        Ok(())
    }

    /// Resolved outgoing FK edges of a table
    pub fn outgoing_edges(&self, id: TableId) -> Vec<FkEdge> {
        let Some(table) = self.table(id) else {
            return Vec::new();
        };
        table
            .columns
            .iter()
            .filter_map(|col| {
                let (to_table, to_column) = col.foreign_key.as_ref()?.target?;
                Some(FkEdge {
                    from_table: id,
                    from_column: col.ordinal,
                    to_table,
                    to_column,
                })
            })
            .collect()
    }

    /// Resolved incoming FK edges of a table (including self-references)
    pub fn incoming_edges(&self, id: TableId) -> Vec<FkEdge> {
        self.table_schemas
            .iter()
            .flat_map(|t| self.outgoing_edges(t.id))
            .filter(|e| e.to_table == id)
            .collect()
    }

    /// Columns whose values must be recorded after generating a table: the
    /// primary key plus every column some FK points at.
    pub fn key_columns(&self, id: TableId) -> Vec<ColumnId> {
        let Some(table) = self.table(id) else {
            return Vec::new();
        };
        let mut cols = table.primary_key.clone();
        for edge in self.incoming_edges(id) {
            if !cols.contains(&edge.to_column) {
                cols.push(edge.to_column);
            }
        }
        cols.sort();
        cols
    }

    /// Get the number of tables
    pub fn len(&self) -> usize {
        self.table_schemas.len()
    }

    /// Check if schema is empty
    pub fn is_empty(&self) -> bool {
        self.table_schemas.is_empty()
    }

    /// Iterate over all table schemas
    pub fn iter(&self) -> impl Iterator<Item = &TableSchema> {
        self.table_schemas.iter()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}
