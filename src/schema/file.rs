//! YAML/JSON schema file adapter.
//!
//! ```yaml
//! tables:
//!   - name: authors
//!     columns:
//!       - { name: id, type: integer, primary_key: true }
//!       - { name: name, type: text }
//!   - name: books
//!     columns:
//!       - { name: id, type: integer, primary_key: true }
//!       - { name: author_id, type: integer, references: authors.id }
//! ```

use super::{schema_from_ddl, Column, ColumnType, ForeignKeyRef, Schema, TableId, TableSchema};
use anyhow::{bail, Context};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root of a schema file
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SchemaFile {
    /// Tables in declaration order
    pub tables: Vec<TableDef>,
}

/// A table in a schema file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

/// A column in a schema file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDef {
    pub name: String,
    /// Type tag: integer, text, boolean, float, datetime, binary or enum
    /// (common SQL spellings such as `varchar` or `timestamp` are accepted)
    #[serde(rename = "type")]
    pub type_name: String,
    /// Allowed variants for `enum` columns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    /// Foreign key target, `table.column` or `{ table, column, constraint }`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ReferenceDef>,
}

/// Foreign key target in a schema file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ReferenceDef {
    /// `table.column`
    Short(String),
    Full {
        table: String,
        column: String,
        #[serde(default)]
        constraint: Option<String>,
    },
}

impl ReferenceDef {
    fn to_foreign_key(&self, table: &str, column: &str) -> anyhow::Result<ForeignKeyRef> {
        match self {
            ReferenceDef::Short(target) => {
                let Some((ref_table, ref_column)) = target.rsplit_once('.') else {
                    bail!(
                        "`{}.{}`: reference `{}` must have the form table.column",
                        table,
                        column,
                        target
                    );
                };
                Ok(ForeignKeyRef::new(ref_table.trim(), ref_column.trim()))
            }
            ReferenceDef::Full {
                table: ref_table,
                column: ref_column,
                constraint,
            } => {
                let mut fk = ForeignKeyRef::new(ref_table.clone(), ref_column.clone());
                fk.constraint = constraint.clone();
                Ok(fk)
            }
        }
    }
}

/// Map a type tag (or a SQL spelling of it) onto a ColumnType
pub fn parse_type_tag(name: &str, values: &[String]) -> ColumnType {
    match name.trim().to_lowercase().as_str() {
        "integer" | "int" => ColumnType::Integer,
        "text" | "string" | "str" => ColumnType::Text,
        "boolean" | "bool" => ColumnType::Boolean,
        "float" | "double" => ColumnType::Float,
        "datetime" | "timestamp" => ColumnType::DateTime,
        "binary" | "bytes" => ColumnType::Binary,
        "enum" | "enumeration" => ColumnType::Enum(values.to_vec()),
        other => match ColumnType::from_sql_type(other) {
            ColumnType::Enum(parsed) if parsed.is_empty() => ColumnType::Enum(values.to_vec()),
            parsed => parsed,
        },
    }
}

impl SchemaFile {
    /// Parse a YAML document (JSON is valid YAML)
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Parse a JSON document
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Convert into a resolved Schema
    pub fn into_schema(self) -> anyhow::Result<Schema> {
        let mut schema = Schema::new();

        for table_def in self.tables {
            let mut table = TableSchema::new(table_def.name.clone(), TableId(0));
            for col_def in table_def.columns {
                let col_type = parse_type_tag(&col_def.type_name, &col_def.values);
                let mut col = Column::new(col_def.name.clone(), col_type).nullable(col_def.nullable);
                if col_def.primary_key {
                    col = col.primary_key();
                }
                if let Some(reference) = &col_def.references {
                    col = col.references(reference.to_foreign_key(&table_def.name, &col_def.name)?);
                }
                table.add_column(col);
            }
            schema.add_table(table);
        }

        schema.resolve_foreign_keys()?;
        Ok(schema)
    }
}

/// Load a schema, picking the adapter by file extension:
/// `.sql` (DDL), `.json`, anything else YAML.
pub fn load_schema(path: &Path) -> anyhow::Result<Schema> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let schema = match ext.as_str() {
        "sql" | "ddl" => schema_from_ddl(&content)?,
        "json" => SchemaFile::from_json(&content)?.into_schema()?,
        _ => SchemaFile::from_yaml(&content)?.into_schema()?,
    };

    if schema.is_empty() {
        bail!("no tables found in {}", path.display());
    }

    Ok(schema)
}
