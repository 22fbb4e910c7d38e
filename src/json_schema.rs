//! JSON Schema generation for input files and JSON output.
//!
//! Schemas are generated using the schemars crate and can be exported via the `schema` subcommand.

use schemars::{schema_for, JsonSchema, Schema};
use std::collections::BTreeMap;

/// Document written by `generate --format json`
#[derive(JsonSchema)]
#[allow(dead_code)]
struct OutputDocument {
    /// Seed the run used
    seed: u64,
    /// Tables in generation order
    tables: Vec<OutputTable>,
}

#[derive(JsonSchema)]
#[allow(dead_code)]
struct OutputTable {
    name: String,
    columns: Vec<String>,
    /// One object per row, keyed by column name
    rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Returns all JSON schemas.
/// Uses BTreeMap for deterministic ordering (important for diffable output).
pub fn all_schemas() -> BTreeMap<&'static str, Schema> {
    let mut schemas = BTreeMap::new();

    // check --json
    schemas.insert("check", schema_for!(crate::cmd::CheckJsonOutput));

    // generation config file
    schemas.insert("config", schema_for!(crate::generate::GenerationConfig));

    // generate --format json
    schemas.insert("output", schema_for!(OutputDocument));

    // YAML/JSON schema file
    schemas.insert("schema-file", schema_for!(crate::schema::SchemaFile));

    schemas
}

/// Generate a single schema by name.
pub fn get_schema(name: &str) -> Option<Schema> {
    all_schemas().remove(name)
}

/// List all available schema names.
pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}
