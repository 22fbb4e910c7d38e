//! Check command - validate a schema and generation config.

use crate::generate::GenerationConfig;
use crate::schema::{load_schema, SchemaGraph};
use schemars::JsonSchema;
use serde::Serialize;
use std::path::PathBuf;

/// JSON output of the check command
#[derive(Debug, Serialize, JsonSchema)]
pub struct CheckJsonOutput {
    /// Whether schema and config are usable for generation
    pub valid: bool,
    pub tables: usize,
    pub foreign_keys: usize,
    /// Tables with a foreign key to themselves
    pub self_referencing: Vec<String>,
    /// Generation order, empty when invalid
    pub order: Vec<String>,
    /// Validation errors
    pub errors: Vec<String>,
}

pub fn run(schema_path: PathBuf, config_path: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let schema = load_schema(&schema_path)?;
    let graph = SchemaGraph::from_schema(&schema);

    let foreign_keys = schema
        .iter()
        .map(|t| schema.outgoing_edges(t.id).len())
        .sum();
    let self_referencing: Vec<String> = graph
        .self_referential_tables()
        .into_iter()
        .filter_map(|id| graph.table_name(id).map(str::to_string))
        .collect();

    let mut errors = Vec::new();
    let order = match graph.resolve() {
        Ok(resolution) => resolution
            .order
            .iter()
            .filter_map(|id| graph.table_name(*id).map(str::to_string))
            .collect(),
        Err(e) => {
            errors.push(e.to_string());
            Vec::new()
        }
    };

    if let Some(path) = &config_path {
        match GenerationConfig::load(path) {
            Ok(config) => {
                if let Err(e) = config.validate(&schema) {
                    errors.push(e.to_string());
                }
            }
            Err(e) => errors.push(format!("failed to load config {}: {}", path.display(), e)),
        }
    }

    let output = CheckJsonOutput {
        valid: errors.is_empty(),
        tables: schema.len(),
        foreign_keys,
        self_referencing,
        order,
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        eprintln!("Schema: {}", schema_path.display());
        eprintln!("  Tables: {}", output.tables);
        eprintln!("  Foreign keys: {}", output.foreign_keys);
        if !output.self_referencing.is_empty() {
            eprintln!("  Self-referencing: {}", output.self_referencing.join(", "));
        }
        if !output.order.is_empty() {
            eprintln!("  Order: {}", output.order.join(" -> "));
        }
        for error in &output.errors {
            eprintln!("  Error: {}", error);
        }
    }

    if !output.valid {
        anyhow::bail!("Check FAILED: {} error(s)", output.errors.len());
    }
    if !json {
        eprintln!("Check PASSED");
    }
    Ok(())
}
