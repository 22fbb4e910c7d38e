//! Random schema generator for sql-dummy tests and benchmarks.
//!
//! Produces deterministic schema documents (YAML, the sql-dummy schema file
//! format) whose foreign keys form a DAG, optionally with self-references
//! and an injected cycle whose participants are known in advance.
//!
//! # Example
//!
//! ```rust
//! use test_schema_gen::{generate, Shape};
//!
//! let spec = generate(42, &Shape::default());
//! let yaml = spec.to_yaml();
//! assert!(yaml.starts_with("tables:"));
//! ```

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt::Write;

/// Shape of a generated schema
#[derive(Debug, Clone)]
pub struct Shape {
    /// Number of acyclic tables
    pub tables: usize,
    /// Maximum foreign keys per table
    pub max_foreign_keys: usize,
    /// Probability that a table references itself
    pub self_reference_probability: f64,
    /// Probability that a foreign key column is nullable
    pub nullable_probability: f64,
    /// Length of an injected cycle (0 for none, otherwise at least 2)
    pub cycle_length: usize,
}

impl Default for Shape {
    fn default() -> Self {
        Self {
            tables: 8,
            max_foreign_keys: 3,
            self_reference_probability: 0.2,
            nullable_probability: 0.3,
            cycle_length: 0,
        }
    }
}

/// Value column types used for non-key columns
const VALUE_TYPES: &[&str] = &["text", "integer", "float", "boolean", "datetime", "binary"];

/// A foreign key column
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeySpec {
    pub column: String,
    pub target: String,
    pub nullable: bool,
}

/// A generated table
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: String,
    /// (column, type) pairs besides the key and foreign key columns
    pub values: Vec<(String, &'static str)>,
    pub foreign_keys: Vec<ForeignKeySpec>,
}

impl TableSpec {
    /// Tables this one references, excluding itself
    pub fn parents(&self) -> Vec<&str> {
        let mut parents: Vec<&str> = self
            .foreign_keys
            .iter()
            .filter(|fk| fk.target != self.name)
            .map(|fk| fk.target.as_str())
            .collect();
        parents.sort();
        parents.dedup();
        parents
    }

    pub fn is_self_referencing(&self) -> bool {
        self.foreign_keys.iter().any(|fk| fk.target == self.name)
    }
}

/// A generated schema
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaSpec {
    /// Tables in declaration order (not dependency order)
    pub tables: Vec<TableSpec>,
    /// Participants of the injected cycle, sorted
    pub cycle: Vec<String>,
}

impl SchemaSpec {
    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Render in the sql-dummy YAML schema format
    pub fn to_yaml(&self) -> String {
        let mut out = String::from("tables:\n");
        for table in &self.tables {
            let _ = writeln!(out, "  - name: {}", table.name);
            let _ = writeln!(out, "    columns:");
            let _ = writeln!(
                out,
                "      - {{ name: id, type: integer, primary_key: true }}"
            );
            for (name, ty) in &table.values {
                let _ = writeln!(out, "      - {{ name: {}, type: {} }}", name, ty);
            }
            for fk in &table.foreign_keys {
                let _ = writeln!(
                    out,
                    "      - {{ name: {}, type: integer, nullable: {}, references: {}.id }}",
                    fk.column, fk.nullable, fk.target
                );
            }
        }
        out
    }
}

/// Generate a schema
pub fn generate(seed: u64, shape: &Shape) -> SchemaSpec {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut tables: Vec<TableSpec> = Vec::with_capacity(shape.tables + shape.cycle_length + 1);

    // Table i may only reference tables created before it
    for i in 0..shape.tables {
        let name = format!("t_{:03}", i);
        let mut foreign_keys = Vec::new();

        if i > 0 && shape.max_foreign_keys > 0 {
            let count = rng.random_range(0..=shape.max_foreign_keys.min(i));
            let mut candidates: Vec<usize> = (0..i).collect();
            candidates.shuffle(&mut rng);
            for (n, &target) in candidates.iter().take(count).enumerate() {
                foreign_keys.push(ForeignKeySpec {
                    column: format!("ref_{}", n),
                    target: format!("t_{:03}", target),
                    nullable: rng.random_bool(shape.nullable_probability),
                });
            }
        }

        if rng.random_bool(shape.self_reference_probability) {
            // The first row of a batch has nothing earlier to point at
            foreign_keys.push(ForeignKeySpec {
                column: "parent_id".to_string(),
                target: name.clone(),
                nullable: true,
            });
        }

        tables.push(TableSpec {
            name,
            values: value_columns(&mut rng),
            foreign_keys,
        });
    }

    let mut cycle = Vec::new();
    if shape.cycle_length >= 2 {
        for i in 0..shape.cycle_length {
            let next = (i + 1) % shape.cycle_length;
            cycle.push(format!("cycle_{}", i));
            tables.push(TableSpec {
                name: format!("cycle_{}", i),
                values: value_columns(&mut rng),
                foreign_keys: vec![ForeignKeySpec {
                    column: "next_id".to_string(),
                    target: format!("cycle_{}", next),
                    nullable: false,
                }],
            });
        }
        // Depends on the cycle without being part of it
        tables.push(TableSpec {
            name: "after_cycle".to_string(),
            values: value_columns(&mut rng),
            foreign_keys: vec![ForeignKeySpec {
                column: "cycle_id".to_string(),
                target: "cycle_0".to_string(),
                nullable: false,
            }],
        });
        cycle.sort();
    }

    tables.shuffle(&mut rng);
    SchemaSpec { tables, cycle }
}

fn value_columns(rng: &mut ChaCha8Rng) -> Vec<(String, &'static str)> {
    let count = rng.random_range(1..=3);
    (0..count)
        .map(|i| {
            let ty = VALUE_TYPES[rng.random_range(0..VALUE_TYPES.len())];
            (format!("v_{}", i), ty)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let shape = Shape::default();
        assert_eq!(generate(7, &shape), generate(7, &shape));
    }

    #[test]
    fn test_acyclic_by_construction() {
        let spec = generate(3, &Shape { tables: 20, ..Default::default() });
        assert!(spec.cycle.is_empty());
        for table in &spec.tables {
            let index: usize = table.name[2..].parse().unwrap();
            for parent in table.parents() {
                let parent_index: usize = parent[2..].parse().unwrap();
                assert!(parent_index < index);
            }
        }
    }

    #[test]
    fn test_cycle_injection() {
        let spec = generate(
            5,
            &Shape {
                cycle_length: 3,
                ..Default::default()
            },
        );
        assert_eq!(spec.cycle, vec!["cycle_0", "cycle_1", "cycle_2"]);
        assert!(spec.table("after_cycle").is_some());
        assert!(spec.to_yaml().contains("references: cycle_0.id"));
    }
}
