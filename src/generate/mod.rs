//! FK-aware dummy row generation.
//!
//! Tables are generated in dependency order. Foreign key columns sample from
//! key values recorded for the referenced table once its batch is complete;
//! self-referencing keys sample from earlier rows of the same batch.
//!
//! Every other column gets a value from its resolved [`ColumnSpec`]. Integer
//! primary keys without an explicit integer override count up from
//! `keys.start`, so they never collide.

mod config;
mod context;
mod value;

pub use config::*;
pub use context::{GenerationContext, RecordedKeys};
pub use value::{ColumnSpec, FakeKind, ValueGenerator, ValueKind};

use crate::error::{GenerateError, Result};
use crate::schema::{ColumnId, Resolution, Schema, SchemaGraph, TableId, TableSchema};
use crate::value::Value;
use ahash::AHashSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::sync::Arc;

/// One generated row: column names shared with its table, values in column
/// order
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedRow {
    pub columns: Arc<[String]>,
    pub values: Vec<Value>,
}

impl GeneratedRow {
    /// Get a value by column name (case-insensitive)
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    /// (column, value) pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl Serialize for GeneratedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// All rows generated for one table
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedTable {
    #[serde(skip)]
    pub id: TableId,
    pub name: String,
    pub columns: Arc<[String]>,
    pub rows: Vec<GeneratedRow>,
}

impl GeneratedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one column
    pub fn column_values(&self, column: &str) -> Vec<&Value> {
        self.rows.iter().filter_map(|r| r.get(column)).collect()
    }
}

/// Output of a complete run, tables in generation order
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedData {
    pub seed: u64,
    pub tables: Vec<GeneratedTable>,
}

impl GeneratedData {
    /// Get a table by name (case-insensitive)
    pub fn table(&self, name: &str) -> Option<&GeneratedTable> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows.len() as u64).sum()
    }

    pub fn stats(&self) -> GenerateStats {
        let mut stats = GenerateStats {
            seed: self.seed,
            ..Default::default()
        };
        for table in &self.tables {
            stats.add(table);
        }
        stats
    }
}

/// Per-table row count
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableStats {
    pub name: String,
    pub rows: u64,
}

/// Statistics from a generation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateStats {
    /// Seed the run used
    pub seed: u64,
    /// Tables in generation order
    pub tables: Vec<TableStats>,
    /// Rows across all tables
    pub total_rows: u64,
}

impl GenerateStats {
    pub fn add(&mut self, table: &GeneratedTable) {
        self.total_rows += table.rows.len() as u64;
        self.tables.push(TableStats {
            name: table.name.clone(),
            rows: table.rows.len() as u64,
        });
    }
}

/// Foreign key columns filled from one sampled referenced row
#[derive(Debug, Clone)]
struct ReferenceGroup {
    target: TableId,
    /// (local column, referenced column)
    columns: Vec<(ColumnId, ColumnId)>,
    /// All local columns nullable
    nullable: bool,
    null_probability: f64,
    self_reference: bool,
    /// Local columns are exactly the primary key; draws must not repeat
    covers_primary_key: bool,
}

/// How a non-FK column is filled
#[derive(Debug, Clone)]
enum ColumnFill {
    Spec(ColumnSpec),
    /// `start + row index`
    Sequence(i64),
    Reference,
}

/// Builds the batch for one table.
pub struct RowSynthesizer<'a> {
    schema: &'a Schema,
    table: &'a TableSchema,
    fills: Vec<ColumnFill>,
    groups: Vec<ReferenceGroup>,
    strategy: ReferenceStrategy,
    max_attempts: usize,
}

impl<'a> RowSynthesizer<'a> {
    /// Prepare a table's synthesizer. Fails on configuration errors only.
    pub fn new(schema: &'a Schema, table: &'a TableSchema, config: &GenerationConfig) -> Result<Self> {
        let mut fills = Vec::with_capacity(table.columns.len());
        for col in &table.columns {
            if col.is_foreign_key() {
                fills.push(ColumnFill::Reference);
                continue;
            }
            if config.uses_key_sequence(table, col) {
                fills.push(ColumnFill::Sequence(config.keys.start));
            } else {
                fills.push(ColumnFill::Spec(ColumnSpec::resolve(config, table, col)?));
            }
        }

        Ok(Self {
            schema,
            table,
            fills,
            groups: reference_groups(table, config),
            strategy: config.references.strategy,
            max_attempts: config.keys.max_attempts,
        })
    }

    /// Generate `count` rows, sampling references from `context`.
    ///
    /// Does not record the batch; the caller does that once the batch is
    /// accepted.
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        count: usize,
        context: &GenerationContext,
        rng: &mut R,
    ) -> Result<Vec<GeneratedRow>> {
        let columns: Arc<[String]> = self.table.column_names().into();
        let mut rows: Vec<GeneratedRow> = Vec::with_capacity(count);

        let mut pools: Vec<ReferencePool> = self
            .groups
            .iter()
            .map(|g| ReferencePool::new(g, context))
            .collect();

        let mut seen_keys: AHashSet<Vec<Value>> = AHashSet::new();

        for index in 0..count {
            let mut attempts = 0;
            let values = loop {
                let values = self.synthesize_row(index, &rows, &mut pools, rng)?;

                if self.table.primary_key.is_empty() {
                    break values;
                }
                let key: Vec<Value> = self
                    .table
                    .primary_key
                    .iter()
                    .map(|c| values[c.0 as usize].clone())
                    .collect();
                if seen_keys.insert(key) {
                    break values;
                }

                attempts += 1;
                if attempts >= self.max_attempts {
                    return Err(GenerateError::KeySpaceExhausted {
                        table: self.table.name.clone(),
                        attempts,
                    });
                }
            };

            for (pool, group) in pools.iter_mut().zip(&self.groups) {
                if group.self_reference
                    && group
                        .columns
                        .iter()
                        .all(|(_, target)| !values[target.0 as usize].is_null())
                {
                    pool.eligible.push(index);
                }
            }

            rows.push(GeneratedRow {
                columns: columns.clone(),
                values,
            });
        }

        Ok(rows)
    }

    fn synthesize_row<R: Rng + ?Sized>(
        &self,
        index: usize,
        batch: &[GeneratedRow],
        pools: &mut [ReferencePool],
        rng: &mut R,
    ) -> Result<Vec<Value>> {
        let mut values: Vec<Value> = Vec::with_capacity(self.fills.len());
        for fill in &self.fills {
            values.push(match fill {
                ColumnFill::Spec(spec) => spec.generate(rng),
                ColumnFill::Sequence(start) => {
                    let key = i64::try_from(index)
                        .ok()
                        .and_then(|i| start.checked_add(i))
                        .ok_or_else(|| GenerateError::KeySpaceExhausted {
                            table: self.table.name.clone(),
                            attempts: 1,
                        })?;
                    Value::Int(key)
                }
                ColumnFill::Reference => Value::Null,
            });
        }

        for (group, pool) in self.groups.iter().zip(pools.iter_mut()) {
            let Some(row) = self.pick(group, pool, rng)? else {
                continue;
            };
            for &(local, target) in &group.columns {
                let value = if group.self_reference {
                    batch[row].values[target.0 as usize].clone()
                } else {
                    pool.value(row, target)
                };
                values[local.0 as usize] = value;
            }
        }

        Ok(values)
    }

    /// Choose a referenced row, or None for NULL
    fn pick<R: Rng + ?Sized>(
        &self,
        group: &ReferenceGroup,
        pool: &mut ReferencePool,
        rng: &mut R,
    ) -> Result<Option<usize>> {
        if pool.eligible.is_empty() {
            if group.nullable {
                return Ok(None);
            }
            let column = group
                .columns
                .first()
                .and_then(|(local, _)| self.table.column(*local))
                .map(|c| c.name.clone())
                .unwrap_or_default();
            return Err(GenerateError::UnsatisfiableReference {
                table: self.table.name.clone(),
                column,
            });
        }

        if group.null_probability > 0.0 && rng.random_bool(group.null_probability) {
            return Ok(None);
        }

        let use_deck = self.strategy == ReferenceStrategy::Spread || group.covers_primary_key;
        if group.self_reference || !use_deck {
            let i = rng.random_range(0..pool.eligible.len());
            return Ok(Some(pool.eligible[i]));
        }

        if pool.deck.is_empty() {
            pool.deck = pool.eligible.clone();
            pool.deck.shuffle(rng);
        }
        Ok(pool.deck.pop())
    }

    /// Name of the referenced table of each reference group, for diagnostics
    pub fn referenced_tables(&self) -> Vec<&str> {
        self.groups
            .iter()
            .filter_map(|g| self.schema.table(g.target).map(|t| t.name.as_str()))
            .collect()
    }
}

/// Sampling state of one reference group during a batch
struct ReferencePool {
    /// Referenced row indices whose target values are all non-null
    eligible: Vec<usize>,
    /// Remaining draws for the spread strategy
    deck: Vec<usize>,
    /// Referenced key values, copied out of the context
    keys: RecordedKeys,
}

impl ReferencePool {
    fn new(group: &ReferenceGroup, context: &GenerationContext) -> Self {
        if group.self_reference {
            return Self {
                eligible: Vec::new(),
                deck: Vec::new(),
                keys: RecordedKeys::default(),
            };
        }

        let targets: Vec<ColumnId> = group.columns.iter().map(|(_, t)| *t).collect();
        let keys = context.keys(group.target).cloned().unwrap_or_default();
        Self {
            eligible: keys.candidates(&targets),
            deck: Vec::new(),
            keys,
        }
    }

    fn value(&self, row: usize, column: ColumnId) -> Value {
        self.keys.value(row, column).cloned().unwrap_or(Value::Null)
    }
}

/// Group FK columns sharing a referenced table and constraint name; unnamed
/// foreign keys each form their own group.
fn reference_groups(table: &TableSchema, config: &GenerationConfig) -> Vec<ReferenceGroup> {
    let mut groups: Vec<(Option<String>, ReferenceGroup)> = Vec::new();

    for col in &table.columns {
        let Some(fk) = &col.foreign_key else {
            continue;
        };
        let Some((target, target_col)) = fk.target else {
            continue;
        };
        let null_probability = config.null_probability(&table.name, col);

        let existing = fk.constraint.as_ref().and_then(|name| {
            groups
                .iter_mut()
                .find(|(c, g)| c.as_deref() == Some(name.as_str()) && g.target == target)
        });

        match existing {
            Some((_, group)) => {
                group.columns.push((col.ordinal, target_col));
                group.nullable &= col.is_nullable;
                group.null_probability = group.null_probability.min(null_probability);
            }
            None => groups.push((
                fk.constraint.clone(),
                ReferenceGroup {
                    target,
                    columns: vec![(col.ordinal, target_col)],
                    nullable: col.is_nullable,
                    null_probability,
                    self_reference: target == table.id,
                    covers_primary_key: false,
                },
            )),
        }
    }

    groups
        .into_iter()
        .map(|(_, mut g)| {
            if !g.nullable {
                g.null_probability = 0.0;
            }
            g.covers_primary_key = !table.primary_key.is_empty()
                && g.columns.len() == table.primary_key.len()
                && g.columns.iter().all(|(local, _)| table.is_pk_column(*local));
            g
        })
        .collect()
}

/// A validated schema and configuration, ready to generate.
pub struct Generator<'s> {
    schema: &'s Schema,
    config: GenerationConfig,
    resolution: Resolution,
    seed: u64,
}

impl<'s> Generator<'s> {
    /// Validate the configuration and resolve the generation order. No rows
    /// are generated until [`Generator::run`] is driven.
    pub fn new(schema: &'s Schema, config: GenerationConfig) -> Result<Self> {
        config.validate(schema)?;
        let resolution = SchemaGraph::from_schema(schema).resolve()?;
        let seed = config.seed.unwrap_or_else(rand::random);

        Ok(Self {
            schema,
            config,
            resolution,
            seed,
        })
    }

    /// Generate only the named tables plus every table they depend on
    pub fn with_tables(mut self, names: &[String]) -> Result<Self> {
        let ids = names
            .iter()
            .map(|n| {
                self.schema
                    .get_table_id(n)
                    .ok_or_else(|| GenerateError::UnknownTable(n.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let keep = SchemaGraph::from_schema(self.schema).with_ancestors(&ids);
        self.resolution = self.resolution.restrict(&keep);
        Ok(self)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Table names in generation order
    pub fn order(&self) -> Vec<&str> {
        self.resolution
            .order
            .iter()
            .filter_map(|id| self.schema.table(*id).map(|t| t.name.as_str()))
            .collect()
    }

    /// Rows that will be requested per table, in generation order
    pub fn planned_rows(&self) -> Vec<(&str, usize)> {
        self.order()
            .into_iter()
            .map(|name| (name, self.config.rows_for(name)))
            .collect()
    }

    /// Start a run. Tables are produced one at a time; dropping the run
    /// cancels the remaining tables.
    pub fn run(&self) -> GenerationRun<'_, 's> {
        GenerationRun {
            generator: self,
            rng: StdRng::seed_from_u64(self.seed),
            context: GenerationContext::new(),
            next: 0,
            failed: false,
        }
    }

    /// Generate every table
    pub fn generate_all(&self) -> Result<GeneratedData> {
        let tables = self.run().collect::<Result<Vec<_>>>()?;
        Ok(GeneratedData {
            seed: self.seed,
            tables,
        })
    }
}

/// One generation run over the resolved table order
pub struct GenerationRun<'g, 's> {
    generator: &'g Generator<'s>,
    rng: StdRng,
    context: GenerationContext,
    next: usize,
    failed: bool,
}

impl GenerationRun<'_, '_> {
    /// Keys recorded so far
    pub fn context(&self) -> &GenerationContext {
        &self.context
    }

    fn generate_table(&mut self, id: TableId) -> Result<GeneratedTable> {
        let generator = self.generator;
        let schema = generator.schema;
        let config = &generator.config;
        let table = schema
            .table(id)
            .ok_or_else(|| GenerateError::UnknownTable(id.to_string()))?;
        let count = config.rows_for(&table.name);

        let synthesizer = RowSynthesizer::new(schema, table, config)?;
        let rows = synthesizer.synthesize(count, &self.context, &mut self.rng)?;

        self.context.record(id, &schema.key_columns(id), &rows);

        tracing::debug!(
            table = %table.name,
            rows = rows.len(),
            references = ?synthesizer.referenced_tables(),
            "generated table"
        );

        Ok(GeneratedTable {
            id,
            name: table.name.clone(),
            columns: table.column_names().into(),
            rows,
        })
    }
}

impl Iterator for GenerationRun<'_, '_> {
    type Item = Result<GeneratedTable>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let id = *self.generator.resolution.order.get(self.next)?;
        self.next += 1;

        let result = self.generate_table(id);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Generate rows for every table of a schema
pub fn generate(schema: &Schema, config: GenerationConfig) -> Result<GeneratedData> {
    Generator::new(schema, config)?.generate_all()
}
