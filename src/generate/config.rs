//! YAML configuration for dummy data generation.
//!
//! Supports per-type generation parameters, per-table row counts and
//! per-column overrides.

use super::value::{ColumnSpec, FakeKind};
use crate::error::GenerateError;
use crate::schema::{Column, ColumnType, Schema, TableSchema};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Rows per table when neither the config nor the CLI names a count
pub const DEFAULT_ROWS: usize = 10;

/// Integer generation range (inclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IntegerParams {
    pub min: i64,
    pub max: i64,
}

impl Default for IntegerParams {
    fn default() -> Self {
        Self {
            min: 0,
            max: 1_000_000,
        }
    }
}

/// Float generation range (inclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FloatParams {
    pub min: f64,
    pub max: f64,
}

impl Default for FloatParams {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1_000_000.0,
        }
    }
}

/// Text length bounds (inclusive, in characters)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TextParams {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BooleanParams {
    /// Probability of `true`
    pub true_probability: f64,
}

impl Default for BooleanParams {
    fn default() -> Self {
        Self {
            true_probability: 0.5,
        }
    }
}

/// Datetime range, RFC 3339 or `YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DateTimeParams {
    pub start: String,
    pub end: String,
}

impl Default for DateTimeParams {
    fn default() -> Self {
        Self {
            start: "2000-01-01T00:00:00Z".to_string(),
            end: "2030-12-31T23:59:59Z".to_string(),
        }
    }
}

/// Binary length bounds (inclusive, in bytes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BinaryParams {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for BinaryParams {
    fn default() -> Self {
        Self {
            min_length: 4,
            max_length: 16,
        }
    }
}

/// Per-type generation parameters applied to every column of that type
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TypeDefaults {
    pub integer: IntegerParams,
    pub float: FloatParams,
    pub text: TextParams,
    pub boolean: BooleanParams,
    pub datetime: DateTimeParams,
    pub binary: BinaryParams,
}

/// Default generation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DefaultConfig {
    /// Rows per table
    pub rows: Option<usize>,
    /// Probability that a nullable column is NULL
    pub null_probability: f64,
}

/// Per-column override. Only the section matching the column's type may be
/// set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ColumnOverride {
    pub null_probability: Option<f64>,
    pub integer: Option<IntegerParams>,
    pub float: Option<FloatParams>,
    pub text: Option<TextParams>,
    pub boolean: Option<BooleanParams>,
    pub datetime: Option<DateTimeParams>,
    pub binary: Option<BinaryParams>,
    /// Realistic value generator for text columns (email, name, city, ...)
    pub fake: Option<String>,
    /// Fixed set of values for text and enum columns
    pub values: Option<Vec<String>>,
}

/// Per-table generation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TableConfig {
    /// Row count for this table (overrides default)
    pub rows: Option<usize>,
    /// Column overrides keyed by column name
    pub columns: HashMap<String, ColumnOverride>,
}

/// How foreign key values are drawn from the referenced rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceStrategy {
    /// Independent uniform draws
    #[default]
    Uniform,
    /// Draw every referenced row once before repeating any
    Spread,
}

impl std::str::FromStr for ReferenceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uniform" => Ok(ReferenceStrategy::Uniform),
            "spread" => Ok(ReferenceStrategy::Spread),
            _ => Err(format!(
                "Unknown reference strategy: {}. Valid options: uniform, spread",
                s
            )),
        }
    }
}

impl std::fmt::Display for ReferenceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceStrategy::Uniform => write!(f, "uniform"),
            ReferenceStrategy::Spread => write!(f, "spread"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReferenceConfig {
    pub strategy: ReferenceStrategy,
}

/// Primary key generation settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct KeyConfig {
    /// First value of integer primary key sequences
    pub start: i64,
    /// Attempts per row before giving up on a unique primary key
    pub max_attempts: usize,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            start: 1,
            max_attempts: 100,
        }
    }
}

/// Complete YAML configuration for dummy data generation
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GenerationConfig {
    /// Random seed for reproducible output
    pub seed: Option<u64>,
    /// Default settings
    pub default: DefaultConfig,
    /// Per-type generation parameters
    pub types: TypeDefaults,
    /// Foreign key sampling
    pub references: ReferenceConfig,
    /// Primary key generation
    pub keys: KeyConfig,
    /// Per-table settings
    pub tables: HashMap<String, TableConfig>,
}

impl GenerationConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: GenerationConfig = serde_yaml_ng::from_str(content)?;
        Ok(config)
    }

    /// Get configuration for a specific table
    pub fn get_table_config(&self, table_name: &str) -> Option<&TableConfig> {
        self.tables.get(table_name).or_else(|| {
            let lower = table_name.to_lowercase();
            self.tables
                .iter()
                .find(|(k, _)| k.to_lowercase() == lower)
                .map(|(_, v)| v)
        })
    }

    /// Get the override for a specific column
    pub fn column_override(&self, table_name: &str, column_name: &str) -> Option<&ColumnOverride> {
        let table = self.get_table_config(table_name)?;
        table.columns.get(column_name).or_else(|| {
            let lower = column_name.to_lowercase();
            table
                .columns
                .iter()
                .find(|(k, _)| k.to_lowercase() == lower)
                .map(|(_, v)| v)
        })
    }

    /// Row count for a table (table-specific, then default, then [`DEFAULT_ROWS`])
    pub fn rows_for(&self, table_name: &str) -> usize {
        self.get_table_config(table_name)
            .and_then(|t| t.rows)
            .or(self.default.rows)
            .unwrap_or(DEFAULT_ROWS)
    }

    /// Set the default row count
    pub fn set_default_rows(&mut self, rows: usize) {
        self.default.rows = Some(rows);
    }

    /// Set the row count of one table, taking precedence over everything else
    pub fn set_table_rows(&mut self, table_name: &str, rows: usize) {
        let key = self
            .tables
            .keys()
            .find(|k| k.eq_ignore_ascii_case(table_name))
            .cloned()
            .unwrap_or_else(|| table_name.to_string());
        self.tables.entry(key).or_default().rows = Some(rows);
    }

    /// Effective null probability for a column (0 for non-nullable columns)
    pub fn null_probability(&self, table_name: &str, column: &Column) -> f64 {
        if !column.is_nullable || column.is_primary_key {
            return 0.0;
        }
        self.column_override(table_name, &column.name)
            .and_then(|o| o.null_probability)
            .unwrap_or(self.default.null_probability)
    }

    /// Check every parameter against the schema before any row is generated.
    pub fn validate(&self, schema: &Schema) -> Result<(), GenerateError> {
        check_probability("default.null_probability", self.default.null_probability)?;
        self.validate_type_defaults()?;

        if self.keys.max_attempts == 0 {
            return Err(GenerateError::config(
                "keys.max_attempts",
                "must be at least 1",
            ));
        }

        for (table_name, table_config) in &self.tables {
            let Some(table) = schema.get_table(table_name) else {
                tracing::warn!("config names unknown table `{}`; ignoring it", table_name);
                continue;
            };
            for column_name in table_config.columns.keys() {
                if table.get_column(column_name).is_none() {
                    tracing::warn!(
                        "config names unknown column `{}.{}`; ignoring it",
                        table_name,
                        column_name
                    );
                }
            }
        }

        for table in schema.iter() {
            self.column_specs(table)?;
            self.check_key_sequences(table)?;
        }

        Ok(())
    }

    /// Integer primary keys without an `integer` override are filled from
    /// `keys.start` upwards
    pub fn uses_key_sequence(&self, table: &TableSchema, column: &Column) -> bool {
        column.is_primary_key
            && !column.is_foreign_key()
            && column.col_type == ColumnType::Integer
            && !self
                .column_override(&table.name, &column.name)
                .is_some_and(|o| o.integer.is_some())
    }

    fn check_key_sequences(&self, table: &TableSchema) -> Result<(), GenerateError> {
        let rows = self.rows_for(&table.name);
        if rows == 0 || !table.columns.iter().any(|c| self.uses_key_sequence(table, c)) {
            return Ok(());
        }
        let last = i64::try_from(rows - 1)
            .ok()
            .and_then(|n| self.keys.start.checked_add(n));
        if last.is_none() {
            return Err(GenerateError::config(
                "keys.start",
                format!(
                    "sequence starting at {} overflows for {} rows of `{}`",
                    self.keys.start, rows, table.name
                ),
            ));
        }
        Ok(())
    }

    /// Foreign key values come from the referenced table; only
    /// `null_probability` may be overridden.
    fn check_reference_override(&self, table: &TableSchema, column: &Column) -> Result<(), GenerateError> {
        let Some(ov) = self.column_override(&table.name, &column.name) else {
            return Ok(());
        };
        let location = format!("tables.{}.columns.{}", table.name, column.name);

        let value_section = [
            ("integer", ov.integer.is_some()),
            ("float", ov.float.is_some()),
            ("text", ov.text.is_some()),
            ("boolean", ov.boolean.is_some()),
            ("datetime", ov.datetime.is_some()),
            ("binary", ov.binary.is_some()),
            ("fake", ov.fake.is_some()),
            ("values", ov.values.is_some()),
        ]
        .into_iter()
        .find(|(_, set)| *set);
        if let Some((section, _)) = value_section {
            return Err(GenerateError::config(
                location,
                format!("`{}` parameters do not apply to a foreign key column", section),
            ));
        }

        if let Some(p) = ov.null_probability {
            check_probability(&location, p)?;
        }
        Ok(())
    }

    fn validate_type_defaults(&self) -> Result<(), GenerateError> {
        let t = &self.types;
        check_range("types.integer", t.integer.min, t.integer.max)?;
        check_float_range("types.float", t.float.min, t.float.max)?;
        check_range("types.text", t.text.min_length, t.text.max_length)?;
        check_probability("types.boolean.true_probability", t.boolean.true_probability)?;
        datetime_bounds("types.datetime", &t.datetime)?;
        check_range("types.binary", t.binary.min_length, t.binary.max_length)?;
        Ok(())
    }

    /// Resolve the generation spec of every non-FK column of a table
    pub fn column_specs(&self, table: &TableSchema) -> Result<Vec<Option<ColumnSpec>>, GenerateError> {
        table
            .columns
            .iter()
            .map(|col| {
                if col.is_foreign_key() {
                    self.check_reference_override(table, col).map(|_| None)
                } else {
                    ColumnSpec::resolve(self, table, col).map(Some)
                }
            })
            .collect()
    }
}

pub(crate) fn check_probability(location: &str, p: f64) -> Result<(), GenerateError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(GenerateError::config(
            location,
            format!("probability {} is outside [0, 1]", p),
        ));
    }
    Ok(())
}

pub(crate) fn check_range<T: PartialOrd + std::fmt::Display>(
    location: &str,
    min: T,
    max: T,
) -> Result<(), GenerateError> {
    if max < min {
        return Err(GenerateError::config(
            location,
            format!("maximum {} is below minimum {}", max, min),
        ));
    }
    Ok(())
}

pub(crate) fn check_float_range(location: &str, min: f64, max: f64) -> Result<(), GenerateError> {
    if !min.is_finite() || !max.is_finite() {
        return Err(GenerateError::config(location, "bounds must be finite"));
    }
    check_range(location, min, max)?;
    if !(max - min).is_finite() {
        return Err(GenerateError::config(
            location,
            format!("range {}..={} is too wide", min, max),
        ));
    }
    Ok(())
}

/// Parse both datetime bounds into epoch seconds
pub(crate) fn datetime_bounds(
    location: &str,
    params: &DateTimeParams,
) -> Result<(i64, i64), GenerateError> {
    let start = parse_datetime(&params.start).ok_or_else(|| {
        GenerateError::config(location, format!("cannot parse start `{}`", params.start))
    })?;
    let end = parse_datetime(&params.end).ok_or_else(|| {
        GenerateError::config(location, format!("cannot parse end `{}`", params.end))
    })?;
    let (start, end) = (start.and_utc().timestamp(), end.and_utc().timestamp());
    check_range(location, start, end)?;
    Ok((start, end))
}

/// Parse a timestamp in RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` form
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Validate a fake generator name
pub(crate) fn check_fake(location: &str, name: &str) -> Result<FakeKind, GenerateError> {
    name.parse::<FakeKind>()
        .map_err(|e| GenerateError::config(location, e))
}
