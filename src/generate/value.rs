//! Per-column value generation.
//!
//! A [`ColumnSpec`] is resolved once per column from the configuration and
//! then draws values from an injected random source. Foreign key columns are
//! never resolved here; the row synthesizer fills them from recorded keys.

use super::config::{
    check_fake, check_float_range, check_probability, check_range, datetime_bounds,
    GenerationConfig,
};
use crate::error::GenerateError;
use crate::schema::{Column, ColumnType, TableSchema};
use crate::value::Value;
use chrono::{DateTime, Utc};
use fake::faker::address::en::{CityName, StateName, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::distr::Alphanumeric;
use rand::seq::IndexedRandom;
use rand::Rng;

/// Realistic text generators available through a column's `fake` override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeKind {
    Name,
    FirstName,
    LastName,
    Email,
    Username,
    Phone,
    Company,
    City,
    State,
    Zip,
    Street,
    Word,
    Sentence,
    Paragraph,
}

impl FakeKind {
    /// Accepted generator names
    pub const NAMES: &'static [&'static str] = &[
        "name",
        "first_name",
        "last_name",
        "email",
        "username",
        "phone",
        "company",
        "city",
        "state",
        "zip",
        "street",
        "word",
        "sentence",
        "paragraph",
    ];

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        match self {
            FakeKind::Name => Name().fake_with_rng(rng),
            FakeKind::FirstName => FirstName().fake_with_rng(rng),
            FakeKind::LastName => LastName().fake_with_rng(rng),
            FakeKind::Email => SafeEmail().fake_with_rng(rng),
            FakeKind::Username => Username().fake_with_rng(rng),
            FakeKind::Phone => PhoneNumber().fake_with_rng(rng),
            FakeKind::Company => CompanyName().fake_with_rng(rng),
            FakeKind::City => CityName().fake_with_rng(rng),
            FakeKind::State => StateName().fake_with_rng(rng),
            FakeKind::Zip => ZipCode().fake_with_rng(rng),
            FakeKind::Street => StreetName().fake_with_rng(rng),
            FakeKind::Word => Word().fake_with_rng(rng),
            FakeKind::Sentence => Sentence(3..10).fake_with_rng(rng),
            FakeKind::Paragraph => Paragraph(2..5).fake_with_rng(rng),
        }
    }
}

impl std::str::FromStr for FakeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" | "full_name" => Ok(FakeKind::Name),
            "first_name" => Ok(FakeKind::FirstName),
            "last_name" => Ok(FakeKind::LastName),
            "email" | "safe_email" => Ok(FakeKind::Email),
            "username" | "user_name" => Ok(FakeKind::Username),
            "phone" | "phone_number" => Ok(FakeKind::Phone),
            "company" | "company_name" => Ok(FakeKind::Company),
            "city" => Ok(FakeKind::City),
            "state" => Ok(FakeKind::State),
            "zip" | "zip_code" | "postal_code" => Ok(FakeKind::Zip),
            "street" | "street_name" => Ok(FakeKind::Street),
            "word" => Ok(FakeKind::Word),
            "sentence" => Ok(FakeKind::Sentence),
            "paragraph" => Ok(FakeKind::Paragraph),
            _ => Err(format!(
                "unknown fake generator `{}`; valid options: {}",
                s,
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// Value domain of one column
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Integer { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Text { min_length: usize, max_length: usize },
    Boolean { true_probability: f64 },
    /// Bounds in epoch seconds
    DateTime { start: i64, end: i64 },
    Binary { min_length: usize, max_length: usize },
    OneOf(Vec<String>),
    Fake(FakeKind),
}

/// Fully resolved generation parameters for one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub kind: ValueKind,
    /// Always 0 for non-nullable and primary key columns
    pub null_probability: f64,
}

impl ColumnSpec {
    /// Resolve a column's parameters: per-type defaults, then the column's
    /// override. Every inconsistency is reported as a
    /// [`GenerateError::ValueGeneration`] naming the column.
    pub fn resolve(
        config: &GenerationConfig,
        table: &TableSchema,
        column: &Column,
    ) -> Result<Self, GenerateError> {
        let location = format!("tables.{}.columns.{}", table.name, column.name);
        let types = &config.types;
        let ov = config
            .column_override(&table.name, &column.name)
            .cloned()
            .unwrap_or_default();

        let mismatch = |section: &str| {
            GenerateError::config(
                location.clone(),
                format!("`{}` parameters do not apply to a {} column", section, column.col_type.tag()),
            )
        };

        let set_sections: Vec<&str> = [
            ("integer", ov.integer.is_some()),
            ("float", ov.float.is_some()),
            ("text", ov.text.is_some()),
            ("boolean", ov.boolean.is_some()),
            ("datetime", ov.datetime.is_some()),
            ("binary", ov.binary.is_some()),
        ]
        .into_iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| name)
        .collect();

        let own_section = column.col_type.tag();
        if let Some(other) = set_sections.iter().find(|s| **s != own_section) {
            return Err(mismatch(*other));
        }

        let is_textual = matches!(column.col_type, ColumnType::Text | ColumnType::Enum(_));
        if ov.fake.is_some() && column.col_type != ColumnType::Text {
            return Err(mismatch("fake"));
        }
        if ov.values.is_some() && !is_textual {
            return Err(mismatch("values"));
        }
        if let Some(values) = &ov.values {
            if values.is_empty() {
                return Err(GenerateError::config(location, "`values` must not be empty"));
            }
        }

        let kind = match &column.col_type {
            ColumnType::Integer => {
                let p = ov.integer.as_ref().unwrap_or(&types.integer);
                check_range(&location, p.min, p.max)?;
                ValueKind::Integer {
                    min: p.min,
                    max: p.max,
                }
            }
            ColumnType::Float => {
                let p = ov.float.as_ref().unwrap_or(&types.float);
                check_float_range(&location, p.min, p.max)?;
                ValueKind::Float {
                    min: p.min,
                    max: p.max,
                }
            }
            ColumnType::Text => {
                if let Some(values) = ov.values {
                    ValueKind::OneOf(values)
                } else if let Some(name) = &ov.fake {
                    ValueKind::Fake(check_fake(&location, name)?)
                } else {
                    let p = ov.text.as_ref().unwrap_or(&types.text);
                    check_range(&location, p.min_length, p.max_length)?;
                    ValueKind::Text {
                        min_length: p.min_length,
                        max_length: p.max_length,
                    }
                }
            }
            ColumnType::Boolean => {
                let p = ov.boolean.as_ref().unwrap_or(&types.boolean);
                check_probability(&location, p.true_probability)?;
                ValueKind::Boolean {
                    true_probability: p.true_probability,
                }
            }
            ColumnType::DateTime => {
                let p = ov.datetime.as_ref().unwrap_or(&types.datetime);
                let (start, end) = datetime_bounds(&location, p)?;
                ValueKind::DateTime { start, end }
            }
            ColumnType::Binary => {
                let p = ov.binary.as_ref().unwrap_or(&types.binary);
                check_range(&location, p.min_length, p.max_length)?;
                ValueKind::Binary {
                    min_length: p.min_length,
                    max_length: p.max_length,
                }
            }
            ColumnType::Enum(variants) => {
                let values = ov.values.unwrap_or_else(|| variants.clone());
                if values.is_empty() {
                    return Err(GenerateError::config(
                        location,
                        "enum column has no variants; declare them or set `values`",
                    ));
                }
                ValueKind::OneOf(values)
            }
        };

        if let Some(p) = ov.null_probability {
            check_probability(&location, p)?;
        }

        Ok(Self {
            kind,
            null_probability: config.null_probability(&table.name, column),
        })
    }

    /// Draw one value
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        if self.null_probability > 0.0 && rng.random_bool(self.null_probability) {
            return Value::Null;
        }
        self.kind.generate(rng)
    }
}

impl ValueKind {
    /// Draw one non-null value
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match self {
            ValueKind::Integer { min, max } => Value::Int(rng.random_range(*min..=*max)),
            ValueKind::Float { min, max } => {
                if min == max {
                    Value::Float(*min)
                } else {
                    Value::Float(rng.random_range(*min..=*max))
                }
            }
            ValueKind::Text {
                min_length,
                max_length,
            } => {
                let len = rng.random_range(*min_length..=*max_length);
                let text: String = (0..len)
                    .map(|_| rng.sample(Alphanumeric) as char)
                    .collect();
                Value::Text(text)
            }
            ValueKind::Boolean { true_probability } => Value::Bool(rng.random_bool(*true_probability)),
            ValueKind::DateTime { start, end } => {
                let secs = rng.random_range(*start..=*end);
                match DateTime::<Utc>::from_timestamp(secs, 0) {
                    Some(dt) => Value::DateTime(dt.naive_utc()),
                    None => Value::Null,
                }
            }
            ValueKind::Binary {
                min_length,
                max_length,
            } => {
                let len = rng.random_range(*min_length..=*max_length);
                Value::Bytes((0..len).map(|_| rng.random::<u8>()).collect())
            }
            ValueKind::OneOf(values) => match values.choose(rng) {
                Some(v) => Value::Text(v.clone()),
                None => Value::Null,
            },
            ValueKind::Fake(kind) => Value::Text(kind.generate(rng)),
        }
    }
}

/// Resolves column specs against a configuration and draws single values.
pub struct ValueGenerator<'a> {
    config: &'a GenerationConfig,
}

impl<'a> ValueGenerator<'a> {
    pub fn new(config: &'a GenerationConfig) -> Self {
        Self { config }
    }

    /// Resolve the spec of a non-FK column
    pub fn spec(&self, table: &TableSchema, column: &Column) -> Result<ColumnSpec, GenerateError> {
        ColumnSpec::resolve(self.config, table, column)
    }

    /// Generate one value for a non-FK column
    pub fn generate<R: Rng + ?Sized>(
        &self,
        table: &TableSchema,
        column: &Column,
        rng: &mut R,
    ) -> Result<Value, GenerateError> {
        Ok(self.spec(table, column)?.generate(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table(columns: Vec<Column>) -> TableSchema {
        let mut t = TableSchema::new("t".to_string(), TableId(0));
        for c in columns {
            t.add_column(c);
        }
        t
    }

    #[test]
    fn test_integer_within_range() {
        let t = table(vec![Column::new("n", ColumnType::Integer)]);
        let config = GenerationConfig::from_yaml("types:\n  integer: { min: -3, max: 3 }\n").unwrap();
        let gen = ValueGenerator::new(&config);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..200 {
            let n = gen.generate(&t, &t.columns[0], &mut rng).unwrap().as_int().unwrap();
            assert!((-3..=3).contains(&n));
        }
    }

    #[test]
    fn test_text_length_bounds() {
        let t = table(vec![Column::new("s", ColumnType::Text)]);
        let config = GenerationConfig::from_yaml(
            "tables:\n  t:\n    columns:\n      s: { text: { min_length: 2, max_length: 4 } }\n",
        )
        .unwrap();
        let spec = ColumnSpec::resolve(&config, &t, &t.columns[0]).unwrap();
        let mut rng = StdRng::seed_from_u64(2);

        for _ in 0..100 {
            let v = spec.generate(&mut rng);
            let s = v.as_str().unwrap();
            assert!((2..=4).contains(&s.len()));
            assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_never_null_by_default() {
        let t = table(vec![Column::new("s", ColumnType::Text).nullable(true)]);
        let config = GenerationConfig::default();
        let spec = ColumnSpec::resolve(&config, &t, &t.columns[0]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        assert!((0..100).all(|_| !spec.generate(&mut rng).is_null()));
    }

    #[test]
    fn test_always_null_when_probability_one() {
        let t = table(vec![Column::new("s", ColumnType::Text).nullable(true)]);
        let mut config = GenerationConfig::default();
        config.default.null_probability = 1.0;
        let spec = ColumnSpec::resolve(&config, &t, &t.columns[0]).unwrap();
        let mut rng = StdRng::seed_from_u64(4);

        assert!((0..20).all(|_| spec.generate(&mut rng).is_null()));
    }

    #[test]
    fn test_enum_draws_variants() {
        let t = table(vec![Column::new(
            "status",
            ColumnType::Enum(vec!["a".to_string(), "b".to_string()]),
        )]);
        let spec = ColumnSpec::resolve(&GenerationConfig::default(), &t, &t.columns[0]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..50 {
            let v = spec.generate(&mut rng);
            assert!(matches!(v.as_str(), Some("a") | Some("b")));
        }
    }

    #[test]
    fn test_enum_without_variants_is_rejected() {
        let t = table(vec![Column::new("status", ColumnType::Enum(Vec::new()))]);
        let err = ColumnSpec::resolve(&GenerationConfig::default(), &t, &t.columns[0]).unwrap_err();
        assert!(matches!(err, GenerateError::ValueGeneration { .. }));
    }

    #[test]
    fn test_datetime_within_bounds() {
        let t = table(vec![Column::new("at", ColumnType::DateTime)]);
        let config = GenerationConfig::from_yaml(
            "types:\n  datetime: { start: \"2024-01-01\", end: \"2024-01-02\" }\n",
        )
        .unwrap();
        let spec = ColumnSpec::resolve(&config, &t, &t.columns[0]).unwrap();
        let mut rng = StdRng::seed_from_u64(6);

        for _ in 0..50 {
            match spec.generate(&mut rng) {
                Value::DateTime(dt) => {
                    assert_eq!(dt.format("%Y").to_string(), "2024");
                }
                other => panic!("expected datetime, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_fake_email() {
        let t = table(vec![Column::new("email", ColumnType::Text)]);
        let config = GenerationConfig::from_yaml(
            "tables:\n  t:\n    columns:\n      email: { fake: email }\n",
        )
        .unwrap();
        let spec = ColumnSpec::resolve(&config, &t, &t.columns[0]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let v = spec.generate(&mut rng);
        assert!(v.as_str().unwrap().contains('@'));
    }

    #[test]
    fn test_fake_kind_names_parse() {
        for name in FakeKind::NAMES {
            assert!(name.parse::<FakeKind>().is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_same_seed_same_values() {
        let t = table(vec![Column::new("b", ColumnType::Binary)]);
        let spec = ColumnSpec::resolve(&GenerationConfig::default(), &t, &t.columns[0]).unwrap();
        let mut a = StdRng::seed_from_u64(8);
        let mut b = StdRng::seed_from_u64(8);

        for _ in 0..10 {
            assert_eq!(spec.generate(&mut a), spec.generate(&mut b));
        }
    }
}
