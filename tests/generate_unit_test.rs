//! Unit tests for row generation.

use ahash::AHashSet;
use sql_dummy::error::GenerateError;
use sql_dummy::generate::{generate, GeneratedData, GenerationConfig, Generator};
use sql_dummy::schema::{Schema, SchemaFile};
use sql_dummy::value::Value;
use test_schema_gen::{generate as generate_schema, Shape};

fn schema(yaml: &str) -> Schema {
    SchemaFile::from_yaml(yaml).unwrap().into_schema().unwrap()
}

fn config(yaml: &str) -> GenerationConfig {
    GenerationConfig::from_yaml(yaml).unwrap()
}

fn int_column(data: &GeneratedData, table: &str, column: &str) -> Vec<Option<i64>> {
    data.table(table)
        .unwrap()
        .column_values(column)
        .into_iter()
        .map(|v| v.as_int())
        .collect()
}

const AUTHORS_BOOKS: &str = r#"
tables:
  - name: Author
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: name, type: text }
  - name: Book
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: title, type: text }
      - { name: author_id, type: integer, references: Author.id }
"#;

const EMPLOYEES: &str = r#"
tables:
  - name: Employee
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: manager_id, type: integer, nullable: true, references: Employee.id }
"#;

mod reference_tests {
    use super::*;

    #[test]
    fn test_books_reference_generated_authors() {
        let s = schema(AUTHORS_BOOKS);
        let data = generate(
            &s,
            config("seed: 42\ntables:\n  Author: { rows: 3 }\n  Book: { rows: 5 }\n"),
        )
        .unwrap();

        let order: Vec<&str> = data.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(order, vec!["Author", "Book"]);

        let authors: AHashSet<i64> = int_column(&data, "Author", "id")
            .into_iter()
            .map(Option::unwrap)
            .collect();
        assert_eq!(authors.len(), 3);

        let books = int_column(&data, "Book", "author_id");
        assert_eq!(books.len(), 5);
        for author_id in books {
            assert!(authors.contains(&author_id.unwrap()));
        }
    }

    #[test]
    fn test_self_reference_points_at_earlier_rows() {
        let s = schema(EMPLOYEES);
        let data = generate(&s, config("seed: 7\ndefault: { rows: 4 }\n")).unwrap();
        let employees = &data.table("Employee").unwrap().rows;
        assert_eq!(employees.len(), 4);

        assert_eq!(employees[0].get("manager_id"), Some(&Value::Null));
        for (i, row) in employees.iter().enumerate() {
            let manager = row.get("manager_id").unwrap();
            if manager.is_null() {
                continue;
            }
            let earlier: Vec<&Value> = employees[..i].iter().map(|r| &r.values[0]).collect();
            assert!(earlier.contains(&manager), "row {} points at a later row", i);
        }
    }

    #[test]
    fn test_required_self_reference_is_unsatisfiable() {
        let s = schema(
            r#"
tables:
  - name: node
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: parent_id, type: integer, references: node.id }
"#,
        );
        let err = generate(&s, config("default: { rows: 3 }\n")).unwrap_err();
        assert_eq!(
            err,
            GenerateError::UnsatisfiableReference {
                table: "node".to_string(),
                column: "parent_id".to_string(),
            }
        );
    }

    #[test]
    fn test_nullable_reference_to_empty_table() {
        let s = schema(
            r#"
tables:
  - name: category
    columns:
      - { name: id, type: integer, primary_key: true }
  - name: product
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: category_id, type: integer, nullable: true, references: category.id }
"#,
        );
        let data = generate(
            &s,
            config("seed: 1\ntables:\n  category: { rows: 0 }\n  product: { rows: 4 }\n"),
        )
        .unwrap();

        assert!(data.table("category").unwrap().is_empty());
        assert_eq!(int_column(&data, "product", "category_id"), vec![None; 4]);
    }

    #[test]
    fn test_required_reference_to_empty_table() {
        let s = schema(AUTHORS_BOOKS);
        let err = generate(&s, config("tables:\n  Author: { rows: 0 }\n")).unwrap_err();
        assert_eq!(
            err,
            GenerateError::UnsatisfiableReference {
                table: "Book".to_string(),
                column: "author_id".to_string(),
            }
        );
    }

    #[test]
    fn test_zero_child_rows_needs_no_parents() {
        let s = schema(AUTHORS_BOOKS);
        let data = generate(
            &s,
            config("tables:\n  Author: { rows: 0 }\n  Book: { rows: 0 }\n"),
        )
        .unwrap();
        assert_eq!(data.total_rows(), 0);
    }

    #[test]
    fn test_null_probability_override() {
        let s = schema(EMPLOYEES);
        let data = generate(
            &s,
            config(
                "seed: 5\ndefault: { rows: 20 }\ntables:\n  Employee:\n    columns:\n      manager_id: { null_probability: 1.0 }\n",
            ),
        )
        .unwrap();
        assert!(int_column(&data, "Employee", "manager_id")
            .iter()
            .all(Option::is_none));
    }

    #[test]
    fn test_reference_to_non_key_column() {
        let s = schema(
            r#"
tables:
  - name: account
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: handle, type: text }
  - name: mention
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: handle, type: text, references: account.handle }
"#,
        );
        let data = generate(&s, config("seed: 11\ndefault: { rows: 6 }\n")).unwrap();
        let handles: Vec<&Value> = data.table("account").unwrap().column_values("handle");
        for handle in data.table("mention").unwrap().column_values("handle") {
            assert!(handles.contains(&handle));
        }
    }
}

mod determinism_tests {
    use super::*;

    #[test]
    fn test_same_seed_same_rows() {
        let s = schema(AUTHORS_BOOKS);
        let a = generate(&s, config("seed: 99\ndefault: { rows: 8 }\n")).unwrap();
        let b = generate(&s, config("seed: 99\ndefault: { rows: 8 }\n")).unwrap();
        assert_eq!(a.seed, 99);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_different_seed_different_rows() {
        let s = schema(AUTHORS_BOOKS);
        let a = generate(&s, config("seed: 1\ndefault: { rows: 8 }\n")).unwrap();
        let b = generate(&s, config("seed: 2\ndefault: { rows: 8 }\n")).unwrap();
        assert_ne!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_random_seed_is_reported() {
        let s = schema(AUTHORS_BOOKS);
        let generator = Generator::new(&s, GenerationConfig::default()).unwrap();
        let data = generator.generate_all().unwrap();
        assert_eq!(data.seed, generator.seed());
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_invalid_range_fails_before_generation() {
        let s = schema(AUTHORS_BOOKS);
        let err = Generator::new(&s, config("types:\n  integer: { min: 10, max: 1 }\n"))
            .err()
            .unwrap();
        assert!(matches!(err, GenerateError::ValueGeneration { .. }));
        assert!(err.to_string().contains("types.integer"));
    }

    #[test]
    fn test_invalid_probability() {
        let s = schema(AUTHORS_BOOKS);
        let err = generate(&s, config("default: { null_probability: 1.5 }\n")).unwrap_err();
        assert!(matches!(err, GenerateError::ValueGeneration { .. }));
    }

    #[test]
    fn test_mismatched_override_section() {
        let s = schema(AUTHORS_BOOKS);
        let err = generate(
            &s,
            config("tables:\n  Author:\n    columns:\n      name: { integer: { min: 1, max: 2 } }\n"),
        )
        .unwrap_err();
        assert!(matches!(err, GenerateError::ValueGeneration { .. }));
    }

    #[test]
    fn test_unknown_fake_kind() {
        let s = schema(AUTHORS_BOOKS);
        let err = generate(
            &s,
            config("tables:\n  Author:\n    columns:\n      name: { fake: horoscope }\n"),
        )
        .unwrap_err();
        assert!(matches!(err, GenerateError::ValueGeneration { .. }));
    }

    #[test]
    fn test_foreign_key_null_probability_checked() {
        let s = schema(EMPLOYEES);
        let err = generate(
            &s,
            config("tables:\n  Employee:\n    columns:\n      manager_id: { null_probability: 1.5 }\n"),
        )
        .unwrap_err();
        assert!(matches!(err, GenerateError::ValueGeneration { .. }));
        assert!(err.to_string().contains("Employee.columns.manager_id"));
    }

    #[test]
    fn test_foreign_key_value_override_rejected() {
        let s = schema(AUTHORS_BOOKS);
        let err = generate(
            &s,
            config("tables:\n  Book:\n    columns:\n      author_id: { integer: { min: 1, max: 2 } }\n"),
        )
        .unwrap_err();
        assert!(matches!(err, GenerateError::ValueGeneration { .. }));
    }

    #[test]
    fn test_key_sequence_overflow_fails_before_generation() {
        let s = schema(AUTHORS_BOOKS);
        let err = generate(
            &s,
            config("keys: { start: 9223372036854775807 }\ndefault: { rows: 2 }\n"),
        )
        .unwrap_err();
        assert!(matches!(err, GenerateError::ValueGeneration { .. }));
        assert!(err.to_string().contains("keys.start"));
    }

    #[test]
    fn test_float_range_overflow_fails_before_generation() {
        let s = schema(
            "tables:\n  - name: m\n    columns:\n      - { name: x, type: float }\n",
        );
        let err = generate(&s, config("types:\n  float: { min: -1.7e308, max: 1.7e308 }\n"))
            .unwrap_err();
        assert!(matches!(err, GenerateError::ValueGeneration { .. }));

        let err = generate(
            &s,
            config("tables:\n  m:\n    columns:\n      x: { float: { min: -1.7e308, max: 1.7e308 } }\n"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("m.columns.x"));
    }

    #[test]
    fn test_cycle_fails_before_generation() {
        let s = schema(
            r#"
tables:
  - name: A
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: b_id, type: integer, references: B.id }
  - name: B
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: a_id, type: integer, references: A.id }
"#,
        );
        let err = Generator::new(&s, GenerationConfig::default()).err().unwrap();
        assert_eq!(
            err,
            GenerateError::SchemaCycle {
                tables: vec!["A".to_string(), "B".to_string()]
            }
        );
    }

    #[test]
    fn test_overrides_are_respected() {
        let s = schema(
            r#"
tables:
  - name: item
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: qty, type: integer }
      - { name: status, type: text }
      - { name: email, type: text }
"#,
        );
        let data = generate(
            &s,
            config(
                r#"
seed: 4
default: { rows: 30 }
tables:
  item:
    columns:
      qty: { integer: { min: 5, max: 7 } }
      status: { values: [new, shipped] }
      email: { fake: email }
"#,
            ),
        )
        .unwrap();

        let item = data.table("item").unwrap();
        for row in &item.rows {
            let qty = row.get("qty").unwrap().as_int().unwrap();
            assert!((5..=7).contains(&qty));
            let status = row.get("status").unwrap().as_str().unwrap();
            assert!(status == "new" || status == "shipped");
            assert!(row.get("email").unwrap().as_str().unwrap().contains('@'));
        }
    }
}

mod generated_schema_tests {
    use super::*;

    /// Every non-null FK value appears among the referenced table's values;
    /// self-references point at earlier rows.
    fn assert_referential_integrity(seed: u64, shape: &Shape) {
        let spec = generate_schema(seed, shape);
        let s = schema(&spec.to_yaml());
        let data = generate(&s, config(&format!("seed: {}\ndefault: {{ rows: 12 }}\n", seed))).unwrap();

        for table in &spec.tables {
            let ids = int_column(&data, &table.name, "id");
            for fk in &table.foreign_keys {
                let values = int_column(&data, &table.name, &fk.column);
                let parent_ids = int_column(&data, &fk.target, "id");
                for (i, value) in values.iter().enumerate() {
                    let Some(value) = value else {
                        assert!(fk.nullable, "seed {}: {}.{} is NULL", seed, table.name, fk.column);
                        continue;
                    };
                    if fk.target == table.name {
                        assert!(ids[..i].contains(&Some(*value)));
                    } else {
                        assert!(parent_ids.contains(&Some(*value)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_random_schemas_keep_referential_integrity() {
        for seed in 0..20 {
            assert_referential_integrity(
                seed,
                &Shape {
                    tables: 12,
                    ..Default::default()
                },
            );
        }
    }

    #[test]
    fn test_dense_schemas_keep_referential_integrity() {
        let shape = Shape {
            tables: 20,
            max_foreign_keys: 6,
            self_reference_probability: 0.5,
            nullable_probability: 0.5,
            cycle_length: 0,
        };
        for seed in 100..110 {
            assert_referential_integrity(seed, &shape);
        }
    }
}

mod stats_tests {
    use super::*;

    #[test]
    fn test_stats_follow_generation_order() {
        let s = schema(AUTHORS_BOOKS);
        let data = generate(
            &s,
            config("seed: 1\ntables:\n  Author: { rows: 2 }\n  Book: { rows: 7 }\n"),
        )
        .unwrap();
        let stats = data.stats();

        assert_eq!(stats.seed, 1);
        assert_eq!(stats.total_rows, 9);
        let per_table: Vec<(&str, u64)> = stats
            .tables
            .iter()
            .map(|t| (t.name.as_str(), t.rows))
            .collect();
        assert_eq!(per_table, vec![("Author", 2), ("Book", 7)]);
    }

    #[test]
    fn test_planned_rows_precedence() {
        let s = schema(AUTHORS_BOOKS);
        let mut cfg = config("default: { rows: 4 }\ntables:\n  book: { rows: 6 }\n");
        cfg.set_default_rows(5);
        cfg.set_table_rows("author", 1);

        let generator = Generator::new(&s, cfg).unwrap();
        assert_eq!(generator.planned_rows(), vec![("Author", 1), ("Book", 6)]);
    }
}
