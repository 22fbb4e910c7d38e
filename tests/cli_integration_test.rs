//! Integration tests for the sql-dummy binary.

use jsonschema::Validator;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn sql_dummy_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sql-dummy"))
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn create_test_schema(dir: &TempDir) -> PathBuf {
    write_file(
        dir,
        "shop.sql",
        r#"
CREATE TABLE orders (
  id INT NOT NULL,
  customer_id INT NOT NULL,
  placed_at DATETIME NOT NULL,
  PRIMARY KEY (id),
  FOREIGN KEY (customer_id) REFERENCES customers(id)
);

CREATE TABLE customers (
  id INT PRIMARY KEY,
  email VARCHAR(255) NOT NULL,
  referred_by INT,
  FOREIGN KEY (referred_by) REFERENCES customers(id)
);
"#,
    )
}

fn create_cyclic_schema(dir: &TempDir) -> PathBuf {
    write_file(
        dir,
        "cycle.yaml",
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
    )
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn exported_schema(name: &str) -> Validator {
    let output = sql_dummy_bin().args(["schema", name]).output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let schema: Value = serde_json::from_str(&stdout(&output)).unwrap();
    Validator::new(&schema).unwrap()
}

#[test]
fn test_generate_sql_to_file() {
    let dir = TempDir::new().unwrap();
    let schema = create_test_schema(&dir);
    let out = dir.path().join("out.sql");

    let output = sql_dummy_bin()
        .arg("generate")
        .arg(&schema)
        .args(["--rows", "5", "--seed", "42", "--dialect", "postgres", "-o"])
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let sql = fs::read_to_string(&out).unwrap();
    assert!(sql.contains("-- Seed: 42"));
    assert!(sql.contains("-- Dialect: postgres"));
    let customers = sql.find(r#"INSERT INTO "customers""#).unwrap();
    let orders = sql.find(r#"INSERT INTO "orders""#).unwrap();
    assert!(customers < orders);
}

#[test]
fn test_generate_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let schema = create_test_schema(&dir);

    let run = || {
        sql_dummy_bin()
            .arg("generate")
            .arg(&schema)
            .args(["--seed", "7", "--format", "jsonl"])
            .output()
            .unwrap()
    };
    let (a, b) = (run(), run());
    assert!(a.status.success());
    assert_eq!(a.stdout, b.stdout);
    assert_eq!(stdout(&a).lines().count(), 20);
}

#[test]
fn test_generate_json_matches_schema() {
    let dir = TempDir::new().unwrap();
    let schema = create_test_schema(&dir);

    let output = sql_dummy_bin()
        .arg("generate")
        .arg(&schema)
        .args(["--format", "json", "--seed", "3", "--table-rows", "customers=2,orders=6"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(exported_schema("output").is_valid(&json));

    assert_eq!(json["seed"], 3);
    let tables = json["tables"].as_array().unwrap();
    assert_eq!(tables[0]["name"], "customers");
    assert_eq!(tables[0]["rows"].as_array().unwrap().len(), 2);

    let customer_ids: Vec<&Value> = tables[0]["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| &r["id"])
        .collect();
    for order in tables[1]["rows"].as_array().unwrap() {
        assert!(customer_ids.contains(&&order["customer_id"]));
    }
}

#[test]
fn test_generate_only_selected_tables() {
    let dir = TempDir::new().unwrap();
    let schema = create_test_schema(&dir);

    let output = sql_dummy_bin()
        .arg("generate")
        .arg(&schema)
        .args(["--tables", "customers", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["tables"].as_array().unwrap().len(), 1);
}

#[test]
fn test_generate_dry_run() {
    let dir = TempDir::new().unwrap();
    let schema = create_test_schema(&dir);

    let output = sql_dummy_bin()
        .arg("generate")
        .arg(&schema)
        .args(["--dry-run", "--rows", "3"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());

    let err = stderr(&output);
    assert!(err.contains("1. customers: 3 rows [self-referencing]"));
    assert!(err.contains("2. orders: 3 rows"));
    assert!(err.contains("Total: 6 rows"));
}

#[test]
fn test_generate_rejects_cycle() {
    let dir = TempDir::new().unwrap();
    let schema = create_cyclic_schema(&dir);

    let output = sql_dummy_bin().arg("generate").arg(&schema).output().unwrap();
    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("foreign key cycle between tables: A, B"));
}

#[test]
fn test_generate_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let schema = create_test_schema(&dir);
    let config = write_file(&dir, "bad.yaml", "types:\n  text: { min_length: 9, max_length: 2 }\n");

    let output = sql_dummy_bin()
        .arg("generate")
        .arg(&schema)
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("types.text"));
}

#[test]
fn test_generate_unsatisfiable_reference() {
    let dir = TempDir::new().unwrap();
    let schema = create_test_schema(&dir);

    let output = sql_dummy_bin()
        .arg("generate")
        .arg(&schema)
        .args(["--table-rows", "customers=0"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr(&output).contains("orders.customer_id"));
}

#[test]
fn test_order_command() {
    let dir = TempDir::new().unwrap();
    let schema = create_test_schema(&dir);

    let output = sql_dummy_bin().arg("order").arg(&schema).output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output), "customers (self-referencing)\norders\n");

    let output = sql_dummy_bin()
        .arg("order")
        .arg(&schema)
        .arg("--reverse")
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "orders\ncustomers (self-referencing)\n");
}

#[test]
fn test_order_check_fails_on_cycle() {
    let dir = TempDir::new().unwrap();
    let schema = create_cyclic_schema(&dir);

    let output = sql_dummy_bin()
        .arg("order")
        .arg(&schema)
        .arg("--check")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("  - A"));
    assert!(err.contains("  - B"));
    assert!(err.contains("Check FAILED"));
}

#[test]
fn test_check_json_matches_schema() {
    let dir = TempDir::new().unwrap();
    let schema = create_test_schema(&dir);

    let output = sql_dummy_bin()
        .arg("check")
        .arg(&schema)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(exported_schema("check").is_valid(&json));
    assert_eq!(json["valid"], true);
    assert_eq!(json["tables"], 2);
    assert_eq!(json["foreign_keys"], 2);
    assert_eq!(json["self_referencing"][0], "customers");
}

#[test]
fn test_check_reports_config_errors() {
    let dir = TempDir::new().unwrap();
    let schema = create_test_schema(&dir);
    let config = write_file(
        &dir,
        "bad.yaml",
        "tables:\n  customers:\n    columns:\n      email: { fake: horoscope }\n",
    );

    let output = sql_dummy_bin()
        .arg("check")
        .arg(&schema)
        .arg("--config")
        .arg(&config)
        .arg("--json")
        .output()
        .unwrap();
    assert!(!output.status.success());

    let json: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["valid"], false);
    assert_eq!(json["errors"].as_array().unwrap().len(), 1);
}

#[test]
fn test_schema_list() {
    let output = sql_dummy_bin().args(["schema", "--list"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output), "check\nconfig\noutput\nschema-file\n");
}

#[test]
fn test_schema_unknown_name() {
    let output = sql_dummy_bin().args(["schema", "nope"]).output().unwrap();
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown schema: nope"));
}

#[test]
fn test_completions() {
    let output = sql_dummy_bin().args(["completions", "bash"]).output().unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("sql-dummy"));
}
