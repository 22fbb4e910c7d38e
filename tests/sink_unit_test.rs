//! Unit tests for the insertion driver and its sinks.

use sql_dummy::generate::{GeneratedRow, GeneratedTable};
use sql_dummy::schema::TableId;
use sql_dummy::sink::{
    self, insert_all, JsonLinesSink, JsonSink, MemorySink, RowSink, SqlDialect, SqlSink,
    SqlSinkOptions, FINISH_TABLE,
};
use sql_dummy::value::Value;
use std::fmt;
use std::sync::Arc;

fn table(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> GeneratedTable {
    let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect::<Vec<_>>().into();
    GeneratedTable {
        id: TableId(0),
        name: name.to_string(),
        columns: columns.clone(),
        rows: rows
            .into_iter()
            .map(|values| GeneratedRow {
                columns: columns.clone(),
                values,
            })
            .collect(),
    }
}

fn users(count: i64) -> GeneratedTable {
    table(
        "users",
        &["id", "name"],
        (1..=count)
            .map(|i| vec![Value::Int(i), Value::Text(format!("user {}", i))])
            .collect(),
    )
}

fn render_sql(options: SqlSinkOptions, tables: &[GeneratedTable]) -> String {
    let mut sink = SqlSink::new(Vec::new(), options);
    insert_all(&mut sink, tables).unwrap();
    String::from_utf8(sink.into_inner()).unwrap()
}

mod sql_tests {
    use super::*;

    #[test]
    fn test_mysql_script() {
        let out = render_sql(SqlSinkOptions::default(), &[users(2)]);
        assert!(out.contains("-- Dialect: mysql"));
        assert!(out.contains("SET NAMES utf8mb4;"));
        assert!(out.contains("-- Table: users (2 rows)"));
        assert!(out.contains("INSERT INTO `users` (`id`, `name`) VALUES\n(1, 'user 1'),\n(2, 'user 2');"));
        assert!(!out.contains("COMMIT"));
    }

    #[test]
    fn test_postgres_quoting() {
        let t = table(
            "notes",
            &["id", "body", "done", "data"],
            vec![vec![
                Value::Int(1),
                Value::Text("it's".to_string()),
                Value::Bool(true),
                Value::Bytes(vec![0xde, 0xad]),
            ]],
        );
        let out = render_sql(
            SqlSinkOptions {
                dialect: SqlDialect::Postgres,
                ..Default::default()
            },
            &[t],
        );
        assert!(out.contains("SET client_encoding = 'UTF8';"));
        assert!(out.contains(r#"INSERT INTO "notes" ("id", "body", "done", "data") VALUES"#));
        assert!(out.contains(r"(1, 'it''s', TRUE, '\xdead');"));
    }

    #[test]
    fn test_mssql_literals() {
        let t = table(
            "notes",
            &["id", "body", "done"],
            vec![vec![Value::Int(1), Value::Text("x".to_string()), Value::Bool(false)]],
        );
        let out = render_sql(
            SqlSinkOptions {
                dialect: SqlDialect::Mssql,
                ..Default::default()
            },
            &[t],
        );
        assert!(out.contains("SET NOCOUNT ON;"));
        assert!(out.contains("INSERT INTO [notes] ([id], [body], [done]) VALUES\n(1, N'x', 0);"));
    }

    #[test]
    fn test_sqlite_nulls_and_floats() {
        let t = table(
            "m",
            &["a", "b", "c"],
            vec![vec![Value::Null, Value::Float(1.5), Value::Float(f64::NAN)]],
        );
        let out = render_sql(
            SqlSinkOptions {
                dialect: SqlDialect::Sqlite,
                ..Default::default()
            },
            &[t],
        );
        assert!(out.contains("PRAGMA foreign_keys = ON;"));
        assert!(out.contains("(NULL, 1.5, NULL);"));
    }

    #[test]
    fn test_batching() {
        let out = render_sql(
            SqlSinkOptions {
                batch_size: 2,
                ..Default::default()
            },
            &[users(5)],
        );
        assert_eq!(out.matches("INSERT INTO").count(), 3);
    }

    #[test]
    fn test_transaction_wrapping() {
        let out = render_sql(
            SqlSinkOptions {
                dialect: SqlDialect::Postgres,
                transaction: true,
                ..Default::default()
            },
            &[users(1)],
        );
        let begin = out.find("BEGIN;").unwrap();
        let insert = out.find("INSERT INTO").unwrap();
        let commit = out.find("COMMIT;").unwrap();
        assert!(begin < insert && insert < commit);
    }

    #[test]
    fn test_header_and_empty_table() {
        let out = render_sql(
            SqlSinkOptions {
                header: vec!["Generated by sql-dummy".to_string(), "Seed: 7".to_string()],
                ..Default::default()
            },
            &[users(0)],
        );
        assert!(out.starts_with("-- Generated by sql-dummy\n-- Seed: 7\n"));
        assert!(out.contains("-- Table: users (0 rows)"));
        assert!(!out.contains("INSERT INTO"));
    }

    #[test]
    fn test_tables_written_in_given_order() {
        let parent = table("parent", &["id"], vec![vec![Value::Int(1)]]);
        let child = table("child", &["id", "parent_id"], vec![vec![Value::Int(1), Value::Int(1)]]);
        let out = render_sql(SqlSinkOptions::default(), &[parent, child]);
        assert!(out.find("`parent`").unwrap() < out.find("`child`").unwrap());
    }
}

mod json_tests {
    use super::*;

    #[test]
    fn test_json_document() {
        let mut sink = JsonSink::new(Vec::new(), 42);
        let report = insert_all(&mut sink, &[users(2), table("empty", &["id"], vec![])]).unwrap();
        assert_eq!(report.total_rows(), 2);

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["seed"], 42);
        assert_eq!(doc["tables"].as_array().unwrap().len(), 2);
        assert_eq!(doc["tables"][0]["name"], "users");
        assert_eq!(doc["tables"][0]["columns"][1], "name");
        assert_eq!(doc["tables"][0]["rows"][1]["id"], 2);
        assert_eq!(doc["tables"][0]["rows"][1]["name"], "user 2");
        assert_eq!(doc["tables"][1]["rows"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_json_without_tables() {
        let mut sink = JsonSink::new(Vec::new(), 1);
        insert_all(&mut sink, &[] as &[GeneratedTable]).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "{\"seed\":1,\"tables\":[]}\n");
    }

    #[test]
    fn test_json_lines() {
        let mut sink = JsonLinesSink::new(Vec::new());
        insert_all(&mut sink, &[users(3)]).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#"{"table":"users","row":{"id":1,"name":"user 1"}}"#);
    }
}

mod driver_tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct Rejected(String);

    impl fmt::Display for Rejected {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "rejected {}", self.0)
        }
    }

    impl std::error::Error for Rejected {}

    /// Accepts tables until it meets the one it is told to reject
    struct FailingSink {
        reject: &'static str,
        seen: Vec<String>,
        finished: bool,
    }

    impl FailingSink {
        fn new(reject: &'static str) -> Self {
            Self {
                reject,
                seen: Vec::new(),
                finished: false,
            }
        }
    }

    impl RowSink for FailingSink {
        type Error = Rejected;

        fn insert_table(&mut self, table: &GeneratedTable) -> Result<u64, Rejected> {
            if table.name == self.reject {
                return Err(Rejected(table.name.clone()));
            }
            self.seen.push(table.name.clone());
            Ok(table.rows.len() as u64)
        }

        fn finish(&mut self) -> Result<(), Rejected> {
            if self.reject == FINISH_TABLE {
                return Err(Rejected("finish".to_string()));
            }
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        let report = insert_all(&mut sink, &[users(2), table("b", &["id"], vec![])]).unwrap();
        assert_eq!(
            report.tables,
            vec![("users".to_string(), 2), ("b".to_string(), 0)]
        );
        assert_eq!(sink.tables[0].name, "users");
        assert_eq!(sink.tables[1].name, "b");
    }

    #[test]
    fn test_sink_error_passes_through() {
        let mut sink = FailingSink::new("b");
        let tables = [
            table("a", &["id"], vec![vec![Value::Int(1)]]),
            table("b", &["id"], vec![vec![Value::Int(1)]]),
            table("c", &["id"], vec![vec![Value::Int(1)]]),
        ];

        let err = insert_all(&mut sink, &tables).unwrap_err();
        assert_eq!(err.table, "b");
        assert_eq!(err.source.0, "b");
        assert_eq!(err.to_string(), "failed to insert rows into `b`: rejected b");
        assert_eq!(err.source().unwrap().to_string(), "rejected b");

        assert_eq!(sink.seen, vec!["a"]);
        assert!(!sink.finished);
    }

    #[test]
    fn test_finish_error_is_tagged() {
        let mut sink = FailingSink::new(FINISH_TABLE);
        let err = insert_all(&mut sink, &[users(1)]).unwrap_err();
        assert_eq!(err.table, "<finish>");
        assert_eq!(err.source.0, "finish");
        assert_eq!(sink.seen, vec!["users"]);
    }

    #[test]
    fn test_streamed_inserts_match_insert_all() {
        let mut streamed = FailingSink::new("b");
        assert_eq!(sink::insert_one(&mut streamed, &users(2)).unwrap(), 2);
        let err = sink::insert_one(&mut streamed, &table("b", &["id"], vec![])).unwrap_err();
        assert_eq!(err.to_string(), "failed to insert rows into `b`: rejected b");
        sink::finish(&mut streamed).unwrap();
        assert!(streamed.finished);

        let mut boxed: Box<dyn RowSink<Error = Rejected>> = Box::new(FailingSink::new(FINISH_TABLE));
        let err = sink::finish(boxed.as_mut()).unwrap_err();
        assert_eq!(err.table, FINISH_TABLE);
    }
}
