//! Generate command CLI handler.

use crate::generate::{GenerateStats, GenerationConfig, Generator};
use crate::schema::{load_schema, Schema};
use crate::sink::{self, JsonLinesSink, JsonSink, RowSink, SqlDialect, SqlSink, SqlSinkOptions};
use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

/// Output format for generated rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Sql,
    Json,
    JsonLines,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sql" => Ok(OutputFormat::Sql),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::JsonLines),
            _ => Err(format!(
                "Unknown format: {}. Valid options: sql, json, jsonl",
                s
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Sql => write!(f, "sql"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonLines => write!(f, "jsonl"),
        }
    }
}

pub struct GenerateOptions {
    pub schema: PathBuf,
    pub output: Option<PathBuf>,
    pub format: String,
    pub dialect: String,
    pub rows: Option<usize>,
    pub table_rows: Option<String>,
    pub config: Option<PathBuf>,
    pub seed: Option<u64>,
    pub tables: Option<String>,
    pub batch_size: usize,
    pub transaction: bool,
    pub progress: bool,
    pub dry_run: bool,
}

pub fn run(opts: GenerateOptions) -> anyhow::Result<()> {
    let format = opts
        .format
        .parse::<OutputFormat>()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let dialect = opts
        .dialect
        .parse::<SqlDialect>()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    if opts.batch_size == 0 {
        bail!("--batch-size must be greater than 0");
    }

    let schema = load_schema(&opts.schema)?;

    let mut config = match &opts.config {
        Some(path) => GenerationConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GenerationConfig::default(),
    };
    if opts.seed.is_some() {
        config.seed = opts.seed;
    }
    if let Some(rows) = opts.rows {
        config.set_default_rows(rows);
    }
    if let Some(spec) = &opts.table_rows {
        for (table, rows) in parse_table_rows(spec, &schema)? {
            config.set_table_rows(&table, rows);
        }
    }

    let mut generator = Generator::new(&schema, config)?;
    if let Some(tables) = &opts.tables {
        let names: Vec<String> = tables
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        generator = generator.with_tables(&names)?;
    }

    let plan = generator.planned_rows();
    let planned_total: usize = plan.iter().map(|(_, n)| n).sum();

    if opts.dry_run {
        eprintln!("Generation plan (seed {}):", generator.seed());
        for (i, (table, rows)) in plan.iter().enumerate() {
            let self_ref = schema
                .get_table_id(table)
                .is_some_and(|id| generator.resolution().is_self_referencing(id));
            eprintln!(
                "  {}. {}: {} rows{}",
                i + 1,
                table,
                rows,
                if self_ref { " [self-referencing]" } else { "" }
            );
        }
        eprintln!("  Total: {} rows", planned_total);
        return Ok(());
    }

    let writer: Box<dyn Write> = if let Some(ref out_path) = opts.output {
        Box::new(BufWriter::new(File::create(out_path).with_context(|| {
            format!("failed to create output file {}", out_path.display())
        })?))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    let mut row_sink: Box<dyn RowSink<Error = io::Error>> = match format {
        OutputFormat::Sql => Box::new(SqlSink::new(
            writer,
            SqlSinkOptions {
                dialect,
                batch_size: opts.batch_size,
                transaction: opts.transaction,
                header: vec![
                    format!("Generated by sql-dummy {}", env!("CARGO_PKG_VERSION")),
                    format!("Schema: {}", opts.schema.display()),
                    format!("Seed: {}", generator.seed()),
                ],
            },
        )),
        OutputFormat::Json => Box::new(JsonSink::new(writer, generator.seed())),
        OutputFormat::JsonLines => Box::new(JsonLinesSink::new(writer)),
    };

    let progress_bar = if opts.progress {
        let pb = ProgressBar::new(planned_total as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows {msg}",
            )
            .unwrap()
            .progress_chars("█▓▒░  ")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        Some(pb)
    } else {
        None
    };

    let mut stats = GenerateStats {
        seed: generator.seed(),
        ..Default::default()
    };

    for table in generator.run() {
        let table = table?;
        if let Some(ref pb) = progress_bar {
            pb.set_message(table.name.clone());
        }
        sink::insert_one(row_sink.as_mut(), &table)?;
        if let Some(ref pb) = progress_bar {
            pb.inc(table.rows.len() as u64);
        }
        stats.add(&table);
    }
    sink::finish(row_sink.as_mut())?;

    if let Some(pb) = progress_bar {
        pb.finish_with_message("done");
    }

    if opts.progress {
        print_stats(&stats);
    }

    Ok(())
}

fn print_stats(stats: &GenerateStats) {
    eprintln!();
    eprintln!("Generate Statistics:");
    eprintln!("  Seed: {}", stats.seed);
    eprintln!("  Tables: {}", stats.tables.len());
    eprintln!("  Total rows: {}", stats.total_rows);
    eprintln!();
    eprintln!("Per-table breakdown:");
    for table in &stats.tables {
        eprintln!("  {}: {} rows", table.name, table.rows);
    }
}

/// Parse `users=50,orders=200`
fn parse_table_rows(spec: &str, schema: &Schema) -> anyhow::Result<Vec<(String, usize)>> {
    let mut result = Vec::new();
    for entry in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((table, rows)) = entry.split_once('=') else {
            bail!("invalid --table-rows entry `{}`: expected table=rows", entry);
        };
        let table = table.trim();
        if schema.get_table(table).is_none() {
            bail!("--table-rows names unknown table `{}`", table);
        }
        let rows: usize = rows
            .trim()
            .parse()
            .with_context(|| format!("invalid row count in --table-rows entry `{}`", entry))?;
        result.push((table.to_string(), rows));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaFile;

    fn schema() -> Schema {
        SchemaFile::from_yaml(
            "tables:\n  - name: users\n    columns:\n      - { name: id, type: integer, primary_key: true }\n",
        )
        .unwrap()
        .into_schema()
        .unwrap()
    }

    #[test]
    fn test_parse_table_rows() {
        let parsed = parse_table_rows("users=5, ", &schema()).unwrap();
        assert_eq!(parsed, vec![("users".to_string(), 5)]);
    }

    #[test]
    fn test_parse_table_rows_rejects_unknown_table() {
        assert!(parse_table_rows("orders=5", &schema()).is_err());
        assert!(parse_table_rows("users", &schema()).is_err());
        assert!(parse_table_rows("users=many", &schema()).is_err());
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("SQL".parse::<OutputFormat>().unwrap(), OutputFormat::Sql);
        assert_eq!("ndjson".parse::<OutputFormat>().unwrap(), OutputFormat::JsonLines);
        assert!("csv".parse::<OutputFormat>().is_err());
    }
}
