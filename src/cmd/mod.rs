mod check;
mod generate;
mod order;

pub(crate) use check::CheckJsonOutput;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sql-dummy")]
#[command(author = "Helge Sverre <helge.sverre@gmail.com>")]
#[command(version)]
#[command(about = "Generate random rows that satisfy a schema's primary and foreign keys", long_about = None)]
pub struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate dummy rows for every table of a schema
    Generate {
        /// Schema file: SQL DDL (.sql), YAML (.yaml/.yml) or JSON (.json)
        schema: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: sql, json, jsonl
        #[arg(short, long, default_value = "sql")]
        format: String,

        /// SQL dialect for sql output: mysql, postgres, sqlite, mssql
        #[arg(short, long, default_value = "mysql")]
        dialect: String,

        /// Rows per table (tables named in the config or --table-rows win)
        #[arg(long)]
        rows: Option<usize>,

        /// Per-table row counts (e.g., users=50,orders=200)
        #[arg(long)]
        table_rows: Option<String>,

        /// YAML config file for generation settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Only generate specific tables (comma-separated); referenced tables are added
        #[arg(short, long)]
        tables: Option<String>,

        /// Rows per INSERT statement
        #[arg(long, default_value = "100")]
        batch_size: usize,

        /// Wrap SQL output in a transaction
        #[arg(long)]
        transaction: bool,

        /// Show progress during generation
        #[arg(short, long)]
        progress: bool,

        /// Show the generation plan without generating rows
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the order in which tables must be populated
    Order {
        /// Schema file: SQL DDL (.sql), YAML (.yaml/.yml) or JSON (.json)
        schema: PathBuf,

        /// Reverse the order (for deletion)
        #[arg(long)]
        reverse: bool,

        /// Exit with an error if the schema has a foreign key cycle
        #[arg(long)]
        check: bool,
    },

    /// Validate a schema and an optional generation config
    Check {
        /// Schema file: SQL DDL (.sql), YAML (.yaml/.yml) or JSON (.json)
        schema: PathBuf,

        /// YAML config file to validate against the schema
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print JSON Schemas for input and output formats
    Schema {
        /// Schema name (schema-file, config, output, check); all when omitted
        name: Option<String>,

        /// List available schema names
        #[arg(long)]
        list: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            schema,
            output,
            format,
            dialect,
            rows,
            table_rows,
            config,
            seed,
            tables,
            batch_size,
            transaction,
            progress,
            dry_run,
        } => generate::run(generate::GenerateOptions {
            schema,
            output,
            format,
            dialect,
            rows,
            table_rows,
            config,
            seed,
            tables,
            batch_size,
            transaction,
            progress,
            dry_run,
        }),
        Commands::Order {
            schema,
            reverse,
            check,
        } => order::run(schema, reverse, check),
        Commands::Check {
            schema,
            config,
            json,
        } => check::run(schema, config, json),
        Commands::Schema { name, list } => {
            if list {
                for name in crate::json_schema::schema_names() {
                    println!("{}", name);
                }
                return Ok(());
            }
            match name {
                Some(name) => {
                    let schema = crate::json_schema::get_schema(&name).ok_or_else(|| {
                        anyhow::anyhow!(
                            "Unknown schema: {}. Available: {}",
                            name,
                            crate::json_schema::schema_names().join(", ")
                        )
                    })?;
                    println!("{}", serde_json::to_string_pretty(&schema)?);
                }
                None => {
                    let all = crate::json_schema::all_schemas();
                    println!("{}", serde_json::to_string_pretty(&all)?);
                }
            }
            Ok(())
        }
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "sql-dummy", &mut io::stdout());
            Ok(())
        }
    }
}
