//! CLI for generating random schema files.
//!
//! Usage:
//!   gen-schemas --tables 50 --seed 42 > schema.yaml
//!   gen-schemas --tables 10 --cycle 3 -o cyclic.yaml

use clap::Parser;
use std::fs;
use test_schema_gen::{generate, Shape};

#[derive(Parser, Debug)]
#[command(name = "gen-schemas")]
#[command(about = "Generate random schema files for sql-dummy", long_about = None)]
struct Args {
    /// Number of acyclic tables
    #[arg(long, default_value = "10")]
    tables: usize,

    /// Maximum foreign keys per table
    #[arg(long, default_value = "3")]
    max_fks: usize,

    /// Probability that a table references itself
    #[arg(long, default_value = "0.2")]
    self_refs: f64,

    /// Probability that a foreign key is nullable
    #[arg(long, default_value = "0.3")]
    nullable: f64,

    /// Inject a cycle of this many tables (0 = none)
    #[arg(long, default_value = "0")]
    cycle: usize,

    /// Random seed for reproducibility
    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if !(0.0..=1.0).contains(&args.self_refs) || !(0.0..=1.0).contains(&args.nullable) {
        anyhow::bail!("probabilities must be between 0 and 1");
    }
    if args.cycle == 1 {
        anyhow::bail!("--cycle must be 0 or at least 2");
    }

    let spec = generate(
        args.seed,
        &Shape {
            tables: args.tables,
            max_foreign_keys: args.max_fks,
            self_reference_probability: args.self_refs,
            nullable_probability: args.nullable,
            cycle_length: args.cycle,
        },
    );
    let yaml = spec.to_yaml();

    match args.output {
        Some(path) => {
            fs::write(&path, yaml)?;
            eprintln!("Generated {} tables to {}", spec.tables.len(), path);
        }
        None => print!("{}", yaml),
    }

    Ok(())
}
