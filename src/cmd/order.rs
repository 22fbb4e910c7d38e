//! Order command - print tables in the order they must be populated.

use crate::error::GenerateError;
use crate::schema::{load_schema, SchemaGraph};
use anyhow::Result;
use std::path::PathBuf;

/// Run the order command
pub fn run(file: PathBuf, reverse: bool, check: bool) -> Result<()> {
    let schema = load_schema(&file)?;
    let graph = SchemaGraph::from_schema(&schema);

    let resolution = match graph.resolve() {
        Ok(resolution) => resolution,
        Err(GenerateError::SchemaCycle { tables }) => {
            eprintln!("\nWarning: Circular dependencies detected!");
            eprintln!("The following tables are part of cycles:");
            for name in &tables {
                eprintln!("  - {}", name);
            }
            eprintln!();

            if check {
                anyhow::bail!("Check FAILED: cannot determine a valid order due to cycles");
            }

            // Best effort: orderable tables first, the rest after
            let topo = graph.topo_sort();
            let mut ordered: Vec<String> = topo
                .order
                .iter()
                .chain(topo.cyclic_tables.iter())
                .filter_map(|id| graph.table_name(*id).map(str::to_string))
                .collect();
            if reverse {
                ordered.reverse();
            }
            for name in ordered {
                println!("{}", name);
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut ordered: Vec<(String, bool)> = resolution
        .order
        .iter()
        .filter_map(|id| {
            graph
                .table_name(*id)
                .map(|name| (name.to_string(), resolution.is_self_referencing(*id)))
        })
        .collect();

    if reverse {
        ordered.reverse();
    }

    if check {
        eprintln!("Check PASSED: Tables can be ordered topologically.");
        eprintln!("\nSuggested order ({} tables):", ordered.len());
        for (i, (table, self_ref)) in ordered.iter().enumerate() {
            eprintln!(
                "  {}. {}{}",
                i + 1,
                table,
                if *self_ref { " [self-referencing]" } else { "" }
            );
        }
        return Ok(());
    }

    for (table, self_ref) in ordered {
        if self_ref {
            println!("{} (self-referencing)", table);
        } else {
            println!("{}", table);
        }
    }

    Ok(())
}
