//! Schema dependency graph for FK-aware generation.
//!
//! Provides:
//! - Dependency graph construction from schema FK relationships
//! - Topological sorting for generation order
//! - Cycle detection, naming exactly the tables that form each cycle

use super::{Schema, TableId};
use crate::error::GenerateError;
use ahash::AHashSet;
use std::collections::VecDeque;

/// Schema dependency graph built from foreign key relationships.
///
/// The graph represents parent → child relationships where:
/// - A parent is a table referenced by another table's FK
/// - A child is a table that has an FK referencing another table
///
/// Self-references are kept out of the graph and reported separately.
#[derive(Debug)]
pub struct SchemaGraph<'a> {
    /// The underlying schema
    pub schema: &'a Schema,
    /// For each table, list of parent tables (tables this table references via FK)
    pub parents: Vec<Vec<TableId>>,
    /// For each table, list of child tables (tables that reference this table via FK)
    pub children: Vec<Vec<TableId>>,
}

/// Result of topological sort
#[derive(Debug)]
pub struct TopoSortResult {
    /// Tables in topological order (parents before children)
    pub order: Vec<TableId>,
    /// Tables that are part of or depend on cycles (could not be ordered)
    pub cyclic_tables: Vec<TableId>,
}

/// Generation order for a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Every table, referenced tables before referencing ones
    pub order: Vec<TableId>,
    /// Tables with a FK to themselves; rows may only reference earlier rows
    /// of the same batch
    pub self_referencing: Vec<TableId>,
}

impl Resolution {
    /// Keep only the given tables, preserving order
    pub fn restrict(&self, keep: &AHashSet<TableId>) -> Resolution {
        Resolution {
            order: self
                .order
                .iter()
                .copied()
                .filter(|id| keep.contains(id))
                .collect(),
            self_referencing: self
                .self_referencing
                .iter()
                .copied()
                .filter(|id| keep.contains(id))
                .collect(),
        }
    }

    pub fn is_self_referencing(&self, id: TableId) -> bool {
        self.self_referencing.contains(&id)
    }
}

impl<'a> SchemaGraph<'a> {
    /// Build a dependency graph from a schema
    pub fn from_schema(schema: &'a Schema) -> Self {
        let n = schema.len();
        let mut parents: Vec<Vec<TableId>> = vec![Vec::new(); n];
        let mut children: Vec<Vec<TableId>> = vec![Vec::new(); n];

        for table in schema.iter() {
            for edge in schema.outgoing_edges(table.id) {
                if edge.is_self_reference() {
                    continue;
                }
                let (child_id, parent_id) = (edge.from_table, edge.to_table);
                if !parents[child_id.0 as usize].contains(&parent_id) {
                    parents[child_id.0 as usize].push(parent_id);
                }
                if !children[parent_id.0 as usize].contains(&child_id) {
                    children[parent_id.0 as usize].push(child_id);
                }
            }
        }

        Self {
            schema,
            parents,
            children,
        }
    }

    /// Get the number of tables in the graph
    pub fn len(&self) -> usize {
        self.schema.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
    }

    /// Get the table name for a table ID
    pub fn table_name(&self, id: TableId) -> Option<&str> {
        self.schema.table(id).map(|t| t.name.as_str())
    }

    /// Check if a table has a self-referential FK
    pub fn has_self_reference(&self, id: TableId) -> bool {
        self.schema
            .outgoing_edges(id)
            .iter()
            .any(|e| e.is_self_reference())
    }

    /// Get tables that have self-referential FKs
    pub fn self_referential_tables(&self) -> Vec<TableId> {
        (0..self.len())
            .map(|i| TableId(i as u32))
            .filter(|&id| self.has_self_reference(id))
            .collect()
    }

    /// Perform topological sort using Kahn's algorithm.
    ///
    /// Returns tables in dependency order (parents before children).
    /// Tables that could not be ordered are returned separately.
    pub fn topo_sort(&self) -> TopoSortResult {
        let n = self.len();
        if n == 0 {
            return TopoSortResult {
                order: Vec::new(),
                cyclic_tables: Vec::new(),
            };
        }

        let mut in_degree: Vec<usize> = self.parents.iter().map(|p| p.len()).collect();

        // Roots in declaration order keep the result deterministic
        let mut queue: VecDeque<TableId> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(i, _)| TableId(i as u32))
            .collect();

        let mut order = Vec::with_capacity(n);

        while let Some(table_id) = queue.pop_front() {
            order.push(table_id);

            for &child_id in &self.children[table_id.0 as usize] {
                in_degree[child_id.0 as usize] -= 1;
                if in_degree[child_id.0 as usize] == 0 {
                    queue.push_back(child_id);
                }
            }
        }

        let cyclic_tables: Vec<TableId> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg > 0)
            .map(|(i, _)| TableId(i as u32))
            .collect();

        TopoSortResult {
            order,
            cyclic_tables,
        }
    }

    /// Find the cycles among the given tables: strongly connected components
    /// with at least two members. Each cycle is sorted by table ID.
    pub fn find_cycles(&self, candidates: &[TableId]) -> Vec<Vec<TableId>> {
        let mut tarjan = TarjanScc::new(self, candidates);
        for &id in candidates {
            if tarjan.indices[id.0 as usize].is_none() {
                tarjan.strongconnect(id);
            }
        }

        tarjan
            .sccs
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|mut scc| {
                scc.sort();
                scc
            })
            .collect()
    }

    /// Resolve the generation order.
    ///
    /// Fails with [`GenerateError::SchemaCycle`] naming the tables that take
    /// part in an inter-table cycle. Tables that only depend on a cycle are
    /// not named.
    pub fn resolve(&self) -> Result<Resolution, GenerateError> {
        let result = self.topo_sort();

        if !result.cyclic_tables.is_empty() {
            let mut tables: Vec<String> = self
                .find_cycles(&result.cyclic_tables)
                .into_iter()
                .flatten()
                .filter_map(|id| self.table_name(id).map(str::to_string))
                .collect();
            tables.sort();
            return Err(GenerateError::SchemaCycle { tables });
        }

        Ok(Resolution {
            order: result.order,
            self_referencing: self.self_referential_tables(),
        })
    }

    /// Get all ancestor tables of a given table (tables it depends on, directly or transitively)
    pub fn ancestors(&self, id: TableId) -> Vec<TableId> {
        let mut ancestors = Vec::new();
        let mut visited = vec![false; self.len()];
        let mut queue = VecDeque::new();

        for &parent in &self.parents[id.0 as usize] {
            queue.push_back(parent);
            visited[parent.0 as usize] = true;
        }

        while let Some(current) = queue.pop_front() {
            ancestors.push(current);
            for &parent in &self.parents[current.0 as usize] {
                if !visited[parent.0 as usize] {
                    visited[parent.0 as usize] = true;
                    queue.push_back(parent);
                }
            }
        }

        ancestors
    }

    /// The given tables plus everything they depend on
    pub fn with_ancestors(&self, ids: &[TableId]) -> AHashSet<TableId> {
        let mut set: AHashSet<TableId> = ids.iter().copied().collect();
        for &id in ids {
            set.extend(self.ancestors(id));
        }
        set
    }
}

/// Tarjan's strongly connected components over a subset of the graph
struct TarjanScc<'g, 'a> {
    graph: &'g SchemaGraph<'a>,
    in_subset: Vec<bool>,
    index_counter: usize,
    stack: Vec<TableId>,
    on_stack: Vec<bool>,
    indices: Vec<Option<usize>>,
    lowlinks: Vec<usize>,
    sccs: Vec<Vec<TableId>>,
}

impl<'g, 'a> TarjanScc<'g, 'a> {
    fn new(graph: &'g SchemaGraph<'a>, subset: &[TableId]) -> Self {
        let n = graph.len();
        let mut in_subset = vec![false; n];
        for id in subset {
            in_subset[id.0 as usize] = true;
        }

        Self {
            graph,
            in_subset,
            index_counter: 0,
            stack: Vec::new(),
            on_stack: vec![false; n],
            indices: vec![None; n],
            lowlinks: vec![0; n],
            sccs: Vec::new(),
        }
    }

    fn strongconnect(&mut self, v: TableId) {
        let vi = v.0 as usize;
        self.indices[vi] = Some(self.index_counter);
        self.lowlinks[vi] = self.index_counter;
        self.index_counter += 1;
        self.stack.push(v);
        self.on_stack[vi] = true;

        // Edges point from child to parent
        let graph = self.graph;
        for &w in &graph.parents[vi] {
            let wi = w.0 as usize;
            if !self.in_subset[wi] {
                continue;
            }
            match self.indices[wi] {
                None => {
                    self.strongconnect(w);
                    self.lowlinks[vi] = self.lowlinks[vi].min(self.lowlinks[wi]);
                }
                Some(w_index) if self.on_stack[wi] => {
                    self.lowlinks[vi] = self.lowlinks[vi].min(w_index);
                }
                Some(_) => {}
            }
        }

        if Some(self.lowlinks[vi]) == self.indices[vi] {
            let mut scc = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w.0 as usize] = false;
                scc.push(w);
                if w == v {
                    break;
                }
            }
            self.sccs.push(scc);
        }
    }
}
