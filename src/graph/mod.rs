//! Type Dependency Graph
//!
//! A petgraph view over a compiled [`TypeSystem`]: one node per type, one
//! edge per reference. Used for dependency queries, recursion analysis and
//! DOT export.
//!
//! Links are references by address, so they appear in the graph and in DOT
//! output but do not make a type recursive.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashSet;

use crate::typesystem::{TypeBody, TypeId, TypeKind, TypeRef, TypeSystem, UnionRepr};

/// How one type refers to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Link target
    Link,
    /// Map key type
    Key,
    /// Map or list value type
    Value,
    /// Struct field type
    Field,
    /// Union member
    Member,
}

/// Edge weight: the kind of reference and a label for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub kind: EdgeKind,
    pub label: String,
}

impl Dependency {
    fn new(kind: EdgeKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
        }
    }
}

pub struct TypeGraph<'ts> {
    ts: &'ts TypeSystem,
    graph: DiGraph<TypeId, Dependency>,
    /// Strongly connected groups that make their members recursive, sorted
    recursive: Vec<Vec<TypeId>>,
}

impl<'ts> TypeGraph<'ts> {
    pub fn build(ts: &'ts TypeSystem) -> Self {
        let mut graph = DiGraph::new();
        // Node index equals arena index
        for ty in ts.iter() {
            graph.add_node(ty.id());
        }

        for ty in ts.iter() {
            let from = node(ty.id());
            for (target, dependency) in dependencies(ty) {
                graph.add_edge(from, node(target), dependency);
            }
        }

        let structural = graph.filter_map(
            |_, &id| Some(id),
            |_, dep| (dep.kind != EdgeKind::Link).then(|| dep.clone()),
        );
        let mut recursive: Vec<Vec<TypeId>> = kosaraju_scc(&structural)
            .into_iter()
            .filter(|scc| scc.len() > 1 || structural.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut ids: Vec<TypeId> = scc.into_iter().map(|idx| structural[idx]).collect();
                ids.sort();
                ids
            })
            .collect();
        recursive.sort();

        Self {
            ts,
            graph,
            recursive,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Types referenced directly by `name`
    pub fn dependencies_of(&self, name: &str) -> Vec<TypeRef<'ts>> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Types that reference `name` directly
    pub fn dependents_of(&self, name: &str) -> Vec<TypeRef<'ts>> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Groups of types that contain each other by value
    pub fn recursive_groups(&self) -> Vec<Vec<TypeRef<'ts>>> {
        self.recursive
            .iter()
            .map(|group| group.iter().map(|&id| self.ts.type_by_id(id)).collect())
            .collect()
    }

    pub fn is_recursive(&self, name: &str) -> bool {
        let Some(ty) = self.ts.get(name) else {
            return false;
        };
        self.recursive.iter().any(|group| group.contains(&ty.id()))
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<TypeRef<'ts>> {
        let Some(ty) = self.ts.get(name) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut result: Vec<TypeRef<'ts>> = self
            .graph
            .edges_directed(node(ty.id()), direction)
            .map(|e| match direction {
                Direction::Outgoing => e.target(),
                Direction::Incoming => e.source(),
            })
            .filter(|idx| seen.insert(*idx))
            .map(|idx| self.ts.type_by_id(self.graph[idx]))
            .collect();
        result.sort_by_key(|t| t.id());
        result
    }

    /// Export as a Graphviz digraph
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph TypeSystem {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#606060\"];\n");
        output.push('\n');

        for ty in self.ts.iter() {
            let style = if ty.is_anonymous() {
                ", style=\"filled,rounded,dashed\""
            } else {
                ""
            };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\\n{}\", fillcolor=\"{}\"{}];\n",
                ty.name(),
                ty.name(),
                ty.type_kind(),
                kind_color(ty.type_kind()),
                style
            ));
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            let source = self.ts.type_by_id(self.graph[edge.source()]);
            let target = self.ts.type_by_id(self.graph[edge.target()]);
            let dep = edge.weight();
            let dashed = if dep.kind == EdgeKind::Link { ", style=dashed" } else { "" };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"{}];\n",
                source.name(),
                target.name(),
                dep.label.replace('"', "\\\""),
                dashed
            ));
        }

        output.push_str("}\n");
        output
    }
}

fn node(id: TypeId) -> NodeIndex {
    NodeIndex::new(id.index())
}

/// Outgoing references of one type with their edge weights
fn dependencies(ty: TypeRef<'_>) -> Vec<(TypeId, Dependency)> {
    match ty.kind() {
        TypeBody::Bool
        | TypeBody::String
        | TypeBody::Bytes
        | TypeBody::Int
        | TypeBody::Float
        | TypeBody::Enum(_) => Vec::new(),
        TypeBody::Link(link) => link
            .expected_type
            .map(|id| (id, Dependency::new(EdgeKind::Link, "&")))
            .into_iter()
            .collect(),
        TypeBody::Map(map) => vec![
            (map.key_type, Dependency::new(EdgeKind::Key, "key")),
            (map.value_type, Dependency::new(EdgeKind::Value, "value")),
        ],
        TypeBody::List(list) => vec![(list.value_type, Dependency::new(EdgeKind::Value, "[]"))],
        TypeBody::Struct(st) => st
            .fields
            .iter()
            .map(|f| (f.ty, Dependency::new(EdgeKind::Field, f.name.as_str())))
            .collect(),
        TypeBody::Union(union) => union
            .members
            .iter()
            .map(|&id| (id, Dependency::new(EdgeKind::Member, member_label(&union.representation, id))))
            .collect(),
    }
}

/// Discriminant that selects `member`, joined if there are several
fn member_label(repr: &UnionRepr, member: TypeId) -> String {
    let labels: Vec<String> = match repr {
        UnionRepr::Keyed(table)
        | UnionRepr::Envelope {
            discriminant_table: table,
            ..
        }
        | UnionRepr::Inline {
            discriminant_table: table,
            ..
        }
        | UnionRepr::StringPrefix(table) => table
            .iter()
            .filter(|(_, &id)| id == member)
            .map(|(key, _)| key.clone())
            .collect(),
        UnionRepr::Kinded(table) => table
            .iter()
            .filter(|(_, &id)| id == member)
            .map(|(kind, _)| kind.to_string())
            .collect(),
        UnionRepr::BytePrefix(table) => table.get(&member).map(|b| b.to_string()).into_iter().collect(),
    };
    labels.join("|")
}

fn kind_color(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Struct => "#00BCD4",
        TypeKind::Union => "#9C27B0",
        TypeKind::Enum => "#FF5722",
        TypeKind::Map | TypeKind::List => "#4CAF50",
        TypeKind::Link => "#2196F3",
        TypeKind::Bool | TypeKind::String | TypeKind::Bytes | TypeKind::Int | TypeKind::Float => {
            "#B0BEC5"
        }
    }
}
