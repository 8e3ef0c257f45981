//! Composition validation: operator arity, atom references, node ids and
//! builder connections.

use std::collections::{HashMap, HashSet};

use crate::schema::*;

use super::condition_checks::validate_condition;
use super::fuzzy::{fuzzy_match, is_kebab_case, is_path_safe, is_semver};
use super::{ValidationResult, MAX_RECOMMENDED_DEPTH};

pub(super) fn validate_header(comp: &RuleComposition, result: &mut ValidationResult) {
    if comp.api_version != "v1" {
        result.error(
            "apiVersion",
            format!("apiVersion must be 'v1', got '{}'", comp.api_version),
        );
    }
    if comp.kind != RuleKind::RuleComposition.as_str() {
        result.error(
            "kind",
            format!("kind must be 'RuleComposition', got '{}'", comp.kind),
        );
    }
    let id = &comp.metadata.id;
    if id.trim().is_empty() {
        result.error("metadata.id", "composition id must not be empty");
    } else if !is_path_safe(id) {
        result.error(
            "metadata.id",
            format!("id '{}' must not contain '/', '\\', '..' or start with '.'", id),
        );
    } else if !is_kebab_case(id) {
        result.warn(
            "metadata.id",
            format!("id should be kebab-case (lowercase alphanumeric + hyphens), got '{}'", id),
        );
    }
    if !is_semver(&comp.version) {
        result.warn("version", format!("version '{}' is not MAJOR.MINOR.PATCH", comp.version));
    }
    if let Some(perf) = &comp.estimated_performance {
        for (name, v) in [
            ("accuracy", perf.accuracy),
            ("speed", perf.speed),
            ("complexity", perf.complexity),
        ] {
            if !v.is_finite() {
                result.warn(format!("estimated_performance.{name}"), "estimate is not a finite number");
            }
        }
    }
}

pub(super) fn validate_nodes(
    comp: &RuleComposition,
    known_atoms: Option<&[&str]>,
    result: &mut ValidationResult,
) {
    if comp.nodes.is_empty() {
        result.warn("nodes", "composition has no nodes and will never grant eligibility");
        return;
    }

    let mut seen_ids: HashSet<&str> = HashSet::new();
    for (i, node) in comp.nodes.iter().enumerate() {
        let path = format!("nodes[{i}]");
        validate_node(node, &path, known_atoms, &mut seen_ids, result);
        if node.depth() > MAX_RECOMMENDED_DEPTH {
            result.warn(
                path,
                format!("tree depth {} exceeds {}", node.depth(), MAX_RECOMMENDED_DEPTH),
            );
        }
    }
}

fn validate_node<'a>(
    node: &'a RuleNode,
    path: &str,
    known_atoms: Option<&[&str]>,
    seen_ids: &mut HashSet<&'a str>,
    result: &mut ValidationResult,
) {
    if let Some(id) = node.node_id() {
        if id.is_empty() {
            result.error(format!("{path}.id"), "node id must not be empty when set");
        } else if !seen_ids.insert(id) {
            result.error(format!("{path}.id"), format!("duplicate node id '{}'", id));
        }
    }

    match node {
        RuleNode::Atom { atom_id, conditions, .. } => {
            validate_atom_ref(atom_id, &format!("{path}.atom_id"), known_atoms, result);
            for (j, cond) in conditions.iter().enumerate() {
                validate_condition(cond, &format!("{path}.conditions[{j}]"), result);
            }
        }
        RuleNode::Operator { operator, children, .. } => match operator {
            LogicalOperator::Not if children.len() != 1 => {
                result.error(
                    format!("{path}.children"),
                    format!("NOT requires exactly one child, found {}", children.len()),
                );
            }
            LogicalOperator::And | LogicalOperator::Or if children.is_empty() => {
                result.error(
                    format!("{path}.children"),
                    format!("{} requires at least one child", operator),
                );
            }
            _ => {}
        },
        RuleNode::Group { name, operator, children, .. } => {
            if name.trim().is_empty() {
                result.warn(format!("{path}.name"), "group has no name");
            }
            if children.is_empty() {
                result.error(format!("{path}.children"), format!("group '{}' has no children", name));
            }
            if *operator == Some(LogicalOperator::Not) && children.len() > 1 {
                result.error(
                    format!("{path}.children"),
                    format!("NOT group '{}' requires exactly one child, found {}", name, children.len()),
                );
            }
        }
    }

    for (j, child) in node.children().iter().enumerate() {
        validate_node(child, &format!("{path}.children[{j}]"), known_atoms, seen_ids, result);
    }
}

fn validate_atom_ref(atom_id: &str, path: &str, known_atoms: Option<&[&str]>, result: &mut ValidationResult) {
    if atom_id.trim().is_empty() {
        result.error(path, "atom_id must not be empty");
        return;
    }
    let Some(known) = known_atoms else { return };
    if known.contains(&atom_id) {
        return;
    }
    let msg = format!("unknown atom '{}'", atom_id);
    match fuzzy_match(atom_id, known) {
        Some(s) => result.error_with_suggestion(path, msg, format!("Did you mean '{}'?", s)),
        None => result.error(path, msg),
    }
}

pub(super) fn validate_connections(comp: &RuleComposition, result: &mut ValidationResult) {
    if comp.connections.is_empty() {
        return;
    }

    let node_ids: HashSet<&str> = comp.node_ids().into_iter().collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();

    for (i, conn) in comp.connections.iter().enumerate() {
        let path = format!("connections[{i}]");
        if !seen.insert(conn.id.as_str()) {
            result.error(format!("{path}.id"), format!("duplicate connection id '{}'", conn.id));
        }
        let mut dangling = false;
        for (end, id) in [("source", &conn.source), ("target", &conn.target)] {
            if !node_ids.contains(id.as_str()) {
                dangling = true;
                result.error(format!("{path}.{end}"), format!("unknown node '{}'", id));
            }
        }
        if conn.source == conn.target {
            result.error(path.clone(), format!("connection '{}' links node '{}' to itself", conn.id, conn.source));
            continue;
        }
        if !dangling {
            edges.entry(conn.source.as_str()).or_default().push(conn.target.as_str());
        }
    }

    if let Some(node) = find_cycle(&edges) {
        result.error("connections", format!("connections form a cycle through node '{}'", node));
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first search over the connection graph; returns a node on a cycle.
fn find_cycle<'a>(edges: &HashMap<&'a str, Vec<&'a str>>) -> Option<&'a str> {
    fn visit<'a>(
        node: &'a str,
        edges: &HashMap<&'a str, Vec<&'a str>>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Option<&'a str> {
        match marks.get(node) {
            Some(Mark::Visiting) => return Some(node),
            Some(Mark::Done) => return None,
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        for &next in edges.get(node).map(Vec::as_slice).unwrap_or_default() {
            if let Some(hit) = visit(next, edges, marks) {
                return Some(hit);
            }
        }
        marks.insert(node, Mark::Done);
        None
    }

    let mut marks = HashMap::new();
    let mut starts: Vec<&str> = edges.keys().copied().collect();
    starts.sort_unstable();
    starts.into_iter().find_map(|start| visit(start, edges, &mut marks))
}
