//! Rule composition types: a tree of atom references combined with
//! AND/OR/NOT operators and named groups.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::metadata::{default_api_version, default_version};
use super::{CommonMetadata, Condition};

/// Logical combinator for operator and group nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
            LogicalOperator::Not => "NOT",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in a composition tree.
///
/// Children are owned by their parent, so a tree built from this type
/// cannot contain back-references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum RuleNode {
    /// Reference to a registered atom, with optional extra conditions that
    /// must all hold on top of the atom's own logic.
    Atom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        atom_id: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        conditions: Vec<Condition>,
    },
    Operator {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        operator: LogicalOperator,
        #[serde(default)]
        children: Vec<RuleNode>,
    },
    /// Named subtree. Combines its children with AND unless `operator` is set.
    Group {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<LogicalOperator>,
        #[serde(default)]
        children: Vec<RuleNode>,
    },
}

impl RuleNode {
    pub fn atom(atom_id: impl Into<String>) -> Self {
        RuleNode::Atom {
            id: None,
            atom_id: atom_id.into(),
            conditions: Vec::new(),
        }
    }

    pub fn and(children: Vec<RuleNode>) -> Self {
        RuleNode::Operator { id: None, operator: LogicalOperator::And, children }
    }

    pub fn or(children: Vec<RuleNode>) -> Self {
        RuleNode::Operator { id: None, operator: LogicalOperator::Or, children }
    }

    pub fn not(child: RuleNode) -> Self {
        RuleNode::Operator { id: None, operator: LogicalOperator::Not, children: vec![child] }
    }

    pub fn group(name: impl Into<String>, children: Vec<RuleNode>) -> Self {
        RuleNode::Group { id: None, name: name.into(), operator: None, children }
    }

    /// Builder-assigned node id, if any.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            RuleNode::Atom { id, .. } | RuleNode::Operator { id, .. } | RuleNode::Group { id, .. } => {
                id.as_deref()
            }
        }
    }

    pub fn children(&self) -> &[RuleNode] {
        match self {
            RuleNode::Atom { .. } => &[],
            RuleNode::Operator { children, .. } | RuleNode::Group { children, .. } => children,
        }
    }

    /// Human-readable label used in traces.
    pub fn label(&self) -> String {
        match self {
            RuleNode::Atom { atom_id, .. } => atom_id.clone(),
            RuleNode::Operator { operator, .. } => operator.as_str().to_string(),
            RuleNode::Group { name, .. } => name.clone(),
        }
    }

    /// Depth of the subtree rooted here (a leaf is 1).
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(RuleNode::depth).max().unwrap_or(0)
    }

    /// Visit every node in depth-first pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a RuleNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

/// Visual edge drawn in the rule builder. Advisory: evaluation follows the
/// node tree, but validation rejects dangling and cyclic connections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleConnection {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default = "default_connection_type")]
    pub connection_type: String,
}

fn default_connection_type() -> String {
    "default".to_string()
}

/// Non-authoritative performance estimate shown in the builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EstimatedPerformance {
    pub accuracy: f64,
    pub speed: f64,
    pub complexity: f64,
}

/// A saved eligibility rule: root nodes plus builder connections.
///
/// Root nodes are combined with an implicit AND. A composition with no
/// nodes never grants eligibility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleComposition {
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_composition_kind")]
    pub kind: String,
    pub metadata: CommonMetadata,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub nodes: Vec<RuleNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<RuleConnection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_performance: Option<EstimatedPerformance>,
    /// Payload returned with an eligible decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

fn default_composition_kind() -> String {
    "RuleComposition".to_string()
}

impl RuleComposition {
    pub fn new(id: impl Into<String>, nodes: Vec<RuleNode>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_composition_kind(),
            metadata: CommonMetadata::named(id),
            version: default_version(),
            nodes,
            connections: Vec::new(),
            estimated_performance: None,
            content: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    /// Distinct atom ids referenced anywhere in the tree, sorted.
    pub fn referenced_atom_ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        for root in &self.nodes {
            root.walk(&mut |node| {
                if let RuleNode::Atom { atom_id, .. } = node {
                    ids.insert(atom_id.clone());
                }
            });
        }
        ids
    }

    /// Whether the tree references `atom_id`.
    pub fn references_atom(&self, atom_id: &str) -> bool {
        let mut found = false;
        for root in &self.nodes {
            root.walk(&mut |node| {
                if let RuleNode::Atom { atom_id: a, .. } = node {
                    found |= a == atom_id;
                }
            });
        }
        found
    }

    /// Builder-assigned node ids in pre-order, duplicates included.
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for root in &self.nodes {
            root.walk(&mut |node| {
                if let Some(id) = node.node_id() {
                    ids.push(id);
                }
            });
        }
        ids
    }

    /// Structural validity, recomputed on every call.
    pub fn is_valid(&self) -> bool {
        crate::validation::validate_composition(self, None).valid
    }
}
