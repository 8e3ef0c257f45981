//! Multi-kind document container and accessors.

use super::{CommonMetadata, EligibilityAtom, RuleComposition, RuleKind};

/// A fully deserialized document of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDocument {
    Atom(EligibilityAtom),
    Composition(RuleComposition),
}

impl RuleDocument {
    /// Get the document's metadata regardless of kind.
    pub fn metadata(&self) -> &CommonMetadata {
        match self {
            RuleDocument::Atom(atom) => &atom.metadata,
            RuleDocument::Composition(comp) => &comp.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut CommonMetadata {
        match self {
            RuleDocument::Atom(atom) => &mut atom.metadata,
            RuleDocument::Composition(comp) => &mut comp.metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata().id
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            RuleDocument::Atom(_) => RuleKind::EligibilityAtom,
            RuleDocument::Composition(_) => RuleKind::RuleComposition,
        }
    }

    pub fn as_atom(&self) -> Option<&EligibilityAtom> {
        match self {
            RuleDocument::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    pub fn as_composition(&self) -> Option<&RuleComposition> {
        match self {
            RuleDocument::Composition(comp) => Some(comp),
            _ => None,
        }
    }

    /// Serialize this document to JSON, delegating to the inner type.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            RuleDocument::Atom(a) => serde_json::to_value(a),
            RuleDocument::Composition(c) => serde_json::to_value(c),
        }
    }

    /// Serialize this document to YAML, delegating to the inner type.
    pub fn to_yaml(&self) -> serde_yaml::Result<String> {
        match self {
            RuleDocument::Atom(a) => serde_yaml::to_string(a),
            RuleDocument::Composition(c) => serde_yaml::to_string(c),
        }
    }
}

impl From<EligibilityAtom> for RuleDocument {
    fn from(atom: EligibilityAtom) -> Self {
        RuleDocument::Atom(atom)
    }
}

impl From<RuleComposition> for RuleDocument {
    fn from(comp: RuleComposition) -> Self {
        RuleDocument::Composition(comp)
    }
}
