//! YAML document schema types with serde deserialization.
//!
//! - `RuleEnvelope`: lightweight first-pass header (apiVersion, kind, metadata)
//! - `RuleDocument`: enum dispatching to kind-specific types
//! - `EligibilityAtom`: typed, reusable condition generator
//! - `RuleComposition`: AND/OR/NOT tree of atom references

mod atom;
mod composition;
mod condition;
mod document;
mod envelope;
mod kind;
pub(crate) mod metadata;

pub use atom::*;
pub use composition::*;
pub use condition::*;
pub use document::*;
pub use envelope::*;
pub use kind::*;
pub use metadata::CommonMetadata;

#[cfg(test)]
mod tests;
