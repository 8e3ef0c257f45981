//! Document kind enum for two-pass deserialization dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    EligibilityAtom,
    RuleComposition,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::EligibilityAtom => "EligibilityAtom",
            RuleKind::RuleComposition => "RuleComposition",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "EligibilityAtom" => Ok(RuleKind::EligibilityAtom),
            "RuleComposition" => Ok(RuleKind::RuleComposition),
            other => Err(format!("unknown document kind: '{}'", other)),
        }
    }
}
