//! Eligibility atom types: the reusable, typed condition generators.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

use super::metadata::{default_api_version, default_version};
use super::{CommonMetadata, Condition, ConditionOperator};

/// A named, typed, reusable condition generator parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EligibilityAtom {
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_atom_kind")]
    pub kind: String,
    pub metadata: CommonMetadata,
    pub category: AtomCategory,
    #[serde(default = "default_version")]
    pub version: String,
    pub parameters: AtomParameters,
}

fn default_atom_kind() -> String {
    "EligibilityAtom".to_string()
}

impl EligibilityAtom {
    pub fn new(id: impl Into<String>, category: AtomCategory, parameters: AtomParameters) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_atom_kind(),
            metadata: CommonMetadata::named(id),
            category,
            version: default_version(),
            parameters,
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn is_active(&self) -> bool {
        self.metadata.enabled
    }

    pub fn atom_type(&self) -> AtomType {
        self.parameters.atom_type()
    }
}

/// Audience dimension an atom targets. Informational only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AtomCategory {
    Demographic,
    Behavioral,
    Geographic,
    Temporal,
    Predictive,
    Contextual,
}

impl FromStr for AtomCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "demographic" => Ok(AtomCategory::Demographic),
            "behavioral" => Ok(AtomCategory::Behavioral),
            "geographic" => Ok(AtomCategory::Geographic),
            "temporal" => Ok(AtomCategory::Temporal),
            "predictive" => Ok(AtomCategory::Predictive),
            "contextual" => Ok(AtomCategory::Contextual),
            other => Err(format!("unknown atom category: '{}'", other)),
        }
    }
}

// ── Parameters ──────────────────────────────────────────────────────

/// Per-type atom configuration. The `type` tag selects both the shape of
/// the parameters and the conditions the atom expands to.
///
/// Every variant carries an optional `field` overriding the default
/// subject path for that atom type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum AtomParameters {
    AgeRange {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        min_age: f64,
        max_age: f64,
    },
    Geography {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        regions: Vec<String>,
    },
    Tenure {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        min_months: f64,
    },
    Segment {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        segments: Vec<String>,
    },
    TimeOfDay {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        start_hour: u8,
        end_hour: u8,
    },
    DeviceType {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        devices: Vec<String>,
    },
    Consent {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        #[serde(default = "super::metadata::default_true")]
        required: bool,
    },
    PurchaseFrequency {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        /// Subject must have strictly more purchases than this per `period`.
        threshold: f64,
        #[serde(default = "default_period")]
        period: String,
    },
    EngagementScore {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        min_score: f64,
    },
    ChurnRisk {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        max_risk: f64,
    },
    WeatherImpact {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        conditions: Vec<String>,
    },
    BehaviorPattern {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        pattern: String,
    },
    /// Free-form atom whose logic is an explicit list of conditions (AND).
    Custom { conditions: Vec<Condition> },
}

fn default_period() -> String {
    "monthly".to_string()
}

impl AtomParameters {
    pub fn atom_type(&self) -> AtomType {
        match self {
            AtomParameters::AgeRange { .. } => AtomType::AgeRange,
            AtomParameters::Geography { .. } => AtomType::Geography,
            AtomParameters::Tenure { .. } => AtomType::Tenure,
            AtomParameters::Segment { .. } => AtomType::Segment,
            AtomParameters::TimeOfDay { .. } => AtomType::TimeOfDay,
            AtomParameters::DeviceType { .. } => AtomType::DeviceType,
            AtomParameters::Consent { .. } => AtomType::Consent,
            AtomParameters::PurchaseFrequency { .. } => AtomType::PurchaseFrequency,
            AtomParameters::EngagementScore { .. } => AtomType::EngagementScore,
            AtomParameters::ChurnRisk { .. } => AtomType::ChurnRisk,
            AtomParameters::WeatherImpact { .. } => AtomType::WeatherImpact,
            AtomParameters::BehaviorPattern { .. } => AtomType::BehaviorPattern,
            AtomParameters::Custom { .. } => AtomType::Custom,
        }
    }

    /// Expand the parameters into the atom's intrinsic conditions.
    ///
    /// All returned conditions must hold for the atom to pass.
    pub fn intrinsic_conditions(&self) -> Vec<Condition> {
        let ty = self.atom_type();
        let field = |f: &Option<String>| f.clone().unwrap_or_else(|| ty.default_field().to_string());
        match self {
            AtomParameters::AgeRange { field: f, min_age, max_age } => {
                vec![Condition::new(field(f), ConditionOperator::Between, json!([min_age, max_age]))]
            }
            AtomParameters::Geography { field: f, regions } => {
                vec![Condition::new(field(f), ConditionOperator::InRange, json!(regions))]
            }
            AtomParameters::Tenure { field: f, min_months } => {
                vec![Condition::new(field(f), ConditionOperator::GreaterThan, json!(min_months))]
            }
            AtomParameters::Segment { field: f, segments } => {
                vec![Condition::new(field(f), ConditionOperator::InRange, json!(segments))]
            }
            AtomParameters::TimeOfDay { field: f, start_hour, end_hour } => {
                vec![Condition::new(field(f), ConditionOperator::Between, json!([start_hour, end_hour]))]
            }
            AtomParameters::DeviceType { field: f, devices } => {
                vec![Condition::new(field(f), ConditionOperator::InRange, json!(devices))]
            }
            AtomParameters::Consent { field: f, required } => {
                vec![Condition::new(field(f), ConditionOperator::Equals, json!(required))]
            }
            AtomParameters::PurchaseFrequency { field: f, threshold, .. } => {
                vec![Condition::new(field(f), ConditionOperator::GreaterThan, json!(threshold))]
            }
            AtomParameters::EngagementScore { field: f, min_score } => {
                vec![Condition::new(field(f), ConditionOperator::GreaterThan, json!(min_score))]
            }
            AtomParameters::ChurnRisk { field: f, max_risk } => {
                vec![Condition::new(field(f), ConditionOperator::LessThan, json!(max_risk))]
            }
            AtomParameters::WeatherImpact { field: f, conditions } => {
                vec![Condition::new(field(f), ConditionOperator::InRange, json!(conditions))]
            }
            AtomParameters::BehaviorPattern { field: f, pattern } => {
                vec![Condition::new(field(f), ConditionOperator::Contains, json!(pattern))]
            }
            AtomParameters::Custom { conditions } => conditions.clone(),
        }
    }
}

/// The enumerated atom kinds, without their parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AtomType {
    AgeRange,
    Geography,
    Tenure,
    Segment,
    TimeOfDay,
    DeviceType,
    Consent,
    PurchaseFrequency,
    EngagementScore,
    ChurnRisk,
    WeatherImpact,
    BehaviorPattern,
    Custom,
}

impl AtomType {
    pub const ALL: &'static [AtomType] = &[
        AtomType::AgeRange,
        AtomType::Geography,
        AtomType::Tenure,
        AtomType::Segment,
        AtomType::TimeOfDay,
        AtomType::DeviceType,
        AtomType::Consent,
        AtomType::PurchaseFrequency,
        AtomType::EngagementScore,
        AtomType::ChurnRisk,
        AtomType::WeatherImpact,
        AtomType::BehaviorPattern,
        AtomType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AtomType::AgeRange => "age_range",
            AtomType::Geography => "geography",
            AtomType::Tenure => "tenure",
            AtomType::Segment => "segment",
            AtomType::TimeOfDay => "time_of_day",
            AtomType::DeviceType => "device_type",
            AtomType::Consent => "consent",
            AtomType::PurchaseFrequency => "purchase_frequency",
            AtomType::EngagementScore => "engagement_score",
            AtomType::ChurnRisk => "churn_risk",
            AtomType::WeatherImpact => "weather_impact",
            AtomType::BehaviorPattern => "behavior_pattern",
            AtomType::Custom => "custom",
        }
    }

    /// Subject path read when the atom does not override `field`.
    pub fn default_field(&self) -> &'static str {
        match self {
            AtomType::AgeRange => "age",
            AtomType::Geography => "location",
            AtomType::Tenure => "tenure_months",
            AtomType::Segment => "segment",
            AtomType::TimeOfDay => "hour",
            AtomType::DeviceType => "device",
            AtomType::Consent => "consent.marketing",
            AtomType::PurchaseFrequency => "purchase_frequency",
            AtomType::EngagementScore => "engagement_score",
            AtomType::ChurnRisk => "churn_risk",
            AtomType::WeatherImpact => "weather",
            AtomType::BehaviorPattern => "behavior.patterns",
            AtomType::Custom => "",
        }
    }
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AtomType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AtomType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown atom type: '{}'", s))
    }
}
