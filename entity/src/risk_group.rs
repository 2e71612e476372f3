use serde::{Deserialize, Serialize};

/// Severity bucket of a failing RAI category in the workspace chart.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Deserialize, Serialize)]
pub enum RiskGroup {
    #[serde(rename = "High Risk", alias = "high")]
    High,
    #[serde(rename = "Medium Risk", alias = "medium")]
    Medium,
    #[serde(rename = "Low Risk", alias = "low")]
    Low,
}

impl std::fmt::Display for RiskGroup {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskGroup::High => write!(fmt, "High Risk"),
            RiskGroup::Medium => write!(fmt, "Medium Risk"),
            RiskGroup::Low => write!(fmt, "Low Risk"),
        }
    }
}
