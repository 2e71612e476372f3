use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A named risk category used to classify test cases and filter results.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RaiDimension {
    SecurityAndSafety,
    DataAndPrivacy,
    Reliability,
    FairnessAndBias,
    Sustainability,
}

impl RaiDimension {
    pub const ALL: [RaiDimension; 5] = [
        RaiDimension::SecurityAndSafety,
        RaiDimension::DataAndPrivacy,
        RaiDimension::Reliability,
        RaiDimension::FairnessAndBias,
        RaiDimension::Sustainability,
    ];

    /// The value sent to the backend in filter queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            RaiDimension::SecurityAndSafety => "security_and_safety",
            RaiDimension::DataAndPrivacy => "data_and_privacy",
            RaiDimension::Reliability => "reliability",
            RaiDimension::FairnessAndBias => "fairness_and_bias",
            RaiDimension::Sustainability => "sustainability",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RaiDimension::SecurityAndSafety => "Security and Safety",
            RaiDimension::DataAndPrivacy => "Data and Privacy",
            RaiDimension::Reliability => "Reliability",
            RaiDimension::FairnessAndBias => "Fairness and Bias",
            RaiDimension::Sustainability => "Sustainability",
        }
    }
}

impl std::fmt::Display for RaiDimension {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}", self.label())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct RaiDimensionParseError;

impl FromStr for RaiDimension {
    type Err = RaiDimensionParseError;

    /// Accepts either the wire value or the display label.
    fn from_str(value: &str) -> Result<RaiDimension, Self::Err> {
        RaiDimension::ALL
            .into_iter()
            .find(|d| d.as_str() == value || d.label().eq_ignore_ascii_case(value))
            .ok_or(RaiDimensionParseError)
    }
}
