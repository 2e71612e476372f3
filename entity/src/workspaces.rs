use crate::risk_group::RiskGroup;
use crate::Id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named grouping under which test sets are organized and run against one environment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub environment_id: Option<Id>,
    #[serde(alias = "updatedAt", default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Payload for creating a workspace.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<Id>,
}

/// Partial update of a workspace; absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<Id>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.environment_id.is_none()
    }
}

/// Aggregate pass/fail statistics for one workspace.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_test_sets: u64,
    pub total_test_cases: u64,
    pub passed_sets_percentage: f64,
    pub failed_sets_percentage: f64,
    pub passed_cases_percentage: f64,
    pub failed_cases_percentage: f64,
}

/// Share of failing cases in one RAI category, for the workspace chart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailCase {
    pub category: String,
    #[serde(alias = "percent")]
    pub value: f64,
    pub group: RiskGroup,
}

/// Everything the workspace overview shows at once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detail {
    pub id: Id,
    pub name: String,
    pub last_updated: Option<DateTime<Utc>>,
    pub environment_id: Option<Id>,
    pub stats: Stats,
    pub fail_cases: Vec<FailCase>,
    /// True while the backend refuses to start another run for this workspace.
    pub run_disabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_omits_missing_environment() {
        let draft = Draft {
            name: "Login API Testing".to_string(),
            environment_id: None,
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "Login API Testing" }));
    }

    #[test]
    fn test_fail_case_reads_backend_percent_field() {
        let case: FailCase = serde_json::from_value(serde_json::json!({
            "category": "Data & Privacy",
            "percent": 80.0,
            "group": "High Risk"
        }))
        .unwrap();
        assert_eq!(case.value, 80.0);
        assert_eq!(case.group, RiskGroup::High);
    }

    #[test]
    fn test_empty_changes() {
        assert!(Changes::default().is_empty());
        assert!(!Changes {
            name: Some("renamed".to_string()),
            environment_id: None
        }
        .is_empty());
    }
}
