use crate::test_set_status::TestSetStatus;
use crate::Id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A test set record as returned after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: Id,
    #[serde(default)]
    pub workspace_id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TestSetStatus,
    #[serde(default)]
    pub files: Vec<File>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A file uploaded as part of a test set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: Id,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// One row of a workspace's test set list, with aggregate case counts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: TestSetStatus,
    /// Unknown while the set has not finished a run.
    pub passed_cases: Option<u64>,
    pub total_cases: Option<u64>,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl Summary {
    /// Fraction of passing cases, if counts are known and non-zero.
    pub fn pass_ratio(&self) -> Option<f64> {
        match (self.passed_cases, self.total_cases) {
            (Some(passed), Some(total)) if total > 0 => Some(passed as f64 / total as f64),
            _ => None,
        }
    }
}

/// Result of validating one uploaded file on the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileCheck {
    pub filename: String,
    #[serde(rename = "error", default)]
    pub errors: Vec<String>,
}

impl FileCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(passed: Option<u64>, total: Option<u64>) -> Summary {
        Summary {
            id: "TC-0001".to_string(),
            name: "Prompt Injection Robustness".to_string(),
            description: String::new(),
            status: TestSetStatus::Completed,
            passed_cases: passed,
            total_cases: total,
            last_run_at: None,
        }
    }

    #[test]
    fn test_pass_ratio_requires_known_non_zero_total() {
        assert_eq!(summary(Some(3), Some(4)).pass_ratio(), Some(0.75));
        assert_eq!(summary(Some(0), Some(0)).pass_ratio(), None);
        assert_eq!(summary(None, Some(4)).pass_ratio(), None);
    }

    #[test]
    fn test_file_check_reads_error_list() {
        let check: FileCheck = serde_json::from_value(serde_json::json!({
            "filename": "cases.csv",
            "error": ["missing column: prompt"]
        }))
        .unwrap();
        assert!(!check.is_valid());

        let ok: FileCheck =
            serde_json::from_value(serde_json::json!({ "filename": "ok.csv" })).unwrap();
        assert!(ok.is_valid());
    }
}
