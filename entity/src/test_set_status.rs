use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status of a test set run as reported by the backend.
///
/// Transitions (Created → Queued → Running → Completed | Errored) happen on the
/// backend; the console only displays and filters on them.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Deserialize, Serialize)]
pub enum TestSetStatus {
    #[default]
    #[serde(rename = "created", alias = "Created")]
    Created,
    #[serde(rename = "queued", alias = "Queued")]
    Queued,
    #[serde(rename = "running", alias = "Running")]
    Running,
    #[serde(rename = "done", alias = "completed", alias = "Completed")]
    Completed,
    #[serde(rename = "failed", alias = "errored", alias = "Failed")]
    Errored,
}

impl TestSetStatus {
    pub const ALL: [TestSetStatus; 5] = [
        TestSetStatus::Created,
        TestSetStatus::Queued,
        TestSetStatus::Running,
        TestSetStatus::Completed,
        TestSetStatus::Errored,
    ];

    /// The value used on the wire and in filter queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestSetStatus::Created => "created",
            TestSetStatus::Queued => "queued",
            TestSetStatus::Running => "running",
            TestSetStatus::Completed => "done",
            TestSetStatus::Errored => "failed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestSetStatus::Created => "Creating",
            TestSetStatus::Queued => "Queued",
            TestSetStatus::Running => "Running",
            TestSetStatus::Completed => "Completed",
            TestSetStatus::Errored => "Failed",
        }
    }

    /// No further transitions are expected from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TestSetStatus::Completed | TestSetStatus::Errored)
    }
}

impl std::fmt::Display for TestSetStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}", self.label())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct TestSetStatusParseError;

impl FromStr for TestSetStatus {
    type Err = TestSetStatusParseError;
    /// Accepts the wire value, the display label, and the aliases the backend also sends.
    fn from_str(value: &str) -> Result<TestSetStatus, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "completed" => return Ok(TestSetStatus::Completed),
            "errored" => return Ok(TestSetStatus::Errored),
            _ => {}
        }
        TestSetStatus::ALL
            .into_iter()
            .find(|s| s.as_str() == value || s.label().eq_ignore_ascii_case(value))
            .ok_or(TestSetStatusParseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values_match_backend_vocabulary() {
        let done: TestSetStatus = serde_json::from_str("\"done\"").unwrap();
        let failed: TestSetStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(done, TestSetStatus::Completed);
        assert_eq!(failed, TestSetStatus::Errored);
        assert_eq!(
            serde_json::to_string(&TestSetStatus::Queued).unwrap(),
            "\"queued\""
        );
    }

    #[test]
    fn test_only_completed_and_errored_are_terminal() {
        let terminal: Vec<_> = TestSetStatus::ALL
            .into_iter()
            .filter(TestSetStatus::is_terminal)
            .collect();
        assert_eq!(
            terminal,
            vec![TestSetStatus::Completed, TestSetStatus::Errored]
        );
    }

    #[test]
    fn test_from_str_accepts_label() {
        assert_eq!("Failed".parse::<TestSetStatus>(), Ok(TestSetStatus::Errored));
        assert_eq!("done".parse::<TestSetStatus>(), Ok(TestSetStatus::Completed));
    }

    #[test]
    fn test_from_str_agrees_with_serde_aliases() {
        for alias in ["completed", "errored", "Completed", "Failed"] {
            let from_serde: TestSetStatus =
                serde_json::from_str(&format!("\"{alias}\"")).unwrap();
            assert_eq!(alias.parse::<TestSetStatus>(), Ok(from_serde), "{alias}");
        }
        assert!("bogus".parse::<TestSetStatus>().is_err());
    }
}
