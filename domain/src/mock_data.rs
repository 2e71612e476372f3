//! Seeded fixture data behind the mock services.
//!
//! Everything here is a pure function of the seed, so a given `MOCK_SEED` always produces the
//! same environments, workspaces and test sets.

use chrono::{DateTime, Duration, TimeZone, Utc};
use entity::environments::{self, AuthType, Header};
use entity::rai_dimensions::RaiDimension;
use entity::risk_group::RiskGroup;
use entity::test_set_status::TestSetStatus;
use entity::test_sets;
use entity::workspaces::{self, FailCase};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const ENVIRONMENT_COUNT: usize = 20;
pub const WORKSPACE_COUNT: usize = 100;
pub const TEST_SETS_PER_WORKSPACE: usize = 12;

const ENVIRONMENT_NAMES: [&str; 10] = [
    "Production API",
    "Staging API",
    "Development API",
    "QA Sandbox",
    "Partner Gateway",
    "Chatbot Backend",
    "Search Service",
    "Recommendation Engine",
    "Payments API",
    "Internal Tools",
];

const WORKSPACE_SUBJECTS: [&str; 10] = [
    "Login API",
    "Chat Assistant",
    "Search Ranking",
    "Fraud Detection",
    "Customer Support Bot",
    "Loan Approval",
    "Resume Screening",
    "Content Moderation",
    "Medical Triage",
    "Translation Service",
];

const WORKSPACE_ACTIVITIES: [&str; 5] = [
    "Testing",
    "Audit",
    "Regression",
    "Safety Review",
    "Evaluation",
];

const TEST_SETS: [(&str, RaiDimension); TEST_SETS_PER_WORKSPACE] = [
    ("Prompt Injection Robustness", RaiDimension::SecurityAndSafety),
    ("Jailbreak Attempts", RaiDimension::SecurityAndSafety),
    ("PII Leakage", RaiDimension::DataAndPrivacy),
    ("Data Retention Questions", RaiDimension::DataAndPrivacy),
    ("Hallucination Check", RaiDimension::Reliability),
    ("Consistency Under Paraphrase", RaiDimension::Reliability),
    ("Refusal Calibration", RaiDimension::Reliability),
    ("Gender Bias Probe", RaiDimension::FairnessAndBias),
    ("Age Bias Probe", RaiDimension::FairnessAndBias),
    ("Toxicity Screening", RaiDimension::FairnessAndBias),
    ("Energy Footprint", RaiDimension::Sustainability),
    ("Token Efficiency", RaiDimension::Sustainability),
];

/// Instant all fixture timestamps are measured back from.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Zero-padded three digit id, as the mock backend issues them.
pub fn padded_id(n: usize) -> String {
    format!("{n:03}")
}

/// Rng for data that belongs to one parent record.
pub fn rng_for(seed: u64, key: &str) -> StdRng {
    // FNV-1a keeps the derivation stable across platforms and releases.
    let hash = key.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
    });
    StdRng::seed_from_u64(seed ^ hash)
}

pub fn environments(seed: u64) -> Vec<environments::Model> {
    let mut rng = rng_for(seed, "environments");
    (0..ENVIRONMENT_COUNT)
        .map(|i| {
            let name = if i < ENVIRONMENT_NAMES.len() {
                ENVIRONMENT_NAMES[i].to_string()
            } else {
                format!("{} (EU)", ENVIRONMENT_NAMES[i % ENVIRONMENT_NAMES.len()])
            };
            let auth_type = [AuthType::None, AuthType::Basic, AuthType::Bearer][i % 3];
            let updated = reference_time() - Duration::days(rng.gen_range(0..60));
            let mut headers = vec![Header::new(
                "Content-Type",
                "application/json",
                "Request body format",
            )];
            if rng.gen_bool(0.5) {
                headers.push(Header::new(
                    "X-Request-Source",
                    "rai-test-runner",
                    "Identifies test traffic",
                ));
            }
            let slug = name.to_lowercase().replace([' ', '(', ')'], "");

            environments::Model {
                id: padded_id(i + 1),
                name,
                auth_type,
                headers,
                last_updated: Some(updated),
                created_at: Some(updated - Duration::days(rng.gen_range(1..120))),
                username: (auth_type == AuthType::Basic).then(|| "svc-rai".to_string()),
                password: (auth_type == AuthType::Basic).then(|| "changeme".to_string()),
                oauth_endpoint: (auth_type == AuthType::Bearer)
                    .then(|| format!("https://auth.{slug}.example.com/oauth/token")),
                client_id: (auth_type == AuthType::Bearer).then(|| format!("{slug}-client")),
                client_secret: (auth_type == AuthType::Bearer).then(|| "changeme".to_string()),
            }
        })
        .collect()
}

pub fn workspaces(seed: u64, environment_ids: &[String]) -> Vec<workspaces::Model> {
    let mut rng = rng_for(seed, "workspaces");
    let names_len = WORKSPACE_SUBJECTS.len() * WORKSPACE_ACTIVITIES.len();
    (0..WORKSPACE_COUNT)
        .map(|i| {
            let n = i % names_len;
            let name = format!(
                "{} {}",
                WORKSPACE_SUBJECTS[n / WORKSPACE_ACTIVITIES.len()],
                WORKSPACE_ACTIVITIES[n % WORKSPACE_ACTIVITIES.len()]
            );
            let environment_id = if environment_ids.is_empty() || rng.gen_bool(0.1) {
                None
            } else {
                Some(environment_ids[rng.gen_range(0..environment_ids.len())].clone())
            };
            workspaces::Model {
                id: padded_id(i + 1),
                name,
                environment_id,
                last_updated: Some(reference_time() - Duration::hours(rng.gen_range(0..24 * 90))),
            }
        })
        .collect()
}

/// A generated test set and the RAI dimension it probes.
#[derive(Debug, Clone)]
pub struct SeededTestSet {
    pub summary: test_sets::Summary,
    pub dimension: RaiDimension,
}

pub fn test_sets(seed: u64, workspace_id: &str) -> Vec<SeededTestSet> {
    let mut rng = rng_for(seed, workspace_id);
    TEST_SETS
        .iter()
        .enumerate()
        .map(|(i, (name, dimension))| {
            let status = TestSetStatus::ALL[rng.gen_range(0..TestSetStatus::ALL.len())];
            let total: u64 = rng.gen_range(20..=200);
            let (passed_cases, total_cases) = match status {
                TestSetStatus::Completed => (Some(rng.gen_range(0..=total)), Some(total)),
                TestSetStatus::Errored => (Some(0), Some(total)),
                _ => (None, Some(total)),
            };
            let last_run_at = matches!(
                status,
                TestSetStatus::Running | TestSetStatus::Completed | TestSetStatus::Errored
            )
            .then(|| reference_time() - Duration::minutes(rng.gen_range(5..60 * 24 * 30)));

            SeededTestSet {
                summary: test_sets::Summary {
                    id: format!("TC-{:04}", i + 1),
                    name: name.to_string(),
                    description: format!("{} checks for {}", dimension.label(), name),
                    status,
                    passed_cases,
                    total_cases,
                    last_run_at,
                },
                dimension: *dimension,
            }
        })
        .collect()
}

/// The fail-case breakdown shown on every mock workspace.
pub fn fail_cases() -> Vec<FailCase> {
    [
        ("Data & Privacy", 80.0, RiskGroup::High),
        ("Security & Safety", 35.0, RiskGroup::High),
        ("Reliability", 54.0, RiskGroup::Medium),
        ("Bias & Fairness", 20.0, RiskGroup::Medium),
        ("Sustainability", 10.0, RiskGroup::Low),
    ]
    .into_iter()
    .map(|(category, value, group)| FailCase {
        category: category.to_string(),
        value,
        group,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_data() {
        let a = environments(42);
        let b = environments(42);
        assert_eq!(a, b);
        assert_eq!(a.len(), ENVIRONMENT_COUNT);
        assert_eq!(a[0].id, "001");
    }

    #[test]
    fn test_workspaces_reference_seeded_environments() {
        let env_ids: Vec<String> = environments(7).into_iter().map(|e| e.id).collect();
        let workspaces = workspaces(7, &env_ids);

        assert_eq!(workspaces.len(), WORKSPACE_COUNT);
        assert_eq!(workspaces[0].name, "Login API Testing");
        assert_eq!(workspaces[50].name, workspaces[0].name);
        assert!(workspaces
            .iter()
            .filter_map(|w| w.environment_id.as_ref())
            .all(|id| env_ids.contains(id)));
    }

    #[test]
    fn test_test_sets_differ_per_workspace() {
        let a = test_sets(42, "001");
        let b = test_sets(42, "002");
        assert_eq!(a.len(), TEST_SETS_PER_WORKSPACE);
        let counts_a: Vec<_> = a.iter().map(|t| t.summary.total_cases).collect();
        let counts_b: Vec<_> = b.iter().map(|t| t.summary.total_cases).collect();
        assert_ne!(counts_a, counts_b);
    }

    #[test]
    fn test_completed_sets_have_consistent_counts() {
        for set in test_sets(42, "003") {
            if let (Some(passed), Some(total)) = (set.summary.passed_cases, set.summary.total_cases)
            {
                assert!(passed <= total);
            }
        }
    }
}
