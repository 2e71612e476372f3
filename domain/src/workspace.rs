//! Workspaces and their overview: aggregate stats, the fail-case chart and whether a new run
//! may be started.

use crate::api_client::ApiClient;
use crate::error::Error;
use crate::listing::ListQuery;
use crate::mock_data;
use crate::test_set::MockTestSetService;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashboard_auth::credentials::FieldErrors;
use entity::test_set_status::TestSetStatus;
use entity::test_sets::Summary;
use entity::workspaces::{Changes, Detail, Draft, FailCase, Model, Stats};
use entity::{Id, Page};
use log::*;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive date window for the fail-case chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FieldErrors> {
        if start > end {
            let mut errors = FieldErrors::new();
            errors.push("dateRange", "Start date must not be after end date.");
            return Err(errors);
        }
        Ok(Self { start, end })
    }

    /// The 30 days up to and including today.
    pub fn last_30_days() -> Self {
        let end = Utc::now().date_naive();
        Self {
            start: end - chrono::Duration::days(29),
            end,
        }
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        vec![
            (
                "startDate".to_string(),
                self.start.format(DATE_FORMAT).to_string(),
            ),
            ("endDate".to_string(), self.end.format(DATE_FORMAT).to_string()),
        ]
    }
}

#[async_trait]
pub trait WorkspaceService: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<Page<Model>, Error>;

    /// `Ok(None)` when no workspace has this id.
    async fn get(&self, id: &str) -> Result<Option<Model>, Error>;

    async fn create(&self, draft: &Draft) -> Result<Model, Error>;

    async fn update(&self, id: &str, changes: &Changes) -> Result<Model, Error>;

    async fn delete(&self, id: &str) -> Result<(), Error>;

    /// Overview of one workspace. Fails with not-found when the workspace does not exist.
    async fn detail(&self, id: &str) -> Result<Detail, Error>;

    async fn fail_cases(&self, id: &str, range: &DateRange) -> Result<Vec<FailCase>, Error>;
}

fn require_name(name: &str, errors: &mut FieldErrors) {
    if name.trim().is_empty() {
        errors.push("name", "Workspace name is required.");
    }
}

pub fn validate_draft(draft: &Draft) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    require_name(&draft.name, &mut errors);
    errors.into_result()
}

pub fn validate_changes(changes: &Changes) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if let Some(name) = &changes.name {
        require_name(name, &mut errors);
    }
    errors.into_result()
}

/// Wire shape of `/workspaces/:id/summarize`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Summarize {
    testset: Tally,
    testcase: Tally,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Tally {
    total: u64,
    total_pass: Percent,
    total_fail: Percent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Percent {
    percent: f64,
}

impl From<Summarize> for Stats {
    fn from(summary: Summarize) -> Self {
        Stats {
            total_test_sets: summary.testset.total,
            total_test_cases: summary.testcase.total,
            passed_sets_percentage: summary.testset.total_pass.percent,
            failed_sets_percentage: summary.testset.total_fail.percent,
            passed_cases_percentage: summary.testcase.total_pass.percent,
            failed_cases_percentage: summary.testcase.total_fail.percent,
        }
    }
}

fn detail_of(workspace: Model, stats: Stats, fail_cases: Vec<FailCase>, run_disabled: bool) -> Detail {
    Detail {
        id: workspace.id,
        name: workspace.name,
        last_updated: workspace.last_updated,
        environment_id: workspace.environment_id,
        stats,
        fail_cases,
        run_disabled,
    }
}

pub struct RestWorkspaceService {
    api: Arc<ApiClient>,
}

impl RestWorkspaceService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl WorkspaceService for RestWorkspaceService {
    async fn list(&self, query: &ListQuery) -> Result<Page<Model>, Error> {
        self.api.get_page("/workspaces", query).await
    }

    async fn get(&self, id: &str) -> Result<Option<Model>, Error> {
        self.api.get_optional(&format!("/workspaces/{id}")).await
    }

    async fn create(&self, draft: &Draft) -> Result<Model, Error> {
        validate_draft(draft)?;
        let created: Model = self.api.post("/workspaces", draft).await?;
        info!("Created workspace {} ({})", created.name, created.id);
        Ok(created)
    }

    async fn update(&self, id: &str, changes: &Changes) -> Result<Model, Error> {
        validate_changes(changes)?;
        self.api.put(&format!("/workspaces/{id}"), changes).await
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        self.api.delete(&format!("/workspaces/{id}")).await?;
        info!("Deleted workspace {}", id);
        Ok(())
    }

    async fn detail(&self, id: &str) -> Result<Detail, Error> {
        let workspace_path = format!("/workspaces/{id}");
        let summarize_path = format!("/workspaces/{id}/summarize");
        let run_check_path = format!("/workspaces/{id}/check-btn-run-testset");

        let (workspace, summary, run_disabled) = tokio::try_join!(
            self.api.get_optional::<Model>(&workspace_path),
            self.api.get::<Summarize>(&summarize_path, &[]),
            self.api.get::<bool>(&run_check_path, &[]),
        )?;
        let workspace = workspace.ok_or_else(|| Error::not_found(&format!("Workspace {id}")))?;

        // The chart has its own date window and is fetched separately.
        Ok(detail_of(workspace, summary.into(), vec![], run_disabled))
    }

    async fn fail_cases(&self, id: &str, range: &DateRange) -> Result<Vec<FailCase>, Error> {
        self.api
            .get(&format!("/workspaces/{id}/chart"), &range.query_pairs())
            .await
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 10_000.0 / whole as f64).round() / 100.0
}

/// Aggregates test set rows the way the backend's summary does.
pub fn stats_for(test_sets: &[Summary]) -> Stats {
    let total_sets = test_sets.len() as u64;
    let passed_sets = test_sets
        .iter()
        .filter(|t| t.status == TestSetStatus::Completed)
        .count() as u64;
    let failed_sets = test_sets
        .iter()
        .filter(|t| t.status == TestSetStatus::Errored)
        .count() as u64;

    let total_cases: u64 = test_sets.iter().filter_map(|t| t.total_cases).sum();
    let (run_passed, run_total) = test_sets
        .iter()
        .filter_map(|t| Some((t.passed_cases?, t.total_cases?)))
        .fold((0, 0), |(p, n), (passed, total)| (p + passed, n + total));

    Stats {
        total_test_sets: total_sets,
        total_test_cases: total_cases,
        passed_sets_percentage: percentage(passed_sets, total_sets),
        failed_sets_percentage: percentage(failed_sets, total_sets),
        passed_cases_percentage: percentage(run_passed, run_total),
        failed_cases_percentage: percentage(run_total - run_passed, run_total),
    }
}

/// In-memory workspaces seeded from `mock_data`; stats come from the mock test sets.
pub struct MockWorkspaceService {
    records: RwLock<Vec<Model>>,
    test_sets: Arc<MockTestSetService>,
}

impl MockWorkspaceService {
    pub fn new(records: Vec<Model>, test_sets: Arc<MockTestSetService>) -> Self {
        Self {
            records: RwLock::new(records),
            test_sets,
        }
    }

    async fn find(&self, id: &str) -> Result<Model, Error> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found(&format!("Workspace {id}")))
    }
}

#[async_trait]
impl WorkspaceService for MockWorkspaceService {
    async fn list(&self, query: &ListQuery) -> Result<Page<Model>, Error> {
        let records = self.records.read().await;
        let environments = query.filters.values_for_key("environment");
        let matching: Vec<Model> = records
            .iter()
            .filter(|w| {
                environments.is_empty()
                    || w.environment_id
                        .as_deref()
                        .is_some_and(|e| environments.contains(&e))
            })
            .cloned()
            .collect();
        Ok(Page::from_slice(&matching, query.page, query.limit))
    }

    async fn get(&self, id: &str) -> Result<Option<Model>, Error> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|w| w.id == id)
            .cloned())
    }

    async fn create(&self, draft: &Draft) -> Result<Model, Error> {
        validate_draft(draft)?;
        let mut records = self.records.write().await;
        let mut next = records.len() + 1;
        while records.iter().any(|w| w.id == mock_data::padded_id(next)) {
            next += 1;
        }
        let model = Model {
            id: mock_data::padded_id(next),
            name: draft.name.trim().to_string(),
            environment_id: draft.environment_id.clone(),
            last_updated: Some(Utc::now()),
        };
        records.push(model.clone());
        self.test_sets.track_workspace(&model.id).await;
        Ok(model)
    }

    async fn update(&self, id: &str, changes: &Changes) -> Result<Model, Error> {
        validate_changes(changes)?;
        let mut records = self.records.write().await;
        let model = records
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| Error::not_found(&format!("Workspace {id}")))?;
        if let Some(name) = &changes.name {
            model.name = name.trim().to_string();
        }
        if let Some(environment_id) = &changes.environment_id {
            model.environment_id = Some(environment_id.clone());
        }
        model.last_updated = Some(Utc::now());
        Ok(model.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|w| w.id != id);
        if records.len() == before {
            return Err(Error::not_found(&format!("Workspace {id}")));
        }
        self.test_sets.forget_workspace(id).await;
        Ok(())
    }

    async fn detail(&self, id: &str) -> Result<Detail, Error> {
        let workspace = self.find(id).await?;
        let test_sets = self.test_sets.summaries(id).await;
        let run_disabled = test_sets
            .iter()
            .any(|t| matches!(t.status, TestSetStatus::Queued | TestSetStatus::Running));
        Ok(detail_of(
            workspace,
            stats_for(&test_sets),
            mock_data::fail_cases(),
            run_disabled,
        ))
    }

    async fn fail_cases(&self, id: &str, _range: &DateRange) -> Result<Vec<FailCase>, Error> {
        self.find(id).await?;
        Ok(mock_data::fail_cases())
    }
}

/// Ids of the workspaces a mock registry starts with.
pub fn seeded_ids(records: &[Model]) -> Vec<Id> {
    records.iter().map(|w| w.id.clone()).collect()
}
