//! Test sets: CSV uploads of test cases owned by a workspace.
//!
//! Files are checked locally first (size, type, duplicates), then by the backend, and only the
//! files that pass both are sent with the new test set.

use crate::api_client::ApiClient;
use crate::error::{ApiError, DomainErrorKind, Error, InternalErrorKind, INVALID_CSV_FORMAT};
use crate::listing::ListQuery;
use crate::mock_data::{self, SeededTestSet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashboard_auth::credentials::FieldErrors;
use entity::rai_dimensions::RaiDimension;
use entity::test_set_status::TestSetStatus;
use entity::test_sets::{File, FileCheck, Model, Summary};
use entity::{Id, Page};
use log::*;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Largest file accepted for upload.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

const CSV_CONTENT_TYPES: [&str; 2] = ["text/csv", "application/vnd.ms-excel"];

pub const FILE_TOO_LARGE: &str = "File size must be less than 1MB";
pub const NOT_CSV: &str = "Only CSV files are allowed";
pub const DUPLICATE_FILE: &str = "File already exists";

/// A file picked for upload, held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.map(str::to_string),
            bytes,
        }
    }

    /// Reads a file from disk; `.csv` files are typed `text/csv`, anything else is left untyped.
    pub async fn read(path: &Path) -> Result<Self, Error> {
        let bytes = tokio::fs::read(path).await.map_err(|err| Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(format!(
                "Could not read {}",
                path.display()
            ))),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = has_csv_extension(&name).then_some("text/csv");
        Ok(Self::new(name, content_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_csv(&self) -> bool {
        has_csv_extension(&self.name)
            || self
                .content_type
                .as_deref()
                .is_some_and(|t| CSV_CONTENT_TYPES.contains(&t))
    }

    fn part(&self) -> Result<Part, Error> {
        let part = Part::bytes(self.bytes.clone()).file_name(self.name.clone());
        Ok(part.mime_str(self.content_type.as_deref().unwrap_or("text/csv"))?)
    }
}

fn has_csv_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Client-side checks, one result per file in input order. Each file gets at most one error:
/// size is checked first, then type, then whether an earlier accepted file has the same name and
/// size.
pub fn check_local_files(files: &[UploadFile]) -> Vec<FileCheck> {
    let mut seen: HashSet<(&str, u64)> = HashSet::new();
    files
        .iter()
        .map(|file| {
            let error = if file.size() > MAX_FILE_SIZE {
                Some(FILE_TOO_LARGE)
            } else if !file.is_csv() {
                Some(NOT_CSV)
            } else if !seen.insert((file.name.as_str(), file.size())) {
                Some(DUPLICATE_FILE)
            } else {
                None
            };
            FileCheck {
                filename: file.name.clone(),
                errors: error.map(str::to_string).into_iter().collect(),
            }
        })
        .collect()
}

/// Merges the remote pass into the local one, keeping every error from both.
///
/// `remote` covers only the files the local pass accepted, in the same order. Each remote
/// result is matched to the next accepted file of that name, so files sharing a name each get
/// their own result.
pub fn merge_checks(mut local: Vec<FileCheck>, remote: Vec<FileCheck>) -> Vec<FileCheck> {
    let mut cursor = 0;
    for check in remote {
        let next = local[cursor..]
            .iter()
            .position(|l| l.is_valid() && l.filename == check.filename);
        if let Some(offset) = next {
            let at = cursor + offset;
            local[at].errors.extend(check.errors);
            cursor = at + 1;
        }
    }
    local
}

/// A test set about to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub description: String,
    pub files: Vec<UploadFile>,
}

pub fn validate_draft(draft: &Draft) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if draft.name.trim().is_empty() {
        errors.push("name", "Test Set name is required");
    }
    if draft.description.trim().is_empty() {
        errors.push("description", "Description is required");
    }
    if draft.files.is_empty() {
        errors.push("files", "At least one CSV file is required");
    }
    for check in check_local_files(&draft.files) {
        if !check.is_valid() {
            errors.push(
                "files",
                format!("{}: {}", check.filename, check.errors.join(", ")),
            );
        }
    }
    errors.into_result()
}

#[async_trait]
pub trait TestSetService: Send + Sync {
    async fn list(&self, workspace_id: &str, query: &ListQuery) -> Result<Page<Summary>, Error>;

    /// Asks the backend to validate file contents, one result per file.
    async fn check_files(
        &self,
        workspace_id: &str,
        files: &[UploadFile],
    ) -> Result<Vec<FileCheck>, Error>;

    async fn create(&self, workspace_id: &str, draft: &Draft) -> Result<Model, Error>;

    async fn delete(&self, workspace_id: &str, test_set_id: &str) -> Result<(), Error>;
}

/// One list row as the backend sends it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Row {
    id: Id,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    status: TestSetStatus,
    #[serde(default)]
    testcase: Option<CaseCounts>,
    #[serde(default)]
    testset_summarizes: Vec<RunSummary>,
}

#[derive(Debug, Deserialize)]
struct CaseCounts {
    #[serde(default)]
    pass: Option<Raw>,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Raw {
    raw: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<Row> for Summary {
    fn from(row: Row) -> Self {
        let (passed_cases, total_cases) = match row.testcase {
            Some(counts) => (counts.pass.map(|p| p.raw), counts.total),
            None => (None, None),
        };
        Summary {
            id: row.id,
            name: row.name,
            description: row.description,
            status: row.status,
            passed_cases,
            total_cases,
            last_run_at: row.testset_summarizes.first().and_then(|s| s.created_at),
        }
    }
}

pub struct RestTestSetService {
    api: Arc<ApiClient>,
}

impl RestTestSetService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

fn files_form(mut form: Form, files: &[UploadFile]) -> Result<Form, Error> {
    for file in files {
        form = form.part("files", file.part()?);
    }
    Ok(form)
}

#[async_trait]
impl TestSetService for RestTestSetService {
    async fn list(&self, workspace_id: &str, query: &ListQuery) -> Result<Page<Summary>, Error> {
        let rows: Page<Row> = self
            .api
            .get_page(&format!("/workspaces/{workspace_id}/test-sets"), query)
            .await?;
        Ok(rows.map(Summary::from))
    }

    async fn check_files(
        &self,
        workspace_id: &str,
        files: &[UploadFile],
    ) -> Result<Vec<FileCheck>, Error> {
        if files.is_empty() {
            return Ok(vec![]);
        }
        let form = files_form(Form::new(), files)?;
        self.api
            .post_multipart(
                &format!("/workspaces/{workspace_id}/test-sets/check-file-csv"),
                form,
            )
            .await
    }

    async fn create(&self, workspace_id: &str, draft: &Draft) -> Result<Model, Error> {
        validate_draft(draft)?;
        let form = Form::new()
            .text("workspaceId", workspace_id.to_string())
            .text("name", draft.name.trim().to_string())
            .text("description", draft.description.trim().to_string());
        let form = files_form(form, &draft.files)?;

        let created: Model = self
            .api
            .post_multipart(&format!("/workspaces/{workspace_id}/test-sets"), form)
            .await?;
        info!(
            "Created test set {} ({}) in workspace {}",
            created.name, created.id, workspace_id
        );
        Ok(created)
    }

    async fn delete(&self, workspace_id: &str, test_set_id: &str) -> Result<(), Error> {
        self.api
            .delete(&format!("/workspaces/{workspace_id}/test-sets/{test_set_id}"))
            .await?;
        info!("Deleted test set {} from workspace {}", test_set_id, workspace_id);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Stored {
    summary: Summary,
    /// Sets created at runtime have not been classified yet.
    dimension: Option<RaiDimension>,
}

impl From<SeededTestSet> for Stored {
    fn from(seeded: SeededTestSet) -> Self {
        Stored {
            summary: seeded.summary,
            dimension: Some(seeded.dimension),
        }
    }
}

/// In-memory test sets per workspace, seeded from `mock_data`.
pub struct MockTestSetService {
    seed: u64,
    sets: RwLock<HashMap<Id, Vec<Stored>>>,
    next_id: AtomicUsize,
}

impl MockTestSetService {
    pub fn new(seed: u64, workspace_ids: &[Id]) -> Self {
        let sets = workspace_ids
            .iter()
            .map(|id| {
                let stored = mock_data::test_sets(seed, id)
                    .into_iter()
                    .map(Stored::from)
                    .collect();
                (id.clone(), stored)
            })
            .collect();
        Self {
            seed,
            sets: RwLock::new(sets),
            next_id: AtomicUsize::new(mock_data::TEST_SETS_PER_WORKSPACE + 1),
        }
    }

    /// Starts an empty list for a newly created workspace.
    pub async fn track_workspace(&self, workspace_id: &str) {
        self.sets
            .write()
            .await
            .entry(workspace_id.to_string())
            .or_default();
    }

    pub async fn forget_workspace(&self, workspace_id: &str) {
        self.sets.write().await.remove(workspace_id);
    }

    pub async fn summaries(&self, workspace_id: &str) -> Vec<Summary> {
        self.sets
            .read()
            .await
            .get(workspace_id)
            .map(|sets| sets.iter().map(|s| s.summary.clone()).collect())
            .unwrap_or_default()
    }

    fn check_contents(file: &UploadFile) -> Vec<String> {
        match std::str::from_utf8(&file.bytes) {
            Err(_) => vec!["File must be UTF-8 encoded text".to_string()],
            Ok(text) if text.trim().is_empty() => vec!["File is empty".to_string()],
            Ok(_) => vec![],
        }
    }

    fn missing(workspace_id: &str) -> Error {
        Error::not_found(&format!("Workspace {workspace_id}"))
    }
}

#[async_trait]
impl TestSetService for MockTestSetService {
    async fn list(&self, workspace_id: &str, query: &ListQuery) -> Result<Page<Summary>, Error> {
        let sets = self.sets.read().await;
        let stored = sets
            .get(workspace_id)
            .ok_or_else(|| Self::missing(workspace_id))?;

        let statuses: Option<Vec<TestSetStatus>> = query.filters.selected("status");
        let dimensions: Option<Vec<RaiDimension>> = query.filters.selected("raiDimensions");

        let matching: Vec<Summary> = stored
            .iter()
            .filter(|s| {
                statuses
                    .as_ref()
                    .map_or(true, |wanted| wanted.contains(&s.summary.status))
            })
            .filter(|s| {
                dimensions.as_ref().map_or(true, |wanted| {
                    s.dimension.is_some_and(|d| wanted.contains(&d))
                })
            })
            .map(|s| s.summary.clone())
            .collect();
        Ok(Page::from_slice(&matching, query.page, query.limit))
    }

    async fn check_files(
        &self,
        workspace_id: &str,
        files: &[UploadFile],
    ) -> Result<Vec<FileCheck>, Error> {
        if !self.sets.read().await.contains_key(workspace_id) {
            return Err(Self::missing(workspace_id));
        }
        Ok(files
            .iter()
            .map(|file| FileCheck {
                filename: file.name.clone(),
                errors: Self::check_contents(file),
            })
            .collect())
    }

    async fn create(&self, workspace_id: &str, draft: &Draft) -> Result<Model, Error> {
        validate_draft(draft)?;

        if let Some(bad) = draft
            .files
            .iter()
            .find(|f| !Self::check_contents(f).is_empty())
        {
            return Err(ApiError {
                status: 400,
                code: INVALID_CSV_FORMAT.to_string(),
                message: format!("Invalid CSV format: {}", bad.name),
            }
            .into());
        }

        let mut sets = self.sets.write().await;
        let stored = sets
            .get_mut(workspace_id)
            .ok_or_else(|| Self::missing(workspace_id))?;

        let now = Utc::now();
        let id = format!("TC-{:04}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let files = draft
            .files
            .iter()
            .enumerate()
            .map(|(i, f)| File {
                id: format!("{id}-F{}", i + 1),
                name: f.name.clone(),
                size: f.size(),
                content_type: f.content_type.clone().unwrap_or_else(|| "text/csv".to_string()),
                uploaded_at: Some(now),
            })
            .collect();
        let model = Model {
            id: id.clone(),
            workspace_id: Some(workspace_id.to_string()),
            name: draft.name.trim().to_string(),
            description: draft.description.trim().to_string(),
            status: TestSetStatus::Created,
            files,
            created_at: Some(now),
            updated_at: Some(now),
        };

        stored.insert(
            0,
            Stored {
                summary: Summary {
                    id,
                    name: model.name.clone(),
                    description: model.description.clone(),
                    status: model.status,
                    passed_cases: None,
                    total_cases: None,
                    last_run_at: None,
                },
                dimension: None,
            },
        );
        debug!(
            "Mock test set {} created (seed {}) in workspace {}",
            model.id, self.seed, workspace_id
        );
        Ok(model)
    }

    async fn delete(&self, workspace_id: &str, test_set_id: &str) -> Result<(), Error> {
        let mut sets = self.sets.write().await;
        let stored = sets
            .get_mut(workspace_id)
            .ok_or_else(|| Self::missing(workspace_id))?;
        let before = stored.len();
        stored.retain(|s| s.summary.id != test_set_id);
        if stored.len() == before {
            return Err(Error::not_found(&format!("Test set {test_set_id}")));
        }
        Ok(())
    }
}
