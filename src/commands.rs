//! Runs one console command against the configured services.

use crate::cli::{
    Command, EnvironmentArgs, EnvironmentCommand, PageArgs, SignInArgs, TestSetCommand,
    WorkspaceCommand,
};
use crate::views;
use chrono::{Duration, Utc};
use dashboard_auth::credentials::{Credentials, FieldErrors};
use dashboard_auth::gateway::IdentityProvider;
use dashboard_auth::sso::Callback;
use domain::environments::Draft as EnvironmentDraft;
use domain::error::{DomainErrorKind, Error, InternalErrorKind};
use domain::listing::{FilterMap, ListQuery, ListState};
use domain::services::Services;
use domain::test_set::{self, UploadFile};
use domain::users;
use domain::workspace::DateRange;
use domain::workspaces::{Changes, Draft as WorkspaceDraft};
use domain::Page;
use log::*;
use secrecy::ExposeSecret;
use std::future::Future;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    services: &Services,
    sign_in_args: &SignInArgs,
    command: Command,
) -> Result<(), Error> {
    let user = match command {
        Command::SsoLogin => sso_login(services).await?,
        _ => sign_in(services, sign_in_args).await?,
    };

    let result = match command {
        Command::Whoami | Command::SsoLogin => {
            views::print_user(&user);
            Ok(())
        }
        Command::Environments(command) => environments(services, command).await,
        Command::Workspaces(command) => workspaces(services, command).await,
        Command::TestSets(command) => test_sets(services, command).await,
    };
    services.session.sign_out().await;
    result
}

async fn sign_in(services: &Services, args: &SignInArgs) -> Result<users::Model, Error> {
    let user = match &args.sso_token {
        Some(token) => {
            services
                .session
                .sign_in_with_identity_provider(IdentityProvider::AzureAd, Some(token.as_str()))
                .await?
        }
        None => {
            let credentials = Credentials::new(
                args.username.clone().unwrap_or_default(),
                args.password.clone().unwrap_or_default(),
            );
            services.session.sign_in_with_credentials(&credentials).await?
        }
    };
    debug!("Signed in as {}", user.id);
    Ok(user)
}

async fn sso_login(services: &Services) -> Result<users::Model, Error> {
    let provider = services
        .sso
        .as_ref()
        .ok_or_else(|| Error::config("Azure AD sign-in is not configured"))?;

    let request = provider.authorization_request();
    views::print_note("Open this URL in a browser and sign in:");
    println!("{}", request.url);
    views::print_note("Then paste the URL you were redirected to:");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|err| Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "Could not read the redirect URL".to_string(),
            )),
        })?;

    let callback = Callback::from_redirect_url(&line)?;
    let token = provider
        .exchange_code(&callback.code, &callback.state)
        .await?;
    let user = services
        .session
        .sign_in_with_identity_provider(IdentityProvider::AzureAd, Some(token.expose_secret()))
        .await?;
    Ok(user)
}

fn validation(field: &'static str, message: &str) -> Error {
    let mut errors = FieldErrors::new();
    errors.push(field, message);
    Error::validation(errors)
}

/// Builds the list query from location-state flags, with `extra` category selections
/// layered over `--filters`.
fn list_query(
    services: &Services,
    page: &PageArgs,
    extra: &[(&str, &[String])],
) -> Result<ListQuery, Error> {
    let mut filters = match &page.filters {
        Some(json) => FilterMap::from_json(json)
            .map_err(|_| validation("filters", "Filters must be a JSON object of string lists."))?,
        None => FilterMap::new(),
    };
    for (category, values) in extra {
        if !values.is_empty() {
            filters.set(category, values.to_vec());
        }
    }
    Ok(ListQuery::new(page.page, page.limit.unwrap_or(services.page_size)).with_filters(filters))
}

fn environment_draft(args: EnvironmentArgs) -> EnvironmentDraft {
    EnvironmentDraft {
        headers: args.headers,
        username: args.basic_username,
        password: args.basic_password,
        oauth_endpoint: args.oauth_endpoint,
        client_id: args.client_id,
        client_secret: args.client_secret,
        ..EnvironmentDraft::new(&args.name, args.auth_type)
    }
}

/// Fetches the page `query` asks for. A page past the end is clamped to the last one and
/// fetched again. Returns the page with the query that produced it.
async fn fetch_page<T, F, Fut>(query: ListQuery, fetch: F) -> Result<(Page<T>, ListQuery), Error>
where
    F: Fn(ListQuery) -> Fut,
    Fut: Future<Output = Result<Page<T>, Error>>,
{
    let mut state = ListState::restore(query);
    let page = fetch(state.query()).await?;
    state.apply(&page);

    let requested = state.page();
    state.go_to(requested);
    if state.page() == requested {
        return Ok((page, state.query()));
    }
    views::print_note(&format!(
        "Page {} is past the last page, showing page {}",
        requested,
        state.page()
    ));
    let query = state.query();
    Ok((fetch(query.clone()).await?, query))
}

/// Notes when deleting moved the view back a page, and returns the query to show next.
fn after_delete(mut state: ListState) -> ListQuery {
    let from = state.page();
    if state.after_delete(1) {
        views::print_note(&format!(
            "Page {} is now empty, showing page {}",
            from,
            state.page()
        ));
    }
    state.query()
}

async fn environments(services: &Services, command: EnvironmentCommand) -> Result<(), Error> {
    let service = &services.environments;
    match command {
        EnvironmentCommand::List { page, auth_types } => {
            let query = list_query(services, &page, &[("Auth Type", auth_types.as_slice())])?;
            let (page, query) = fetch_page(query, |q| async move { service.list(&q).await }).await?;
            views::print_environments(&page);
            views::print_location(&query);
        }
        EnvironmentCommand::Show { id } => match service.get(&id).await? {
            Some(environment) => views::print_environment(&environment),
            None => return Err(Error::not_found(&format!("Environment {id}"))),
        },
        EnvironmentCommand::Create(args) => {
            let created = service.create(&environment_draft(args)).await?;
            views::print_success(&format!("Created environment {}", created.id));
            views::print_environment(&created);
        }
        EnvironmentCommand::Update { id, args } => {
            let updated = service.update(&id, &environment_draft(args)).await?;
            views::print_success(&format!("Updated environment {}", updated.id));
            views::print_environment(&updated);
        }
        EnvironmentCommand::Delete { id, page } => {
            let mut state = ListState::restore(list_query(services, &page, &[])?);
            state.apply(&service.list(&state.query()).await?);
            service.delete(&id).await?;
            views::print_success(&format!("Deleted environment {id}"));
            views::print_environments(&service.list(&after_delete(state)).await?);
        }
    }
    Ok(())
}

fn chart_window(
    from: Option<chrono::NaiveDate>,
    to: Option<chrono::NaiveDate>,
) -> Result<DateRange, Error> {
    match (from, to) {
        (None, None) => Ok(DateRange::last_30_days()),
        (from, to) => {
            let end = to.unwrap_or_else(|| Utc::now().date_naive());
            let start = from.unwrap_or(end - Duration::days(29));
            Ok(DateRange::new(start, end)?)
        }
    }
}

async fn workspaces(services: &Services, command: WorkspaceCommand) -> Result<(), Error> {
    let service = &services.workspaces;
    match command {
        WorkspaceCommand::List { page, environments } => {
            let query = list_query(services, &page, &[("Environment", environments.as_slice())])?;
            let (page, query) = fetch_page(query, |q| async move { service.list(&q).await }).await?;
            views::print_workspaces(&page);
            views::print_location(&query);
        }
        WorkspaceCommand::Show { id, from, to } => {
            let range = chart_window(from, to)?;
            let (detail, fail_cases) =
                tokio::try_join!(service.detail(&id), service.fail_cases(&id, &range))?;
            views::print_detail(&detail);
            println!();
            views::print_fail_cases(&fail_cases);
        }
        WorkspaceCommand::Create { name, environment } => {
            let created = service
                .create(&WorkspaceDraft {
                    name,
                    environment_id: environment,
                })
                .await?;
            views::print_success(&format!("Created workspace {}", created.id));
            views::print_workspace(&created);
        }
        WorkspaceCommand::Update {
            id,
            name,
            environment,
        } => {
            let changes = Changes {
                name,
                environment_id: environment,
            };
            if changes.is_empty() {
                return Err(validation("changes", "Nothing to update."));
            }
            let updated = service.update(&id, &changes).await?;
            views::print_success(&format!("Updated workspace {}", updated.id));
            views::print_workspace(&updated);
        }
        WorkspaceCommand::Delete { id, page } => {
            let mut state = ListState::restore(list_query(services, &page, &[])?);
            state.apply(&service.list(&state.query()).await?);
            service.delete(&id).await?;
            views::print_success(&format!("Deleted workspace {id}"));
            views::print_workspaces(&service.list(&after_delete(state)).await?);
        }
    }
    Ok(())
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<UploadFile>, Error> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(UploadFile::read(path).await?);
    }
    Ok(files)
}

/// Local checks first; only files that pass them are sent to the backend for a content check.
async fn check_files(
    services: &Services,
    workspace: &str,
    files: &[UploadFile],
) -> Result<Vec<domain::test_sets::FileCheck>, Error> {
    let local = test_set::check_local_files(files);
    let accepted: Vec<UploadFile> = files
        .iter()
        .zip(&local)
        .filter(|(_, check)| check.is_valid())
        .map(|(file, _)| file.clone())
        .collect();
    let remote = if accepted.is_empty() {
        vec![]
    } else {
        services.test_sets.check_files(workspace, &accepted).await?
    };
    Ok(test_set::merge_checks(local, remote))
}

async fn test_sets(services: &Services, command: TestSetCommand) -> Result<(), Error> {
    let service = &services.test_sets;
    match command {
        TestSetCommand::List {
            workspace,
            page,
            statuses,
            dimensions,
        } => {
            let query = list_query(
                services,
                &page,
                &[
                    ("Status", statuses.as_slice()),
                    ("RAI Dimensions", dimensions.as_slice()),
                ],
            )?;
            let workspace = workspace.as_str();
            let (page, query) =
                fetch_page(query, |q| async move { service.list(workspace, &q).await }).await?;
            views::print_test_sets(&page);
            views::print_location(&query);
        }
        TestSetCommand::Check { workspace, files } => {
            let files = read_files(&files).await?;
            views::print_file_checks(&check_files(services, &workspace, &files).await?);
        }
        TestSetCommand::Upload {
            workspace,
            name,
            description,
            files,
        } => {
            let files = read_files(&files).await?;
            let checks = check_files(services, &workspace, &files).await?;
            views::print_file_checks(&checks);

            let valid: Vec<UploadFile> = files
                .into_iter()
                .zip(&checks)
                .filter(|(_, check)| check.is_valid())
                .map(|(file, _)| file)
                .collect();
            if valid.is_empty() {
                return Err(validation("files", "No valid CSV files to upload."));
            }
            let skipped = checks.len() - valid.len();

            let created = service
                .create(
                    &workspace,
                    &test_set::Draft {
                        name,
                        description,
                        files: valid,
                    },
                )
                .await?;
            views::print_success(&format!(
                "Created test set {} with {} file(s)",
                created.id,
                created.files.len()
            ));
            if skipped > 0 {
                views::print_note(&format!("{skipped} file(s) were skipped"));
            }
        }
        TestSetCommand::Delete {
            workspace,
            id,
            page,
        } => {
            let mut state = ListState::restore(list_query(services, &page, &[])?);
            state.apply(&service.list(&workspace, &state.query()).await?);
            service.delete(&workspace, &id).await?;
            views::print_success(&format!("Deleted test set {id}"));
            views::print_test_sets(&service.list(&workspace, &after_delete(state)).await?);
        }
    }
    Ok(())
}
