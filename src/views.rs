//! Terminal rendering of console results and notifications.

use chrono::{DateTime, Utc};
use colored::*;
use domain::environments;
use domain::error::{DomainErrorKind, Error, InternalErrorKind};
use domain::listing::ListQuery;
use domain::test_sets::{FileCheck, Summary};
use domain::users;
use domain::workspaces::{self, Detail, FailCase};
use domain::Page;

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn page_footer<T>(page: &Page<T>) -> String {
    if page.total == 0 {
        return "No results".to_string();
    }
    if page.page > page.total_pages {
        return format!(
            "Page {} is past the last page ({}); {} items in total",
            page.page, page.total_pages, page.total
        );
    }
    format!(
        "Page {} of {} ({} items)",
        page.page, page.total_pages, page.total
    )
}

pub fn pass_rate(summary: &Summary) -> String {
    match (summary.passed_cases, summary.total_cases) {
        (Some(passed), Some(total)) => format!("{passed}/{total}"),
        (None, Some(total)) => format!("-/{total}"),
        _ => "-".to_string(),
    }
}

pub fn auth_summary(environment: &environments::Model) -> String {
    match environment.auth_type {
        environments::AuthType::None => "None".to_string(),
        environments::AuthType::Basic => format!(
            "Basic ({})",
            environment.username.as_deref().unwrap_or("no username")
        ),
        environments::AuthType::Bearer => format!(
            "Bearer ({})",
            environment.oauth_endpoint.as_deref().unwrap_or("no endpoint")
        ),
    }
}

/// Horizontal bar for a percentage, `width` cells wide.
pub fn bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(width - filled))
}

fn print_footer<T>(page: &Page<T>) {
    println!("{}", page_footer(page).dimmed());
}

pub fn print_user(user: &users::Model) {
    println!("{} {}", "Signed in as".bold(), user.full_name.bright_white());
    println!("  id:    {}", user.id);
    println!("  email: {}", user.email);
    if !user.roles.is_empty() {
        println!("  roles: {}", user.roles.join(", "));
    }
}

pub fn print_environments(page: &Page<environments::Model>) {
    println!(
        "{}",
        format!("{:<6} {:<32} {:<40} {}", "ID", "NAME", "AUTH", "UPDATED").bold()
    );
    for environment in &page.items {
        println!(
            "{:<6} {:<32} {:<40} {}",
            environment.id,
            environment.name,
            auth_summary(environment),
            timestamp(environment.last_updated)
        );
    }
    print_footer(page);
}

pub fn print_environment(environment: &environments::Model) {
    println!("{} ({})", environment.name.bright_white().bold(), environment.id);
    println!("  auth:    {}", auth_summary(environment));
    println!("  created: {}", timestamp(environment.created_at));
    println!("  updated: {}", timestamp(environment.last_updated));
    if environment.headers.is_empty() {
        println!("  headers: none");
    } else {
        println!("  headers:");
        for header in &environment.headers {
            if header.description.is_empty() {
                println!("    {}: {}", header.key, header.value);
            } else {
                println!(
                    "    {}: {}  {}",
                    header.key,
                    header.value,
                    header.description.dimmed()
                );
            }
        }
    }
}

pub fn print_workspaces(page: &Page<workspaces::Model>) {
    println!(
        "{}",
        format!("{:<6} {:<36} {:<12} {}", "ID", "NAME", "ENVIRONMENT", "UPDATED").bold()
    );
    for workspace in &page.items {
        println!(
            "{:<6} {:<36} {:<12} {}",
            workspace.id,
            workspace.name,
            workspace.environment_id.as_deref().unwrap_or("-"),
            timestamp(workspace.last_updated)
        );
    }
    print_footer(page);
}

pub fn print_workspace(workspace: &workspaces::Model) {
    println!("{} ({})", workspace.name.bright_white().bold(), workspace.id);
    println!(
        "  environment: {}",
        workspace.environment_id.as_deref().unwrap_or("-")
    );
}

pub fn print_detail(detail: &Detail) {
    let stats = &detail.stats;
    println!("{} ({})", detail.name.bright_white().bold(), detail.id);
    println!(
        "  environment: {}",
        detail.environment_id.as_deref().unwrap_or("-")
    );
    println!("  updated:     {}", timestamp(detail.last_updated));
    println!(
        "  test sets:   {}  {} passed, {} failed",
        stats.total_test_sets,
        format!("{}%", stats.passed_sets_percentage).green(),
        format!("{}%", stats.failed_sets_percentage).red()
    );
    println!(
        "  test cases:  {}  {} passed, {} failed",
        stats.total_test_cases,
        format!("{}%", stats.passed_cases_percentage).green(),
        format!("{}%", stats.failed_cases_percentage).red()
    );
    if detail.run_disabled {
        println!("  run:         {}", "a run is in progress".yellow());
    } else {
        println!("  run:         {}", "ready".green());
    }
}

pub fn print_fail_cases(cases: &[FailCase]) {
    println!("{}", "Fail cases by category".bold());
    if cases.is_empty() {
        println!("  {}", "No failures in this window".dimmed());
        return;
    }
    for case in cases {
        println!(
            "  {:<20} {} {:>5.1}%  {}",
            case.category,
            bar(case.value, 20),
            case.value,
            case.group.to_string().dimmed()
        );
    }
}

pub fn print_test_sets(page: &Page<Summary>) {
    println!(
        "{}",
        format!(
            "{:<9} {:<32} {:<10} {:<9} {}",
            "ID", "NAME", "STATUS", "PASSED", "LAST RUN"
        )
        .bold()
    );
    for summary in &page.items {
        println!(
            "{:<9} {:<32} {:<10} {:<9} {}",
            summary.id,
            summary.name,
            summary.status.label(),
            pass_rate(summary),
            timestamp(summary.last_run_at)
        );
    }
    print_footer(page);
}

pub fn print_file_checks(checks: &[FileCheck]) {
    for check in checks {
        if check.is_valid() {
            println!("{} {}", "✓".green(), check.filename);
        } else {
            println!(
                "{} {}: {}",
                "✗".red(),
                check.filename,
                check.errors.join(", ").red()
            );
        }
    }
}

/// Flags that reopen a list at the same position.
pub fn location_flags(query: &ListQuery) -> String {
    query
        .to_location_pairs()
        .into_iter()
        .map(|(key, value)| match key.as_str() {
            "filters" => format!("--{key} '{value}'"),
            _ => format!("--{key} {value}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_location(query: &ListQuery) {
    println!("{}", location_flags(query).dimmed());
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_note(message: &str) {
    println!("{} {}", "→".blue(), message);
}

/// Error notification: code and message, plus one line per field for validation errors.
pub fn print_error(err: &Error) {
    eprintln!("{} [{}] {}", "✗".red().bold(), err.code().red(), err);
    if let DomainErrorKind::Internal(InternalErrorKind::Validation(errors)) = &err.error_kind {
        for field_error in errors.iter() {
            eprintln!("    {}: {}", field_error.field.bold(), field_error.message);
        }
    }
}
