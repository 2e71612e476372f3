//! Command line surface of the console.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use domain::environments::{AuthType, Header};
use service::config::Config;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rai-dashboard", version, about = "Console for the RAI test dashboard")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(flatten)]
    pub sign_in: SignInArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct SignInArgs {
    /// Username for credential sign-in
    #[arg(long, env = "RAI_USERNAME")]
    pub username: Option<String>,

    /// Password for credential sign-in
    #[arg(long, env = "RAI_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Azure AD access token; takes precedence over username and password
    #[arg(long, env = "RAI_SSO_TOKEN", hide_env_values = true)]
    pub sso_token: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the signed-in user
    Whoami,
    /// Sign in through Azure AD: open the printed URL, then paste the redirect URL back
    SsoLogin,
    /// Manage environments
    #[command(subcommand)]
    Environments(EnvironmentCommand),
    /// Manage workspaces
    #[command(subcommand)]
    Workspaces(WorkspaceCommand),
    /// Manage the test sets of a workspace
    #[command(subcommand)]
    TestSets(TestSetCommand),
}

/// Position in a list view, as kept in its location state.
#[derive(Debug, Clone, Args)]
pub struct PageArgs {
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Rows per page [default: PAGE_SIZE]
    #[arg(long)]
    pub limit: Option<u32>,

    /// Filters as JSON, e.g. '{"Status":["failed"]}'
    #[arg(long)]
    pub filters: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum EnvironmentCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        /// Only environments using this auth type (none, basic, bearer)
        #[arg(long = "auth-type")]
        auth_types: Vec<String>,
    },
    Show {
        id: String,
    },
    Create(EnvironmentArgs),
    Update {
        id: String,
        #[command(flatten)]
        args: EnvironmentArgs,
    },
    Delete {
        id: String,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct EnvironmentArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "none", value_parser = parse_auth_type)]
    pub auth_type: AuthType,

    /// Request header as KEY=VALUE; repeat for more
    #[arg(long = "header", value_parser = parse_header)]
    pub headers: Vec<Header>,

    #[arg(long)]
    pub basic_username: Option<String>,

    #[arg(long)]
    pub basic_password: Option<String>,

    #[arg(long)]
    pub oauth_endpoint: Option<String>,

    #[arg(long)]
    pub client_id: Option<String>,

    #[arg(long)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum WorkspaceCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        /// Only workspaces bound to this environment id
        #[arg(long = "environment")]
        environments: Vec<String>,
    },
    /// Overview: stats, run state and the fail-case chart
    Show {
        id: String,
        /// First day of the chart window [default: 29 days before --to]
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day of the chart window [default: today]
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        environment: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        environment: Option<String>,
    },
    Delete {
        id: String,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum TestSetCommand {
    List {
        workspace: String,
        #[command(flatten)]
        page: PageArgs,
        /// Only test sets in this status (e.g. done, failed)
        #[arg(long = "status")]
        statuses: Vec<String>,
        /// Only test sets probing this RAI dimension (e.g. reliability)
        #[arg(long = "dimension")]
        dimensions: Vec<String>,
    },
    /// Validate CSV files without uploading them
    Check {
        workspace: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Create a test set from the files that pass validation
    Upload {
        workspace: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    Delete {
        workspace: String,
        id: String,
        #[command(flatten)]
        page: PageArgs,
    },
}

fn parse_auth_type(value: &str) -> Result<AuthType, String> {
    value
        .parse()
        .map_err(|_| format!("unknown auth type '{value}', expected none, basic or bearer"))
}

fn parse_header(value: &str) -> Result<Header, String> {
    let (key, value) = value
        .split_once('=')
        .ok_or_else(|| format!("header '{value}' must look like KEY=VALUE"))?;
    Ok(Header::new(key.trim(), value.trim(), ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_nested_test_set_upload() {
        let cli = Cli::try_parse_from([
            "rai-dashboard",
            "--username",
            "alice",
            "--password",
            "secret",
            "test-sets",
            "upload",
            "001",
            "--name",
            "Jailbreak Attempts",
            "--description",
            "Known prompts",
            "a.csv",
            "b.csv",
        ])
        .unwrap();

        assert_eq!(cli.sign_in.username.as_deref(), Some("alice"));
        match cli.command {
            Command::TestSets(TestSetCommand::Upload { workspace, files, .. }) => {
                assert_eq!(workspace, "001");
                assert_eq!(files.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_environment_headers_and_auth_type() {
        let cli = Cli::try_parse_from([
            "rai-dashboard",
            "environments",
            "create",
            "--name",
            "Staging",
            "--auth-type",
            "basic",
            "--header",
            "X-Api-Key=abc=123",
        ])
        .unwrap();

        match cli.command {
            Command::Environments(EnvironmentCommand::Create(args)) => {
                assert_eq!(args.auth_type, AuthType::Basic);
                assert_eq!(args.headers[0].key, "X-Api-Key");
                assert_eq!(args.headers[0].value, "abc=123");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_malformed_header_is_rejected() {
        let result = Cli::try_parse_from([
            "rai-dashboard",
            "environments",
            "create",
            "--name",
            "Staging",
            "--header",
            "no-separator",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_chart_window_dates() {
        let cli = Cli::try_parse_from([
            "rai-dashboard",
            "workspaces",
            "show",
            "001",
            "--from",
            "2025-05-01",
        ])
        .unwrap();
        match cli.command {
            Command::Workspaces(WorkspaceCommand::Show { from, to, .. }) => {
                assert_eq!(from, NaiveDate::from_ymd_opt(2025, 5, 1));
                assert_eq!(to, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
