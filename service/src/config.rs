use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default base URL of the RAI backend used when `RAI_SERVICE_URL` is not set.
pub const DEFAULT_RAI_SERVICE_URL: &str = "http://localhost:8000";

/// Path prefix shared by every backend endpoint.
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Default Azure AD authority. Override in tests to point at a mock server.
pub const DEFAULT_AZURE_AD_AUTHORITY_URL: &str = "https://login.microsoftonline.com";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Selects which implementation backs the auth gateway and the domain services.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceMode {
    /// Seeded in-memory services, no backend required.
    Mock,
    /// REST services talking to `RAI_SERVICE_URL`.
    Rest,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ServiceModeParseError;

impl FromStr for ServiceMode {
    type Err = ServiceModeParseError;
    fn from_str(mode: &str) -> Result<ServiceMode, Self::Err> {
        match mode.to_lowercase().as_str() {
            "mock" => Ok(ServiceMode::Mock),
            "rest" => Ok(ServiceMode::Rest),
            _ => Err(ServiceModeParseError),
        }
    }
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServiceMode::Mock => write!(f, "mock"),
            ServiceMode::Rest => write!(f, "rest"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Base URL of the RAI backend service.
    #[arg(long, env, default_value = DEFAULT_RAI_SERVICE_URL)]
    rai_service_url: String,

    /// Path prefix prepended to every backend endpoint.
    #[arg(long, env, default_value = DEFAULT_API_PREFIX)]
    api_prefix: String,

    /// Whether to talk to the real backend or to the seeded in-memory services.
    #[arg(
        long,
        env,
        default_value_t = ServiceMode::Mock,
        value_parser = clap::builder::PossibleValuesParser::new(["mock", "rest", "MOCK", "REST"])
            .map(|s| s.parse::<ServiceMode>().unwrap()),
    )]
    pub service_mode: ServiceMode,

    /// Seconds an access token is considered fresh after sign-in or refresh.
    #[arg(long, env, default_value_t = 60)]
    pub token_lifetime_secs: u64,

    /// Extra seconds a session survives past its token lifetime without any activity.
    #[arg(long, env, default_value_t = 10)]
    pub token_lifetime_buffer_secs: u64,

    /// Timeout in seconds for a single backend request.
    #[arg(long, env, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Number of rows fetched per page by list views.
    #[arg(long, env, default_value_t = 10)]
    pub page_size: u32,

    /// Seed for the deterministic mock data set.
    #[arg(long, env, default_value_t = 42)]
    pub mock_seed: u64,

    /// Azure AD application (client) ID used for enterprise sign-in.
    #[arg(long, env)]
    azure_ad_client_id: Option<String>,

    /// Azure AD client secret used for the authorization code exchange.
    #[arg(long, env)]
    azure_ad_client_secret: Option<String>,

    /// Azure AD tenant ID.
    #[arg(long, env)]
    azure_ad_tenant_id: Option<String>,

    /// Redirect URI registered for the Azure AD application.
    #[arg(long, env)]
    azure_ad_redirect_uri: Option<String>,

    /// Azure AD authority base URL.
    #[arg(long, env, default_value = DEFAULT_AZURE_AD_AUTHORITY_URL)]
    azure_ad_authority_url: String,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Config {
    /// Loads `.env` and then parses the command line parameters and flags.
    pub fn new() -> Self {
        dotenv().ok();
        Config::parse()
    }

    /// Loads `.env` and builds a Config from environment variables only,
    /// ignoring process arguments.
    pub fn from_env() -> Self {
        dotenv().ok();
        Config::parse_from([env!("CARGO_PKG_NAME")])
    }

    pub fn set_rai_service_url(mut self, rai_service_url: String) -> Self {
        self.rai_service_url = rai_service_url;
        self
    }

    pub fn set_service_mode(mut self, service_mode: ServiceMode) -> Self {
        self.service_mode = service_mode;
        self
    }

    pub fn rai_service_url(&self) -> &str {
        &self.rai_service_url
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    /// The backend base URL joined with the API prefix, without a trailing slash.
    pub fn api_base_url(&self) -> String {
        format!(
            "{}/{}",
            self.rai_service_url.trim_end_matches('/'),
            self.api_prefix.trim_matches('/')
        )
        .trim_end_matches('/')
        .to_string()
    }

    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_secs)
    }

    /// How long a session may sit idle before it is dropped without a refresh attempt.
    pub fn session_max_idle(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_secs + self.token_lifetime_buffer_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn azure_ad_client_id(&self) -> Option<String> {
        self.azure_ad_client_id.clone()
    }

    pub fn azure_ad_client_secret(&self) -> Option<String> {
        self.azure_ad_client_secret.clone()
    }

    pub fn azure_ad_tenant_id(&self) -> Option<String> {
        self.azure_ad_tenant_id.clone()
    }

    pub fn azure_ad_redirect_uri(&self) -> Option<String> {
        self.azure_ad_redirect_uri.clone()
    }

    pub fn azure_ad_authority_url(&self) -> &str {
        &self.azure_ad_authority_url
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
