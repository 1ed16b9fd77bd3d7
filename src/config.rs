use std::env;
use std::str::FromStr;

const DEFAULT_STREAM_URL: &str = "https://stream.wikimedia.org/v2/stream/recentchange";
const DEFAULT_API_ENDPOINT: &str = "https://www.wikidata.org/w/api.php";
const DEFAULT_WIKI: &str = "wikidatawiki";

/// Runtime configuration loaded from environment variables
///
/// Environment variables (dotenv-compatible):
/// - `EDITFLOW_STREAM_URL` (default: Wikimedia recent-change stream)
/// - `EDITFLOW_API_ENDPOINT` (default: Wikidata Action API)
/// - `EDITFLOW_WIKI` (default: wikidatawiki)
/// - `EDITFLOW_SLEEP_PER_STEP` seconds between reports (default: 10)
/// - `EDITFLOW_TIMEFRAME` window span in seconds (default: 60)
/// - `EDITFLOW_LAG_REFRESH` lag poll interval in seconds (default: 60)
/// - `EDITFLOW_TOP_USERS` ranking size (default: 10)
/// - `EDITFLOW_USERNAME` operator wiki account, required
/// - `EDITFLOW_EMAIL` operator contact address, required
#[derive(Debug, Clone)]
pub struct Config {
    pub stream_url: String,
    pub api_endpoint: String,
    pub wiki: String,
    pub sleep_per_step: u64,
    pub timeframe: i64,
    pub lag_refresh: i64,
    pub top_users: usize,
    pub username: String,
    pub email: String,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let stream_url =
            env::var("EDITFLOW_STREAM_URL").unwrap_or_else(|_| DEFAULT_STREAM_URL.to_string());
        let api_endpoint =
            env::var("EDITFLOW_API_ENDPOINT").unwrap_or_else(|_| DEFAULT_API_ENDPOINT.to_string());
        let wiki = env::var("EDITFLOW_WIKI").unwrap_or_else(|_| DEFAULT_WIKI.to_string());

        for (name, url) in [
            ("EDITFLOW_STREAM_URL", &stream_url),
            ("EDITFLOW_API_ENDPOINT", &api_endpoint),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must start with http:// or https://",
                    name
                )));
            }
        }

        let sleep_per_step = parse_var("EDITFLOW_SLEEP_PER_STEP", 10u64)?;
        let timeframe = parse_var("EDITFLOW_TIMEFRAME", 60i64)?;
        let lag_refresh = parse_var("EDITFLOW_LAG_REFRESH", 60i64)?;
        let top_users = parse_var("EDITFLOW_TOP_USERS", 10usize)?;

        let username = required_var("EDITFLOW_USERNAME")?;
        let email = required_var("EDITFLOW_EMAIL")?;

        Ok(Self {
            stream_url,
            api_endpoint,
            wiki,
            sleep_per_step,
            timeframe,
            lag_refresh,
            top_users,
            username,
            email,
        })
    }

    /// Descriptive client identification sent with every outbound request,
    /// so wiki operators have an abuse contact
    pub fn user_agent(&self) -> String {
        format!(
            "{}/{} (edit rate monitor by User:{}; mailto:{})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            self.username,
            self.email
        )
    }
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVariable(name.to_string())),
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(format!("{} must be a number, got '{}'", name, raw))
        }),
        Err(_) => Ok(default),
    }
}
