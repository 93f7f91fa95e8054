//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "fresca";
const DEFAULT_BASE_URL: &str = "http://localhost:3500";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_DETACHED_ENTRY_LIMIT: usize = 64;

/// Command-line arguments for the fresca binary.
#[derive(Debug, Parser)]
#[command(name = "fresca", version, about = "Posts cache explorer")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FRESCA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CliOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CliOverrides {
    /// Override the posts API base url.
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Override the request timeout.
    #[arg(long = "timeout-seconds", value_name = "SECONDS", global = true)]
    pub timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        global = true,
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Show the posts list through the query cache.
    List(ListArgs),
    /// Fetch the posts list through the manual store, bypassing the cache.
    Fetch(FetchArgs),
    /// Create a post and show the refreshed list.
    Create(CreateArgs),
    /// Update a post and show the refreshed list.
    Update(UpdateArgs),
    /// Delete a post and show the list as the cache still sees it.
    Delete(DeleteArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    /// Print the raw collection as JSON instead of the text view.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct FetchArgs {
    /// Print the raw collection as JSON instead of the text view.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct CreateArgs {
    /// Explicit id for the new post; the server assigns one when omitted.
    #[arg(long)]
    pub id: Option<i64>,

    /// Post title.
    #[arg(long)]
    pub title: String,

    /// Post description.
    #[arg(long, default_value = "")]
    pub desc: String,
}

#[derive(Debug, Args, Clone)]
pub struct UpdateArgs {
    /// Id of the post to update.
    #[arg(value_name = "ID")]
    pub id: i64,

    /// New title.
    #[arg(long)]
    pub title: String,

    /// New description.
    #[arg(long, default_value = "")]
    pub desc: String,
}

#[derive(Debug, Args, Clone)]
pub struct DeleteArgs {
    /// Id of the post to delete.
    #[arg(value_name = "ID")]
    pub id: i64,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub detached_entry_limit: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FRESCA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    cache: RawCacheSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(url) = overrides.base_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.api.timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            cache,
            logging,
        } = raw;

        let api = build_api_settings(api)?;
        let cache = build_cache_settings(cache)?;
        let logging = build_logging_settings(logging)?;

        Ok(Self {
            api,
            cache,
            logging,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let raw_url = api.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("api.base_url", format!("failed to parse: {err}")))?;
    if base_url.cannot_be_a_base() {
        return Err(LoadError::invalid(
            "api.base_url",
            "url cannot serve as a base for endpoint paths",
        ));
    }

    let timeout_seconds = api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        base_url,
        timeout: Duration::from_secs(timeout_seconds),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let detached_entry_limit = cache
        .detached_entry_limit
        .unwrap_or(DEFAULT_CACHE_DETACHED_ENTRY_LIMIT);
    if detached_entry_limit == 0 {
        return Err(LoadError::invalid(
            "cache.detached_entry_limit",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        detached_entry_limit,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    detached_entry_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_local_json_server() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
        assert_eq!(settings.api.base_url.as_str(), "http://localhost:3500/");
        assert_eq!(settings.api.timeout, Duration::from_secs(10));
        assert_eq!(settings.cache.detached_entry_limit, 64);
        assert_eq!(settings.logging.level, LevelFilter::INFO);
        assert!(matches!(settings.logging.format, LogFormat::Compact));
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.api.base_url = Some("http://staging:4000".to_string());
        raw.logging.level = Some("info".to_string());

        let overrides = CliOverrides {
            base_url: Some("http://localhost:9999".to_string()),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.api.base_url.as_str(), "http://localhost:9999/");
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn malformed_base_url_is_rejected_with_its_key() {
        let mut raw = RawSettings::default();
        raw.api.base_url = Some("not a url".to_string());

        let err = Settings::from_raw(raw).expect_err("url should not parse");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "api.base_url",
                ..
            }
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut raw = RawSettings::default();
        raw.api.timeout_seconds = Some(0);

        let err = Settings::from_raw(raw).expect_err("zero timeout");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "api.timeout_seconds",
                ..
            }
        ));
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = CliOverrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn default_to_list_command() {
        let args = CliArgs::parse_from(["fresca"]);
        let command = args.command.unwrap_or(Command::List(ListArgs::default()));
        assert!(matches!(command, Command::List(_)));
    }

    #[test]
    fn parse_create_arguments() {
        let args = CliArgs::parse_from([
            "fresca",
            "create",
            "--title",
            "hello",
            "--desc",
            "test desc",
        ]);

        match args.command.expect("create command") {
            Command::Create(create) => {
                assert_eq!(create.id, None);
                assert_eq!(create.title, "hello");
                assert_eq!(create.desc, "test desc");
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_update_arguments() {
        let args = CliArgs::parse_from(["fresca", "update", "7", "--title", "renamed"]);

        match args.command.expect("update command") {
            Command::Update(update) => {
                assert_eq!(update.id, 7);
                assert_eq!(update.title, "renamed");
                assert_eq!(update.desc, "");
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_delete_with_global_overrides() {
        let args = CliArgs::parse_from([
            "fresca",
            "delete",
            "1",
            "--base-url",
            "http://localhost:9999",
        ]);

        assert_eq!(
            args.overrides.base_url.as_deref(),
            Some("http://localhost:9999")
        );
        match args.command.expect("delete command") {
            Command::Delete(delete) => assert_eq!(delete.id, 1),
            _ => panic!("wrong command parsed"),
        }
    }
}
