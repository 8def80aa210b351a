//!
//! src/config.rs  Oct 18th, 2026
//!
//! Reads the environment once at startup and builds every
//! configuration struct the scout needs
//!

use std::{path::PathBuf, time};
use url::Url;

use crate::errors::ScoutError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 10000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 64;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Wrapper over the lookup to return an invalid environment var error
fn env_check(lookup: &dyn Fn(&str) -> Option<String>, s: &str) ->
    Result<String, ScoutError> {
    match lookup(s) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ScoutError::Config(format!("{s} was not set"))),
    }
}

fn env_or(lookup: &dyn Fn(&str) -> Option<String>, s: &str, default: &str) -> String {
    match lookup(s) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_to_u64(lookup: &dyn Fn(&str) -> Option<String>, s: &str) ->
    Result<u64, ScoutError> {
    let raw = env_check(lookup, s)?;
    raw.parse::<u64>()
        .map_err(|e| ScoutError::Config(format!("{s} invalid integer {raw:?}: {e}")))
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn base_url(lookup: &dyn Fn(&str) -> Option<String>, s: &str, default: &str) ->
    Result<Url, ScoutError> {
    let raw = env_or(lookup, s, default);
    let mut url = Url::parse(&raw)
        .map_err(|e| ScoutError::Config(format!("{s} invalid {e}")))?;

    ensure_https(&url).map_err(ScoutError::Config)?;

    // ensure trailing slash
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
    Ok(url)
}

///
/// Configuration for the catalog preview endpoint
///
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: Url,   // https://p.mondiamedia.com/
}

///
/// Configuration for the release status endpoint. Which field signals an
/// unreleased track is inferred from observed responses, so it is kept
/// configurable rather than fixed.
///
#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub base_url: Url,
    pub tenant_id: String,   // sent as x-tenant-id
    pub error_field: String, // default "errorCode"
}

#[derive(Clone)]
pub struct TelegramConfig {
    pub base_url: Url,
    pub api_token: String,
    pub chat_id: String,
}

// keep the bot token out of the startup dump
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

///
/// Scan bounds and pacing
///
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub start_id: u64,
    pub end_id: u64,                 // exclusive
    pub batch_size: usize,
    pub error_limit: Option<u32>,    // consecutive failed fetches before abort
    pub artists_path: PathBuf,
    pub log_path: PathBuf,
}

fn build_scan(lookup: &dyn Fn(&str) -> Option<String>) -> Result<ScanConfig, ScoutError> {
    let start_id = env_to_u64(lookup, "START_ID")?;
    let end_id   = env_to_u64(lookup, "END_ID")?;

    let batch_size = match lookup("BATCH_SIZE") {
        Some(v) if !v.trim().is_empty() => v.trim().parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ScoutError::Config(
                format!("BATCH_SIZE must be a positive integer, got {v:?}")
            ))?,
        _ => DEFAULT_BATCH_SIZE,
    };

    let error_limit = match lookup("ERR_LIMIT") {
        Some(v) if !v.trim().is_empty() => Some(v.trim().parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ScoutError::Config(
                format!("ERR_LIMIT must be a positive integer, got {v:?}")
            ))?),
        _ => None,
    };

    let artists_path = PathBuf::from(env_or(lookup, "ARTISTS_PATH", "./data/artists.txt"));
    let log_path     = PathBuf::from(env_or(lookup, "LOG_PATH", "./data/log.csv"));

    Ok( ScanConfig { start_id, end_id, batch_size, error_limit, artists_path, log_path } )
}

///
/// Configuration for Http timeouts, pooling, etc.
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,unreleased_scout=debug,reqwest=warn,lofty=error"
                .to_string(),
            format: LogFormat::Json,
            with_ansi: true,
            include_file_line: false,
            include_target: true,
        }
    }
}

fn build_logging(lookup: &dyn Fn(&str) -> Option<String>) -> Result<LoggingConfig, ScoutError> {
    let format = match env_or(lookup, "LOG_FORMAT", "json").to_ascii_lowercase().as_str() {
        "json"   => LogFormat::Json,
        "pretty" => LogFormat::Pretty,
        other    => return Err(ScoutError::Config(
            format!("LOG_FORMAT must be json or pretty, got {other:?}")
        )),
    };
    Ok( LoggingConfig { format, ..LoggingConfig::default() } )
}

///
/// AppConfig which holds everything the scan and its clients need
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub status: StatusConfig,
    pub telegram: TelegramConfig,
    pub scan: ScanConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig
}

impl AppConfig {
    /// Builds the config from any key lookup; `load_config` passes the
    /// process environment.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ScoutError> {
        let api_token = env_check(lookup, "API_TOKEN")?;
        let chat_id   = env_check(lookup, "CHAT_ID")?;

        let catalog = CatalogConfig {
            base_url: base_url(lookup, "CATALOG_BASE_URL", "https://p.mondiamedia.com/")?,
        };
        let status = StatusConfig {
            base_url: base_url(lookup, "STATUS_BASE_URL", "https://ment-backend.mondia.com/")?,
            tenant_id: env_or(lookup, "STATUS_TENANT_ID", "vf-de"),
            error_field: env_or(lookup, "STATUS_ERROR_FIELD", "errorCode"),
        };
        let telegram = TelegramConfig {
            base_url: base_url(lookup, "TELEGRAM_BASE_URL", "https://api.telegram.org/")?,
            api_token,
            chat_id,
        };

        let scan    = build_scan(lookup)?;
        let http    = HttpConfig::default();
        let logging = build_logging(lookup)?;

        Ok( AppConfig { catalog, status, telegram, scan, http, logging } )
    }
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, ScoutError> {
    dotenvy::dotenv().ok();
    AppConfig::from_lookup(&|key: &str| std::env::var(key).ok())
}
