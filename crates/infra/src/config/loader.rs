//! Configuration loader
//!
//! ## Loading Strategy
//! 1. A `.env` file in the working directory, if any, is applied to the
//!    process environment
//! 2. Configuration is read from environment variables when
//!    `UNIBRIDGE_DB_PATH` is set
//! 3. Otherwise it is read from the first config file found by
//!    [`probe_config_paths`] (TOML or JSON)
//! 4. The result is validated before it is returned
//!
//! ## Environment Variables
//! - `UNIBRIDGE_DB_PATH`: Database file path (required for env loading)
//! - `UNIBRIDGE_DB_POOL_SIZE`: Connection pool size
//! - `UNIBRIDGE_SYNC_INTERVAL`: Background sync period in seconds
//! - `UNIBRIDGE_SYNC_PAGE_TIMEOUT`: Per-page timeout in seconds
//! - `UNIBRIDGE_SYNC_OVERLAP`: `queue` or `reject`
//! - `UNIBRIDGE_SYNC_OBJECT_TYPES`: Comma separated object types to sync
//! - `UNIBRIDGE_RETRY_MAX_ATTEMPTS`: Attempts per provider call
//! - `UNIBRIDGE_ZENDESK_BASE_URL`, `UNIBRIDGE_FRESHSALES_BASE_URL`: Default API roots
//! - `UNIBRIDGE_LOG_LEVEL`: Default tracing filter
//! - `UNIBRIDGE_LOG_JSON`: Emit JSON logs (true/false)
//! - `UNIBRIDGE_SECRETS_KEY`: Sealing key, read by [`crate::key_manager`]

use std::path::{Path, PathBuf};
use std::str::FromStr;

use unibridge_domain::{Config, ObjectType, OverlapPolicy, Result, UnibridgeError};

const FILE_NAMES: [&str; 4] = ["unibridge.toml", "unibridge.json", "config.toml", "config.json"];

/// Load and validate configuration from the environment, falling back to a
/// config file.
///
/// # Errors
/// Returns `UnibridgeError::Config` if no source is usable, a value cannot be
/// parsed, or the merged configuration fails validation.
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "applied .env file");
    }

    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = %e, "environment incomplete, trying config file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from `UNIBRIDGE_*` environment variables.
///
/// `UNIBRIDGE_DB_PATH` is required; every other variable overrides a default.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();
    config.database.path = env_var("UNIBRIDGE_DB_PATH")?;

    if let Some(pool_size) = env_parse("UNIBRIDGE_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }
    if let Some(interval) = env_parse("UNIBRIDGE_SYNC_INTERVAL")? {
        config.sync.interval_secs = interval;
    }
    if let Some(timeout) = env_parse("UNIBRIDGE_SYNC_PAGE_TIMEOUT")? {
        config.sync.page_timeout_secs = timeout;
    }
    if let Ok(overlap) = std::env::var("UNIBRIDGE_SYNC_OVERLAP") {
        config.sync.overlap = parse_overlap(&overlap)?;
    }
    if let Ok(list) = std::env::var("UNIBRIDGE_SYNC_OBJECT_TYPES") {
        config.sync.object_types = parse_object_types(&list)?;
    }
    if let Some(attempts) = env_parse("UNIBRIDGE_RETRY_MAX_ATTEMPTS")? {
        config.retry.max_attempts = attempts;
    }
    if let Ok(url) = std::env::var("UNIBRIDGE_ZENDESK_BASE_URL") {
        config.providers.zendesk.base_url = Some(url);
    }
    if let Ok(url) = std::env::var("UNIBRIDGE_FRESHSALES_BASE_URL") {
        config.providers.freshsales.base_url = Some(url);
    }
    if let Ok(level) = std::env::var("UNIBRIDGE_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("UNIBRIDGE_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes the standard locations with
/// [`probe_config_paths`]. The format follows the file extension.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(UnibridgeError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            UnibridgeError::Config("no config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| UnibridgeError::Config(format!("failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| UnibridgeError::Config(format!("invalid TOML: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| UnibridgeError::Config(format!("invalid JSON: {e}"))),
        _ => Err(UnibridgeError::Config(format!("unsupported config format: {extension}"))),
    }
}

/// Find the first existing config file.
///
/// Looks for `unibridge.{toml,json}` then `config.{toml,json}` in the working
/// directory, its two parents, and next to the executable.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

fn parse_overlap(value: &str) -> Result<OverlapPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "queue" => Ok(OverlapPolicy::Queue),
        "reject" => Ok(OverlapPolicy::Reject),
        other => Err(UnibridgeError::Config(format!("invalid sync overlap policy: {other}"))),
    }
}

fn parse_object_types(list: &str) -> Result<Vec<ObjectType>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            ObjectType::from_str(s)
                .map_err(|_| UnibridgeError::Config(format!("unknown object type: {s}")))
        })
        .collect()
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| {
            UnibridgeError::Config(format!("missing required environment variable: {key}"))
        })
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| UnibridgeError::Config(format!("invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// Serialises tests that touch process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: once_cell::sync::Lazy<std::sync::Mutex<()>> =
    once_cell::sync::Lazy::new(|| std::sync::Mutex::new(()));

#[cfg(test)]
mod tests {
    use std::io::Write;

    use unibridge_domain::Provider;

    use super::*;

    const ENV_KEYS: [&str; 11] = [
        "UNIBRIDGE_DB_PATH",
        "UNIBRIDGE_DB_POOL_SIZE",
        "UNIBRIDGE_SYNC_INTERVAL",
        "UNIBRIDGE_SYNC_PAGE_TIMEOUT",
        "UNIBRIDGE_SYNC_OVERLAP",
        "UNIBRIDGE_SYNC_OBJECT_TYPES",
        "UNIBRIDGE_RETRY_MAX_ATTEMPTS",
        "UNIBRIDGE_ZENDESK_BASE_URL",
        "UNIBRIDGE_FRESHSALES_BASE_URL",
        "UNIBRIDGE_LOG_LEVEL",
        "UNIBRIDGE_LOG_JSON",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        for value in ["1", "true", "yes", "on", "TRUE"] {
            std::env::set_var("UNIBRIDGE_TEST_BOOL", value);
            assert!(env_bool("UNIBRIDGE_TEST_BOOL", false), "{value} should be true");
        }
        for value in ["0", "false", "no", "off"] {
            std::env::set_var("UNIBRIDGE_TEST_BOOL", value);
            assert!(!env_bool("UNIBRIDGE_TEST_BOOL", true), "{value} should be false");
        }

        std::env::remove_var("UNIBRIDGE_TEST_BOOL");
        assert!(env_bool("UNIBRIDGE_TEST_BOOL", true));
    }

    #[test]
    fn env_overrides_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("UNIBRIDGE_DB_PATH", "/tmp/unibridge-test.db");
        std::env::set_var("UNIBRIDGE_DB_POOL_SIZE", "8");
        std::env::set_var("UNIBRIDGE_SYNC_OVERLAP", "Reject");
        std::env::set_var("UNIBRIDGE_SYNC_OBJECT_TYPES", "ticket, contact");
        std::env::set_var("UNIBRIDGE_RETRY_MAX_ATTEMPTS", "5");
        std::env::set_var("UNIBRIDGE_ZENDESK_BASE_URL", "https://acme.zendesk.com");
        std::env::set_var("UNIBRIDGE_LOG_JSON", "yes");

        let config = load_from_env().unwrap();
        clear_env();

        assert_eq!(config.database.path, "/tmp/unibridge-test.db");
        assert_eq!(config.database.pool_size, 8);
        assert_eq!(config.sync.overlap, OverlapPolicy::Reject);
        assert_eq!(config.sync.object_types, vec![ObjectType::Ticket, ObjectType::Contact]);
        assert_eq!(config.sync.interval_secs, 900);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(
            config.providers.endpoint(Provider::Zendesk).base_url.as_deref(),
            Some("https://acme.zendesk.com")
        );
        assert!(config.providers.freshsales.base_url.is_none());
        assert!(config.logging.json);
    }

    #[test]
    fn env_requires_database_path() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        assert!(matches!(load_from_env().unwrap_err(), UnibridgeError::Config(_)));
    }

    #[test]
    fn env_rejects_bad_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("UNIBRIDGE_DB_PATH", "/tmp/unibridge-test.db");

        std::env::set_var("UNIBRIDGE_DB_POOL_SIZE", "many");
        assert!(matches!(load_from_env().unwrap_err(), UnibridgeError::Config(_)));
        std::env::remove_var("UNIBRIDGE_DB_POOL_SIZE");

        std::env::set_var("UNIBRIDGE_SYNC_OVERLAP", "drop");
        assert!(load_from_env().is_err());
        std::env::remove_var("UNIBRIDGE_SYNC_OVERLAP");

        std::env::set_var("UNIBRIDGE_SYNC_OBJECT_TYPES", "ticket,invoice");
        assert!(load_from_env().is_err());

        clear_env();
    }

    #[test]
    fn toml_file_is_loaded() {
        let file = write_config(
            ".toml",
            r#"
            [database]
            path = "synced.db"

            [sync]
            overlap = "reject"
            page_timeout_secs = 15

            [providers.freshsales]
            base_url = "https://acme.myfreshworks.com/crm/sales"
            "#,
        );

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.database.path, "synced.db");
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.sync.page_timeout_secs, 15);
        assert_eq!(config.sync.overlap, OverlapPolicy::Reject);
        assert!(config.providers.freshsales.base_url.is_some());
    }

    #[test]
    fn json_file_is_loaded() {
        let file = write_config(
            ".json",
            r#"{"database": {"path": "synced.db", "pool_size": 2}, "retry": {"max_attempts": 1}}"#,
        );

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.database.pool_size, 2);
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn unreadable_files_are_config_errors() {
        let missing = load_from_file(Some(PathBuf::from("/nonexistent/unibridge.toml")));
        assert!(matches!(missing.unwrap_err(), UnibridgeError::Config(_)));

        let broken = write_config(".json", r#"{ "database": "#);
        assert!(load_from_file(Some(broken.path().to_path_buf())).is_err());

        assert!(parse_config("a: b", Path::new("unibridge.yaml")).is_err());
    }
}
