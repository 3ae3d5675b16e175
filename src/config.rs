//! Runtime configuration, loaded from environment variables at startup.
//!
//! Call [`load_dotenv`] first so a `.env` file in the working directory can
//! supply any of the variables below.

use std::path::PathBuf;
use std::str::FromStr;

use chrono_tz::Tz;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    File,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "db" | "database" => Ok(BackendKind::Sqlite),
            "file" | "json" | "local" => Ok(BackendKind::File),
            other => Err(format!("unknown backend '{other}' (expected 'sqlite' or 'file')")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,
    pub backend: BackendKind,
    /// sqlx SQLite URL (default: `"sqlite:todos.db?mode=rwc"`).
    pub database_url: String,
    /// Upper bound on pooled database connections.
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Task list file for the file backend.
    pub data_file: PathBuf,
    /// IANA zone name; see [`Config::timezone`].
    pub timezone_name: String,
    pub log: LogSettings,
    /// Comma-separated CORS allow-list. `None` allows any origin.
    pub cors_origins: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            backend: BackendKind::Sqlite,
            database_url: "sqlite:todos.db?mode=rwc".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
            data_file: PathBuf::from("todos.json"),
            timezone_name: "UTC".to_string(),
            log: LogSettings::default(),
            cors_origins: None,
        }
    }
}

/// The two settings tracing needs. They are read on their own so the
/// subscriber is installed before the rest of [`Config`] is parsed and its
/// warnings have somewhere to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub filter: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            filter: lookup("TODOS_LOG").unwrap_or(defaults.filter),
            json: lookup("TODOS_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.json),
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    /// Install tracing first; bad values are reported with `warn!`.
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_address: lookup("TODOS_BIND").unwrap_or(defaults.bind_address),
            backend: parse_setting(&lookup, "TODOS_BACKEND", defaults.backend),
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse_setting(&lookup, "TODOS_DB_CONNECTION_LIMIT", defaults.max_connections).max(1),
            acquire_timeout_secs: parse_setting(&lookup, "TODOS_DB_ACQUIRE_TIMEOUT_SECS", defaults.acquire_timeout_secs),
            data_file: lookup("TODOS_DATA_FILE").map(PathBuf::from).unwrap_or(defaults.data_file),
            timezone_name: lookup("TODOS_TIMEZONE").unwrap_or(defaults.timezone_name),
            log: LogSettings::from_lookup(&lookup),
            cors_origins: lookup("TODOS_CORS_ORIGINS").filter(|v| !v.trim().is_empty()),
        }
    }

    /// The zone that defines "local time". Invalid names fall back to UTC.
    pub fn timezone(&self) -> Tz {
        parse_timezone(&self.timezone_name)
    }
}

/// Loads `.env` from the working directory if there is one.
pub fn load_dotenv() -> anyhow::Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err.into()),
    }
}

pub fn parse_timezone(tz_str: &str) -> Tz {
    tz_str.trim().parse().unwrap_or_else(|_| {
        warn!(timezone = %tz_str, "invalid timezone, falling back to UTC");
        chrono_tz::UTC
    })
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_setting<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[test]
    fn backend_names() {
        assert_eq!("sqlite".parse::<BackendKind>(), Ok(BackendKind::Sqlite));
        assert_eq!(" File ".parse::<BackendKind>(), Ok(BackendKind::File));
        assert!("redis".parse::<BackendKind>().is_err());
    }

    #[test]
    fn timezone_falls_back_to_utc() {
        assert_eq!(parse_timezone("Asia/Seoul"), chrono_tz::Asia::Seoul);
        assert_eq!(parse_timezone("Mars/Olympus_Mons"), chrono_tz::UTC);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.timezone(), chrono_tz::UTC);
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let config = Config::from_lookup(|key| match key {
            "TODOS_DB_CONNECTION_LIMIT" => Some("many".to_string()),
            "TODOS_BACKEND" => Some("file".to_string()),
            "TODOS_LOG_JSON" => Some("TRUE".to_string()),
            _ => None,
        });
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.backend, BackendKind::File);
        assert!(config.log.json);
        assert_eq!(config.log.filter, "info");
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn config_warnings_reach_an_installed_subscriber() {
        let log = LogSettings::from_lookup(|key| (key == "TODOS_LOG").then(|| "warn".to_string()));
        assert_eq!(log.filter, "warn");

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(log.filter.as_str())
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            Config::from_lookup(|key| (key == "TODOS_DB_ACQUIRE_TIMEOUT_SECS").then(|| "soon".to_string()))
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("TODOS_DB_ACQUIRE_TIMEOUT_SECS"), "{output}");
        assert!(output.contains("ignoring unparseable setting"));
    }
}
