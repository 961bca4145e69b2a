//! Configuration module for the attendance backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::charts::DEFAULT_WINDOW_SECS;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory holding rendered chart images
    pub cache_dir: PathBuf,
    /// Freshness window for cached charts, in seconds
    pub chart_window_secs: u64,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("ATTENDANCE_DB_PATH")
            .unwrap_or_else(|_| "./data/attendance.sqlite".to_string())
            .into();

        let cache_dir = env::var("ATTENDANCE_CACHE_DIR")
            .unwrap_or_else(|_| "./data/chart_cache".to_string())
            .into();

        let chart_window_secs = match env::var("ATTENDANCE_CHART_WINDOW_SECS") {
            Ok(raw) => parse_window(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    "Invalid ATTENDANCE_CHART_WINDOW_SECS {:?}, using {}s",
                    raw,
                    DEFAULT_WINDOW_SECS
                );
                DEFAULT_WINDOW_SECS
            }),
            Err(_) => DEFAULT_WINDOW_SECS,
        };

        let bind_addr = env::var("ATTENDANCE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid ATTENDANCE_BIND_ADDR format");

        let log_level = env::var("ATTENDANCE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            db_path,
            cache_dir,
            chart_window_secs,
            bind_addr,
            log_level,
        }
    }
}

fn parse_window(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|secs| *secs > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const VARS: [&str; 5] = [
        "ATTENDANCE_DB_PATH",
        "ATTENDANCE_CACHE_DIR",
        "ATTENDANCE_CHART_WINDOW_SECS",
        "ATTENDANCE_BIND_ADDR",
        "ATTENDANCE_LOG_LEVEL",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let config = Config::from_env();

        assert_eq!(config.db_path, PathBuf::from("./data/attendance.sqlite"));
        assert_eq!(config.cache_dir, PathBuf::from("./data/chart_cache"));
        assert_eq!(config.chart_window_secs, 60);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_window_override_and_fallback() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("ATTENDANCE_CHART_WINDOW_SECS", "300");
        assert_eq!(Config::from_env().chart_window_secs, 300);

        env::set_var("ATTENDANCE_CHART_WINDOW_SECS", "soon");
        assert_eq!(Config::from_env().chart_window_secs, 60);

        env::set_var("ATTENDANCE_CHART_WINDOW_SECS", "0");
        assert_eq!(Config::from_env().chart_window_secs, 60);

        clear_env();
    }
}
