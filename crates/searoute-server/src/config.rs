//! Server configuration from environment.

use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    /// Seconds a cached segment stays fresh
    pub cache_ttl_s: u64,
    pub cache_max_entries: usize,
    /// Perpendicular waypoint offset for blocked legs
    pub detour_offset_km: f64,
    /// Emit JSON log lines instead of the human format
    pub log_json: bool,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env_or("SEAROUTE_PORT", 3000),
            database_path: env::var("SEAROUTE_DB_PATH").unwrap_or_else(|_| "data/searoute.db".to_string()),
            database_max_connections: env_or("SEAROUTE_DB_MAX_CONNECTIONS", 5),
            cache_ttl_s: env_or("SEAROUTE_CACHE_TTL_S", 300),
            cache_max_entries: env_or("SEAROUTE_CACHE_MAX_ENTRIES", 1024),
            detour_offset_km: env_or("SEAROUTE_DETOUR_OFFSET_KM", 200.0),
            log_json: env_flag("SEAROUTE_LOG_JSON"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_keys_fall_back_to_defaults() {
        assert_eq!(env_or("SEAROUTE_TEST_UNSET_PORT", 3000u16), 3000);
        assert!(!env_flag("SEAROUTE_TEST_UNSET_FLAG"));
    }
}
