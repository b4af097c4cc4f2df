use std::path::PathBuf;
use std::time::Duration;

use moviewatch_core::notify::DEFAULT_VISIBLE_FOR;

/// User agents that never get past the request guard.
pub const DEFAULT_BOT_PATTERNS: &[&str] = &[
    "axios",
    "node-fetch",
    "cheerio",
    "curl",
    "python-requests",
    "java",
    "okhttp",
];

/// Runtime configuration, read from `MOVIEWATCH_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub catalog_path: PathBuf,
    pub notification_visible_for: Duration,
    pub session_idle_timeout: Duration,
    pub blocked_ips: Vec<String>,
    pub bot_patterns: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            catalog_path: PathBuf::from("data/movies.json"),
            notification_visible_for: DEFAULT_VISIBLE_FOR,
            session_idle_timeout: Duration::from_secs(30 * 60),
            blocked_ips: vec!["1.2.3.4".to_string()],
            bot_patterns: DEFAULT_BOT_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Self {
            bind: lookup("MOVIEWATCH_BIND").unwrap_or(defaults.bind),
            catalog_path: lookup("MOVIEWATCH_CATALOG")
                .map(PathBuf::from)
                .unwrap_or(defaults.catalog_path),
            notification_visible_for: secs(
                "MOVIEWATCH_NOTIFY_SECS",
                defaults.notification_visible_for,
            ),
            session_idle_timeout: secs(
                "MOVIEWATCH_SESSION_IDLE_SECS",
                defaults.session_idle_timeout,
            ),
            blocked_ips: lookup("MOVIEWATCH_BLOCKED_IPS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.blocked_ips),
            bot_patterns: lookup("MOVIEWATCH_BOT_PATTERNS")
                .map(|v| split_list(&v.to_lowercase()))
                .unwrap_or(defaults.bot_patterns),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
