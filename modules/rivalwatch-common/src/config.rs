use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Headless rendering service
    pub headless_url: String,
    pub headless_token: Option<String>,

    // Output locations
    pub data_dir: String,
    pub screenshot_dir: String,

    // Per-step bounds
    pub nav_timeout_ms: u64,
    pub settle_ms: u64,
    pub capture_timeout_ms: u64,

    // Session fan-out
    pub max_concurrent_sessions: usize,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing or malformed.
    pub fn from_env() -> Self {
        Self {
            headless_url: required_env("HEADLESS_URL"),
            headless_token: env::var("HEADLESS_TOKEN").ok(),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            screenshot_dir: env::var("SCREENSHOT_DIR")
                .unwrap_or_else(|_| "reports/screenshots".to_string()),
            nav_timeout_ms: parsed_env("NAV_TIMEOUT_MS", 60_000),
            settle_ms: parsed_env("SETTLE_MS", 3_000),
            capture_timeout_ms: parsed_env("CAPTURE_TIMEOUT_MS", 10_000),
            max_concurrent_sessions: parsed_env("MAX_CONCURRENT_SESSIONS", 4),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number")),
        Err(_) => default,
    }
}
