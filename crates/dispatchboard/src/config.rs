use chrono_tz::Tz;

// Runtime configuration, loaded once from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub admin_addr: String,
    pub display_tz: Tz,
    pub history_page_limit: i64,
    pub lookup_timeout_ms: u64,
    pub permissions_file: Option<String>,
    pub environment: String,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is missing"))?;

        let admin_addr = env_or_fallback("DISPATCH_ADMIN_ADDR", "ADMIN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string());

        let display_tz = match env_or_fallback("DISPATCH_DISPLAY_TZ", "TZ") {
            Some(name) => parse_tz(&name)?,
            None => Tz::UTC,
        };

        let history_page_limit =
            env_or_fallback("DISPATCH_HISTORY_PAGE_LIMIT", "HISTORY_PAGE_LIMIT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(50);

        let lookup_timeout_ms = env_or_fallback("DISPATCH_LOOKUP_TIMEOUT_MS", "LOOKUP_TIMEOUT_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(2_000);

        let permissions_file = env_or_fallback("DISPATCH_PERMISSIONS_FILE", "PERMISSIONS_FILE")
            .and_then(|s| normalize_optional_path(&s));

        let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let log_json = std::env::var("LOG_FORMAT")
            .map(|v| v.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            admin_addr,
            display_tz,
            history_page_limit,
            lookup_timeout_ms,
            permissions_file,
            environment,
            log_json,
        })
    }
}

pub fn parse_tz(name: &str) -> anyhow::Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("invalid display time zone {name:?}: {e}"))
}

fn env_or_fallback(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| std::env::var(fallback).ok().filter(|s| !s.trim().is_empty()))
}

fn normalize_optional_path(value: &str) -> Option<String> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    if matches!(v.to_lowercase().as_str(), "0" | "off" | "false" | "none") {
        return None;
    }
    Some(v.to_string())
}
