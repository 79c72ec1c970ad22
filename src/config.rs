use serde::Deserialize;
use std::time::Duration;

/// Lower and upper bound for any single external call.
const MIN_TIMEOUT_SECS: u64 = 8;
const MAX_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub target_lead_count: usize,
    pub companies_house_api_key: Option<String>,
    pub registry_base_url: String,
    pub search_engine_base_url: String,
    pub directory_base_url: String,
    pub page_timeout_secs: u64,
    pub search_timeout_secs: u64,
    pub registry_timeout_secs: u64,
    pub pacing_delay_ms: u64,
    pub notify_webhook_url: Option<String>,
    pub landing_page_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            target_lead_count: 20,
            companies_house_api_key: None,
            registry_base_url: "https://api.company-information.service.gov.uk".to_string(),
            search_engine_base_url: "https://www.bing.com".to_string(),
            directory_base_url: "https://www.google.com".to_string(),
            page_timeout_secs: 12,
            search_timeout_secs: 15,
            registry_timeout_secs: 8,
            pacing_delay_ms: 0,
            notify_webhook_url: None,
            landing_page_path: "static/index.html".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            port: parse_var("PORT", defaults.port)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            target_lead_count: parse_var("TARGET_LEAD_COUNT", defaults.target_lead_count)
                .map_err(|_| anyhow::anyhow!("TARGET_LEAD_COUNT must be a non-negative number"))?,
            companies_house_api_key: optional_var("COMPANIES_HOUSE_API_KEY"),
            registry_base_url: http_url_var("REGISTRY_BASE_URL", defaults.registry_base_url)?,
            search_engine_base_url: http_url_var(
                "SEARCH_ENGINE_BASE_URL",
                defaults.search_engine_base_url,
            )?,
            directory_base_url: http_url_var("DIRECTORY_BASE_URL", defaults.directory_base_url)?,
            page_timeout_secs: clamp_timeout(
                parse_var("PAGE_TIMEOUT_SECS", defaults.page_timeout_secs)
                    .map_err(|_| anyhow::anyhow!("PAGE_TIMEOUT_SECS must be a number"))?,
            ),
            search_timeout_secs: clamp_timeout(
                parse_var("SEARCH_TIMEOUT_SECS", defaults.search_timeout_secs)
                    .map_err(|_| anyhow::anyhow!("SEARCH_TIMEOUT_SECS must be a number"))?,
            ),
            registry_timeout_secs: clamp_timeout(
                parse_var("REGISTRY_TIMEOUT_SECS", defaults.registry_timeout_secs)
                    .map_err(|_| anyhow::anyhow!("REGISTRY_TIMEOUT_SECS must be a number"))?,
            ),
            pacing_delay_ms: parse_var("PACING_DELAY_MS", defaults.pacing_delay_ms)
                .map_err(|_| anyhow::anyhow!("PACING_DELAY_MS must be a number"))?,
            notify_webhook_url: optional_var("NOTIFY_WEBHOOK_URL")
                .map(|url| {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("NOTIFY_WEBHOOK_URL must start with http:// or https://");
                    }
                    Ok(url)
                })
                .transpose()?,
            landing_page_path: optional_var("LANDING_PAGE_PATH")
                .unwrap_or(defaults.landing_page_path),
        };

        // Never log the registry credential itself
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!("Target lead count: {}", config.target_lead_count);
        tracing::debug!("Registry Base URL: {}", config.registry_base_url);
        tracing::debug!("Search Engine Base URL: {}", config.search_engine_base_url);
        if config.companies_house_api_key.is_none() {
            tracing::info!("No COMPANIES_HOUSE_API_KEY set, registry lookups will be skipped");
        }
        if let Some(ref webhook) = config.notify_webhook_url {
            tracing::info!("Signup notifications relayed to: {}", webhook);
        }

        Ok(config)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, T::Err> {
    match optional_var(name) {
        Some(raw) => raw.parse(),
        None => Ok(default),
    }
}

fn http_url_var(name: &str, default: String) -> anyhow::Result<String> {
    let url = optional_var(name).unwrap_or(default);
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn clamp_timeout(secs: u64) -> u64 {
    secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
}
