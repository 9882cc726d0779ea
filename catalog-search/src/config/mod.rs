//! Runtime configuration read from the environment.
//!
//! # Environment Variables
//!
//! - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
//! - `CATALOG_SITES`: comma separated sites to manage (default: all)
//! - `CATALOG_PARENT_RELATIONSHIP`: link groups, products and properties (default: false)
//! - `CATALOG_CLEANUP_RETRIES`: extra attempts to delete an old generation (default: 2)
//! - `CATALOG_CLEANUP_RETRY_DELAY_MS`: pause between those attempts (default: 250)
//! - `LOG_FORMAT`: `text` or `json` (default: text)

mod dependencies;

pub use dependencies::{Backend, Dependencies};

use std::env;
use std::time::Duration;

use catalog_search_indexer::LifecycleConfig;
use catalog_search_shared::IndexConfig;

use crate::AppError;

/// Default OpenSearch URL.
pub const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Settings {
    pub opensearch_url: String,
    pub sites: Vec<IndexConfig>,
    pub parent_relationship: bool,
    pub lifecycle: LifecycleConfig,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            opensearch_url: DEFAULT_OPENSEARCH_URL.to_string(),
            sites: IndexConfig::ALL.to_vec(),
            parent_relationship: false,
            lifecycle: LifecycleConfig::default(),
            log_format: LogFormat::Text,
        }
    }
}

impl Settings {
    /// Read settings from the process environment, after loading `.env` if
    /// one exists.
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`; unset or blank variables take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Settings::default();

        if let Some(url) = var("OPENSEARCH_URL") {
            settings.opensearch_url = url;
        }

        if let Some(sites) = var("CATALOG_SITES") {
            settings.sites = parse_sites(&sites)?;
        }

        if let Some(flag) = var("CATALOG_PARENT_RELATIONSHIP") {
            settings.parent_relationship = parse_bool("CATALOG_PARENT_RELATIONSHIP", &flag)?;
        }

        if let Some(retries) = var("CATALOG_CLEANUP_RETRIES") {
            settings.lifecycle.cleanup_retries = retries.parse().map_err(|_| {
                AppError::config(format!("CATALOG_CLEANUP_RETRIES is not a number: {}", retries))
            })?;
        }

        if let Some(delay) = var("CATALOG_CLEANUP_RETRY_DELAY_MS") {
            let millis: u64 = delay.parse().map_err(|_| {
                AppError::config(format!(
                    "CATALOG_CLEANUP_RETRY_DELAY_MS is not a number: {}",
                    delay
                ))
            })?;
            settings.lifecycle.cleanup_retry_delay = Duration::from_millis(millis);
        }

        if let Some(format) = var("LOG_FORMAT") {
            settings.log_format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "pretty" => LogFormat::Text,
                other => {
                    return Err(AppError::config(format!("Unknown LOG_FORMAT: {}", other)));
                }
            };
        }

        Ok(settings)
    }

    /// The configured site with this short name.
    pub fn site(&self, site: &str) -> Result<IndexConfig, AppError> {
        self.sites
            .iter()
            .copied()
            .find(|config| config.site.eq_ignore_ascii_case(site.trim()))
            .ok_or_else(|| AppError::config(format!("Site is not configured: {}", site)))
    }
}

/// Parse a comma separated site list such as `com,nl`.
pub fn parse_sites(value: &str) -> Result<Vec<IndexConfig>, AppError> {
    let mut sites = Vec::new();
    for site in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let config = IndexConfig::for_site(site)
            .ok_or_else(|| AppError::config(format!("Unknown site: {}", site)))?;
        if !sites.contains(&config) {
            sites.push(config);
        }
    }

    if sites.is_empty() {
        return Err(AppError::config("No sites configured"));
    }
    Ok(sites)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, AppError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(AppError::config(format!("{} is not a boolean: {}", key, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[]).unwrap();

        assert_eq!(settings.opensearch_url, DEFAULT_OPENSEARCH_URL);
        assert_eq!(settings.sites, IndexConfig::ALL.to_vec());
        assert!(!settings.parent_relationship);
        assert_eq!(settings.lifecycle.cleanup_retries, 2);
        assert_eq!(settings.lifecycle.cleanup_retry_delay, Duration::from_millis(250));
        assert_eq!(settings.log_format, LogFormat::Text);
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("OPENSEARCH_URL", "http://search:9200"),
            ("CATALOG_SITES", "nl, com, nl"),
            ("CATALOG_PARENT_RELATIONSHIP", "TRUE"),
            ("CATALOG_CLEANUP_RETRIES", "5"),
            ("CATALOG_CLEANUP_RETRY_DELAY_MS", "10"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(settings.opensearch_url, "http://search:9200");
        assert_eq!(
            settings.sites,
            vec![IndexConfig::NL_WEBSITE, IndexConfig::COM_WEBSITE]
        );
        assert!(settings.parent_relationship);
        assert_eq!(settings.lifecycle.cleanup_retries, 5);
        assert_eq!(settings.lifecycle.cleanup_retry_delay, Duration::from_millis(10));
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let settings = settings(&[("OPENSEARCH_URL", "  "), ("CATALOG_SITES", "")]).unwrap();
        assert_eq!(settings.opensearch_url, DEFAULT_OPENSEARCH_URL);
        assert_eq!(settings.sites.len(), 2);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            settings(&[("CATALOG_SITES", "com,de")]),
            Err(AppError::ConfigError(_))
        ));
        assert!(settings(&[("CATALOG_SITES", " , ")]).is_err());
        assert!(settings(&[("CATALOG_PARENT_RELATIONSHIP", "maybe")]).is_err());
        assert!(settings(&[("CATALOG_CLEANUP_RETRIES", "-1")]).is_err());
        assert!(settings(&[("LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn test_site_lookup() {
        let settings = settings(&[("CATALOG_SITES", "com")]).unwrap();
        assert_eq!(settings.site("COM").unwrap(), IndexConfig::COM_WEBSITE);
        assert!(settings.site("nl").is_err());
    }
}
