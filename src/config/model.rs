//! Configuration data model.
//!
//! All structs derive `Serialize`/`Deserialize` for TOML persistence.
//! Every field has a default so a missing or partial file still works.

use crate::navigation::PageContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root tool configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
}

/// The page dashboards are assumed to be rendered in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Application mount point prepended to server-relative links.
    #[serde(default = "default_url_root")]
    pub url_root: String,
    /// Locale segment of application URLs. Empty disables it.
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Current page path. A path ending in `/edit` puts links in edit mode.
    #[serde(default)]
    pub location: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            url_root: default_url_root(),
            locale: default_locale(),
            location: String::new(),
        }
    }
}

impl From<PageConfig> for PageContext {
    fn from(page: PageConfig) -> Self {
        PageContext {
            url_root: page.url_root,
            locale: Some(page.locale).filter(|l| !l.is_empty()),
            location: page.location,
        }
    }
}

/// Diagnostics and drilldown log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,
    /// Append every dispatch to daily log files.
    #[serde(default)]
    pub drilldown_log: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            drilldown_log: false,
            log_dir: default_log_dir(),
        }
    }
}

/// Token state the page starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokensConfig {
    /// Written to both scopes before the first event.
    #[serde(default)]
    pub initial: BTreeMap<String, String>,
    /// Whether the page keeps a separate submitted scope.
    #[serde(default = "default_true")]
    pub submitted_scope: bool,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            initial: BTreeMap::new(),
            submitted_scope: true,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_url_root() -> String {
    "/".to_string()
}
fn default_locale() -> String {
    "en-US".to_string()
}
fn default_level() -> String {
    "warn".to_string()
}
fn default_log_dir() -> String {
    "~/.local/share/drilldown/logs".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.page.url_root, "/");
        assert!(config.tokens.submitted_scope);
        assert!(!config.logging.drilldown_log);
    }

    #[test]
    fn test_partial_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [page]
            url_root = "/splunk"
            locale = ""
            location = "/app/search/ops/edit"

            [tokens]
            submitted_scope = false
            initial = { env = "prod" }
            "#,
        )
        .unwrap();
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.tokens.initial.get("env").map(String::as_str), Some("prod"));
        assert!(!config.tokens.submitted_scope);

        let page = PageContext::from(config.page);
        assert_eq!(page.locale, None);
        assert!(page.is_edit_mode());
        assert_eq!(page.make_url("/app/x"), "/splunk/app/x");
    }
}
