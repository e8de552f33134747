pub mod handler;
pub mod model;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub use handler::{HandlerConfig, ImplicitRules};
pub use model::AppConfig;

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("drilldown")
        .join("config.toml")
}

/// Load the tool configuration from `path`, or from the default location.
/// A missing default file yields the defaults; a missing explicit file is an
/// error.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let path = config_path();
            if !path.exists() {
                return Ok(AppConfig::default());
            }
            path
        }
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// A dashboard: a named set of handler definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub name: String,
    pub handlers: Vec<HandlerConfig>,
}

#[derive(Deserialize)]
struct RawDashboard {
    name: Option<String>,
    #[serde(default)]
    handlers: Vec<Value>,
}

/// Parse dashboard JSON. `fallback_name` is used when the file names none.
pub fn parse_dashboard(text: &str, fallback_name: &str) -> Result<Dashboard> {
    let raw: RawDashboard =
        serde_json::from_str(text).with_context(|| "Failed to parse dashboard JSON")?;
    let handlers = raw
        .handlers
        .iter()
        .enumerate()
        .map(|(i, value)| {
            HandlerConfig::from_value(value).with_context(|| format!("Invalid handler #{}", i))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Dashboard {
        name: raw.name.unwrap_or_else(|| fallback_name.to_string()),
        handlers,
    })
}

pub fn load_dashboard(path: &Path) -> Result<Dashboard> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dashboard from {}", path.display()))?;
    let fallback = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dashboard".to_string());
    parse_dashboard(&text, &fallback)
        .with_context(|| format!("Failed to load dashboard {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_explicit_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(dir.path().join("nope.toml").as_path())).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn test_parse_dashboard() {
        let dashboard = parse_dashboard(
            r#"{"handlers": [
                {"component": "c1", "event": "click", "actions": [{"type": "unset", "token": "t"}]}
            ]}"#,
            "ops",
        )
        .unwrap();
        assert_eq!(dashboard.name, "ops");
        assert_eq!(dashboard.handlers.len(), 1);
    }

    #[test]
    fn test_invalid_handler_names_its_index() {
        let err = parse_dashboard(
            r#"{"name": "x", "handlers": [{"event": "click"}, {"component": "c"}]}"#,
            "x",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid handler #1");
        assert!(format!("{:#}", err).contains("No event name specified"));
    }
}
