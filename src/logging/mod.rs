//! Diagnostics and the drilldown audit log.
//!
//! Diagnostics go through `tracing`. When enabled, the audit log appends
//! every dispatch of a dashboard to daily files named `<dashboard>_<date>.log`
//! in the configured log directory (default: `~/.local/share/drilldown/logs/`).

use crate::app::state::{Dispatch, Effect};
use crate::config::model::LoggingConfig;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over `level`.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Writes dispatch reports to per-dashboard daily log files.
///
/// File handles are cached for the lifetime of the logger. A file that cannot
/// be opened is reported once and its lines are dropped.
pub struct DrilldownLogger {
    enabled: bool,
    log_dir: PathBuf,
    file_handles: HashMap<String, Option<fs::File>>,
}

impl DrilldownLogger {
    pub fn new(config: &LoggingConfig) -> Self {
        Self {
            enabled: config.drilldown_log,
            log_dir: expand_home(&config.log_dir),
            file_handles: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append one line per effect and error of `dispatch`. Dispatches where
    /// nothing matched are logged as a single line.
    pub fn log_dispatch(&mut self, dashboard: &str, dispatch: &Dispatch) {
        if !self.enabled {
            return;
        }

        let lines = format_dispatch(dispatch);

        // Sanitize dashboard name for filename
        let safe_name: String = dashboard
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
            .collect();

        let date = dispatch.at.format("%Y-%m-%d").to_string();
        let filename = format!("{}_{}.log", safe_name, date);
        let filepath = self.log_dir.join(&filename);
        let log_dir = &self.log_dir;

        let handle = self.file_handles.entry(filename).or_insert_with(|| {
            let opened = fs::create_dir_all(log_dir).and_then(|_| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&filepath)
            });
            match opened {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(path = %filepath.display(), error = %e, "cannot open drilldown log");
                    None
                }
            }
        });

        if let Some(file) = handle {
            for line in lines {
                let _ = writeln!(file, "{}", line);
            }
        }
    }
}

fn format_dispatch(dispatch: &Dispatch) -> Vec<String> {
    let time = dispatch.at.format("%H:%M:%S");
    let source = format!(
        "{}@{}",
        dispatch.event_name,
        dispatch.component_id.as_deref().unwrap_or("-")
    );

    let Some(index) = dispatch.matched else {
        return vec![format!("[{}] {} no match", time, source)];
    };

    let mut lines = Vec::with_capacity(dispatch.effects.len() + dispatch.errors.len());
    for effect in &dispatch.effects {
        let text = match effect {
            Effect::TokenSet {
                token,
                value,
                submitted,
            } => format!("set {}={:?}{}", token, value, scope_marker(*submitted)),
            Effect::TokenUnset { token, submitted } => {
                format!("unset {}{}", token, scope_marker(*submitted))
            }
            Effect::Navigate {
                url,
                new_window,
                target,
            } => match (*new_window, target) {
                (true, _) => format!("link {} (new window)", url),
                (false, Some(target)) => format!("link {} (target {})", url, target),
                (false, None) => format!("link {}", url),
            },
        };
        lines.push(format!("[{}] {} #{} {}", time, source, index, text));
    }
    for error in &dispatch.errors {
        lines.push(format!("[{}] {} #{} !!! {}", time, source, index, error));
    }
    lines
}

fn scope_marker(submitted: bool) -> &'static str {
    if submitted {
        " [submitted]"
    } else {
        ""
    }
}

fn expand_home(dir: &str) -> PathBuf {
    match dir.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(dir)),
        None => PathBuf::from(dir),
    }
}
