use anyhow::{anyhow, Context, Result};
use clap::Parser;
use drilldown::app::state::{Dispatch, Effect};
use drilldown::config;
use drilldown::logging::{self, DrilldownLogger};
use drilldown::replay::{Replay, ScriptStep};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Replay scripted component events against a dashboard's drilldown handlers.
#[derive(Parser, Debug)]
#[command(name = "drilldown", version, about)]
struct Cli {
    /// Dashboard definition (JSON)
    dashboard: PathBuf,

    /// JSON-lines event script; stdin when omitted
    #[arg(long)]
    events: Option<PathBuf>,

    /// Config file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

enum ScriptEvent {
    Step { line: usize, step: ScriptStep },
    Invalid { line: usize, error: String },
    Failed(String),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(cli.config.as_deref())?;
    logging::init(&cfg.logging.level);

    let dashboard = config::load_dashboard(&cli.dashboard)?;
    let mut replay = Replay::new(&dashboard, &cfg)
        .with_context(|| format!("Failed to set up dashboard {}", dashboard.name))?;
    let mut drilldown_log = DrilldownLogger::new(&cfg.logging);
    info!(dashboard = %dashboard.name, handlers = dashboard.handlers.len(), "replaying");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ScriptEvent>();

    // Spawn script reader task
    let events = cli.events.clone();
    tokio::spawn(async move {
        if let Err(e) = read_script(events, &event_tx).await {
            let _ = event_tx.send(ScriptEvent::Failed(format!("{:#}", e)));
        }
    });

    // Main event loop: each step settles before the next one is taken
    let mut invalid = 0usize;
    while let Some(event) = event_rx.recv().await {
        match event {
            ScriptEvent::Step { line, step } => {
                let reports = replay.apply(step);
                for report in &reports {
                    drilldown_log.log_dispatch(&dashboard.name, report);
                    print_report(line, report);
                }
            }
            ScriptEvent::Invalid { line, error } => {
                invalid += 1;
                warn!(line, error = %error, "skipping invalid script line");
                eprintln!("line {}: {}", line, error);
            }
            ScriptEvent::Failed(error) => return Err(anyhow!(error)),
        }
    }

    print_tokens("tokens", &replay.tokens());
    print_tokens("submitted", &replay.submitted_tokens());

    if invalid > 0 {
        return Err(anyhow!("{} invalid script line(s)", invalid));
    }
    Ok(())
}

async fn read_script(
    path: Option<PathBuf>,
    tx: &mpsc::UnboundedSender<ScriptEvent>,
) -> Result<()> {
    let input: Box<dyn AsyncRead + Unpin + Send> = match &path {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open event script {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let mut lines = BufReader::new(input).lines();
    let mut number = 0;
    while let Some(line) = lines
        .next_line()
        .await
        .with_context(|| "Failed to read event script")?
    {
        number += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = match ScriptStep::parse(trimmed) {
            Ok(step) => ScriptEvent::Step { line: number, step },
            Err(e) => ScriptEvent::Invalid {
                line: number,
                error: e.to_string(),
            },
        };
        if tx.send(event).is_err() {
            break;
        }
    }
    Ok(())
}

fn print_report(line: usize, report: &Dispatch) {
    for effect in report.navigations() {
        if let Effect::Navigate {
            url,
            new_window,
            target,
        } = effect
        {
            match (*new_window, target) {
                (true, _) => println!("[{}] navigate {} (new window)", line, url),
                (false, Some(target)) => println!("[{}] navigate {} (target {})", line, url, target),
                (false, None) => println!("[{}] navigate {}", line, url),
            }
        }
    }
    for error in &report.errors {
        eprintln!("[{}] {}: {}", line, report.event_name, error);
    }
}

fn print_tokens(label: &str, tokens: &BTreeMap<String, String>) {
    println!("{}:", label);
    for (name, value) in tokens {
        println!("  {}={}", name, value);
    }
}
