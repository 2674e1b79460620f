use anyhow::{Context, Result};
use serde::Serialize;
use shiptrack_core::config::{AppConfig, LoadOptions};
use shiptrack_core::domain::rating::RatingLogEntry;
use shiptrack_store::{CsvRatingLog, RatingLog};

use crate::commands::{CommandResult, FailureClass};

#[derive(Debug, Serialize)]
struct RatingsReport<'a> {
    command: &'static str,
    path: String,
    total: usize,
    entries: &'a [RatingLogEntry],
}

pub fn run(limit: usize, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("ratings", FailureClass::ConfigValidation, &error.to_string())
        }
    };

    let entries = match read_entries(&config) {
        Ok(entries) => entries,
        Err(error) => {
            return CommandResult::failure("ratings", FailureClass::RatingLog, &format!("{error:#}"))
        }
    };

    if entries.is_empty() && !json_output {
        return CommandResult::notice("ratings", &config.ratings.path, "rating log has no entries");
    }

    let shown = &entries[entries.len().saturating_sub(limit)..];
    let output = if json_output {
        let report = RatingsReport {
            command: "ratings",
            path: config.ratings.path.display().to_string(),
            total: entries.len(),
            entries: shown,
        };
        match serde_json::to_string(&report) {
            Ok(output) => output,
            Err(error) => {
                return CommandResult::failure("ratings", FailureClass::Serialization, &error.to_string())
            }
        }
    } else {
        render_human(shown, entries.len())
    };

    CommandResult::printed(output)
}

fn read_entries(config: &AppConfig) -> Result<Vec<RatingLogEntry>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;
    let log = CsvRatingLog::new(&config.ratings.path);
    runtime
        .block_on(log.entries())
        .with_context(|| format!("failed to read `{}`", config.ratings.path.display()))
}

fn render_human(entries: &[RatingLogEntry], total: usize) -> String {
    let mut lines = vec![format!("showing {} of {total} ratings", entries.len())];
    for entry in entries {
        let summary = if entry.is_summarized() {
            format!("{} [{}]", entry.summary, if entry.sentiment.is_empty() { "-" } else { entry.sentiment.as_str() })
        } else {
            "<not summarized>".to_string()
        };
        lines.push(format!("- {} {} rated {}: {summary}", entry.timestamp, entry.user_id, entry.rating));
    }
    lines.join("\n")
}
