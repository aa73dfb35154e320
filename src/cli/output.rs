//! CLI output.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::config::{ModelConfig, ScenarioConfig};
use crate::error::{SimError, SimResult};
use crate::models::ScenarioReport;

/// Render a report as text or pretty JSON.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub fn render_report(report: &ScenarioReport, json: bool) -> SimResult<String> {
    if json {
        let mut text = serde_json::to_string_pretty(report)
            .map_err(|e| SimError::serialization(e.to_string()))?;
        text.push('\n');
        Ok(text)
    } else {
        Ok(format!("{report}\n"))
    }
}

/// Write rendered report text to `output`, or to stdout when no file is given.
///
/// # Errors
///
/// Returns error if the file or stdout cannot be written.
pub fn write_report(text: &str, output: Option<&Path>) -> SimResult<()> {
    match output {
        Some(path) => {
            fs::write(path, text)?;
            info!(path = %path.display(), "report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// One-paragraph description of a validated scenario.
#[must_use]
pub fn describe_scenario(config: &ScenarioConfig) -> String {
    let name = config.name.as_deref().unwrap_or("(unnamed)");
    let seed = config
        .seed
        .map_or_else(|| "entropy".to_string(), |s| s.to_string());

    let detail = match &config.model {
        ModelConfig::Queue(p) => format!(
            "queue: mean interarrival {}, mean service {}, {} delays, limit {}",
            p.mean_interarrival, p.mean_service, p.num_delays_required, p.queue_limit
        ),
        ModelConfig::Inventory(p) => format!(
            "inventory: {} months, {} demand sizes, {} policies",
            p.num_months,
            p.demand_distribution.len(),
            p.policies.len()
        ),
    };

    format!(
        "Scenario {name} (schema {}, seed {seed})\n  {detail}",
        config.schema_version
    )
}
