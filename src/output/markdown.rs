//! Markdown summary generation
//!
//! This module renders a run summary as a short human-readable report.

use crate::output::summary::RunSummary;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report of a run to `output_path`
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Status-Crawler Run Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        summary.duration.as_secs_f64()
    ));
    md.push_str(&format!("- **Config Hash**: `{}`\n", summary.config_hash));
    md.push_str(&format!(
        "- **Drained**: {}\n\n",
        if summary.drained { "yes" } else { "no" }
    ));

    // Counters
    let stats = &summary.stats;
    md.push_str("## Requests\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Submitted | {} |\n", stats.submitted));
    md.push_str(&format!("| Skipped lines | {} |\n", stats.skipped));
    md.push_str(&format!("| Fetched | {} |\n", stats.accepted));
    md.push_str(&format!("| Retries scheduled | {} |\n", stats.retries));
    md.push_str(&format!("| Redirects followed | {} |\n", stats.redirects));
    md.push_str(&format!("| Dropped | {} |\n", stats.total_dropped()));
    md.push_str(&format!("| Needs repair | {} |\n", stats.repaired));
    md.push_str(&format!("| Dispatch failures | {} |\n", stats.dispatch_failures));
    md.push_str(&format!("| Retries refused | {} |\n", stats.retries_refused));
    md.push_str(&format!("| Unresolved | {} |\n\n", summary.unresolved));

    if !stats.dropped.is_empty() {
        md.push_str("## Dropped\n\n");
        for (reason, count) in &stats.dropped {
            md.push_str(&format!("- {}: {}\n", reason, count));
        }
        md.push('\n');
    }

    md.push_str("## Output\n\n");
    md.push_str(&format!("- Records written: {}\n", summary.fetched_written));
    match summary.repair_written {
        Some(count) => md.push_str(&format!("- Repair lines written: {}\n", count)),
        None => md.push_str("- Repair output disabled\n"),
    }

    md
}
