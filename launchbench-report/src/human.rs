//! Output Formatting
//!
//! Human-readable rendering of a run for terminal display.

use crate::report::RunReport;

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &RunReport) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str(&format!("launchbench results: {}\n", report.meta.target));
    output.push_str(&"=".repeat(60));
    output.push('\n');

    for result in &report.results {
        output.push_str(&format!("  {}\n", result.annotated_key()));
        output.push_str(&format!(
            "      median: {:.2} ms  samples: {}\n",
            result.median_ms, result.sample_count
        ));
        let raw: Vec<String> = result
            .raw_durations_ms
            .iter()
            .map(|ms| format!("{:.1}", ms))
            .collect();
        output.push_str(&format!("      trials: [{}]\n", raw.join(", ")));
    }

    if let Some(timeout) = report.meta.timeout_ms {
        output.push_str(&format!("\ncompletion timeout: {:.0} ms\n", timeout));
    }

    output
}
