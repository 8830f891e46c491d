/*!
 * Reporting functionality for dirsnap
 *
 * Renders an equality report as a console table (tabled) or as JSON.
 */

use tabled::{
    settings::{object::Columns, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

use crate::error::Result;
use crate::types::EqualityReport;

/// Format of the report output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Console table output
    ConsoleTable,
    /// Pretty-printed JSON
    Json,
}

/// Report generator for comparison results
pub struct Reporter {
    format: ReportFormat,
}

impl Reporter {
    /// Create a new reporter
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Generate a report string for a comparison
    pub fn generate_report(&self, report: &EqualityReport) -> Result<String> {
        match self.format {
            ReportFormat::ConsoleTable => Ok(self.generate_console_report(report)),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        }
    }

    /// Print the report to stdout
    pub fn print_report(&self, report: &EqualityReport) -> Result<()> {
        println!("{}", self.generate_report(report)?);
        Ok(())
    }

    // Truncate long paths from the left, keeping the file name visible
    fn format_path(&self, path: &str, max_len: usize) -> String {
        if path.chars().count() <= max_len {
            return path.to_string();
        }
        let tail: String = path
            .chars()
            .rev()
            .take(max_len.saturating_sub(3))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{}", tail)
    }

    // Create the differences table using the tabled crate
    fn create_differences_table(&self, report: &EqualityReport) -> String {
        #[derive(Tabled)]
        struct DifferenceRow {
            #[tabled(rename = "File Path")]
            path: String,

            #[tabled(rename = "Attribute")]
            attribute: String,

            #[tabled(rename = "Left")]
            left: String,

            #[tabled(rename = "Right")]
            right: String,
        }

        let mut rows = Vec::new();

        for trace in &report.traces {
            for difference in &trace.differences {
                rows.push(DifferenceRow {
                    path: self.format_path(&trace.path, 60),
                    attribute: difference.attribute.label().to_string(),
                    left: difference.left.clone(),
                    right: difference.right.clone(),
                });
            }
        }

        let presence = |path: &String, left: &str, right: &str| DifferenceRow {
            path: self.format_path(path, 60),
            attribute: "Presence".to_string(),
            left: left.to_string(),
            right: right.to_string(),
        };
        rows.extend(
            report
                .only_in_left
                .iter()
                .map(|p| presence(p, "present", "missing")),
        );
        rows.extend(
            report
                .only_in_right
                .iter()
                .map(|p| presence(p, "missing", "present")),
        );

        let mut table = Table::new(rows);
        table
            .with(Style::rounded())
            .with(Padding::new(1, 1, 0, 0))
            .with(Modify::new(Columns::new(..)).with(Alignment::left()));

        table.to_string()
    }

    // Generate a console table report
    fn generate_console_report(&self, report: &EqualityReport) -> String {
        if report.is_equal() {
            return format!(
                "✅  [{}] and [{}] are equal",
                report.left_label, report.right_label
            );
        }

        let title = format!(
            "📋  [{}] vs [{}]: {} different, {} only in [{}], {} only in [{}]",
            report.left_label,
            report.right_label,
            report.traces.len(),
            report.only_in_left.len(),
            report.left_label,
            report.only_in_right.len(),
            report.right_label,
        );

        format!("{}\n{}", title, self.create_differences_table(report))
    }
}
