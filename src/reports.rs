//! Coverage report generation
//!
//! This module renders scan results and, when an inventory was given,
//! coverage tables in various formats (JSON, Markdown, plain summary).

use std::path::Path;

use serde::Serialize;

use crate::coverage::{CoverageEntry, CoverageSummary};
use crate::scanner::{ApiVersionUsage, ScanFailure, ScanResult};

/// Shown when strict parsing rejected only unversioned imports
pub const LENIENT_HINT: &str = "Every failure is an import without an api version (e.g. \"fmt\"); \
rerun with --lenient or set `mode = \"lenient\"` under [parser] to skip them.";

/// Output formats understood by the report renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Markdown,
    Summary,
}

impl ReportFormat {
    /// Parse a format name; unknown names fall back to the summary
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => ReportFormat::Json,
            "markdown" | "md" => ReportFormat::Markdown,
            _ => ReportFormat::Summary,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    root: String,
    files_parsed: usize,
    api_versions: Vec<ApiVersionUsage>,
    failures: &'a [ScanFailure],
    #[serde(skip_serializing_if = "Option::is_none")]
    coverage: Option<JsonCoverage<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonCoverage<'a> {
    summary: CoverageSummary,
    entries: &'a [CoverageEntry],
}

/// Render a report for the scan of `root`
pub fn render(
    format: ReportFormat,
    root: &Path,
    scan: &ScanResult,
    coverage: Option<&[CoverageEntry]>,
) -> anyhow::Result<String> {
    match format {
        ReportFormat::Json => generate_json_report(root, scan, coverage),
        ReportFormat::Markdown => Ok(generate_markdown_report(root, scan, coverage)),
        ReportFormat::Summary => Ok(generate_summary(root, scan, coverage)),
    }
}

pub fn generate_json_report(
    root: &Path,
    scan: &ScanResult,
    coverage: Option<&[CoverageEntry]>,
) -> anyhow::Result<String> {
    let report = JsonReport {
        root: root.display().to_string(),
        files_parsed: scan.files.len(),
        api_versions: scan.api_versions(),
        failures: &scan.failures,
        coverage: coverage.map(|entries| JsonCoverage {
            summary: CoverageSummary::from_entries(entries),
            entries,
        }),
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn generate_markdown_report(
    root: &Path,
    scan: &ScanResult,
    coverage: Option<&[CoverageEntry]>,
) -> String {
    let usages = scan.api_versions();

    let mut lines = vec![
        "# Resource Coverage Report".to_string(),
        String::new(),
        format!("**Provider**: {}", root.display()),
        format!("**Date**: {}", chrono::Local::now().format("%Y-%m-%d")),
        format!("**Files parsed**: {}", scan.files.len()),
        String::new(),
    ];

    if usages.is_empty() {
        lines.push("## No versioned packages found".to_string());
        lines.push(String::new());
    } else {
        lines.push("## API Versions".to_string());
        lines.push("| Package | API Version | Files |".to_string());
        lines.push("|---------|-------------|-------|".to_string());
        for usage in &usages {
            lines.push(format!(
                "| {} | {} | {} |",
                usage.path,
                usage.api_version,
                usage.files.len()
            ));
        }
        lines.push(String::new());
    }

    if let Some(entries) = coverage {
        let summary = CoverageSummary::from_entries(entries);
        lines.push("## Coverage".to_string());
        lines.push(format!(
            "**Covered**: {}/{} ({:.1}%)",
            summary.covered,
            summary.total,
            summary.percentage()
        ));
        lines.push(String::new());
        lines.push("| Namespace | Resource | API Version | In Terraform |".to_string());
        lines.push("|-----------|----------|-------------|--------------|".to_string());
        for entry in entries {
            lines.push(format!(
                "| {} | {} | {} | {} |",
                entry.namespace,
                entry.resource_name,
                entry.api_version,
                if entry.in_terraform { "✔" } else { "✘" }
            ));
        }
        lines.push(String::new());
    }

    if !scan.failures.is_empty() {
        lines.push("## Failures".to_string());
        lines.push(String::new());
        for failure in &scan.failures {
            lines.push(format!("- `{}`: {}", failure.path.display(), failure.message));
        }
        if scan.only_unversioned_failures() {
            lines.push(String::new());
            lines.push(format!("> {LENIENT_HINT}"));
        }
    }

    lines.join("\n")
}

pub fn generate_summary(
    root: &Path,
    scan: &ScanResult,
    coverage: Option<&[CoverageEntry]>,
) -> String {
    let usages = scan.api_versions();

    let mut lines = vec![
        format!("Import scan results for {}", root.display()),
        String::new(),
        format!("  Files parsed:      {}", scan.files.len()),
        format!("  Files failed:      {}", scan.failures.len()),
        format!("  Package imports:   {}", scan.packages().count()),
        format!("  Distinct packages: {}", usages.len()),
    ];

    if let Some(entries) = coverage {
        let summary = CoverageSummary::from_entries(entries);
        lines.push(format!(
            "  Coverage:          {}/{} ({:.1}%)",
            summary.covered,
            summary.total,
            summary.percentage()
        ));
    }

    lines.push(String::new());
    for failure in &scan.failures {
        lines.push(format!("  ✘ {}", failure.message));
    }

    if scan.only_unversioned_failures() {
        lines.push(String::new());
        lines.push(format!("Hint: {LENIENT_HINT}"));
    }

    lines.join("\n")
}
