//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use hotswap_types::{EntrySource, PackageMetadata, PendingUpdate};
use serde::Serialize;
use std::io;

/// Result of one CLI command
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum OperationResult {
    Status(StatusReport),
    Package(PackageMetadata),
    FailedUpdates(Vec<PackageMetadata>),
    Entry(EntryReport),
    Success(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub root: String,
    pub app_version: String,
    pub build_marker: u64,
    pub restart: String,
    pub current: Option<PackageMetadata>,
    pub previous: Option<PackageMetadata>,
    pub pending: Option<PendingUpdate>,
    pub did_update: bool,
    pub need_to_report_rollback: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReport {
    pub from_binary: bool,
    pub path: Option<String>,
}

impl From<EntrySource> for EntryReport {
    fn from(source: EntrySource) -> Self {
        match source {
            EntrySource::Binary => Self {
                from_binary: true,
                path: None,
            },
            EntrySource::Package(path) => Self {
                from_binary: false,
                path: Some(path.display().to_string()),
            },
        }
    }
}

/// Output renderer for CLI results
#[derive(Clone, Copy)]
pub struct OutputRenderer {
    json_output: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }

    pub fn render_result(self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            OperationResult::Status(report) => render_status(report),
            OperationResult::Package(meta) => {
                println!("{}", package_table(std::slice::from_ref(meta)));
            }
            OperationResult::FailedUpdates(failed) if failed.is_empty() => {
                println!("No failed updates recorded.");
            }
            OperationResult::FailedUpdates(failed) => println!("{}", package_table(failed)),
            OperationResult::Entry(entry) => match &entry.path {
                Some(path) => println!("{path}"),
                None => println!("binary"),
            },
            OperationResult::Success(message) => println!("{message}"),
        }
        Ok(())
    }
}

fn render_status(report: &StatusReport) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let pending = report
        .pending
        .as_ref()
        .map(|p| {
            let state = if p.is_loading { "armed" } else { "awaiting first run" };
            format!("{} ({state})", p.hash)
        })
        .unwrap_or_else(|| "-".to_string());

    let rows = [
        ("Root", report.root.clone()),
        ("Binary", format!("{} ({})", report.app_version, report.build_marker)),
        ("Restart", report.restart.clone()),
        ("Current", describe(report.current.as_ref())),
        ("Previous", describe(report.previous.as_ref())),
        ("Pending", pending),
        ("First run", report.did_update.to_string()),
        ("Rollback to report", report.need_to_report_rollback.to_string()),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label).add_attribute(Attribute::Bold), Cell::new(value)]);
    }
    println!("{table}");
}

fn describe(meta: Option<&PackageMetadata>) -> String {
    match meta {
        Some(meta) => match &meta.label {
            Some(label) => format!("{} [{label}]", meta.package_hash),
            None => meta.package_hash.clone(),
        },
        None => "-".to_string(),
    }
}

fn package_table(packages: &[PackageMetadata]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Hash").add_attribute(Attribute::Bold),
            Cell::new("Label").add_attribute(Attribute::Bold),
            Cell::new("App version").add_attribute(Attribute::Bold),
            Cell::new("Bundle").add_attribute(Attribute::Bold),
        ]);

    for meta in packages {
        table.add_row(vec![
            Cell::new(&meta.package_hash),
            Cell::new(meta.label.as_deref().unwrap_or("-")),
            Cell::new(meta.app_version.as_deref().unwrap_or("-")),
            Cell::new(meta.relative_bundle_path.as_deref().unwrap_or("-")),
        ]);
    }
    table
}
