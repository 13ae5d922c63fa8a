use tabled::{settings::Style, Table, Tabled};
use crate::migrations::MigrationOutcome;
use crate::pipeline::{DocumentFailure, MigrationSummary};
use crate::storage::DbStats;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Document")]
    path: String,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Cause")]
    reason: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) -> &mut Self {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn summary_table(summary: &MigrationSummary) -> String {
    let mut builder = TableBuilder::new();
    builder
        .add_row("Type folders", summary.groups)
        .add_row("Processed", summary.processed)
        .add_row("Inserted", summary.inserted)
        .add_row("Updated", summary.updated)
        .add_row("Errors", summary.errors);
    builder.build()
}

pub fn outcome_table(outcome: &MigrationOutcome) -> String {
    let mut builder = TableBuilder::new();
    builder
        .add_row("Marked as applied", outcome.marked.len())
        .add_row("Executed", outcome.executed.len())
        .add_row("Statements", outcome.statements);
    builder.build()
}

pub fn stats_table(stats: &DbStats) -> String {
    let mut builder = TableBuilder::new();
    builder
        .add_row("Content", stats.content)
        .add_row("Tags", stats.tags)
        .add_row("Tag links", stats.content_tags)
        .add_row("Migrations", stats.migrations);
    builder.build()
}

pub fn failures_table(failures: &[DocumentFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let rows: Vec<FailureRow> = failures
        .iter()
        .map(|f| FailureRow {
            path: f.path.display().to_string(),
            stage: f.stage.to_string(),
            reason: f.reason.clone(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}
