use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod columns;
mod compliance;
mod error;
mod export;
mod loader;
mod models;
mod pipeline;
mod reconcile;
mod report;

use models::{Band, Dashboard};
use pipeline::{AnalysisRequest, Inputs};
use reconcile::Filters;

#[derive(Parser)]
#[command(name = "audit-dashboard")]
#[command(about = "Reconcile completed and missed store audits into completion summaries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Completed audits (.csv, .xlsx, .xlsm, .xls or .ods)
    #[arg(long, env = "AUDIT_COMPLETED")]
    completed: PathBuf,
    /// Missed audits
    #[arg(long, env = "AUDIT_MISSED")]
    missed: PathBuf,
    /// Store to primary assignee mapping
    #[arg(long, env = "AUDIT_ASSIGNEES")]
    assignees: Option<PathBuf>,
}

#[derive(Args)]
struct AnalysisArgs {
    /// Keep only the first audit for each store
    #[arg(long)]
    one_audit_per_store: bool,
    /// Attribute targets to primary assignees (needs --assignees)
    #[arg(long)]
    by_assignee: bool,
    /// Group by submitter and leader
    #[arg(long)]
    group_by_leader: bool,
    #[arg(long)]
    store: Option<String>,
    #[arg(long)]
    submitter: Option<String>,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    profit_center: Option<String>,
    #[arg(long)]
    leader: Option<String>,
}

impl AnalysisArgs {
    fn into_request(self) -> AnalysisRequest {
        AnalysisRequest {
            dedupe: self.one_audit_per_store,
            by_assignee: self.by_assignee,
            group_by_leader: self.group_by_leader,
            filters: Filters {
                store: Filters::selection(self.store),
                submitter: Filters::selection(self.submitter),
                region: Filters::selection(self.region),
                profit_center: Filters::selection(self.profit_center),
                leader: Filters::selection(self.leader),
            },
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print metrics and the completion summary
    Summary {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = "audit_report.md")]
        out: PathBuf,
    },
    /// Export the summary table as CSV
    Export {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// List the values each filter accepts
    Filters {
        #[arg(long, env = "AUDIT_COMPLETED")]
        completed: PathBuf,
    },
}

fn load_inputs(inputs: &InputArgs, by_assignee: bool) -> anyhow::Result<Inputs> {
    let assignees = match (&inputs.assignees, by_assignee) {
        (Some(path), true) => Some(loader::load("Assignee mapping", path)?),
        (Some(path), false) => {
            debug!(path = %path.display(), "assignee mapping not consulted");
            None
        }
        (None, _) => None,
    };

    Ok(Inputs {
        completed: loader::load("Completed", &inputs.completed)?,
        missed: loader::load("Missed", &inputs.missed)?,
        assignees,
    })
}

fn analyze(inputs: &InputArgs, analysis: AnalysisArgs) -> anyhow::Result<Dashboard> {
    let request = analysis.into_request();
    let inputs = load_inputs(inputs, request.by_assignee)?;
    let dashboard = pipeline::run(&inputs, &request)?;
    info!(rows = dashboard.rows.len(), "summary ready");
    Ok(dashboard)
}

fn paint(text: &str, band: Band) -> String {
    match band {
        Band::Red => text.red().to_string(),
        Band::Amber => text.yellow().to_string(),
        Band::Green => text.green().to_string(),
    }
}

fn print_table(headers: &[String], rows: &[Vec<String>], bands: &[Option<Band>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(headers).bold());
    for (row, band) in rows.iter().zip(bands) {
        let text = line(row.as_slice());
        match band {
            Some(band) => println!("{}", paint(&text, *band)),
            None => println!("{text}"),
        }
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    for warning in &dashboard.warnings {
        println!("[WARNING] {}", warning.yellow());
    }

    let metrics = &dashboard.metrics;
    println!("{} analysis", dashboard.mode);
    println!(
        "Audited {}  Missed {}  Target {}  Completion {}",
        metrics.audited,
        metrics.missed,
        metrics.target,
        paint(&format!("{:.2}%", metrics.overall_completion_pct), metrics.band)
    );
    println!();

    let mut headers: Vec<String> = dashboard
        .grouping
        .key_headers()
        .iter()
        .map(|h| h.to_string())
        .collect();
    headers.extend(["Actual", "Missed", "Target", "Completion %"].map(String::from));
    let rows: Vec<Vec<String>> = dashboard
        .rows
        .iter()
        .map(|row| {
            let mut cells = row.key.cells(dashboard.grouping);
            cells.extend([
                row.actual.to_string(),
                row.missed.to_string(),
                row.target.to_string(),
                format!("{}%", row.completion_pct),
            ]);
            cells
        })
        .collect();
    let bands: Vec<Option<Band>> = dashboard.rows.iter().map(|row| Some(row.band)).collect();
    print_table(&headers, &rows, &bands);

    if dashboard.duplicates.distinct_stores > 0 {
        println!();
        println!(
            "[WARNING] {}",
            format!(
                "{} stores have more than one completed audit ({} rows)",
                dashboard.duplicates.distinct_stores,
                dashboard.duplicates.rows.len()
            )
            .yellow()
        );
    }

    let compliance = &dashboard.compliance;
    if let Some(average) = compliance.average_completion_pct {
        println!();
        println!("Average Completion %: {average:.2}%");
    }
    for metric in &compliance.metrics {
        println!("{}: {:.2}%", metric.label, metric.value);
    }

    if let Some(drilldown) = &dashboard.drilldown {
        println!();
        if drilldown.is_empty() {
            println!("No missed stores.");
        } else {
            println!("Missed stores:");
            let headers = ["#", "Store", "Submitted by", "Region", "Profit Center", "Leader"]
                .map(String::from);
            let rows: Vec<Vec<String>> = drilldown
                .iter()
                .map(|row| {
                    let record = &row.record;
                    vec![
                        row.index.to_string(),
                        record.store_id.clone(),
                        record.submitter.clone().unwrap_or_default(),
                        record.region.clone().unwrap_or_default(),
                        record.profit_center.clone().unwrap_or_default(),
                        record.leader.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            print_table(&headers, &rows, &vec![None; rows.len()]);
        }
    }
}

fn write_report(dashboard: &Dashboard, out: &Path) -> anyhow::Result<()> {
    let generated_at = chrono::Local::now().naive_local();
    let report = report::build_report(dashboard, generated_at);
    std::fs::write(out, report).with_context(|| format!("failed to write {}", out.display()))?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summary {
            inputs,
            analysis,
            format,
        } => {
            let dashboard = analyze(&inputs, analysis)?;
            match format {
                Format::Table => print_dashboard(&dashboard),
                Format::Json => println!("{}", export::to_json(&dashboard)?),
            }
        }
        Commands::Report {
            inputs,
            analysis,
            out,
        } => {
            let dashboard = analyze(&inputs, analysis)?;
            write_report(&dashboard, &out)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export {
            inputs,
            analysis,
            out_dir,
        } => {
            let dashboard = analyze(&inputs, analysis)?;
            let path = export::export_summary(&dashboard, &out_dir)
                .with_context(|| format!("failed to export into {}", out_dir.display()))?;
            println!("Summary exported to {}.", path.display());
        }
        Commands::Filters { completed } => {
            let table = loader::load("Completed", &completed)?;
            for (role, values) in pipeline::filter_options(&table)? {
                println!("{} ({}):", role.label(), values.len());
                println!("  All");
                for value in values {
                    println!("  {value}");
                }
            }
        }
    }

    Ok(())
}
