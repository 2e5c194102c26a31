use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::models::{AuditRecord, Band, Dashboard, Grouping};

fn band_label(band: Band) -> &'static str {
    match band {
        Band::Red => "🔴 red",
        Band::Amber => "🟠 amber",
        Band::Green => "🟢 green",
    }
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn record_line(record: &AuditRecord) -> String {
    format!(
        "| {} | {} | {} | {} | {} |",
        record.store_id,
        opt(&record.submitter),
        opt(&record.region),
        opt(&record.profit_center),
        opt(&record.leader)
    )
}

pub fn build_report(dashboard: &Dashboard, generated_at: NaiveDateTime) -> String {
    let mut output = String::new();
    let metrics = &dashboard.metrics;

    let _ = writeln!(output, "# Store Audit Report");
    let _ = writeln!(
        output,
        "Generated {} ({} analysis)",
        generated_at.format("%Y-%m-%d %H:%M"),
        dashboard.mode
    );

    if !dashboard.warnings.is_empty() {
        let _ = writeln!(output);
        for warning in &dashboard.warnings {
            let _ = writeln!(output, "> ⚠️ {warning}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Headline Metrics");
    let _ = writeln!(output, "- Audited: {}", metrics.audited);
    let _ = writeln!(output, "- Missed: {}", metrics.missed);
    let _ = writeln!(output, "- Target: {}", metrics.target);
    let _ = writeln!(
        output,
        "- Completion: {:.2}% ({})",
        metrics.overall_completion_pct,
        band_label(metrics.band)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Completion Summary");
    let key_headers = dashboard.grouping.key_headers();
    let _ = writeln!(
        output,
        "| {} | Actual | Missed | Target | Completion % | Status |",
        key_headers.join(" | ")
    );
    let _ = writeln!(output, "|{}", "---|".repeat(key_headers.len() + 5));
    for row in &dashboard.rows {
        let mut cells = row.key.cells(dashboard.grouping);
        if row.is_total() {
            cells[0] = "**Total**".to_string();
        }
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {}% | {} |",
            cells.join(" | "),
            row.actual,
            row.missed,
            row.target,
            row.completion_pct,
            band_label(row.band)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Duplicate Audits");
    if dashboard.duplicates.distinct_stores == 0 {
        let _ = writeln!(output, "No store was audited more than once.");
    } else {
        let _ = writeln!(
            output,
            "{} stores have more than one completed audit ({} rows).",
            dashboard.duplicates.distinct_stores,
            dashboard.duplicates.rows.len()
        );
        let _ = writeln!(output);
        let _ = writeln!(output, "| Store | Submitted by | Region | Profit Center | Leader |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for record in &dashboard.duplicates.rows {
            let _ = writeln!(output, "{}", record_line(record));
        }
    }

    if let Some(drilldown) = &dashboard.drilldown {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Missed Stores");
        if drilldown.is_empty() {
            let _ = writeln!(output, "Every expected store has a completed audit.");
        } else {
            let _ = writeln!(
                output,
                "| # | Store | Submitted by | Region | Profit Center | Leader |"
            );
            let _ = writeln!(output, "|---|---|---|---|---|---|");
            for row in drilldown {
                let _ = writeln!(output, "| {} {}", row.index, record_line(&row.record));
            }
        }
    }

    let compliance = &dashboard.compliance;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Compliance");
    if compliance.average_completion_pct.is_none() && compliance.metrics.is_empty() {
        let _ = writeln!(output, "No compliance columns in the completed audits.");
    } else {
        if let Some(average) = compliance.average_completion_pct {
            let _ = writeln!(output, "- Average Completion %: {average:.2}%");
        }
        for metric in &compliance.metrics {
            let _ = writeln!(output, "- {}: {:.2}%", metric.label, metric.value);
        }
    }

    for (title, key_header, rows) in [
        ("Average Completion by Store", "Store", &compliance.by_store),
        (
            "Average Completion by Submitter",
            Grouping::Submitter.key_headers()[0],
            &compliance.by_submitter,
        ),
    ] {
        if rows.is_empty() {
            continue;
        }
        let _ = writeln!(output);
        let _ = writeln!(output, "### {title}");
        let _ = writeln!(output, "| {key_header} | Average Completion % |");
        let _ = writeln!(output, "|---|---|");
        for row in rows {
            let _ = writeln!(output, "| {} | {:.2} |", row.key, row.average_completion_pct);
        }
    }

    output
}
