use std::collections::BTreeMap;

use crate::columns::{CLEANLINESS_COLUMN, QUALITY_COLUMN, SERVICE_COLUMN};
use crate::models::{AuditRecord, AverageRow, Compliance, ComplianceMetric};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(round2(sum / count as f64))
    }
}

/// "QUALITY" becomes "Quality Compliance".
fn compliance_label(column: &str) -> String {
    let lower = column.to_lowercase();
    let mut chars = lower.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{capitalized} Compliance")
}

fn averages_by<'a>(
    records: &'a [AuditRecord],
    key: impl Fn(&'a AuditRecord) -> &'a str,
) -> Vec<AverageRow> {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in records {
        if let Some(pct) = record.completion_pct {
            let entry = groups.entry(key(record)).or_insert((0.0, 0));
            entry.0 += pct;
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(key, (sum, count))| AverageRow {
            key: key.to_string(),
            average_completion_pct: round2(sum / count as f64),
        })
        .collect()
}

/// Averages over completed audits. Absent columns yield no entry.
pub fn summarize(completed: &[AuditRecord]) -> Compliance {
    let fields: [(&str, fn(&AuditRecord) -> Option<f64>); 3] = [
        (QUALITY_COLUMN, |r: &AuditRecord| r.quality),
        (SERVICE_COLUMN, |r: &AuditRecord| r.service),
        (CLEANLINESS_COLUMN, |r: &AuditRecord| r.cleanliness),
    ];

    let metrics = fields
        .iter()
        .filter_map(|(column, field)| {
            mean(completed.iter().filter_map(field)).map(|value| ComplianceMetric {
                label: compliance_label(column),
                value,
            })
        })
        .collect();

    Compliance {
        average_completion_pct: mean(completed.iter().filter_map(|r| r.completion_pct)),
        metrics,
        by_store: averages_by(completed, |r| {
            r.store_name.as_deref().unwrap_or(r.store_id.as_str())
        }),
        by_submitter: averages_by(completed, |r| {
            r.auditor_name.as_deref().unwrap_or_else(|| r.submitter_label())
        }),
    }
}
