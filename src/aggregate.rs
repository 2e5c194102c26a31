use std::collections::BTreeMap;

use crate::models::{
    AuditRecord, Band, Chart, ChartSeries, GroupKey, Grouping, Metrics, SummaryRow,
};
use crate::reconcile::AssigneeOutcome;

/// Whole-number completion for table rows; 0 when there is no target.
pub fn completion_pct(actual: usize, target: usize) -> u32 {
    if target == 0 {
        return 0;
    }
    (actual as f64 / target as f64 * 100.0).round() as u32
}

/// Headline completion, kept to two decimals.
pub fn overall_completion_pct(audited: usize, target: usize) -> f64 {
    if target == 0 {
        return 0.0;
    }
    (audited as f64 / target as f64 * 100.0 * 100.0).round() / 100.0
}

pub fn summary_row(key: GroupKey, actual: usize, missed: usize) -> SummaryRow {
    let target = actual + missed;
    let completion_pct = completion_pct(actual, target);
    SummaryRow {
        key,
        actual,
        missed,
        target,
        completion_pct,
        band: Band::classify(f64::from(completion_pct)),
    }
}

fn direct_key(record: &AuditRecord, grouping: Grouping) -> GroupKey {
    match grouping {
        Grouping::SubmitterLeader => GroupKey::SubmitterLeader {
            submitter: record.submitter_label().to_string(),
            leader: record.leader_label().to_string(),
        },
        _ => GroupKey::Submitter(record.submitter_label().to_string()),
    }
}

/// Counts completed and missed-only records per submitter (or submitter and leader).
pub fn summarize_direct(
    completed: &[AuditRecord],
    missed_only: &[AuditRecord],
    grouping: Grouping,
) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<GroupKey, (usize, usize)> = BTreeMap::new();

    for record in completed {
        groups.entry(direct_key(record, grouping)).or_insert((0, 0)).0 += 1;
    }
    for record in missed_only {
        groups.entry(direct_key(record, grouping)).or_insert((0, 0)).1 += 1;
    }

    groups
        .into_iter()
        .map(|(key, (actual, missed))| summary_row(key, actual, missed))
        .collect()
}

/// Every mapped store counts toward its assignee's target; completed ones toward actual.
pub fn summarize_assignees(outcomes: &[AssigneeOutcome<'_>]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();

    for outcome in outcomes {
        let entry = groups.entry(outcome.assignee).or_insert((0, 0));
        if outcome.completed {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(assignee, (actual, missed))| {
            summary_row(GroupKey::Assignee(assignee.to_string()), actual, missed)
        })
        .collect()
}

/// Appends a Total row recomputed from the sums of the group rows.
pub fn with_total(mut rows: Vec<SummaryRow>) -> Vec<SummaryRow> {
    let actual = rows.iter().map(|row| row.actual).sum();
    let missed = rows.iter().map(|row| row.missed).sum();
    rows.push(summary_row(GroupKey::Total, actual, missed));
    rows
}

pub fn metrics(audited: usize, missed: usize) -> Metrics {
    let target = audited + missed;
    let overall_completion_pct = overall_completion_pct(audited, target);
    Metrics {
        audited,
        missed,
        target,
        overall_completion_pct,
        band: Band::classify(overall_completion_pct),
    }
}

pub fn chart<'a>(rows: impl IntoIterator<Item = &'a SummaryRow>) -> Chart {
    let rows: Vec<&SummaryRow> = rows.into_iter().filter(|row| !row.is_total()).collect();
    Chart {
        categories: rows.iter().map(|row| row.key.label()).collect(),
        series: vec![
            ChartSeries {
                name: "Actual",
                values: rows.iter().map(|row| row.actual).collect(),
            },
            ChartSeries {
                name: "Missed",
                values: rows.iter().map(|row| row.missed).collect(),
            },
            ChartSeries {
                name: "Target",
                values: rows.iter().map(|row| row.target).collect(),
            },
        ],
    }
}
