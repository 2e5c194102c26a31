//! One full recomputation: resolve columns, reconcile, aggregate, and
//! assemble everything the presenters need.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::aggregate;
use crate::columns::{ColumnMap, Role};
use crate::compliance;
use crate::error::Result;
use crate::loader::Table;
use crate::models::{Dashboard, DrilldownRow, Grouping, Origin};
use crate::reconcile::{self, AssigneeMapping, Filters};

pub struct Inputs {
    pub completed: Table,
    pub missed: Table,
    pub assignees: Option<Table>,
}

/// Operator choices for one recomputation. Built once, never mutated.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub dedupe: bool,
    pub by_assignee: bool,
    pub group_by_leader: bool,
    pub filters: Filters,
}

#[derive(Debug)]
pub enum AnalysisMode<'a> {
    Direct { filters: &'a Filters, group_by_leader: bool },
    Assignee { mapping: AssigneeMapping },
}

impl AnalysisMode<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::Direct { .. } => "Direct",
            AnalysisMode::Assignee { .. } => "Assignee",
        }
    }
}

/// Assignee mode needs both the toggle and an uploaded mapping.
pub fn select_mode<'a>(
    request: &'a AnalysisRequest,
    assignees: Option<&Table>,
    warnings: &mut Vec<String>,
) -> Result<AnalysisMode<'a>> {
    match (request.by_assignee, assignees) {
        (true, Some(table)) => {
            let mapping = AssigneeMapping::from_table(table)?;
            info!(stores = mapping.len(), "using assignee mapping");
            Ok(AnalysisMode::Assignee { mapping })
        }
        (true, None) => {
            let message = "Assignee analytics requested but no assignee mapping was provided; showing direct analysis".to_string();
            warn!("{message}");
            warnings.push(message);
            Ok(direct(request))
        }
        (false, Some(_)) => {
            debug!("assignee mapping supplied but assignee analytics is off");
            Ok(direct(request))
        }
        (false, None) => Ok(direct(request)),
    }
}

fn direct(request: &AnalysisRequest) -> AnalysisMode<'_> {
    AnalysisMode::Direct {
        filters: &request.filters,
        group_by_leader: request.group_by_leader,
    }
}

pub fn run(inputs: &Inputs, request: &AnalysisRequest) -> Result<Dashboard> {
    let completed_columns = ColumnMap::resolve(&inputs.completed, "Completed")?;
    let missed_columns = ColumnMap::resolve(&inputs.missed, "Missed")?;

    let mut warnings = Vec::new();
    let mode = select_mode(request, inputs.assignees.as_ref(), &mut warnings)?;

    let raw_completed = completed_columns.records(&inputs.completed, Origin::Completed);
    let duplicates = reconcile::duplicate_stores(&raw_completed);
    if duplicates.distinct_stores > 0 {
        warn!(
            stores = duplicates.distinct_stores,
            rows = duplicates.rows.len(),
            "completed data has stores audited more than once"
        );
    }

    let missed = missed_columns.records(&inputs.missed, Origin::Missed);
    let (completed, missed) = if request.dedupe {
        (
            reconcile::dedupe_first(raw_completed),
            reconcile::dedupe_first(missed),
        )
    } else {
        (raw_completed, missed)
    };
    let missed_only = reconcile::missed_only(&completed, missed);

    info!(
        mode = mode.label(),
        completed = completed.len(),
        missed_only = missed_only.len(),
        "reconciled uploads"
    );

    let (grouping, rows, drilldown, compliance) = match &mode {
        AnalysisMode::Direct {
            filters,
            group_by_leader,
        } => {
            for role in filters.unavailable(&completed_columns) {
                let message = format!(
                    "The {} filter was ignored: no such column in the Completed data",
                    role.label()
                );
                warn!("{message}");
                warnings.push(message);
            }
            let effective = filters.restricted_to(&completed_columns);
            for role in effective.unavailable(&missed_columns) {
                let message = format!(
                    "The {} filter was not applied to the Missed data: no such column, every missed store still counts",
                    role.label()
                );
                warn!("{message}");
                warnings.push(message);
            }
            let completed = effective.apply(completed, &completed_columns);
            let missed_only = effective.apply(missed_only, &missed_columns);

            let grouping = if !*group_by_leader {
                Grouping::Submitter
            } else if completed_columns.has(Role::Leader) {
                Grouping::SubmitterLeader
            } else {
                let message =
                    "Leader grouping unavailable: no leader column in the Completed data".to_string();
                warn!("{message}");
                warnings.push(message);
                Grouping::Submitter
            };

            let rows = aggregate::summarize_direct(&completed, &missed_only, grouping);
            let drilldown: Vec<DrilldownRow> = missed_only
                .into_iter()
                .enumerate()
                .map(|(idx, record)| DrilldownRow {
                    index: idx + 1,
                    record,
                })
                .collect();
            (grouping, rows, Some(drilldown), compliance::summarize(&completed))
        }
        AnalysisMode::Assignee { mapping } => {
            if !request.filters.is_empty() {
                let message = "Filters are not applied in assignee analytics".to_string();
                warn!("{message}");
                warnings.push(message);
            }
            let outcomes = reconcile::resolve_assignees(mapping, &completed);
            let rows = aggregate::summarize_assignees(&outcomes);
            (Grouping::Assignee, rows, None, compliance::summarize(&completed))
        }
    };

    let rows = aggregate::with_total(rows);
    let (audited, missed) = rows
        .last()
        .map(|total| (total.actual, total.missed))
        .unwrap_or((0, 0));

    Ok(Dashboard {
        mode: mode.label(),
        grouping,
        chart: aggregate::chart(&rows),
        metrics: aggregate::metrics(audited, missed),
        rows,
        duplicates,
        drilldown,
        compliance,
        warnings,
    })
}

/// Distinct values per filter dimension present in the Completed data.
pub fn filter_options(completed: &Table) -> Result<Vec<(Role, Vec<String>)>> {
    let columns = ColumnMap::resolve(completed, "Completed")?;
    let records = columns.records(completed, Origin::Completed);

    let roles = [
        Role::StoreId,
        Role::Submitter,
        Role::Region,
        Role::ProfitCenter,
        Role::Leader,
    ];
    let options = roles
        .into_iter()
        .filter(|role| columns.has(*role))
        .map(|role| {
            let values: BTreeSet<&str> = records
                .iter()
                .filter_map(|record| reconcile::dimension(record, role))
                .collect();
            (role, values.into_iter().map(str::to_string).collect())
        })
        .collect();

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;
    use crate::models::{Band, GroupKey};

    fn table(csv_data: &str) -> Table {
        Table::from_csv_reader(csv_data.as_bytes()).unwrap()
    }

    fn worked_example() -> Inputs {
        Inputs {
            completed: table("Store Code,Submitted by\nS1,A\nS1,A\nS2,B\n"),
            missed: table("Store Code,Submitted by\nS2,B\nS3,A\n"),
            assignees: None,
        }
    }

    #[test]
    fn direct_mode_reconciles_worked_example() {
        let request = AnalysisRequest {
            dedupe: true,
            ..AnalysisRequest::default()
        };
        let dashboard = run(&worked_example(), &request).unwrap();

        assert_eq!(dashboard.mode, "Direct");
        assert_eq!(dashboard.rows.len(), 3);
        let a = &dashboard.rows[0];
        assert_eq!(a.key, GroupKey::Submitter("A".to_string()));
        assert_eq!((a.actual, a.missed, a.target, a.completion_pct), (1, 1, 2, 50));
        let b = &dashboard.rows[1];
        assert_eq!((b.actual, b.missed, b.target, b.completion_pct), (1, 0, 1, 100));
        assert_eq!(b.band, Band::Green);
        let total = &dashboard.rows[2];
        assert!(total.is_total());
        assert_eq!(
            (total.actual, total.missed, total.target, total.completion_pct),
            (2, 1, 3, 67)
        );

        assert_eq!(dashboard.metrics.audited, 2);
        assert_eq!(dashboard.metrics.missed, 1);
        assert_eq!(dashboard.metrics.target, 3);
        assert_eq!(dashboard.metrics.overall_completion_pct, 66.67);
        assert_eq!(dashboard.metrics.band, Band::Amber);

        let drilldown = dashboard.drilldown.unwrap();
        assert_eq!(drilldown.len(), 1);
        assert_eq!(drilldown[0].index, 1);
        assert_eq!(drilldown[0].record.store_id, "S3");

        assert_eq!(dashboard.duplicates.distinct_stores, 1);
        assert_eq!(dashboard.duplicates.rows.len(), 2);
        assert_eq!(dashboard.chart.categories, vec!["A", "B"]);
    }

    #[test]
    fn without_dedupe_every_audit_counts() {
        let dashboard = run(&worked_example(), &AnalysisRequest::default()).unwrap();
        let a = &dashboard.rows[0];
        assert_eq!((a.actual, a.missed, a.target), (2, 1, 3));
        assert_eq!(dashboard.duplicates.distinct_stores, 1);
    }

    #[test]
    fn every_row_balances() {
        let inputs = Inputs {
            completed: table("Store,Auditor,Leader\nS1,A,L1\nS2,A,L2\nS3,B,L1\nS3,B,L1\n"),
            missed: table("Store,Auditor,Leader\nS4,A,L1\nS3,B,L1\nS5,C,L2\nS5,C,L2\n"),
            assignees: None,
        };
        let request = AnalysisRequest {
            dedupe: true,
            group_by_leader: true,
            ..AnalysisRequest::default()
        };
        let dashboard = run(&inputs, &request).unwrap();
        assert_eq!(dashboard.grouping, Grouping::SubmitterLeader);

        let groups: Vec<_> = dashboard.rows.iter().filter(|r| !r.is_total()).collect();
        let total = dashboard.rows.last().unwrap();
        assert!(dashboard
            .rows
            .iter()
            .all(|row| row.target == row.actual + row.missed));
        assert_eq!(total.actual, groups.iter().map(|r| r.actual).sum::<usize>());
        assert_eq!(total.missed, groups.iter().map(|r| r.missed).sum::<usize>());
        assert_eq!(total.target, 5);
        assert_eq!(total.completion_pct, 60);
    }

    #[test]
    fn filters_apply_to_both_tables() {
        let inputs = Inputs {
            completed: table("Store,Auditor,Region\nS1,A,North\nS2,B,South\n"),
            missed: table("Store,Auditor,Region\nS3,A,North\nS4,B,South\n"),
            assignees: None,
        };
        let request = AnalysisRequest {
            filters: Filters {
                region: Some("North".to_string()),
                leader: Some("L9".to_string()),
                ..Filters::default()
            },
            ..AnalysisRequest::default()
        };
        let dashboard = run(&inputs, &request).unwrap();
        assert_eq!(dashboard.rows.len(), 2);
        assert_eq!(dashboard.rows[0].key, GroupKey::Submitter("A".to_string()));
        assert_eq!(dashboard.metrics.target, 2);
        assert_eq!(dashboard.warnings.len(), 1);
        assert!(dashboard.warnings[0].contains("leader"));
    }

    #[test]
    fn filter_missing_from_missed_data_is_reported() {
        let inputs = Inputs {
            completed: table("Store,Auditor,Leader\nS1,A,L1\nS2,A,L2\n"),
            missed: table("Store,Auditor\nS3,A\nS4,A\nS5,A\n"),
            assignees: None,
        };
        let request = AnalysisRequest {
            filters: Filters {
                leader: Some("L1".to_string()),
                ..Filters::default()
            },
            ..AnalysisRequest::default()
        };
        let dashboard = run(&inputs, &request).unwrap();
        let a = &dashboard.rows[0];
        assert_eq!((a.actual, a.missed, a.target), (1, 3, 4));
        assert_eq!(dashboard.warnings.len(), 1);
        assert!(dashboard.warnings[0].contains("leader"));
        assert!(dashboard.warnings[0].contains("Missed"));
    }

    #[test]
    fn assignee_mode_counts_mapped_stores() {
        let inputs = Inputs {
            completed: table("Store Code,Submitted by\nS1,Someone\n"),
            missed: table("Store Code,Submitted by\nS2,Someone\n"),
            assignees: Some(table(
                "StoreName,Primary Assignee\nS1,Jane (North)\nS2,Jane\nS3,Bob (South)\n",
            )),
        };
        let request = AnalysisRequest {
            by_assignee: true,
            ..AnalysisRequest::default()
        };
        let dashboard = run(&inputs, &request).unwrap();

        assert_eq!(dashboard.mode, "Assignee");
        assert!(dashboard.drilldown.is_none());
        let bob = &dashboard.rows[0];
        assert_eq!(bob.key, GroupKey::Assignee("Bob".to_string()));
        assert_eq!((bob.actual, bob.missed, bob.target, bob.completion_pct), (0, 1, 1, 0));
        let jane = &dashboard.rows[1];
        assert_eq!((jane.actual, jane.missed, jane.target, jane.completion_pct), (1, 1, 2, 50));
        let total = &dashboard.rows[2];
        assert_eq!((total.actual, total.missed, total.target), (1, 2, 3));
    }

    #[test]
    fn assignee_toggle_without_mapping_falls_back() {
        let request = AnalysisRequest {
            by_assignee: true,
            dedupe: true,
            ..AnalysisRequest::default()
        };
        let dashboard = run(&worked_example(), &request).unwrap();
        assert_eq!(dashboard.mode, "Direct");
        assert_eq!(dashboard.warnings.len(), 1);
    }

    #[test]
    fn missing_store_column_halts_the_pipeline() {
        let inputs = Inputs {
            completed: table("Auditor\nA\n"),
            missed: table("Store\nS1\n"),
            assignees: None,
        };
        let err = run(&inputs, &AnalysisRequest::default()).unwrap_err();
        assert!(matches!(
            err,
            AuditError::MissingStoreColumn { dataset: "Completed", .. }
        ));
    }

    #[test]
    fn everything_completed_leaves_nothing_missed() {
        let inputs = Inputs {
            completed: table("Store,Auditor\nS1,A\n"),
            missed: table("Store,Auditor\nS1,A\n"),
            assignees: None,
        };
        let dashboard = run(&inputs, &AnalysisRequest::default()).unwrap();
        assert_eq!(dashboard.metrics.missed, 0);
        assert_eq!(dashboard.metrics.overall_completion_pct, 100.0);
        assert_eq!(dashboard.drilldown.map(|rows| rows.len()), Some(0));
    }

    #[test]
    fn lists_filter_options_from_completed_data() {
        let completed = table("Store,Auditor,Region\nS2,B,North\nS1,A,North\nS1,,South\n");
        let options = filter_options(&completed).unwrap();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0], (Role::StoreId, vec!["S1".to_string(), "S2".to_string()]));
        assert_eq!(options[1].1, vec!["A", "B"]);
        assert_eq!(options[2].1, vec!["North", "South"]);
    }
}
