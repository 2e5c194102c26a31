use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::columns::{resolve_column, ColumnMap, Role, MAPPING_ASSIGNEE_COLUMN, MAPPING_STORE_COLUMN};
use crate::error::{AuditError, Result};
use crate::loader::Table;
use crate::models::{AssigneeEntry, AuditRecord, DuplicateReport, UNASSIGNED};

/// Keeps the first record for every store id, preserving input order.
pub fn dedupe_first(records: Vec<AuditRecord>) -> Vec<AuditRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.store_id.clone()))
        .collect()
}

/// Rows whose store id occurs more than once, in input order.
pub fn duplicate_stores(records: &[AuditRecord]) -> DuplicateReport {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.store_id.as_str()).or_insert(0) += 1;
    }

    let rows: Vec<AuditRecord> = records
        .iter()
        .filter(|record| counts.get(record.store_id.as_str()).copied().unwrap_or(0) > 1)
        .cloned()
        .collect();
    let distinct_stores = counts.values().filter(|count| **count > 1).count();

    DuplicateReport {
        distinct_stores,
        rows,
    }
}

pub fn store_ids(records: &[AuditRecord]) -> HashSet<&str> {
    records.iter().map(|record| record.store_id.as_str()).collect()
}

/// Restricts `missed` to stores that never appear in `completed`.
pub fn missed_only(completed: &[AuditRecord], missed: Vec<AuditRecord>) -> Vec<AuditRecord> {
    let completed_ids = store_ids(completed);
    let before = missed.len();
    let remaining: Vec<AuditRecord> = missed
        .into_iter()
        .filter(|record| !completed_ids.contains(record.store_id.as_str()))
        .collect();
    debug!(
        before,
        after = remaining.len(),
        "removed missed stores that were also completed"
    );
    remaining
}

/// Equality filters for direct mode. `None` means "All".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub store: Option<String>,
    pub submitter: Option<String>,
    pub region: Option<String>,
    pub profit_center: Option<String>,
    pub leader: Option<String>,
}

impl Filters {
    /// Treats blank values and the literal "All" as no filter.
    pub fn selection(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
    }

    fn active(&self) -> impl Iterator<Item = (Role, &str)> {
        [
            (Role::StoreId, &self.store),
            (Role::Submitter, &self.submitter),
            (Role::Region, &self.region),
            (Role::ProfitCenter, &self.profit_center),
            (Role::Leader, &self.leader),
        ]
        .into_iter()
        .filter_map(|(role, value)| value.as_deref().map(|v| (role, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }

    /// Filters naming a dimension the table does not carry.
    pub fn unavailable(&self, columns: &ColumnMap) -> Vec<Role> {
        self.active()
            .filter(|(role, _)| !columns.has(*role))
            .map(|(role, _)| role)
            .collect()
    }

    /// Drops every filter whose dimension `columns` does not carry.
    pub fn restricted_to(&self, columns: &ColumnMap) -> Filters {
        let keep = |role: Role, value: &Option<String>| {
            value.clone().filter(|_| columns.has(role))
        };
        Filters {
            store: keep(Role::StoreId, &self.store),
            submitter: keep(Role::Submitter, &self.submitter),
            region: keep(Role::Region, &self.region),
            profit_center: keep(Role::ProfitCenter, &self.profit_center),
            leader: keep(Role::Leader, &self.leader),
        }
    }

    /// Applies every active filter whose dimension `columns` carries.
    pub fn apply(&self, records: Vec<AuditRecord>, columns: &ColumnMap) -> Vec<AuditRecord> {
        let active: Vec<(Role, &str)> = self
            .active()
            .filter(|(role, _)| columns.has(*role))
            .collect();
        if active.is_empty() {
            return records;
        }

        records
            .into_iter()
            .filter(|record| {
                active
                    .iter()
                    .all(|(role, wanted)| dimension(record, *role) == Some(*wanted))
            })
            .collect()
    }
}

/// The value a record carries for one filter dimension.
pub fn dimension(record: &AuditRecord, role: Role) -> Option<&str> {
    match role {
        Role::StoreId => Some(record.store_id.as_str()),
        Role::Submitter => record.submitter.as_deref(),
        Role::Region => record.region.as_deref(),
        Role::ProfitCenter => record.profit_center.as_deref(),
        Role::Leader => record.leader.as_deref(),
    }
}

/// Strips a trailing parenthetical: "Jane Doe (Region X)" becomes "Jane Doe".
pub fn extract_assignee(raw: &str) -> String {
    let trimmed = raw.trim();
    let name = match trimmed.rfind('(') {
        Some(open) if trimmed.ends_with(')') => trimmed[..open].trim(),
        _ => trimmed,
    };
    if name.is_empty() {
        UNASSIGNED.to_string()
    } else {
        name.to_string()
    }
}

/// One entry per mapped store, first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssigneeMapping {
    pub entries: Vec<AssigneeEntry>,
}

impl AssigneeMapping {
    pub fn from_table(table: &Table) -> Result<Self> {
        let assignee_col = table
            .column(MAPPING_ASSIGNEE_COLUMN)
            .ok_or(AuditError::MissingMappingColumn {
                column: MAPPING_ASSIGNEE_COLUMN,
            })?;
        // StoreName plays the store-id role; a canonical store header also works.
        let store_col = table
            .column(MAPPING_STORE_COLUMN)
            .or_else(|| {
                resolve_column(Role::StoreId.candidates(), &table.headers)
                    .and_then(|name| table.column(name))
            })
            .ok_or(AuditError::MissingMappingColumn {
                column: MAPPING_STORE_COLUMN,
            })?;

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for row in &table.rows {
            let store_id = row[store_col].as_str();
            if store_id.is_empty() || !seen.insert(store_id.to_string()) {
                continue;
            }
            entries.push(AssigneeEntry {
                store_id: store_id.to_string(),
                primary_assignee: extract_assignee(&row[assignee_col]),
            });
        }

        if entries.is_empty() {
            warn!("assignee mapping has no usable rows");
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Whether a mapped store shows up anywhere in the completed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssigneeOutcome<'a> {
    pub assignee: &'a str,
    pub completed: bool,
}

pub fn resolve_assignees<'a>(
    mapping: &'a AssigneeMapping,
    completed: &[AuditRecord],
) -> Vec<AssigneeOutcome<'a>> {
    let completed_ids = store_ids(completed);
    mapping
        .entries
        .iter()
        .map(|entry| AssigneeOutcome {
            assignee: entry.primary_assignee.as_str(),
            completed: completed_ids.contains(entry.store_id.as_str()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Origin;

    fn record(origin: Origin, store: &str, submitter: &str) -> AuditRecord {
        AuditRecord {
            origin,
            store_id: store.to_string(),
            submitter: Some(submitter.to_string()),
            region: None,
            profit_center: None,
            leader: None,
            store_name: None,
            auditor_name: None,
            completion_pct: None,
            quality: None,
            service: None,
            cleanliness: None,
        }
    }

    fn columns_for(csv_data: &str) -> ColumnMap {
        let table = Table::from_csv_reader(csv_data.as_bytes()).unwrap();
        ColumnMap::resolve(&table, "Completed").unwrap()
    }

    #[test]
    fn dedupe_keeps_first_occurrence_in_order() {
        let mut first = record(Origin::Completed, "S1", "A");
        first.completion_pct = Some(80.0);
        let mut second = record(Origin::Completed, "S1", "B");
        second.completion_pct = Some(20.0);
        let records = vec![first, record(Origin::Completed, "S2", "B"), second];

        let deduped = dedupe_first(records);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].store_id, "S1");
        assert_eq!(deduped[0].submitter.as_deref(), Some("A"));
        assert_eq!(deduped[0].completion_pct, Some(80.0));
        assert_eq!(deduped[1].store_id, "S2");
    }

    #[test]
    fn duplicate_report_lists_every_repeated_row() {
        let records = vec![
            record(Origin::Completed, "S1", "A"),
            record(Origin::Completed, "S2", "B"),
            record(Origin::Completed, "S1", "A"),
            record(Origin::Completed, "S3", "C"),
            record(Origin::Completed, "S3", "A"),
            record(Origin::Completed, "S3", "B"),
        ];
        let report = duplicate_stores(&records);
        assert_eq!(report.distinct_stores, 2);
        assert_eq!(report.rows.len(), 5);
        assert!(report.rows.iter().all(|row| row.store_id != "S2"));
    }

    #[test]
    fn missed_only_never_overlaps_completed() {
        let completed = vec![
            record(Origin::Completed, "S1", "A"),
            record(Origin::Completed, "S2", "B"),
        ];
        let missed = vec![
            record(Origin::Missed, "S2", "B"),
            record(Origin::Missed, "S3", "A"),
            record(Origin::Missed, "S1", "C"),
        ];
        let remaining = missed_only(&completed, missed);
        let completed_ids = store_ids(&completed);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].store_id, "S3");
        assert!(remaining
            .iter()
            .all(|r| !completed_ids.contains(r.store_id.as_str())));
    }

    #[test]
    fn empty_missed_after_reconciliation_is_fine() {
        let completed = vec![record(Origin::Completed, "S1", "A")];
        let missed = vec![record(Origin::Missed, "S1", "A")];
        assert!(missed_only(&completed, missed).is_empty());
    }

    #[test]
    fn all_and_blank_mean_no_filter() {
        assert_eq!(Filters::selection(Some("All".to_string())), None);
        assert_eq!(Filters::selection(Some("  ".to_string())), None);
        assert_eq!(Filters::selection(None), None);
        assert_eq!(
            Filters::selection(Some(" North ".to_string())),
            Some("North".to_string())
        );
    }

    #[test]
    fn filters_apply_only_to_carried_dimensions() {
        let columns = columns_for("Store,Submitted by\nS1,A\n");
        let filters = Filters {
            submitter: Some("A".to_string()),
            region: Some("North".to_string()),
            ..Filters::default()
        };
        let records = vec![
            record(Origin::Completed, "S1", "A"),
            record(Origin::Completed, "S2", "B"),
        ];

        assert_eq!(filters.unavailable(&columns), vec![Role::Region]);
        let effective = filters.restricted_to(&columns);
        assert_eq!(effective.region, None);
        assert_eq!(effective.submitter.as_deref(), Some("A"));
        assert!(!effective.is_empty());
        assert!(Filters::default().is_empty());
        let kept = filters.apply(records, &columns);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].store_id, "S1");
    }

    #[test]
    fn filters_combine_with_and() {
        let columns = columns_for("Store,Submitted by,Region\nS1,A,North\n");
        let mut north_a = record(Origin::Completed, "S1", "A");
        north_a.region = Some("North".to_string());
        let mut south_a = record(Origin::Completed, "S2", "A");
        south_a.region = Some("South".to_string());
        let filters = Filters {
            submitter: Some("A".to_string()),
            region: Some("South".to_string()),
            ..Filters::default()
        };

        let kept = filters.apply(vec![north_a, south_a], &columns);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].store_id, "S2");
    }

    #[test]
    fn extracts_assignee_names() {
        assert_eq!(extract_assignee("Jane Doe (Region X)"), "Jane Doe");
        assert_eq!(extract_assignee("  Bob  "), "Bob");
        assert_eq!(extract_assignee("Ann (A) (B)"), "Ann (A)");
        assert_eq!(extract_assignee("Odd (name"), "Odd (name");
        assert_eq!(extract_assignee(""), "Unassigned");
        assert_eq!(extract_assignee("(Region X)"), "Unassigned");
    }

    #[test]
    fn mapping_requires_its_columns() {
        let table = Table::from_csv_reader("StoreName,Owner\nS1,Jane\n".as_bytes()).unwrap();
        let err = AssigneeMapping::from_table(&table).unwrap_err();
        assert!(matches!(
            err,
            AuditError::MissingMappingColumn { column: "Primary Assignee" }
        ));

        let table = Table::from_csv_reader("Primary Assignee\nJane\n".as_bytes()).unwrap();
        let err = AssigneeMapping::from_table(&table).unwrap_err();
        assert!(matches!(
            err,
            AuditError::MissingMappingColumn { column: "StoreName" }
        ));
    }

    #[test]
    fn mapping_keeps_first_entry_per_store() {
        let csv_data = "\
StoreName,Primary Assignee
S1,Jane (North)
S1,Bob (South)
S2,
";
        let table = Table::from_csv_reader(csv_data.as_bytes()).unwrap();
        let mapping = AssigneeMapping::from_table(&table).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.entries[0].primary_assignee, "Jane");
        assert_eq!(mapping.entries[1].primary_assignee, "Unassigned");
    }

    #[test]
    fn outcomes_mark_completed_stores() {
        let mapping = AssigneeMapping {
            entries: vec![
                AssigneeEntry {
                    store_id: "S1".to_string(),
                    primary_assignee: "Jane".to_string(),
                },
                AssigneeEntry {
                    store_id: "S2".to_string(),
                    primary_assignee: "Jane".to_string(),
                },
            ],
        };
        let completed = vec![record(Origin::Completed, "S1", "Someone Else")];
        let outcomes = resolve_assignees(&mapping, &completed);
        assert!(outcomes[0].completed);
        assert!(!outcomes[1].completed);
    }
}
