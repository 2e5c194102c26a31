//! Canonical column roles and the header names each role is known by.
//!
//! Uploads from different exports name the same column differently
//! ("Store Code", "Store", "Entity Id"). Each role carries an ordered list
//! of candidate headers; the first one present in a table wins.

use tracing::warn;

use crate::error::{AuditError, Result};
use crate::loader::Table;
use crate::models::{AuditRecord, Origin};

pub const COMPLETION_COLUMN: &str = "Completion %";
pub const QUALITY_COLUMN: &str = "QUALITY";
pub const SERVICE_COLUMN: &str = "SERVICE";
pub const CLEANLINESS_COLUMN: &str = "CLEANLINESS";

/// Display names the compliance averages prefer over store id and submitter.
pub const STORE_NAME_COLUMN: &str = "Store Name";
pub const AUDITOR_NAME_COLUMN: &str = "Auditor Name";

pub const MAPPING_ASSIGNEE_COLUMN: &str = "Primary Assignee";
pub const MAPPING_STORE_COLUMN: &str = "StoreName";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    StoreId,
    Submitter,
    Region,
    ProfitCenter,
    Leader,
}

const ROLE_CANDIDATES: [(Role, &[&str]); 5] = [
    (Role::StoreId, &["Store Code", "Store", "Entity Id"]),
    (
        Role::Submitter,
        &["Submitted by", "Submitted By", "Auditor", "Responsible"],
    ),
    (Role::Region, &["Region"]),
    (Role::ProfitCenter, &["Profit Center", "Profit-Center"]),
    (Role::Leader, &["Leader", "Leader_profit_Center"]),
];

impl Role {
    pub fn candidates(self) -> &'static [&'static str] {
        ROLE_CANDIDATES
            .iter()
            .find(|(role, _)| *role == self)
            .map(|(_, candidates)| *candidates)
            .unwrap_or(&[])
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::StoreId => "store",
            Role::Submitter => "submitter",
            Role::Region => "region",
            Role::ProfitCenter => "profit center",
            Role::Leader => "leader",
        }
    }
}

/// Returns the first candidate that appears among `headers`.
pub fn resolve_column<'a>(candidates: &[&str], headers: &'a [String]) -> Option<&'a str> {
    candidates.iter().find_map(|candidate| {
        headers
            .iter()
            .find(|header| header.as_str() == *candidate)
            .map(String::as_str)
    })
}

/// Column positions for every role found in one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub store_id: usize,
    pub submitter: Option<usize>,
    pub region: Option<usize>,
    pub profit_center: Option<usize>,
    pub leader: Option<usize>,
    pub store_name: Option<usize>,
    pub auditor_name: Option<usize>,
    pub completion_pct: Option<usize>,
    pub quality: Option<usize>,
    pub service: Option<usize>,
    pub cleanliness: Option<usize>,
}

impl ColumnMap {
    pub fn resolve(table: &Table, dataset: &'static str) -> Result<Self> {
        let locate = |role: Role| {
            resolve_column(role.candidates(), &table.headers).and_then(|name| table.column(name))
        };

        let store_id = locate(Role::StoreId).ok_or_else(|| AuditError::MissingStoreColumn {
            dataset,
            expected: Role::StoreId.candidates().join(", "),
        })?;

        Ok(Self {
            store_id,
            submitter: locate(Role::Submitter),
            region: locate(Role::Region),
            profit_center: locate(Role::ProfitCenter),
            leader: locate(Role::Leader),
            store_name: table.column(STORE_NAME_COLUMN),
            auditor_name: table.column(AUDITOR_NAME_COLUMN),
            completion_pct: table.column(COMPLETION_COLUMN),
            quality: table.column(QUALITY_COLUMN),
            service: table.column(SERVICE_COLUMN),
            cleanliness: table.column(CLEANLINESS_COLUMN),
        })
    }

    pub fn has(&self, role: Role) -> bool {
        match role {
            Role::StoreId => true,
            Role::Submitter => self.submitter.is_some(),
            Role::Region => self.region.is_some(),
            Role::ProfitCenter => self.profit_center.is_some(),
            Role::Leader => self.leader.is_some(),
        }
    }

    /// Projects table rows into records. Rows without a store id are dropped.
    pub fn records(&self, table: &Table, origin: Origin) -> Vec<AuditRecord> {
        let mut skipped = 0usize;
        let mut records = Vec::with_capacity(table.len());

        for row in &table.rows {
            let text = |idx: Option<usize>| {
                idx.and_then(|i| row.get(i))
                    .filter(|value| !value.is_empty())
                    .cloned()
            };
            let number = |idx: Option<usize>| {
                idx.and_then(|i| row.get(i))
                    .and_then(|value| parse_metric(value))
            };

            let Some(store_id) = text(Some(self.store_id)) else {
                skipped += 1;
                continue;
            };

            records.push(AuditRecord {
                origin,
                store_id,
                submitter: text(self.submitter),
                region: text(self.region),
                profit_center: text(self.profit_center),
                leader: text(self.leader),
                store_name: text(self.store_name),
                auditor_name: text(self.auditor_name),
                completion_pct: number(self.completion_pct),
                quality: number(self.quality),
                service: number(self.service),
                cleanliness: number(self.cleanliness),
            });
        }

        if skipped > 0 {
            warn!(?origin, skipped, "dropped rows without a store identifier");
        }
        records
    }
}

/// Lenient numeric parse: "87.5", " 87.5 % " and "90%" all work; junk is absent.
pub fn parse_metric(value: &str) -> Option<f64> {
    value
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}
