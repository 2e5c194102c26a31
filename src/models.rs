use serde::Serialize;

/// Label used whenever a grouping value is missing or blank.
pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    Completed,
    Missed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub origin: Origin,
    pub store_id: String,
    pub submitter: Option<String>,
    pub region: Option<String>,
    pub profit_center: Option<String>,
    pub leader: Option<String>,
    pub store_name: Option<String>,
    pub auditor_name: Option<String>,
    pub completion_pct: Option<f64>,
    pub quality: Option<f64>,
    pub service: Option<f64>,
    pub cleanliness: Option<f64>,
}

impl AuditRecord {
    pub fn submitter_label(&self) -> &str {
        self.submitter.as_deref().unwrap_or(UNASSIGNED)
    }

    pub fn leader_label(&self) -> &str {
        self.leader.as_deref().unwrap_or(UNASSIGNED)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssigneeEntry {
    pub store_id: String,
    pub primary_assignee: String,
}

/// Shape of the group key, shared by every row of one summary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    Submitter,
    SubmitterLeader,
    Assignee,
}

impl Grouping {
    pub fn key_headers(self) -> &'static [&'static str] {
        match self {
            Grouping::Submitter => &["Submitted by"],
            Grouping::SubmitterLeader => &["Submitted by", "Leader"],
            Grouping::Assignee => &["Primary Assignee"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Submitter(String),
    SubmitterLeader { submitter: String, leader: String },
    Assignee(String),
    Total,
}

impl GroupKey {
    /// Cells for the key columns; the Total row fills the first one only.
    pub fn cells(&self, grouping: Grouping) -> Vec<String> {
        let width = grouping.key_headers().len();
        let mut cells = match self {
            GroupKey::Submitter(name) | GroupKey::Assignee(name) => vec![name.clone()],
            GroupKey::SubmitterLeader { submitter, leader } => {
                vec![submitter.clone(), leader.clone()]
            }
            GroupKey::Total => vec!["Total".to_string()],
        };
        cells.resize(width, String::new());
        cells
    }

    pub fn label(&self) -> String {
        match self {
            GroupKey::Submitter(name) | GroupKey::Assignee(name) => name.clone(),
            GroupKey::SubmitterLeader { submitter, leader } => format!("{submitter} / {leader}"),
            GroupKey::Total => "Total".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Red,
    Amber,
    Green,
}

impl Band {
    pub fn classify(completion_pct: f64) -> Band {
        if completion_pct < 50.0 {
            Band::Red
        } else if completion_pct < 90.0 {
            Band::Amber
        } else {
            Band::Green
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub key: GroupKey,
    pub actual: usize,
    pub missed: usize,
    pub target: usize,
    pub completion_pct: u32,
    pub band: Band,
}

impl SummaryRow {
    pub fn is_total(&self) -> bool {
        self.key == GroupKey::Total
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub audited: usize,
    pub missed: usize,
    pub target: usize,
    pub overall_completion_pct: f64,
    pub band: Band,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport {
    pub distinct_stores: usize,
    pub rows: Vec<AuditRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrilldownRow {
    #[serde(rename = "#")]
    pub index: usize,
    #[serde(flatten)]
    pub record: AuditRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub name: &'static str,
    pub values: Vec<usize>,
}

/// Grouped bar chart: one category per summary row, three bars each.
#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceMetric {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageRow {
    pub key: String,
    pub average_completion_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Compliance {
    pub average_completion_pct: Option<f64>,
    pub metrics: Vec<ComplianceMetric>,
    pub by_store: Vec<AverageRow>,
    pub by_submitter: Vec<AverageRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub mode: &'static str,
    pub grouping: Grouping,
    pub chart: Chart,
    pub rows: Vec<SummaryRow>,
    pub metrics: Metrics,
    pub duplicates: DuplicateReport,
    pub drilldown: Option<Vec<DrilldownRow>>,
    pub compliance: Compliance,
    pub warnings: Vec<String>,
}
