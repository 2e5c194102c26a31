use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::Dashboard;

/// The downloadable summary always carries this name.
pub const EXPORT_FILE_NAME: &str = "audit_summary.csv";

/// Writes the full summary table, Total row included.
pub fn write_summary<W: Write>(writer: W, dashboard: &Dashboard) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = dashboard.grouping.key_headers().to_vec();
    header.extend(["Actual", "Missed", "Target", "Completion %"]);
    csv_writer.write_record(&header)?;

    for row in &dashboard.rows {
        let mut record = row.key.cells(dashboard.grouping);
        record.extend([
            row.actual.to_string(),
            row.missed.to_string(),
            row.target.to_string(),
            row.completion_pct.to_string(),
        ]);
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn export_summary(dashboard: &Dashboard, out_dir: &Path) -> Result<PathBuf> {
    let path = out_dir.join(EXPORT_FILE_NAME);
    let file = std::fs::File::create(&path)?;
    write_summary(file, dashboard)?;
    Ok(path)
}

pub fn to_json(dashboard: &Dashboard) -> Result<String> {
    Ok(serde_json::to_string_pretty(dashboard)?)
}
