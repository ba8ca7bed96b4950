//! CSV export of the training matrix.

use std::path::Path;

use anyhow::{Context, Result};

use gradepredict_core::training::TrainingMatrix;

/// Write `student_id,<column keys...>` followed by one row per student.
pub fn write_training_csv(path: &Path, matrix: &TrainingMatrix) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    let mut header = Vec::with_capacity(matrix.columns.len() + 1);
    header.push("student_id".to_string());
    header.extend(matrix.columns.iter().map(|c| c.to_string()));
    writer.write_record(&header)?;

    for row in &matrix.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.student_id.clone());
        record.extend(row.values.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }

    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
