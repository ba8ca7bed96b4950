//! The `gradepredict export-training-data` command.

use std::path::PathBuf;

use anyhow::Result;

use gradepredict_core::training::build_training_matrix;
use gradepredict_core::traits::{AssessmentStore, GradeStore, StudentDirectory};
use gradepredict_store::write_training_csv;

pub async fn execute(out: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let (_, store) = super::open_store(config_path.as_deref())?;

    let assessments = store.assessments().await?;
    let grades = store.all_grades().await?;
    let students = store.student_ids().await?;
    anyhow::ensure!(!assessments.is_empty(), "no assessments defined, nothing to export");

    let matrix = build_training_matrix(&students, &assessments, &grades);
    for collision in &matrix.collisions {
        eprintln!(
            "Warning: {} and {} share column {}; keeping {}",
            collision.kept, collision.dropped, collision.column, collision.kept
        );
    }
    for id in &matrix.untyped {
        eprintln!("Warning: {id} has no type; leaving it out");
    }

    write_training_csv(&out, &matrix)?;
    println!(
        "Wrote {} rows x {} columns to {}",
        matrix.rows.len(),
        matrix.columns.len(),
        out.display()
    );
    Ok(())
}
