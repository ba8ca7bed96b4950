//! The `gradepredict validate` command.

use std::path::PathBuf;

use anyhow::Result;

use gradepredict_core::traits::{AssessmentStore, GradeStore, StudentDirectory};
use gradepredict_core::validation::{lint, Severity};

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let (_, store) = super::open_store(config_path.as_deref())?;

    let assessments = store.assessments().await?;
    let grades = store.all_grades().await?;
    let students = store.student_ids().await?;
    println!(
        "Data: {} ({} assessments, {} students)",
        store.data_dir().display(),
        assessments.len(),
        students.len()
    );

    let findings = lint(&assessments, &grades);
    let mut warnings = 0;
    for finding in &findings {
        let prefix = finding
            .subject
            .as_ref()
            .map(|s| format!("  [{s}]"))
            .unwrap_or_else(|| "  ".to_string());
        let label = match finding.severity {
            Severity::Warning => {
                warnings += 1;
                "WARNING"
            }
            Severity::Info => "INFO",
        };
        println!("{prefix} {label}: {}", finding.message);
    }

    if warnings == 0 {
        println!("All records valid.");
    } else {
        println!("\n{warnings} warning(s) found.");
    }

    Ok(())
}
