//! The `gradepredict record-score` command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;

use gradepredict_core::scoring;
use gradepredict_core::traits::AssessmentStore;

pub async fn execute(
    student_id: String,
    assessment_id: String,
    score: f64,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(score.is_finite(), "score must be a finite number");

    let (_, store) = super::open_store(config_path.as_deref())?;
    let assessment = store
        .assessment(&assessment_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("assessment not found: {assessment_id}"))?;

    let (Some(key), Some(weightage)) = (assessment.column_key(), assessment.weightage) else {
        anyhow::bail!(
            "invalid assessment {}: record has no {}",
            assessment.id,
            assessment.missing_fields().join(" or ")
        );
    };
    let weighted = scoring::normalize(Some(score), assessment.total_marks, weightage)
        .map_err(|e| anyhow::anyhow!("invalid assessment {}: {e}", assessment.id))?;

    if !scoring::raw_score_in_range(score, assessment.total_marks) {
        eprintln!(
            "Warning: score {score} is outside 0..={} for {}",
            assessment.total_marks, assessment.title
        );
    }

    let mut scores = BTreeMap::new();
    scores.insert(key.to_string(), score);
    store.record_scores(&student_id, &scores).await?;

    print!("Recorded {score} / {} for {student_id} under {key}", assessment.total_marks);
    match weighted {
        Some(w) => println!(" (weighted {w:.4})"),
        None => println!(),
    }
    Ok(())
}
