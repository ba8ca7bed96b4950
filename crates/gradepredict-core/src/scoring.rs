//! Score normalizer.
//!
//! Turns a raw score into a weighted fraction:
//! `(raw / total_marks) * (weightage / 100)`.

use thiserror::Error;

/// Reasons an assessment cannot produce a weighted score.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("total marks must be a positive number, got {0}")]
    NonPositiveTotal(f64),

    #[error("weightage must be between 0 and 100, got {0}")]
    WeightageOutOfRange(f64),

    #[error("score is not a finite number: {0}")]
    NonFiniteScore(f64),
}

/// Check that an assessment's marks and weightage can be normalized against.
pub fn check_assessment(total_marks: f64, weightage: f64) -> Result<(), ScoreError> {
    if !total_marks.is_finite() || total_marks <= 0.0 {
        return Err(ScoreError::NonPositiveTotal(total_marks));
    }
    if !weightage.is_finite() || !(0.0..=100.0).contains(&weightage) {
        return Err(ScoreError::WeightageOutOfRange(weightage));
    }
    Ok(())
}

/// Compute the weighted score for one recorded grade.
///
/// An absent raw score yields `Ok(None)`: unavailable, not zero.
/// The assessment is validated even when the score is absent.
pub fn normalize(
    raw_score: Option<f64>,
    total_marks: f64,
    weightage: f64,
) -> Result<Option<f64>, ScoreError> {
    check_assessment(total_marks, weightage)?;

    let Some(raw) = raw_score else {
        return Ok(None);
    };
    if !raw.is_finite() {
        return Err(ScoreError::NonFiniteScore(raw));
    }

    let weighted = (raw / total_marks) * (weightage / 100.0);
    // Huge raw scores over tiny totals overflow; JSON would carry them as null.
    if !weighted.is_finite() {
        return Err(ScoreError::NonFiniteScore(weighted));
    }
    Ok(Some(weighted))
}

/// Raw score as a fraction of total marks, without weighting.
///
/// Returns 0 when total marks is not positive.
pub fn fraction_of_total(raw_score: f64, total_marks: f64) -> f64 {
    if total_marks.is_finite() && total_marks > 0.0 {
        raw_score / total_marks
    } else {
        0.0
    }
}

/// Whether a stored raw score lies within `[0, total_marks]`.
pub fn raw_score_in_range(raw_score: f64, total_marks: f64) -> bool {
    (0.0..=total_marks).contains(&raw_score)
}
