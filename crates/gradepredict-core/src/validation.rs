//! Consistency checks over assessment definitions and recorded grades.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{Assessment, ColumnKey, GradeRow};
use crate::scoring;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Info,
}

/// A lint finding.
#[derive(Debug, Clone, PartialEq)]
pub struct LintWarning {
    pub severity: Severity,
    /// Assessment or student the finding is about, if any.
    pub subject: Option<String>,
    pub message: String,
}

impl LintWarning {
    fn warning(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            subject: Some(subject.into()),
            message: message.into(),
        }
    }
}

/// Check assessments and grades for problems that would break or skew predictions.
pub fn lint(assessments: &[Assessment], grades: &BTreeMap<String, GradeRow>) -> Vec<LintWarning> {
    let mut warnings = Vec::new();

    for a in assessments {
        let missing = a.missing_fields();
        if !missing.is_empty() {
            warnings.push(LintWarning::warning(
                &a.id,
                format!("record has no {}, cannot be scored", missing.join(" or ")),
            ));
        }
        if let Err(e) = scoring::check_assessment(a.total_marks, a.weightage.unwrap_or(0.0)) {
            warnings.push(LintWarning::warning(&a.id, e.to_string()));
        }
    }

    let mut by_key: HashMap<ColumnKey, Vec<&str>> = HashMap::new();
    for a in assessments {
        if let Some(key) = a.column_key() {
            by_key.entry(key).or_default().push(&a.id);
        }
    }
    let mut collided: Vec<_> = by_key.into_iter().filter(|(_, ids)| ids.len() > 1).collect();
    collided.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, ids) in collided {
        warnings.push(LintWarning::warning(
            key.as_str(),
            format!("column key shared by assessments {}", ids.join(", ")),
        ));
    }

    let known_keys: HashSet<String> = assessments
        .iter()
        .flat_map(|a| {
            a.column_key()
                .map(|k| k.as_str().to_string())
                .into_iter()
                .chain([a.id.clone()])
        })
        .collect();

    for (student_id, row) in grades {
        for a in assessments {
            if let Some(raw) = row.score_for(a) {
                if !scoring::raw_score_in_range(raw, a.total_marks) {
                    warnings.push(LintWarning::warning(
                        student_id,
                        format!(
                            "score {raw} for {} is outside 0..={}",
                            a.column_key().map_or_else(|| a.id.clone(), |k| k.to_string()),
                            a.total_marks
                        ),
                    ));
                }
            }
        }
        for (key, _) in row.iter() {
            if !known_keys.contains(key) {
                warnings.push(LintWarning::warning(
                    student_id,
                    format!("grade key {key} matches no assessment"),
                ));
            }
        }
    }

    if !assessments.is_empty() {
        let total: f64 = assessments.iter().filter_map(|a| a.weightage).sum();
        if (total - 100.0).abs() > 1e-6 {
            warnings.push(LintWarning {
                severity: Severity::Info,
                subject: None,
                message: format!("weightages sum to {total}, not 100"),
            });
        }
    }

    warnings
}
