//! Training-data matrix for the external model trainer.
//!
//! One row per student, one column per assessment. Each cell is the raw
//! score as a fraction of total marks (unweighted), 0 when unrecorded.

use std::collections::{BTreeMap, HashMap};

use crate::model::{Assessment, ColumnKey, GradeRow};
use crate::scoring::fraction_of_total;

/// Two assessments mapping to the same column key.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCollision {
    pub column: ColumnKey,
    /// Assessment whose scores fill the column (the later one in store order).
    pub kept: String,
    /// Assessment left out of the matrix.
    pub dropped: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub student_id: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingMatrix {
    pub columns: Vec<ColumnKey>,
    pub rows: Vec<TrainingRow>,
    pub collisions: Vec<ColumnCollision>,
    /// Assessments without a type, which have no column.
    pub untyped: Vec<String>,
}

impl TrainingMatrix {
    /// Value for a student and column, if both exist.
    pub fn value(&self, student_id: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c.as_str() == column)?;
        let row = self.rows.iter().find(|r| r.student_id == student_id)?;
        row.values.get(col).copied()
    }
}

/// Build the matrix from students, assessments, and grades.
pub fn build_training_matrix(
    student_ids: &[String],
    assessments: &[Assessment],
    grades: &BTreeMap<String, GradeRow>,
) -> TrainingMatrix {
    let mut columns = Vec::new();
    let mut included: Vec<&Assessment> = Vec::new();
    let mut position: HashMap<ColumnKey, usize> = HashMap::new();
    let mut collisions = Vec::new();
    let mut untyped = Vec::new();

    for assessment in assessments {
        let Some(key) = assessment.column_key() else {
            tracing::warn!(assessment = %assessment.id, "assessment has no type, leaving it out");
            untyped.push(assessment.id.clone());
            continue;
        };
        // A later assessment takes over the column but keeps its position.
        if let Some(&index) = position.get(&key) {
            let dropped = included[index].id.clone();
            tracing::warn!(column = %key, kept = %assessment.id, %dropped, "column key collision");
            collisions.push(ColumnCollision {
                column: key,
                kept: assessment.id.clone(),
                dropped,
            });
            included[index] = assessment;
            continue;
        }
        position.insert(key.clone(), columns.len());
        columns.push(key);
        included.push(assessment);
    }

    let empty = GradeRow::new();
    let rows = student_ids
        .iter()
        .map(|student_id| {
            let row = grades.get(student_id).unwrap_or(&empty);
            let values = included
                .iter()
                .map(|a| {
                    row.score_for(a)
                        .map(|raw| fraction_of_total(raw, a.total_marks))
                        .unwrap_or(0.0)
                })
                .collect();
            TrainingRow {
                student_id: student_id.clone(),
                values,
            }
        })
        .collect();

    TrainingMatrix {
        columns,
        rows,
        collisions,
        untyped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssessmentKind;

    fn assessment(id: &str, kind: AssessmentKind, total: f64) -> Assessment {
        let mut a = Assessment::new(id, kind, total, 10.0);
        a.id = id.to_string();
        a
    }

    #[test]
    fn cells_hold_unweighted_fractions() {
        let assessments = vec![
            assessment("abc12345", AssessmentKind::Quiz, 50.0),
            assessment("fin00001", AssessmentKind::Exam, 100.0),
        ];
        let mut row = GradeRow::new();
        row.insert("Quiz_abc12", Some(40.0));
        // Keyed by full id, as the export of older records did.
        row.insert("fin00001", Some(75.0));
        let mut grades = BTreeMap::new();
        grades.insert("s-1".to_string(), row);

        let students = vec!["s-1".to_string(), "s-2".to_string()];
        let matrix = build_training_matrix(&students, &assessments, &grades);

        let names: Vec<&str> = matrix.columns.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["Quiz_abc12", "Exam_fin00"]);
        assert_eq!(matrix.value("s-1", "Quiz_abc12"), Some(0.8));
        assert_eq!(matrix.value("s-1", "Exam_fin00"), Some(0.75));
        assert_eq!(matrix.value("s-2", "Quiz_abc12"), Some(0.0));
        assert!(matrix.collisions.is_empty());
    }

    #[test]
    fn zero_total_marks_yields_zero_cells() {
        let assessments = vec![assessment("zz000000", AssessmentKind::Assignment, 0.0)];
        let mut row = GradeRow::new();
        row.insert("Assignment_zz000", Some(5.0));
        let mut grades = BTreeMap::new();
        grades.insert("s-1".to_string(), row);

        let matrix = build_training_matrix(&["s-1".to_string()], &assessments, &grades);
        assert_eq!(matrix.value("s-1", "Assignment_zz000"), Some(0.0));
    }

    #[test]
    fn colliding_keys_keep_last_assessment() {
        let assessments = vec![
            assessment("abc12345", AssessmentKind::Quiz, 50.0),
            assessment("fin00001", AssessmentKind::Exam, 100.0),
            assessment("abc12999", AssessmentKind::Quiz, 10.0),
        ];
        let mut row = GradeRow::new();
        row.insert("Quiz_abc12", Some(5.0));
        let mut grades = BTreeMap::new();
        grades.insert("s-1".to_string(), row);

        let matrix = build_training_matrix(&["s-1".to_string()], &assessments, &grades);
        let names: Vec<&str> = matrix.columns.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["Quiz_abc12", "Exam_fin00"]);
        // Scored against the later assessment's 10 total marks.
        assert_eq!(matrix.value("s-1", "Quiz_abc12"), Some(0.5));
        assert_eq!(
            matrix.collisions,
            vec![ColumnCollision {
                column: ColumnKey::from("Quiz_abc12"),
                kept: "abc12999".into(),
                dropped: "abc12345".into(),
            }]
        );
    }

    #[test]
    fn untyped_assessments_have_no_column() {
        let mut legacy = assessment("ghi24680", AssessmentKind::Quiz, 20.0);
        legacy.kind = None;
        let assessments = vec![legacy, assessment("abc12345", AssessmentKind::Quiz, 50.0)];

        let matrix = build_training_matrix(&["s-1".to_string()], &assessments, &BTreeMap::new());
        assert_eq!(matrix.columns, vec![ColumnKey::from("Quiz_abc12")]);
        assert_eq!(matrix.untyped, vec!["ghi24680".to_string()]);
        assert_eq!(matrix.rows[0].values, vec![0.0]);
    }
}
