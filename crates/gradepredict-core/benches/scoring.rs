use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gradepredict_core::model::{Assessment, AssessmentKind, GradeRow};
use gradepredict_core::scoring::normalize;
use gradepredict_core::training::build_training_matrix;

fn make_assessments(count: usize) -> Vec<Assessment> {
    let kinds = [
        AssessmentKind::Assignment,
        AssessmentKind::Quiz,
        AssessmentKind::Exam,
        AssessmentKind::Miscellaneous,
    ];
    (0..count)
        .map(|i| {
            let mut a = Assessment::new(format!("A{i}"), kinds[i % kinds.len()], 50.0, 10.0);
            a.id = format!("{i:05}-bench");
            a
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize_recorded", |b| {
        b.iter(|| normalize(black_box(Some(40.0)), black_box(50.0), black_box(20.0)))
    });

    c.bench_function("normalize_absent", |b| {
        b.iter(|| normalize(black_box(None), black_box(50.0), black_box(20.0)))
    });
}

fn bench_training_matrix(c: &mut Criterion) {
    let assessments = make_assessments(40);
    let students: Vec<String> = (0..500).map(|i| format!("student-{i}")).collect();
    let grades: BTreeMap<String, GradeRow> = students
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let row = assessments
                .iter()
                .filter(|_| i % 3 != 0)
                .filter_map(|a| a.column_key())
                .map(|key| (key.to_string(), Some((i % 50) as f64)))
                .collect();
            (s.clone(), row)
        })
        .collect();

    c.bench_function("training_matrix_500x40", |b| {
        b.iter(|| build_training_matrix(black_box(&students), black_box(&assessments), black_box(&grades)))
    });
}

criterion_group!(benches, bench_normalize, bench_training_matrix);
criterion_main!(benches);
