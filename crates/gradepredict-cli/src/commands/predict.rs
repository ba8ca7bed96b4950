//! The `gradepredict predict` command.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use serde_json::json;

use gradepredict_core::batch::{predict_many, BatchEntry, BatchReporter};
use gradepredict_core::traits::{Predictor, StudentDirectory};
use gradepredict_core::{PredictError, PredictionInvoker, PredictionOutcome};
use gradepredict_predictors::create_predictor;

use crate::OutputFormat;

/// Which students to predict for.
pub enum Target {
    Student(String),
    AllStudents,
}

/// Console progress reporter.
struct ConsoleReporter;

impl BatchReporter for ConsoleReporter {
    fn on_start(&self, student_id: &str) {
        tracing::debug!(student_id, "prediction started");
    }

    fn on_complete(&self, outcome: &PredictionOutcome) {
        eprintln!(
            "  Done: {} predicted {:.4}",
            outcome.student_id, outcome.predicted_score
        );
    }

    fn on_error(&self, student_id: &str, error: &PredictError) {
        eprintln!("  ERROR: {student_id}: {error}");
    }

    fn on_batch_complete(&self, total: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {}/{total} succeeded, {failed} failed ({:.1}s)",
            total - failed,
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    target: Target,
    assessment_id: String,
    format: OutputFormat,
    parallelism: Option<usize>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let result = run(target, &assessment_id, format, parallelism, config_path).await;

    match (result, format) {
        (Err(e), OutputFormat::Json) => {
            println!("{}", json!({ "error": format!("{e:#}") }));
            process::exit(1);
        }
        (result, _) => result,
    }
}

async fn run(
    target: Target,
    assessment_id: &str,
    format: OutputFormat,
    parallelism: Option<usize>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    if let Some(p) = parallelism {
        anyhow::ensure!(p >= 1, "parallelism must be at least 1");
    }

    let (config, store) = super::open_store(config_path.as_deref())?;
    let predictor: Arc<dyn Predictor> = Arc::from(create_predictor(&config.predictor)?);
    let invoker = PredictionInvoker::with_store(store.clone(), predictor);
    tracing::debug!(predictor = invoker.predictor_name(), "predictor ready");

    match target {
        Target::Student(student_id) => {
            let outcome = invoker.predict(&student_id, assessment_id).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
                OutputFormat::Text => print_outcome(&outcome),
            }
            Ok(())
        }
        Target::AllStudents => {
            let student_ids = store.student_ids().await?;
            anyhow::ensure!(!student_ids.is_empty(), "no students in roster or grade file");

            let parallelism = parallelism.unwrap_or(config.parallelism);
            eprintln!(
                "gradepredict v{}: predicting {assessment_id} for {} students",
                env!("CARGO_PKG_VERSION"),
                student_ids.len()
            );
            let started_at = chrono::Utc::now();
            let entries =
                predict_many(&invoker, &student_ids, assessment_id, parallelism, &ConsoleReporter)
                    .await;

            match format {
                OutputFormat::Json => print_batch_json(&entries, assessment_id, started_at)?,
                OutputFormat::Text => print_batch_table(&entries),
            }

            let failed = entries.iter().filter(|e| e.result.is_err()).count();
            // The JSON report already carries per-student errors.
            if failed > 0 && format == OutputFormat::Json {
                process::exit(1);
            }
            anyhow::ensure!(
                failed == 0,
                "{failed} of {} predictions failed",
                entries.len()
            );
            Ok(())
        }
    }
}

fn print_outcome(outcome: &PredictionOutcome) {
    println!("Student:     {}", outcome.student_id);
    println!(
        "Assessment:  {} ({})",
        outcome.assessment_title, outcome.column_key
    );
    match (outcome.raw_score, outcome.weighted_score) {
        (Some(raw), Some(weighted)) => {
            println!("Raw score:   {raw} / {}", outcome.total_marks);
            println!(
                "Weighted:    {weighted:.4} (weightage {}%)",
                outcome.weightage
            );
        }
        _ => println!("Raw score:   not recorded (sent as null)"),
    }
    println!("Predicted:   {:.4}", outcome.predicted_score);
}

fn print_batch_table(entries: &[BatchEntry]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Student", "Raw", "Weighted", "Predicted"]);

    for entry in entries {
        match &entry.result {
            Ok(o) => table.add_row(vec![
                Cell::new(&o.student_id),
                Cell::new(
                    o.raw_score
                        .map(|r| format!("{r} / {}", o.total_marks))
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(
                    o.weighted_score
                        .map(|w| format!("{w:.4}"))
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(format!("{:.4}", o.predicted_score)),
            ]),
            Err(e) => table.add_row(vec![
                Cell::new(&entry.student_id),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new(format!("error: {}", e.code())),
            ]),
        };
    }

    println!("\n{table}");
}

fn print_batch_json(
    entries: &[BatchEntry],
    assessment_id: &str,
    started_at: chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    let results: Vec<_> = entries
        .iter()
        .map(|entry| match &entry.result {
            Ok(outcome) => serde_json::to_value(outcome).unwrap_or_else(|e| {
                json!({ "student_id": entry.student_id, "error": e.to_string() })
            }),
            Err(e) => json!({
                "student_id": entry.student_id,
                "error": e.to_string(),
                "code": e.code(),
            }),
        })
        .collect();

    let report = json!({
        "assessment_id": assessment_id,
        "started_at": started_at.to_rfc3339(),
        "results": results,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
