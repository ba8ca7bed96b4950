//! The `gradepredict init` command.

use std::path::Path;

use anyhow::Result;
use serde_json::json;

use gradepredict_core::{Assessment, AssessmentKind};
use gradepredict_store::{JsonStore, ASSESSMENTS_FILE, STUDENTS_FILE};

const DATA_DIR: &str = "data";

pub async fn execute() -> Result<()> {
    // Create gradepredict.toml
    if Path::new("gradepredict.toml").exists() {
        println!("gradepredict.toml already exists, skipping.");
    } else {
        std::fs::write("gradepredict.toml", SAMPLE_CONFIG)?;
        println!("Created gradepredict.toml");
    }

    // Seed the data directory
    let store = JsonStore::open(DATA_DIR);
    let assessments_path = store.data_dir().join(ASSESSMENTS_FILE);
    if assessments_path.exists() {
        println!("{DATA_DIR}/{ASSESSMENTS_FILE} already exists, skipping.");
    } else {
        let sample = Assessment::new("Midterm Quiz", AssessmentKind::Quiz, 50.0, 20.0);
        store.put_assessment(&sample).await?;
        println!(
            "Created {DATA_DIR}/{ASSESSMENTS_FILE} (sample assessment {})",
            sample.id
        );
    }

    let roster_path = store.data_dir().join(STUDENTS_FILE);
    if roster_path.exists() {
        println!("{DATA_DIR}/{STUDENTS_FILE} already exists, skipping.");
    } else {
        store
            .write_roster(&[json!({ "_id": "student-001", "name": "Sample Student" })])
            .await?;
        println!("Created {DATA_DIR}/{STUDENTS_FILE}");
    }

    println!("\nNext steps:");
    println!("  1. Point [predictor] in gradepredict.toml at your model");
    println!("  2. Run: gradepredict record-score --student student-001 --assessment <id> --score 40");
    println!("  3. Run: gradepredict predict --student student-001 --assessment <id>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradepredict configuration

data_dir = "data"
parallelism = 4

# The predictor receives {"student_id": ..., "previous_grades": {...}} as its
# last argument and prints {"predicted_score": ...} on stdout.
[predictor]
type = "command"
program = "python3"
args = ["predict.py"]
timeout_secs = 30

# Alternatively, a model server:
# [predictor]
# type = "http"
# base_url = "http://localhost:8000"
# api_key = "${GRADEPREDICT_API_KEY}"

[trainer]
program = "python3"
args = ["train.py"]
timeout_secs = 600
"#;
