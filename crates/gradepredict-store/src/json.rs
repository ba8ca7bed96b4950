//! JSON file store for assessments, grades, and the student roster.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use gradepredict_core::model::{Assessment, GradeRow};
use gradepredict_core::traits::{AssessmentStore, GradeStore, StudentDirectory};

pub const ASSESSMENTS_FILE: &str = "assessments.json";
pub const GRADES_FILE: &str = "assessmentGrades.json";
pub const STUDENTS_FILE: &str = "students.json";

/// Record store over a directory of JSON files.
///
/// Writes from this process are serialized; other writers to the same files
/// are not coordinated with.
pub struct JsonStore {
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Open a store rooted at `data_dir`. Files are created on first write.
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    /// Read a file, returning `None` if it does not exist or is blank.
    async fn read_optional(&self, file: &str) -> Result<Option<String>> {
        let path = self.path(file);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Raw assessment records, in file order.
    async fn load_assessment_records(&self) -> Result<Vec<Value>> {
        let Some(content) = self.read_optional(ASSESSMENTS_FILE).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path(ASSESSMENTS_FILE).display()))
    }

    /// Load every assessment. Records are decoded one at a time: a record missing its
    /// type or weightage still loads, and one that cannot be decoded at all is skipped.
    pub async fn load_assessments(&self) -> Result<Vec<Assessment>> {
        let records = self.load_assessment_records().await?;
        let mut assessments = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Assessment>(record) {
                Ok(assessment) => assessments.push(assessment),
                Err(e) => tracing::warn!(
                    path = %self.path(ASSESSMENTS_FILE).display(),
                    index,
                    error = %e,
                    "unreadable assessment record, skipping"
                ),
            }
        }
        Ok(assessments)
    }

    /// Load every grade row. A file holding an array (the legacy layout) reads as empty.
    pub async fn load_grades(&self) -> Result<BTreeMap<String, GradeRow>> {
        let Some(content) = self.read_optional(GRADES_FILE).await? else {
            return Ok(BTreeMap::new());
        };
        let path = self.path(GRADES_FILE);
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        match value {
            Value::Array(_) => {
                tracing::warn!(path = %path.display(), "grade file holds an array, treating as empty");
                Ok(BTreeMap::new())
            }
            Value::Object(_) => serde_json::from_value(value)
                .with_context(|| format!("unexpected grade layout in {}", path.display())),
            other => anyhow::bail!(
                "unexpected grade layout in {}: expected an object, got {}",
                path.display(),
                json_kind(&other)
            ),
        }
    }

    /// Student ids listed in the roster file, in file order.
    pub async fn load_roster(&self) -> Result<Vec<String>> {
        let Some(content) = self.read_optional(STUDENTS_FILE).await? else {
            return Ok(Vec::new());
        };
        let path = self.path(STUDENTS_FILE);
        let entries: Vec<Value> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let mut ids = Vec::with_capacity(entries.len());
        for entry in &entries {
            match student_id_of(entry) {
                Some(id) => ids.push(id),
                None => tracing::warn!(path = %path.display(), "roster entry without an id, skipping"),
            }
        }
        Ok(ids)
    }

    /// Insert an assessment, or replace the one with the same id.
    ///
    /// Other records are written back exactly as read.
    pub async fn put_assessment(&self, assessment: &Assessment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load_assessment_records().await?;
        let record = serde_json::to_value(assessment).context("failed to serialize assessment")?;
        match records
            .iter_mut()
            .find(|r| record_id_of(r).as_deref() == Some(assessment.id.as_str()))
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        self.write_json(ASSESSMENTS_FILE, &records).await
    }

    /// Record raw scores for a student, overwriting existing values under the same keys.
    pub async fn record_scores(&self, student_id: &str, scores: &BTreeMap<String, f64>) -> Result<()> {
        anyhow::ensure!(!student_id.trim().is_empty(), "student id must not be empty");
        for (key, score) in scores {
            anyhow::ensure!(score.is_finite(), "score for {key} is not a finite number");
        }

        let _guard = self.write_lock.lock().await;
        let mut grades = self.load_grades().await?;
        let row = grades.entry(student_id.to_string()).or_default();
        for (key, score) in scores {
            row.insert(key.clone(), Some(*score));
        }
        tracing::debug!(student_id, count = scores.len(), "recording scores");
        self.write_json(GRADES_FILE, &grades).await
    }

    /// Write the roster file. Used to seed new data directories.
    pub async fn write_roster(&self, students: &[Value]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_json(STUDENTS_FILE, &students).await
    }

    async fn write_json<T: Serialize + ?Sized>(&self, file: &str, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data).context("failed to serialize records")?;
        let dir = self.data_dir.clone();
        let path = self.path(file);
        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, json.as_bytes()))
            .await
            .context("file write task failed")?
    }
}

/// Replace `path` with `contents` via a temp file in the same directory.
fn write_atomic(dir: &Path, path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Roster entries carry `_id` (string) or a legacy numeric `id`.
fn student_id_of(entry: &Value) -> Option<String> {
    let id = entry.get("_id").or_else(|| entry.get("id"))?;
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn record_id_of(record: &Value) -> Option<String> {
    match record.get("_id").or_else(|| record.get("id"))? {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl AssessmentStore for JsonStore {
    async fn assessment(&self, id: &str) -> Result<Option<Assessment>> {
        Ok(self.load_assessments().await?.into_iter().find(|a| a.id == id))
    }

    async fn assessments(&self) -> Result<Vec<Assessment>> {
        self.load_assessments().await
    }
}

#[async_trait]
impl GradeStore for JsonStore {
    async fn grades_for(&self, student_id: &str) -> Result<GradeRow> {
        Ok(self.load_grades().await?.remove(student_id).unwrap_or_default())
    }

    async fn all_grades(&self) -> Result<BTreeMap<String, GradeRow>> {
        self.load_grades().await
    }
}

/// A student is known if listed in the roster or if grades were recorded for them.
#[async_trait]
impl StudentDirectory for JsonStore {
    async fn contains(&self, student_id: &str) -> Result<bool> {
        if self.load_roster().await?.iter().any(|s| s == student_id) {
            return Ok(true);
        }
        Ok(self.load_grades().await?.contains_key(student_id))
    }

    async fn student_ids(&self) -> Result<Vec<String>> {
        let mut ids = self.load_roster().await?;
        for student_id in self.load_grades().await?.into_keys() {
            if !ids.contains(&student_id) {
                ids.push(student_id);
            }
        }
        Ok(ids)
    }
}
