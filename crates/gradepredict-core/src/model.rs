//! Core data model types for gradepredict.
//!
//! Field names on the wire follow the JSON files written by the records
//! service (`_id`, `type`, `totalMarks`, ...), so existing data loads as-is.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Number of leading id characters that go into a column key.
pub const COLUMN_KEY_ID_PREFIX: usize = 5;

/// Kinds of assessment a course can define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssessmentKind {
    Assignment,
    Quiz,
    Exam,
    Miscellaneous,
}

impl fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentKind::Assignment => write!(f, "Assignment"),
            AssessmentKind::Quiz => write!(f, "Quiz"),
            AssessmentKind::Exam => write!(f, "Exam"),
            AssessmentKind::Miscellaneous => write!(f, "Miscellaneous"),
        }
    }
}

impl FromStr for AssessmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "assignment" => Ok(AssessmentKind::Assignment),
            "quiz" => Ok(AssessmentKind::Quiz),
            "exam" => Ok(AssessmentKind::Exam),
            "miscellaneous" | "misc" => Ok(AssessmentKind::Miscellaneous),
            other => Err(format!("unknown assessment type: {other}")),
        }
    }
}

/// An assessment definition.
///
/// Records created by older forms may lack `type` or `weightage`. Such a
/// record still loads, but cannot be scored until the field is filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Opaque unique identifier.
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// `None` when the record has no type or an unrecognized one.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "optional_kind",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<AssessmentKind>,
    /// Maximum raw score. Expected to be positive; a missing value reads as 0.
    #[serde(rename = "totalMarks", default, deserialize_with = "number_or_string")]
    pub total_marks: f64,
    /// Percentage weight, 0 to 100. Weights across assessments need not sum to 100.
    #[serde(
        default,
        deserialize_with = "optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub weightage: Option<f64>,
    #[serde(
        default,
        deserialize_with = "optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<NaiveDate>,
    /// Fields this crate does not interpret, kept so whole-file rewrites lose nothing.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Assessment {
    /// Create an assessment with a fresh random identifier.
    pub fn new(title: impl Into<String>, kind: AssessmentKind, total_marks: f64, weightage: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            kind: Some(kind),
            total_marks,
            weightage: Some(weightage),
            date: None,
            extra: BTreeMap::new(),
        }
    }

    /// The key this assessment's scores are stored under in a grade row.
    /// Untyped records have none.
    pub fn column_key(&self) -> Option<ColumnKey> {
        self.kind.map(|kind| ColumnKey::derive(kind, &self.id))
    }

    /// Names of the fields that keep this record from being scored.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.kind.is_none() {
            missing.push("type");
        }
        if self.weightage.is_none() {
            missing.push("weightage");
        }
        missing
    }
}

/// Key indexing a raw score within a student's grade row: `{type}_{id prefix}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnKey(String);

impl ColumnKey {
    /// Derive the key from an assessment type and identifier.
    ///
    /// Uses the first five characters of the id, or the whole id if shorter.
    pub fn derive(kind: AssessmentKind, id: &str) -> Self {
        let prefix: String = id.chars().take(COLUMN_KEY_ID_PREFIX).collect();
        ColumnKey(format!("{kind}_{prefix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnKey {
    fn from(s: &str) -> Self {
        ColumnKey(s.to_string())
    }
}

/// One student's recorded raw scores, keyed by column key.
///
/// A `null` value on disk means "no score recorded", same as an absent key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeRow(BTreeMap<String, Option<f64>>);

impl GradeRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Raw score stored under an exact key.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied().flatten()
    }

    pub fn insert(&mut self, key: impl Into<String>, score: Option<f64>) {
        self.0.insert(key.into(), score);
    }

    /// Raw score recorded for an assessment.
    ///
    /// Looks up the derived column key first, then the full assessment id.
    pub fn score_for(&self, assessment: &Assessment) -> Option<f64> {
        assessment
            .column_key()
            .and_then(|key| self.get(key.as_str()))
            .or_else(|| self.get(&assessment.id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, Option<f64>)> for GradeRow {
    fn from_iter<I: IntoIterator<Item = (String, Option<f64>)>>(iter: I) -> Self {
        GradeRow(iter.into_iter().collect())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn parse_number<E: de::Error>(value: NumberOrString) -> Result<Option<f64>, E> {
    match value {
        NumberOrString::Number(n) => Ok(Some(n)),
        NumberOrString::Text(s) if s.trim().is_empty() => Ok(None),
        NumberOrString::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| E::custom(format!("expected a number, got {s:?}"))),
    }
}

/// Accept `50` or `"50"`; null or a blank string reads as zero.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(value) => Ok(parse_number::<D::Error>(value)?.unwrap_or(0.0)),
        None => Ok(0.0),
    }
}

/// Like `number_or_string`, but null or blank reads as absent.
fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(value) => parse_number(value),
        None => Ok(None),
    }
}

/// Accept any case of a known type name; null, blank, or unknown reads as absent.
fn optional_kind<'de, D>(deserializer: D) -> Result<Option<AssessmentKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

/// Accept `"2024-03-01"`, a full timestamp, an empty string, or null.
fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| de::Error::custom(format!("invalid date {raw:?}: {e}")))
}
