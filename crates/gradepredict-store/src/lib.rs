//! gradepredict-store — File-backed JSON record stores.
//!
//! Reads the flat JSON files kept by the records service: an array of
//! assessments, an object of per-student grade rows, and a student roster.
//! Every write replaces a whole file atomically.

pub mod export;
pub mod json;

pub use export::write_training_csv;
pub use json::{JsonStore, ASSESSMENTS_FILE, GRADES_FILE, STUDENTS_FILE};
