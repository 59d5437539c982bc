//! Core domain types for the student records API.
//!
//! This file consolidates the entity and input types shared by the
//! repository, service, and HTTP layers. All wire-facing types derive
//! Serialize/Deserialize for JSON serialization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Student identifier (database primary key).
///
/// Internal only: external callers address students through the opaque
/// string identifier, never through this numeric id.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StudentId(pub i64);

/// Grade identifier (database primary key).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GradeId(pub i64);

impl StudentId {
    pub fn new(value: i64) -> Self {
        StudentId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl GradeId {
    pub fn new(value: i64) -> Self {
        GradeId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for GradeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<StudentId> for i64 {
    fn from(id: StudentId) -> Self {
        id.0
    }
}

impl From<GradeId> for i64 {
    fn from(id: GradeId) -> Self {
        id.0
    }
}

/// A student record together with its grades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    /// Opaque identifier used in URLs instead of the numeric id, so that
    /// sequential primary keys are never exposed.
    pub identifier: String,
    pub name: String,
    pub firstname: String,
    pub birthdate: NaiveDate,
    pub grades: Vec<Grade>,
}

/// A grade attached to exactly one student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub id: GradeId,
    /// Numeric value in [0, 20].
    pub grade: f64,
    pub subject: String,
}

/// Validated data for inserting a student.
///
/// The opaque identifier is generated by the service layer before this
/// struct reaches a repository; repositories never invent identifiers.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub identifier: String,
    pub name: String,
    pub firstname: String,
    pub birthdate: NaiveDate,
}

/// Validated replacement values for a student update (full replace of the
/// mutable fields; the identifier is immutable).
#[derive(Debug, Clone)]
pub struct StudentUpdate {
    pub name: String,
    pub firstname: String,
    pub birthdate: NaiveDate,
}

/// Validated data for inserting a grade.
#[derive(Debug, Clone)]
pub struct NewGrade {
    pub grade: f64,
    pub subject: String,
}

/// Unvalidated student payload as received from a client.
///
/// Every field is optional so that missing values surface as structured
/// field violations instead of deserialization failures. Unknown fields
/// (including a client-sent identifier) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentInput {
    pub name: Option<String>,
    pub firstname: Option<String>,
    pub birthdate: Option<NaiveDate>,
}

/// Unvalidated grade payload as received from a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GradeInput {
    pub grade: Option<f64>,
    pub subject: Option<String>,
}

/// A single field-level constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
