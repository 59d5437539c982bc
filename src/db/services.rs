//! Service layer: business logic between HTTP handlers and repositories.
//!
//! Every function takes the repository as an explicit argument and returns
//! a [`ServiceResult`], so callers match on error kinds instead of catching
//! exceptions. Identifier generation happens here, as an explicit step of
//! the creation operation, before anything reaches a repository.

use chrono::NaiveDate;
use log::debug;
use uuid::Uuid;

use super::repository::{FullRepository, RepositoryError};
use crate::api::{
    FieldViolation, Grade, GradeInput, NewGrade, NewStudent, Student, StudentInput, StudentUpdate,
};

/// Inclusive bounds for grade values.
pub const GRADE_MIN: f64 = 0.0;
pub const GRADE_MAX: f64 = 20.0;

const MSG_NOT_BLANK: &str = "This value should not be blank.";
const MSG_NO_GRADES_GLOBAL: &str =
    "No grades given to any students yet. So no global average grade available.";

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Domain errors surfaced by the service layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The caller supplied a blank or missing identifier.
    #[error("No (or bad) identifier given")]
    BadIdentifier,

    /// No student matches the given identifier.
    #[error("No student with identifier {0}")]
    StudentNotFound(String),

    /// One or more fields failed constraint validation.
    #[error("validation failed")]
    Validation(Vec<FieldViolation>),

    /// An average was requested over an empty set of grades.
    #[error("{0}")]
    NoGrades(String),

    /// Underlying storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Generate a fresh opaque student identifier.
///
/// Hyphenless UUID v4: URL-safe and non-sequential, so student URLs cannot
/// be guessed from the numeric primary keys.
pub fn generate_identifier() -> String {
    Uuid::new_v4().simple().to_string()
}

fn require_identifier(identifier: &str) -> ServiceResult<&str> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::BadIdentifier);
    }
    Ok(trimmed)
}

fn validate_student(input: &StudentInput) -> ServiceResult<(String, String, NaiveDate)> {
    let mut violations = Vec::new();

    let name = match input.name.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            violations.push(FieldViolation::new("name", MSG_NOT_BLANK));
            None
        }
    };

    let firstname = match input.firstname.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            violations.push(FieldViolation::new("firstname", MSG_NOT_BLANK));
            None
        }
    };

    if input.birthdate.is_none() {
        violations.push(FieldViolation::new("birthdate", MSG_NOT_BLANK));
    }

    match (name, firstname, input.birthdate) {
        (Some(name), Some(firstname), Some(birthdate)) => Ok((name, firstname, birthdate)),
        _ => Err(ServiceError::Validation(violations)),
    }
}

fn validate_grade(input: &GradeInput) -> ServiceResult<NewGrade> {
    let mut violations = Vec::new();

    let grade = match input.grade {
        None => {
            violations.push(FieldViolation::new("grade", MSG_NOT_BLANK));
            None
        }
        Some(v) if v < GRADE_MIN => {
            violations.push(FieldViolation::new(
                "grade",
                format!("This value should be greater than or equal to {}.", GRADE_MIN),
            ));
            None
        }
        Some(v) if v > GRADE_MAX => {
            violations.push(FieldViolation::new(
                "grade",
                format!("This value should be less than or equal to {}.", GRADE_MAX),
            ));
            None
        }
        Some(v) => Some(v),
    };

    let subject = match input.subject.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            violations.push(FieldViolation::new("subject", MSG_NOT_BLANK));
            None
        }
    };

    match (grade, subject) {
        (Some(grade), Some(subject)) => Ok(NewGrade { grade, subject }),
        _ => Err(ServiceError::Validation(violations)),
    }
}

/// Check whether the storage backend is reachable.
pub async fn health_check(repo: &dyn FullRepository) -> ServiceResult<bool> {
    Ok(repo.health_check().await?)
}

/// List all students, in insertion order, with their grades.
pub async fn list_students(repo: &dyn FullRepository) -> ServiceResult<Vec<Student>> {
    Ok(repo.list_students().await?)
}

/// Fetch one student by opaque identifier.
pub async fn get_student(repo: &dyn FullRepository, identifier: &str) -> ServiceResult<Student> {
    let identifier = require_identifier(identifier)?;
    repo.find_student_by_identifier(identifier)
        .await?
        .ok_or_else(|| ServiceError::StudentNotFound(identifier.to_string()))
}

/// Validate and persist a new student.
pub async fn create_student(
    repo: &dyn FullRepository,
    input: &StudentInput,
) -> ServiceResult<Student> {
    let (name, firstname, birthdate) = validate_student(input)?;

    // Explicit generation step: the identifier exists before persistence
    // and never depends on storage-side defaults.
    let identifier = generate_identifier();

    let created = repo
        .insert_student(&NewStudent {
            identifier,
            name,
            firstname,
            birthdate,
        })
        .await?;
    debug!("created student {}", created.identifier);
    Ok(created)
}

/// Validate and replace the mutable fields of an existing student.
pub async fn update_student(
    repo: &dyn FullRepository,
    identifier: &str,
    input: &StudentInput,
) -> ServiceResult<Student> {
    let existing = get_student(repo, identifier).await?;
    let (name, firstname, birthdate) = validate_student(input)?;

    let updated = repo
        .update_student(
            existing.id,
            &StudentUpdate {
                name,
                firstname,
                birthdate,
            },
        )
        .await?;
    debug!("updated student {}", updated.identifier);
    Ok(updated)
}

/// Remove a student and all of its grades.
pub async fn delete_student(repo: &dyn FullRepository, identifier: &str) -> ServiceResult<()> {
    let existing = get_student(repo, identifier).await?;
    repo.delete_student(existing.id).await?;
    debug!("deleted student {}", existing.identifier);
    Ok(())
}

/// Validate and attach a grade to an existing student.
pub async fn add_grade(
    repo: &dyn FullRepository,
    identifier: &str,
    input: &GradeInput,
) -> ServiceResult<Grade> {
    let student = get_student(repo, identifier).await?;
    let new = validate_grade(input)?;
    Ok(repo.insert_grade(student.id, &new).await?)
}

/// Arithmetic mean of one student's grades.
///
/// A student with zero grades yields [`ServiceError::NoGrades`] carrying
/// the student's name, never an average of zero.
pub async fn student_average(
    repo: &dyn FullRepository,
    identifier: &str,
) -> ServiceResult<f64> {
    let student = get_student(repo, identifier).await?;
    match repo.student_average(student.id).await? {
        Some(average) => Ok(average),
        None => Err(ServiceError::NoGrades(format!(
            "Student {} {} has no grades yet. So no average grade available.",
            student.firstname, student.name
        ))),
    }
}

/// Arithmetic mean of all grades known for all students.
pub async fn global_average(repo: &dyn FullRepository) -> ServiceResult<f64> {
    match repo.global_average().await? {
        Some(average) => Ok(average),
        None => Err(ServiceError::NoGrades(MSG_NO_GRADES_GLOBAL.to_string())),
    }
}
