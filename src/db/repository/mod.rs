//! Repository trait definitions for student and grade storage.
//!
//! The traits are object-safe so the application can hold an
//! `Arc<dyn FullRepository>` and swap backends at startup.

pub mod error;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

use async_trait::async_trait;

use crate::db::models::{Grade, NewGrade, NewStudent, Student, StudentId, StudentUpdate};

/// Storage operations for students.
///
/// All lookup results carry the student's grades, ordered by grade id.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Check whether the backend is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// List all students in insertion (id) order.
    async fn list_students(&self) -> RepositoryResult<Vec<Student>>;

    /// Find one student by its opaque identifier.
    async fn find_student_by_identifier(
        &self,
        identifier: &str,
    ) -> RepositoryResult<Option<Student>>;

    /// Persist a new student. The identifier in `new` must already be
    /// generated and unique; a duplicate is a validation error.
    async fn insert_student(&self, new: &NewStudent) -> RepositoryResult<Student>;

    /// Replace the mutable fields of an existing student.
    async fn update_student(
        &self,
        id: StudentId,
        changes: &StudentUpdate,
    ) -> RepositoryResult<Student>;

    /// Remove a student and, by cascade, all of its grades.
    async fn delete_student(&self, id: StudentId) -> RepositoryResult<()>;
}

/// Storage operations for grades and averages.
#[async_trait]
pub trait GradeRepository: Send + Sync {
    /// Persist a new grade linked to an existing student.
    async fn insert_grade(&self, student_id: StudentId, new: &NewGrade)
        -> RepositoryResult<Grade>;

    /// Arithmetic mean of one student's grade values. `None` when the
    /// student has no grades (distinct from an average of zero).
    async fn student_average(&self, student_id: StudentId) -> RepositoryResult<Option<f64>>;

    /// Arithmetic mean of all grade values across all students. `None`
    /// when no grades exist anywhere.
    async fn global_average(&self) -> RepositoryResult<Option<f64>>;
}

/// Combined repository surface used by the application.
pub trait FullRepository: StudentRepository + GradeRepository {}

impl<T: StudentRepository + GradeRepository> FullRepository for T {}
