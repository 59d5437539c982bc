//! In-memory repository implementation.
//!
//! Backs unit tests and local development. Observable behavior matches the
//! Postgres backend: id ordering, duplicate-identifier rejection, cascading
//! deletes, and `None` averages over empty grade sets.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::models::{Grade, GradeId, NewGrade, NewStudent, Student, StudentId, StudentUpdate};
use crate::db::repository::{
    GradeRepository, RepositoryError, RepositoryResult, StudentRepository,
};

#[derive(Debug, Clone)]
struct StudentRecord {
    id: i64,
    identifier: String,
    name: String,
    firstname: String,
    birthdate: chrono::NaiveDate,
}

#[derive(Debug, Clone)]
struct GradeRecord {
    id: i64,
    student_id: i64,
    grade: f64,
    subject: String,
}

#[derive(Debug, Default)]
struct LocalState {
    // BTreeMaps keep iteration in id order, which is insertion order here.
    students: BTreeMap<i64, StudentRecord>,
    grades: BTreeMap<i64, GradeRecord>,
    next_student_id: i64,
    next_grade_id: i64,
}

impl LocalState {
    fn grades_for(&self, student_id: i64) -> Vec<Grade> {
        self.grades
            .values()
            .filter(|g| g.student_id == student_id)
            .map(|g| Grade {
                id: GradeId(g.id),
                grade: g.grade,
                subject: g.subject.clone(),
            })
            .collect()
    }

    fn to_student(&self, record: &StudentRecord) -> Student {
        Student {
            id: StudentId(record.id),
            identifier: record.identifier.clone(),
            name: record.name.clone(),
            firstname: record.firstname.clone(),
            birthdate: record.birthdate,
            grades: self.grades_for(record.id),
        }
    }
}

/// In-memory implementation of the repository traits.
#[derive(Debug, Default)]
pub struct LocalRepository {
    state: RwLock<LocalState>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }

    async fn list_students(&self) -> RepositoryResult<Vec<Student>> {
        let state = self.state.read();
        Ok(state.students.values().map(|r| state.to_student(r)).collect())
    }

    async fn find_student_by_identifier(
        &self,
        identifier: &str,
    ) -> RepositoryResult<Option<Student>> {
        let state = self.state.read();
        Ok(state
            .students
            .values()
            .find(|r| r.identifier == identifier)
            .map(|r| state.to_student(r)))
    }

    async fn insert_student(&self, new: &NewStudent) -> RepositoryResult<Student> {
        let mut state = self.state.write();

        // Mirrors the unique index on the identifier column.
        if state.students.values().any(|r| r.identifier == new.identifier) {
            return Err(RepositoryError::validation(format!(
                "duplicate student identifier {}",
                new.identifier
            )));
        }

        state.next_student_id += 1;
        let record = StudentRecord {
            id: state.next_student_id,
            identifier: new.identifier.clone(),
            name: new.name.clone(),
            firstname: new.firstname.clone(),
            birthdate: new.birthdate,
        };
        let student = state.to_student(&record);
        state.students.insert(record.id, record);
        Ok(student)
    }

    async fn update_student(
        &self,
        id: StudentId,
        changes: &StudentUpdate,
    ) -> RepositoryResult<Student> {
        let mut state = self.state.write();
        let record = state
            .students
            .get_mut(&id.0)
            .ok_or_else(|| RepositoryError::not_found(format!("no student with id {}", id)))?;

        record.name = changes.name.clone();
        record.firstname = changes.firstname.clone();
        record.birthdate = changes.birthdate;
        let record = record.clone();
        Ok(state.to_student(&record))
    }

    async fn delete_student(&self, id: StudentId) -> RepositoryResult<()> {
        let mut state = self.state.write();
        if state.students.remove(&id.0).is_none() {
            return Err(RepositoryError::not_found(format!(
                "no student with id {}",
                id
            )));
        }
        // Cascade, like the foreign key does in the database backend.
        state.grades.retain(|_, g| g.student_id != id.0);
        Ok(())
    }
}

#[async_trait]
impl GradeRepository for LocalRepository {
    async fn insert_grade(
        &self,
        student_id: StudentId,
        new: &NewGrade,
    ) -> RepositoryResult<Grade> {
        let mut state = self.state.write();

        // Mirrors the non-nullable foreign key.
        if !state.students.contains_key(&student_id.0) {
            return Err(RepositoryError::not_found(format!(
                "no student with id {}",
                student_id
            )));
        }

        state.next_grade_id += 1;
        let record = GradeRecord {
            id: state.next_grade_id,
            student_id: student_id.0,
            grade: new.grade,
            subject: new.subject.clone(),
        };
        let grade = Grade {
            id: GradeId(record.id),
            grade: record.grade,
            subject: record.subject.clone(),
        };
        state.grades.insert(record.id, record);
        Ok(grade)
    }

    async fn student_average(&self, student_id: StudentId) -> RepositoryResult<Option<f64>> {
        let state = self.state.read();
        let values: Vec<f64> = state
            .grades
            .values()
            .filter(|g| g.student_id == student_id.0)
            .map(|g| g.grade)
            .collect();
        Ok(mean(&values))
    }

    async fn global_average(&self) -> RepositoryResult<Option<f64>> {
        let state = self.state.read();
        let values: Vec<f64> = state.grades.values().map(|g| g.grade).collect();
        Ok(mean(&values))
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
