//! Shared data models re-exported for database layer consumers.

pub use crate::api::{
    Grade, GradeId, NewGrade, NewStudent, Student, StudentId, StudentUpdate,
};
