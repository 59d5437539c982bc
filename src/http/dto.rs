//! Data Transfer Objects for the HTTP API.
//!
//! Response shapes differ per endpoint: read responses carry the full
//! student view including grades, while creation and update responses
//! omit the grades collection. The internal numeric student id never
//! appears in any response; clients only ever see the opaque identifier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{Grade, Student};

/// Grade fields exposed in read and creation responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeDto {
    pub id: i64,
    pub grade: f64,
    pub subject: String,
}

/// Full student view: identifier, attributes, and grades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentDto {
    pub identifier: String,
    pub name: String,
    pub firstname: String,
    pub birthdate: NaiveDate,
    pub grades: Vec<GradeDto>,
}

/// Creation/update view of a student. The grades collection is omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentCreatedDto {
    pub identifier: String,
    pub name: String,
    pub firstname: String,
    pub birthdate: NaiveDate,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Database connection status
    pub database: String,
}

impl From<Grade> for GradeDto {
    fn from(grade: Grade) -> Self {
        Self {
            id: grade.id.value(),
            grade: grade.grade,
            subject: grade.subject,
        }
    }
}

impl From<Student> for StudentDto {
    fn from(student: Student) -> Self {
        Self {
            identifier: student.identifier,
            name: student.name,
            firstname: student.firstname,
            birthdate: student.birthdate,
            grades: student.grades.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Student> for StudentCreatedDto {
    fn from(student: Student) -> Self {
        Self {
            identifier: student.identifier,
            name: student.name,
            firstname: student.firstname,
            birthdate: student.birthdate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GradeId, StudentId};

    fn sample_student() -> Student {
        Student {
            id: StudentId(7),
            identifier: "a1b2c3".to_string(),
            name: "Doe".to_string(),
            firstname: "Jane".to_string(),
            birthdate: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            grades: vec![Grade {
                id: GradeId(1),
                grade: 15.0,
                subject: "Math".to_string(),
            }],
        }
    }

    #[test]
    fn test_student_dto_includes_grades() {
        let dto = StudentDto::from(sample_student());
        assert_eq!(dto.identifier, "a1b2c3");
        assert_eq!(dto.grades.len(), 1);
        assert_eq!(dto.grades[0].subject, "Math");
    }

    #[test]
    fn test_created_dto_omits_grades_and_numeric_id() {
        let json = serde_json::to_value(StudentCreatedDto::from(sample_student())).unwrap();
        assert!(json.get("grades").is_none());
        assert!(json.get("id").is_none());
        assert_eq!(json["identifier"], "a1b2c3");
    }

    #[test]
    fn test_read_dto_has_no_numeric_student_id() {
        let json = serde_json::to_value(StudentDto::from(sample_student())).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["grades"][0]["id"], 1);
    }

    #[test]
    fn test_birthdate_wire_format() {
        let json = serde_json::to_value(StudentDto::from(sample_student())).unwrap();
        assert_eq!(json["birthdate"], "2000-01-01");
    }
}
