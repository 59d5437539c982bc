#[cfg(test)]
mod tests {
    use crate::api::{FieldViolation, GradeId, GradeInput, StudentId, StudentInput};

    #[test]
    fn test_student_id_new() {
        let id = StudentId::new(42);
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn test_student_id_equality() {
        let id1 = StudentId::new(100);
        let id2 = StudentId::new(100);
        let id3 = StudentId::new(101);

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_student_id_ordering() {
        let id1 = StudentId::new(1);
        let id2 = StudentId::new(2);

        assert!(id1 < id2);
        assert!(id2 > id1);
    }

    #[test]
    fn test_grade_id_new() {
        let id = GradeId::new(55);
        assert_eq!(id.value(), 55);
    }

    #[test]
    fn test_ids_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(StudentId::new(1));
        set.insert(StudentId::new(2));
        set.insert(StudentId::new(1)); // Duplicate

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_id_display_and_conversion() {
        assert_eq!(StudentId::new(7).to_string(), "7");
        assert_eq!(i64::from(GradeId::new(9)), 9);
    }

    #[test]
    fn test_field_violation_new() {
        let violation = FieldViolation::new("name", "This value should not be blank.");
        assert_eq!(violation.field, "name");
        assert_eq!(violation.message, "This value should not be blank.");
    }

    #[test]
    fn test_student_input_deserializes_partial_payload() {
        let input: StudentInput = serde_json::from_str(r#"{"name": "Doe"}"#).unwrap();
        assert_eq!(input.name.as_deref(), Some("Doe"));
        assert!(input.firstname.is_none());
        assert!(input.birthdate.is_none());
    }

    #[test]
    fn test_student_input_ignores_unknown_fields() {
        // Clients may send an identifier or grades; both are server-managed
        // and silently dropped.
        let input: StudentInput = serde_json::from_str(
            r#"{
                "identifier": "forged",
                "name": "Doe",
                "firstname": "Jane",
                "birthdate": "2000-01-01",
                "grades": [{"grade": 20, "subject": "Math"}]
            }"#,
        )
        .unwrap();
        assert_eq!(input.name.as_deref(), Some("Doe"));
        assert_eq!(
            input.birthdate,
            chrono::NaiveDate::from_ymd_opt(2000, 1, 1)
        );
    }

    #[test]
    fn test_grade_input_deserializes() {
        let input: GradeInput = serde_json::from_str(r#"{"grade": 15, "subject": "Math"}"#).unwrap();
        assert_eq!(input.grade, Some(15.0));
        assert_eq!(input.subject.as_deref(), Some("Math"));
    }

    #[test]
    fn test_student_input_rejects_malformed_birthdate() {
        let result: Result<StudentInput, _> =
            serde_json::from_str(r#"{"birthdate": "not-a-date"}"#);
        assert!(result.is_err());
    }
}
