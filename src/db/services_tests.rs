#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::NaiveDate;

    use crate::api::{GradeInput, StudentInput};
    use crate::db::repositories::LocalRepository;
    use crate::db::services::{self, ServiceError};

    fn student_input(name: &str, firstname: &str, birthdate: &str) -> StudentInput {
        StudentInput {
            name: Some(name.to_string()),
            firstname: Some(firstname.to_string()),
            birthdate: birthdate.parse::<NaiveDate>().ok(),
        }
    }

    fn grade_input(grade: f64, subject: &str) -> GradeInput {
        GradeInput {
            grade: Some(grade),
            subject: Some(subject.to_string()),
        }
    }

    #[test]
    fn test_generated_identifiers_are_unique_and_url_safe() {
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let identifier = services::generate_identifier();
            assert!(!identifier.is_empty());
            assert!(identifier.chars().all(|c| c.is_ascii_alphanumeric()));
            assert!(seen.insert(identifier));
        }
    }

    #[tokio::test]
    async fn test_create_student_returns_generated_identifier() {
        let repo = LocalRepository::new();
        let created =
            services::create_student(&repo, &student_input("Doe", "Jane", "2000-01-01"))
                .await
                .unwrap();

        assert!(!created.identifier.is_empty());
        assert_eq!(created.name, "Doe");
        assert_eq!(created.firstname, "Jane");
        assert!(created.grades.is_empty());
    }

    #[tokio::test]
    async fn test_created_identifiers_never_repeat() {
        let repo = LocalRepository::new();
        let mut identifiers = HashSet::new();
        for i in 0..10 {
            let created = services::create_student(
                &repo,
                &student_input(&format!("Name{}", i), "First", "2001-06-15"),
            )
            .await
            .unwrap();
            assert!(identifiers.insert(created.identifier));
        }
    }

    #[tokio::test]
    async fn test_create_student_collects_field_violations() {
        let repo = LocalRepository::new();
        let input = StudentInput {
            name: Some("  ".to_string()),
            firstname: None,
            birthdate: None,
        };

        let err = services::create_student(&repo, &input).await.unwrap_err();
        match err {
            ServiceError::Validation(violations) => {
                let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "firstname", "birthdate"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        // Nothing was persisted.
        assert!(services::list_students(&repo).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_student_unknown_identifier_is_not_found() {
        let repo = LocalRepository::new();
        let err = services::get_student(&repo, "missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::StudentNotFound(_)));
    }

    #[tokio::test]
    async fn test_blank_identifier_is_bad_request() {
        let repo = LocalRepository::new();
        for identifier in ["", "   "] {
            let err = services::get_student(&repo, identifier).await.unwrap_err();
            assert!(matches!(err, ServiceError::BadIdentifier));

            let err = services::delete_student(&repo, identifier).await.unwrap_err();
            assert!(matches!(err, ServiceError::BadIdentifier));
        }
    }

    #[tokio::test]
    async fn test_list_students_in_insertion_order() {
        let repo = LocalRepository::new();
        for name in ["Alpha", "Beta", "Gamma"] {
            services::create_student(&repo, &student_input(name, "X", "1999-12-31"))
                .await
                .unwrap();
        }

        let names: Vec<String> = services::list_students(&repo)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[tokio::test]
    async fn test_update_student_replaces_all_fields() {
        let repo = LocalRepository::new();
        let created = services::create_student(&repo, &student_input("Doe", "Jane", "2000-01-01"))
            .await
            .unwrap();

        let updated = services::update_student(
            &repo,
            &created.identifier,
            &student_input("Smith", "John", "1998-03-02"),
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Smith");
        assert_eq!(updated.firstname, "John");
        assert_eq!(
            updated.birthdate,
            NaiveDate::from_ymd_opt(1998, 3, 2).unwrap()
        );
        // The opaque identifier is immutable.
        assert_eq!(updated.identifier, created.identifier);
    }

    #[tokio::test]
    async fn test_update_student_validates_input() {
        let repo = LocalRepository::new();
        let created = services::create_student(&repo, &student_input("Doe", "Jane", "2000-01-01"))
            .await
            .unwrap();

        let err = services::update_student(&repo, &created.identifier, &StudentInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        // The stored record is untouched.
        let fetched = services::get_student(&repo, &created.identifier).await.unwrap();
        assert_eq!(fetched.name, "Doe");
    }

    #[tokio::test]
    async fn test_update_unknown_student_is_not_found() {
        let repo = LocalRepository::new();
        let err = services::update_student(&repo, "missing", &student_input("A", "B", "2000-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StudentNotFound(_)));
    }

    #[tokio::test]
    async fn test_add_grade_and_read_back() {
        let repo = LocalRepository::new();
        let created = services::create_student(&repo, &student_input("Doe", "Jane", "2000-01-01"))
            .await
            .unwrap();

        let grade = services::add_grade(&repo, &created.identifier, &grade_input(15.0, "Math"))
            .await
            .unwrap();
        assert_eq!(grade.grade, 15.0);
        assert_eq!(grade.subject, "Math");

        let fetched = services::get_student(&repo, &created.identifier).await.unwrap();
        assert_eq!(fetched.grades.len(), 1);
        assert_eq!(fetched.grades[0].subject, "Math");
    }

    #[tokio::test]
    async fn test_grade_bounds_are_inclusive() {
        let repo = LocalRepository::new();
        let created = services::create_student(&repo, &student_input("Doe", "Jane", "2000-01-01"))
            .await
            .unwrap();

        services::add_grade(&repo, &created.identifier, &grade_input(0.0, "Sport"))
            .await
            .unwrap();
        services::add_grade(&repo, &created.identifier, &grade_input(20.0, "Math"))
            .await
            .unwrap();

        let average = services::student_average(&repo, &created.identifier)
            .await
            .unwrap();
        assert_eq!(average, 10.0);
    }

    #[tokio::test]
    async fn test_out_of_range_grades_are_rejected_and_not_persisted() {
        let repo = LocalRepository::new();
        let created = services::create_student(&repo, &student_input("Doe", "Jane", "2000-01-01"))
            .await
            .unwrap();

        for value in [-0.5, 20.5, 100.0] {
            let err = services::add_grade(&repo, &created.identifier, &grade_input(value, "Math"))
                .await
                .unwrap_err();
            match err {
                ServiceError::Validation(violations) => {
                    assert_eq!(violations.len(), 1);
                    assert_eq!(violations[0].field, "grade");
                }
                other => panic!("expected validation error, got {:?}", other),
            }
        }

        // The rejected values never reached storage: still no grades.
        let err = services::student_average(&repo, &created.identifier)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NoGrades(_)));
    }

    #[tokio::test]
    async fn test_blank_subject_is_rejected() {
        let repo = LocalRepository::new();
        let created = services::create_student(&repo, &student_input("Doe", "Jane", "2000-01-01"))
            .await
            .unwrap();

        let input = GradeInput {
            grade: Some(12.0),
            subject: Some("  ".to_string()),
        };
        let err = services::add_grade(&repo, &created.identifier, &input)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_add_grade_to_unknown_student_is_not_found() {
        let repo = LocalRepository::new();
        let err = services::add_grade(&repo, "missing", &grade_input(10.0, "Math"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StudentNotFound(_)));
    }

    #[tokio::test]
    async fn test_student_average_is_arithmetic_mean() {
        let repo = LocalRepository::new();
        let created = services::create_student(&repo, &student_input("Doe", "Jane", "2000-01-01"))
            .await
            .unwrap();

        for (value, subject) in [(10.0, "Math"), (15.0, "History"), (17.0, "Physics")] {
            services::add_grade(&repo, &created.identifier, &grade_input(value, subject))
                .await
                .unwrap();
        }

        let average = services::student_average(&repo, &created.identifier)
            .await
            .unwrap();
        assert!((average - 14.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_student_without_grades_signals_no_grades_not_zero() {
        let repo = LocalRepository::new();
        let created = services::create_student(&repo, &student_input("Doe", "Jane", "2000-01-01"))
            .await
            .unwrap();

        let err = services::student_average(&repo, &created.identifier)
            .await
            .unwrap_err();
        match err {
            ServiceError::NoGrades(message) => {
                assert!(message.contains("Jane"));
                assert!(message.contains("Doe"));
            }
            other => panic!("expected no-grades error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_global_average_spans_all_students() {
        let repo = LocalRepository::new();
        let a = services::create_student(&repo, &student_input("Doe", "Jane", "2000-01-01"))
            .await
            .unwrap();
        let b = services::create_student(&repo, &student_input("Smith", "John", "2001-02-02"))
            .await
            .unwrap();

        services::add_grade(&repo, &a.identifier, &grade_input(10.0, "Math"))
            .await
            .unwrap();
        services::add_grade(&repo, &b.identifier, &grade_input(20.0, "Math"))
            .await
            .unwrap();

        let average = services::global_average(&repo).await.unwrap();
        assert!((average - 15.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_global_average_without_any_grades_signals_no_grades() {
        let repo = LocalRepository::new();
        let err = services::global_average(&repo).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoGrades(_)));
    }

    #[tokio::test]
    async fn test_deleting_a_student_cascades_to_grades() {
        let repo = LocalRepository::new();
        let a = services::create_student(&repo, &student_input("Doe", "Jane", "2000-01-01"))
            .await
            .unwrap();
        let b = services::create_student(&repo, &student_input("Smith", "John", "2001-02-02"))
            .await
            .unwrap();

        services::add_grade(&repo, &a.identifier, &grade_input(12.0, "Math"))
            .await
            .unwrap();
        services::add_grade(&repo, &a.identifier, &grade_input(18.0, "History"))
            .await
            .unwrap();
        services::add_grade(&repo, &b.identifier, &grade_input(10.0, "Math"))
            .await
            .unwrap();

        services::delete_student(&repo, &a.identifier).await.unwrap();

        let err = services::get_student(&repo, &a.identifier).await.unwrap_err();
        assert!(matches!(err, ServiceError::StudentNotFound(_)));

        // Only the surviving student's grades count now.
        let average = services::global_average(&repo).await.unwrap();
        assert!((average - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let repo = LocalRepository::new();

        let created = services::create_student(&repo, &student_input("Doe", "Jane", "2000-01-01"))
            .await
            .unwrap();
        assert!(!created.identifier.is_empty());

        let fetched = services::get_student(&repo, &created.identifier).await.unwrap();
        assert!(fetched.grades.is_empty());

        services::add_grade(&repo, &created.identifier, &grade_input(15.0, "Math"))
            .await
            .unwrap();

        let average = services::student_average(&repo, &created.identifier)
            .await
            .unwrap();
        assert_eq!(average, 15.0);

        services::delete_student(&repo, &created.identifier).await.unwrap();
        let err = services::get_student(&repo, &created.identifier).await.unwrap_err();
        assert!(matches!(err, ServiceError::StudentNotFound(_)));
    }
}
