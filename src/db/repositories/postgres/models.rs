use chrono::NaiveDate;
use diesel::prelude::*;

use super::schema::{grades, students};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StudentRow {
    pub id: i64,
    pub identifier: String,
    pub name: String,
    pub firstname: String,
    pub birthdate: NaiveDate,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = students)]
pub struct NewStudentRow {
    pub identifier: String,
    pub name: String,
    pub firstname: String,
    pub birthdate: NaiveDate,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = grades)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GradeRow {
    pub id: i64,
    pub student_id: i64,
    pub grade: f64,
    pub subject: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = grades)]
pub struct NewGradeRow {
    pub student_id: i64,
    pub grade: f64,
    pub subject: String,
}
