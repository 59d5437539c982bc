//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic. Handlers only translate between the
//! wire format and service calls; every domain error becomes a response,
//! never a panic.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::dto::{GradeDto, HealthResponse, StudentCreatedDto, StudentDto};
use super::error::AppError;
use super::extract::AppJson;
use super::state::AppState;
use crate::api::{GradeInput, StudentInput};
use crate::db::services::{self as db_services, ServiceError};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// GET /health
///
/// Health check endpoint to verify the service is running and the storage
/// backend is reachable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let database = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database,
    }))
}

/// GET /students
///
/// List all students with their grades.
pub async fn list_students(State(state): State<AppState>) -> HandlerResult<Vec<StudentDto>> {
    let students = db_services::list_students(state.repository.as_ref()).await?;
    Ok(Json(students.into_iter().map(Into::into).collect()))
}

/// GET /students/{identifier}
///
/// Fetch one student by opaque identifier.
pub async fn get_student(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> HandlerResult<StudentDto> {
    let student = db_services::get_student(state.repository.as_ref(), &identifier).await?;
    Ok(Json(student.into()))
}

/// POST /students
///
/// Create a student. The opaque identifier is generated server-side and
/// returned in the response; the grades collection is omitted.
pub async fn create_student(
    State(state): State<AppState>,
    AppJson(input): AppJson<StudentInput>,
) -> Result<(StatusCode, Json<StudentCreatedDto>), AppError> {
    let student = db_services::create_student(state.repository.as_ref(), &input).await?;
    Ok((StatusCode::CREATED, Json(student.into())))
}

/// PUT/PATCH /students/{identifier}
///
/// Full replace of a student's name, firstname, and birthdate. One handler
/// serves both verbs; clients treat them identically.
pub async fn update_student(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    AppJson(input): AppJson<StudentInput>,
) -> HandlerResult<StudentCreatedDto> {
    let student =
        db_services::update_student(state.repository.as_ref(), &identifier, &input).await?;
    Ok(Json(student.into()))
}

/// DELETE /students/{identifier}
///
/// Delete a student and, by cascade, all of its grades.
pub async fn delete_student(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<StatusCode, AppError> {
    db_services::delete_student(state.repository.as_ref(), &identifier).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /students/{identifier}/grades
///
/// Attach a grade to an existing student.
pub async fn add_grade(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    AppJson(input): AppJson<GradeInput>,
) -> Result<(StatusCode, Json<GradeDto>), AppError> {
    let grade = db_services::add_grade(state.repository.as_ref(), &identifier, &input).await?;
    Ok((StatusCode::CREATED, Json(grade.into())))
}

/// GET /students/{identifier}/grades/average
///
/// Arithmetic mean of one student's grades.
pub async fn student_average(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Response, AppError> {
    match db_services::student_average(state.repository.as_ref(), &identifier).await {
        Ok(average) => Ok(Json(average).into_response()),
        // A student without grades is not an error condition: answer 200
        // with the explanatory message as the body.
        Err(ServiceError::NoGrades(message)) => Ok(Json(message).into_response()),
        Err(e) => Err(e.into()),
    }
}

/// GET /grades/average
///
/// Arithmetic mean of all grades known for all students.
pub async fn global_average(State(state): State<AppState>) -> Result<Response, AppError> {
    match db_services::global_average(state.repository.as_ref()).await {
        Ok(average) => Ok(Json(average).into_response()),
        Err(ServiceError::NoGrades(message)) => Ok(Json(message).into_response()),
        Err(e) => Err(e.into()),
    }
}
