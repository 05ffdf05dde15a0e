//! Student pages: list, dashboard, create, edit and delete.

use axum::{
    Form, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use studentdesk_api::{ApiError, FieldErrors};
use studentdesk_auth::{Authorized, require};
use studentdesk_storage::{DashboardData, NewStudent, Student};
use tracing::info;

use crate::cache::StudentList;
use crate::server::AppState;

const INDEX_PATH: &str = "/Student/Index";
const INVALID_FORM: &str = "One or more validation errors occurred.";

// =============================================================================
// Form
// =============================================================================

/// Submitted create/edit form. Values stay strings so they can be echoed back
/// unchanged next to their errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudentForm {
    #[serde(default, alias = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Email")]
    pub email: String,
    #[serde(default, alias = "Age")]
    pub age: String,
    #[serde(default, alias = "Course")]
    pub course: String,
}

impl StudentForm {
    /// Validates the fields shared by create and edit.
    pub fn to_new_student(&self) -> Result<NewStudent, FieldErrors> {
        let mut errors = FieldErrors::new();
        let student = self.fields(&mut errors);
        errors.into_result()?;
        Ok(student)
    }

    /// Validates an edit submission, which also carries the id.
    pub fn to_student(&self) -> Result<Student, FieldErrors> {
        let mut errors = FieldErrors::new();
        let id = integer(&mut errors, "Id", self.id.as_deref().unwrap_or_default());
        let student = self.fields(&mut errors);
        errors.into_result()?;
        Ok(Student::from_new(id.unwrap_or_default(), student))
    }

    fn fields(&self, errors: &mut FieldErrors) -> NewStudent {
        let name = required(errors, "Name", &self.name);
        let email = required(errors, "Email", &self.email);
        let age = integer(errors, "Age", &self.age);

        let student = NewStudent::new(name, email, age.unwrap_or_default());
        match self.course.trim() {
            "" => student,
            course => student.with_course(course),
        }
    }
}

fn required(errors: &mut FieldErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("The {field} field is required."));
    }
    value.to_string()
}

fn integer(errors: &mut FieldErrors, field: &str, value: &str) -> Option<i32> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("The {field} field is required."));
        return None;
    }
    match value.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.add(field, format!("The value '{value}' is not valid for {field}."));
            None
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn cached_students(state: &AppState) -> Result<StudentList, ApiError> {
    let service = state.students.clone();
    let students = state
        .cache
        .get_or_load(|| async move { service.list().await })
        .await?;
    Ok(students)
}

pub async fn index(
    _auth: Authorized<require::StudentView>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Student>>, ApiError> {
    let students = cached_students(&state).await?;
    Ok(Json(students.to_vec()))
}

pub async fn dashboard(
    _auth: Authorized<require::StudentDashboard>,
    State(state): State<AppState>,
) -> Result<Json<DashboardData>, ApiError> {
    let students = cached_students(&state).await?;
    Ok(Json(DashboardData::from_students(&students)))
}

pub async fn create_form(_auth: Authorized<require::StudentCreate>) -> Json<StudentForm> {
    Json(StudentForm::default())
}

pub async fn create(
    auth: Authorized<require::StudentCreate>,
    State(state): State<AppState>,
    Form(form): Form<StudentForm>,
) -> Result<Redirect, ApiError> {
    let new = form
        .to_new_student()
        .map_err(|errors| ApiError::invalid_form(INVALID_FORM, errors, &form))?;

    let student = state.students.create(new).await?;
    state.cache.invalidate().await;
    info!(student_id = student.id, by = %auth.principal.email, "Student created");
    Ok(Redirect::to(INDEX_PATH))
}

pub async fn edit_form(
    _auth: Authorized<require::StudentEdit>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    Ok(match state.students.find(id).await? {
        Some(student) => Json(student).into_response(),
        None => Redirect::to(INDEX_PATH).into_response(),
    })
}

pub async fn edit(
    auth: Authorized<require::StudentEdit>,
    State(state): State<AppState>,
    Form(form): Form<StudentForm>,
) -> Result<Redirect, ApiError> {
    let student = form
        .to_student()
        .map_err(|errors| ApiError::invalid_form(INVALID_FORM, errors, &form))?;

    state.students.update(&student).await?;
    state.cache.invalidate().await;
    info!(student_id = student.id, by = %auth.principal.email, "Student updated");
    Ok(Redirect::to(INDEX_PATH))
}

pub async fn delete_confirm(
    _auth: Authorized<require::StudentDelete>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    Ok(match state.students.find(id).await? {
        Some(student) => Json(student).into_response(),
        None => Redirect::to(INDEX_PATH).into_response(),
    })
}

pub async fn delete(
    auth: Authorized<require::StudentDelete>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Redirect, ApiError> {
    if state.students.delete(id).await? {
        state.cache.invalidate().await;
        info!(student_id = id, by = %auth.principal.email, "Student deleted");
    }
    Ok(Redirect::to(INDEX_PATH))
}
