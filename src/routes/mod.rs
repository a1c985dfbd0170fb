use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::error::AppError;
use crate::handlers;
use crate::middleware::{auth_layer, request_log_layer};
use crate::state::AppState;

pub mod health;

/// `{message, data}` envelope of every successful response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_message("Berhasil", data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// A message without data
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

fn journal_routes() -> Router<AppState> {
    use handlers::journal::*;

    Router::new()
        .route("/", get(list_journals).post(create_journal))
        .route("/dashboard", get(dashboard))
        .route("/today-subjects", get(today_subjects))
        .route("/form-data", get(form_data))
        .route("/teacher/:id", get(journals_by_teacher))
        .route("/class/:id", get(journals_by_class))
        .route("/date/:date", get(journals_by_date))
        .route("/:id", get(get_journal).put(update_journal).delete(delete_journal))
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let v1 = Router::new()
        // Auth
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/me", get(handlers::auth::me))
        .route("/profile", put(handlers::auth::update_profile))
        // Users, roles and permissions
        .route("/users", get(handlers::user::list_users).post(handlers::user::create_user))
        .route(
            "/users/:id",
            get(handlers::user::get_user)
                .put(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        )
        .route("/users/:id/photo", post(handlers::user::upload_photo))
        .route("/roles", get(handlers::role::list_roles).post(handlers::role::create_role))
        .route(
            "/roles/:id",
            get(handlers::role::get_role)
                .put(handlers::role::update_role)
                .delete(handlers::role::delete_role),
        )
        .route("/permissions/options", get(handlers::role::permission_options))
        // Master data
        .route(
            "/academic-years",
            get(handlers::academic_year::list_academic_years).post(handlers::academic_year::create_academic_year),
        )
        .route("/academic-years/options", get(handlers::academic_year::academic_year_options))
        .route("/academic-years/active", get(handlers::academic_year::active_academic_year))
        .route(
            "/academic-years/:id",
            get(handlers::academic_year::get_academic_year)
                .put(handlers::academic_year::update_academic_year)
                .delete(handlers::academic_year::delete_academic_year),
        )
        .route(
            "/academic-years/:id/set-active",
            post(handlers::academic_year::set_active_academic_year),
        )
        .route(
            "/classrooms",
            get(handlers::classroom::list_classrooms).post(handlers::classroom::create_classroom),
        )
        .route("/classrooms/options", get(handlers::classroom::classroom_options))
        .route(
            "/classrooms/:id",
            get(handlers::classroom::get_classroom)
                .put(handlers::classroom::update_classroom)
                .delete(handlers::classroom::delete_classroom),
        )
        .route("/subjects", get(handlers::subject::list_subjects).post(handlers::subject::create_subject))
        .route("/subjects/options", get(handlers::subject::subject_options))
        .route(
            "/subjects/:id",
            get(handlers::subject::get_subject)
                .put(handlers::subject::update_subject)
                .delete(handlers::subject::delete_subject),
        )
        .route("/students", get(handlers::student::list_students).post(handlers::student::create_student))
        .route(
            "/students/:id",
            get(handlers::student::get_student)
                .put(handlers::student::update_student)
                .delete(handlers::student::delete_student),
        )
        .route(
            "/schedules",
            get(handlers::schedule::list_schedules).post(handlers::schedule::create_schedule),
        )
        .route("/schedules/today", get(handlers::schedule::today_schedules))
        .route(
            "/schedules/:id",
            get(handlers::schedule::get_schedule)
                .put(handlers::schedule::update_schedule)
                .delete(handlers::schedule::delete_schedule),
        )
        // Journals, also reachable under their older name
        .nest("/journals", journal_routes())
        .nest("/teacher-journals", journal_routes())
        // Student attendance
        .route(
            "/student-attendances",
            get(handlers::student_attendance::list_student_attendances)
                .post(handlers::student_attendance::create_student_attendance),
        )
        .route(
            "/student-attendances/date/:date",
            get(handlers::student_attendance::students_by_date),
        )
        .route(
            "/student-attendances/teacher-data",
            get(handlers::student_attendance::teacher_data),
        )
        .route(
            "/student-attendances/save-class",
            post(handlers::student_attendance::save_class),
        )
        .route(
            "/student-attendances/today-classes",
            get(handlers::student_attendance::today_classes),
        )
        .route(
            "/student-attendances/:id",
            get(handlers::student_attendance::get_student_attendance)
                .put(handlers::student_attendance::update_student_attendance)
                .delete(handlers::student_attendance::delete_student_attendance),
        )
        // Teacher attendance
        .route(
            "/teacher-attendances",
            get(handlers::teacher_attendance::list_teacher_attendances),
        )
        .route(
            "/teacher-attendances/history",
            get(handlers::teacher_attendance::attendance_history_list),
        )
        .route("/teacher-attendances/check-in", post(handlers::teacher_attendance::check_in))
        .route("/teacher-attendances/sick-leave", post(handlers::teacher_attendance::sick_leave))
        .route("/teacher-attendances/today", get(handlers::teacher_attendance::today_attendance))
        .route(
            "/teacher-attendances/by-teacher-date",
            get(handlers::teacher_attendance::by_teacher_date),
        )
        .route(
            "/teacher-attendances/monthly-report",
            get(handlers::teacher_attendance::monthly_report),
        )
        .route(
            "/teacher-attendances/:id",
            get(handlers::teacher_attendance::get_teacher_attendance)
                .delete(handlers::teacher_attendance::delete_teacher_attendance),
        )
        .route("/teacher-attendances/:id/check-out", post(handlers::teacher_attendance::check_out))
        .route("/teacher-attendances/:id/status", patch(handlers::teacher_attendance::update_status))
        .route("/teacher-attendances/:id/photo", post(handlers::teacher_attendance::upload_photo))
        .route("/teacher-attendances/:id/histories", get(handlers::teacher_attendance::histories))
        // Class history
        .route(
            "/student-class-histories",
            get(handlers::student_class_history::list_class_histories)
                .post(handlers::student_class_history::create_class_history),
        )
        .route(
            "/student-class-histories/student/:id",
            get(handlers::student_class_history::histories_by_student),
        )
        .route(
            "/student-class-histories/student/:id/current",
            get(handlers::student_class_history::current_class),
        )
        .route(
            "/student-class-histories/class/:id",
            get(handlers::student_class_history::histories_by_class),
        )
        .route(
            "/student-class-histories/academic-year/:id",
            get(handlers::student_class_history::histories_by_academic_year),
        )
        .route(
            "/student-class-histories/:id",
            get(handlers::student_class_history::get_class_history)
                .put(handlers::student_class_history::update_class_history)
                .delete(handlers::student_class_history::delete_class_history),
        )
        // Reports
        .route(
            "/reports/student-attendance",
            get(handlers::report::student_attendance_report),
        )
        .route(
            "/reports/student-attendance/summary",
            get(handlers::report::student_attendance_summary),
        )
        .route(
            "/reports/student-attendance/export/pdf",
            get(handlers::report::student_attendance_pdf),
        )
        .route(
            "/reports/student-attendance/export/excel",
            get(handlers::report::student_attendance_excel),
        )
        .route(
            "/reports/teacher-attendance",
            get(handlers::report::teacher_attendance_report),
        )
        .route(
            "/reports/teacher-attendance/summary",
            get(handlers::report::teacher_attendance_summary),
        )
        .route(
            "/reports/teacher-attendance/export/pdf",
            get(handlers::report::teacher_attendance_pdf),
        )
        .route(
            "/reports/teacher-attendance/export/excel",
            get(handlers::report::teacher_attendance_excel),
        )
        .route("/reports/teacher-journals", get(handlers::report::teacher_journal_report))
        .route(
            "/reports/teacher-journals/summary",
            get(handlers::report::teacher_journal_summary),
        )
        .route(
            "/reports/teacher-journals/export/pdf",
            get(handlers::report::teacher_journal_pdf),
        )
        .route(
            "/reports/teacher-journals/export/excel",
            get(handlers::report::teacher_journal_excel),
        )
        // Settings and logs
        .route("/configurations", get(handlers::configuration::list_configurations))
        .route(
            "/configurations/:name",
            get(handlers::configuration::get_configuration).patch(handlers::configuration::update_configuration),
        )
        .route("/logs/models", get(handlers::audit::list_model_logs))
        .route("/logs/requests", get(handlers::audit::list_request_logs));

    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        .nest("/v1", v1)
        .layer(DefaultBodyLimit::max(state.config.max_upload_size));

    // Uploaded photos are served as-is
    let storage = ServeDir::new(state.config.storage_dir.clone());

    Router::new()
        .nest("/api", api_routes)
        .nest_service("/storage", storage)
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .layer(middleware::from_fn_with_state(state.clone(), request_log_layer))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Fallback handler for 404
pub async fn fallback() -> impl IntoResponse {
    AppError::NotFound("Endpoint tidak ditemukan".to_string())
}

#[cfg(test)]
mod tests;
