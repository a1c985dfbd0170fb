//! End-to-end requests against an in-memory database

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::create_router;
use crate::config::{Config, DatabaseConfig, SeedConfig};
use crate::db;
use crate::state::AppState;

async fn app() -> Router {
    let config = Config {
        database: DatabaseConfig::sqlite(":memory:"),
        storage_dir: std::env::temp_dir().join("sekolah-test-storage"),
        ..Default::default()
    };
    let conn = db::init_database(&config.database).await.unwrap();
    db::seed(&conn, &SeedConfig::default()).await.unwrap();
    create_router(AppState::new(conn, config))
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn login_as(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn login(app: &Router) -> String {
    login_as(app, "admin@sekolah.test", "password").await
}

/// A user holding the seeded `teacher` role; returns (id, token)
async fn teacher(app: &Router, admin: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/users",
        Some(admin),
        Some(json!({
            "name": "Bu Sari",
            "email": "sari@sekolah.test",
            "password": "rahasia1",
            "role_id": 2,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let id = body["data"]["id"].as_i64().unwrap();
    (id, login_as(app, "sari@sekolah.test", "rahasia1").await)
}

async fn create_student(app: &Router, token: &str, nis: &str, class_id: i64) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/students",
        Some(token),
        Some(json!({ "nis": nis, "name": format!("Siswa {}", nis), "gender": "L", "class_id": class_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["data"]["id"].as_i64().unwrap()
}

/// Active year, two classes and two subjects; returns (class ids, subject ids)
async fn master_data(app: &Router, token: &str) -> (Vec<i64>, Vec<i64>) {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/academic-years",
        Some(token),
        Some(json!({
            "name": "2024/2025",
            "semester": 1,
            "start_date": "2024-07-01",
            "end_date": "2025-06-30",
            "active": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let mut classes = Vec::new();
    for name in ["X IPA 1", "X IPA 2"] {
        let (status, body) = send(app, "POST", "/api/v1/classrooms", Some(token), Some(json!({ "name": name }))).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        classes.push(body["data"]["id"].as_i64().unwrap());
    }

    let mut subjects = Vec::new();
    for name in ["Matematika", "Fisika"] {
        let (status, body) = send(app, "POST", "/api/v1/subjects", Some(token), Some(json!({ "name": name }))).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        subjects.push(body["data"]["id"].as_i64().unwrap());
    }
    (classes, subjects)
}

#[tokio::test]
async fn test_health_and_auth() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");

    let (status, _) = send(&app, "GET", "/api/v1/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/v1/me", Some("1|wrong"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/login",
        None,
        Some(json!({ "email": "admin@sekolah.test", "password": "salah" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["email"].is_array(), "{}", body);

    let token = login(&app).await;
    let (status, body) = send(&app, "GET", "/api/v1/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, _) = send(&app, "POST", "/api/v1/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/api/v1/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = app().await;
    let token = login(&app).await;
    let (status, body) = send(&app, "GET", "/api/v1/nothing-here", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_journal_lifecycle() {
    let app = app().await;
    let token = login(&app).await;
    let (classes, subjects) = master_data(&app, &token).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/journals",
        Some(&token),
        Some(json!({ "class_id": classes[0], "date": "2024-09-02", "theme": "Tema", "activity": "Kegiatan" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["subject_ids"].is_array(), "{}", body);

    let mut ids = Vec::new();
    for class_id in &classes {
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/journals",
            Some(&token),
            Some(json!({
                "class_id": class_id,
                "date": "2024-09-02",
                "theme": "Persamaan linear",
                "activity": "Diskusi kelompok",
                "subject_ids": subjects,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["message"], "Jurnal guru berhasil dibuat");
        assert_eq!(body["data"]["journal"]["subjects"].as_array().unwrap().len(), 2);
        ids.push(body["data"]["journal"]["id"].as_i64().unwrap());
    }

    let uri = format!("/api/v1/journals?filter[class_id]={}", classes[0]);
    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["meta"]["total"], 1);

    // the older prefix serves the same resource
    let uri = format!("/api/v1/teacher-journals/{}", ids[0]);
    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let uri = format!("/api/v1/journals/{}", ids[0]);
    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(&token),
        Some(json!({
            "class_id": classes[0],
            "date": "2024-09-03",
            "theme": "Persamaan kuadrat",
            "activity": "Latihan soal",
            "subject_ids": [subjects[1]],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["journal"]["theme"], "Persamaan kuadrat");
    assert_eq!(body["data"]["journal"]["subjects"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/reports/teacher-journals/summary?start_date=2024-09-01&end_date=2024-09-30",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["summary"]["total_journals"], 2);
    assert_eq!(body["data"]["summary"]["unique_classes"], 2);
    assert_eq!(body["data"]["summary"]["subject_breakdown"][0]["subject_name"], "Fisika");

    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_teacher_attendance_flow() {
    let app = app().await;
    let token = login(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/teacher-attendances/check-in",
        Some(&token),
        Some(json!({ "teacher_id": 1, "date": "2024-09-02", "time_in": "07:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let id = body["data"]["teacher_attendance"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/teacher-attendances/check-in",
        Some(&token),
        Some(json!({ "teacher_id": 1, "date": "2024-09-02", "time_in": "07:05" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["date"].is_array(), "{}", body);

    let uri = format!("/api/v1/teacher-attendances/{}/check-out", id);
    let (status, body) = send(&app, "POST", &uri, Some(&token), Some(json!({ "time_out": "06:00" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);

    let (status, body) = send(&app, "POST", &uri, Some(&token), Some(json!({ "time_out": "15:00" }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["teacher_attendance"]["status"], "check_out");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/teacher-attendances/sick-leave",
        Some(&token),
        Some(json!({ "teacher_id": 1, "date": "2024-09-03", "status": "sick", "notes": "Demam" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let uri = format!("/api/v1/teacher-attendances/{}/histories", id);
    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["histories"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/reports/teacher-attendance/summary?month=2024-09",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["summary"]["total_records"], 2);
    assert_eq!(body["data"]["summary"]["present_days"], 1);
    assert_eq!(body["data"]["summary"]["sick_days"], 1);
    assert_eq!(body["data"]["summary"]["attendance_percentage"], 50.0);

    let (status, _) = send(
        &app,
        "GET",
        "/api/v1/reports/teacher-attendance/summary?month=2024-13",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_report_export_headers() {
    let app = app().await;
    let token = login(&app).await;

    let request = Request::builder()
        .uri("/api/v1/reports/teacher-attendance/export/excel")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("laporan-absensi-guru-"), "{}", disposition);
    assert!(disposition.contains(".csv"), "{}", disposition);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"No,Tanggal,Nama Guru,NIP"));
}

#[tokio::test]
async fn test_set_active_moves_classrooms() {
    let app = app().await;
    let token = login(&app).await;
    let (classes, _) = master_data(&app, &token).await;

    let (status, body) = send(&app, "GET", "/api/v1/academic-years/active", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let first = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/academic-years",
        Some(&token),
        Some(json!({ "name": "2025/2026", "semester": 1, "start_date": "2025-07-01", "end_date": "2026-06-30" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["active"], false);
    let second = body["data"]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/academic-years/{}/set-active", second);
    let (status, body) = send(&app, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["active"], true);

    let uri = format!("/api/v1/academic-years/{}", first);
    let (_, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(body["data"]["active"], false);

    for class_id in &classes {
        let uri = format!("/api/v1/classrooms/{}", class_id);
        let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["data"]["academic_year_id"], second);
    }
}

#[tokio::test]
async fn test_update_without_active_keeps_flag() {
    let app = app().await;
    let token = login(&app).await;
    let (_, subjects) = master_data(&app, &token).await;

    let (_, body) = send(&app, "GET", "/api/v1/academic-years/active", Some(&token), None).await;
    let year = body["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/academic-years/{}", year);
    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(&token),
        Some(json!({ "name": "2024/2025", "semester": 2, "start_date": "2024-07-01", "end_date": "2025-06-30" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["active"], true);
    let (status, body) = send(&app, "GET", "/api/v1/academic-years/active", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["id"], year);

    let uri = format!("/api/v1/subjects/{}", subjects[0]);
    let (status, body) = send(&app, "PUT", &uri, Some(&token), Some(json!({ "name": "Matematika", "active": false }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["active"], false);
    let (status, body) = send(&app, "PUT", &uri, Some(&token), Some(json!({ "name": "Matematika Wajib" }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["name"], "Matematika Wajib");
    assert_eq!(body["data"]["active"], false);
}

#[tokio::test]
async fn test_delete_guards() {
    let app = app().await;
    let token = login(&app).await;
    let (classes, subjects) = master_data(&app, &token).await;
    create_student(&app, &token, "1001", classes[0]).await;

    let uri = format!("/api/v1/classrooms/{}", classes[0]);
    let (status, body) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["class_id"][0], "Kelas masih memiliki siswa");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/schedules",
        Some(&token),
        Some(json!({
            "teacher_id": 1,
            "subject_id": subjects[0],
            "class_id": classes[1],
            "day": "Senin",
            "start_time": "07:00",
            "end_time": "08:30",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let uri = format!("/api/v1/subjects/{}", subjects[0]);
    let (status, body) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["subject_id"][0], "Mata pelajaran masih digunakan pada jadwal");

    // neither guard blocks unused rows
    let uri = format!("/api/v1/subjects/{}", subjects[1]);
    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_student_class_history() {
    let app = app().await;
    let token = login(&app).await;
    let (classes, _) = master_data(&app, &token).await;
    let student = create_student(&app, &token, "2001", classes[0]).await;

    let uri = format!("/api/v1/student-class-histories/student/{}", student);
    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/students/{}", student),
        Some(&token),
        Some(json!({ "nis": "2001", "name": "Siswa 2001", "gender": "L", "class_id": classes[1] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (_, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let uri = format!("/api/v1/student-class-histories/student/{}/current", student);
    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["class_id"], classes[1]);
    assert!(body["data"]["end_date"].is_null());
}

#[tokio::test]
async fn test_save_class_upserts() {
    let app = app().await;
    let token = login(&app).await;
    let (classes, subjects) = master_data(&app, &token).await;
    let student = create_student(&app, &token, "3001", classes[0]).await;

    let mut ids = Vec::new();
    for status_name in ["hadir", "sakit"] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/student-attendances/save-class",
            Some(&token),
            Some(json!({
                "date": "2024-09-02",
                "class_id": classes[0],
                "students": [{ "student_id": student, "status": status_name }],
                "subjects": [{ "subject_id": subjects[0] }],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        let saved = &body["data"]["student_attendance"];
        assert_eq!(saved["details"].as_array().unwrap().len(), 1);
        assert_eq!(saved["details"][0]["status"], status_name);
        ids.push(saved["id"].as_i64().unwrap());
    }
    assert_eq!(ids[0], ids[1]);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/student-attendances",
        Some(&token),
        Some(json!({
            "date": "2024-09-02",
            "class_id": classes[0],
            "subjects": [{ "subject_id": subjects[1] }],
            "details": [{ "student_id": student, "status": "hadir" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["date"][0], "Tanggal kehadiran sudah ada");
}

#[tokio::test]
async fn test_role_permissions_and_forbidden() {
    let app = app().await;
    let admin = login(&app).await;
    let (teacher_id, teacher_token) = teacher(&app, &admin).await;

    let (status, _) = send(&app, "GET", "/api/v1/students", Some(&teacher_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "GET", "/api/v1/roles", Some(&teacher_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/v1/permissions/options", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["data"].as_array().unwrap().iter().any(|p| p["value"] == "teacher_journals.view"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/roles",
        Some(&admin),
        Some(json!({ "name": "Wali Kelas", "permissions": ["teacher_journals.view", "nope.view"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["permissions"].is_array(), "{}", body);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/roles",
        Some(&admin),
        Some(json!({ "name": "Wali Kelas", "permissions": ["teacher_journals.view", "master_data.users.view"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["name"], "wali_kelas");
    assert_eq!(body["data"]["permissions"].as_array().unwrap().len(), 2);
    let role_id = body["data"]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/roles/{}", role_id);
    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(&admin),
        Some(json!({ "name": "Wali Kelas", "permissions": ["master_data.students.view"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let permissions = body["data"]["permissions"].as_array().unwrap();
    assert_eq!(permissions.len(), 1);
    assert_eq!(permissions[0]["name"], "master_data.students.view");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/users/{}", teacher_id),
        Some(&admin),
        Some(json!({ "name": "Bu Sari", "email": "sari@sekolah.test", "role_id": role_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let (status, body) = send(&app, "GET", "/api/v1/students", Some(&teacher_token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

#[tokio::test]
async fn test_list_meta() {
    let app = app().await;
    let token = login(&app).await;
    let (classes, _) = master_data(&app, &token).await;
    for nis in ["4001", "4002", "4003"] {
        create_student(&app, &token, nis, classes[0]).await;
    }

    let (status, body) = send(&app, "GET", "/api/v1/students?all=true", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["meta"], json!({ "total": 3, "all": true }));

    let (status, body) = send(&app, "GET", "/api/v1/students?per_page=2&page=2", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let meta = &body["meta"];
    assert_eq!(meta["total"], 3);
    assert_eq!(meta["current_page"], 2);
    assert_eq!(meta["last_page"], 2);
    assert_eq!(meta["per_page"], 2);
    assert!(meta["next_page_url"].is_null());
    assert!(meta["prev_page_url"].as_str().unwrap().contains("page=1"));
}

#[tokio::test]
async fn test_check_in_requires_teacher() {
    let app = app().await;
    let token = login(&app).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/teacher-attendances/check-in",
        Some(&token),
        Some(json!({ "date": "2024-09-02", "time_in": "07:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["teacher_id"][0], "Guru harus dipilih");
}
