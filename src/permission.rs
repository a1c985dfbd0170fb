//! Permission catalog
//!
//! Permissions are plain dotted names stored in `permissions` and granted to
//! roles through `permission_roles`. The catalog below is the source of truth;
//! [`sync_permissions`] brings the database in line with it.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use tracing::info;

use crate::entity::{permission, permission_role, role};

/// Permission name constants
pub mod perm {
    pub const DASHBOARD: &str = "dashboard";

    pub const USERS_VIEW: &str = "master_data.users.view";
    pub const USERS_CREATE: &str = "master_data.users.create";
    pub const USERS_UPDATE: &str = "master_data.users.update";
    pub const USERS_DELETE: &str = "master_data.users.delete";

    pub const ACADEMIC_YEARS_VIEW: &str = "master_data.academic_years.view";
    pub const ACADEMIC_YEARS_CREATE: &str = "master_data.academic_years.create";
    pub const ACADEMIC_YEARS_UPDATE: &str = "master_data.academic_years.update";
    pub const ACADEMIC_YEARS_DELETE: &str = "master_data.academic_years.delete";

    pub const CLASSROOMS_VIEW: &str = "master_data.classrooms.view";
    pub const CLASSROOMS_CREATE: &str = "master_data.classrooms.create";
    pub const CLASSROOMS_UPDATE: &str = "master_data.classrooms.update";
    pub const CLASSROOMS_DELETE: &str = "master_data.classrooms.delete";

    pub const STUDENTS_VIEW: &str = "master_data.students.view";
    pub const STUDENTS_CREATE: &str = "master_data.students.create";
    pub const STUDENTS_UPDATE: &str = "master_data.students.update";
    pub const STUDENTS_DELETE: &str = "master_data.students.delete";

    pub const SUBJECTS_VIEW: &str = "master_data.subjects.view";
    pub const SUBJECTS_CREATE: &str = "master_data.subjects.create";
    pub const SUBJECTS_UPDATE: &str = "master_data.subjects.update";
    pub const SUBJECTS_DELETE: &str = "master_data.subjects.delete";

    pub const SCHEDULES_VIEW: &str = "master_data.schedules.view";
    pub const SCHEDULES_CREATE: &str = "master_data.schedules.create";
    pub const SCHEDULES_UPDATE: &str = "master_data.schedules.update";
    pub const SCHEDULES_DELETE: &str = "master_data.schedules.delete";

    pub const TEACHER_ATTENDANCE_VIEW: &str = "attendance.teacher.view";
    pub const TEACHER_ATTENDANCE_HISTORY: &str = "attendance.teacher.history";
    pub const TEACHER_ATTENDANCE_ABSENCE: &str = "attendance.teacher.absence";

    pub const JOURNALS_VIEW: &str = "teacher_journals.view";
    pub const JOURNALS_CREATE: &str = "teacher_journals.create";
    pub const JOURNALS_UPDATE: &str = "teacher_journals.update";
    pub const JOURNALS_DELETE: &str = "teacher_journals.delete";

    /// Own teaching schedule
    pub const MY_SCHEDULES_VIEW: &str = "schedules.view";
    pub const STUDENT_ATTENDANCES_VIEW: &str = "student_attendances.view";

    pub const REPORT_STUDENT_ATTENDANCE: &str = "reports.student_attendance.view";
    pub const REPORT_TEACHER_ATTENDANCE: &str = "reports.teacher_attendance.view";
    pub const REPORT_TEACHER_JOURNALS: &str = "reports.teacher_journals.view";

    /// All permissions
    pub const ALL: [&str; 37] = [
        DASHBOARD,
        USERS_VIEW,
        USERS_CREATE,
        USERS_UPDATE,
        USERS_DELETE,
        ACADEMIC_YEARS_VIEW,
        ACADEMIC_YEARS_CREATE,
        ACADEMIC_YEARS_UPDATE,
        ACADEMIC_YEARS_DELETE,
        CLASSROOMS_VIEW,
        CLASSROOMS_CREATE,
        CLASSROOMS_UPDATE,
        CLASSROOMS_DELETE,
        STUDENTS_VIEW,
        STUDENTS_CREATE,
        STUDENTS_UPDATE,
        STUDENTS_DELETE,
        SUBJECTS_VIEW,
        SUBJECTS_CREATE,
        SUBJECTS_UPDATE,
        SUBJECTS_DELETE,
        SCHEDULES_VIEW,
        SCHEDULES_CREATE,
        SCHEDULES_UPDATE,
        SCHEDULES_DELETE,
        TEACHER_ATTENDANCE_VIEW,
        TEACHER_ATTENDANCE_HISTORY,
        TEACHER_ATTENDANCE_ABSENCE,
        JOURNALS_VIEW,
        JOURNALS_CREATE,
        JOURNALS_UPDATE,
        JOURNALS_DELETE,
        MY_SCHEDULES_VIEW,
        STUDENT_ATTENDANCES_VIEW,
        REPORT_STUDENT_ATTENDANCE,
        REPORT_TEACHER_ATTENDANCE,
        REPORT_TEACHER_JOURNALS,
    ];

    /// Default grants of the `teacher` role
    pub const TEACHER_DEFAULTS: [&str; 9] = [
        DASHBOARD,
        MY_SCHEDULES_VIEW,
        STUDENT_ATTENDANCES_VIEW,
        TEACHER_ATTENDANCE_VIEW,
        TEACHER_ATTENDANCE_ABSENCE,
        JOURNALS_VIEW,
        JOURNALS_CREATE,
        JOURNALS_UPDATE,
        JOURNALS_DELETE,
    ];
}

/// Indonesian words for name segments
const LABELS: [(&str, &str); 24] = [
    ("dashboard", "Dasbor"),
    ("master", "Master"),
    ("data", "Data"),
    ("users", "Pengguna"),
    ("academic_years", "Tahun_Ajaran"),
    ("classrooms", "Kelas"),
    ("students", "Siswa"),
    ("subjects", "Mata_Pelajaran"),
    ("schedules", "Jadwal"),
    ("attendance", "Kehadiran"),
    ("teacher", "Guru"),
    ("history", "Riwayat"),
    ("absence", "Ketidakhadiran"),
    ("teacher_journals", "Jurnal_Guru"),
    ("student_attendances", "Absensi_Siswa"),
    ("student_attendance", "Absensi_Siswa"),
    ("teacher_attendance", "Absensi_Guru"),
    ("journals", "Jurnal"),
    ("reports", "Laporan"),
    ("view", "Lihat"),
    ("create", "Tambah"),
    ("update", "Ubah"),
    ("delete", "Hapus"),
    ("student", "Siswa"),
];

fn lookup(word: &str) -> Option<&'static str> {
    LABELS.iter().find(|(k, _)| *k == word).map(|(_, v)| *v)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `master_data.users.view` -> `Master_Data Pengguna Lihat`
pub fn label(name: &str) -> String {
    name.split('.')
        .map(|segment| match lookup(segment) {
            Some(label) => label.to_string(),
            None => segment
                .split('_')
                .map(|sub| lookup(sub).map(str::to_string).unwrap_or_else(|| capitalize(sub)))
                .collect::<Vec<_>>()
                .join("_"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn catalog() -> Vec<&'static str> {
    perm::ALL.to_vec()
}

/// `{value, label}` options for role forms
pub async fn options<C: ConnectionTrait>(db: &C) -> Result<Vec<serde_json::Value>, DbErr> {
    let rows = permission::Entity::find().all(db).await?;
    Ok(rows
        .into_iter()
        .map(|p| serde_json::json!({ "value": p.name, "label": p.label }))
        .collect())
}

/// Replace the permissions of `role_id` with `permission_ids`
pub async fn sync_role<C: ConnectionTrait>(db: &C, role_id: i32, permission_ids: &[i32]) -> Result<(), DbErr> {
    permission_role::Entity::delete_many()
        .filter(permission_role::Column::RoleId.eq(role_id))
        .exec(db)
        .await?;
    for id in permission_ids {
        permission_role::ActiveModel {
            role_id: Set(role_id),
            permission_id: Set(*id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Permission names granted to a role
pub async fn role_permissions<C: ConnectionTrait>(db: &C, role_id: i32) -> Result<Vec<String>, DbErr> {
    let links = permission_role::Entity::find()
        .filter(permission_role::Column::RoleId.eq(role_id))
        .all(db)
        .await?;
    if links.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = links.iter().map(|l| l.permission_id).collect();
    let perms = permission::Entity::find()
        .filter(permission::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(perms.into_iter().map(|p| p.name).collect())
}

/// Upsert the catalog, delete unknown permissions and grant everything to `admin`
pub async fn sync_permissions<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let names = catalog();
    let existing = permission::Entity::find().all(db).await?;

    for name in &names {
        let label = label(name);
        match existing.iter().find(|p| p.name == *name) {
            Some(p) if p.label == label => {}
            Some(p) => {
                let mut active: permission::ActiveModel = p.clone().into();
                active.label = Set(label);
                active.update(db).await?;
                info!("Updated permission label: {}", name);
            }
            None => {
                permission::ActiveModel {
                    name: Set(name.to_string()),
                    label: Set(label),
                    ..Default::default()
                }
                .insert(db)
                .await?;
                info!("Created permission: {}", name);
            }
        }
    }

    let stale: Vec<i32> = existing
        .iter()
        .filter(|p| !names.contains(&p.name.as_str()))
        .map(|p| p.id)
        .collect();
    if !stale.is_empty() {
        permission_role::Entity::delete_many()
            .filter(permission_role::Column::PermissionId.is_in(stale.clone()))
            .exec(db)
            .await?;
        let result = permission::Entity::delete_many()
            .filter(permission::Column::Id.is_in(stale))
            .exec(db)
            .await?;
        info!("Deleted {} permissions not in catalog", result.rows_affected);
    }

    if let Some(admin) = role::Entity::find()
        .filter(role::Column::Name.eq(role::ADMIN))
        .one(db)
        .await?
    {
        let all: Vec<i32> = permission::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        sync_role(db, admin.id, &all).await?;
        info!("All permissions assigned to {}", role::ADMIN);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        assert_eq!(label("master_data.users.view"), "Master_Data Pengguna Lihat");
        assert_eq!(label("attendance.teacher.absence"), "Kehadiran Guru Ketidakhadiran");
        assert_eq!(label("reports.teacher_journals.view"), "Laporan Jurnal_Guru Lihat");
        assert_eq!(label("dashboard"), "Dasbor");
    }

    #[test]
    fn test_catalog_is_distinct() {
        use std::collections::HashSet;

        let names = catalog();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len());
        assert_eq!(names.len(), 37);
        assert!(names.contains(&perm::REPORT_STUDENT_ATTENDANCE));
    }
}
