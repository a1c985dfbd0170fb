use sea_orm::sea_query::{Alias, Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbBackend, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Schema, Set, Statement,
};
use std::time::Duration;
use tracing::info;

use crate::config::{DatabaseConfig, SeedConfig};
use crate::entity::{
    academic_year, attendance_history, classroom, configuration_setting, journal, journal_subject,
    model_log, permission, permission_role, personal_access_token, request_log, role, schedule,
    student, student_attendance, student_attendance_detail, student_attendance_subject,
    student_class_history, subject, teacher_attendance, user,
};
use crate::permission::{perm, sync_permissions, sync_role};

/// Initialize database connection and auto-migrate tables
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let database_url = config.connection_url();

    let mut opt = ConnectOptions::new(&database_url);
    if config.is_sqlite() {
        info!("Connecting to sqlite database: {}", config.path);
        // an in-memory database lives only as long as its single connection
        opt.max_connections(1).min_connections(1);
    } else {
        info!("Connecting to database: {}:{}/{}", config.host, config.port, config.name);
        opt.max_connections(100)
            .min_connections(5)
            .idle_timeout(Duration::from_secs(300))
            .set_schema_search_path("public");
    }
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;
    info!("Database connection established");

    auto_migrate(&db).await?;

    Ok(db)
}

/// Create missing tables and indexes
pub async fn auto_migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    info!("Running auto-migration for all entities...");

    // Create tables in dependency order
    // 1. Independent tables first
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(role::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(permission::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(academic_year::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(subject::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(configuration_setting::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(model_log::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(request_log::Entity)).await?;

    // 2. Tables with foreign key dependencies
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(permission_role::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(user::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(personal_access_token::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(classroom::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(student::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(schedule::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(journal::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(journal_subject::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(student_attendance::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(student_attendance_subject::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(student_attendance_detail::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(teacher_attendance::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(attendance_history::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(student_class_history::Entity)).await?;

    // 3. Composite unique indexes
    create_unique_index(db, backend, "student_attendances", &["date", "class_id"]).await?;
    create_unique_index(db, backend, "teacher_attendances", &["teacher_id", "date"]).await?;
    create_unique_index(db, backend, "journal_subjects", &["journal_id", "subject_id"]).await?;
    create_unique_index(db, backend, "permission_roles", &["permission_id", "role_id"]).await?;

    info!("Auto-migration completed successfully");
    Ok(())
}

/// Create a table if it doesn't exist
async fn create_table_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: TableCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();

    let sql = backend.build(&stmt);

    db.execute(Statement::from_string(backend, sql.to_string())).await?;

    Ok(())
}

fn unique_index(table: &str, columns: &[&str]) -> IndexCreateStatement {
    let mut stmt = Index::create();
    stmt.if_not_exists()
        .name(format!("uq_{}_{}", table, columns.join("_")))
        .table(Alias::new(table))
        .unique();
    for column in columns {
        stmt.col(Alias::new(*column));
    }
    stmt
}

async fn create_unique_index(
    db: &DatabaseConnection,
    backend: DbBackend,
    table: &str,
    columns: &[&str],
) -> Result<(), DbErr> {
    let stmt = unique_index(table, columns);
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Idempotent seed: roles, permission catalog, first admin, configuration defaults
pub async fn seed(db: &DatabaseConnection, config: &SeedConfig) -> Result<(), DbErr> {
    let admin_role = ensure_role(db, role::ADMIN, "Admin").await?;
    let teacher_role = ensure_role(db, role::TEACHER, "Teacher").await?;

    sync_permissions(db).await?;

    // a fresh teacher role gets the day-to-day permissions
    let teacher_grants = permission_role::Entity::find()
        .filter(permission_role::Column::RoleId.eq(teacher_role.id))
        .count(db)
        .await?;
    if teacher_grants == 0 {
        let ids: Vec<i32> = permission::Entity::find()
            .filter(permission::Column::Name.is_in(perm::TEACHER_DEFAULTS))
            .all(db)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        sync_role(db, teacher_role.id, &ids).await?;
    }

    if user::Entity::find().count(db).await? == 0 {
        let hashed = bcrypt::hash(&config.admin_password, bcrypt::DEFAULT_COST)
            .map_err(|e| DbErr::Custom(format!("Failed to hash password: {}", e)))?;
        user::ActiveModel {
            name: Set(config.admin_name.clone()),
            email: Set(config.admin_email.clone()),
            password: Set(hashed),
            role_id: Set(Some(admin_role.id)),
            active: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!("Created administrator account: {}", config.admin_email);
    }

    for (name, value) in configuration_setting::DEFAULTS {
        if configuration_setting::Entity::find_by_id(name.to_string())
            .one(db)
            .await?
            .is_none()
        {
            configuration_setting::ActiveModel {
                name: Set(name.to_string()),
                value: Set(Some(value.to_string())),
            }
            .insert(db)
            .await?;
        }
    }

    Ok(())
}

async fn ensure_role<C: ConnectionTrait>(db: &C, name: &str, label: &str) -> Result<role::Model, DbErr> {
    if let Some(existing) = role::Entity::find()
        .filter(role::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(existing);
    }
    role::ActiveModel {
        name: Set(name.to_string()),
        label: Set(label.to_string()),
        active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::PostgresQueryBuilder;

    #[test]
    fn test_unique_index_statement() {
        let sql = unique_index("teacher_attendances", &["teacher_id", "date"]).to_string(PostgresQueryBuilder);
        assert!(sql.contains("CREATE UNIQUE INDEX IF NOT EXISTS"), "{}", sql);
        assert!(sql.contains(r#""uq_teacher_attendances_teacher_id_date""#), "{}", sql);
    }

    #[tokio::test]
    async fn test_migrate_and_seed_are_idempotent() {
        let config = DatabaseConfig::sqlite(":memory:");
        let db = init_database(&config).await.unwrap();
        auto_migrate(&db).await.unwrap();

        let seed_config = SeedConfig::default();
        seed(&db, &seed_config).await.unwrap();
        seed(&db, &seed_config).await.unwrap();

        assert_eq!(user::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(role::Entity::find().count(&db).await.unwrap(), 2);
        assert_eq!(
            permission::Entity::find().count(&db).await.unwrap(),
            perm::ALL.len() as u64
        );

        let admin = role::Entity::find()
            .filter(role::Column::Name.eq(role::ADMIN))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        let granted = crate::permission::role_permissions(&db, admin.id).await.unwrap();
        assert_eq!(granted.len(), perm::ALL.len());

        let school = configuration_setting::Entity::find_by_id("school_name".to_string())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(school.value.as_deref(), Some("AdaJago"));
    }
}
