use chrono::Utc;
use sqlx::any::{install_default_drivers, AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::models::UserSummary;

/// Pool options and connection URL for the active database variant.
pub fn pool_options(config: &DatabaseConfig) -> Result<(AnyPoolOptions, String), AppError> {
    match config {
        DatabaseConfig::LocalFile { path } => {
            let url = format!("sqlite://{}?mode=rwc", path.display());
            Ok((AnyPoolOptions::new().max_connections(5), url))
        }
        DatabaseConfig::Remote {
            url,
            max_connection_age,
        } => {
            let url = url
                .as_deref()
                .filter(|url| !url.is_empty())
                .ok_or_else(|| AppError::Internal("database url is not configured".to_string()))?;
            let options = AnyPoolOptions::new()
                .max_connections(10)
                .max_lifetime(*max_connection_age);
            Ok((options, url.to_string()))
        }
    }
}

pub async fn connect(config: &DatabaseConfig) -> Result<AnyPool, AppError> {
    install_default_drivers();

    let (options, url) = pool_options(config)?;
    match config {
        DatabaseConfig::LocalFile { path } => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::Internal(format!("create database dir: {}", e)))?;
            }
            tracing::info!("using local database at {}", path.display());
        }
        DatabaseConfig::Remote {
            max_connection_age, ..
        } => {
            tracing::info!(
                "using remote database, max connection age {}s",
                max_connection_age.as_secs()
            );
        }
    }

    options
        .connect(&url)
        .await
        .map_err(|e| AppError::Internal(format!("connect database: {}", e)))
}

pub async fn init_db(pool: &AnyPool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            date_joined BIGINT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create users table: {}", e)))?;

    Ok(())
}

fn user_from_row(row: &AnyRow) -> UserSummary {
    UserSummary {
        id: row.get::<String, _>("id"),
        email: row.get::<String, _>("email"),
        date_joined: row.get::<i64, _>("date_joined"),
    }
}

pub async fn create_user(pool: &AnyPool, email: &str, password_hash: &str) -> Result<UserSummary, AppError> {
    let user_id = Uuid::new_v4().to_string();
    let now = Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, date_joined)
        VALUES ($1, $2, $3, $4);
        "#,
    )
    .bind(user_id.as_str())
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .execute(pool)
    .await;

    if let Err(err) = result {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Err(AppError::Conflict("email already exists".to_string()));
            }
        }
        return Err(AppError::Internal(format!("create user: {}", err)));
    }

    Ok(UserSummary {
        id: user_id,
        email: email.to_string(),
        date_joined: now,
    })
}

pub async fn find_user_by_email(
    pool: &AnyPool,
    email: &str,
) -> Result<Option<(UserSummary, String)>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT id, email, password_hash, date_joined
        FROM users
        WHERE email = $1;
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("query user: {}", e)))?;

    Ok(row.map(|row| (user_from_row(&row), row.get::<String, _>("password_hash"))))
}

pub async fn get_user_by_id(pool: &AnyPool, user_id: &str) -> Result<Option<UserSummary>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT id, email, date_joined
        FROM users
        WHERE id = $1;
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("query user by id: {}", e)))?;

    Ok(row.as_ref().map(user_from_row))
}

pub async fn count_users(pool: &AnyPool) -> Result<u64, AppError> {
    let row = sqlx::query("SELECT COUNT(*) AS total FROM users;")
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::Internal(format!("count users: {}", e)))?;
    Ok(row.get::<i64, _>("total").max(0) as u64)
}

pub async fn list_users(pool: &AnyPool, limit: u32, offset: u32) -> Result<Vec<UserSummary>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT id, email, date_joined
        FROM users
        ORDER BY date_joined ASC, email ASC
        LIMIT $1 OFFSET $2;
        "#,
    )
    .bind(i64::from(limit))
    .bind(i64::from(offset))
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Internal(format!("list users: {}", e)))?;

    Ok(rows.iter().map(user_from_row).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn local_pool(dir: &TempDir) -> AnyPool {
        let config = DatabaseConfig::LocalFile {
            path: dir.path().join("db.sqlite3"),
        };
        let pool = connect(&config).await.unwrap();
        init_db(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn remote_without_url_fails_at_connect() {
        let config = DatabaseConfig::Remote {
            url: None,
            max_connection_age: DatabaseConfig::MAX_CONNECTION_AGE,
        };
        assert!(matches!(connect(&config).await, Err(AppError::Internal(_))));
    }

    #[test]
    fn remote_pool_recycles_connections_after_max_age() {
        let config = DatabaseConfig::Remote {
            url: Some("postgres://u:p@h/db".to_string()),
            max_connection_age: DatabaseConfig::MAX_CONNECTION_AGE,
        };
        let (options, url) = pool_options(&config).unwrap();
        assert_eq!(url, "postgres://u:p@h/db");
        assert_eq!(options.get_max_lifetime(), Some(Duration::from_secs(600)));
        assert_eq!(options.get_max_connections(), 10);
    }

    #[test]
    fn local_pool_url_uses_read_write_create_mode() {
        let config = DatabaseConfig::LocalFile {
            path: std::path::PathBuf::from("/srv/calories/db.sqlite3"),
        };
        let (_, url) = pool_options(&config).unwrap();
        assert_eq!(url, "sqlite:///srv/calories/db.sqlite3?mode=rwc");
    }

    #[test]
    fn remote_with_empty_url_is_not_configured() {
        let config = DatabaseConfig::Remote {
            url: Some(String::new()),
            max_connection_age: DatabaseConfig::MAX_CONNECTION_AGE,
        };
        match pool_options(&config) {
            Err(AppError::Internal(msg)) => assert_eq!(msg, "database url is not configured"),
            _ => panic!("expected missing url error"),
        }
    }

    #[tokio::test]
    async fn local_file_store_is_created() {
        let dir = TempDir::new().unwrap();
        let _pool = local_pool(&dir).await;
        assert!(dir.path().join("db.sqlite3").exists());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let dir = TempDir::new().unwrap();
        let pool = local_pool(&dir).await;

        create_user(&pool, "a@example.com", "hash").await.unwrap();
        let err = create_user(&pool, "a@example.com", "hash").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn users_are_counted_and_listed() {
        let dir = TempDir::new().unwrap();
        let pool = local_pool(&dir).await;

        for i in 0..4 {
            create_user(&pool, &format!("user{}@example.com", i), "hash")
                .await
                .unwrap();
        }

        assert_eq!(count_users(&pool).await.unwrap(), 4);
        let page = list_users(&pool, 3, 2).await.unwrap();
        assert_eq!(page.len(), 2);

        let (found, hash) = find_user_by_email(&pool, "user1@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hash, "hash");
        let by_id = get_user_by_id(&pool, &found.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "user1@example.com");
    }
}
