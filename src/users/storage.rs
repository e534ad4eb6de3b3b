use super::{NewUser, StorageError, User, UserStore};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgRow, types::Json, Connection, PgPool, Row};
use tracing::{error, info_span, Instrument};

const UNIQUE_VIOLATION: &str = "23505";

/// `UserStore` backed by the `users` table (see `sql/schema.sql`).
#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let profile: Json<Map<String, Value>> = row.try_get("profile")?;

    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        profile: profile.0,
    })
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let query = "SELECT id, email, password_hash, profile FROM users WHERE email = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );

        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn create(&self, user: NewUser) -> Result<User, StorageError> {
        let query = r"
            INSERT INTO users (email, password_hash, profile)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, profile
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        match sqlx::query(query)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(Json(&user.profile))
            .fetch_one(&self.pool)
            .instrument(span)
            .await
        {
            Ok(row) => Ok(user_from_row(&row)?),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Err(StorageError::Duplicate)
            }
            Err(e) => {
                error!("Error inserting user: {:?}", e);
                Err(StorageError::Database(e))
            }
        }
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;

        Ok(())
    }
}
