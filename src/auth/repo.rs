use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::auth::repo_types::User;

impl User {
    /// Find a user by email. Absence is `Ok(None)`, not an error.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, address, gender, age, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Create a new user. A unique violation on `email` surfaces as the raw
    /// database error so the caller can map it to a conflict.
    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, address, gender, age, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Replace the stored password hash. Runs inside the reset transaction,
    /// after the ledger insert.
    pub async fn update_password(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Apply the provided profile fields; absent fields keep their value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        address: Option<&str>,
        gender: Option<&str>,
        age: Option<i32>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET address = COALESCE($2, address),
                gender  = COALESCE($3, gender),
                age     = COALESCE($4, age)
            WHERE id = $1
            RETURNING id, username, email, password_hash, address, gender, age, created_at
            "#,
        )
        .bind(id)
        .bind(address)
        .bind(gender)
        .bind(age)
        .fetch_one(db)
        .await
    }
}
