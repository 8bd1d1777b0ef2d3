use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction};

/// Outcome of recording a reset-token consumption.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("reset token already used")]
    AlreadyUsed,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// One-way digest of the raw token string. Only this digest is persisted, so
/// a ledger read cannot reconstruct a usable token.
pub fn token_digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub async fn is_used(db: &PgPool, token: &str) -> anyhow::Result<bool> {
    let used = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM used_reset_tokens WHERE token_hash = $1
        )
        "#,
    )
    .bind(token_digest(token))
    .fetch_one(db)
    .await?;
    Ok(used)
}

/// Record a token as consumed inside the caller's transaction. The unique
/// index on `token_hash` is the only serialization point: under concurrent
/// attempts at the same token, exactly one insert succeeds and the rest see
/// `AlreadyUsed`.
pub async fn mark_used(
    tx: &mut Transaction<'_, Postgres>,
    token: &str,
    user_email: &str,
) -> Result<(), LedgerError> {
    let result = sqlx::query(
        r#"
        INSERT INTO used_reset_tokens (token_hash, user_email)
        VALUES ($1, $2)
        "#,
    )
    .bind(token_digest(token))
    .bind(user_email)
    .execute(&mut **tx)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(LedgerError::AlreadyUsed)
        }
        Err(e) => Err(LedgerError::Database(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic_hex_sha256() {
        let a = token_digest("some.jwt.token");
        let b = token_digest("some.jwt.token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn digest_differs_per_token() {
        assert_ne!(token_digest("token-one"), token_digest("token-two"));
    }

    #[test]
    fn digest_does_not_echo_the_token() {
        let raw = "eyJhbGciOiJIUzI1NiJ9.payload.sig";
        assert!(!token_digest(raw).contains("payload"));
    }
}
