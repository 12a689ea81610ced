use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use sqlx::Postgres;
use sqlx::Transaction;
use uuid::Uuid;

use crate::session::errors::SessionError;
use crate::session::models::NewRefreshToken;
use crate::session::models::RefreshTokenId;
use crate::session::models::RefreshTokenRecord;
use crate::session::models::UserId;
use crate::session::ports::RefreshTokenRepository;

#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    user_id: i64,
    token_hash: String,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshTokenRecord {
            id: RefreshTokenId(row.id),
            user_id: UserId(row.user_id),
            token_digest: row.token_hash,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            created_at: row.created_at,
        }
    }
}

fn database_error(e: sqlx::Error) -> SessionError {
    SessionError::DatabaseError(e.to_string())
}

pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
}

impl PostgresRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        token: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, SessionError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, token_hash, expires_at, revoked_at, created_at
            "#,
        )
        .bind(RefreshTokenId::new().0)
        .bind(token.user_id.0)
        .bind(&token.token_digest)
        .bind(token.expires_at)
        .bind(token.created_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(database_error)?;

        Ok(row.into())
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, SessionError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;
        let record = Self::insert(&mut tx, token).await?;
        tx.commit().await.map_err(database_error)?;

        Ok(record)
    }

    async fn find_by_digest(
        &self,
        digest: &str,
    ) -> Result<Option<RefreshTokenRecord>, SessionError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, user_id, token_hash, expires_at, revoked_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn revoke(
        &self,
        id: &RefreshTokenId,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, $2)
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(revoked_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(SessionError::RefreshTokenNotFound(id.to_string()));
        }

        Ok(())
    }

    async fn rotate(
        &self,
        id: &RefreshTokenId,
        revoked_at: DateTime<Utc>,
        replacement: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, SessionError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        // Only one concurrent rotation can match the unrevoked row
        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $2
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(id.0)
        .bind(revoked_at)
        .execute(&mut *tx)
        .await
        .map_err(database_error)?;

        if revoked.rows_affected() == 0 {
            // Dropping the transaction rolls it back
            return Err(SessionError::RefreshTokenExpiredOrRevoked);
        }

        let record = Self::insert(&mut tx, replacement).await?;
        tx.commit().await.map_err(database_error)?;

        Ok(record)
    }
}
