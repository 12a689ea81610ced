use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::session::errors::SessionError;
use crate::session::models::NewRefreshToken;
use crate::session::models::NewUser;
use crate::session::models::RefreshTokenId;
use crate::session::models::RefreshTokenRecord;
use crate::session::models::User;
use crate::session::models::UserId;
use crate::session::ports::RefreshTokenRepository;
use crate::session::ports::UserRepository;

#[derive(Default)]
struct UserTable {
    next_id: i64,
    by_id: HashMap<UserId, User>,
    by_email: HashMap<String, UserId>,
}

/// Process-local user store for development and tests.
///
/// Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: Mutex<UserTable>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, SessionError> {
        let mut table = self.table.lock().await;

        if table.by_email.contains_key(user.email.as_str()) {
            return Err(SessionError::EmailAlreadyExists(
                user.email.as_str().to_string(),
            ));
        }

        table.next_id += 1;
        let created = User {
            id: UserId(table.next_id),
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };

        table
            .by_email
            .insert(created.email.as_str().to_string(), created.id);
        table.by_id.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, SessionError> {
        let table = self.table.lock().await;
        Ok(table
            .by_email
            .get(email)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, SessionError> {
        Ok(self.table.lock().await.by_id.get(id).cloned())
    }
}

#[derive(Default)]
struct RefreshTokenTable {
    by_id: HashMap<RefreshTokenId, RefreshTokenRecord>,
    by_digest: HashMap<String, RefreshTokenId>,
}

impl RefreshTokenTable {
    fn insert(&mut self, token: NewRefreshToken) -> Result<RefreshTokenRecord, SessionError> {
        if self.by_digest.contains_key(&token.token_digest) {
            return Err(SessionError::DatabaseError(
                "duplicate refresh token digest".to_string(),
            ));
        }

        let record = RefreshTokenRecord {
            id: RefreshTokenId::new(),
            user_id: token.user_id,
            token_digest: token.token_digest,
            expires_at: token.expires_at,
            revoked_at: None,
            created_at: token.created_at,
        };

        self.by_digest
            .insert(record.token_digest.clone(), record.id);
        self.by_id.insert(record.id, record.clone());

        Ok(record)
    }
}

/// Process-local refresh token store for development and tests.
///
/// A single lock guards every table, so rotation is atomic.
#[derive(Default)]
pub struct InMemoryRefreshTokenRepository {
    table: Mutex<RefreshTokenTable>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, SessionError> {
        self.table.lock().await.insert(token)
    }

    async fn find_by_digest(
        &self,
        digest: &str,
    ) -> Result<Option<RefreshTokenRecord>, SessionError> {
        let table = self.table.lock().await;
        Ok(table
            .by_digest
            .get(digest)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn revoke(
        &self,
        id: &RefreshTokenId,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let mut table = self.table.lock().await;
        let record = table
            .by_id
            .get_mut(id)
            .ok_or_else(|| SessionError::RefreshTokenNotFound(id.to_string()))?;

        if record.revoked_at.is_none() {
            record.revoked_at = Some(revoked_at);
        }

        Ok(())
    }

    async fn rotate(
        &self,
        id: &RefreshTokenId,
        revoked_at: DateTime<Utc>,
        replacement: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, SessionError> {
        let mut table = self.table.lock().await;

        match table.by_id.get(id) {
            Some(record) if !record.is_revoked() => {}
            Some(_) => return Err(SessionError::RefreshTokenExpiredOrRevoked),
            None => return Err(SessionError::RefreshTokenNotFound(id.to_string())),
        }

        // Insert first so a failed insert leaves the old record untouched
        let successor = table.insert(replacement)?;
        if let Some(record) = table.by_id.get_mut(id) {
            record.revoked_at = Some(revoked_at);
        }

        Ok(successor)
    }
}
