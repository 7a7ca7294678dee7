use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::identity::errors::AuthError;
use crate::identity::models::Identity;
use crate::identity::models::IdentityId;
use crate::identity::ports::IdentityRepository;

/// In-memory identity store for integration tests and local development
/// without a database. The mutex makes the wrong-attempt compare-and-swap
/// genuinely atomic, mirroring the guarded UPDATE of the Postgres adapter.
#[derive(Default)]
pub struct InMemoryIdentityRepository {
    inner: Mutex<HashMap<Uuid, Identity>>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn create(&self, identity: Identity) -> Result<Identity, AuthError> {
        let mut identities = self.inner.lock().map_err(poisoned)?;
        if identities
            .values()
            .any(|existing| existing.email == identity.email)
        {
            return Err(AuthError::EmailAlreadyRegistered(
                identity.email.as_str().to_string(),
            ));
        }
        identities.insert(identity.id.0, identity.clone());
        Ok(identity)
    }

    async fn find_by_id(&self, id: &IdentityId) -> Result<Option<Identity>, AuthError> {
        let identities = self.inner.lock().map_err(poisoned)?;
        Ok(identities.get(&id.0).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        let identities = self.inner.lock().map_err(poisoned)?;
        Ok(identities
            .values()
            .find(|identity| identity.email.as_str() == email)
            .cloned())
    }

    async fn update(&self, identity: Identity) -> Result<Identity, AuthError> {
        let mut identities = self.inner.lock().map_err(poisoned)?;
        if !identities.contains_key(&identity.id.0) {
            return Err(AuthError::NotFound(identity.id.to_string()));
        }
        identities.insert(identity.id.0, identity.clone());
        Ok(identity)
    }

    async fn record_wrong_attempt(
        &self,
        id: &IdentityId,
        expected_attempts: u8,
        attempts: u8,
        block_expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, AuthError> {
        let mut identities = self.inner.lock().map_err(poisoned)?;
        match identities.get_mut(&id.0) {
            Some(identity) if identity.challenge.wrong_attempts == expected_attempts => {
                identity.challenge.wrong_attempts = attempts;
                identity.challenge.block_expires_at = block_expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> AuthError {
    AuthError::Database("identity store mutex poisoned".to_string())
}
