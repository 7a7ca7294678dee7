use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;

use crate::identity::errors::AuthError;
use crate::identity::models::AuthProvider;
use crate::identity::models::DisplayName;
use crate::identity::models::EmailAddress;
use crate::identity::models::Identity;
use crate::identity::models::IdentityId;
use crate::identity::models::OtpChallenge;
use crate::identity::models::Role;
use crate::identity::ports::IdentityRepository;

const IDENTITY_COLUMNS: &str = "id, name, email, password_hash, provider, role, verified, \
     otp_hash, otp_expires_at, wrong_attempts, block_expires_at, created_at";

pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_identity(row: &PgRow) -> Result<Identity, AuthError> {
    let name: String = row.try_get("name").map_err(db_error)?;
    let email: String = row.try_get("email").map_err(db_error)?;
    let provider: String = row.try_get("provider").map_err(db_error)?;
    let role: String = row.try_get("role").map_err(db_error)?;
    let wrong_attempts: i16 = row.try_get("wrong_attempts").map_err(db_error)?;

    Ok(Identity {
        id: IdentityId(row.try_get("id").map_err(db_error)?),
        name: DisplayName::new(name)?,
        email: EmailAddress::new(email)?,
        password_hash: row.try_get("password_hash").map_err(db_error)?,
        provider: AuthProvider::parse(&provider)?,
        role: Role::parse(&role)?,
        verified: row.try_get("verified").map_err(db_error)?,
        challenge: OtpChallenge {
            code_hash: row.try_get("otp_hash").map_err(db_error)?,
            expires_at: row.try_get("otp_expires_at").map_err(db_error)?,
            wrong_attempts: wrong_attempts as u8,
            block_expires_at: row.try_get("block_expires_at").map_err(db_error)?,
        },
        created_at: row.try_get("created_at").map_err(db_error)?,
    })
}

fn db_error(e: sqlx::Error) -> AuthError {
    AuthError::Database(e.to_string())
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn create(&self, identity: Identity) -> Result<Identity, AuthError> {
        sqlx::query(
            r#"
            INSERT INTO identities
                (id, name, email, password_hash, provider, role, verified,
                 otp_hash, otp_expires_at, wrong_attempts, block_expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(identity.id.0)
        .bind(identity.name.as_str())
        .bind(identity.email.as_str())
        .bind(identity.password_hash.as_deref())
        .bind(identity.provider.as_str())
        .bind(identity.role.as_str())
        .bind(identity.verified)
        .bind(identity.challenge.code_hash.as_deref())
        .bind(identity.challenge.expires_at)
        .bind(identity.challenge.wrong_attempts as i16)
        .bind(identity.challenge.block_expires_at)
        .bind(identity.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AuthError::EmailAlreadyRegistered(
                        identity.email.as_str().to_string(),
                    );
                }
            }
            AuthError::Database(e.to_string())
        })?;

        Ok(identity)
    }

    async fn find_by_id(&self, id: &IdentityId) -> Result<Option<Identity>, AuthError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM identities WHERE id = $1",
            IDENTITY_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_identity).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM identities WHERE email = $1",
            IDENTITY_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_identity).transpose()
    }

    async fn update(&self, identity: Identity) -> Result<Identity, AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE identities
            SET name = $2,
                email = $3,
                password_hash = $4,
                verified = $5,
                otp_hash = $6,
                otp_expires_at = $7,
                wrong_attempts = $8,
                block_expires_at = $9
            WHERE id = $1
            "#,
        )
        .bind(identity.id.0)
        .bind(identity.name.as_str())
        .bind(identity.email.as_str())
        .bind(identity.password_hash.as_deref())
        .bind(identity.verified)
        .bind(identity.challenge.code_hash.as_deref())
        .bind(identity.challenge.expires_at)
        .bind(identity.challenge.wrong_attempts as i16)
        .bind(identity.challenge.block_expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(identity.id.to_string()));
        }

        Ok(identity)
    }

    async fn record_wrong_attempt(
        &self,
        id: &IdentityId,
        expected_attempts: u8,
        attempts: u8,
        block_expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, AuthError> {
        // Compare-and-swap on the previous counter value: a concurrent
        // failure that already moved the counter makes this a no-op.
        let result = sqlx::query(
            r#"
            UPDATE identities
            SET wrong_attempts = $3, block_expires_at = $4
            WHERE id = $1 AND wrong_attempts = $2
            "#,
        )
        .bind(id.0)
        .bind(expected_attempts as i16)
        .bind(attempts as i16)
        .bind(block_expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }
}
