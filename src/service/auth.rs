//! User registration, token exchange and token lookup.

use super::validation::{validate_credentials, validate_registration, Payload, MSG_USERNAME_TAKEN};
use super::{exists, unique_violation};
use crate::error::{AppError, FieldErrors, NON_FIELD_ERRORS};
use crate::models::{AuthToken, User};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const MSG_BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

pub struct AuthService;

impl AuthService {
    /// Create a user and issue their token.
    pub async fn register(pool: &PgPool, body: &Payload) -> Result<(User, String), AppError> {
        let registration = validate_registration(body).map_err(AppError::Validation)?;
        let mut tx = pool.begin().await?;
        if exists(
            &mut *tx,
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
            vec![registration.username.as_str().into()],
        )
        .await?
        {
            return Err(AppError::Validation(FieldErrors::single("username", MSG_USERNAME_TAKEN)));
        }

        let password_hash = hash_password(registration.password).await?;
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, username, email, password_hash, created_at",
        )
        .bind(&registration.username)
        .bind(&registration.email)
        .bind(&password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation)?;
        let token = token_for(&mut tx, user.id).await?;
        tx.commit().await?;
        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Ok((user, token))
    }

    /// Exchange username/password for the user's token, issuing one on first login.
    pub async fn obtain_token(pool: &PgPool, body: &Payload) -> Result<String, AppError> {
        let (username, password) = validate_credentials(body).map_err(AppError::Validation)?;
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(&username)
        .fetch_optional(pool)
        .await?;

        let verified = match &user {
            Some(u) => verify_password(password, u.password_hash.clone()).await?,
            None => false,
        };
        let user = match user {
            Some(u) if verified => u,
            _ => {
                tracing::warn!(username = %username, "rejected credentials");
                return Err(AppError::Validation(FieldErrors::single(NON_FIELD_ERRORS, MSG_BAD_CREDENTIALS)));
            }
        };

        let mut tx = pool.begin().await?;
        let token = token_for(&mut tx, user.id).await?;
        tx.commit().await?;
        Ok(token)
    }

    /// The user owning `key`, if any.
    pub async fn user_for_token(pool: &PgPool, key: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.email, u.password_hash, u.created_at \
             FROM auth_tokens t JOIN users u ON u.id = t.user_id WHERE t.key = $1",
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }
}

/// Existing token for the user, or a new one. One token per user.
async fn token_for(conn: &mut PgConnection, user_id: i64) -> Result<String, AppError> {
    sqlx::query("INSERT INTO auth_tokens (key, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
        .bind(new_token_key())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    let token = sqlx::query_as::<_, AuthToken>("SELECT key, user_id, created_at FROM auth_tokens WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    tracing::debug!(user_id = token.user_id, issued_at = %token.created_at, "token issued");
    Ok(token.key)
}

fn new_token_key() -> String {
    Uuid::new_v4().simple().to_string()
}

fn hash_password_blocking(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

fn verify_password_blocking(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is unreadable");
            false
        }
    }
}

async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .map_err(|e| AppError::PasswordHash(e.to_string()))?
}

async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password_blocking(&password, &hash))
        .await
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}
