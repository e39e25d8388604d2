//! Authentication service for staff login and token management
//!
//! Sessions are server-issued: a short-lived signed JWT access token plus an
//! opaque refresh token of which only a SHA-256 digest is stored.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::StaffRole;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub tenant_id: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    tenant_id: Uuid,
    password_hash: String,
    #[sqlx(try_from = "String")]
    role: StaffRole,
    is_active: bool,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Authenticate a staff member with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthTokens> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, tenant_id, password_hash, role, is_active
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::Unauthorized {
                message: "Account is disabled".to_string(),
                message_ar: "الحساب معطل".to_string(),
            });
        }

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        let tokens = self.generate_tokens(user.id, user.tenant_id, user.role)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        tracing::info!(user_id = %user.id, tenant_id = %user.tenant_id, "Staff login");

        Ok(tokens)
    }

    /// Rotate a refresh token and issue a new access token
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = Self::hash_token(refresh_token);

        let mut tx = self.db.begin().await?;

        // Revoke and read in one statement so a token can only be used once
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            WITH used AS (
                UPDATE refresh_tokens
                SET revoked_at = NOW()
                WHERE token_hash = $1 AND expires_at > NOW() AND revoked_at IS NULL
                RETURNING user_id
            )
            SELECT u.id, u.tenant_id, u.password_hash, u.role, u.is_active
            FROM users u
            JOIN used ON used.user_id = u.id
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized {
            message: "Invalid or expired refresh token".to_string(),
            message_ar: "رمز التحديث غير صالح أو منتهي الصلاحية".to_string(),
        })?;

        tx.commit().await?;

        let tokens = self.generate_tokens(user.id, user.tenant_id, user.role)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        Ok(tokens)
    }

    /// Generate access and refresh tokens
    fn generate_tokens(&self, user_id: Uuid, tenant_id: Uuid, role: StaffRole) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let access_claims = Claims {
            sub: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            role: role.as_str().to_string(),
            permissions: role.permissions(),
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &access_claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        // Refresh token: two random UUIDs, url-safe encoded
        let mut raw = Vec::with_capacity(32);
        raw.extend_from_slice(Uuid::new_v4().as_bytes());
        raw.extend_from_slice(Uuid::new_v4().as_bytes());
        let refresh_token = URL_SAFE_NO_PAD.encode(raw);

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Store refresh token in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let token_hash = Self::hash_token(token);
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// SHA-256 digest of a token for storage
    fn hash_token(token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }
}

/// Decode and validate an access token
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}
