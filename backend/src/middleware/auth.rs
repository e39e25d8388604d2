//! Authentication middleware
//!
//! JWT authentication and role-based access control middleware

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ErrorDetail, ErrorResponse};
use crate::models::{Action, Resource, StaffRole};
use crate::services::auth::decode_access_token;
use crate::AppState;

/// Authenticated staff member extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: StaffRole,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        let permission = format!("{}:{}", resource.as_str(), action.as_str());
        self.permissions.contains(&permission)
    }
}

/// Authentication middleware that validates the bearer token
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token,
        None => {
            return AppError::Unauthorized {
                message: "Missing or invalid Authorization header".to_string(),
                message_ar: "ترويسة التفويض مفقودة أو غير صالحة".to_string(),
            }
            .into_response()
        }
    };

    match auth_user_from_token(token, &state.config.jwt.secret) {
        Ok(auth_user) => {
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

fn auth_user_from_token(token: &str, secret: &str) -> AppResult<AuthUser> {
    let claims = decode_access_token(token, secret)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
    let tenant_id = Uuid::parse_str(&claims.tenant_id).map_err(|_| AppError::InvalidToken)?;
    let role = claims
        .role
        .parse::<StaffRole>()
        .map_err(|_| AppError::InvalidToken)?;

    Ok(AuthUser {
        user_id,
        tenant_id,
        role,
        permissions: claims.permissions,
    })
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message_en: "Authentication required".to_string(),
                        message_ar: "يجب تسجيل الدخول أولاً".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

/// Permission guard for use in handlers
pub fn require_permission(user: &AuthUser, resource: Resource, action: Action) -> AppResult<()> {
    if user.has_permission(resource, action) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %user.user_id,
            "Permission denied: requires {}:{}",
            resource.as_str(),
            action.as_str()
        );
        Err(AppError::InsufficientPermissions)
    }
}
