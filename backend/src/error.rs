//! Error handling for the café costing platform
//!
//! Provides consistent error responses in Arabic and English

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        message_ar: String,
    },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_ar: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Unit conversion missing: {0}")]
    UnitConversionMissing(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn invalid(field: &str, message: &str, message_ar: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_ar: message_ar.to_string(),
        }
    }

    /// Map a unique-constraint violation to `DuplicateEntry`, pass anything else through
    pub fn from_unique_violation(err: sqlx::Error, field: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::DuplicateEntry(field.to_string());
            }
        }
        err.into()
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NonPositiveQuantity | DomainError::ZeroAdjustment => AppError::Validation {
                field: "quantity".to_string(),
                message: err.to_string(),
                message_ar: "الكمية غير صالحة".to_string(),
            },
            DomainError::InsufficientStock { .. } => AppError::InsufficientStock(err.to_string()),
            DomainError::UnitConversionMissing { .. } => {
                AppError::UnitConversionMissing(err.to_string())
            }
            DomainError::InvalidDateRange { .. } => AppError::Validation {
                field: "startDate".to_string(),
                message: err.to_string(),
                message_ar: "نطاق التاريخ غير صالح".to_string(),
            },
            DomainError::QuantityOverflow => AppError::Validation {
                field: "quantity".to_string(),
                message: err.to_string(),
                message_ar: "الكمية خارج النطاق المسموح".to_string(),
            },
            DomainError::UnknownVariant { .. } => AppError::ValidationError(err.to_string()),
            DomainError::UnknownRawItem(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation {
            field: "body".to_string(),
            message: rejection.body_text(),
            message_ar: "محتوى الطلب غير صالح".to_string(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation {
            field: "query".to_string(),
            message: rejection.body_text(),
            message_ar: "معاملات الاستعلام غير صالحة".to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_default();
        AppError::Validation {
            message: format!("Invalid value for {}", field),
            message_ar: format!("قيمة غير صالحة للحقل {}", field),
            field,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_ar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_CREDENTIALS".to_string(),
                    message_en: "Invalid email or password".to_string(),
                    message_ar: "البريد الإلكتروني أو كلمة المرور غير صحيحة".to_string(),
                    field: None,
                },
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "TOKEN_EXPIRED".to_string(),
                    message_en: "Token has expired".to_string(),
                    message_ar: "انتهت صلاحية الرمز".to_string(),
                    field: None,
                },
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message_en: "Invalid token".to_string(),
                    message_ar: "الرمز غير صالح".to_string(),
                    field: None,
                },
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    message_en: "You do not have permission to perform this action".to_string(),
                    message_ar: "ليس لديك صلاحية لتنفيذ هذا الإجراء".to_string(),
                    field: None,
                },
            ),
            AppError::Unauthorized { message, message_ar } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message_en: message.clone(),
                    message_ar: message_ar.clone(),
                    field: None,
                },
            ),
            AppError::Validation {
                field,
                message,
                message_ar,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_ar: message_ar.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_ar: format!("بيانات غير صالحة: {}", msg),
                    field: None,
                },
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message_en: format!("A record with this {} already exists", field),
                    message_ar: format!("يوجد سجل بنفس {} مسبقاً", field),
                    field: Some(field.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_ar: format!("{} غير موجود", resource),
                    field: None,
                },
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVALID_STATE_TRANSITION".to_string(),
                    message_en: msg.clone(),
                    message_ar: format!("لا يمكن تغيير الحالة: {}", msg),
                    field: None,
                },
            ),
            AppError::InsufficientStock(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message_en: msg.clone(),
                    message_ar: format!("المخزون غير كافٍ: {}", msg),
                    field: None,
                },
            ),
            AppError::UnitConversionMissing(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "UNIT_CONVERSION_MISSING".to_string(),
                    message_en: msg.clone(),
                    message_ar: format!("لا يوجد معامل تحويل للوحدة: {}", msg),
                    field: Some("unit".to_string()),
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_ar: "حدث خطأ في قاعدة البيانات".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_ar: "حدث خطأ داخلي في الخادم".to_string(),
                    field: None,
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
