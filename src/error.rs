use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PayrollError>;

/// Every failure the payroll service can report.
///
/// The first six variants are the core taxonomy returned by the clock ledger and
/// the settlement engine; the rest only come from the HTTP surface around it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayrollError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("No pending payments for this period.")]
    NoPendingWork,

    #[error("Settlement failed: {0}")]
    SettlementFailed(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PayrollError {
    pub fn code(&self) -> &'static str {
        match self {
            PayrollError::NotFound(_) => "NOT_FOUND",
            PayrollError::Conflict(_) => "CONFLICT",
            PayrollError::InvalidRange(_) => "INVALID_RANGE",
            PayrollError::NoPendingWork => "NO_PENDING_WORK",
            PayrollError::SettlementFailed(_) => "SETTLEMENT_FAILED",
            PayrollError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            PayrollError::Validation(_) => "INVALID_INPUT",
            PayrollError::Unauthorized(_) => "UNAUTHORIZED",
            PayrollError::Forbidden(_) => "FORBIDDEN",
            PayrollError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Transient faults the caller may retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PayrollError::StorageUnavailable(_))
    }
}

impl From<sqlx::Error> for PayrollError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => PayrollError::StorageUnavailable(e.to_string()),
            sqlx::Error::Database(ref db_err) => {
                // 1205: lock wait timeout exceeded
                let lock_wait = db_err
                    .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                    .is_some_and(|mysql| mysql.number() == 1205);

                match db_err.code().as_deref() {
                    Some("23000") => PayrollError::Conflict(db_err.message().to_string()),
                    Some("40001") => PayrollError::StorageUnavailable(db_err.message().to_string()),
                    _ if lock_wait => PayrollError::StorageUnavailable(db_err.message().to_string()),
                    _ => PayrollError::Internal(e.to_string()),
                }
            }
            sqlx::Error::RowNotFound => PayrollError::NotFound("row not found".to_string()),
            other => PayrollError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for PayrollError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        PayrollError::Internal(e.to_string())
    }
}

/// JSON body returned for every failed request.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
}

impl ResponseError for PayrollError {
    fn status_code(&self) -> StatusCode {
        match self {
            PayrollError::NotFound(_) => StatusCode::NOT_FOUND,
            PayrollError::Conflict(_) => StatusCode::CONFLICT,
            PayrollError::InvalidRange(_) | PayrollError::Validation(_) => StatusCode::BAD_REQUEST,
            PayrollError::NoPendingWork => StatusCode::OK,
            PayrollError::SettlementFailed(_) => StatusCode::CONFLICT,
            PayrollError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PayrollError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PayrollError::Forbidden(_) => StatusCode::FORBIDDEN,
            PayrollError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let PayrollError::NoPendingWork = self {
            return HttpResponse::Ok().json(serde_json::json!({
                "message": self.to_string(),
                "payment": null,
            }));
        }

        let message = match self {
            PayrollError::Internal(details) => {
                tracing::error!(error = %details, "Internal error");
                "An internal error occurred".to_string()
            }
            PayrollError::StorageUnavailable(details) => {
                tracing::error!(error = %details, "Storage unavailable");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let mut builder = HttpResponse::build(self.status_code());
        if self.is_retryable() {
            builder.insert_header((header::RETRY_AFTER, "1"));
        }

        builder.json(ErrorResponse {
            error: message,
            error_code: self.code().to_string(),
        })
    }
}
