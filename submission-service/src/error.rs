use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

pub const INVALID_ADDRESS_MESSAGE: &str = "A valid wallet address is required";
pub const STORAGE_FAILURE_MESSAGE: &str =
    "Unable to process wallet submissions right now. Please try again shortly.";

#[derive(Debug, Error)]
pub enum Error {
    #[error("A valid wallet address is required")]
    InvalidAddress,
    #[error("Storage error: {}", storage_message(.0))]
    Storage(#[from] sqlx::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl Error {
    /// Text that is safe to hand back to the caller.
    pub fn public_message(&self) -> &str {
        match self {
            Error::InvalidAddress => INVALID_ADDRESS_MESSAGE,
            Error::Storage(_) | Error::Config(_) | Error::InternalError(_) => {
                STORAGE_FAILURE_MESSAGE
            }
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidAddress => StatusCode::BAD_REQUEST,
            Error::Storage(_) | Error::Config(_) | Error::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.public_message()
        }))
    }
}

/// Best-effort extraction of a readable message: the Postgres `detail`
/// field when present, then the server message, then the driver's text.
pub fn storage_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => db
            .try_downcast_ref::<PgDatabaseError>()
            .and_then(|pg| pg.detail())
            .map(str::to_string)
            .unwrap_or_else(|| db.message().to_string()),
        other => other.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn invalid_address_is_a_client_error() {
        let response = Error::InvalidAddress.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], INVALID_ADDRESS_MESSAGE);
    }

    #[actix_web::test]
    async fn storage_errors_do_not_leak_driver_text() {
        let err = Error::Storage(sqlx::Error::PoolTimedOut);
        assert!(err.to_string().contains("pool timed out"));

        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], STORAGE_FAILURE_MESSAGE);
    }
}
