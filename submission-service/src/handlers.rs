use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};

use crate::error::{Error, Result};
use crate::models::{SubmissionsResponse, SubmitWalletRequest, SubmitWalletResponse};
use crate::store::SubmissionStore;

/// Health check endpoint
pub async fn health() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({"status": "healthy"})))
}

/// List every stored submission, newest first
pub async fn list_submissions(store: web::Data<dyn SubmissionStore>) -> Result<HttpResponse> {
    let submissions = store.list().await.map_err(|e| {
        tracing::error!("Failed to fetch wallet submissions: {}", e);
        e
    })?;

    tracing::debug!("Returning {} wallet submission(s)", submissions.len());
    Ok(HttpResponse::Ok().json(SubmissionsResponse { submissions }))
}

/// Validate, normalize and upsert one wallet address
pub async fn submit_wallet(
    req: web::Json<SubmitWalletRequest>,
    store: web::Data<dyn SubmissionStore>,
) -> Result<HttpResponse> {
    let address = req.validate().map_err(|e| {
        tracing::debug!("Rejected wallet submission: {:?}", req.address);
        e
    })?;

    let submitted_at = store.upsert(&address).await.map_err(|e| {
        tracing::error!("Failed to persist wallet submission {}: {}", address, e);
        e
    })?;

    tracing::info!("Stored wallet submission {} at {}", address, submitted_at);

    Ok(HttpResponse::Ok().json(SubmitWalletResponse {
        ok: true,
        address: address.to_lower_hex(),
        submitted_at,
    }))
}

/// Unparseable JSON bodies get the same answer as a bad address.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    tracing::debug!("Rejected malformed submission body: {}", err);
    Error::InvalidAddress.into()
}

/// Route table shared by the binary and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/health", web::get().to(health))
        .service(
            web::resource("/api/wallet-submissions")
                .route(web::get().to(list_submissions))
                .route(web::post().to(submit_wallet)),
        );
}
