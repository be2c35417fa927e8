use super::error::{self as api, ApiError};
use super::AppState;
use crate::error::AnalyzerError;
use crate::output::Document;
use crate::store::{NewUser, StoreError, User, UserStore};
use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Multipart field carrying the uploaded notice.
pub const UPLOAD_FIELD: &str = "notice_pdf";

pub async fn root() -> Json<Value> {
    Json(json!({"message": "Tax Analyzer Backend API", "status": "running"}))
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "tax-analyzer-backend"}))
}

// ── Accounts ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    dob: Option<String>,
    mobile_number: Option<String>,
}

impl RegisterRequest {
    fn into_new_user(self) -> Option<NewUser> {
        Some(NewUser {
            first_name: self.first_name?,
            last_name: self.last_name?,
            email: self.email?,
            password: self.password?,
            dob: self.dob?,
            mobile_number: self.mobile_number?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.clone().ok_or(api::DATABASE_UNAVAILABLE)?;
    let new_user = body
        .ok()
        .and_then(|Json(req)| req.into_new_user())
        .ok_or(api::MISSING_FIELDS)?;

    let user = with_store(store, move |s| s.create_user(&new_user))
        .await
        .map_err(|e| match e {
            StoreError::EmailTaken => api::EMAIL_TAKEN,
            other => {
                error!(error = %other, "Registration failed");
                api::INTERNAL
            }
        })?;

    info!(id = user.id, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "user": {"id": user.id, "first_name": user.first_name, "email": user.email},
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.clone().ok_or(api::DATABASE_UNAVAILABLE)?;
    let (email, password) = body
        .ok()
        .and_then(|Json(req)| Some((req.email?, req.password?)))
        .ok_or(api::MISSING_CREDENTIALS)?;

    let user: Option<User> = with_store(store, move |s| s.authenticate(&email, &password))
        .await
        .map_err(|e| {
            error!(error = %e, "Login failed");
            api::INTERNAL
        })?;

    let user = user.ok_or(api::INVALID_CREDENTIALS)?;
    Ok(Json(json!({
        "success": true,
        "user": {"id": user.id, "firstName": user.first_name, "email": user.email},
    })))
}

/// Run a blocking store call off the async workers.
async fn with_store<T, F>(store: Arc<UserStore>, f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&UserStore) -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|_| StoreError::Poisoned)?
}

// ── Summarisation ───────────────────────────────────────────────────────────

pub async fn summarize(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart.map_err(|_| api::NO_PDF)?;
    let bytes = read_upload(&mut multipart).await?;
    info!(bytes = bytes.len(), "Received notice upload");

    let extraction = state
        .extractor
        .extract(&Document::from(bytes))
        .await
        .map_err(|e| {
            error!(error = %e, "Could not read text from PDF");
            api::NO_TEXT
        })?;

    let Some(summarizer) = state.summarizer.as_ref() else {
        warn!("Summariser not configured");
        return Err(api::SUMMARY_FAILED);
    };

    let summary = summarizer
        .summarize(&extraction.text)
        .await
        .map_err(|e| match e {
            AnalyzerError::InvalidSummary { .. } => api::SUMMARY_INVALID,
            other => {
                error!(error = %other, "Summarisation failed");
                api::SUMMARY_FAILED
            }
        })?;

    Ok(Json(json!({
        "success": true,
        "summary": summary,
        "source": extraction.source,
        "pages": {
            "succeeded": extraction.stats.pages_succeeded,
            "attempted": extraction.stats.pages_attempted,
        },
    })))
}

/// Bytes of the `notice_pdf` field; other fields are ignored.
async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(api::NO_PDF),
            Err(e) => {
                warn!(error = %e, "Malformed multipart body");
                return Err(api::NO_PDF);
            }
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        return match field.bytes().await {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => {
                warn!(error = %e, "Failed to read upload bytes");
                Err(api::NO_PDF)
            }
        };
    }
}
