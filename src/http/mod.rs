use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderName};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use sea_orm::DbErr;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::WorkflowError;
use crate::identity::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER, IdentityError, TELEGRAM_ID_HEADER};
use crate::state::AppState;

mod actor;
mod admin;
mod aml;
mod requests;

pub fn router(state: AppState) -> Router {
    assert!(
        state.start_time.elapsed() < Duration::from_secs(86_400),
        "Application uptime exceeds 24 hours before router creation"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(TELEGRAM_ID_HEADER),
            HeaderName::from_static(ACTOR_ID_HEADER),
            HeaderName::from_static(ACTOR_ROLE_HEADER),
        ])
        .max_age(Duration::from_secs(3600));

    let api_router = Router::new()
        .merge(aml::router())
        .merge(requests::router())
        .merge(admin::router());

    Router::new()
        .route("/health", get(health_live))
        .route("/health/ready", get(health_ready))
        .nest("/api/v1", api_router)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_live(State(state): State<AppState>) -> Result<Json<HealthResponse>, HttpError> {
    let response = HealthResponse {
        status: "ok",
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };
    Ok(Json(response))
}

async fn health_ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, HttpError> {
    state
        .database
        .ping()
        .await
        .map_err(|err| HttpError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()))?;

    let response = ReadyResponse {
        status: "ready",
        aml_provider: state.aml.provider_name(),
        cache_entries: CacheSummary {
            wallet_checks: state.cache.wallet_checks.entry_count(),
        },
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
struct ReadyResponse {
    status: &'static str,
    aml_provider: &'static str,
    cache_entries: CacheSummary,
}

#[derive(Debug, Serialize)]
struct CacheSummary {
    wallet_checks: u64,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: String) -> Self {
        assert!(status != StatusCode::OK, "Error status cannot be 200");
        assert!(!message.is_empty(), "Error message cannot be empty");
        let kind = match status {
            StatusCode::BAD_REQUEST => "bad_request",
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::SERVICE_UNAVAILABLE => "unavailable",
            _ => "internal_error",
        };
        Self {
            status,
            kind,
            message,
        }
    }

    fn with_kind(status: StatusCode, kind: &'static str, message: String) -> Self {
        Self {
            kind,
            ..Self::new(status, message)
        }
    }
}

impl From<WorkflowError> for HttpError {
    fn from(err: WorkflowError) -> Self {
        let status = match &err {
            WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::Forbidden { .. } => StatusCode::FORBIDDEN,
            WorkflowError::InvalidTransition { .. } | WorkflowError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::Provider(_) => StatusCode::BAD_GATEWAY,
            WorkflowError::Database(db_err) => {
                error!("Database failure: {db_err}");
                return HttpError::with_kind(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    err.kind(),
                    "Internal database error".to_string(),
                );
            }
        };
        HttpError::with_kind(status, err.kind(), err.to_string())
    }
}

impl From<IdentityError> for HttpError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Missing => HttpError::new(StatusCode::UNAUTHORIZED, err.to_string()),
            IdentityError::InvalidHeader { .. } => {
                HttpError::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            IdentityError::Unregistered => HttpError::new(StatusCode::FORBIDDEN, err.to_string()),
            IdentityError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<DbErr> for HttpError {
    fn from(err: DbErr) -> Self {
        WorkflowError::from(err).into()
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        info!(status = self.status.as_u16(), "HTTP error: {}", self.message);
        let body = Json(ErrorBody {
            error: self.message,
            kind: self.kind,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}
