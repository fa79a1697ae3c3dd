use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use metrics::increment_counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use sheetledger_core::{
    export, CallerIdentity, CredentialVerifier, EntryDraft, Ledger, LedgerEntry, LedgerError, LedgerScope, LedgerStore,
    MonthlyReport,
};

use crate::auth::auth_middleware;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LedgerStore>,
    pub scope: Arc<LedgerScope>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(store: Arc<LedgerStore>, scope: LedgerScope, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            store,
            scope: Arc::new(scope),
            metrics,
        }
    }

    fn ledger_for(&self, caller: &CallerIdentity) -> Result<Ledger, LedgerError> {
        self.store.open_or_create(self.scope.owner_for(caller))
    }
}

pub fn router(state: AppState, verifier: Arc<dyn CredentialVerifier>) -> Router {
    let protected = Router::new()
        .route("/entries", get(list_entries).post(create_entry))
        .route(
            "/entries/:reference_id",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .route("/report", get(monthly_report))
        .route("/export.csv", get(export_csv))
        .layer(middleware::from_fn(auth_middleware))
        .layer(Extension(verifier));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .merge(protected)
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// Maps ledger failures onto HTTP statuses.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            LedgerError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            LedgerError::ReferenceNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::ConcurrentModification(_) => StatusCode::CONFLICT,
            LedgerError::Authentication => StatusCode::UNAUTHORIZED,
            LedgerError::MalformedRow(_)
            | LedgerError::InvalidDate(_)
            | LedgerError::Csv(_)
            | LedgerError::Table(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                success: false,
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

fn track<T>(op: &'static str, result: Result<T, LedgerError>) -> Result<T, ApiError> {
    increment_counter!("sheetledger_operations_total", "op" => op);
    result.map_err(|e| {
        increment_counter!("sheetledger_failures_total", "op" => op);
        ApiError(e)
    })
}

async fn health() -> &'static str {
    "ok"
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics.as_ref().map(|h| h.render()).unwrap_or_default()
}

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    let entries = track("list", state.ledger_for(&caller).and_then(|l| state.store.list_entries(&l)))?;
    Ok(Json(entries))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(reference_id): Path<String>,
) -> Result<Json<LedgerEntry>, ApiError> {
    let entry = track(
        "get",
        state.ledger_for(&caller).and_then(|l| state.store.find_entry(&l, &reference_id)),
    )?;
    Ok(Json(entry))
}

pub async fn create_entry(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(draft): Json<EntryDraft>,
) -> Result<(StatusCode, Json<LedgerEntry>), ApiError> {
    let entry = track(
        "append",
        state.ledger_for(&caller).and_then(|l| state.store.append_entry(&l, draft)),
    )?;
    tracing::info!(caller = %caller.username, reference_id = %entry.reference_id, "Entry added");
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(reference_id): Path<String>,
    Json(draft): Json<EntryDraft>,
) -> Result<Json<LedgerEntry>, ApiError> {
    let entry = track(
        "update",
        state.ledger_for(&caller).and_then(|l| state.store.update_entry(&l, &reference_id, draft)),
    )?;
    tracing::info!(caller = %caller.username, reference_id = %reference_id, "Entry updated");
    Ok(Json(entry))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(reference_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    track(
        "delete",
        state.ledger_for(&caller).and_then(|l| state.store.delete_entry(&l, &reference_id)),
    )?;
    tracing::info!(caller = %caller.username, reference_id = %reference_id, "Entry deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn monthly_report(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<MonthlyReport>, ApiError> {
    let report = track("report", state.ledger_for(&caller).and_then(|l| state.store.monthly_report(&l)))?;
    Ok(Json(report))
}

pub async fn export_csv(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Response, ApiError> {
    let (owner, body) = track(
        "export",
        state.ledger_for(&caller).and_then(|l| {
            let entries = state.store.list_entries(&l)?;
            Ok((l.name().to_string(), export::to_csv_string(&entries)?))
        }),
    )?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export::export_file_name(&owner)),
            ),
        ],
        body,
    )
        .into_response())
}
