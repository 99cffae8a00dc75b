// 🌐 REST API - axum router over a shared ChitBook
//
// All handlers share one ChitBook behind a mutex, so the read-check-append
// sequence of a create is never interleaved with another request.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::db::SqliteStore;
use crate::entities::{ChitPlan, Chit, ChitFilter, Customer, NewChit, NewCustomer, NewPaata, NewProfit, PaataEntry, Profit};
use crate::error::LedgerError;
use crate::ledger::MonthlyStatement;
use crate::schedule::ScheduleRow;
use crate::service::ChitBook;
use crate::temporal::SystemClock;

pub type SharedBook = ChitBook<SqliteStore, SystemClock>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    book: Arc<Mutex<SharedBook>>,
}

impl AppState {
    pub fn new(book: SharedBook) -> Self {
        AppState {
            book: Arc::new(Mutex::new(book)),
        }
    }

    /// Every write runs in its own store transaction, so a guard left behind
    /// by a panicking request is still safe to reuse
    fn book(&self) -> MutexGuard<'_, SharedBook> {
        self.book.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("Recovering chit book lock after a panicked request");
            self.book.clear_poison();
            poisoned.into_inner()
        })
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    /// Body or query string that could not be extracted
    Rejected { status: StatusCode, message: String },
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    duplicate: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, duplicate) = match self {
            ApiError::Ledger(err) => {
                let status = match &err {
                    LedgerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    LedgerError::DuplicateRecord(_) => StatusCode::CONFLICT,
                    LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                    LedgerError::InvalidRecord(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    _ => {
                        error!(error = %err, "Request failed");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.to_string(), err.is_duplicate())
            }
            ApiError::Rejected { status, message } => (status, message, false),
        };

        (status, Json(ErrorBody { error: message, duplicate })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// EXTRACTORS
// ============================================================================
// axum's Json and Query reject with plain text; these wrap them so every
// failure carries the JSON error body.

pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

// ============================================================================
// QUERY PARAMETERS
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct TierQuery {
    #[serde(rename = "chitAmount", default)]
    pub tier: Option<ChitPlan>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BalanceResponse {
    customer_id: String,
    balance: Decimal,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
    })
}

/// GET /api/customers?chitAmount=
async fn list_customers(State(state): State<AppState>, ApiQuery(query): ApiQuery<TierQuery>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.book().list_customers(query.tier)?))
}

/// POST /api/customers
async fn create_customer(
    State(state): State<AppState>,
    ApiJson(candidate): ApiJson<NewCustomer>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = state.book().create_customer(&candidate)?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /api/customers/:id
async fn get_customer(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Customer>> {
    Ok(Json(state.book().get_customer(&id)?))
}

/// DELETE /api/customers/:id - also removes the customer's chits
async fn delete_customer(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.book().delete_customer(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/customers/:id/statements
async fn customer_statements(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<MonthlyStatement>>> {
    Ok(Json(state.book().compute_statements(&id)?))
}

/// GET /api/customers/:id/balance - debits add, credits subtract
async fn customer_balance(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<BalanceResponse>> {
    let balance = state.book().balance(&id)?;
    Ok(Json(BalanceResponse { customer_id: id, balance }))
}

/// GET /api/chits?chitAmount=&customerId=
async fn list_chits(State(state): State<AppState>, ApiQuery(filter): ApiQuery<ChitFilter>) -> ApiResult<Json<Vec<Chit>>> {
    Ok(Json(state.book().list_chits(&filter)?))
}

/// POST /api/chits
async fn create_chit(State(state): State<AppState>, ApiJson(candidate): ApiJson<NewChit>) -> ApiResult<(StatusCode, Json<Chit>)> {
    let chit = state.book().create_chit(&candidate)?;
    Ok((StatusCode::CREATED, Json(chit)))
}

/// DELETE /api/chits/:id
async fn delete_chit(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.book().delete_chit(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/profits?chitAmount=
async fn list_profits(State(state): State<AppState>, ApiQuery(query): ApiQuery<TierQuery>) -> ApiResult<Json<Vec<Profit>>> {
    Ok(Json(state.book().list_profits(query.tier)?))
}

/// POST /api/profits
async fn create_profit(
    State(state): State<AppState>,
    ApiJson(candidate): ApiJson<NewProfit>,
) -> ApiResult<(StatusCode, Json<Profit>)> {
    let profit = state.book().create_profit(&candidate)?;
    Ok((StatusCode::CREATED, Json(profit)))
}

/// DELETE /api/profits/:id
async fn delete_profit(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.book().delete_profit(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/profits/schedule?chitAmount=
async fn profit_schedule(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TierQuery>,
) -> ApiResult<Json<Vec<ScheduleRow>>> {
    let tier = query
        .tier
        .ok_or_else(|| LedgerError::InvalidInput("chitAmount is required".to_string()))?;
    Ok(Json(state.book().profit_schedule(tier)?))
}

/// GET /api/paata?chitAmount=
async fn list_paata(State(state): State<AppState>, ApiQuery(query): ApiQuery<TierQuery>) -> ApiResult<Json<Vec<PaataEntry>>> {
    Ok(Json(state.book().list_paata(query.tier)?))
}

/// POST /api/paata
async fn create_paata(
    State(state): State<AppState>,
    ApiJson(candidate): ApiJson<NewPaata>,
) -> ApiResult<(StatusCode, Json<PaataEntry>)> {
    let entry = state.book().create_paata(&candidate)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// DELETE /api/paata/:id
async fn delete_paata(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.book().delete_paata(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/customers", get(list_customers).post(create_customer))
        .route("/customers/:id", get(get_customer).delete(delete_customer))
        .route("/customers/:id/statements", get(customer_statements))
        .route("/customers/:id/balance", get(customer_balance))
        .route("/chits", get(list_chits).post(create_chit))
        .route("/chits/:id", delete(delete_chit))
        .route("/profits", get(list_profits).post(create_profit))
        .route("/profits/schedule", get(profit_schedule))
        .route("/profits/:id", delete(delete_profit))
        .route("/paata", get(list_paata).post(create_paata))
        .route("/paata/:id", delete(delete_paata))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
