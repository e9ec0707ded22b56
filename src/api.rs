// Bookstore HTTP API
// Routes over the store, guarded by HTTP Basic auth

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::prelude::*;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::{Book, BookUpdate, NewBook};
use crate::config::Credentials;
use crate::error::InventoryError;
use crate::ledger::{NewTransaction, Transaction};
use crate::store::Store;

const REALM: &str = "Basic realm=\"bookstore\"";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

/// Authenticated user name, inserted by the auth middleware
#[derive(Debug, Clone)]
pub struct Actor(pub String);

/// Success body: `{"mensaje": ...}` plus an optional payload
#[derive(Serialize)]
struct MessageResponse<T> {
    mensaje: &'static str,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl MessageResponse<()> {
    fn text(mensaje: &'static str) -> Self {
        Self {
            mensaje,
            data: None,
        }
    }
}

#[derive(Serialize)]
struct TransactionCreated {
    transaccion: Transaction,
}

// ============================================================================
// Errors
// ============================================================================

pub struct ApiError(InventoryError);

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(InventoryError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InventoryError::NotFound(_) => StatusCode::NOT_FOUND,
            InventoryError::DuplicateKey(_) => StatusCode::CONFLICT,
            InventoryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            InventoryError::InsufficientStock { .. } => StatusCode::CONFLICT,
            InventoryError::Storage(_) | InventoryError::Poisoned => {
                tracing::error!(error = %self.0, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        json_error(status, self.0.code(), self.0.to_string())
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "mensaje": message.into(),
        })),
    )
        .into_response()
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Authentication
// ============================================================================

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = String::from_utf8(BASE64_STANDARD.decode(encoded).ok()?).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

async fn require_basic_auth(
    State(credentials): State<Credentials>,
    mut req: Request,
    next: Next,
) -> Response {
    match basic_credentials(req.headers()) {
        Some((user, password)) if credentials.verify(&user, &password) => {
            req.extensions_mut().insert(Actor(user));
            next.run(req).await
        }
        _ => {
            tracing::warn!(uri = %req.uri(), "rejected request without valid credentials");
            let mut response = json_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Credenciales inválidas",
            );
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(REALM));
            response
        }
    }
}

// ============================================================================
// Catalog handlers
// ============================================================================

/// GET /Libros
async fn list_books(State(state): State<AppState>) -> ApiResult<Json<Vec<Book>>> {
    Ok(Json(state.store.list_books()?))
}

/// GET /Libros/:isbn
async fn get_book(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
) -> ApiResult<Json<Book>> {
    Ok(Json(state.store.get_book(&isbn)?))
}

/// POST /Libros
async fn add_book(
    State(state): State<AppState>,
    Extension(Actor(actor)): Extension<Actor>,
    body: Result<Json<NewBook>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(new_book) = body?;
    state.store.add_book(new_book, &actor)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::text("Libro agregado exitosamente")),
    ))
}

/// PUT /Libros/:isbn
async fn update_book(
    State(state): State<AppState>,
    Extension(Actor(actor)): Extension<Actor>,
    Path(isbn): Path<String>,
    body: Result<Json<BookUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(update) = body?;
    state.store.update_book(&isbn, &update, &actor)?;

    Ok(Json(MessageResponse::text("Libro actualizado exitosamente")))
}

/// DELETE /Libros/:isbn
async fn remove_book(
    State(state): State<AppState>,
    Extension(Actor(actor)): Extension<Actor>,
    Path(isbn): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.store.remove_book(&isbn, &actor)?;

    Ok(Json(MessageResponse::text("Libro eliminado exitosamente")))
}

// ============================================================================
// Ledger and register handlers
// ============================================================================

/// POST /add_transaction
async fn add_transaction(
    State(state): State<AppState>,
    Extension(Actor(actor)): Extension<Actor>,
    body: Result<Json<NewTransaction>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(new_tx) = body?;
    let transaccion = state.store.register_transaction(&new_tx, &actor)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            mensaje: "Transacción registrada exitosamente",
            data: Some(TransactionCreated { transaccion }),
        }),
    ))
}

/// GET /Transacciones
async fn list_transactions(State(state): State<AppState>) -> ApiResult<Json<Vec<Transaction>>> {
    Ok(Json(state.store.list_transactions()?))
}

/// GET /estado_caja
async fn cash_register(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let estado_caja = state.store.cash_register()?;
    Ok(Json(json!({ "estado_caja": estado_caja })))
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "OK", "version": crate::VERSION }))
}

async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "Ruta no encontrada")
}

// ============================================================================
// Router
// ============================================================================

pub fn build_app(store: Store, credentials: Credentials) -> Router {
    let state = AppState { store };

    let protected = Router::new()
        .route("/Libros", get(list_books).post(add_book))
        .route(
            "/Libros/:isbn",
            get(get_book).put(update_book).delete(remove_book),
        )
        .route("/add_transaction", post(add_transaction))
        .route("/Transacciones", get(list_transactions))
        .route("/estado_caja", get(cash_register))
        .route_layer(middleware::from_fn_with_state(
            credentials,
            require_basic_auth,
        ))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
