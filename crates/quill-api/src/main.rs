//! quill-api - HTTP API server for quill

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use quill_api::auth::{decode_token, AuthConfig};
use quill_api::services::{AccountService, NoteService, TagService};
use quill_core::defaults::{DEFAULT_PORT, DEFAULT_TOKEN_TTL_SECS};
use quill_core::{
    AccountRepository, AttachTagRequest, CreateNoteRequest, LoginRequest, Note, NoteRepository,
    RegisterRequest, Tag, TagRepository, UpdateNoteRequest, UpdateTagRequest,
};
use quill_db::Database;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful for
/// log correlation when tracing a request across service and store calls.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    accounts: AccountService,
    notes: NoteService,
    tags: TagService,
    auth: AuthConfig,
}

/// Account id resolved from the bearer token, injected by the auth
/// middleware. Handlers take their account id from here and nowhere else.
#[derive(Debug, Clone, Copy)]
struct AuthAccount(i64);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "quill_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quill_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("quill-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false), // no ANSI in files
                )
                .init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/quill".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let jwt_secret = std::env::var("JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
    let token_ttl_secs: u64 = std::env::var("TOKEN_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
    let auth = AuthConfig::new(jwt_secret).token_ttl_secs(token_ttl_secs);

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Wire services to the store implementations
    let accounts_repo: Arc<dyn AccountRepository> = Arc::new(db.accounts.clone());
    let notes_repo: Arc<dyn NoteRepository> = Arc::new(db.notes.clone());
    let tags_repo: Arc<dyn TagRepository> = Arc::new(db.tags.clone());

    let state = AppState {
        accounts: AccountService::new(accounts_repo, auth.clone()),
        notes: NoteService::new(notes_repo.clone(), tags_repo.clone()),
        tags: TagService::new(tags_repo, notes_repo),
        auth,
    };

    // Everything except register/login/health requires a bearer token
    let protected = Router::new()
        .route("/api/v1/accounts/:id", get(get_account))
        // Notes CRUD + tag search
        .route("/api/v1/notes", get(list_notes).post(create_note))
        .route("/api/v1/notes/search", get(search_notes))
        .route(
            "/api/v1/notes/:id",
            get(get_note).patch(update_note).delete(delete_note),
        )
        // Per-note tag endpoints
        .route(
            "/api/v1/notes/:id/tags",
            get(get_note_tags).post(attach_tag),
        )
        .route("/api/v1/notes/:id/tags/:tag_id", delete(detach_tag))
        // Tags
        .route("/api/v1/tags", get(list_tags))
        .route(
            "/api/v1/tags/:id",
            get(get_tag).patch(update_tag).delete(delete_tag),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            authenticate,
        ));

    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Account registration and login
        .route("/api/v1/accounts/register", post(register_account))
        .route("/api/v1/accounts/login", post(login))
        .merge(protected)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer()?)
        .layer(RequestBodyLimitLayer::new(1024 * 1024)) // 1 MB request bodies
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS configuration: an explicit CORS_ORIGIN gets credentials, otherwise
/// any origin without credentials.
fn cors_layer() -> anyhow::Result<CorsLayer> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT];

    let layer = match std::env::var("CORS_ORIGIN") {
        Ok(origin) if origin != "*" => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(HeaderValue::from_str(&origin)?))
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true),
        _ => CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(methods)
            .allow_headers(headers),
    };
    Ok(layer)
}

// =============================================================================
// AUTH MIDDLEWARE
// =============================================================================

/// Resolve the bearer token to an account id and inject it into request
/// extensions.
async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let account_id = decode_token(token, &state.auth)?;
    req.extensions_mut().insert(AuthAccount(account_id));
    Ok(next.run(req).await)
}

// =============================================================================
// RESPONSE TYPES
// =============================================================================

#[derive(Serialize)]
struct CreatedResponse {
    id: i64,
}

#[derive(Serialize)]
struct NotesResponse {
    notes: Vec<Note>,
}

#[derive(Serialize)]
struct TagsResponse {
    tags: Vec<Tag>,
}

// =============================================================================
// ACCOUNT HANDLERS
// =============================================================================

async fn register_account(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.accounts.register(req).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.accounts.login(req).await?;
    Ok(Json(resp))
}

async fn get_account(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    // The path id is only valid for the caller's own account; anything else
    // is indistinguishable from a missing account.
    if id != account_id {
        return Err(ApiError::NotFound(format!("account {}", id)));
    }
    let account = state.accounts.get(account_id).await?;
    Ok(Json(account))
}

// =============================================================================
// NOTE HANDLERS
// =============================================================================

async fn create_note(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.header.is_empty() {
        return Err(ApiError::BadRequest("header must not be empty".to_string()));
    }
    let id = state.notes.create(account_id, req).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn list_notes(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
) -> Result<impl IntoResponse, ApiError> {
    let notes = state.notes.get_all(account_id).await?;
    Ok(Json(NotesResponse { notes }))
}

async fn get_note(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.notes.get_one(account_id, id).await?;
    Ok(Json(note))
}

async fn update_note(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    Path(id): Path<i64>,
    Json(raw): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    // Key presence distinguishes "body omitted" from "body set to empty";
    // the service keeps the stored body verbatim when the key is absent.
    let need_body_update = raw.get("body").is_some();
    let req: UpdateNoteRequest = serde_json::from_value(raw)
        .map_err(|e| ApiError::BadRequest(format!("malformed note update: {}", e)))?;

    let note = Note {
        id,
        header: req.header,
        body: req.body,
        short_body: String::new(),
        color: req.color,
        edited: chrono::Utc::now(),
        tags: Vec::new(),
    };
    state.notes.update(account_id, note, need_body_update).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_note(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.notes.delete(account_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn search_notes(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let labels: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| key == "tag")
        .map(|(_, value)| value)
        .collect();
    if labels.is_empty() {
        return Err(ApiError::BadRequest(
            "missing 'tag' query parameter".to_string(),
        ));
    }

    let notes = state.notes.find_by_tags(account_id, &labels).await?;
    Ok(Json(NotesResponse { notes }))
}

// =============================================================================
// TAG HANDLERS
// =============================================================================

async fn list_tags(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
) -> Result<impl IntoResponse, ApiError> {
    let tags = state.tags.get_all(account_id).await?;
    Ok(Json(TagsResponse { tags }))
}

async fn get_tag(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state.tags.get_one(account_id, id).await?;
    Ok(Json(tag))
}

async fn update_tag(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.tags.update(account_id, id, req).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_tag(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.tags.delete(account_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_note_tags(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tags = state.tags.get_all_by_note(account_id, id).await?;
    Ok(Json(TagsResponse { tags }))
}

async fn attach_tag(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    Path(id): Path<i64>,
    Json(req): Json<AttachTagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.label.is_empty() {
        return Err(ApiError::BadRequest("label must not be empty".to_string()));
    }

    let (tag, newly_created) = state.tags.attach_or_create(account_id, id, req).await?;
    let status = if newly_created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(tag)))
}

async fn detach_tag(
    State(state): State<AppState>,
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    Path((note_id, tag_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    state.tags.detach(account_id, tag_id, note_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// SYSTEM HANDLERS
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Service(quill_core::Error),
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<quill_core::Error> for ApiError {
    fn from(err: quill_core::Error) -> Self {
        use quill_core::Error;
        match &err {
            Error::NotFound(_) | Error::NoteNotFound(_) | Error::TagNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            Error::DuplicateUsername(_) | Error::DuplicateLabel(_) => {
                ApiError::Conflict(err.to_string())
            }
            Error::Unauthorized(_) => ApiError::Unauthorized(err.to_string()),
            Error::InvalidInput(_) => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Service(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Service(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
