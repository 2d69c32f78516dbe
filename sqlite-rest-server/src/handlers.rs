//! HTTP handlers for table endpoints

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use bytes::Bytes;
use tracing::{debug, warn};

use sqlite_rest_common::error::{Error, Result};
use sqlite_rest_common::types::ApiError;
use sqlite_rest_query::filter::PARAM_ON_CONFLICT;
use sqlite_rest_query::request::{HEADER_CONTENT_TYPE, HEADER_PREFER, HEADER_RANGE};
use sqlite_rest_query::{
    CompiledQuery, CountMethod, Preference, QueryCompiler, RequestDescriptor, StatementKind,
};

use crate::auth::{Authenticator, HEADER_AUTHORIZATION};
use crate::backend::QueryBackend;
use crate::security::TableAccess;

/// Content-Range header name
pub const HEADER_CONTENT_RANGE: &str = "Content-Range";
/// Range-Unit header name
pub const HEADER_RANGE_UNIT: &str = "Range-Unit";

/// Shared REST API state
pub struct RestState {
    pub backend: Arc<dyn QueryBackend>,
    pub authenticator: Authenticator,
    pub access: TableAccess,
}

impl RestState {
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        authenticator: Authenticator,
        access: TableAccess,
    ) -> Self {
        Self {
            backend,
            authenticator,
            access,
        }
    }

    /// Table allow-list first, then the bearer token
    fn guard(&self, req: &HttpRequest, table: &str) -> Result<()> {
        self.access.check(table)?;

        let header = req
            .headers()
            .get(HEADER_AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        self.authenticator.authenticate(header)
    }
}

/// Render an error as `{message, code, hint}` with its status code
pub fn error_response(err: &Error) -> HttpResponse {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!(error = %err, "request failed");
    } else {
        debug!(error = %err, "request rejected");
    }
    HttpResponse::build(status).json(ApiError::from(err))
}

/// Snapshot of the parts of the request the compiler reads
fn describe(req: &HttpRequest, body: Bytes) -> RequestDescriptor {
    let mut descriptor = RequestDescriptor::from_query_string(req.query_string()).with_body(body);

    for name in [HEADER_RANGE, HEADER_PREFER, HEADER_CONTENT_TYPE] {
        for value in req.headers().get_all(name) {
            if let Ok(value) = value.to_str() {
                descriptor = descriptor.with_header(name, value);
            }
        }
    }

    descriptor
}

fn compile(
    compiler: &QueryCompiler<'_>,
    kind: StatementKind,
    table: &str,
) -> Result<CompiledQuery> {
    compiler.compile(kind, table).map_err(|e| {
        warn!(table, kind = kind.as_str(), error = %e, "failed to compile query");
        e
    })
}

/// GET /{table} - Select rows
pub async fn select_handler(
    state: web::Data<Arc<RestState>>,
    path: web::Path<String>,
    req: HttpRequest,
) -> HttpResponse {
    let table = path.into_inner();
    match select(&state, &table, &req).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    }
}

async fn select(state: &RestState, table: &str, req: &HttpRequest) -> Result<HttpResponse> {
    state.guard(req, table)?;

    let descriptor = describe(req, Bytes::new());
    let compiler = QueryCompiler::new(&descriptor);
    let compiled = compile(&compiler, StatementKind::Select, table)?;
    let result = state.backend.query(&compiled).await?;

    let total = match Preference::from_request(&descriptor)?.count {
        CountMethod::Exact => {
            let compiled = compile(&compiler, StatementKind::ExactCount, table)?;
            state.backend.count(&compiled).await?.to_string()
        }
        CountMethod::None => "*".to_string(),
    };

    let mut response = HttpResponse::Ok();
    response.insert_header((HEADER_RANGE_UNIT, "items"));
    let content_range = compiler.compile_content_range_header(&total);
    if !content_range.is_empty() {
        response.insert_header((HEADER_CONTENT_RANGE, content_range));
    }

    Ok(response.json(result.rows))
}

/// POST /{table} - Insert rows
pub async fn insert_handler(
    state: web::Data<Arc<RestState>>,
    path: web::Path<String>,
    req: HttpRequest,
    body: Bytes,
) -> HttpResponse {
    let table = path.into_inner();
    match insert(&state, &table, &req, body).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    }
}

async fn insert(
    state: &RestState,
    table: &str,
    req: &HttpRequest,
    body: Bytes,
) -> Result<HttpResponse> {
    state.guard(req, table)?;

    let descriptor = describe(req, body);

    // conflict targets are only accepted when they name real columns
    let known_columns = if descriptor
        .query()
        .get(PARAM_ON_CONFLICT)
        .is_some_and(|v| !v.is_empty())
    {
        Some(state.backend.table_columns(table).await?)
    } else {
        None
    };

    let mut compiler = QueryCompiler::new(&descriptor);
    if let Some(columns) = &known_columns {
        compiler = compiler.with_known_columns(columns);
    }

    let compiled = compile(&compiler, StatementKind::Insert, table)?;
    state.backend.execute(&compiled).await?;

    Ok(HttpResponse::Created().finish())
}

/// PATCH /{table} - Update rows matching the filters
pub async fn update_handler(
    state: web::Data<Arc<RestState>>,
    path: web::Path<String>,
    req: HttpRequest,
    body: Bytes,
) -> HttpResponse {
    let table = path.into_inner();
    match mutate(&state, StatementKind::Update, &table, &req, body).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    }
}

/// PUT /{table} - Update the single row addressed by the filters
pub async fn update_single_entry_handler(
    state: web::Data<Arc<RestState>>,
    path: web::Path<String>,
    req: HttpRequest,
    body: Bytes,
) -> HttpResponse {
    let table = path.into_inner();
    match mutate(&state, StatementKind::UpdateSingleEntry, &table, &req, body).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    }
}

/// DELETE /{table} - Delete rows matching the filters
pub async fn delete_handler(
    state: web::Data<Arc<RestState>>,
    path: web::Path<String>,
    req: HttpRequest,
) -> HttpResponse {
    let table = path.into_inner();
    match mutate(&state, StatementKind::Delete, &table, &req, Bytes::new()).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    }
}

async fn mutate(
    state: &RestState,
    kind: StatementKind,
    table: &str,
    req: &HttpRequest,
    body: Bytes,
) -> Result<HttpResponse> {
    state.guard(req, table)?;

    let descriptor = describe(req, body);
    let compiled = compile(&QueryCompiler::new(&descriptor), kind, table)?;
    let result = state.backend.execute(&compiled).await?;
    debug!(table, kind = kind.as_str(), rows_affected = result.rows_affected, "mutation applied");

    Ok(HttpResponse::Accepted().finish())
}

/// Health check
pub async fn health_handler() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "sqlite-rest",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
