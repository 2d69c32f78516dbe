//! sqlite-rest HTTP service
//!
//! Exposes allow-listed SQLite tables through the PostgREST request grammar:
//! - `GET /{table}` selects rows (filters, ordering, pagination, exact count)
//! - `POST /{table}` inserts rows, optionally as an upsert
//! - `PATCH /{table}` and `PUT /{table}` update rows
//! - `DELETE /{table}` deletes rows
//!
//! Requests are authenticated with JWT bearer tokens unless auth is disabled.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod backend;
pub mod handlers;
pub mod security;
pub mod server;

pub use auth::{Authenticator, KeyFile};
pub use backend::{QueryBackend, QueryResult, SqliteBackend};
pub use handlers::RestState;
pub use security::TableAccess;
pub use server::{configure_routes, RestServer};
