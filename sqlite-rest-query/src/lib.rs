//! sqlite-rest Query Compiler (PostgREST-compatible)
//!
//! Translates a request descriptor (target table, query parameters, `Range`,
//! `Prefer` and `Content-Type` headers, buffered body) into parameterized SQL
//! for SQLite, supporting:
//! - Filtering (eq, neq, gt, ge, lt, le, like, ilike, in, is)
//! - Column selection, ordering and pagination
//! - Inserts with conflict resolution (upsert)
//! - Updates, single entry updates and deletes
//! - Content-Range response header computation
//!
//! Every user supplied value is carried as a bound parameter. Table and
//! column identifiers are passed through as-is; restricting which tables may
//! be targeted is up to the caller.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compiler;
pub mod filter;
pub mod order;
pub mod pagination;
pub mod payload;
pub mod preference;
pub mod request;

pub use compiler::{CompiledQuery, QueryCompiler, StatementKind};
pub use filter::{Clause, FilterOperator};
pub use order::OrderSpec;
pub use pagination::Pagination;
pub use payload::InputPayload;
pub use preference::{CountMethod, Preference, ResolutionMethod};
pub use request::{QueryParams, RequestDescriptor};
