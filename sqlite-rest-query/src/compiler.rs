//! Statement compiler: request descriptor in, parameterized SQL out

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use sqlite_rest_common::error::{Error, Result};

use crate::filter::{self, Clause, PARAM_ON_CONFLICT, PARAM_ORDER, PARAM_SELECT};
use crate::order;
use crate::pagination::{self, Pagination};
use crate::payload::InputPayload;
use crate::preference::{Preference, ResolutionMethod};
use crate::request::RequestDescriptor;

/// SQL text plus its ordered bound parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledQuery {
    pub query: String,
    pub values: Vec<Value>,
}

impl CompiledQuery {
    fn new(query: String) -> Self {
        Self {
            query,
            values: Vec::new(),
        }
    }

    /// Append ` where <clauses>` when there is at least one clause
    fn push_where(&mut self, clauses: Vec<Clause>) {
        if clauses.is_empty() {
            return;
        }

        let mut exprs = Vec::with_capacity(clauses.len());
        for clause in clauses {
            exprs.push(clause.expr);
            self.values.extend(clause.values);
        }
        self.query = format!("{} where {}", self.query, exprs.join(" and "));
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query={:?} values={:?}", self.query, self.values)
    }
}

/// Statement shapes the compiler can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    ExactCount,
    Insert,
    Update,
    UpdateSingleEntry,
    Delete,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::ExactCount => "exact_count",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::UpdateSingleEntry => "update_single_entry",
            Self::Delete => "delete",
        }
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

/// Compiles one request into SQL statements.
///
/// Table and column identifiers are not validated here, except for
/// `on_conflict` columns which cannot be bound as parameters. Access control
/// on the target table belongs to the caller.
pub struct QueryCompiler<'a> {
    req: &'a RequestDescriptor,
    known_columns: Option<&'a [String]>,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(req: &'a RequestDescriptor) -> Self {
        Self {
            req,
            known_columns: None,
        }
    }

    /// Restrict `on_conflict` identifiers to the target table's columns
    #[must_use]
    pub fn with_known_columns(mut self, columns: &'a [String]) -> Self {
        self.known_columns = Some(columns);
        self
    }

    pub fn compile(&self, kind: StatementKind, table: &str) -> Result<CompiledQuery> {
        let compiled = match kind {
            StatementKind::Select => self.compile_as_select(table),
            StatementKind::ExactCount => self.compile_as_exact_count(table),
            StatementKind::Insert => self.compile_as_insert(table),
            StatementKind::Update => self.compile_as_update(table),
            StatementKind::UpdateSingleEntry => self.compile_as_update_single_entry(table),
            StatementKind::Delete => self.compile_as_delete(table),
        }?;
        debug!(table, kind = kind.as_str(), %compiled, "compiled statement");
        Ok(compiled)
    }

    pub fn compile_as_select(&self, table: &str) -> Result<CompiledQuery> {
        let mut rv = CompiledQuery::new(format!(
            "select {} from {table}",
            self.select_result_columns().join(", ")
        ));
        rv.push_where(self.query_clauses()?);

        let order_clauses = self.order_clauses()?;
        if !order_clauses.is_empty() {
            rv.query = format!("{} order by {}", rv.query, order_clauses.join(", "));
        }

        if let Some(pagination) = pagination::resolve(self.req)? {
            rv.query = format!("{} {}", rv.query, pagination.to_sql());
        }

        Ok(rv)
    }

    pub fn compile_as_exact_count(&self, table: &str) -> Result<CompiledQuery> {
        let mut rv = CompiledQuery::new(format!("select count(1) from {table}"));
        rv.push_where(self.query_clauses()?);
        Ok(rv)
    }

    pub fn compile_as_insert(&self, table: &str) -> Result<CompiledQuery> {
        let preference = Preference::from_request(self.req)?;

        let payload = InputPayload::from_request(self.req)?;
        if payload.rows().is_empty() {
            return Err(Error::bad_request("no data to insert"));
        }
        if !payload.has_columns() {
            return Err(Error::bad_request("no columns to insert"));
        }

        let columns = payload.sorted_columns();
        let values = payload.values(&columns);
        let row_placeholder = format!("({})", vec!["?"; columns.len()].join(", "));
        let placeholders = vec![row_placeholder.as_str(); values.len()].join(", ");

        let mut rv = CompiledQuery::new(format!(
            "insert into {table} ({}) values {placeholders}",
            columns.join(", ")
        ));
        rv.values = values.into_iter().flatten().collect();

        if preference.resolution != ResolutionMethod::None {
            let on_conflict = self.on_conflict_columns()?;
            let target = if on_conflict.is_empty() {
                String::new()
            } else {
                format!(" ({})", on_conflict.join(", "))
            };

            match preference.resolution {
                ResolutionMethod::IgnoreDuplicates => {
                    rv.query = format!("{} on conflict{target} do nothing", rv.query);
                }
                ResolutionMethod::MergeDuplicates => {
                    let excluded: Vec<String> = columns
                        .iter()
                        .map(|column| format!("{column} = excluded.{column}"))
                        .collect();
                    rv.query = format!(
                        "{} on conflict{target} do update set {}",
                        rv.query,
                        excluded.join(", ")
                    );
                }
                ResolutionMethod::None => {}
            }
        }

        Ok(rv)
    }

    pub fn compile_as_update(&self, table: &str) -> Result<CompiledQuery> {
        let mut rv = self.update_set(table)?;
        rv.push_where(self.query_clauses()?);
        Ok(rv)
    }

    /// Like [`Self::compile_as_update`] but refuses to run without a filter.
    ///
    /// SQLite builds without `SQLITE_ENABLE_UPDATE_DELETE_LIMIT` reject
    /// `update ... limit 1`, so matching more than one row is still possible.
    pub fn compile_as_update_single_entry(&self, table: &str) -> Result<CompiledQuery> {
        let mut rv = self.update_set(table)?;

        let clauses = self.query_clauses()?;
        if clauses.is_empty() {
            return Err(Error::bad_request("expect to specify primary key query"));
        }
        rv.push_where(clauses);

        Ok(rv)
    }

    pub fn compile_as_delete(&self, table: &str) -> Result<CompiledQuery> {
        let mut rv = CompiledQuery::new(format!("delete from {table}"));
        rv.push_where(self.query_clauses()?);
        Ok(rv)
    }

    /// Content-Range value for a select; empty when pagination is unresolved
    pub fn compile_content_range_header(&self, total_count: &str) -> String {
        match pagination::resolve(self.req) {
            Ok(Some(pagination)) => pagination.content_range(total_count),
            _ => String::new(),
        }
    }

    /// Resolved pagination of the request, if any
    pub fn pagination(&self) -> Result<Option<Pagination>> {
        pagination::resolve(self.req)
    }

    fn update_set(&self, table: &str) -> Result<CompiledQuery> {
        let payload = InputPayload::from_request(self.req)?;
        match payload.rows().len() {
            0 => return Err(Error::bad_request("no data to update")),
            1 => {}
            _ => return Err(Error::bad_request("too many data to update")),
        }
        if !payload.has_columns() {
            return Err(Error::bad_request("no columns to update"));
        }

        let columns = payload.sorted_columns();
        let assignments: Vec<String> = columns.iter().map(|c| format!("{c} = ?")).collect();

        let mut rv = CompiledQuery::new(format!("update {table} set {}", assignments.join(", ")));
        rv.values = payload.values(&columns).into_iter().flatten().collect();
        Ok(rv)
    }

    fn select_result_columns(&self) -> Vec<&str> {
        match self.req.query().get(PARAM_SELECT) {
            None | Some("") => vec!["*"],
            Some(select) => select.split(',').collect(),
        }
    }

    fn query_clauses(&self) -> Result<Vec<Clause>> {
        let query = self.req.query();
        let mut clauses = Vec::new();

        for column in query.keys() {
            if !filter::is_column_name(column) {
                continue;
            }
            for raw in query.get_all(column) {
                if let Some(clause) = filter::parse_filter(column, raw)? {
                    clauses.push(clause);
                }
            }
        }

        Ok(clauses)
    }

    fn order_clauses(&self) -> Result<Vec<String>> {
        match self.req.query().get(PARAM_ORDER) {
            None | Some("") => Ok(Vec::new()),
            Some(raw) => Ok(order::parse_order(raw)?
                .iter()
                .map(ToString::to_string)
                .collect()),
        }
    }

    /// `on_conflict` columns are spliced into SQL text, so each one must be a
    /// plain identifier and, when known, a column of the target table.
    fn on_conflict_columns(&self) -> Result<Vec<&str>> {
        let raw = match self.req.query().get(PARAM_ON_CONFLICT) {
            None | Some("") => return Ok(Vec::new()),
            Some(raw) => raw,
        };

        let columns: Vec<&str> = raw.split(',').collect();
        for column in &columns {
            if !identifier_pattern().is_match(column) {
                return Err(Error::bad_request(format!(
                    "invalid on_conflict column: {column}"
                )));
            }
            if let Some(known) = self.known_columns {
                if !known.iter().any(|k| k == column) {
                    return Err(Error::bad_request(format!(
                        "unknown on_conflict column: {column}"
                    )));
                }
            }
        }

        Ok(columns)
    }
}
