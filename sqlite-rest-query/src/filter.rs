//! Filter clause parsing for PostgREST-compatible `column=op.value` tokens

use serde_json::Value;

use sqlite_rest_common::error::{Error, Result};

pub const PARAM_SELECT: &str = "select";
pub const PARAM_ORDER: &str = "order";
pub const PARAM_LIMIT: &str = "limit";
pub const PARAM_OFFSET: &str = "offset";
pub const PARAM_ON_CONFLICT: &str = "on_conflict";

/// Query keys with special meaning; never parsed as filters
pub const RESERVED_KEYS: [&str; 5] = [
    PARAM_SELECT,
    PARAM_ORDER,
    PARAM_LIMIT,
    PARAM_OFFSET,
    PARAM_ON_CONFLICT,
];

/// Whether a query key names a filterable column (case-insensitive)
pub fn is_column_name(key: &str) -> bool {
    !RESERVED_KEYS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(key))
}

/// Supported filter operators
///
/// ref: <https://postgrest.org/en/stable/api.html#operators>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,    // equals
    Neq,   // not equals
    Gt,    // greater than
    Ge,    // greater than or equal
    Lt,    // less than
    Le,    // less than or equal
    Like,  // LIKE
    Ilike, // ILIKE (case-insensitive)
    In,    // IN
    Is,    // IS (for NULL, TRUE, FALSE)
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 10] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Ge,
        Self::Lt,
        Self::Le,
        Self::Like,
        Self::Ilike,
        Self::In,
        Self::Is,
    ];

    /// Token used in the query string
    pub fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Like => "like",
            Self::Ilike => "ilike",
            Self::In => "in",
            Self::Is => "is",
        }
    }

    /// SQL operator the token compiles to
    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Like => "LIKE",
            Self::Ilike => "ILIKE",
            Self::In => "IN",
            Self::Is => "IS",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    fn build(self, column: &str, value: &str) -> Result<Clause> {
        match self {
            Self::In => in_clause(column, value),
            Self::Is => is_clause(column, self, value),
            _ => Ok(Clause {
                expr: format!("{column} {} ?", self.sql()),
                values: vec![Value::String(value.to_string())],
            }),
        }
    }
}

/// One predicate fragment plus its bound values
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub expr: String,
    pub values: Vec<Value>,
}

/// Parse one raw filter value for `column`.
///
/// `eq.1` => `column = ?` bound to `"1"`. An empty raw value yields no clause.
pub fn parse_filter(column: &str, raw: &str) -> Result<Option<Clause>> {
    if raw.is_empty() {
        return Ok(None);
    }

    let Some((op, value)) = raw.split_once('.') else {
        return Err(Error::UnsupportedOperator(raw.to_string()));
    };
    if op.is_empty() || value.is_empty() {
        return Err(Error::UnsupportedOperator(raw.to_string()));
    }

    match FilterOperator::from_name(op) {
        Some(operator) => operator.build(column, value).map(Some),
        None => Err(Error::UnsupportedOperator(raw.to_string())),
    }
}

/// `(1,2,3)` is rewritten to the JSON array `[1,2,3]` and decoded
fn in_clause(column: &str, value: &str) -> Result<Clause> {
    let inner = value.strip_prefix('(').unwrap_or(value);
    let inner = inner.strip_suffix(')').unwrap_or(inner);
    let values: Vec<Value> = serde_json::from_str(&format!("[{inner}]"))?;
    if values.is_empty() {
        return Err(Error::UnsupportedOperator(format!("in.{value}")));
    }

    let placeholders = vec!["?"; values.len()].join(",");
    Ok(Clause {
        expr: format!("{column} IN ({placeholders})"),
        values,
    })
}

fn is_clause(column: &str, operator: FilterOperator, value: &str) -> Result<Clause> {
    let bound = match value.to_lowercase().as_str() {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            return Err(Error::UnsupportedOperator(format!(
                "{}.{value}",
                operator.name()
            )))
        }
    };

    Ok(Clause {
        expr: format!("{column} IS ?"),
        values: vec![bound],
    })
}
