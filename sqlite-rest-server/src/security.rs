//! Table allow-list

use std::collections::HashSet;

use sqlite_rest_common::config::SecurityConfig;
use sqlite_rest_common::error::{Error, Result};

/// Tables (or views) reachable through the API. Anything else is refused
/// before any SQL is compiled.
#[derive(Debug, Clone, Default)]
pub struct TableAccess {
    allowed: HashSet<String>,
}

impl TableAccess {
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: tables.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config.allowed_tables.iter().cloned())
    }

    pub fn is_allowed(&self, table: &str) -> bool {
        self.allowed.contains(table)
    }

    pub fn check(&self, table: &str) -> Result<()> {
        if self.is_allowed(table) {
            Ok(())
        } else {
            Err(Error::AccessRestricted)
        }
    }
}
