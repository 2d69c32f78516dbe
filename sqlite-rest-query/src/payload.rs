//! JSON request body decoding into a row-set with a column union

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::debug;

use sqlite_rest_common::error::{Error, Result};

use crate::request::{RequestDescriptor, HEADER_CONTENT_TYPE};

/// Decoded request body: one or more rows plus the union of their keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputPayload {
    columns: BTreeSet<String>,
    rows: Vec<Map<String, Value>>,
}

impl InputPayload {
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> Self {
        let columns = rows.iter().flat_map(|row| row.keys().cloned()).collect();
        Self { columns, rows }
    }

    /// Decode the request body according to its content type.
    ///
    /// Only `application/json` is accepted; the header may list several
    /// comma separated candidates.
    pub fn from_request(req: &RequestDescriptor) -> Result<Self> {
        let content_type = req
            .header(HEADER_CONTENT_TYPE)
            .unwrap_or("application/octet-stream");

        for candidate in content_type.split(',') {
            let Ok(media_type) = candidate.trim().parse::<mime::Mime>() else {
                continue;
            };
            if media_type.essence_str() == mime::APPLICATION_JSON.essence_str() {
                return Self::from_json(&req.body());
            }
        }

        debug!(content_type, "rejecting non-JSON request body");
        Err(Error::UnsupportedMediaType)
    }

    /// `[...]` decodes as an array of objects, anything else as one object
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let first = body.iter().find(|b| !b.is_ascii_whitespace());
        let rows = if first == Some(&b'[') {
            serde_json::from_slice::<Vec<Map<String, Value>>>(body)?
        } else {
            vec![serde_json::from_slice::<Map<String, Value>>(body)?]
        };
        Ok(Self::from_rows(rows))
    }

    pub fn rows(&self) -> &[Map<String, Value>] {
        &self.rows
    }

    pub fn has_columns(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Column union in lexicographic order
    pub fn sorted_columns(&self) -> Vec<String> {
        self.columns.iter().cloned().collect()
    }

    /// One tuple per row aligned with `columns`; missing keys are `null`
    pub fn values(&self, columns: &[String]) -> Vec<Vec<Value>> {
        self.rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect()
    }
}
