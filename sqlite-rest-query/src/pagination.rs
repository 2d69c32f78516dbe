//! Pagination resolution from the `Range` header or `limit`/`offset` parameters

use sqlite_rest_common::error::{Error, Result};

use crate::filter::{PARAM_LIMIT, PARAM_OFFSET};
use crate::request::{RequestDescriptor, HEADER_RANGE};

/// Resolved limit/offset pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Row count, or [`Pagination::UNBOUNDED`]
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    /// No upper bound on the number of rows.
    ///
    /// SQLite treats a negative LIMIT as unbounded, so the sentinel can be
    /// rendered as-is: <https://www.sqlite.org/lang_select.html#limitoffset>
    pub const UNBOUNDED: i64 = -1;

    pub fn is_unbounded(&self) -> bool {
        self.limit < 0
    }

    /// `limit <n>[ offset <m>]`
    pub fn to_sql(&self) -> String {
        if self.offset == 0 {
            format!("limit {}", self.limit)
        } else {
            format!("limit {} offset {}", self.limit, self.offset)
        }
    }

    /// Content-Range value for this slice of a result with `total` rows
    pub fn content_range(&self, total: &str) -> String {
        if self.is_unbounded() {
            format!("{}-/{total}", self.offset)
        } else {
            let last = self.offset.saturating_add(self.limit - 1);
            format!("{}-{last}/{total}", self.offset)
        }
    }
}

/// Resolve pagination; the `Range` header takes precedence over parameters.
///
/// Returns `Ok(None)` when neither source is present.
pub fn resolve(req: &RequestDescriptor) -> Result<Option<Pagination>> {
    if let Some(range) = req.header(HEADER_RANGE) {
        return parse_range(range).map(Some);
    }
    from_query_parameters(req)
}

/// `start-end` (inclusive, 0-based) or open-ended `start-`
fn parse_range(range: &str) -> Result<Pagination> {
    let invalid = || Error::bad_request(format!("invalid range header: {range}"));

    let (start, end) = range.split_once('-').ok_or_else(invalid)?;
    let offset: i64 = start.trim().parse().map_err(|_| invalid())?;

    let end = end.trim();
    if end.is_empty() {
        return Ok(Pagination {
            limit: Pagination::UNBOUNDED,
            offset,
        });
    }

    let to: i64 = end.parse().map_err(|_| invalid())?;
    if to < offset {
        return Err(invalid());
    }

    let limit = to
        .checked_sub(offset)
        .and_then(|span| span.checked_add(1))
        .ok_or_else(invalid)?;

    Ok(Pagination { limit, offset })
}

fn from_query_parameters(req: &RequestDescriptor) -> Result<Option<Pagination>> {
    let read = |name: &str| -> Result<Option<i64>> {
        match req.query().get(name) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|v| *v >= 0)
                .map(Some)
                .ok_or_else(|| Error::bad_request(format!("invalid {name}: {raw}"))),
        }
    };

    let Some(limit) = read(PARAM_LIMIT)? else {
        return Ok(None);
    };
    // offset is optional
    let offset = read(PARAM_OFFSET)?.unwrap_or(0);
    if offset.checked_add(limit).is_none() {
        return Err(Error::bad_request(format!(
            "invalid range: offset {offset} with limit {limit}"
        )));
    }

    Ok(Some(Pagination { limit, offset }))
}
