//! Order clause parsing: `order=<col>[.<asc|desc>][.<nullsfirst|nullslast>][,...]`

use std::fmt;

use sqlite_rest_common::error::{Error, Result};

/// One ORDER BY item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub column: String,
    pub direction: Option<String>,
    pub nulls: Option<String>,
}

impl fmt::Display for OrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.column)?;
        if let Some(direction) = &self.direction {
            write!(f, " {direction}")?;
        }
        if let Some(nulls) = &self.nulls {
            write!(f, " {nulls}")?;
        }
        Ok(())
    }
}

fn translate_nulls(token: &str) -> Option<&'static str> {
    match token {
        "nullsfirst" => Some("nulls first"),
        "nullslast" => Some("nulls last"),
        _ => None,
    }
}

/// Parse the raw `order` parameter into ORDER BY items
pub fn parse_order(order: &str) -> Result<Vec<OrderSpec>> {
    let mut specs = Vec::new();

    for part in order.split(',') {
        if part.is_empty() {
            continue;
        }

        let segments: Vec<&str> = part.split('.').collect();
        let spec = match segments.as_slice() {
            [column] => OrderSpec {
                column: (*column).to_string(),
                direction: None,
                nulls: None,
            },
            // a.asc -> a asc, a.nullslast -> a nulls last
            [column, modifier] => match translate_nulls(modifier) {
                Some(nulls) => OrderSpec {
                    column: (*column).to_string(),
                    direction: None,
                    nulls: Some(nulls.to_string()),
                },
                None => OrderSpec {
                    column: (*column).to_string(),
                    direction: Some((*modifier).to_string()),
                    nulls: None,
                },
            },
            [column, direction, nulls] => OrderSpec {
                column: (*column).to_string(),
                direction: Some(
                    translate_nulls(direction).map_or_else(|| (*direction).to_string(), str::to_string),
                ),
                nulls: Some(translate_nulls(nulls).map_or_else(|| (*nulls).to_string(), str::to_string)),
            },
            _ => return Err(Error::InvalidOrder(part.to_string())),
        };
        specs.push(spec);
    }

    Ok(specs)
}
