//! `Prefer` header parsing

use std::str::FromStr;

use sqlite_rest_common::error::{Error, Result};

use crate::request::{RequestDescriptor, HEADER_PREFER};

/// Count strategy requested by the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CountMethod {
    #[default]
    None,
    Exact,
}

impl FromStr for CountMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "" => Ok(Self::None),
            "exact" => Ok(Self::Exact),
            _ => Err(Error::bad_request(format!("unsupported count preference: {s}"))),
        }
    }
}

/// Upsert strategy applied when an insert collides with a unique constraint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionMethod {
    #[default]
    None,
    IgnoreDuplicates,
    MergeDuplicates,
}

impl FromStr for ResolutionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "" => Ok(Self::None),
            "ignore-duplicates" => Ok(Self::IgnoreDuplicates),
            "merge-duplicates" => Ok(Self::MergeDuplicates),
            _ => Err(Error::bad_request(format!(
                "unsupported resolution preference: {s}"
            ))),
        }
    }
}

/// Parsed `Prefer` header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Preference {
    pub count: CountMethod,
    pub resolution: ResolutionMethod,
}

impl Preference {
    /// Parse the `Prefer` header of `req`; absent header yields the default.
    pub fn from_request(req: &RequestDescriptor) -> Result<Self> {
        req.header(HEADER_PREFER)
            .map_or_else(|| Ok(Self::default()), Self::parse)
    }

    /// Parse `key=value` pairs separated by `,` (or `;`).
    ///
    /// Unknown keys are ignored; unknown values of known keys are rejected.
    pub fn parse(header: &str) -> Result<Self> {
        let mut preference = Self::default();

        for pair in header.split([',', ';']) {
            let pair = pair.trim();
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };

            match key.trim().to_lowercase().as_str() {
                "count" => preference.count = value.trim().parse()?,
                "resolution" => preference.resolution = value.trim().parse()?,
                _ => {}
            }
        }

        Ok(preference)
    }
}
