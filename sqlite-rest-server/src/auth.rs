//! Bearer token authentication
//!
//! Key material is re-read from disk whenever its modification time changes,
//! so keys can be rotated without restarting the service.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use sqlite_rest_common::config::AuthConfig;
use sqlite_rest_common::error::{Error, Result};

/// Authorization header name
pub const HEADER_AUTHORIZATION: &str = "authorization";

const BEARER_PREFIX: &str = "bearer";

/// File contents cached against the file's modification time
pub struct KeyFile {
    path: PathBuf,
    cached: RwLock<Option<(SystemTime, Arc<Vec<u8>>)>>,
}

impl KeyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents; the file is only read again after its mtime changes
    pub fn read(&self) -> Result<Arc<Vec<u8>>> {
        let modified = fs::metadata(&self.path)?.modified()?;

        if let Some((cached_at, content)) = self.cached.read().as_ref() {
            if *cached_at == modified {
                return Ok(content.clone());
            }
        }

        let mut cached = self.cached.write();
        // another reader may have refreshed while we waited for the lock
        if let Some((cached_at, content)) = cached.as_ref() {
            if *cached_at == modified {
                return Ok(content.clone());
            }
        }

        let content = Arc::new(fs::read(&self.path)?);
        debug!(path = %self.path.display(), "reloaded key file");
        *cached = Some((modified, content.clone()));
        Ok(content)
    }
}

enum KeySource {
    RsaPublicKey(KeyFile),
    SharedSecret(KeyFile),
}

impl KeySource {
    fn algorithms(&self) -> Vec<Algorithm> {
        match self {
            Self::RsaPublicKey(_) => vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512],
            Self::SharedSecret(_) => vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512],
        }
    }

    /// Key load failures reject the request rather than fail the server
    fn decoding_key(&self) -> Result<DecodingKey> {
        let unauthorized = |e: Error| Error::Unauthorized(e.to_string());
        match self {
            Self::RsaPublicKey(file) => {
                let pem = file.read().map_err(unauthorized)?;
                DecodingKey::from_rsa_pem(&pem).map_err(|e| Error::Unauthorized(e.to_string()))
            }
            Self::SharedSecret(file) => {
                let secret = file.read().map_err(unauthorized)?;
                Ok(DecodingKey::from_secret(&secret))
            }
        }
    }
}

/// Validates `Authorization: Bearer <jwt>` headers
pub struct Authenticator {
    source: Option<KeySource>,
}

impl Authenticator {
    /// Authenticator that accepts every request
    pub fn disabled() -> Self {
        Self { source: None }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        config.validate()?;

        if config.disabled {
            return Ok(Self::disabled());
        }

        let source = match (&config.rsa_public_key_file, &config.token_file) {
            (Some(path), _) => KeySource::RsaPublicKey(KeyFile::new(path)),
            (None, Some(path)) => KeySource::SharedSecret(KeyFile::new(path)),
            (None, None) => {
                return Err(Error::Config("no auth key source configured".to_string()))
            }
        };

        Ok(Self {
            source: Some(source),
        })
    }

    pub fn is_disabled(&self) -> bool {
        self.source.is_none()
    }

    /// Check the raw `Authorization` header value
    pub fn authenticate(&self, header: Option<&str>) -> Result<()> {
        let Some(source) = &self.source else {
            return Ok(());
        };

        let header = header
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Unauthorized("missing auth header".to_string()))?;
        let token = extract_bearer(header)?;

        let mut validation = Validation::new(source.algorithms()[0]);
        validation.algorithms = source.algorithms();
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        decode::<Value>(token, &source.decoding_key()?, &validation)
            .map_err(|e| Error::Unauthorized(e.to_string()))?;

        Ok(())
    }
}

fn extract_bearer(header: &str) -> Result<&str> {
    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case(BEARER_PREFIX) => Ok(token),
        _ => Err(Error::Unauthorized("invalid auth header".to_string())),
    }
}
