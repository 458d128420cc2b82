//! Password hashing built around a bcrypt-family transform.
//! The service is stateless: every call generates its own salt, validates its
//! own output and keeps nothing between calls, so a single instance can be
//! shared freely across threads.

use std::fmt;
use std::ops::RangeInclusive;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::config::HasherConfig;
use crate::crypto::backend::{Bcrypt, CryptBackend};
use crate::crypto::compare::constant_time_eq;
use crate::crypto::salt;
use crate::crypto::secret::{IntoSecret, Secret};

/// Accepted work factors.
pub const COST_RANGE: RangeInclusive<u32> = 4..=31;
pub const DEFAULT_COST: u32 = 10;
/// Exact byte length of every record the service produces.
pub const HASH_LEN: usize = 60;
/// Version marker written by, and recognized by, the service.
pub const MARKER: &str = "$2y$";

/// Anything at or below this length is a legacy `crypt` fallback or an error
/// token, never a real adaptive hash.
const DEGENERATE_LEN: usize = 13;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("cost factor {0} outside the accepted range 4..=31")]
    InvalidCost(u32),
    #[error("bcrypt transform is not available in this environment")]
    PrimitiveUnavailable,
    #[error("secret of type {0} cannot be used as a password")]
    InvalidSecretType(&'static str),
    #[error("transform returned a malformed hash ({len} bytes, expected 60)")]
    MalformedHashResult { len: usize },
    #[error("secure random source failed: {0}")]
    Entropy(String),
}

fn validate_cost(cost: u32) -> Result<u32, HashError> {
    if COST_RANGE.contains(&cost) {
        Ok(cost)
    } else {
        Err(HashError::InvalidCost(cost))
    }
}

/// A complete `$2y$CC$<salt><digest>` record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HashRecord(String);

impl HashRecord {
    /// Accepts an externally supplied string only if it has the exact shape
    /// the service produces.
    pub fn parse(value: &str) -> Option<Self> {
        let bytes = value.as_bytes();
        let well_formed = bytes.len() == HASH_LEN
            && value.starts_with(MARKER)
            && bytes[4].is_ascii_digit()
            && bytes[5].is_ascii_digit()
            && bytes[6] == b'$'
            && value[7..]
                .bytes()
                .all(|b| b == b'.' || b == b'/' || b.is_ascii_alphanumeric());
        well_formed.then(|| Self(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Work factor embedded after the marker.
    pub fn cost(&self) -> u32 {
        embedded_cost(&self.0)
    }

    /// The 22 encoded salt characters.
    pub fn salt(&self) -> &str {
        &self.0[7..7 + salt::ENCODED_SALT_LEN]
    }

    /// The 31 digest characters.
    pub fn digest(&self) -> &str {
        &self.0[7 + salt::ENCODED_SALT_LEN..]
    }
}

impl fmt::Display for HashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HashRecord {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<HashRecord> for String {
    fn from(record: HashRecord) -> Self {
        record.0
    }
}

/// Reads the two cost digits after the marker the way an integer cast would:
/// leading digits only, nothing parseable reads as zero.
fn embedded_cost(hash: &str) -> u32 {
    hash.as_bytes()
        .get(4..6)
        .unwrap_or_default()
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}

/// Outcome of [`HashService::verify_and_upgrade`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Mismatch,
    Match,
    /// The secret matched a record with an outdated cost; store the new one.
    Rehashed(HashRecord),
}

impl Verification {
    pub fn is_match(&self) -> bool {
        !matches!(self, Verification::Mismatch)
    }
}

/// Produces, verifies and grades bcrypt hash records.
#[derive(Debug, Clone)]
pub struct HashService<B = Bcrypt> {
    backend: B,
    default_cost: u32,
}

impl HashService<Bcrypt> {
    pub fn new() -> Self {
        Self::with_backend(Bcrypt)
    }

    /// Builds a bcrypt-backed service using the configured default cost.
    pub fn from_config(config: &HasherConfig) -> Result<Self, HashError> {
        Self::new().with_default_cost(config.cost)
    }
}

impl Default for HashService<Bcrypt> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: CryptBackend> HashService<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            default_cost: DEFAULT_COST,
        }
    }

    /// Replaces the cost used by [`make_default`](Self::make_default) and
    /// [`weak_default`](Self::weak_default).
    pub fn with_default_cost(mut self, cost: u32) -> Result<Self, HashError> {
        self.default_cost = validate_cost(cost)?;
        Ok(self)
    }

    pub fn default_cost(&self) -> u32 {
        self.default_cost
    }

    fn ensure_available(&self) -> Result<(), HashError> {
        if self.backend.is_available() {
            Ok(())
        } else {
            error!("bcrypt transform unavailable");
            Err(HashError::PrimitiveUnavailable)
        }
    }

    /// Hashes `secret` with a fresh random salt at the given cost.
    pub fn make(&self, secret: impl IntoSecret, cost: u32) -> Result<HashRecord, HashError> {
        let cost = validate_cost(cost)?;
        self.ensure_available()?;
        let secret: Secret = secret.into_secret()?;

        let raw_salt = salt::generate().map_err(|e| HashError::Entropy(format!("{e}")))?;
        let settings = format!("{MARKER}{cost:02}${}", salt::encode(&raw_salt));

        let Some(hash) = self.backend.crypt(secret.as_bytes(), &settings) else {
            warn!(cost, "transform produced no hash");
            return Err(HashError::MalformedHashResult { len: 0 });
        };
        if hash.len() != HASH_LEN {
            warn!(cost, len = hash.len(), "transform produced a malformed hash");
            return Err(HashError::MalformedHashResult { len: hash.len() });
        }

        debug!(cost, "created hash record");
        Ok(HashRecord(hash))
    }

    /// [`make`](Self::make) at the service's default cost.
    pub fn make_default(&self, secret: impl IntoSecret) -> Result<HashRecord, HashError> {
        self.make(secret, self.default_cost)
    }

    /// Checks `secret` against a stored hash. Wrong secrets and foreign or
    /// garbage hashes yield `Ok(false)`; only environment problems are errors.
    pub fn check(&self, secret: impl IntoSecret, hash: impl AsRef<str>) -> Result<bool, HashError> {
        self.ensure_available()?;
        let secret: Secret = secret.into_secret()?;
        let hash = hash.as_ref();

        let Some(recomputed) = self.backend.crypt(secret.as_bytes(), hash) else {
            trace!("stored hash not understood by transform");
            return Ok(false);
        };
        if recomputed.len() != hash.len() || recomputed.len() <= DEGENERATE_LEN {
            trace!(len = recomputed.len(), "recomputed hash length mismatch");
            return Ok(false);
        }

        Ok(constant_time_eq(recomputed.as_bytes(), hash.as_bytes()))
    }

    /// Whether a stored hash was computed at a cost other than `cost`.
    ///
    /// Only `$2y$` records of exactly 60 bytes are graded. Anything else
    /// reports `false`, so a corrupt record looks the same as a current one.
    pub fn weak(&self, hash: impl AsRef<str>, cost: u32) -> Result<bool, HashError> {
        let cost = validate_cost(cost)?;
        let hash = hash.as_ref();

        if hash.len() == HASH_LEN && hash.as_bytes().starts_with(MARKER.as_bytes()) {
            Ok(embedded_cost(hash) != cost)
        } else {
            Ok(false)
        }
    }

    /// [`weak`](Self::weak) against the service's default cost.
    pub fn weak_default(&self, hash: impl AsRef<str>) -> Result<bool, HashError> {
        self.weak(hash, self.default_cost)
    }

    /// Verifies a login attempt and regenerates the record when it was
    /// hashed at an outdated cost.
    pub fn verify_and_upgrade(
        &self,
        secret: impl IntoSecret,
        hash: impl AsRef<str>,
        cost: u32,
    ) -> Result<Verification, HashError> {
        let secret: Secret = secret.into_secret()?;
        let hash = hash.as_ref();

        if !self.check(&secret, hash)? {
            return Ok(Verification::Mismatch);
        }
        if !self.weak(hash, cost)? {
            return Ok(Verification::Match);
        }

        debug!(from = embedded_cost(hash), to = cost, "rehashing outdated record");
        self.make(&secret, cost).map(Verification::Rehashed)
    }
}
