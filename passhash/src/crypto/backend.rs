//! The adaptive-hash transform the service delegates to.
//!
//! Backends follow the shape of the classic `crypt(3)` call: a secret plus a
//! settings string in, a finished hash string out. The settings are either a
//! bare `$2y$CC$<salt>` prefix or a complete stored record, in which case the
//! backend pulls the cost and salt back out of it.

use bcrypt::Version;

use crate::crypto::salt;

/// A bcrypt-family transform.
pub trait CryptBackend: Send + Sync {
    /// Runs the transform. `None` means no hash could be produced for these
    /// settings, which callers treat like any other non-matching output.
    fn crypt(&self, secret: &[u8], settings: &str) -> Option<String>;

    /// Whether the transform can run in this environment at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// Backend built on the `bcrypt` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bcrypt;

/// Cost and salt pulled out of a settings string.
#[derive(Debug, PartialEq, Eq)]
struct Settings {
    version: char,
    cost: u32,
    salt: [u8; salt::SALT_BYTES],
}

fn parse_settings(settings: &str) -> Option<Settings> {
    let bytes = settings.as_bytes();
    // "$2y$10$" + 22 salt characters
    if bytes.len() < 7 + salt::ENCODED_SALT_LEN {
        return None;
    }
    if &bytes[..2] != b"$2" || bytes[3] != b'$' || bytes[6] != b'$' {
        return None;
    }
    // `$2x$` marks crypt_blowfish's sign-extension bug, which bcrypt does not
    // reproduce, so those records are refused rather than misverified.
    let version = match bytes[2] {
        v @ (b'a' | b'b' | b'y') => char::from(v),
        _ => return None,
    };
    if !bytes[4].is_ascii_digit() || !bytes[5].is_ascii_digit() {
        return None;
    }
    let cost = u32::from(bytes[4] - b'0') * 10 + u32::from(bytes[5] - b'0');
    let salt = salt::decode(&settings[7..])?;
    Some(Settings { version, cost, salt })
}

fn version_for(marker: char) -> Version {
    match marker {
        'a' => Version::TwoA,
        'b' => Version::TwoB,
        _ => Version::TwoY,
    }
}

impl CryptBackend for Bcrypt {
    fn crypt(&self, secret: &[u8], settings: &str) -> Option<String> {
        let parsed = parse_settings(settings)?;
        let parts = bcrypt::hash_with_salt(secret, parsed.cost, parsed.salt).ok()?;
        Some(parts.format_for_version(version_for(parsed.version)))
    }
}
