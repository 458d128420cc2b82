//! Password hashing for credential stores. Secrets are hashed with bcrypt
//! behind a small, stateless service so the salt handling, output checks and
//! comparison logic stay readable in-repo while the transform itself comes
//! from a vetted implementation.

pub mod config;
pub mod crypto;

pub use crypto::hasher::{HashError, HashRecord, HashService, Verification};
pub use crypto::secret::{IntoSecret, Secret};
