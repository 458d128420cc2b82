//! Central cryptography module. The hash service is the public entry point;
//! the remaining submodules each cover a single step of it so the security
//! model stays simple and auditable.

pub mod backend;
pub mod compare;
pub mod hasher;
pub mod salt;
pub mod secret;
