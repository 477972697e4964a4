//! Core library for boot measurement-log parsing, register replay,
//! firmware-variable reading, baseline storage, policy evaluation, and
//! baseline diffing.

pub mod baseline;
pub mod differ;
pub mod error;
pub mod policy;
pub mod replay;
pub mod sbom;
pub mod tcg;
pub mod variables;

pub use error::{AttestError, Result};
