//! # proconnect-shared
//!
//! Domain vocabulary shared by the store and client crates: typed ids,
//! roles, the stored record shapes, and the lenient field readers used to
//! normalize records written by older app versions.

pub mod clock;
pub mod constants;
pub mod error;
pub mod fields;
pub mod models;
pub mod types;

pub use error::ParseError;
pub use models::*;
pub use types::*;
