//! # Domain Layer
//!
//! Pure verification logic: signature classification, key parsing, key
//! admissibility and per-family signature checks. No filesystem access.

pub mod admission;
pub mod detect;
pub mod entities;
pub mod errors;
pub mod gpg;
pub mod ssh;

pub use admission::*;
pub use detect::*;
pub use entities::*;
pub use errors::*;
