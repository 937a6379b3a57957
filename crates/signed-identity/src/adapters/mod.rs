//! # Adapters Module
//!
//! Infrastructure adapters implementing the outbound ports: the filesystem
//! key store with its locked reader, and the system clock.

pub mod clock;
pub mod keystore;
pub mod lock;

pub use clock::SystemTimeSource;
pub use keystore::FileSystemKeyStore;
