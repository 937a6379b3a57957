//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API the rule engine calls
//! - **Outbound (Driven)**: Key storage and time this subsystem needs

pub mod inbound;
pub mod outbound;
