//! # Shared Types Crate
//!
//! Identifiers, network definitions and the error envelope used by every
//! wallet subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Cross-subsystem identifiers are defined here.
//! - **Typed inside, enveloped outside**: Errors are typed within a process and
//!   travel as `ErrorEnvelope` across context boundaries.

pub mod entities;
pub mod envelope;
pub mod errors;

pub use entities::*;
pub use envelope::ErrorEnvelope;
pub use errors::*;
