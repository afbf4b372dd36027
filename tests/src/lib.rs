//! # Wallet Test Suite
//!
//! Cross-crate tests for the consent flow.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs        # Site ↔ IPC handler ↔ consent service ↔ approver
//!     └── e2e_runtime.rs  # Host lines through the wallet runtime bridge
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p wallet-tests
//! cargo test -p wallet-tests integration::flows
//! ```

pub mod integration;
