//! # Consent Arbiter
//!
//! Accepts sensitive operation requests (signing, permission grants, network
//! changes) from untrusted callers, keeps them in a durable ordered queue,
//! brokers one human decision per request through the approval surface, and
//! settles each request exactly once, across restarts included.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Ids strictly increase, never reused (restart included) | `domain/queue.rs` - `restore()`, `allocate_id()` |
//! | Same-type requests stay contiguous, in insertion order | `domain/queue.rs` - `insertion_index()` |
//! | At-most-once settlement per id | `domain/registry.rs` - `settle()` removes before sending |
//! | Nothing queued when admission or persistence fails | `service/arbiter.rs` - `enqueue()` |
//! | One decision in flight per id | `service/arbiter.rs` - `decide()` |
//!
//! ## Request Lifecycle
//!
//! ```text
//! requestConsent ──admit──→ [QUEUED] ──external──→ [AWAITING DECISION]
//!                              │                          │
//!                              │ internal          processRequest
//!                              ↓                          ↓
//!                        (caller decides) ──────→ [SETTLED] ← clearRequests
//! ```
//!
//! | Transition | Method | Effect |
//! |------------|--------|--------|
//! | Admit | `ConsentArbiter::enqueue()` | Id assigned, queue persisted, badge updated |
//! | Surface | `Presenter::open_approval_surface()` | External callers only; `UNLOCK` also gets a close watch |
//! | Deny | `ConsentArbiter::decide(id, false)` | Settled with `UserRejected` |
//! | Approve | `SideEffectDispatcher::execute()` | Outcome settled, request removed either way |
//! | Clear | `ConsentArbiter::clear()` | Matching requests rejected with `UserRejected` |
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `KeyValueStore` | Durable queue record |
//! | `WalletStore` | Signing capability, lock state |
//! | `ProviderRegistry` / `Provider` | Per-chain signing and broadcast |
//! | `Presenter` | Approval surface, notifications, badge |
//! | `SiteConnector` | Connected accounts per origin |
//! | `TokenRegistry` | Watched assets |
//! | `NetworkRegistry` | Added networks, active network |
//! | `TransactionWatcher` | Pending-transaction tracking |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - in-memory and JSON file collaborators              │
//! │  ipc/      - wire messages, sender authorization                │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - ConsentApi trait                           │
//! │  ports/outbound.rs - store, wallet, provider, presenter traits  │
//! │  service/          - arbiter, dispatcher, actor                 │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/entities.rs - ConsentRequest, ConsentPayload            │
//! │  domain/queue.rs    - ordering and id counter                   │
//! │  domain/registry.rs - completion handles                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ipc;
pub mod ports;
pub mod service;

pub use domain::{
    AccountRef, ConsentError, ConsentOutcome, ConsentPayload, ConsentRequest, ConsentResponse,
    ConsentResult, ConsentType, NewConsentRequest, RequestId, TransactionStatus,
};
pub use ports::{Collaborators, ConsentApi, ConsentReceipt};
pub use service::{ConsentConfig, ConsentHandle, ConsentService};
