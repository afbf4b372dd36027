//! Domain layer for the consent arbiter.

pub mod admission;
pub mod badge;
pub mod entities;
pub mod errors;
pub mod queue;
pub mod registry;

pub use admission::check_shape;
pub use badge::badge_text;
pub use entities::*;
pub use errors::{ConsentError, ConsentResult};
pub use queue::ConsentQueue;
pub use registry::{PendingRegistry, RegistryStats};
