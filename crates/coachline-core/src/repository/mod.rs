//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (coachline-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod identity;
pub mod message;
pub mod session;

pub use identity::IdentityDirectory;
pub use message::MessageStore;
pub use session::SessionStore;
