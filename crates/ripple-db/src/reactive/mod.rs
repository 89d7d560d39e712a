//! Change notification — per-DAO listener registry and event types.
//!
//! # Modules
//!
//! - [`event`] — [`DaoEvent`] enum.
//! - [`registry`] — [`ListenerRegistry`], [`Subscription`], [`Detachable`].

pub mod event;
pub mod registry;

pub use event::DaoEvent;
pub use registry::{Detachable, ListenerRegistry, Subscription};
