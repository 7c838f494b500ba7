//! Router module.
//!
//! Provides route definitions ([`ViewRoute`]), the covariant [`RouterType`]
//! handle that resolves routers, and the [`Router`] instances it produces.

mod handle;
mod instance;
mod traits;

pub use handle::RouterType;
pub use instance::{PendingRoute, Router, RouterId, RouterInstance, Trigger};
pub use traits::ViewRoute;

pub(crate) use handle::{erase_config, erase_screen};
pub(crate) use traits::ErasedRoute;
