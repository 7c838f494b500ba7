//! Type-safe screen routing.
//!
//! A [`ViewRoute`] describes how to reach one destination screen type. The
//! [`RouterType`] handle built from it resolves [`Router`]s either from a
//! declarative [`Transition`] or from a direct destination/source pair,
//! rejects destinations that do not support the route type in use, and wraps
//! every perform and remove in ordered lifecycle hooks.
//!
//! # Example
//! ```ignore
//! use rat_route::{RouterType, ViewRoute, ViewRouteConfig, routable};
//!
//! #[routable(declarative, programmatic)]
//! #[derive(Default)]
//! struct Detail;
//!
//! struct DetailRoute;
//!
//! impl ViewRoute for DetailRoute {
//!     type Destination = Detail;
//!     type Config = ViewRouteConfig;
//!
//!     fn default_config(&self) -> ViewRouteConfig {
//!         ViewRouteConfig::default()
//!     }
//! }
//!
//! let handle = RouterType::new(DetailRoute);
//! let router = handle.route_from_view(Arc::new(Detail), Some(list))?;
//! router.perform()?;
//! ```

extern crate self as rat_route;

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod router;
pub mod screen;
pub mod settings;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

// Re-export common types for convenience
pub use config::{Completion, RouteAction, RouteConfig, RouteOptions, RouteOutcome, Sender, Transition, ViewRouteConfig};
pub use lifecycle::{LifecycleEvent, LifecycleNotifier, ObserverId, RouteObserver, RouteState};
pub use registry::{Registry, RegistryBuilder, RouteRegistration};
pub use router::{PendingRoute, Router, RouterId, RouterInstance, RouterType, Trigger, ViewRoute};
pub use screen::{AsAny, Routable, RouteType, RouteTypes, Screen, ScreenId, ScreenRef, Upcast};
pub use settings::{FailurePolicy, RouterSettings};

pub use rat_route_macros::routable;
