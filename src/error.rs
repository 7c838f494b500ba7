use snafu::prelude::*;

use crate::config::RouteAction;
use crate::lifecycle::{LifecycleEvent, RouteState};
use crate::router::RouterId;
use crate::screen::{RouteType, RouteTypes};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "{destination} does not support {route_type} routing (supported: {supported:?})"
    ))]
    UnsupportedRouteType {
        destination: String,
        route_type: RouteType,
        supported: RouteTypes,
    },

    #[snafu(display("Route {route} expects a {expected} destination, got {actual}"))]
    DestinationMismatch {
        route: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[snafu(display("Route {route} expects a {expected} configuration"))]
    ConfigMismatch {
        route: &'static str,
        expected: &'static str,
    },

    #[snafu(display("Transition identifier must not be empty"))]
    EmptyTransitionIdentifier,

    #[snafu(display("Illegal {event} while {destination} is {state}"))]
    IllegalTransition {
        destination: String,
        state: RouteState,
        event: LifecycleEvent,
    },

    #[snafu(display("Router {router} is not bound to {destination}"))]
    RouterMismatch { router: RouterId, destination: String },

    #[snafu(display("{kind} {key} was already registered with route {existing}"))]
    DuplicateRegistration {
        kind: &'static str,
        key: String,
        existing: &'static str,
    },

    #[snafu(display("No route registered for {kind} {key}"))]
    RouteNotFound { kind: &'static str, key: String },

    #[snafu(display("A global registry is already installed"))]
    RegistryInstalled,

    #[snafu(display("Route engine failed to {action}: {message}"))]
    EngineFailure { action: RouteAction, message: String },

    #[snafu(display("Failed to lock mutex: poisoned"))]
    LockPoisoned,
}

impl Error {
    /// Build the error a route's engine returns when it cannot perform or remove.
    pub fn engine(action: RouteAction, message: impl Into<String>) -> Self {
        Error::EngineFailure {
            action,
            message: message.into(),
        }
    }

    /// Whether this error signals a misconfiguration rather than a runtime failure.
    pub fn is_misconfiguration(&self) -> bool {
        !matches!(self, Error::EngineFailure { .. } | Error::LockPoisoned)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
