//! Route configuration: how a route is performed.
//!
//! Every configuration exposes the shared [`RouteOptions`]; custom
//! configurations embed them next to route-specific parameters.

use std::any::Any;
use std::sync::Arc;

use crate::error::{EmptyTransitionIdentifierSnafu, Result};
use crate::screen::{AsAny, RouteType};

/// Context object handed along with a declarative transition.
pub type Sender = Arc<dyn Any + Send + Sync>;

/// Callback run when a perform or remove operation finishes.
pub type Completion = Arc<dyn Fn(RouteAction, RouteOutcome) + Send + Sync>;

/// Operation a completion or failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteAction {
    Resolve,
    Perform,
    Remove,
    Register,
    Lookup,
}

impl std::fmt::Display for RouteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RouteAction::Resolve => "resolve",
            RouteAction::Perform => "perform",
            RouteAction::Remove => "remove",
            RouteAction::Register => "register",
            RouteAction::Lookup => "lookup",
        };
        f.write_str(name)
    }
}

/// How an operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteOutcome {
    Completed,
    /// The pending route was dropped before it was completed.
    Interrupted,
    /// The route engine reported an error.
    Failed,
}

/// A named declarative transition plus the object that triggered it.
#[derive(Clone)]
pub struct Transition {
    identifier: String,
    sender: Option<Sender>,
}

impl Transition {
    pub fn new(identifier: impl Into<String>, sender: Option<Sender>) -> Result<Self> {
        let identifier = identifier.into();
        if identifier.is_empty() {
            return EmptyTransitionIdentifierSnafu.fail();
        }
        Ok(Self { identifier, sender })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn sender(&self) -> Option<&Sender> {
        self.sender.as_ref()
    }

    /// The sender as a concrete type, if there is one of that type.
    pub fn sender_as<T: Any>(&self) -> Option<&T> {
        self.sender.as_deref().and_then(|sender| sender.downcast_ref::<T>())
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("identifier", &self.identifier)
            .field("has_sender", &self.sender.is_some())
            .finish()
    }
}

/// Options shared by every route configuration.
#[derive(Clone)]
pub struct RouteOptions {
    /// Stamped by the resolving handle; callers cannot pick the wrong one.
    pub route_type: RouteType,
    pub animated: bool,
    /// Set when the route was resolved from a declarative transition.
    pub transition: Option<Transition>,
    completion: Option<Completion>,
}

impl RouteOptions {
    pub fn with_completion<F>(mut self, completion: F) -> Self
    where
        F: Fn(RouteAction, RouteOutcome) + Send + Sync + 'static,
    {
        self.completion = Some(Arc::new(completion));
        self
    }

    pub fn with_animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    pub(crate) fn complete(&self, action: RouteAction, outcome: RouteOutcome) {
        if let Some(completion) = &self.completion {
            completion(action, outcome);
        }
    }
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            route_type: RouteType::Programmatic,
            animated: true,
            transition: None,
            completion: None,
        }
    }
}

impl std::fmt::Debug for RouteOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteOptions")
            .field("route_type", &self.route_type)
            .field("animated", &self.animated)
            .field("transition", &self.transition)
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}

/// Parameter object for a route.
///
/// Bound configurations are shared behind an `Arc` and never mutated again.
pub trait RouteConfig: AsAny {
    fn options(&self) -> &RouteOptions;
    fn options_mut(&mut self) -> &mut RouteOptions;
}

/// Configuration for routes that need nothing beyond the shared options.
#[derive(Debug, Clone, Default)]
pub struct ViewRouteConfig {
    pub options: RouteOptions,
}

impl RouteConfig for ViewRouteConfig {
    fn options(&self) -> &RouteOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut RouteOptions {
        &mut self.options
    }
}

crate::impl_upcast!(ViewRouteConfig => dyn RouteConfig);
