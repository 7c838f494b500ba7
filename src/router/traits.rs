//! Route definitions.
//!
//! A [`ViewRoute`] describes how to reach one destination type: its default
//! configuration, how to prepare the destination, the engine work for
//! performing and removing, and typed lifecycle hooks. Handles keep routes
//! behind the object-safe [`ErasedRoute`] so that widened handles share them.

use std::any::TypeId;

use snafu::prelude::*;

use crate::config::{RouteConfig, Transition};
use crate::error::{ConfigMismatchSnafu, DestinationMismatchSnafu, Result, UnsupportedRouteTypeSnafu};
use crate::lifecycle::LifecycleEvent;
use crate::router::RouterInstance;
use crate::screen::{self, Routable, RouteType, RouteTypes, ScreenRef, short_type_name};

/// Definition of how one destination type is routed to.
///
/// Only `default_config` is required. The remaining methods are hooks with
/// empty defaults, overridden the way a router subclass would.
pub trait ViewRoute: Send + Sync + 'static {
    type Destination: Routable;
    type Config: RouteConfig;

    fn default_config(&self) -> Self::Config;

    /// Adjust the configuration for a declarative transition. The options
    /// already carry the transition when this runs.
    fn configure_transition(&self, config: &mut Self::Config, transition: &Transition) {
        let _ = (config, transition);
    }

    /// Inject dependencies into the destination once the router is bound.
    fn prepare_destination(&self, destination: &Self::Destination, config: &Self::Config) {
        let _ = (destination, config);
    }

    /// Make the destination reachable. Only called for programmatic routes;
    /// a declarative transition is already underway when its router is bound.
    fn perform(
        &self,
        destination: &Self::Destination,
        source: Option<&ScreenRef>,
        config: &Self::Config,
    ) -> Result<()> {
        let _ = (destination, source, config);
        Ok(())
    }

    /// Detach the destination.
    fn remove(
        &self,
        destination: &Self::Destination,
        source: Option<&ScreenRef>,
        config: &Self::Config,
    ) -> Result<()> {
        let _ = (destination, source, config);
        Ok(())
    }

    fn will_perform_route(&self, router: Option<&RouterInstance>, destination: &Self::Destination, source: Option<&ScreenRef>) {
        let _ = (router, destination, source);
    }

    fn did_perform_route(&self, router: Option<&RouterInstance>, destination: &Self::Destination, source: Option<&ScreenRef>) {
        let _ = (router, destination, source);
    }

    fn will_remove_route(&self, router: Option<&RouterInstance>, destination: &Self::Destination, source: Option<&ScreenRef>) {
        let _ = (router, destination, source);
    }

    fn did_remove_route(&self, router: Option<&RouterInstance>, destination: &Self::Destination, source: Option<&ScreenRef>) {
        let _ = (router, destination, source);
    }
}

/// Object-safe view of a [`ViewRoute`].
pub(crate) trait ErasedRoute: Send + Sync {
    fn route_name(&self) -> &'static str;
    fn destination_name(&self) -> &'static str;
    fn destination_type(&self) -> TypeId;
    fn route_types(&self) -> RouteTypes;

    /// Check the capability of the route's destination type, then the type of
    /// the given destination instance.
    fn validate(&self, destination: &ScreenRef, route_type: RouteType) -> Result<()>;

    fn hook(
        &self,
        event: LifecycleEvent,
        router: Option<&RouterInstance>,
        destination: &ScreenRef,
        source: Option<&ScreenRef>,
    );

    fn perform(&self, router: &RouterInstance) -> Result<()>;
    fn remove(&self, router: &RouterInstance) -> Result<()>;
}

pub(crate) struct RouteAdapter<R>(pub(crate) R);

impl<R: ViewRoute> RouteAdapter<R> {
    fn typed<'a>(&self, router: &'a RouterInstance) -> Result<(&'a R::Destination, &'a R::Config)> {
        let destination = screen::downcast_ref::<R::Destination>(router.destination()).context(
            DestinationMismatchSnafu {
                route: self.route_name(),
                expected: self.destination_name(),
                actual: router.destination().title(),
            },
        )?;
        let config = (**router.config())
            .as_any()
            .downcast_ref::<R::Config>()
            .context(ConfigMismatchSnafu {
                route: self.route_name(),
                expected: short_type_name(std::any::type_name::<R::Config>()),
            })?;
        Ok((destination, config))
    }
}

impl<R: ViewRoute> ErasedRoute for RouteAdapter<R> {
    fn route_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<R>())
    }

    fn destination_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<R::Destination>())
    }

    fn destination_type(&self) -> TypeId {
        TypeId::of::<R::Destination>()
    }

    fn route_types(&self) -> RouteTypes {
        R::Destination::ROUTE_TYPES
    }

    fn validate(&self, destination: &ScreenRef, route_type: RouteType) -> Result<()> {
        ensure!(
            R::Destination::supports(route_type),
            UnsupportedRouteTypeSnafu {
                destination: self.destination_name(),
                route_type,
                supported: R::Destination::ROUTE_TYPES,
            }
        );
        ensure!(
            screen::downcast_ref::<R::Destination>(destination).is_some(),
            DestinationMismatchSnafu {
                route: self.route_name(),
                expected: self.destination_name(),
                actual: destination.title(),
            }
        );
        Ok(())
    }

    fn hook(
        &self,
        event: LifecycleEvent,
        router: Option<&RouterInstance>,
        destination: &ScreenRef,
        source: Option<&ScreenRef>,
    ) {
        let Some(typed) = screen::downcast_ref::<R::Destination>(destination) else {
            tracing::warn!(
                %event,
                route = self.route_name(),
                destination = %destination.title(),
                "Skipping route hook for a destination of another type"
            );
            return;
        };
        match event {
            LifecycleEvent::WillPerform => self.0.will_perform_route(router, typed, source),
            LifecycleEvent::DidPerform => self.0.did_perform_route(router, typed, source),
            LifecycleEvent::WillRemove => self.0.will_remove_route(router, typed, source),
            LifecycleEvent::DidRemove => self.0.did_remove_route(router, typed, source),
        }
    }

    fn perform(&self, router: &RouterInstance) -> Result<()> {
        let (destination, config) = self.typed(router)?;
        self.0.perform(destination, router.source(), config)
    }

    fn remove(&self, router: &RouterInstance) -> Result<()> {
        let (destination, config) = self.typed(router)?;
        self.0.remove(destination, router.source(), config)
    }
}
