//! The router type handle.
//!
//! [`RouterType<D, C>`] is the front through which routers are resolved and
//! lifecycle hooks are dispatched. Both resolution paths (a declarative
//! transition, or a direct destination/source pair) validate the route type,
//! then feed one [`Binding`] into the same bind step, so routers come out in
//! the same shape regardless of how they were triggered.
//!
//! The handle is covariant in `D` and `C`: [`RouterType::upcast`] turns a
//! handle for a concrete screen and config into one for any interfaces they
//! implement, composing the conversion into the bind step.

use std::sync::Arc;

use snafu::prelude::*;

use crate::config::{RouteAction, RouteConfig, RouteOptions, Sender, Transition};
use crate::error::{DestinationMismatchSnafu, Result, RouterMismatchSnafu};
use crate::lifecycle::{LifecycleEvent, LifecycleNotifier, ObserverId, RouteObserver};
use crate::router::instance::{Binding, Router, RouterInstance, Trigger};
use crate::router::traits::{ErasedRoute, RouteAdapter, ViewRoute};
use crate::screen::{self, Routable, RouteType, RouteTypes, Screen, ScreenRef, Upcast};

type BindFn<D, C> = dyn Fn(Binding) -> Result<Router<D, C>> + Send + Sync;

/// Handle resolving routers for one route definition.
///
/// # Example
/// ```ignore
/// let handle = RouterType::new(DetailRoute);
///
/// // Declarative: the host UI already built the destination.
/// let router = handle.route_from_transition("pushDetail", None, detail, list)?;
/// let pending = router.begin()?;   // will-perform
/// pending.complete()?;             // did-perform, once the transition ends
///
/// // Programmatic: the engine presents the destination.
/// let router = handle.route_from_view(detail, Some(list))?;
/// router.perform()?;
/// router.remove()?;
/// ```
pub struct RouterType<D: ?Sized, C: ?Sized> {
    route: Arc<dyn ErasedRoute>,
    notifier: Arc<LifecycleNotifier>,
    bind: Arc<BindFn<D, C>>,
}

impl<D: Routable, C: RouteConfig> RouterType<D, C> {
    /// Create a handle with its own notifier and settings from the environment.
    pub fn new<R>(route: R) -> Self
    where
        R: ViewRoute<Destination = D, Config = C>,
    {
        Self::with_notifier(route, Arc::new(LifecycleNotifier::new(crate::RouterSettings::from_env())))
    }

    /// Create a handle sharing `notifier` (observers and destination state)
    /// with other handles.
    pub fn with_notifier<R>(route: R, notifier: Arc<LifecycleNotifier>) -> Self
    where
        R: ViewRoute<Destination = D, Config = C>,
    {
        let adapter = Arc::new(RouteAdapter(route));
        let erased: Arc<dyn ErasedRoute> = adapter.clone();

        let bind_route = Arc::clone(&erased);
        let bind_notifier = Arc::clone(&notifier);
        let bind = move |binding: Binding| -> Result<Router<D, C>> {
            let Binding {
                destination: target,
                source,
                trigger,
                options,
            } = binding;

            let destination = screen::downcast_arc::<D>(&target).context(DestinationMismatchSnafu {
                route: bind_route.route_name(),
                expected: bind_route.destination_name(),
                actual: target.title(),
            })?;

            let mut config = adapter.0.default_config();
            if let Some(options) = options {
                *config.options_mut() = options;
            }
            config.options_mut().route_type = trigger.route_type();
            if let Trigger::Transition(transition) = &trigger {
                config.options_mut().transition = Some(transition.clone());
                adapter.0.configure_transition(&mut config, transition);
            }
            adapter.0.prepare_destination(&destination, &config);

            let config = Arc::new(config);
            let erased_config: Arc<dyn RouteConfig> = config.clone();
            let instance = Arc::new(RouterInstance::new(
                target,
                source,
                erased_config,
                trigger,
                Arc::clone(&bind_route),
                Arc::clone(&bind_notifier),
            ));
            Ok(Router::new(instance, destination, config))
        };

        Self {
            route: erased,
            notifier,
            bind: Arc::new(bind),
        }
    }
}

impl<D: ?Sized + 'static, C: ?Sized + 'static> RouterType<D, C> {
    /// Resolve a router for a declarative transition that already built the
    /// destination. No presentation happens here.
    pub fn route_from_transition(
        &self,
        identifier: &str,
        sender: Option<Sender>,
        destination: ScreenRef,
        source: ScreenRef,
    ) -> Result<Router<D, C>> {
        let transition = Transition::new(identifier, sender)
            .map_err(|err| self.notifier.misconfigured(RouteAction::Resolve, err))?;
        self.resolve(Binding {
            destination,
            source: Some(source),
            trigger: Trigger::Transition(transition),
            options: None,
        })
    }

    /// Resolve a router for a destination the caller routes to directly.
    pub fn route_from_view(&self, destination: ScreenRef, source: Option<ScreenRef>) -> Result<Router<D, C>> {
        self.resolve(Binding {
            destination,
            source,
            trigger: Trigger::Programmatic,
            options: None,
        })
    }

    /// Like [`route_from_view`](Self::route_from_view), replacing the route's
    /// default options with `options`.
    pub fn route_from_view_with(
        &self,
        destination: ScreenRef,
        source: Option<ScreenRef>,
        options: RouteOptions,
    ) -> Result<Router<D, C>> {
        self.resolve(Binding {
            destination,
            source,
            trigger: Trigger::Programmatic,
            options: Some(options),
        })
    }

    fn resolve(&self, binding: Binding) -> Result<Router<D, C>> {
        let route_type = binding.trigger.route_type();
        self.route
            .validate(&binding.destination, route_type)
            .map_err(|err| self.notifier.misconfigured(RouteAction::Resolve, err))?;

        let router = (self.bind)(binding)?;
        tracing::debug!(
            router = %router.id(),
            route = self.route.route_name(),
            %route_type,
            "Resolved router"
        );
        Ok(router)
    }

    pub fn supported_route_types(&self) -> RouteTypes {
        self.route.route_types()
    }

    pub fn supports(&self, route_type: RouteType) -> bool {
        self.supported_route_types().contains(route_type.flag())
    }

    pub fn supports_declarative_routing(&self) -> bool {
        self.supports(RouteType::Declarative)
    }

    pub fn supports_programmatic_routing(&self) -> bool {
        self.supports(RouteType::Programmatic)
    }

    pub fn will_perform(
        &self,
        router: Option<&RouterInstance>,
        destination: &ScreenRef,
        source: Option<&ScreenRef>,
    ) -> Result<()> {
        self.notify(LifecycleEvent::WillPerform, router, destination, source)
    }

    pub fn did_perform(
        &self,
        router: Option<&RouterInstance>,
        destination: &ScreenRef,
        source: Option<&ScreenRef>,
    ) -> Result<()> {
        self.notify(LifecycleEvent::DidPerform, router, destination, source)
    }

    pub fn will_remove(
        &self,
        router: Option<&RouterInstance>,
        destination: &ScreenRef,
        source: Option<&ScreenRef>,
    ) -> Result<()> {
        self.notify(LifecycleEvent::WillRemove, router, destination, source)
    }

    pub fn did_remove(
        &self,
        router: Option<&RouterInstance>,
        destination: &ScreenRef,
        source: Option<&ScreenRef>,
    ) -> Result<()> {
        self.notify(LifecycleEvent::DidRemove, router, destination, source)
    }

    /// Report a dismissal the host UI performed on its own, e.g. a user swipe.
    /// Both removal hooks fire with no router.
    pub fn remove_externally(&self, destination: &ScreenRef, source: Option<&ScreenRef>) -> Result<()> {
        self.will_remove(None, destination, source)?;
        self.did_remove(None, destination, source)
    }

    fn notify(
        &self,
        event: LifecycleEvent,
        router: Option<&RouterInstance>,
        destination: &ScreenRef,
        source: Option<&ScreenRef>,
    ) -> Result<()> {
        if let Some(router) = router {
            if !router.is_bound_to(destination) {
                let err = RouterMismatchSnafu {
                    router: router.id(),
                    destination: destination.title(),
                }
                .build();
                return Err(self.notifier.misconfigured(RouteAction::Resolve, err));
            }
        }
        if screen::type_id_of(destination) != self.route.destination_type() {
            let err = DestinationMismatchSnafu {
                route: self.route.route_name(),
                expected: self.route.destination_name(),
                actual: destination.title(),
            }
            .build();
            return Err(self.notifier.misconfigured(RouteAction::for_event(event), err));
        }
        self.notifier.dispatch(event, &*self.route, router, destination, source)
    }

    pub fn notifier(&self) -> &Arc<LifecycleNotifier> {
        &self.notifier
    }

    pub fn subscribe(&self, observer: Arc<dyn RouteObserver>) -> Result<ObserverId> {
        self.notifier.subscribe(observer)
    }

    pub fn route_name(&self) -> &'static str {
        self.route.route_name()
    }

    pub fn destination_name(&self) -> &'static str {
        self.route.destination_name()
    }

    /// Widen the handle: routers it resolves expose `D2` and `C2`.
    pub fn upcast<D2, C2>(self) -> RouterType<D2, C2>
    where
        D: Upcast<D2>,
        C: Upcast<C2>,
        D2: ?Sized + 'static,
        C2: ?Sized + 'static,
    {
        self.map(<D as Upcast<D2>>::upcast, <C as Upcast<C2>>::upcast)
    }

    pub(crate) fn map<D2, C2>(
        self,
        destination: fn(Arc<D>) -> Arc<D2>,
        config: fn(Arc<C>) -> Arc<C2>,
    ) -> RouterType<D2, C2>
    where
        D2: ?Sized + 'static,
        C2: ?Sized + 'static,
    {
        let bind = self.bind;
        RouterType {
            route: self.route,
            notifier: self.notifier,
            bind: Arc::new(move |binding| bind(binding).map(|router| router.map(destination, config))),
        }
    }
}

/// Widen a concrete destination to a plain screen.
pub(crate) fn erase_screen<D: Screen>(destination: Arc<D>) -> Arc<dyn Screen> {
    destination
}

/// Widen a concrete configuration to the base configuration trait.
pub(crate) fn erase_config<C: RouteConfig>(config: Arc<C>) -> Arc<dyn RouteConfig> {
    config
}

impl<D: Routable, C: RouteConfig> RouterType<D, C> {
    /// Handle typed only by the base screen and configuration traits.
    pub fn erased(self) -> RouterType<dyn Screen, dyn RouteConfig> {
        self.map(erase_screen::<D>, erase_config::<C>)
    }
}

impl<D: ?Sized, C: ?Sized> Clone for RouterType<D, C> {
    fn clone(&self) -> Self {
        Self {
            route: Arc::clone(&self.route),
            notifier: Arc::clone(&self.notifier),
            bind: Arc::clone(&self.bind),
        }
    }
}

impl<D: ?Sized, C: ?Sized> std::fmt::Debug for RouterType<D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterType")
            .field("route", &self.route.route_name())
            .field("destination", &self.route.destination_name())
            .field("route_types", &self.route.route_types())
            .finish_non_exhaustive()
    }
}
