//! Router instances: one route for one (destination, source) pair.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{RouteAction, RouteConfig, RouteOptions, RouteOutcome, Transition};
use crate::error::Result;
use crate::lifecycle::{LifecycleEvent, LifecycleNotifier, RouteState};
use crate::router::ErasedRoute;
use crate::screen::{RouteType, ScreenId, ScreenRef, Upcast};

/// Global counter for generating unique router IDs.
static NEXT_ROUTER_ID: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for a router instance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouterId(NonZeroU64);

impl RouterId {
    /// # Panics
    /// Panics if more than 2^64-1 routers are created.
    fn next() -> Self {
        let id = NEXT_ROUTER_ID.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(id).unwrap_or_else(|| {
            panic!("RouterId overflow: created more than 2^64-1 routers")
        }))
    }

    pub fn as_u64(&self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Debug for RouterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RouterId({})", self.0)
    }
}

impl std::fmt::Display for RouterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a router was resolved from.
#[derive(Debug, Clone)]
pub enum Trigger {
    Transition(Transition),
    Programmatic,
}

impl Trigger {
    pub fn route_type(&self) -> RouteType {
        match self {
            Trigger::Transition(_) => RouteType::Declarative,
            Trigger::Programmatic => RouteType::Programmatic,
        }
    }
}

/// Input shared by both resolution paths.
pub(crate) struct Binding {
    pub(crate) destination: ScreenRef,
    pub(crate) source: Option<ScreenRef>,
    pub(crate) trigger: Trigger,
    pub(crate) options: Option<RouteOptions>,
}

/// Type-erased router bound to one destination.
///
/// Lifecycle hooks receive this type. Equality is identity.
pub struct RouterInstance {
    id: RouterId,
    destination: ScreenRef,
    source: Option<ScreenRef>,
    config: Arc<dyn RouteConfig>,
    trigger: Trigger,
    route: Arc<dyn ErasedRoute>,
    notifier: Arc<LifecycleNotifier>,
}

impl RouterInstance {
    pub(crate) fn new(
        destination: ScreenRef,
        source: Option<ScreenRef>,
        config: Arc<dyn RouteConfig>,
        trigger: Trigger,
        route: Arc<dyn ErasedRoute>,
        notifier: Arc<LifecycleNotifier>,
    ) -> Self {
        Self {
            id: RouterId::next(),
            destination,
            source,
            config,
            trigger,
            route,
            notifier,
        }
    }

    pub fn id(&self) -> RouterId {
        self.id
    }

    pub fn destination(&self) -> &ScreenRef {
        &self.destination
    }

    pub fn source(&self) -> Option<&ScreenRef> {
        self.source.as_ref()
    }

    pub fn config(&self) -> &Arc<dyn RouteConfig> {
        &self.config
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn route_name(&self) -> &'static str {
        self.route.route_name()
    }

    pub fn is_bound_to(&self, destination: &ScreenRef) -> bool {
        ScreenId::of(&self.destination) == ScreenId::of(destination)
    }

    /// Current lifecycle state of the bound destination.
    pub fn state(&self) -> Result<RouteState> {
        self.notifier.state_of(&self.destination)
    }

    /// Fire will-perform and hand back the pending half of the route.
    ///
    /// Use this when the transition finishes later (an animation, a segue run
    /// by the host UI); [`PendingRoute::complete`] fires did-perform.
    pub fn begin(self: &Arc<Self>) -> Result<PendingRoute> {
        self.dispatch(LifecycleEvent::WillPerform)?;
        Ok(PendingRoute {
            router: Arc::clone(self),
            finished: false,
        })
    }

    /// Perform the route synchronously.
    ///
    /// Programmatic routers run the route's engine between the hooks.
    /// Declarative routers only dispatch hooks, since their transition is
    /// already underway.
    pub fn perform(self: &Arc<Self>) -> Result<()> {
        let mut pending = self.begin()?;
        if let Trigger::Programmatic = self.trigger {
            if let Err(err) = self.route.perform(self) {
                self.notifier.failed(RouteAction::Perform, &err);
                pending.finish(RouteOutcome::Failed)?;
                return Err(err);
            }
        }
        pending.complete()
    }

    /// Remove the route. did-remove fires even when the engine fails.
    pub fn remove(self: &Arc<Self>) -> Result<()> {
        self.dispatch(LifecycleEvent::WillRemove)?;
        let result = self.route.remove(self);
        let outcome = match &result {
            Ok(()) => RouteOutcome::Completed,
            Err(err) => {
                self.notifier.failed(RouteAction::Remove, err);
                RouteOutcome::Failed
            }
        };
        self.config.options().complete(RouteAction::Remove, outcome);
        self.dispatch(LifecycleEvent::DidRemove)?;
        result
    }

    fn dispatch(&self, event: LifecycleEvent) -> Result<()> {
        self.notifier
            .dispatch(event, &*self.route, Some(self), &self.destination, self.source.as_ref())
    }

    fn dispatch_reporting(&self, event: LifecycleEvent) -> Result<()> {
        self.notifier
            .dispatch_reporting(event, &*self.route, Some(self), &self.destination, self.source.as_ref())
    }
}

impl PartialEq for RouterInstance {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RouterInstance {}

impl std::fmt::Debug for RouterInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterInstance")
            .field("id", &self.id)
            .field("route", &self.route.route_name())
            .field("destination", &self.destination.title())
            .field("source", &self.source.as_ref().map(|s| s.title()))
            .field("trigger", &self.trigger)
            .finish()
    }
}

/// A route whose will-perform has fired.
///
/// Dropping it without calling [`complete`](Self::complete) completes it as
/// [`RouteOutcome::Interrupted`]; did-perform is never skipped.
#[must_use = "dropping a pending route completes it as interrupted"]
pub struct PendingRoute {
    router: Arc<RouterInstance>,
    finished: bool,
}

impl PendingRoute {
    pub fn router(&self) -> &Arc<RouterInstance> {
        &self.router
    }

    /// Run the completion callback, then fire did-perform.
    pub fn complete(mut self) -> Result<()> {
        self.finish(RouteOutcome::Completed)
    }

    /// Finish a transition that did not run to completion.
    pub fn interrupt(mut self) -> Result<()> {
        self.finish(RouteOutcome::Interrupted)
    }

    fn finish(&mut self, outcome: RouteOutcome) -> Result<()> {
        self.finished = true;
        self.router.config.options().complete(RouteAction::Perform, outcome);
        self.router.dispatch(LifecycleEvent::DidPerform)
    }
}

impl Drop for PendingRoute {
    // The failure policy is not applied here: panicking in drop may abort.
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.router
            .config
            .options()
            .complete(RouteAction::Perform, RouteOutcome::Interrupted);
        if let Err(err) = self.router.dispatch_reporting(LifecycleEvent::DidPerform) {
            tracing::warn!(router = %self.router.id, %err, "Failed to finish dropped route");
        }
    }
}

impl std::fmt::Debug for PendingRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRoute")
            .field("router", &self.router.id)
            .finish_non_exhaustive()
    }
}

/// Typed view of a router instance.
///
/// `D` and `C` are the destination and configuration types the resolving
/// handle was declared with; [`upcast`](Self::upcast) widens them.
pub struct Router<D: ?Sized, C: ?Sized> {
    instance: Arc<RouterInstance>,
    destination: Arc<D>,
    config: Arc<C>,
}

impl<D: ?Sized, C: ?Sized> Router<D, C> {
    pub(crate) fn new(instance: Arc<RouterInstance>, destination: Arc<D>, config: Arc<C>) -> Self {
        Self {
            instance,
            destination,
            config,
        }
    }

    pub fn id(&self) -> RouterId {
        self.instance.id
    }

    pub fn instance(&self) -> &Arc<RouterInstance> {
        &self.instance
    }

    pub fn destination(&self) -> &Arc<D> {
        &self.destination
    }

    pub fn config(&self) -> &Arc<C> {
        &self.config
    }

    pub fn source(&self) -> Option<&ScreenRef> {
        self.instance.source()
    }

    pub fn state(&self) -> Result<RouteState> {
        self.instance.state()
    }

    pub fn begin(&self) -> Result<PendingRoute> {
        self.instance.begin()
    }

    pub fn perform(&self) -> Result<()> {
        self.instance.perform()
    }

    pub fn remove(&self) -> Result<()> {
        self.instance.remove()
    }

    /// Widen the destination and configuration types.
    pub fn upcast<D2, C2>(self) -> Router<D2, C2>
    where
        D: Upcast<D2>,
        C: Upcast<C2>,
        D2: ?Sized,
        C2: ?Sized,
    {
        self.map(<D as Upcast<D2>>::upcast, <C as Upcast<C2>>::upcast)
    }

    pub(crate) fn map<D2: ?Sized, C2: ?Sized>(
        self,
        destination: impl FnOnce(Arc<D>) -> Arc<D2>,
        config: impl FnOnce(Arc<C>) -> Arc<C2>,
    ) -> Router<D2, C2> {
        Router {
            instance: self.instance,
            destination: destination(self.destination),
            config: config(self.config),
        }
    }
}

impl<D: ?Sized, C: ?Sized> Clone for Router<D, C> {
    fn clone(&self) -> Self {
        Self {
            instance: Arc::clone(&self.instance),
            destination: Arc::clone(&self.destination),
            config: Arc::clone(&self.config),
        }
    }
}

impl<D: ?Sized, C: ?Sized> std::fmt::Debug for Router<D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Router").field(&self.instance).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RouterType;
    use crate::settings::{FailurePolicy, RouterSettings};
    use crate::testing::{self, DetailRoute, DetailScreen, FlakyRoute, ListScreen, Recorder};
    use std::sync::Mutex;

    #[test]
    fn test_router_ids_are_unique() {
        let a = RouterId::next();
        let b = RouterId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_perform_then_remove_order() {
        let handle = RouterType::with_notifier(DetailRoute, testing::notifier());
        let recorder = Arc::new(Recorder::default());
        handle.subscribe(recorder.clone()).unwrap();

        let destination: ScreenRef = Arc::new(DetailScreen::default());
        let source: ScreenRef = Arc::new(ListScreen::default());
        let router = handle.route_from_view(destination.clone(), Some(source.clone())).unwrap();

        router.perform().unwrap();
        router.remove().unwrap();

        use LifecycleEvent::*;
        assert_eq!(recorder.events(), vec![WillPerform, DidPerform, WillRemove, DidRemove]);
        for record in recorder.records() {
            assert_eq!(record.router, Some(router.id()));
            assert_eq!(record.destination, ScreenId::of(&destination));
            assert_eq!(record.source, Some(ScreenId::of(&source)));
        }
    }

    #[test]
    fn test_engine_runs_only_for_programmatic_routes() {
        let handle = RouterType::with_notifier(DetailRoute, testing::notifier());
        let list: ScreenRef = Arc::new(ListScreen::default());

        let shown = Arc::new(DetailScreen::default());
        let destination: ScreenRef = shown.clone();
        handle.route_from_view(destination, None).unwrap().perform().unwrap();
        assert_eq!(shown.presented(), 1);

        let segued = Arc::new(DetailScreen::default());
        let destination: ScreenRef = segued.clone();
        handle
            .route_from_transition("pushDetail", None, destination, list)
            .unwrap()
            .perform()
            .unwrap();
        assert_eq!(segued.presented(), 0);
    }

    #[test]
    fn test_completion_precedes_did_perform() {
        let handle = RouterType::with_notifier(DetailRoute, testing::notifier());
        let recorder = Arc::new(Recorder::default());
        handle.subscribe(recorder.clone()).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let probe = recorder.clone();
        let sink = seen.clone();
        let options = RouteOptions::default().with_completion(move |action, outcome| {
            sink.lock().unwrap().push((action, outcome, probe.events().len()));
        });

        let destination: ScreenRef = Arc::new(DetailScreen::default());
        let router = handle.route_from_view_with(destination, None, options).unwrap();
        router.perform().unwrap();
        router.remove().unwrap();

        // The perform completion ran after will-perform and before did-perform.
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (RouteAction::Perform, RouteOutcome::Completed, 1),
                (RouteAction::Remove, RouteOutcome::Completed, 3),
            ]
        );
    }

    #[test]
    fn test_dropped_pending_route_still_completes() {
        let handle = RouterType::with_notifier(DetailRoute, testing::notifier());
        let recorder = Arc::new(Recorder::default());
        handle.subscribe(recorder.clone()).unwrap();

        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = outcomes.clone();
        let options = RouteOptions::default().with_completion(move |_, outcome| sink.lock().unwrap().push(outcome));

        let destination: ScreenRef = Arc::new(DetailScreen::default());
        let router = handle.route_from_view_with(destination, None, options).unwrap();
        {
            let _pending = router.begin().unwrap();
            assert_eq!(router.state().unwrap(), RouteState::Performing);
        }

        assert_eq!(recorder.events(), vec![LifecycleEvent::WillPerform, LifecycleEvent::DidPerform]);
        assert_eq!(*outcomes.lock().unwrap(), vec![RouteOutcome::Interrupted]);
        assert_eq!(router.state().unwrap(), RouteState::Routed);
    }

    #[test]
    fn test_dropped_pending_route_never_panics() {
        let notifier = Arc::new(LifecycleNotifier::new(
            RouterSettings::default().with_failure_policy(FailurePolicy::Panic),
        ));
        let handle = RouterType::with_notifier(DetailRoute, notifier);
        let recorder = Arc::new(Recorder::default());
        handle.subscribe(recorder.clone()).unwrap();

        let destination: ScreenRef = Arc::new(DetailScreen::default());
        let router = handle.route_from_view(destination.clone(), None).unwrap();
        let pending = router.begin().unwrap();

        // Someone else finished the transition first.
        handle.did_perform(Some(&**router.instance()), &destination, None).unwrap();
        drop(pending);

        assert_eq!(recorder.events(), vec![LifecycleEvent::WillPerform, LifecycleEvent::DidPerform]);
        assert_eq!(recorder.failures(), vec![RouteAction::Perform]);
        assert_eq!(router.state().unwrap(), RouteState::Routed);
    }

    #[test]
    fn test_engine_failure_still_fires_did_perform() {
        let handle = RouterType::with_notifier(FlakyRoute, testing::notifier());
        let recorder = Arc::new(Recorder::default());
        handle.subscribe(recorder.clone()).unwrap();

        let destination: ScreenRef = Arc::new(ListScreen::default());
        let router = handle.route_from_view(destination, None).unwrap();
        let err = router.perform().unwrap_err();

        assert!(matches!(err, crate::Error::EngineFailure { action: RouteAction::Perform, .. }));
        assert_eq!(recorder.events(), vec![LifecycleEvent::WillPerform, LifecycleEvent::DidPerform]);
        assert_eq!(recorder.failures(), vec![RouteAction::Perform]);

        // The failed route can still be torn down.
        router.remove().unwrap();
        assert_eq!(router.state().unwrap(), RouteState::Unrouted);
    }

    #[test]
    fn test_router_cannot_perform_twice_without_removal() {
        let handle = RouterType::with_notifier(DetailRoute, testing::notifier());
        let destination: ScreenRef = Arc::new(DetailScreen::default());
        let router = handle.route_from_view(destination, None).unwrap();

        router.perform().unwrap();
        assert!(matches!(router.perform(), Err(crate::Error::IllegalTransition { .. })));

        router.remove().unwrap();
        router.perform().unwrap();
    }

    #[test]
    fn test_instance_identity() {
        let handle = RouterType::with_notifier(DetailRoute, testing::notifier());
        let destination: ScreenRef = Arc::new(DetailScreen::default());
        let other: ScreenRef = Arc::new(DetailScreen::default());

        let router = handle.route_from_view(destination.clone(), None).unwrap();
        let copy = router.clone();

        assert_eq!(**router.instance(), **copy.instance());
        assert!(router.instance().is_bound_to(&destination));
        assert!(!router.instance().is_bound_to(&other));
        assert_eq!(router.instance().route_name(), "DetailRoute");
        assert!(router.config().options().completion().is_none());
    }
}
