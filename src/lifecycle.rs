//! Lifecycle notifications around performing and removing a route.
//!
//! Every destination instance moves through
//! `Unrouted → Performing → Routed → Removing → Unrouted`, one step per
//! [`LifecycleEvent`]. [`LifecycleNotifier`] enforces that order, then calls the
//! route's own hook followed by each subscribed [`RouteObserver`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::config::RouteAction;
use crate::error::{Error, IllegalTransitionSnafu, Result};
use crate::router::{ErasedRoute, RouterInstance};
use crate::screen::{Screen, ScreenId, ScreenRef};
use crate::settings::{FailurePolicy, RouterSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    WillPerform,
    DidPerform,
    WillRemove,
    DidRemove,
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleEvent::WillPerform => "will-perform",
            LifecycleEvent::DidPerform => "did-perform",
            LifecycleEvent::WillRemove => "will-remove",
            LifecycleEvent::DidRemove => "did-remove",
        };
        f.write_str(name)
    }
}

/// Routing state of one destination instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RouteState {
    #[default]
    Unrouted,
    Performing,
    Routed,
    Removing,
}

impl RouteState {
    /// The state after `event`, or `None` if the event is not legal here.
    pub fn advance(self, event: LifecycleEvent) -> Option<Self> {
        match (self, event) {
            (RouteState::Unrouted, LifecycleEvent::WillPerform) => Some(RouteState::Performing),
            (RouteState::Performing, LifecycleEvent::DidPerform) => Some(RouteState::Routed),
            (RouteState::Routed, LifecycleEvent::WillRemove) => Some(RouteState::Removing),
            (RouteState::Removing, LifecycleEvent::DidRemove) => Some(RouteState::Unrouted),
            _ => None,
        }
    }
}

impl std::fmt::Display for RouteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RouteState::Unrouted => "unrouted",
            RouteState::Performing => "performing",
            RouteState::Routed => "routed",
            RouteState::Removing => "removing",
        };
        f.write_str(name)
    }
}

/// Observer of routing events.
///
/// `router` is `None` when the operation was not started through a router,
/// e.g. a dismissal the host UI noticed after the fact.
pub trait RouteObserver: Send + Sync {
    fn will_perform(&self, router: Option<&RouterInstance>, destination: &ScreenRef, source: Option<&ScreenRef>) {
        let _ = (router, destination, source);
    }

    fn did_perform(&self, router: Option<&RouterInstance>, destination: &ScreenRef, source: Option<&ScreenRef>) {
        let _ = (router, destination, source);
    }

    fn will_remove(&self, router: Option<&RouterInstance>, destination: &ScreenRef, source: Option<&ScreenRef>) {
        let _ = (router, destination, source);
    }

    fn did_remove(&self, router: Option<&RouterInstance>, destination: &ScreenRef, source: Option<&ScreenRef>) {
        let _ = (router, destination, source);
    }

    /// Called for every misconfiguration and engine failure.
    fn route_failed(&self, action: RouteAction, error: &Error) {
        let _ = (action, error);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// State of one destination. The weak handle pins the allocation, so a
/// [`ScreenId`] is never reused while its entry exists.
struct Tracked {
    state: RouteState,
    screen: Weak<dyn Screen>,
}

impl Tracked {
    fn is_live(&self) -> bool {
        self.screen.strong_count() > 0
    }
}

/// Shared hook dispatcher and per-destination state table.
///
/// Handles that must agree on destination state share one notifier.
pub struct LifecycleNotifier {
    settings: RouterSettings,
    next_observer: AtomicU64,
    observers: RwLock<Vec<(ObserverId, Arc<dyn RouteObserver>)>>,
    states: Mutex<HashMap<ScreenId, Tracked>>,
}

impl LifecycleNotifier {
    pub fn new(settings: RouterSettings) -> Self {
        Self {
            settings,
            next_observer: AtomicU64::new(1),
            observers: RwLock::new(Vec::new()),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn subscribe(&self, observer: Arc<dyn RouteObserver>) -> Result<ObserverId> {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        let mut observers = self.observers.write().map_err(|_| Error::LockPoisoned)?;
        observers.push((id, observer));
        Ok(id)
    }

    /// Returns whether the observer was subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> Result<bool> {
        let mut observers = self.observers.write().map_err(|_| Error::LockPoisoned)?;
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        Ok(observers.len() != before)
    }

    pub fn state_of(&self, destination: &ScreenRef) -> Result<RouteState> {
        let states = self.states.lock().map_err(|_| Error::LockPoisoned)?;
        Ok(states
            .get(&ScreenId::of(destination))
            .filter(|tracked| tracked.is_live())
            .map(|tracked| tracked.state)
            .unwrap_or_default())
    }

    /// Number of live destinations currently outside the `Unrouted` state.
    pub fn active_routes(&self) -> Result<usize> {
        let states = self.states.lock().map_err(|_| Error::LockPoisoned)?;
        Ok(states.values().filter(|tracked| tracked.is_live()).count())
    }

    /// Advance the destination's state, then run the route hook and observers.
    pub(crate) fn dispatch(
        &self,
        event: LifecycleEvent,
        route: &dyn ErasedRoute,
        router: Option<&RouterInstance>,
        destination: &ScreenRef,
        source: Option<&ScreenRef>,
    ) -> Result<()> {
        self.advance(event, destination)
            .map_err(|err| self.escalate(RouteAction::for_event(event), err))?;
        self.run_hooks(event, route, router, destination, source)
    }

    /// Like [`dispatch`](Self::dispatch), but an illegal event is only logged
    /// and reported to observers. Used where a panic cannot be afforded.
    pub(crate) fn dispatch_reporting(
        &self,
        event: LifecycleEvent,
        route: &dyn ErasedRoute,
        router: Option<&RouterInstance>,
        destination: &ScreenRef,
        source: Option<&ScreenRef>,
    ) -> Result<()> {
        self.advance(event, destination).inspect_err(|err| {
            if err.is_misconfiguration() {
                self.report(RouteAction::for_event(event), err);
            }
        })?;
        self.run_hooks(event, route, router, destination, source)
    }

    fn run_hooks(
        &self,
        event: LifecycleEvent,
        route: &dyn ErasedRoute,
        router: Option<&RouterInstance>,
        destination: &ScreenRef,
        source: Option<&ScreenRef>,
    ) -> Result<()> {
        tracing::trace!(
            %event,
            route = route.route_name(),
            router = ?router.map(|r| r.id()),
            destination = %destination.title(),
            source = ?source.map(|s| s.title()),
            "Lifecycle hook"
        );

        route.hook(event, router, destination, source);

        // Observers may route again, so the lock is not held while they run.
        let observers: Vec<Arc<dyn RouteObserver>> = {
            let guard = self.observers.read().map_err(|_| Error::LockPoisoned)?;
            guard.iter().map(|(_, observer)| Arc::clone(observer)).collect()
        };
        for observer in observers {
            match event {
                LifecycleEvent::WillPerform => observer.will_perform(router, destination, source),
                LifecycleEvent::DidPerform => observer.did_perform(router, destination, source),
                LifecycleEvent::WillRemove => observer.will_remove(router, destination, source),
                LifecycleEvent::DidRemove => observer.did_remove(router, destination, source),
            }
        }
        Ok(())
    }

    /// Step the destination's state; an illegal event is returned unreported.
    fn advance(&self, event: LifecycleEvent, destination: &ScreenRef) -> Result<()> {
        let id = ScreenId::of(destination);
        let rejected = {
            let mut states = self.states.lock().map_err(|_| Error::LockPoisoned)?;
            // Destinations dropped while routed never see did-remove.
            states.retain(|_, tracked| tracked.is_live());

            let current = states.get(&id).map(|tracked| tracked.state).unwrap_or_default();
            match current.advance(event) {
                Some(RouteState::Unrouted) => {
                    states.remove(&id);
                    None
                }
                Some(next) => {
                    states.insert(
                        id,
                        Tracked {
                            state: next,
                            screen: Arc::downgrade(destination),
                        },
                    );
                    None
                }
                None => Some(current),
            }
        };

        match rejected {
            None => Ok(()),
            Some(state) => IllegalTransitionSnafu {
                destination: destination.title(),
                state,
                event,
            }
            .fail(),
        }
    }

    /// Send misconfigurations through [`misconfigured`](Self::misconfigured);
    /// other errors pass through untouched.
    fn escalate(&self, action: RouteAction, error: Error) -> Error {
        if error.is_misconfiguration() {
            self.misconfigured(action, error)
        } else {
            error
        }
    }

    /// Log and report a misconfiguration, then apply the failure policy.
    pub(crate) fn misconfigured(&self, action: RouteAction, error: Error) -> Error {
        self.report(action, &error);
        if self.settings.failure_policy == FailurePolicy::Panic {
            panic!("routing misconfiguration during {action}: {error}");
        }
        error
    }

    fn report(&self, action: RouteAction, error: &Error) {
        tracing::error!(%action, %error, "Routing misconfiguration");
        self.notify_failure(action, error);
    }

    /// Log and report a runtime failure; never panics.
    pub(crate) fn failed(&self, action: RouteAction, error: &Error) {
        tracing::warn!(%action, %error, "Route failed");
        self.notify_failure(action, error);
    }

    fn notify_failure(&self, action: RouteAction, error: &Error) {
        let observers: Vec<Arc<dyn RouteObserver>> = match self.observers.read() {
            Ok(guard) => guard.iter().map(|(_, observer)| Arc::clone(observer)).collect(),
            Err(_) => return,
        };
        for observer in observers {
            observer.route_failed(action, error);
        }
    }
}

impl Default for LifecycleNotifier {
    fn default() -> Self {
        Self::new(RouterSettings::default())
    }
}

impl std::fmt::Debug for LifecycleNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleNotifier")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl RouteAction {
    pub(crate) fn for_event(event: LifecycleEvent) -> Self {
        match event {
            LifecycleEvent::WillPerform | LifecycleEvent::DidPerform => RouteAction::Perform,
            LifecycleEvent::WillRemove | LifecycleEvent::DidRemove => RouteAction::Remove,
        }
    }
}
