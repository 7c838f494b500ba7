//! Screens, routes and observers shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::{RouteAction, RouteConfig, RouteOptions, Transition, ViewRouteConfig};
use crate::error::{Error, Result};
use crate::lifecycle::{LifecycleEvent, LifecycleNotifier, RouteObserver};
use crate::router::{RouterId, RouterInstance, ViewRoute};
use crate::screen::{Screen, ScreenId, ScreenRef};
use crate::settings::{FailurePolicy, RouterSettings};
use crate::{impl_upcast, routable};

pub fn settings() -> RouterSettings {
    RouterSettings::default().with_failure_policy(FailurePolicy::Report)
}

pub fn notifier() -> Arc<LifecycleNotifier> {
    Arc::new(LifecycleNotifier::new(settings()))
}

pub trait DetailView: Send + Sync {
    fn item(&self) -> Option<String>;
}

#[routable(declarative, programmatic)]
#[derive(Default)]
pub struct DetailScreen {
    item: Mutex<Option<String>>,
    presented: AtomicUsize,
    hooks: Mutex<Vec<&'static str>>,
}

impl DetailScreen {
    pub fn show(&self, item: &str) {
        *self.item.lock().unwrap() = Some(item.to_string());
    }

    /// How many times the route engine presented this screen.
    pub fn presented(&self) -> usize {
        self.presented.load(Ordering::SeqCst)
    }

    pub fn hooks(&self) -> Vec<&'static str> {
        self.hooks.lock().unwrap().clone()
    }

    fn hook(&self, name: &'static str) {
        self.hooks.lock().unwrap().push(name);
    }
}

impl DetailView for DetailScreen {
    fn item(&self) -> Option<String> {
        self.item.lock().unwrap().clone()
    }
}

impl_upcast!(DetailScreen => dyn DetailView);

#[routable(programmatic)]
#[derive(Default)]
pub struct ListScreen;

#[routable]
#[derive(Default)]
pub struct PlainScreen;

#[routable(declarative)]
#[derive(Default)]
pub struct SegueOnlyScreen;

/// Carries its own `Screen` impl.
#[routable(programmatic, no_screen)]
#[derive(Default)]
pub struct TitledScreen {
    unread: usize,
}

impl TitledScreen {
    pub fn with_unread(unread: usize) -> Self {
        Self { unread }
    }
}

impl Screen for TitledScreen {
    fn title(&self) -> String {
        format!("Inbox ({})", self.unread)
    }
}

pub trait DetailModule: Send + Sync {
    fn item(&self) -> Option<String>;
}

#[derive(Default)]
pub struct DetailConfig {
    pub options: RouteOptions,
    pub item: Option<String>,
}

impl RouteConfig for DetailConfig {
    fn options(&self) -> &RouteOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut RouteOptions {
        &mut self.options
    }
}

impl DetailModule for DetailConfig {
    fn item(&self) -> Option<String> {
        self.item.clone()
    }
}

impl_upcast!(DetailConfig => dyn RouteConfig, dyn DetailModule);

pub struct DetailRoute;

impl ViewRoute for DetailRoute {
    type Destination = DetailScreen;
    type Config = DetailConfig;

    fn default_config(&self) -> DetailConfig {
        DetailConfig::default()
    }

    fn configure_transition(&self, config: &mut DetailConfig, transition: &Transition) {
        if let Some(item) = transition.sender_as::<String>() {
            config.item = Some(item.clone());
        }
    }

    fn prepare_destination(&self, destination: &DetailScreen, config: &DetailConfig) {
        if let Some(item) = &config.item {
            destination.show(item);
        }
    }

    fn perform(&self, destination: &DetailScreen, _source: Option<&ScreenRef>, _config: &DetailConfig) -> Result<()> {
        destination.presented.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn will_perform_route(&self, _router: Option<&RouterInstance>, destination: &DetailScreen, _source: Option<&ScreenRef>) {
        destination.hook("will-perform");
    }

    fn did_perform_route(&self, _router: Option<&RouterInstance>, destination: &DetailScreen, _source: Option<&ScreenRef>) {
        destination.hook("did-perform");
    }

    fn will_remove_route(&self, _router: Option<&RouterInstance>, destination: &DetailScreen, _source: Option<&ScreenRef>) {
        destination.hook("will-remove");
    }

    fn did_remove_route(&self, _router: Option<&RouterInstance>, destination: &DetailScreen, _source: Option<&ScreenRef>) {
        destination.hook("did-remove");
    }
}

/// Route whose engine cannot present anything.
pub struct FlakyRoute;

impl ViewRoute for FlakyRoute {
    type Destination = ListScreen;
    type Config = ViewRouteConfig;

    fn default_config(&self) -> ViewRouteConfig {
        ViewRouteConfig::default()
    }

    fn perform(&self, _destination: &ListScreen, _source: Option<&ScreenRef>, _config: &ViewRouteConfig) -> Result<()> {
        Err(Error::engine(RouteAction::Perform, "no window to present in"))
    }
}

pub struct PlainRoute;

impl ViewRoute for PlainRoute {
    type Destination = PlainScreen;
    type Config = ViewRouteConfig;

    fn default_config(&self) -> ViewRouteConfig {
        ViewRouteConfig::default()
    }
}

pub struct SegueOnlyRoute;

impl ViewRoute for SegueOnlyRoute {
    type Destination = SegueOnlyScreen;
    type Config = ViewRouteConfig;

    fn default_config(&self) -> ViewRouteConfig {
        ViewRouteConfig::default()
    }
}

pub trait Animal: Send + Sync {
    fn speak(&self) -> String;
}

#[routable(programmatic)]
#[derive(Default)]
pub struct Dog;

impl Animal for Dog {
    fn speak(&self) -> String {
        "woof".to_string()
    }
}

impl_upcast!(Dog => dyn Animal);

pub struct DogRoute;

impl ViewRoute for DogRoute {
    type Destination = Dog;
    type Config = ViewRouteConfig;

    fn default_config(&self) -> ViewRouteConfig {
        ViewRouteConfig::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub event: LifecycleEvent,
    pub router: Option<RouterId>,
    pub destination: ScreenId,
    pub source: Option<ScreenId>,
}

/// Observer that keeps every notification it receives.
#[derive(Default)]
pub struct Recorder {
    records: Mutex<Vec<Record>>,
    failures: Mutex<Vec<RouteAction>>,
}

impl Recorder {
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.records().into_iter().map(|record| record.event).collect()
    }

    pub fn failures(&self) -> Vec<RouteAction> {
        self.failures.lock().unwrap().clone()
    }

    fn record(
        &self,
        event: LifecycleEvent,
        router: Option<&RouterInstance>,
        destination: &ScreenRef,
        source: Option<&ScreenRef>,
    ) {
        self.records.lock().unwrap().push(Record {
            event,
            router: router.map(RouterInstance::id),
            destination: ScreenId::of(destination),
            source: source.map(ScreenId::of),
        });
    }
}

impl RouteObserver for Recorder {
    fn will_perform(&self, router: Option<&RouterInstance>, destination: &ScreenRef, source: Option<&ScreenRef>) {
        self.record(LifecycleEvent::WillPerform, router, destination, source);
    }

    fn did_perform(&self, router: Option<&RouterInstance>, destination: &ScreenRef, source: Option<&ScreenRef>) {
        self.record(LifecycleEvent::DidPerform, router, destination, source);
    }

    fn will_remove(&self, router: Option<&RouterInstance>, destination: &ScreenRef, source: Option<&ScreenRef>) {
        self.record(LifecycleEvent::WillRemove, router, destination, source);
    }

    fn did_remove(&self, router: Option<&RouterInstance>, destination: &ScreenRef, source: Option<&ScreenRef>) {
        self.record(LifecycleEvent::DidRemove, router, destination, source);
    }

    fn route_failed(&self, action: RouteAction, _error: &Error) {
        self.failures.lock().unwrap().push(action);
    }
}
