//! Route registry.
//!
//! Routes are registered once, during start-up, on a [`RegistryBuilder`], then
//! frozen into an immutable [`Registry`]. A registry hands out router type
//! handles by destination interface, by configuration interface, or by name,
//! and knows the route types each registered destination type accepts.
//!
//! # Example
//! ```ignore
//! let mut builder = Registry::builder(RouterSettings::from_env());
//! builder
//!     .route(MessageRoute)
//!     .view::<dyn MessageView>()?
//!     .named("message")?;
//! let registry = builder.finish();
//!
//! let handle = registry.router_to_view::<dyn MessageView>()?;
//! let router = handle.route_from_view(message, Some(inbox))?;
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;
use std::sync::{Arc, OnceLock};

use crate::config::{RouteAction, RouteConfig};
use crate::error::{DuplicateRegistrationSnafu, Error, RegistryInstalledSnafu, Result, RouteNotFoundSnafu};
use crate::lifecycle::LifecycleNotifier;
use crate::router::{RouterType, ViewRoute, erase_config, erase_screen};
use crate::screen::{self, Routable, RouteTypes, Screen, ScreenRef, Upcast, short_type_name};
use crate::settings::RouterSettings;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// A registered handle, erased to its storage form.
struct Entry {
    route: &'static str,
    handle: Arc<dyn Any + Send + Sync>,
}

#[derive(Debug, Clone, Copy)]
struct Destination {
    name: &'static str,
    route_types: RouteTypes,
}

#[derive(Default)]
struct Tables {
    views: HashMap<TypeId, Entry>,
    modules: HashMap<TypeId, Entry>,
    names: HashMap<String, Entry>,
    destinations: HashMap<TypeId, Destination>,
}

/// Collects routes before the registry is frozen.
pub struct RegistryBuilder {
    notifier: Arc<LifecycleNotifier>,
    tables: Tables,
}

impl RegistryBuilder {
    pub fn new(settings: RouterSettings) -> Self {
        Self {
            notifier: Arc::new(LifecycleNotifier::new(settings)),
            tables: Tables::default(),
        }
    }

    /// Notifier shared by every handle this builder creates.
    pub fn notifier(&self) -> &Arc<LifecycleNotifier> {
        &self.notifier
    }

    /// Register a route definition and record its destination's route types.
    pub fn route<R: ViewRoute>(&mut self, route: R) -> RouteRegistration<'_, R> {
        let handle = RouterType::with_notifier(route, Arc::clone(&self.notifier));
        self.tables.destinations.insert(
            TypeId::of::<R::Destination>(),
            Destination {
                name: handle.destination_name(),
                route_types: R::Destination::ROUTE_TYPES,
            },
        );
        tracing::debug!(
            route = handle.route_name(),
            destination = handle.destination_name(),
            route_types = ?R::Destination::ROUTE_TYPES,
            "Registered route"
        );
        RouteRegistration { builder: self, handle }
    }

    pub fn finish(self) -> Registry {
        Registry {
            notifier: self.notifier,
            tables: self.tables,
        }
    }
}

fn insert<K: std::hash::Hash + Eq>(
    notifier: &LifecycleNotifier,
    table: &mut HashMap<K, Entry>,
    kind: &'static str,
    key: K,
    label: String,
    entry: Entry,
) -> Result<()> {
    match table.entry(key) {
        MapEntry::Occupied(occupied) => {
            let err = DuplicateRegistrationSnafu {
                kind,
                key: label,
                existing: occupied.get().route,
            }
            .build();
            Err(notifier.misconfigured(RouteAction::Register, err))
        }
        MapEntry::Vacant(vacant) => {
            vacant.insert(entry);
            Ok(())
        }
    }
}

/// Type key plus the name used in error messages.
struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        }
    }
}

/// One route being registered under one or more keys.
pub struct RouteRegistration<'a, R: ViewRoute> {
    builder: &'a mut RegistryBuilder,
    handle: RouterType<R::Destination, R::Config>,
}

impl<R: ViewRoute> RouteRegistration<'_, R> {
    /// Register for the destination interface `P`.
    pub fn view<P>(self) -> Result<Self>
    where
        P: ?Sized + 'static,
        R::Destination: Upcast<P>,
    {
        let handle = self
            .handle
            .clone()
            .map(<R::Destination as Upcast<P>>::upcast, erase_config::<R::Config>);
        self.insert_typed::<P, _>(Kind::View, handle)
    }

    /// Register for the configuration interface `M`.
    pub fn module<M>(self) -> Result<Self>
    where
        M: ?Sized + 'static,
        R::Config: Upcast<M>,
    {
        let handle = self
            .handle
            .clone()
            .map(erase_screen::<R::Destination>, <R::Config as Upcast<M>>::upcast);
        self.insert_typed::<M, _>(Kind::Module, handle)
    }

    /// Register under a dynamic name.
    pub fn named(self, name: impl Into<String>) -> Result<Self> {
        let entry = Entry {
            route: self.handle.route_name(),
            handle: Arc::new(self.handle.clone().erased()),
        };
        let name = name.into();
        let builder = &mut *self.builder;
        insert(&builder.notifier, &mut builder.tables.names, "name", name.clone(), name, entry)?;
        Ok(self)
    }

    pub fn handle(&self) -> &RouterType<R::Destination, R::Config> {
        &self.handle
    }

    fn insert_typed<K, H>(self, kind: Kind, handle: H) -> Result<Self>
    where
        K: ?Sized + 'static,
        H: Any + Send + Sync,
    {
        let key = TypeKey::of::<K>();
        let entry = Entry {
            route: self.handle.route_name(),
            handle: Arc::new(handle),
        };
        let builder = &mut *self.builder;
        let table = kind.table(&mut builder.tables);
        insert(&builder.notifier, table, kind.label(), key.id, key.name.to_string(), entry)?;
        Ok(self)
    }
}

#[derive(Clone, Copy)]
enum Kind {
    View,
    Module,
}

impl Kind {
    fn label(self) -> &'static str {
        match self {
            Kind::View => "view",
            Kind::Module => "module",
        }
    }

    fn table(self, tables: &mut Tables) -> &mut HashMap<TypeId, Entry> {
        match self {
            Kind::View => &mut tables.views,
            Kind::Module => &mut tables.modules,
        }
    }
}

/// Immutable table of router type handles.
pub struct Registry {
    notifier: Arc<LifecycleNotifier>,
    tables: Tables,
}

impl Registry {
    pub fn builder(settings: RouterSettings) -> RegistryBuilder {
        RegistryBuilder::new(settings)
    }

    /// Handle for routes whose destination implements `P`.
    pub fn router_to_view<P: ?Sized + 'static>(&self) -> Result<RouterType<P, dyn RouteConfig>> {
        self.lookup_typed::<P, RouterType<P, dyn RouteConfig>>(&self.tables.views, "view")
    }

    /// Handle for routes whose configuration implements `M`.
    pub fn router_to_module<M: ?Sized + 'static>(&self) -> Result<RouterType<dyn Screen, M>> {
        self.lookup_typed::<M, RouterType<dyn Screen, M>>(&self.tables.modules, "module")
    }

    /// Handle registered under `name`.
    pub fn router_named(&self, name: &str) -> Result<RouterType<dyn Screen, dyn RouteConfig>> {
        let handle = self
            .tables
            .names
            .get(name)
            .and_then(|entry| entry.handle.downcast_ref::<RouterType<dyn Screen, dyn RouteConfig>>());
        match handle {
            Some(handle) => Ok(handle.clone()),
            None => Err(self.not_found("name", name.to_string())),
        }
    }

    /// Route types accepted by the concrete type of `screen`; empty when that
    /// type has no registered route.
    pub fn route_types_of(&self, screen: &ScreenRef) -> RouteTypes {
        self.tables
            .destinations
            .get(&screen::type_id_of(screen))
            .map(|destination| destination.route_types)
            .unwrap_or_default()
    }

    /// Whether any route targets the concrete type of `screen`.
    pub fn is_registered(&self, screen: &ScreenRef) -> bool {
        self.tables.destinations.contains_key(&screen::type_id_of(screen))
    }

    /// Names of the registered destination types.
    pub fn destinations(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.tables.destinations.values().map(|d| d.name).collect();
        names.sort_unstable();
        names
    }

    pub fn notifier(&self) -> &Arc<LifecycleNotifier> {
        &self.notifier
    }

    /// Make this registry the process-wide one returned by [`global`].
    pub fn install(self) -> Result<&'static Registry> {
        let mut installed = false;
        let registry = GLOBAL.get_or_init(|| {
            installed = true;
            self
        });
        if installed {
            tracing::info!(destinations = registry.tables.destinations.len(), "Installed global registry");
            Ok(registry)
        } else {
            Err(registry
                .notifier
                .misconfigured(RouteAction::Register, RegistryInstalledSnafu.build()))
        }
    }

    fn lookup_typed<K, H>(&self, table: &HashMap<TypeId, Entry>, kind: &'static str) -> Result<H>
    where
        K: ?Sized + 'static,
        H: Any + Clone,
    {
        let key = TypeKey::of::<K>();
        match table.get(&key.id).and_then(|entry| entry.handle.downcast_ref::<H>()) {
            Some(handle) => Ok(handle.clone()),
            None => Err(self.not_found(kind, key.name.to_string())),
        }
    }

    fn not_found(&self, kind: &'static str, key: String) -> Error {
        let err = RouteNotFoundSnafu { kind, key }.build();
        self.notifier.misconfigured(RouteAction::Lookup, err)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("views", &self.tables.views.len())
            .field("modules", &self.tables.modules.len())
            .field("names", &self.tables.names.keys().collect::<Vec<_>>())
            .field("destinations", &self.destinations())
            .finish()
    }
}

/// The registry installed with [`Registry::install`], if any.
pub fn global() -> Option<&'static Registry> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::RouteState;
    use crate::testing::{
        self, Animal, DetailConfig, DetailModule, DetailRoute, DetailScreen, DetailView, Dog, DogRoute, ListScreen,
        Recorder,
    };

    fn registry() -> Registry {
        let mut builder = Registry::builder(testing::settings());
        builder
            .route(DetailRoute)
            .view::<dyn DetailView>()
            .unwrap()
            .module::<dyn DetailModule>()
            .unwrap()
            .named("detail")
            .unwrap();
        builder.route(DogRoute).view::<dyn Animal>().unwrap().named("dog").unwrap();
        builder.finish()
    }

    #[test]
    fn test_lookup_by_view() {
        let registry = registry();
        let handle = registry.router_to_view::<dyn DetailView>().unwrap();

        let detail = Arc::new(DetailScreen::default());
        detail.show("draft");
        let router = handle.route_from_view(detail, None).unwrap();
        assert_eq!(router.destination().item().as_deref(), Some("draft"));
        assert_eq!(handle.route_name(), "DetailRoute");
    }

    #[test]
    fn test_lookup_by_module() {
        let registry = registry();
        let handle = registry.router_to_module::<dyn DetailModule>().unwrap();

        let sender: crate::Sender = Arc::new(String::from("from-module"));
        let router = handle
            .route_from_transition(
                "pushDetail",
                Some(sender),
                Arc::new(DetailScreen::default()),
                Arc::new(ListScreen::default()),
            )
            .unwrap();
        assert_eq!(router.config().item().as_deref(), Some("from-module"));
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = registry();
        let handle = registry.router_named("dog").unwrap();

        let dog: ScreenRef = Arc::new(Dog::default());
        let router = handle.route_from_view(dog.clone(), None).unwrap();
        assert!(Arc::ptr_eq(router.destination(), &dog));
        assert!(handle.supports_programmatic_routing());
        assert!(!handle.supports_declarative_routing());
    }

    #[test]
    fn test_missing_routes() {
        let registry = registry();
        let recorder = Arc::new(Recorder::default());
        registry.notifier().subscribe(recorder.clone()).unwrap();

        assert!(matches!(
            registry.router_named("settings"),
            Err(Error::RouteNotFound { kind: "name", .. })
        ));
        assert!(matches!(
            registry.router_to_view::<dyn Screen>(),
            Err(Error::RouteNotFound { kind: "view", .. })
        ));
        assert!(matches!(
            registry.router_to_module::<DetailConfig>(),
            Err(Error::RouteNotFound { kind: "module", .. })
        ));
        assert_eq!(recorder.failures(), vec![RouteAction::Lookup; 3]);
    }

    #[test]
    fn test_duplicate_registration() {
        let mut builder = Registry::builder(testing::settings());
        builder.route(DetailRoute).view::<dyn DetailView>().unwrap().named("detail").unwrap();

        let err = builder.route(DetailRoute).view::<dyn DetailView>().err().unwrap();
        assert!(matches!(
            err,
            Error::DuplicateRegistration {
                kind: "view",
                existing: "DetailRoute",
                ..
            }
        ));

        let err = builder.route(DogRoute).named("detail").err().unwrap();
        assert!(matches!(err, Error::DuplicateRegistration { kind: "name", .. }));
        assert!(err.to_string().contains("detail"));
    }

    #[test]
    fn test_route_types_of() {
        let registry = registry();
        let detail: ScreenRef = Arc::new(DetailScreen::default());
        let dog: ScreenRef = Arc::new(Dog::default());
        let list: ScreenRef = Arc::new(ListScreen::default());

        assert_eq!(registry.route_types_of(&detail), RouteTypes::all());
        assert_eq!(registry.route_types_of(&dog), RouteTypes::PROGRAMMATIC);
        assert_eq!(registry.route_types_of(&list), RouteTypes::empty());
        assert!(registry.is_registered(&dog));
        assert!(!registry.is_registered(&list));
        assert_eq!(registry.destinations(), vec!["DetailScreen", "Dog"]);
    }

    #[test]
    fn test_handles_share_state() {
        let registry = registry();
        let by_view = registry.router_to_view::<dyn DetailView>().unwrap();
        let by_name = registry.router_named("detail").unwrap();

        let detail: ScreenRef = Arc::new(DetailScreen::default());
        by_view.route_from_view(detail.clone(), None).unwrap().perform().unwrap();

        assert_eq!(by_name.notifier().state_of(&detail).unwrap(), RouteState::Routed);
        assert!(by_name.route_from_view(detail.clone(), None).unwrap().perform().is_err());
        by_name.remove_externally(&detail, None).unwrap();
        assert_eq!(by_view.notifier().state_of(&detail).unwrap(), RouteState::Unrouted);
    }

    #[test]
    fn test_install_once() {
        let installed = registry().install().unwrap();
        assert!(std::ptr::eq(installed, global().unwrap()));
        assert!(global().unwrap().router_named("detail").is_ok());

        assert!(matches!(registry().install(), Err(Error::RegistryInstalled)));
    }
}
