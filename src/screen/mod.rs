//! Screens: the view-bearing nodes a route moves between.
//!
//! A screen is shared as [`ScreenRef`] and identified by pointer identity
//! ([`ScreenId`]). Whether a screen type can be reached declaratively,
//! programmatically, or both is declared once per type through [`Routable`].

mod routable;
mod upcast;

pub use routable::{Routable, RouteType, RouteTypes};
pub use upcast::Upcast;

use std::any::{Any, TypeId};
use std::sync::Arc;

/// Access to the concrete value behind a trait object.
///
/// Implemented for every sized `Any + Send + Sync` type; trait objects reach it
/// through their vtable.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A view-bearing UI node that can be a routing source or destination.
pub trait Screen: AsAny {
    /// Label used in logs and error messages.
    fn title(&self) -> String {
        short_type_name(std::any::type_name::<Self>()).to_string()
    }
}

/// Shared handle to a screen. The hosting UI owns it; routers only hold clones.
pub type ScreenRef = Arc<dyn Screen>;

/// Identity of a screen instance, derived from its allocation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScreenId(usize);

impl ScreenId {
    pub fn of(screen: &ScreenRef) -> Self {
        Self(Arc::as_ptr(screen) as *const () as usize)
    }
}

impl std::fmt::Debug for ScreenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScreenId({:#x})", self.0)
    }
}

/// Concrete type of the screen behind `screen`.
pub fn type_id_of(screen: &ScreenRef) -> TypeId {
    Any::type_id((**screen).as_any())
}

/// Borrow `screen` as its concrete type, if it is a `T`.
pub fn downcast_ref<T: Screen>(screen: &ScreenRef) -> Option<&T> {
    (**screen).as_any().downcast_ref::<T>()
}

/// Clone `screen` as an `Arc` of its concrete type, if it is a `T`.
pub fn downcast_arc<T: Screen>(screen: &ScreenRef) -> Option<Arc<T>> {
    AsAny::into_any_arc(Arc::clone(screen)).downcast::<T>().ok()
}

/// Strip the module path from a `type_name` result, keeping generic arguments.
pub(crate) fn short_type_name(name: &str) -> &str {
    let head = name.split('<').next().unwrap_or(name);
    match head.rfind("::") {
        Some(idx) => &name[idx + 2..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DetailScreen, ListScreen, TitledScreen};

    #[test]
    fn test_screen_identity() {
        let a: ScreenRef = Arc::new(ListScreen::default());
        let b: ScreenRef = Arc::new(ListScreen::default());

        assert_eq!(ScreenId::of(&a), ScreenId::of(&a.clone()));
        assert_ne!(ScreenId::of(&a), ScreenId::of(&b));
    }

    #[test]
    fn test_downcast() {
        let screen: ScreenRef = Arc::new(DetailScreen::default());

        assert!(downcast_ref::<DetailScreen>(&screen).is_some());
        assert!(downcast_ref::<ListScreen>(&screen).is_none());
        assert_eq!(type_id_of(&screen), TypeId::of::<DetailScreen>());

        let detail = downcast_arc::<DetailScreen>(&screen).expect("detail screen");
        assert_eq!(Arc::as_ptr(&detail) as *const (), Arc::as_ptr(&screen) as *const ());
    }

    #[test]
    fn test_default_title() {
        let screen: ScreenRef = Arc::new(DetailScreen::default());
        assert_eq!(screen.title(), "DetailScreen");
        assert_eq!(short_type_name("a::b::Foo<c::Bar>"), "Foo<c::Bar>");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_hand_written_screen_impl() {
        let screen: ScreenRef = Arc::new(TitledScreen::with_unread(3));

        assert_eq!(screen.title(), "Inbox (3)");
        assert_eq!(TitledScreen::ROUTE_TYPES, RouteTypes::PROGRAMMATIC);
        assert!(TitledScreen::supports(RouteType::Programmatic));
        assert!(!TitledScreen::supports(RouteType::Declarative));
    }
}
