//! Structural covariance for destination and configuration types.
//!
//! A router typed for a concrete screen can be used wherever a router for an
//! interface that screen implements is expected. `Upcast` states that
//! relationship; it holds reflexively and is added for concrete-to-interface
//! pairs with [`impl_upcast!`](crate::impl_upcast).

use std::sync::Arc;

/// `Self` can be viewed as a `T` without a fallible cast.
pub trait Upcast<T: ?Sized> {
    fn upcast(self: Arc<Self>) -> Arc<T>;
}

impl<T: ?Sized> Upcast<T> for T {
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Declare that a concrete type can be widened into one or more trait objects.
///
/// # Example
/// ```ignore
/// use rat_route::impl_upcast;
///
/// impl_upcast!(DetailScreen => dyn DetailView);
/// impl_upcast!(DetailConfig => dyn RouteConfig, dyn DetailModule);
/// ```
#[macro_export]
macro_rules! impl_upcast {
    ($from:ty => $($to:ty),+ $(,)?) => {
        $(
            impl $crate::Upcast<$to> for $from {
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$to> {
                    self
                }
            }
        )+
    };
}
