use bitflags::bitflags;

use super::Screen;

/// The mechanism that triggered a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteType {
    /// Identifier-driven transition that built the destination before the router
    /// was consulted (segue-style).
    Declarative,
    /// Direct source/destination pair supplied by the caller.
    Programmatic,
}

impl RouteType {
    pub const fn flag(self) -> RouteTypes {
        match self {
            RouteType::Declarative => RouteTypes::DECLARATIVE,
            RouteType::Programmatic => RouteTypes::PROGRAMMATIC,
        }
    }
}

impl std::fmt::Display for RouteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteType::Declarative => write!(f, "declarative"),
            RouteType::Programmatic => write!(f, "programmatic"),
        }
    }
}

bitflags! {
    /// Set of route types a destination type accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RouteTypes: u8 {
        const DECLARATIVE = 1 << 0;
        const PROGRAMMATIC = 1 << 1;
    }
}

/// Per-type route capability declaration.
///
/// Usually written with the `#[routable(...)]` attribute. The set is an
/// associated const, so it is identical for every instance of the type.
pub trait Routable: Screen + Sized {
    const ROUTE_TYPES: RouteTypes;

    fn supports(route_type: RouteType) -> bool {
        Self::ROUTE_TYPES.contains(route_type.flag())
    }

    fn supports_declarative_routing() -> bool {
        Self::supports(RouteType::Declarative)
    }

    fn supports_programmatic_routing() -> bool {
        Self::supports(RouteType::Programmatic)
    }
}
