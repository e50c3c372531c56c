//! Navigation gating between protected and public views.

pub mod navigation;
pub mod navigator;
pub mod routes;

pub use navigation::{decide, NavigationGuard, NavigationOutcome};
pub use navigator::{NavigationHistory, Navigator};
pub use routes::{RouteRequirement, RouteTable};
