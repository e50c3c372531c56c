//! Session and request-authorization gateway between a UI and a remote API.
//!
//! - `auth`: credential decoding, the local expiry check, durable storage
//! - `api`: the interceptor pipeline and typed client
//! - `session`: the session store (`login`, `refresh_profile`, `logout`)
//! - `guard`: the navigation guard and route table
//! - `gateway`: wiring of all of the above

pub mod api;
pub mod auth;
pub mod config;
pub mod gateway;
pub mod guard;
pub mod models;
pub mod session;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, ApiError, Notice, Notifier};
pub use auth::{is_usable, Claims, CredentialStorage, DecodeError};
pub use config::{GatewayConfig, StorageKind};
pub use gateway::{Gateway, GatewayBuilder};
pub use guard::{NavigationGuard, NavigationOutcome, RouteRequirement, RouteTable};
pub use models::{LoginRequest, PermissionSet, TokenResponse, UserProfile};
pub use session::{LoginError, SessionSnapshot, SessionStore};
