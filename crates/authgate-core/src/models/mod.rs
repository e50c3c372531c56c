//! Data shapes exchanged with the remote API.
//!
//! - `LoginRequest`, `TokenResponse`: the login exchange
//! - `UserProfile`: the current user's record
//! - `PermissionSet`: permission codes granted to the current user

pub mod user;

pub use user::{LoginRequest, PermissionSet, TokenResponse, UserProfile};
