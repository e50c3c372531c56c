//! Session lifecycle: the held credential, the user's profile, and their
//! permission set, with `login`, `refresh_profile` and `logout` as the only
//! ways to change them.

pub mod store;

pub use store::{LoginError, SessionSnapshot, SessionStore};
