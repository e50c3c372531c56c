//! Credential handling: structural decoding, the expiry check, and the
//! durable slot the raw token lives in between runs.

pub mod codec;
pub mod expiry;
pub mod storage;

pub use codec::{decode, Claims, DecodeError};
pub use expiry::{is_usable, is_usable_at};
pub use storage::{CredentialStorage, FileStorage, KeyringStorage, MemoryStorage};
