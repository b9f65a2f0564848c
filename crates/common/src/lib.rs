//! Common types for the Workspace gateway

mod error;
mod identity;
mod secret;

pub use error::{Error, Result};
pub use identity::IdentityKey;
pub use secret::Secret;
