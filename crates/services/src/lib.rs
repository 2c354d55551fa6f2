pub mod auth;

pub use auth::{Identity, ProviderKey, SessionRecord};
