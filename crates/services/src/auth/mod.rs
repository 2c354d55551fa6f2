pub mod cookie;
pub mod oidc;
pub mod ports;
pub mod registry;
pub mod session;

pub use oidc::OidcClient;
pub use ports::*;
pub use registry::ProviderRegistry;
pub use session::{MemorySessionStore, PendingLoginStore};
