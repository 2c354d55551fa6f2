pub mod auth;

pub use auth::{provider_gate, CurrentSession, GateState};
