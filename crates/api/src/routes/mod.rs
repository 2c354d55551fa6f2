pub mod auth;

pub use auth::{callback, index_page, login, login_fail, login_success, logout};
