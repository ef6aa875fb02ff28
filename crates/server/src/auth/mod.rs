pub mod bootstrap;
pub mod catalog;
pub mod jwt;
pub mod password;
pub mod providers;
pub mod session;
pub mod token;
mod types;

pub use types::{AdminIdentity, Claims, Identity, TokenBundle};
