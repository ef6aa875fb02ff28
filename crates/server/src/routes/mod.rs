mod entry;
mod graphql;
pub mod middleware;
mod public;

pub use entry::{GRAPHQL_PATH, router};
