pub mod context;
pub mod error;
pub mod mutation;
pub mod query;
pub mod schema;
pub mod types;

pub use context::RequestContext;
pub use schema::{AppSchema, build_schema};
