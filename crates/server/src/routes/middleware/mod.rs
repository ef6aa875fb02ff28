mod guards;

pub use guards::{RequestIdentity, bearer_token};
