use async_graphql::{EmptySubscription, Schema};

use super::{mutation::MutationRoot, query::QueryRoot};

const MAX_DEPTH: usize = 12;
const MAX_COMPLEXITY: usize = 500;

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Built once at startup; each request attaches its own `RequestContext`.
pub fn build_schema() -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .limit_depth(MAX_DEPTH)
        .limit_complexity(MAX_COMPLEXITY)
        .finish()
}
