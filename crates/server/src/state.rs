use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    auth::providers::AuthProviders, config::AppConfig, graphql::AppSchema,
    graphql::build_schema, services::notification::MessageSender,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DatabaseConnection,
    pub auth_providers: AuthProviders,
    pub messenger: Arc<dyn MessageSender>,
    pub schema: AppSchema,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
        auth_providers: AuthProviders,
        messenger: Arc<dyn MessageSender>,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            config,
            auth_providers,
            messenger,
            schema: build_schema(),
        })
    }
}
