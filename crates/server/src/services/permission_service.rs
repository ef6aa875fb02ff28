use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::{Mutex, OnceCell};
use uuid::Uuid;

use crate::{
    db::{dao::PermissionDao, entities::permission},
    error::AppError,
};

/// Answers permission questions by walking
/// admin → live role assignments → role grants → permission.
#[derive(Clone)]
pub struct PermissionResolver {
    permissions: PermissionDao,
}

impl PermissionResolver {
    pub fn new(permissions: PermissionDao) -> Self {
        Self { permissions }
    }

    pub async fn effective_permissions(
        &self,
        admin_id: Uuid,
    ) -> Result<Vec<permission::Model>, AppError> {
        Ok(self
            .permissions
            .effective_for(admin_id, Utc::now().fixed_offset())
            .await?)
    }

    pub async fn has_permission(&self, admin_id: Uuid, name: &str) -> Result<bool, AppError> {
        self.has_any_permission(admin_id, &[name]).await
    }

    pub async fn has_any_permission(
        &self,
        admin_id: Uuid,
        names: &[&str],
    ) -> Result<bool, AppError> {
        let names: Vec<String> = names.iter().map(|name| name.to_string()).collect();
        let held = self
            .permissions
            .count_held(admin_id, &names, Utc::now().fixed_offset())
            .await?;
        Ok(held > 0)
    }
}

/// Permission answers for one admin, remembered for the life of a request.
pub struct RequestPermissions {
    resolver: PermissionResolver,
    admin_id: Uuid,
    known: Mutex<HashMap<String, bool>>,
    full: OnceCell<Vec<permission::Model>>,
}

impl RequestPermissions {
    pub fn new(resolver: PermissionResolver, admin_id: Uuid) -> Self {
        Self {
            resolver,
            admin_id,
            known: Mutex::new(HashMap::new()),
            full: OnceCell::new(),
        }
    }

    pub fn admin_id(&self) -> Uuid {
        self.admin_id
    }

    pub async fn has(&self, name: &str) -> Result<bool, AppError> {
        if let Some(full) = self.full.get() {
            return Ok(full.iter().any(|permission| permission.name == name));
        }

        let mut known = self.known.lock().await;
        if let Some(held) = known.get(name) {
            return Ok(*held);
        }
        let held = self.resolver.has_permission(self.admin_id, name).await?;
        known.insert(name.to_string(), held);
        Ok(held)
    }

    pub async fn has_any(&self, names: &[&str]) -> Result<bool, AppError> {
        if let Some(full) = self.full.get() {
            return Ok(full
                .iter()
                .any(|permission| names.contains(&permission.name.as_str())));
        }

        let mut known = self.known.lock().await;
        if names.iter().any(|name| known.get(*name) == Some(&true)) {
            return Ok(true);
        }
        let unknown: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| !known.contains_key(*name))
            .collect();
        if unknown.is_empty() {
            return Ok(false);
        }

        let held = self
            .resolver
            .has_any_permission(self.admin_id, &unknown)
            .await?;
        if !held {
            for name in unknown {
                known.insert(name.to_string(), false);
            }
        } else if let [only] = unknown.as_slice() {
            known.insert(only.to_string(), true);
        }
        Ok(held)
    }

    pub async fn all(&self) -> Result<&[permission::Model], AppError> {
        self.full
            .get_or_try_init(|| self.resolver.effective_permissions(self.admin_id))
            .await
            .map(Vec::as_slice)
    }
}
