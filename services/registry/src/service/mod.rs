//! Per-kind lifecycle services.
//!
//! # Purpose
//! [`EntityService`] orchestrates create, update, upsert, status updates, reads, and deletes
//! for one entity kind. It composes the kind's view, validator, and handler set over the
//! shared store, and hands deletes to the [`DeletionCoordinator`].
//!
//! # Ordering
//! - create: existence check, validation, handler resolution, `handle_insert`, persist.
//! - update: existence check, validation against the stored entity, `handle_update`, carry
//!   the stored status forward, persist.
//! - update_status: persist the entity with the new status. No validation, no handler.
//!
//! The existence check and the write are not atomic; two concurrent creates of one key
//! both succeed and the later log record wins.
use std::sync::Arc;

use crate::error::{RegistryResult, ValidationError};
use crate::handler::HandlerSet;
use crate::model::{Entity, EntityKey, Status};
use crate::store::EntityStore;
use crate::validator::Validator;
use crate::view::View;

mod delete;
mod query;

pub use delete::DeletionCoordinator;
pub use query::KeyQuery;

pub struct EntityService<E: Entity> {
    store: Arc<EntityStore>,
    view: View<E>,
    validator: Arc<dyn Validator<E>>,
    handlers: Arc<HandlerSet<E>>,
    coordinator: Arc<DeletionCoordinator>,
}

impl<E: Entity> Clone for EntityService<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            view: self.view.clone(),
            validator: Arc::clone(&self.validator),
            handlers: Arc::clone(&self.handlers),
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

impl<E: Entity> EntityService<E> {
    pub fn new(
        store: Arc<EntityStore>,
        validator: Arc<dyn Validator<E>>,
        handlers: Arc<HandlerSet<E>>,
        coordinator: Arc<DeletionCoordinator>,
    ) -> Self {
        Self {
            view: View::new(store.clone()),
            store,
            validator,
            handlers,
            coordinator,
        }
    }

    pub fn view(&self) -> &View<E> {
        &self.view
    }

    pub async fn create(&self, entity: E) -> RegistryResult<E> {
        if self.view.exists(entity.key()).await? {
            return Err(ValidationError::AlreadyExists {
                kind: E::KIND,
                key: entity.key().to_string(),
            }
            .into());
        }
        self.validator.validate_for_create(&entity).await?;
        let handler = self.handlers.resolve(&entity)?;
        let specification = handler.handle_insert(&entity).await?;

        let mut stored = entity;
        stored.set_specification(specification);
        self.persist(&stored, "create").await?;
        Ok(stored)
    }

    pub async fn update(&self, entity: E) -> RegistryResult<E> {
        let Some(existing) = self.view.get(entity.key()).await? else {
            return Err(ValidationError::NotFound {
                kind: E::KIND,
                key: entity.key().to_string(),
            }
            .into());
        };
        self.validator
            .validate_for_update(&entity, &existing)
            .await?;
        let handler = self.handlers.resolve(&entity)?;
        let specification = handler.handle_update(&entity, &existing).await?;

        let mut stored = entity;
        stored.set_specification(specification);
        stored.set_status(existing.status().clone());
        self.persist(&stored, "update").await?;
        Ok(stored)
    }

    /// Update when the key exists, otherwise create.
    pub async fn upsert(&self, entity: E) -> RegistryResult<E> {
        if self.view.exists(entity.key()).await? {
            self.update(entity).await
        } else {
            self.create(entity).await
        }
    }

    /// Persist `entity` with `status`. Bypasses validation and handlers.
    pub async fn update_status(&self, entity: E, status: Status) -> RegistryResult<E> {
        let mut stored = entity;
        stored.set_status(status);
        self.persist(&stored, "update_status").await?;
        Ok(stored)
    }

    pub async fn get(&self, key: &E::Key) -> RegistryResult<Option<E>> {
        Ok(self.view.get(key).await?)
    }

    pub async fn find_all<P>(&self, predicate: P) -> RegistryResult<Vec<E>>
    where
        P: Fn(&E) -> bool + Send + Sync,
    {
        Ok(self.view.find_all(predicate).await?)
    }

    pub async fn find_by_key(&self, query: &KeyQuery) -> RegistryResult<Vec<E>> {
        self.find_all(|entity| query.matches(entity.key())).await
    }

    pub async fn delete(&self, entity: &E) -> RegistryResult<()> {
        self.coordinator.delete(&entity.key().to_tagged()).await
    }

    async fn persist(&self, entity: &E, op: &'static str) -> RegistryResult<()> {
        let offset = self.store.put(entity.clone().into_any()).await?;
        metrics::counter!(
            "registry_entity_operations_total",
            "kind" => E::KIND.as_str(),
            "op" => op
        )
        .increment(1);
        tracing::info!(kind = %E::KIND, key = %entity.key(), op, offset, "entity stored");
        Ok(())
    }
}
