//! Pluggable per-kind handlers.
//!
//! # Purpose
//! A handler derives the specification that is actually stored and performs external side
//! effects (provisioning, cleanup) when an entity is inserted, updated, or deleted. Several
//! handlers can be registered per kind; the entity's `specification.type` selects one.
//!
//! # Failure semantics
//! - Insert/update: a handler error aborts before anything is persisted.
//! - Delete: a handler error aborts before any store mutation (fail-closed).
//! - An unregistered `type` is a validation error raised before any handler runs.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{HandlerError, RegistryError, ValidationError};
use crate::model::{AnyEntity, DEFAULT_TYPE, Entity, Specification};

#[async_trait]
pub trait Handler<E: Entity>: Send + Sync {
    /// Value of `specification.type` this handler serves.
    fn handler_type(&self) -> &str;

    async fn handle_insert(&self, entity: &E) -> Result<Specification, HandlerError> {
        Ok(entity.specification().clone())
    }

    async fn handle_update(&self, entity: &E, _existing: &E) -> Result<Specification, HandlerError> {
        Ok(entity.specification().clone())
    }

    async fn handle_delete(&self, _entity: &E) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Stores the incoming specification unchanged and has no side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHandler;

#[async_trait]
impl<E: Entity> Handler<E> for IdentityHandler {
    fn handler_type(&self) -> &str {
        DEFAULT_TYPE
    }
}

/// Handlers for one kind, keyed by handler type.
pub struct HandlerSet<E> {
    handlers: HashMap<String, Arc<dyn Handler<E>>>,
}

impl<E: Entity> HandlerSet<E> {
    /// A set holding only the identity handler under the default type.
    pub fn new() -> Self {
        Self::empty().with(Arc::new(IdentityHandler))
    }

    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler`, replacing any handler of the same type.
    pub fn with(mut self, handler: Arc<dyn Handler<E>>) -> Self {
        self.register(handler);
        self
    }

    pub fn register(&mut self, handler: Arc<dyn Handler<E>>) {
        self.handlers
            .insert(handler.handler_type().to_string(), handler);
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// The handler selected by the entity's specification type.
    pub fn resolve(&self, entity: &E) -> Result<Arc<dyn Handler<E>>, ValidationError> {
        let handler_type = &entity.specification().kind;
        self.handlers
            .get(handler_type)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownHandler {
                kind: E::KIND,
                handler_type: handler_type.clone(),
            })
    }
}

impl<E: Entity> Default for HandlerSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind-erased delete hook used by the deletion coordinator.
#[async_trait]
pub trait DeleteHook: Send + Sync {
    async fn before_delete(&self, entity: &AnyEntity) -> Result<(), RegistryError>;
}

#[async_trait]
impl<E: Entity> DeleteHook for HandlerSet<E> {
    async fn before_delete(&self, entity: &AnyEntity) -> Result<(), RegistryError> {
        let Some(entity) = E::from_any_ref(entity) else {
            return Ok(());
        };
        let handler = self.resolve(entity)?;
        handler.handle_delete(entity).await?;
        Ok(())
    }
}
