//! Deletion coordinator.
//!
//! # Purpose
//! Every delete, whichever kind it starts from, goes through [`DeletionCoordinator::delete`]:
//!
//! 1. An absent key is a successful no-op.
//! 2. The kind's handler runs `handle_delete`; a failure aborts before any store mutation.
//! 3. The target and, recursively, every entity it owns are checked against their blocking
//!    dependents. Any match fails with `InUse` and nothing is removed.
//! 4. Owned dependents are deleted through the coordinator in the graph's order, so their
//!    own handlers and cascades run.
//! 5. The target is tombstoned.
//!
//! Cascades are sequential and not transactional. A failure part way leaves the already
//! deleted dependents gone; retrying is safe because delete is idempotent.
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{RegistryError, RegistryResult};
use crate::graph::RelationshipGraph;
use crate::handler::DeleteHook;
use crate::model::{AnyEntity, EntityKind, TaggedKey};
use crate::store::EntityStore;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub struct DeletionCoordinator {
    store: Arc<EntityStore>,
    graph: RelationshipGraph,
    hooks: HashMap<EntityKind, Arc<dyn DeleteHook>>,
}

impl DeletionCoordinator {
    pub fn new(store: Arc<EntityStore>, graph: RelationshipGraph) -> Self {
        Self {
            store,
            graph,
            hooks: HashMap::new(),
        }
    }

    /// Register the delete hook (normally the kind's handler set) run for `kind`.
    pub fn with_hook(mut self, kind: EntityKind, hook: Arc<dyn DeleteHook>) -> Self {
        self.hooks.insert(kind, hook);
        self
    }

    pub fn delete<'a>(&'a self, key: &'a TaggedKey) -> BoxFuture<'a, RegistryResult<()>> {
        Box::pin(async move {
            let Some(entity) = self.store.get(key).await? else {
                tracing::debug!(%key, "delete of absent entity ignored");
                return Ok(());
            };
            let kind = entity.kind();

            if let Some(hook) = self.hooks.get(&kind) {
                hook.before_delete(&entity).await?;
            }

            self.ensure_unreferenced(&entity).await?;

            for dependency in self.graph.owned(kind) {
                let dependents = self
                    .store
                    .find_all(dependency.kind, |candidate| {
                        dependency.matches(candidate, key)
                    })
                    .await?;
                for dependent in dependents {
                    tracing::debug!(
                        %key,
                        dependent = %dependent.tagged_key(),
                        relation = dependency.relation,
                        "cascading delete"
                    );
                    self.delete(&dependent.tagged_key()).await?;
                }
            }

            self.store.delete(key).await?;
            metrics::counter!(
                "registry_entity_operations_total",
                "kind" => kind.as_str(),
                "op" => "delete"
            )
            .increment(1);
            tracing::info!(%kind, key = %entity.key_string(), "entity deleted");
            Ok(())
        })
    }

    /// Fails with `InUse` if `entity` or anything it owns still has a blocking dependent.
    fn ensure_unreferenced<'a>(
        &'a self,
        entity: &'a AnyEntity,
    ) -> BoxFuture<'a, RegistryResult<()>> {
        Box::pin(async move {
            let kind = entity.kind();
            let key = entity.tagged_key();
            for dependency in self.graph.blocking(kind) {
                let blockers = self
                    .store
                    .find_all(dependency.kind, |candidate| {
                        dependency.matches(candidate, &key)
                    })
                    .await?;
                if let Some(blocker) = blockers.first() {
                    return Err(RegistryError::InUse {
                        kind,
                        key: entity.key_string(),
                        dependent_kind: blocker.kind(),
                        dependent_key: blocker.key_string(),
                    });
                }
            }
            for dependency in self.graph.owned(kind) {
                let owned = self
                    .store
                    .find_all(dependency.kind, |candidate| {
                        dependency.matches(candidate, &key)
                    })
                    .await?;
                for child in &owned {
                    self.ensure_unreferenced(child).await?;
                }
            }
            Ok(())
        })
    }
}
