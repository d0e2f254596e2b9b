//! Access policy middleware around entity services.
//!
//! # Purpose
//! [`Authorized`] wraps an [`EntityService`] and consults an [`AccessPolicy`] before every
//! mutating call and on every entity returned by a read. How a policy decides is up to the
//! embedding application; [`PermitAll`] is the default.
//!
//! # Semantics
//! - Mutations the policy rejects fail with `Forbidden` before the service is called.
//! - Reads never fail on policy grounds; entities the policy hides are filtered out.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};
use crate::model::{AnyEntity, Entity, Status};
use crate::service::{EntityService, KeyQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    UpdateStatus,
    Delete,
    Read,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::UpdateStatus => "update_status",
            Operation::Delete => "delete",
            Operation::Read => "read",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "update_status" => Ok(Operation::UpdateStatus),
            "delete" => Ok(Operation::Delete),
            "read" => Ok(Operation::Read),
            _ => Err(()),
        }
    }
}

/// Caller identity handed to the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Principal {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }
}

pub trait AccessPolicy: Send + Sync {
    fn permits(&self, principal: &Principal, operation: Operation, entity: &AnyEntity) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PermitAll;

impl AccessPolicy for PermitAll {
    fn permits(&self, _principal: &Principal, _operation: Operation, _entity: &AnyEntity) -> bool {
        true
    }
}

pub struct Authorized<E: Entity> {
    inner: EntityService<E>,
    policy: Arc<dyn AccessPolicy>,
}

impl<E: Entity> Authorized<E> {
    pub fn new(inner: EntityService<E>, policy: Arc<dyn AccessPolicy>) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &EntityService<E> {
        &self.inner
    }

    pub async fn create(&self, principal: &Principal, entity: E) -> RegistryResult<E> {
        self.check(principal, Operation::Create, &entity)?;
        self.inner.create(entity).await
    }

    pub async fn update(&self, principal: &Principal, entity: E) -> RegistryResult<E> {
        self.check(principal, Operation::Update, &entity)?;
        self.inner.update(entity).await
    }

    pub async fn upsert(&self, principal: &Principal, entity: E) -> RegistryResult<E> {
        let operation = if self.inner.view().exists(entity.key()).await? {
            Operation::Update
        } else {
            Operation::Create
        };
        self.check(principal, operation, &entity)?;
        self.inner.upsert(entity).await
    }

    pub async fn update_status(
        &self,
        principal: &Principal,
        entity: E,
        status: Status,
    ) -> RegistryResult<E> {
        self.check(principal, Operation::UpdateStatus, &entity)?;
        self.inner.update_status(entity, status).await
    }

    pub async fn delete(&self, principal: &Principal, entity: &E) -> RegistryResult<()> {
        self.check(principal, Operation::Delete, entity)?;
        self.inner.delete(entity).await
    }

    pub async fn get(&self, principal: &Principal, key: &E::Key) -> RegistryResult<Option<E>> {
        let found = self.inner.get(key).await?;
        Ok(found.filter(|entity| self.readable(principal, entity)))
    }

    pub async fn find_all<P>(&self, principal: &Principal, predicate: P) -> RegistryResult<Vec<E>>
    where
        P: Fn(&E) -> bool + Send + Sync,
    {
        let found = self.inner.find_all(predicate).await?;
        Ok(self.filter_readable(principal, found))
    }

    pub async fn find_by_key(
        &self,
        principal: &Principal,
        query: &KeyQuery,
    ) -> RegistryResult<Vec<E>> {
        let found = self.inner.find_by_key(query).await?;
        Ok(self.filter_readable(principal, found))
    }

    fn check(&self, principal: &Principal, operation: Operation, entity: &E) -> RegistryResult<()> {
        if self
            .policy
            .permits(principal, operation, &entity.clone().into_any())
        {
            return Ok(());
        }
        tracing::debug!(
            subject = %principal.subject,
            %operation,
            kind = %E::KIND,
            key = %entity.key(),
            "operation denied by policy"
        );
        Err(RegistryError::Forbidden {
            operation,
            kind: E::KIND,
            key: entity.key().to_string(),
        })
    }

    fn readable(&self, principal: &Principal, entity: &E) -> bool {
        self.policy
            .permits(principal, Operation::Read, &entity.clone().into_any())
    }

    fn filter_readable(&self, principal: &Principal, entities: Vec<E>) -> Vec<E> {
        entities
            .into_iter()
            .filter(|entity| self.readable(principal, entity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Operation;

    #[test]
    fn operation_string_roundtrip() {
        for operation in [
            Operation::Create,
            Operation::Update,
            Operation::UpdateStatus,
            Operation::Delete,
            Operation::Read,
        ] {
            assert_eq!(operation.as_str().parse::<Operation>().ok(), Some(operation));
            assert_eq!(operation.to_string(), operation.as_str());
        }
        assert!("write".parse::<Operation>().is_err());
    }
}
