//! Typed read projection of one entity kind over the shared store.
use std::marker::PhantomData;
use std::sync::Arc;

use crate::model::{Entity, EntityKey};
use crate::store::{EntityStore, StoreResult};

pub struct View<E> {
    store: Arc<EntityStore>,
    _kind: PhantomData<fn() -> E>,
}

impl<E> Clone for View<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _kind: PhantomData,
        }
    }
}

impl<E: Entity> View<E> {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            store,
            _kind: PhantomData,
        }
    }

    pub async fn get(&self, key: &E::Key) -> StoreResult<Option<E>> {
        let found = self.store.get(&key.to_tagged()).await?;
        Ok(found.and_then(E::from_any))
    }

    pub async fn find_all<P>(&self, predicate: P) -> StoreResult<Vec<E>>
    where
        P: Fn(&E) -> bool,
    {
        let found = self
            .store
            .find_all(E::KIND, |any| E::from_any_ref(any).is_some_and(&predicate))
            .await?;
        Ok(found.into_iter().filter_map(E::from_any).collect())
    }

    pub async fn exists(&self, key: &E::Key) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
