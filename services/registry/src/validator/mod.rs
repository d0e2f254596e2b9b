//! Structural and referential validation of entities before they are stored.
//!
//! # Purpose
//! One validator per kind checks required fields, naming rules, specification rules, and
//! that every referenced entity exists. Validators are stateless apart from the views they
//! read; they never mutate the store. The first violation found is returned.
//!
//! # Update rules
//! Updates run the same checks as creation and additionally reject changes to immutable
//! fields (`specification.type` for every kind, a stream's schema).
use async_trait::async_trait;

use crate::error::RegistryResult;
use crate::model::Entity;

mod kinds;
mod rules;

pub use kinds::{
    ConsumerBindingValidator, DomainValidator, InfrastructureValidator, ProcessBindingValidator,
    ProcessValidator, ProducerBindingValidator, SchemaValidator, StreamBindingValidator,
    StreamValidator,
};
pub use rules::{MAX_NAME_LEN, check_name, check_specification};

#[async_trait]
pub trait Validator<E: Entity>: Send + Sync {
    async fn validate_for_create(&self, entity: &E) -> RegistryResult<()>;

    async fn validate_for_update(&self, entity: &E, existing: &E) -> RegistryResult<()> {
        rules::check_type_unchanged(entity, existing)?;
        self.validate_for_create(entity).await
    }
}
