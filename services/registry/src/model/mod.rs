//! Registry data model module.
//!
//! # Purpose
//! Re-exports entity kinds, natural and tagged keys, specification/status payloads, and the
//! entity records used by the store, validators, handlers, and services.
mod entity;
mod key;
mod kind;
mod specification;

pub use entity::{
    AnyEntity, ConsumerBinding, Domain, Entity, Infrastructure, Process, ProcessBinding,
    ProcessInputStreamBinding, ProcessOutputStreamBinding, ProducerBinding, Schema, Stream,
    StreamBinding,
};
pub use key::{
    ConsumerBindingKey, DomainKey, EntityKey, InfrastructureKey, ProcessBindingKey, ProcessKey,
    ProducerBindingKey, SchemaKey, StreamBindingKey, StreamKey, TaggedKey,
};
pub use kind::EntityKind;
pub use specification::{DEFAULT_TYPE, Specification, Status, Tag};
