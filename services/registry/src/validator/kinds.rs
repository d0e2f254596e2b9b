// Per-kind validators.
use async_trait::async_trait;
use std::sync::Arc;

use super::Validator;
use super::rules::{check_name, check_specification, check_type_unchanged, require};
use crate::error::{RegistryResult, ValidationError};
use crate::model::{
    ConsumerBinding, Domain, Entity, EntityKind, Infrastructure, Process, ProcessBinding,
    ProducerBinding, Schema, Stream, StreamBinding,
};
use crate::store::EntityStore;
use crate::view::View;

#[derive(Debug, Clone, Copy, Default)]
pub struct DomainValidator;

#[async_trait]
impl Validator<Domain> for DomainValidator {
    async fn validate_for_create(&self, entity: &Domain) -> RegistryResult<()> {
        check_name(Domain::KIND, "key.name", &entity.key.name)?;
        check_specification(Domain::KIND, &entity.specification)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InfrastructureValidator;

#[async_trait]
impl Validator<Infrastructure> for InfrastructureValidator {
    async fn validate_for_create(&self, entity: &Infrastructure) -> RegistryResult<()> {
        check_name(Infrastructure::KIND, "key.name", &entity.key.name)?;
        check_specification(Infrastructure::KIND, &entity.specification)?;
        Ok(())
    }
}

pub struct SchemaValidator {
    domains: View<Domain>,
}

impl SchemaValidator {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            domains: View::new(store),
        }
    }
}

#[async_trait]
impl Validator<Schema> for SchemaValidator {
    async fn validate_for_create(&self, entity: &Schema) -> RegistryResult<()> {
        check_name(Schema::KIND, "key.domain", &entity.key.domain)?;
        check_name(Schema::KIND, "key.name", &entity.key.name)?;
        check_specification(Schema::KIND, &entity.specification)?;
        let key = entity.key.to_string();
        require(&self.domains, Schema::KIND, &key, &entity.key.domain_key()).await
    }
}

pub struct StreamValidator {
    domains: View<Domain>,
    schemas: View<Schema>,
}

impl StreamValidator {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            domains: View::new(store.clone()),
            schemas: View::new(store),
        }
    }
}

#[async_trait]
impl Validator<Stream> for StreamValidator {
    async fn validate_for_create(&self, entity: &Stream) -> RegistryResult<()> {
        check_name(Stream::KIND, "key.domain", &entity.key.domain)?;
        check_name(Stream::KIND, "key.name", &entity.key.name)?;
        check_name(Stream::KIND, "schema.name", &entity.schema.name)?;
        check_specification(Stream::KIND, &entity.specification)?;
        let key = entity.key.to_string();
        require(&self.domains, Stream::KIND, &key, &entity.key.domain_key()).await?;
        require(&self.schemas, Stream::KIND, &key, &entity.schema).await
    }

    async fn validate_for_update(&self, entity: &Stream, existing: &Stream) -> RegistryResult<()> {
        check_type_unchanged(entity, existing)?;
        if entity.schema != existing.schema {
            return Err(ValidationError::Immutable {
                kind: Stream::KIND,
                key: entity.key.to_string(),
                field: "schema",
            }
            .into());
        }
        self.validate_for_create(entity).await
    }
}

pub struct StreamBindingValidator {
    streams: View<Stream>,
    infrastructure: View<Infrastructure>,
}

impl StreamBindingValidator {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            streams: View::new(store.clone()),
            infrastructure: View::new(store),
        }
    }
}

#[async_trait]
impl Validator<StreamBinding> for StreamBindingValidator {
    async fn validate_for_create(&self, entity: &StreamBinding) -> RegistryResult<()> {
        check_name(
            StreamBinding::KIND,
            "key.infrastructure.name",
            &entity.key.infrastructure.name,
        )?;
        check_specification(StreamBinding::KIND, &entity.specification)?;
        let key = entity.key.to_string();
        require(&self.streams, StreamBinding::KIND, &key, &entity.key.stream).await?;
        require(
            &self.infrastructure,
            StreamBinding::KIND,
            &key,
            &entity.key.infrastructure,
        )
        .await
    }
}

pub struct ProducerBindingValidator {
    stream_bindings: View<StreamBinding>,
}

impl ProducerBindingValidator {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            stream_bindings: View::new(store),
        }
    }
}

#[async_trait]
impl Validator<ProducerBinding> for ProducerBindingValidator {
    async fn validate_for_create(&self, entity: &ProducerBinding) -> RegistryResult<()> {
        check_name(ProducerBinding::KIND, "key.producer", &entity.key.producer)?;
        check_specification(ProducerBinding::KIND, &entity.specification)?;
        let key = entity.key.to_string();
        require(
            &self.stream_bindings,
            ProducerBinding::KIND,
            &key,
            &entity.key.stream_binding,
        )
        .await
    }
}

pub struct ConsumerBindingValidator {
    stream_bindings: View<StreamBinding>,
}

impl ConsumerBindingValidator {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            stream_bindings: View::new(store),
        }
    }
}

#[async_trait]
impl Validator<ConsumerBinding> for ConsumerBindingValidator {
    async fn validate_for_create(&self, entity: &ConsumerBinding) -> RegistryResult<()> {
        check_name(ConsumerBinding::KIND, "key.consumer", &entity.key.consumer)?;
        check_specification(ConsumerBinding::KIND, &entity.specification)?;
        let key = entity.key.to_string();
        require(
            &self.stream_bindings,
            ConsumerBinding::KIND,
            &key,
            &entity.key.stream_binding,
        )
        .await
    }
}

pub struct ProcessValidator {
    domains: View<Domain>,
}

impl ProcessValidator {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            domains: View::new(store),
        }
    }
}

#[async_trait]
impl Validator<Process> for ProcessValidator {
    async fn validate_for_create(&self, entity: &Process) -> RegistryResult<()> {
        check_name(Process::KIND, "key.domain", &entity.key.domain)?;
        check_name(Process::KIND, "key.name", &entity.key.name)?;
        if entity.zones.is_empty() {
            return Err(ValidationError::MissingField {
                kind: Process::KIND,
                field: "zones",
            }
            .into());
        }
        for zone in &entity.zones {
            check_name(Process::KIND, "zones", zone)?;
        }
        check_specification(Process::KIND, &entity.specification)?;
        let key = entity.key.to_string();
        require(&self.domains, Process::KIND, &key, &entity.key.domain_key()).await
    }
}

pub struct ProcessBindingValidator {
    processes: View<Process>,
    stream_bindings: View<StreamBinding>,
}

impl ProcessBindingValidator {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            processes: View::new(store.clone()),
            stream_bindings: View::new(store),
        }
    }
}

#[async_trait]
impl Validator<ProcessBinding> for ProcessBindingValidator {
    async fn validate_for_create(&self, entity: &ProcessBinding) -> RegistryResult<()> {
        const KIND: EntityKind = ProcessBinding::KIND;
        check_name(KIND, "key.zone", &entity.key.zone)?;
        check_specification(KIND, &entity.specification)?;
        for input in &entity.inputs {
            if !input.configuration.is_null() && !input.configuration.is_object() {
                return Err(ValidationError::InvalidField {
                    kind: KIND,
                    field: "inputs.configuration",
                    reason: "must be a JSON object".to_string(),
                }
                .into());
            }
        }
        for output in &entity.outputs {
            if !output.configuration.is_null() && !output.configuration.is_object() {
                return Err(ValidationError::InvalidField {
                    kind: KIND,
                    field: "outputs.configuration",
                    reason: "must be a JSON object".to_string(),
                }
                .into());
            }
        }

        let key = entity.key.to_string();
        let Some(process) = self.processes.get(&entity.key.process).await? else {
            return Err(ValidationError::DanglingReference {
                kind: KIND,
                key,
                reference_kind: Process::KIND,
                reference: entity.key.process.to_string(),
            }
            .into());
        };
        if !process.zones.contains(&entity.key.zone) {
            return Err(ValidationError::InvalidField {
                kind: KIND,
                field: "key.zone",
                reason: format!(
                    "zone `{}` is not one of {}'s zones",
                    entity.key.zone, process.key
                ),
            }
            .into());
        }
        for stream_binding in entity.stream_bindings() {
            require(&self.stream_bindings, KIND, &key, stream_binding).await?;
        }
        Ok(())
    }
}
