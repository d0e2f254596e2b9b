//! Registry wiring.
//!
//! # Purpose
//! Builds one [`EntityService`] per kind over a single shared [`EntityStore`], with the
//! standard validators, the configured handler sets, and one [`DeletionCoordinator`] whose
//! delete hooks are those same handler sets.
use std::sync::Arc;

use registry_log::AppendOnlyLog;

use crate::graph::RelationshipGraph;
use crate::handler::{DeleteHook, HandlerSet};
use crate::model::{
    ConsumerBinding, Domain, Entity, Infrastructure, Process, ProcessBinding, ProducerBinding,
    Schema, Stream, StreamBinding,
};
use crate::service::{DeletionCoordinator, EntityService};
use crate::store::{EntityStore, StoreConfig, StoreResult};
use crate::validator::{
    ConsumerBindingValidator, DomainValidator, InfrastructureValidator, ProcessBindingValidator,
    ProcessValidator, ProducerBindingValidator, SchemaValidator, StreamBindingValidator,
    StreamValidator, Validator,
};

pub struct Validators {
    pub domain: Arc<dyn Validator<Domain>>,
    pub schema: Arc<dyn Validator<Schema>>,
    pub stream: Arc<dyn Validator<Stream>>,
    pub infrastructure: Arc<dyn Validator<Infrastructure>>,
    pub stream_binding: Arc<dyn Validator<StreamBinding>>,
    pub producer_binding: Arc<dyn Validator<ProducerBinding>>,
    pub consumer_binding: Arc<dyn Validator<ConsumerBinding>>,
    pub process: Arc<dyn Validator<Process>>,
    pub process_binding: Arc<dyn Validator<ProcessBinding>>,
}

impl Validators {
    pub fn standard(store: Arc<EntityStore>) -> Self {
        Self {
            domain: Arc::new(DomainValidator),
            schema: Arc::new(SchemaValidator::new(store.clone())),
            stream: Arc::new(StreamValidator::new(store.clone())),
            infrastructure: Arc::new(InfrastructureValidator),
            stream_binding: Arc::new(StreamBindingValidator::new(store.clone())),
            producer_binding: Arc::new(ProducerBindingValidator::new(store.clone())),
            consumer_binding: Arc::new(ConsumerBindingValidator::new(store.clone())),
            process: Arc::new(ProcessValidator::new(store.clone())),
            process_binding: Arc::new(ProcessBindingValidator::new(store)),
        }
    }
}

/// Handler sets per kind. The default registers only the identity handler everywhere.
#[derive(Default)]
pub struct Handlers {
    pub domain: HandlerSet<Domain>,
    pub schema: HandlerSet<Schema>,
    pub stream: HandlerSet<Stream>,
    pub infrastructure: HandlerSet<Infrastructure>,
    pub stream_binding: HandlerSet<StreamBinding>,
    pub producer_binding: HandlerSet<ProducerBinding>,
    pub consumer_binding: HandlerSet<ConsumerBinding>,
    pub process: HandlerSet<Process>,
    pub process_binding: HandlerSet<ProcessBinding>,
}

pub struct Registry {
    store: Arc<EntityStore>,
    coordinator: Arc<DeletionCoordinator>,
    pub domains: EntityService<Domain>,
    pub schemas: EntityService<Schema>,
    pub streams: EntityService<Stream>,
    pub infrastructure: EntityService<Infrastructure>,
    pub stream_bindings: EntityService<StreamBinding>,
    pub producer_bindings: EntityService<ProducerBinding>,
    pub consumer_bindings: EntityService<ConsumerBinding>,
    pub processes: EntityService<Process>,
    pub process_bindings: EntityService<ProcessBinding>,
}

impl Registry {
    /// Open the store over `log`, replay it, and wire the default registry.
    pub async fn open(log: Arc<dyn AppendOnlyLog>, config: StoreConfig) -> StoreResult<Self> {
        let store = EntityStore::open(log, config).await?;
        Ok(Self::new(store))
    }

    pub fn new(store: Arc<EntityStore>) -> Self {
        let validators = Validators::standard(store.clone());
        Self::with_parts(store, validators, Handlers::default())
    }

    pub fn with_handlers(store: Arc<EntityStore>, handlers: Handlers) -> Self {
        let validators = Validators::standard(store.clone());
        Self::with_parts(store, validators, handlers)
    }

    pub fn with_parts(store: Arc<EntityStore>, validators: Validators, handlers: Handlers) -> Self {
        let domain = Arc::new(handlers.domain);
        let schema = Arc::new(handlers.schema);
        let stream = Arc::new(handlers.stream);
        let infrastructure = Arc::new(handlers.infrastructure);
        let stream_binding = Arc::new(handlers.stream_binding);
        let producer_binding = Arc::new(handlers.producer_binding);
        let consumer_binding = Arc::new(handlers.consumer_binding);
        let process = Arc::new(handlers.process);
        let process_binding = Arc::new(handlers.process_binding);

        let coordinator = Arc::new(
            DeletionCoordinator::new(store.clone(), RelationshipGraph)
                .with_hook(Domain::KIND, hook(&domain))
                .with_hook(Schema::KIND, hook(&schema))
                .with_hook(Stream::KIND, hook(&stream))
                .with_hook(Infrastructure::KIND, hook(&infrastructure))
                .with_hook(StreamBinding::KIND, hook(&stream_binding))
                .with_hook(ProducerBinding::KIND, hook(&producer_binding))
                .with_hook(ConsumerBinding::KIND, hook(&consumer_binding))
                .with_hook(Process::KIND, hook(&process))
                .with_hook(ProcessBinding::KIND, hook(&process_binding)),
        );

        let service = ServiceFactory {
            store: &store,
            coordinator: &coordinator,
        };
        Self {
            domains: service.build(validators.domain, domain),
            schemas: service.build(validators.schema, schema),
            streams: service.build(validators.stream, stream),
            infrastructure: service.build(validators.infrastructure, infrastructure),
            stream_bindings: service.build(validators.stream_binding, stream_binding),
            producer_bindings: service.build(validators.producer_binding, producer_binding),
            consumer_bindings: service.build(validators.consumer_binding, consumer_binding),
            processes: service.build(validators.process, process),
            process_bindings: service.build(validators.process_binding, process_binding),
            store: store.clone(),
            coordinator: coordinator.clone(),
        }
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<DeletionCoordinator> {
        &self.coordinator
    }
}

fn hook<E: Entity>(handlers: &Arc<HandlerSet<E>>) -> Arc<dyn DeleteHook> {
    handlers.clone()
}

struct ServiceFactory<'a> {
    store: &'a Arc<EntityStore>,
    coordinator: &'a Arc<DeletionCoordinator>,
}

impl ServiceFactory<'_> {
    fn build<E: Entity>(
        &self,
        validator: Arc<dyn Validator<E>>,
        handlers: Arc<HandlerSet<E>>,
    ) -> EntityService<E> {
        EntityService::new(
            self.store.clone(),
            validator,
            handlers,
            self.coordinator.clone(),
        )
    }
}
