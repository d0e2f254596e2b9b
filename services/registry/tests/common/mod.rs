#![allow(dead_code)]

use registry::Registry;
use registry::model::{
    ConsumerBinding, ConsumerBindingKey, Domain, DomainKey, Infrastructure, InfrastructureKey,
    Process, ProcessBinding, ProcessBindingKey, ProcessInputStreamBinding, ProcessKey,
    ProcessOutputStreamBinding, ProducerBinding, ProducerBindingKey, Schema, SchemaKey,
    Specification, Status, Stream, StreamBinding, StreamBindingKey, StreamKey,
};
use registry::store::StoreConfig;
use registry_log::MemoryLog;
use std::sync::Arc;

pub const DOMAIN: &str = "payments";
pub const INFRA: &str = "kafka-eu";

pub async fn memory_registry() -> (Registry, Arc<MemoryLog>) {
    let log = Arc::new(MemoryLog::new());
    let registry = Registry::open(log.clone(), StoreConfig::default())
        .await
        .expect("open registry");
    (registry, log)
}

pub fn domain(name: &str) -> Domain {
    Domain {
        key: DomainKey::new(name),
        specification: Specification::new(format!("{name} domain")),
        status: Status::default(),
    }
}

pub fn schema(name: &str) -> Schema {
    Schema {
        key: SchemaKey::new(DOMAIN, name),
        specification: Specification::default(),
        status: Status::default(),
    }
}

pub fn stream_key(name: &str) -> StreamKey {
    StreamKey::new(DOMAIN, name, 1)
}

pub fn stream(name: &str) -> Stream {
    Stream {
        key: stream_key(name),
        schema: SchemaKey::new(DOMAIN, format!("{name}-schema")),
        specification: Specification::new(format!("{name} events")),
        status: Status::default(),
    }
}

pub fn infrastructure(name: &str) -> Infrastructure {
    Infrastructure {
        key: InfrastructureKey::new(name),
        specification: Specification::default(),
        status: Status::default(),
    }
}

pub fn binding_key(stream: &str) -> StreamBindingKey {
    StreamBindingKey::new(stream_key(stream), InfrastructureKey::new(INFRA))
}

pub fn stream_binding(stream: &str) -> StreamBinding {
    StreamBinding {
        key: binding_key(stream),
        specification: Specification::default(),
        status: Status::default(),
    }
}

pub fn producer(stream: &str, name: &str) -> ProducerBinding {
    ProducerBinding {
        key: ProducerBindingKey::new(binding_key(stream), name),
        specification: Specification::default(),
        status: Status::default(),
    }
}

pub fn consumer(stream: &str, name: &str) -> ConsumerBinding {
    ConsumerBinding {
        key: ConsumerBindingKey::new(binding_key(stream), name),
        specification: Specification::default(),
        status: Status::default(),
    }
}

pub fn process(name: &str, zones: &[&str]) -> Process {
    Process {
        key: ProcessKey::new(DOMAIN, name),
        zones: zones.iter().map(|zone| zone.to_string()).collect(),
        specification: Specification::default(),
        status: Status::default(),
    }
}

pub fn process_binding(
    process: &str,
    zone: &str,
    inputs: &[&str],
    outputs: &[&str],
) -> ProcessBinding {
    ProcessBinding {
        key: ProcessBindingKey::new(ProcessKey::new(DOMAIN, process), zone),
        inputs: inputs
            .iter()
            .map(|stream| ProcessInputStreamBinding::new(binding_key(stream)))
            .collect(),
        outputs: outputs
            .iter()
            .map(|stream| ProcessOutputStreamBinding::new(binding_key(stream)))
            .collect(),
        specification: Specification::default(),
        status: Status::default(),
    }
}

/// Domain, infrastructure, and for each name a schema, stream, and stream binding.
pub async fn seed_streams(registry: &Registry, names: &[&str]) {
    registry
        .domains
        .create(domain(DOMAIN))
        .await
        .expect("create domain");
    registry
        .infrastructure
        .create(infrastructure(INFRA))
        .await
        .expect("create infrastructure");
    for name in names {
        registry
            .schemas
            .create(schema(&format!("{name}-schema")))
            .await
            .expect("create schema");
        registry
            .streams
            .create(stream(name))
            .await
            .expect("create stream");
        registry
            .stream_bindings
            .create(stream_binding(name))
            .await
            .expect("create stream binding");
    }
}
