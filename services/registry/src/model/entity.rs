//! Entity records, the `Entity` capability trait, and the kind-tagged union stored in the log.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::{
    ConsumerBindingKey, DomainKey, EntityKey, EntityKind, InfrastructureKey, ProcessBindingKey,
    ProcessKey, ProducerBindingKey, SchemaKey, Specification, Status, StreamBindingKey,
    StreamKey, TaggedKey,
};

/// Capabilities the generic service engine needs from an entity kind.
pub trait Entity: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    type Key: EntityKey;

    const KIND: EntityKind = <Self::Key as EntityKey>::KIND;

    fn key(&self) -> &Self::Key;
    fn specification(&self) -> &Specification;
    fn set_specification(&mut self, specification: Specification);
    fn status(&self) -> &Status;
    fn set_status(&mut self, status: Status);
    fn into_any(self) -> AnyEntity;
    fn from_any(any: AnyEntity) -> Option<Self>;
    fn from_any_ref(any: &AnyEntity) -> Option<&Self>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub key: DomainKey,
    pub specification: Specification,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub key: SchemaKey,
    pub specification: Specification,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub key: StreamKey,
    /// Schema describing the stream's payloads; fixed at creation.
    pub schema: SchemaKey,
    pub specification: Specification,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infrastructure {
    pub key: InfrastructureKey,
    pub specification: Specification,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamBinding {
    pub key: StreamBindingKey,
    pub specification: Specification,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerBinding {
    pub key: ProducerBindingKey,
    pub specification: Specification,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerBinding {
    pub key: ConsumerBindingKey,
    pub specification: Specification,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub key: ProcessKey,
    /// Zones the process may be bound in.
    pub zones: Vec<String>,
    pub specification: Specification,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInputStreamBinding {
    pub stream_binding: StreamBindingKey,
    #[serde(default)]
    pub configuration: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutputStreamBinding {
    pub stream_binding: StreamBindingKey,
    #[serde(default)]
    pub configuration: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessBinding {
    pub key: ProcessBindingKey,
    #[serde(default)]
    pub inputs: Vec<ProcessInputStreamBinding>,
    #[serde(default)]
    pub outputs: Vec<ProcessOutputStreamBinding>,
    pub specification: Specification,
    #[serde(default)]
    pub status: Status,
}

impl ProcessInputStreamBinding {
    pub fn new(stream_binding: StreamBindingKey) -> Self {
        Self {
            stream_binding,
            configuration: Value::Null,
        }
    }
}

impl ProcessOutputStreamBinding {
    pub fn new(stream_binding: StreamBindingKey) -> Self {
        Self {
            stream_binding,
            configuration: Value::Null,
        }
    }
}

impl ProcessBinding {
    /// Every stream binding this process binding reads from or writes to.
    pub fn stream_bindings(&self) -> impl Iterator<Item = &StreamBindingKey> {
        self.inputs
            .iter()
            .map(|input| &input.stream_binding)
            .chain(self.outputs.iter().map(|output| &output.stream_binding))
    }
}

/// Any entity, tagged with its kind. This is the value written to the shared log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum AnyEntity {
    Domain(Domain),
    Schema(Schema),
    Stream(Stream),
    Infrastructure(Infrastructure),
    StreamBinding(StreamBinding),
    ProducerBinding(ProducerBinding),
    ConsumerBinding(ConsumerBinding),
    Process(Process),
    ProcessBinding(ProcessBinding),
}

macro_rules! entity_kinds {
    ($($name:ident => $key:ty),+ $(,)?) => {
        $(
            impl Entity for $name {
                type Key = $key;

                fn key(&self) -> &Self::Key {
                    &self.key
                }

                fn specification(&self) -> &Specification {
                    &self.specification
                }

                fn set_specification(&mut self, specification: Specification) {
                    self.specification = specification;
                }

                fn status(&self) -> &Status {
                    &self.status
                }

                fn set_status(&mut self, status: Status) {
                    self.status = status;
                }

                fn into_any(self) -> AnyEntity {
                    AnyEntity::$name(self)
                }

                fn from_any(any: AnyEntity) -> Option<Self> {
                    match any {
                        AnyEntity::$name(entity) => Some(entity),
                        _ => None,
                    }
                }

                fn from_any_ref(any: &AnyEntity) -> Option<&Self> {
                    match any {
                        AnyEntity::$name(entity) => Some(entity),
                        _ => None,
                    }
                }
            }

            impl From<$name> for AnyEntity {
                fn from(entity: $name) -> Self {
                    AnyEntity::$name(entity)
                }
            }
        )+

        impl AnyEntity {
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(AnyEntity::$name(_) => <$key as EntityKey>::KIND,)+
                }
            }

            pub fn tagged_key(&self) -> TaggedKey {
                match self {
                    $(AnyEntity::$name(entity) => entity.key.to_tagged(),)+
                }
            }

            pub fn key_string(&self) -> String {
                match self {
                    $(AnyEntity::$name(entity) => entity.key.to_string(),)+
                }
            }

            pub fn specification(&self) -> &Specification {
                match self {
                    $(AnyEntity::$name(entity) => &entity.specification,)+
                }
            }
        }
    };
}

entity_kinds! {
    Domain => DomainKey,
    Schema => SchemaKey,
    Stream => StreamKey,
    Infrastructure => InfrastructureKey,
    StreamBinding => StreamBindingKey,
    ProducerBinding => ProducerBindingKey,
    ConsumerBinding => ConsumerBindingKey,
    Process => ProcessKey,
    ProcessBinding => ProcessBindingKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> Stream {
        Stream {
            key: StreamKey::new("payments", "orders", 1),
            schema: SchemaKey::new("payments", "orders-v1"),
            specification: Specification::new("order events"),
            status: Status::default(),
        }
    }

    #[test]
    fn any_entity_is_adjacently_tagged() {
        let json = serde_json::to_value(stream().into_any()).expect("json");
        assert_eq!(json["kind"], "stream");
        assert_eq!(json["entity"]["key"]["name"], "orders");
        let decoded: AnyEntity = serde_json::from_value(json).expect("decode");
        assert_eq!(Stream::from_any(decoded), Some(stream()));
    }

    #[test]
    fn from_any_rejects_other_kinds() {
        let any = AnyEntity::from(stream());
        assert!(Domain::from_any_ref(&any).is_none());
        assert_eq!(any.kind(), EntityKind::Stream);
        assert_eq!(Stream::KIND, EntityKind::Stream);
        assert_eq!(any.tagged_key(), stream().key.to_tagged());
    }

    #[test]
    fn process_binding_lists_inputs_then_outputs() {
        let input = StreamBindingKey::new(
            StreamKey::new("d", "in", 1),
            InfrastructureKey::new("kafka"),
        );
        let output = StreamBindingKey::new(
            StreamKey::new("d", "out", 1),
            InfrastructureKey::new("kafka"),
        );
        let binding = ProcessBinding {
            key: ProcessBindingKey::new(ProcessKey::new("d", "enricher"), "eu-west-1"),
            inputs: vec![ProcessInputStreamBinding::new(input.clone())],
            outputs: vec![ProcessOutputStreamBinding::new(output.clone())],
            specification: Specification::default(),
            status: Status::default(),
        };
        let keys: Vec<_> = binding.stream_bindings().cloned().collect();
        assert_eq!(keys, vec![input, output]);
    }
}
