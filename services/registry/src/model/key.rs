//! Natural keys for every entity kind and their tagged store encoding.
//!
//! # Purpose
//! Each kind has a small key struct used by services and views. In the shared log every
//! key is written as a [`TaggedKey`]: the kind discriminator, the natural key fields
//! owned by that kind, and the tagged key of the parent it is scoped to. One log can then
//! carry every kind while each view decodes only its own discriminator.
//!
//! # Key invariants
//! - `to_tagged` is injective per kind: two distinct keys never share a tagged key.
//! - A dependent's `parent` is exactly its owner's tagged key, so ownership is a
//!   key-prefix match (see [`TaggedKey::is_child_of`]).
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

use super::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedKey {
    pub kind: EntityKind,
    pub id: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<TaggedKey>>,
}

impl TaggedKey {
    pub fn root(kind: EntityKind, id: Vec<String>) -> Self {
        Self {
            kind,
            id,
            parent: None,
        }
    }

    pub fn child(kind: EntityKind, id: Vec<String>, parent: TaggedKey) -> Self {
        Self {
            kind,
            id,
            parent: Some(Box::new(parent)),
        }
    }

    pub fn is_child_of(&self, parent: &TaggedKey) -> bool {
        self.parent.as_deref() == Some(parent)
    }
}

impl fmt::Display for TaggedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{parent}/")?;
        }
        write!(f, "{}:{}", self.kind, self.id.join(","))
    }
}

/// Behaviour shared by every natural key.
pub trait EntityKey:
    Clone + Eq + Hash + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: EntityKind;

    fn to_tagged(&self) -> TaggedKey;

    /// The key's own name, used by key queries.
    fn name(&self) -> &str;

    /// The domain the key is scoped to, if any.
    fn domain(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainKey {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaKey {
    pub domain: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamKey {
    pub domain: String,
    pub name: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InfrastructureKey {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamBindingKey {
    pub stream: StreamKey,
    pub infrastructure: InfrastructureKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProducerBindingKey {
    pub stream_binding: StreamBindingKey,
    pub producer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsumerBindingKey {
    pub stream_binding: StreamBindingKey,
    pub consumer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessKey {
    pub domain: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessBindingKey {
    pub process: ProcessKey,
    pub zone: String,
}

impl DomainKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl SchemaKey {
    pub fn new(domain: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
        }
    }

    pub fn domain_key(&self) -> DomainKey {
        DomainKey::new(&self.domain)
    }
}

impl StreamKey {
    pub fn new(domain: impl Into<String>, name: impl Into<String>, version: u32) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
            version,
        }
    }

    pub fn domain_key(&self) -> DomainKey {
        DomainKey::new(&self.domain)
    }
}

impl InfrastructureKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl StreamBindingKey {
    pub fn new(stream: StreamKey, infrastructure: InfrastructureKey) -> Self {
        Self {
            stream,
            infrastructure,
        }
    }
}

impl ProducerBindingKey {
    pub fn new(stream_binding: StreamBindingKey, producer: impl Into<String>) -> Self {
        Self {
            stream_binding,
            producer: producer.into(),
        }
    }
}

impl ConsumerBindingKey {
    pub fn new(stream_binding: StreamBindingKey, consumer: impl Into<String>) -> Self {
        Self {
            stream_binding,
            consumer: consumer.into(),
        }
    }
}

impl ProcessKey {
    pub fn new(domain: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
        }
    }

    pub fn domain_key(&self) -> DomainKey {
        DomainKey::new(&self.domain)
    }
}

impl ProcessBindingKey {
    pub fn new(process: ProcessKey, zone: impl Into<String>) -> Self {
        Self {
            process,
            zone: zone.into(),
        }
    }
}

impl EntityKey for DomainKey {
    const KIND: EntityKind = EntityKind::Domain;

    fn to_tagged(&self) -> TaggedKey {
        TaggedKey::root(Self::KIND, vec![self.name.clone()])
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl EntityKey for SchemaKey {
    const KIND: EntityKind = EntityKind::Schema;

    fn to_tagged(&self) -> TaggedKey {
        TaggedKey::child(
            Self::KIND,
            vec![self.name.clone()],
            self.domain_key().to_tagged(),
        )
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> Option<&str> {
        Some(&self.domain)
    }
}

impl EntityKey for StreamKey {
    const KIND: EntityKind = EntityKind::Stream;

    fn to_tagged(&self) -> TaggedKey {
        TaggedKey::child(
            Self::KIND,
            vec![self.name.clone(), self.version.to_string()],
            self.domain_key().to_tagged(),
        )
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> Option<&str> {
        Some(&self.domain)
    }
}

impl EntityKey for InfrastructureKey {
    const KIND: EntityKind = EntityKind::Infrastructure;

    fn to_tagged(&self) -> TaggedKey {
        TaggedKey::root(Self::KIND, vec![self.name.clone()])
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl EntityKey for StreamBindingKey {
    const KIND: EntityKind = EntityKind::StreamBinding;

    // The infrastructure reference is carried as an id field; the owning stream is the parent.
    fn to_tagged(&self) -> TaggedKey {
        TaggedKey::child(
            Self::KIND,
            vec![self.infrastructure.name.clone()],
            self.stream.to_tagged(),
        )
    }

    fn name(&self) -> &str {
        &self.stream.name
    }

    fn domain(&self) -> Option<&str> {
        Some(&self.stream.domain)
    }
}

impl EntityKey for ProducerBindingKey {
    const KIND: EntityKind = EntityKind::ProducerBinding;

    fn to_tagged(&self) -> TaggedKey {
        TaggedKey::child(
            Self::KIND,
            vec![self.producer.clone()],
            self.stream_binding.to_tagged(),
        )
    }

    fn name(&self) -> &str {
        &self.producer
    }

    fn domain(&self) -> Option<&str> {
        Some(&self.stream_binding.stream.domain)
    }
}

impl EntityKey for ConsumerBindingKey {
    const KIND: EntityKind = EntityKind::ConsumerBinding;

    fn to_tagged(&self) -> TaggedKey {
        TaggedKey::child(
            Self::KIND,
            vec![self.consumer.clone()],
            self.stream_binding.to_tagged(),
        )
    }

    fn name(&self) -> &str {
        &self.consumer
    }

    fn domain(&self) -> Option<&str> {
        Some(&self.stream_binding.stream.domain)
    }
}

impl EntityKey for ProcessKey {
    const KIND: EntityKind = EntityKind::Process;

    fn to_tagged(&self) -> TaggedKey {
        TaggedKey::child(
            Self::KIND,
            vec![self.name.clone()],
            self.domain_key().to_tagged(),
        )
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> Option<&str> {
        Some(&self.domain)
    }
}

impl EntityKey for ProcessBindingKey {
    const KIND: EntityKind = EntityKind::ProcessBinding;

    fn to_tagged(&self) -> TaggedKey {
        TaggedKey::child(
            Self::KIND,
            vec![self.zone.clone()],
            self.process.to_tagged(),
        )
    }

    fn name(&self) -> &str {
        &self.process.name
    }

    fn domain(&self) -> Option<&str> {
        Some(&self.process.domain)
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.name)
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/v{}", self.domain, self.name, self.version)
    }
}

impl fmt::Display for InfrastructureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for StreamBindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.stream, self.infrastructure)
    }
}

impl fmt::Display for ProducerBindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#producer:{}", self.stream_binding, self.producer)
    }
}

impl fmt::Display for ConsumerBindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#consumer:{}", self.stream_binding, self.consumer)
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.name)
    }
}

impl fmt::Display for ProcessBindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.process, self.zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding_key() -> StreamBindingKey {
        StreamBindingKey::new(
            StreamKey::new("payments", "orders", 1),
            InfrastructureKey::new("kafka-eu"),
        )
    }

    #[test]
    fn children_point_at_their_owner() {
        let binding = binding_key();
        let consumer = ConsumerBindingKey::new(binding.clone(), "billing");
        let producer = ProducerBindingKey::new(binding.clone(), "checkout");

        assert!(consumer.to_tagged().is_child_of(&binding.to_tagged()));
        assert!(producer.to_tagged().is_child_of(&binding.to_tagged()));
        assert!(
            binding
                .to_tagged()
                .is_child_of(&StreamKey::new("payments", "orders", 1).to_tagged())
        );
    }

    #[test]
    fn kinds_with_equal_fields_do_not_collide() {
        let domain = DomainKey::new("shared").to_tagged();
        let infrastructure = InfrastructureKey::new("shared").to_tagged();
        assert_ne!(domain, infrastructure);

        let schema = SchemaKey::new("d", "x").to_tagged();
        let process = ProcessKey::new("d", "x").to_tagged();
        assert_ne!(schema, process);
    }

    #[test]
    fn stream_versions_are_distinct_keys() {
        let v1 = StreamKey::new("d", "s", 1).to_tagged();
        let v2 = StreamKey::new("d", "s", 2).to_tagged();
        assert_ne!(v1, v2);
    }

    #[test]
    fn tagged_key_json_omits_missing_parent() {
        let json = serde_json::to_value(DomainKey::new("payments").to_tagged()).expect("json");
        assert_eq!(
            json,
            serde_json::json!({ "kind": "domain", "id": ["payments"] })
        );
        let nested: TaggedKey =
            serde_json::from_value(serde_json::to_value(binding_key().to_tagged()).expect("json"))
                .expect("decode");
        assert_eq!(nested, binding_key().to_tagged());
    }

    #[test]
    fn display_formats_are_readable() {
        let consumer = ConsumerBindingKey::new(binding_key(), "billing");
        assert_eq!(
            consumer.to_string(),
            "payments/orders/v1@kafka-eu#consumer:billing"
        );
        assert_eq!(
            consumer.to_tagged().to_string(),
            "domain:payments/stream:orders,1/stream_binding:kafka-eu/consumer_binding:billing"
        );
    }
}
