//! Declarative relationships between entity kinds.
//!
//! # Purpose
//! For each kind the graph lists:
//! - **blocking dependents**: entities whose existence prevents deleting the target;
//! - **owned dependents**: entities deleted along with the target, in the listed order.
//!
//! Each edge carries a matcher that decides whether a candidate dependent refers to a given
//! target tagged key. The deletion coordinator is the only consumer.
use crate::model::{AnyEntity, EntityKey, EntityKind, TaggedKey};

pub type Matcher = fn(&AnyEntity, &TaggedKey) -> bool;

#[derive(Clone, Copy)]
pub struct Dependency {
    pub kind: EntityKind,
    /// Short label used in logs.
    pub relation: &'static str,
    matches: Matcher,
}

impl Dependency {
    pub const fn new(kind: EntityKind, relation: &'static str, matches: Matcher) -> Self {
        Self {
            kind,
            relation,
            matches,
        }
    }

    pub fn matches(&self, candidate: &AnyEntity, target: &TaggedKey) -> bool {
        candidate.kind() == self.kind && (self.matches)(candidate, target)
    }
}

impl std::fmt::Debug for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependency")
            .field("kind", &self.kind)
            .field("relation", &self.relation)
            .finish()
    }
}

fn scoped_to(candidate: &AnyEntity, target: &TaggedKey) -> bool {
    candidate.tagged_key().is_child_of(target)
}

fn uses_schema(candidate: &AnyEntity, target: &TaggedKey) -> bool {
    matches!(candidate, AnyEntity::Stream(stream) if stream.schema.to_tagged() == *target)
}

fn placed_on(candidate: &AnyEntity, target: &TaggedKey) -> bool {
    matches!(
        candidate,
        AnyEntity::StreamBinding(binding) if binding.key.infrastructure.to_tagged() == *target
    )
}

fn reads_or_writes(candidate: &AnyEntity, target: &TaggedKey) -> bool {
    match candidate {
        AnyEntity::ProcessBinding(binding) => binding
            .stream_bindings()
            .any(|stream_binding| stream_binding.to_tagged() == *target),
        _ => false,
    }
}

const DOMAIN_BLOCKING: &[Dependency] = &[
    Dependency::new(EntityKind::Schema, "domain", scoped_to),
    Dependency::new(EntityKind::Stream, "domain", scoped_to),
    Dependency::new(EntityKind::Process, "domain", scoped_to),
];
const SCHEMA_BLOCKING: &[Dependency] = &[Dependency::new(EntityKind::Stream, "schema", uses_schema)];
const STREAM_BLOCKING: &[Dependency] =
    &[Dependency::new(EntityKind::StreamBinding, "stream", scoped_to)];
const INFRASTRUCTURE_BLOCKING: &[Dependency] = &[Dependency::new(
    EntityKind::StreamBinding,
    "infrastructure",
    placed_on,
)];
const STREAM_BINDING_BLOCKING: &[Dependency] = &[Dependency::new(
    EntityKind::ProcessBinding,
    "input/output",
    reads_or_writes,
)];
// Consumers go before producers.
const STREAM_BINDING_OWNED: &[Dependency] = &[
    Dependency::new(EntityKind::ConsumerBinding, "stream_binding", scoped_to),
    Dependency::new(EntityKind::ProducerBinding, "stream_binding", scoped_to),
];
const PROCESS_OWNED: &[Dependency] =
    &[Dependency::new(EntityKind::ProcessBinding, "process", scoped_to)];

/// Relationship table consulted on every delete.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipGraph;

impl RelationshipGraph {
    pub fn blocking(&self, kind: EntityKind) -> &'static [Dependency] {
        match kind {
            EntityKind::Domain => DOMAIN_BLOCKING,
            EntityKind::Schema => SCHEMA_BLOCKING,
            EntityKind::Stream => STREAM_BLOCKING,
            EntityKind::Infrastructure => INFRASTRUCTURE_BLOCKING,
            EntityKind::StreamBinding => STREAM_BINDING_BLOCKING,
            EntityKind::ProducerBinding
            | EntityKind::ConsumerBinding
            | EntityKind::Process
            | EntityKind::ProcessBinding => &[],
        }
    }

    pub fn owned(&self, kind: EntityKind) -> &'static [Dependency] {
        match kind {
            EntityKind::StreamBinding => STREAM_BINDING_OWNED,
            EntityKind::Process => PROCESS_OWNED,
            _ => &[],
        }
    }
}
