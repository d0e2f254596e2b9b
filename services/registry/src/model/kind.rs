//! Entity kind discriminator.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Domain,
    Schema,
    Stream,
    Infrastructure,
    StreamBinding,
    ProducerBinding,
    ConsumerBinding,
    Process,
    ProcessBinding,
}

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Domain,
        EntityKind::Schema,
        EntityKind::Stream,
        EntityKind::Infrastructure,
        EntityKind::StreamBinding,
        EntityKind::ProducerBinding,
        EntityKind::ConsumerBinding,
        EntityKind::Process,
        EntityKind::ProcessBinding,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Domain => "domain",
            EntityKind::Schema => "schema",
            EntityKind::Stream => "stream",
            EntityKind::Infrastructure => "infrastructure",
            EntityKind::StreamBinding => "stream_binding",
            EntityKind::ProducerBinding => "producer_binding",
            EntityKind::ConsumerBinding => "consumer_binding",
            EntityKind::Process => "process",
            EntityKind::ProcessBinding => "process_binding",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or(())
    }
}
