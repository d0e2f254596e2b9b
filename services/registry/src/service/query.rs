// Regex key queries over an entity's name and domain.
use regex::Regex;

use crate::error::ValidationError;
use crate::model::EntityKey;

/// Filter on key name and (where the key has one) domain. Patterns are anchored: they must
/// match the whole value. An unset field matches everything.
#[derive(Debug, Clone, Default)]
pub struct KeyQuery {
    name: Option<Regex>,
    domain: Option<Regex>,
}

impl KeyQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, pattern: &str) -> Result<Self, ValidationError> {
        self.name = Some(anchored("query.name", pattern)?);
        Ok(self)
    }

    pub fn domain(mut self, pattern: &str) -> Result<Self, ValidationError> {
        self.domain = Some(anchored("query.domain", pattern)?);
        Ok(self)
    }

    pub fn matches<K: EntityKey>(&self, key: &K) -> bool {
        let name_ok = self
            .name
            .as_ref()
            .is_none_or(|re| re.is_match(key.name()));
        let domain_ok = match (&self.domain, key.domain()) {
            (None, _) => true,
            (Some(re), Some(domain)) => re.is_match(domain),
            (Some(_), None) => false,
        };
        name_ok && domain_ok
    }
}

fn anchored(field: &'static str, pattern: &str) -> Result<Regex, ValidationError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|err| ValidationError::InvalidQuery {
        field,
        reason: err.to_string(),
    })
}
