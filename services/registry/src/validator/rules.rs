// Field-level rules shared by every kind's validator.
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::error::{RegistryResult, ValidationError};
use crate::model::{Entity, EntityKey, EntityKind, Specification};
use crate::view::View;

pub const MAX_NAME_LEN: usize = 255;

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("name regex must compile")
    })
}

pub fn check_name(
    kind: EntityKind,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingField { kind, field });
    }
    if value.len() > MAX_NAME_LEN {
        return Err(ValidationError::InvalidField {
            kind,
            field,
            reason: format!("longer than {MAX_NAME_LEN} characters"),
        });
    }
    if !name_re().is_match(value) {
        return Err(ValidationError::InvalidField {
            kind,
            field,
            reason: format!("`{value}` does not match {}", name_re().as_str()),
        });
    }
    Ok(())
}

pub fn check_specification(
    kind: EntityKind,
    specification: &Specification,
) -> Result<(), ValidationError> {
    if specification.kind.trim().is_empty() {
        return Err(ValidationError::MissingField {
            kind,
            field: "specification.type",
        });
    }
    if !specification.configuration.is_object() {
        return Err(ValidationError::InvalidField {
            kind,
            field: "specification.configuration",
            reason: "must be a JSON object".to_string(),
        });
    }
    let mut seen = HashSet::new();
    for tag in &specification.tags {
        if tag.name.is_empty() {
            return Err(ValidationError::MissingField {
                kind,
                field: "specification.tags.name",
            });
        }
        if !seen.insert(tag.name.as_str()) {
            return Err(ValidationError::InvalidField {
                kind,
                field: "specification.tags",
                reason: format!("duplicate tag `{}`", tag.name),
            });
        }
    }
    Ok(())
}

pub(super) fn check_type_unchanged<E: Entity>(
    entity: &E,
    existing: &E,
) -> Result<(), ValidationError> {
    if entity.specification().kind != existing.specification().kind {
        return Err(ValidationError::Immutable {
            kind: E::KIND,
            key: entity.key().to_string(),
            field: "specification.type",
        });
    }
    Ok(())
}

/// Fails with `DanglingReference` unless `reference` exists in `view`.
pub(super) async fn require<R: Entity>(
    view: &View<R>,
    kind: EntityKind,
    key: &str,
    reference: &R::Key,
) -> RegistryResult<()> {
    if view.exists(reference).await? {
        return Ok(());
    }
    Err(ValidationError::DanglingReference {
        kind,
        key: key.to_string(),
        reference_kind: <R::Key as EntityKey>::KIND,
        reference: reference.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tag;
    use serde_json::json;

    #[test]
    fn names_follow_the_naming_rule() {
        assert!(check_name(EntityKind::Domain, "name", "payments.v2_eu-1").is_ok());
        assert!(matches!(
            check_name(EntityKind::Domain, "name", ""),
            Err(ValidationError::MissingField { .. })
        ));
        for bad in ["-leading", "has space", "slash/inside", ".hidden"] {
            assert!(
                matches!(
                    check_name(EntityKind::Domain, "name", bad),
                    Err(ValidationError::InvalidField { .. })
                ),
                "{bad} should be rejected"
            );
        }
        let long = "a".repeat(MAX_NAME_LEN + 1);
        assert!(check_name(EntityKind::Domain, "name", &long).is_err());
        assert!(check_name(EntityKind::Domain, "name", &long[1..]).is_ok());
    }

    #[test]
    fn specification_rules() {
        assert!(check_specification(EntityKind::Stream, &Specification::default()).is_ok());

        let blank_type = Specification::default().with_type(" ");
        assert!(matches!(
            check_specification(EntityKind::Stream, &blank_type),
            Err(ValidationError::MissingField {
                field: "specification.type",
                ..
            })
        ));

        let array_config = Specification::default().with_configuration(json!([1, 2]));
        assert!(check_specification(EntityKind::Stream, &array_config).is_err());

        let mut duplicate_tags = Specification::default().with_tag("team", "a");
        duplicate_tags.tags.push(Tag::new("team", "b"));
        assert!(matches!(
            check_specification(EntityKind::Stream, &duplicate_tags),
            Err(ValidationError::InvalidField {
                field: "specification.tags",
                ..
            })
        ));
    }
}
