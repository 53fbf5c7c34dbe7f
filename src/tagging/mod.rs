//! Attaching request context to fetched entities.

use crate::types::{Context, Entity};

/// Tags every entity with every context field.
///
/// Tags are stored beside the source fields, so tagging never removes,
/// renames or overwrites what the API returned, and tagging twice with the
/// same context changes nothing.
pub fn tag(entities: Vec<Entity>, context: &Context) -> Vec<Entity> {
    entities
        .into_iter()
        .map(|mut entity| {
            tag_one(&mut entity, context);
            entity
        })
        .collect()
}

/// Tags a single entity in place.
pub fn tag_one(entity: &mut Entity, context: &Context) {
    for (key, value) in context.iter() {
        entity.set_tag(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldRef, ORGANIZATION, REPOSITORY};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn contributors() -> Vec<Entity> {
        vec![
            Entity::from_value(json!({"login": "alice", "contributions": 4})).unwrap(),
            Entity::from_value(json!({"login": "bob", "repository": {"id": 1}})).unwrap(),
        ]
    }

    #[test]
    fn test_tag_sets_every_field_on_every_entity() {
        let context = Context::organization("acme").with(REPOSITORY, "widgets");
        let tagged = tag(contributors(), &context);

        for entity in &tagged {
            assert_eq!(entity.get_str(ORGANIZATION), Some("acme"));
            assert_eq!(entity.get_str(REPOSITORY), Some("widgets"));
        }
        assert_eq!(tagged[0].get("contributions"), Some(FieldRef::Source(&json!(4))));
    }

    #[test]
    fn test_tag_keeps_source_fields() {
        let context = Context::new().with(REPOSITORY, "widgets");
        let tagged = tag(contributors(), &context);

        assert_eq!(tagged[1].source(REPOSITORY), Some(&json!({"id": 1})));
        assert_eq!(tagged[1].get_str("login"), Some("bob"));
    }

    #[test]
    fn test_tag_is_idempotent() {
        let context = Context::organization("acme").with(REPOSITORY, "widgets");
        let once = tag(contributors(), &context);
        let twice = tag(once.clone(), &context);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_context_is_identity() {
        assert_eq!(tag(contributors(), &Context::new()), contributors());
    }
}
