use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use strata_graph::transport::mock::MockTransport;
use strata_graph::{BuildError, BuildWarning, BuilderConfig, FieldValue, Resource, ResourceBuilder};
use strata_types::{ResourceKey, ResourceType};

fn builder() -> (ResourceBuilder, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let builder = ResourceBuilder::new(
        BuilderConfig::new("cfexampleapi", "master"),
        transport.clone(),
    );
    (builder, transport)
}

fn cat_content_type(revision: u64) -> Value {
    json!({
        "sys": {"id": "cat", "type": "ContentType", "revision": revision},
        "name": "Cat",
        "displayField": "name",
        "fields": [
            {"id": "name", "name": "Name", "type": "Symbol", "localized": false, "required": true, "validations": []},
            {"id": "lives", "name": "Lives", "type": "Integer", "localized": false, "required": false, "validations": []},
            {"id": "likes", "name": "Likes", "type": "Array", "items": {"type": "Symbol"}, "localized": false, "required": false, "validations": []},
            {"id": "bestFriend", "name": "Best Friend", "type": "Link", "linkType": "Entry", "localized": false, "required": false, "validations": []}
        ]
    })
}

fn cat_entry(id: &str, revision: u64, fields: Value) -> Value {
    json!({
        "sys": {
            "id": id,
            "type": "Entry",
            "revision": revision,
            "locale": "en-US",
            "contentType": {"sys": {"type": "Link", "linkType": "ContentType", "id": "cat"}}
        },
        "fields": fields
    })
}

fn entry_key(id: &str) -> ResourceKey {
    ResourceKey::new(
        ResourceType::Entry,
        id,
        "cfexampleapi",
        "master",
        Some("en-US".to_string()),
    )
}

fn ct_key(id: &str) -> ResourceKey {
    ResourceKey::new(ResourceType::ContentType, id, "cfexampleapi", "master", None)
}

fn scalar<'a>(entry: &'a strata_graph::Entry, field_id: &str) -> &'a Value {
    entry
        .field(field_id)
        .and_then(FieldValue::as_scalar)
        .unwrap_or_else(|| panic!("field '{field_id}' is not a scalar"))
}

// ── dispatch on sys.type ─────────────────────────────────────────

#[tokio::test]
async fn builds_every_resource_kind() {
    let (builder, _) = builder();

    let space = builder
        .build(&json!({"sys": {"id": "s", "type": "Space", "revision": 1}, "name": "Example"}))
        .await
        .unwrap();
    assert!(matches!(&*space, Resource::Space(s) if s.name.as_deref() == Some("Example")));

    let environment = builder
        .build(&json!({"sys": {"id": "master", "type": "Environment", "revision": 1}, "name": "master"}))
        .await
        .unwrap();
    assert!(matches!(&*environment, Resource::Environment(_)));

    let locale = builder
        .build(&json!({
            "sys": {"id": "l", "type": "Locale", "revision": 1},
            "code": "en-US", "name": "English (US)", "default": true
        }))
        .await
        .unwrap();
    assert!(
        matches!(&*locale, Resource::Locale(l) if l.code == "en-US" && l.default)
    );

    let deleted = builder
        .build(&json!({"sys": {"id": "gone", "type": "DeletedAsset", "revision": 2}}))
        .await
        .unwrap();
    assert!(matches!(&*deleted, Resource::DeletedAsset(_)));

    let content_type = builder.build(&cat_content_type(1)).await.unwrap();
    assert!(matches!(&*content_type, Resource::ContentType(ct) if ct.name == "Cat"));
}

#[tokio::test]
async fn locale_without_code_is_malformed() {
    let (builder, _) = builder();
    let err = builder
        .build(&json!({"sys": {"id": "l", "type": "Locale", "revision": 1}}))
        .await
        .unwrap_err();
    assert!(matches!(err, BuildError::MalformedPayload { .. }));
}

// ── fatal-per-resource failures ──────────────────────────────────

#[tokio::test]
async fn rejects_payload_without_sys() {
    let (builder, _) = builder();
    let err = builder.build(&json!({"fields": {}})).await.unwrap_err();
    assert!(matches!(err, BuildError::MalformedPayload { .. }));
    assert!(builder.identity_map().is_empty());
}

#[tokio::test]
async fn rejects_non_object_payload() {
    let (builder, _) = builder();
    let err = builder.build(&json!("not a resource")).await.unwrap_err();
    assert!(matches!(err, BuildError::MalformedPayload { .. }));
}

#[tokio::test]
async fn rejects_unknown_sys_type() {
    let (builder, _) = builder();
    let err = builder
        .build(&json!({"sys": {"id": "x", "type": "Taxonomy", "revision": 1}}))
        .await
        .unwrap_err();
    assert!(matches!(err, BuildError::UnknownResourceType { tag } if tag == "Taxonomy"));
    assert!(builder.identity_map().is_empty());
}

// ── revision gating ──────────────────────────────────────────────

#[tokio::test]
async fn rebuild_at_same_revision_is_reference_equal() {
    let (builder, _) = builder();
    builder.build(&cat_content_type(1)).await.unwrap();

    let raw = cat_entry("garfield", 5, json!({"name": "Garfield"}));
    let first = builder.build(&raw).await.unwrap();
    let second = builder.build(&raw).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn stale_revision_keeps_cached_instance() {
    let (builder, _) = builder();
    builder.build(&cat_content_type(1)).await.unwrap();

    let current = builder
        .build(&cat_entry("garfield", 5, json!({"name": "Garfield"})))
        .await
        .unwrap();
    let after_stale = builder
        .build(&cat_entry("garfield", 4, json!({"name": "Felix"})))
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&current, &after_stale));
    let entry = after_stale.as_entry().unwrap();
    assert_eq!(scalar(entry, "name"), &json!("Garfield"));
}

#[tokio::test]
async fn newer_revision_replaces_instance() {
    let (builder, _) = builder();
    builder.build(&cat_content_type(1)).await.unwrap();

    builder
        .build(&cat_entry("garfield", 5, json!({"name": "Garfield"})))
        .await
        .unwrap();
    let updated = builder
        .build(&cat_entry("garfield", 6, json!({"name": "Garfield II"})))
        .await
        .unwrap();

    assert_eq!(updated.revision(), 6);
    let registered = builder.get(&entry_key("garfield")).unwrap();
    assert!(Arc::ptr_eq(&updated, &registered));
}

// ── schema-driven coercion ───────────────────────────────────────

#[tokio::test]
async fn coerces_fields_against_registered_schema() {
    let (builder, transport) = builder();
    builder.build(&cat_content_type(1)).await.unwrap();

    let built = builder
        .build(&cat_entry(
            "garfield",
            1,
            json!({"name": 42, "lives": "9", "likes": ["lasagna", 7]}),
        ))
        .await
        .unwrap();
    let entry = built.as_entry().unwrap();

    assert_eq!(scalar(entry, "name"), &json!("42"));
    assert_eq!(scalar(entry, "lives"), &json!(9));
    assert_eq!(scalar(entry, "likes"), &json!(["lasagna", "7"]));
    assert!(entry.warnings().is_empty());
    // Schema came from the identity map, not a fetch.
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn unconvertible_value_stays_raw_with_warning() {
    let (builder, _) = builder();
    builder.build(&cat_content_type(1)).await.unwrap();

    let built = builder
        .build(&cat_entry("garfield", 1, json!({"lives": "nine"})))
        .await
        .unwrap();
    let entry = built.as_entry().unwrap();

    assert_eq!(scalar(entry, "lives"), &json!("nine"));
    assert!(matches!(
        &entry.warnings()[0],
        BuildWarning::FieldCoercion(w) if w.field_id == "lives"
    ));
}

#[tokio::test]
async fn undeclared_field_is_preserved_without_mutating_schema() {
    let (builder, _) = builder();
    builder.build(&cat_content_type(1)).await.unwrap();

    let built = builder
        .build(&cat_entry("garfield", 1, json!({"color": "orange"})))
        .await
        .unwrap();
    let entry = built.as_entry().unwrap();
    assert_eq!(scalar(entry, "color"), &json!("orange"));

    // The synthesized definition was session-local to the entry build.
    let registered = builder.get(&ct_key("cat")).unwrap();
    let ct = registered.as_content_type().unwrap();
    assert!(ct.field("color").is_none());
    assert_eq!(ct.fields().len(), 4);
}

#[tokio::test]
async fn missing_schema_keeps_fields_raw() {
    let (builder, transport) = builder();

    // No content type registered and none fetchable.
    let built = builder
        .build(&cat_entry("garfield", 1, json!({"name": 42, "lives": "nine"})))
        .await
        .unwrap();
    let entry = built.as_entry().unwrap();

    assert_eq!(scalar(entry, "name"), &json!(42));
    assert_eq!(scalar(entry, "lives"), &json!("nine"));
    assert!(entry.warnings().is_empty());
    // One fetch attempt for the schema, which missed.
    assert_eq!(transport.calls(), 1);
}

// ── locale selection ─────────────────────────────────────────────

#[tokio::test]
async fn multi_locale_document_selects_default_locale() {
    let (builder, _) = builder();
    builder.build(&cat_content_type(1)).await.unwrap();

    let built = builder
        .build(&json!({
            "sys": {
                "id": "nyancat",
                "type": "Entry",
                "revision": 1,
                "contentType": {"sys": {"type": "Link", "linkType": "ContentType", "id": "cat"}}
            },
            "fields": {"name": {"en-US": "Nyan Cat", "tlh": "Nyan vIghro'"}}
        }))
        .await
        .unwrap();

    let entry = built.as_entry().unwrap();
    assert_eq!(scalar(entry, "name"), &json!("Nyan Cat"));
}

#[tokio::test]
async fn single_key_object_is_not_mistaken_for_locale_map() {
    let (builder, _) = builder();

    // No sys.locale and no schema: an ordinary one-key object value
    // must pass through whole, not be unwrapped as a locale map.
    let built = builder
        .build(&json!({
            "sys": {"id": "cfg", "type": "Entry", "revision": 1},
            "fields": {"meta": {"nested": {"depth": 1}}}
        }))
        .await
        .unwrap();

    let entry = built.as_entry().unwrap();
    assert_eq!(scalar(entry, "meta"), &json!({"nested": {"depth": 1}}));
}

#[tokio::test]
async fn single_variant_under_other_locale_is_used() {
    let (builder, _) = builder();

    let built = builder
        .build(&json!({
            "sys": {"id": "katze", "type": "Entry", "revision": 1},
            "fields": {"name": {"de-DE": "Katze"}}
        }))
        .await
        .unwrap();

    let entry = built.as_entry().unwrap();
    assert_eq!(scalar(entry, "name"), &json!("Katze"));
}

// ── assets ───────────────────────────────────────────────────────

#[tokio::test]
async fn asset_extracts_modeled_fields_and_keeps_the_rest() {
    let (builder, _) = builder();

    let built = builder
        .build(&json!({
            "sys": {"id": "nyancat-img", "type": "Asset", "revision": 1, "locale": "en-US"},
            "fields": {
                "title": "Nyan Cat",
                "description": "A cat.",
                "file": {
                    "url": "//images.example.com/nyancat.png",
                    "contentType": "image/png",
                    "fileName": "nyancat.png"
                },
                "tags": ["cats"]
            }
        }))
        .await
        .unwrap();

    let asset = built.as_asset().unwrap();
    assert_eq!(asset.title.as_deref(), Some("Nyan Cat"));
    assert_eq!(asset.description.as_deref(), Some("A cat."));
    let file = asset.file.as_ref().unwrap();
    assert_eq!(file.url, "//images.example.com/nyancat.png");
    assert_eq!(file.content_type.as_deref(), Some("image/png"));
    assert_eq!(asset.extra_fields.get("tags"), Some(&json!(["cats"])));
    assert!(asset.warnings().is_empty());
}

#[tokio::test]
async fn asset_with_malformed_file_degrades_to_raw() {
    let (builder, _) = builder();

    let built = builder
        .build(&json!({
            "sys": {"id": "broken-img", "type": "Asset", "revision": 1, "locale": "en-US"},
            "fields": {"file": "not an object"}
        }))
        .await
        .unwrap();

    let asset = built.as_asset().unwrap();
    assert!(asset.file.is_none());
    assert_eq!(asset.extra_fields.get("file"), Some(&json!("not an object")));
    assert!(matches!(
        &asset.warnings()[0],
        BuildWarning::FieldCoercion(w) if w.field_id == "file"
    ));
}

// ── batches ──────────────────────────────────────────────────────

#[tokio::test]
async fn batch_failure_does_not_abort_the_rest() {
    let (builder, _) = builder();

    let outcome = builder
        .build_collection(&[
            json!({"sys": {"id": "a", "type": "Space", "revision": 1}, "name": "A"}),
            json!({"no": "sys"}),
            json!({"sys": {"id": "b", "type": "Space", "revision": 1}, "name": "B"}),
        ])
        .await;

    assert_eq!(outcome.resources.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    let (index, error) = &outcome.failures[0];
    assert_eq!(*index, 1);
    assert!(matches!(error, BuildError::MalformedPayload { .. }));
    assert_eq!(builder.identity_map().len(), 2);
}

#[tokio::test]
async fn batch_unknown_type_fails_only_that_item() {
    let (builder, _) = builder();

    let outcome = builder
        .build_collection(&[
            json!({"sys": {"id": "x", "type": "Taxonomy", "revision": 1}}),
            json!({"sys": {"id": "a", "type": "Space", "revision": 1}, "name": "A"}),
        ])
        .await;

    assert_eq!(outcome.resources.len(), 1);
    assert!(matches!(
        &outcome.failures[0],
        (0, BuildError::UnknownResourceType { tag }) if tag == "Taxonomy"
    ));
}

#[tokio::test]
async fn duplicate_failing_items_fail_individually() {
    let (builder, _) = builder();

    // Two copies of the same unbuildable resource: the second shares
    // the first's failure instead of panicking the batch.
    let bad = json!({"sys": {"id": "l", "type": "Locale", "revision": 1}});
    let outcome = builder.build_collection(&[bad.clone(), bad]).await;

    assert!(outcome.resources.is_empty());
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(outcome.failures[0].0, 0);
    assert_eq!(outcome.failures[1].0, 1);
    assert!(builder.identity_map().is_empty());
}

#[tokio::test]
async fn batch_reports_stale_updates_as_warnings() {
    let (builder, _) = builder();
    let current = builder
        .build(&json!({"sys": {"id": "a", "type": "Space", "revision": 5}, "name": "v5"}))
        .await
        .unwrap();

    let outcome = builder
        .build_collection(&[
            json!({"sys": {"id": "a", "type": "Space", "revision": 4}, "name": "v4"}),
        ])
        .await;

    assert!(outcome.failures.is_empty());
    assert!(Arc::ptr_eq(&outcome.resources[0], &current));
    assert!(matches!(
        &outcome.warnings[0],
        BuildWarning::StaleUpdateIgnored { incoming_revision: 4, cached_revision: 5, .. }
    ));
}

#[tokio::test]
async fn batch_entries_coerce_against_same_batch_schema() {
    let (builder, transport) = builder();

    // Entry listed before its content type; population reorders.
    let outcome = builder
        .build_collection(&[
            cat_entry("garfield", 1, json!({"name": 42})),
            cat_content_type(1),
        ])
        .await;

    assert!(outcome.failures.is_empty());
    let entry = builder
        .get(&entry_key("garfield"))
        .unwrap();
    assert_eq!(scalar(entry.as_entry().unwrap(), "name"), &json!("42"));
    assert_eq!(transport.calls(), 0);
}
