//! Classifier threshold boundaries and nested-field scenarios.

mod common;

use common::{database, init_tracing, MockDriver, RecordingEventBus};
use metasync::prelude::*;

async fn run(driver: &MockDriver, catalog: &MemoryCatalog) {
    let events = RecordingEventBus::new();
    Syncer::new()
        .unwrap()
        .sync_database(driver, catalog, &events, &database(), true)
        .await
        .unwrap();
}

fn one_table(fields: Vec<FieldDescription>) -> MockDriver {
    MockDriver::new().with_table(TableIdent::new("pages"), fields)
}

#[tokio::test]
async fn test_url_threshold_is_exclusive() {
    init_tracing();
    let driver = one_table(vec![
        FieldDescription::new("homepage", BaseType::Char),
        FieldDescription::new("at_threshold", BaseType::Char),
        FieldDescription::new("just_over", BaseType::Char),
    ])
    .with_percent_urls("homepage", 0.96)
    .with_percent_urls("at_threshold", 0.95)
    .with_percent_urls("just_over", 0.9501);
    let catalog = MemoryCatalog::new();

    run(&driver, &catalog).await;

    let pages = catalog.table(1, "pages").unwrap();
    assert_eq!(
        catalog.field(pages.id, "homepage").unwrap().special_type,
        Some(SpecialType::Url)
    );
    assert_eq!(
        catalog.field(pages.id, "at_threshold").unwrap().special_type,
        None
    );
    assert_eq!(
        catalog.field(pages.id, "just_over").unwrap().special_type,
        Some(SpecialType::Url)
    );
}

#[tokio::test]
async fn test_url_marking_needs_textual_type() {
    init_tracing();
    let driver = one_table(vec![FieldDescription::new("hits", BaseType::Integer)])
        .with_percent_urls("hits", 1.0);
    let catalog = MemoryCatalog::new();

    run(&driver, &catalog).await;

    let pages = catalog.table(1, "pages").unwrap();
    assert_eq!(catalog.field(pages.id, "hits").unwrap().special_type, None);
}

#[tokio::test]
async fn test_avg_length_threshold_is_exclusive() {
    init_tracing();
    let driver = one_table(vec![
        FieldDescription::new("bio", BaseType::Text),
        FieldDescription::new("summary", BaseType::Text),
    ])
    .with_avg_length("bio", 51)
    .with_avg_length("summary", 50);
    let catalog = MemoryCatalog::new();

    run(&driver, &catalog).await;

    let pages = catalog.table(1, "pages").unwrap();
    assert!(!catalog.field(pages.id, "bio").unwrap().preview_display);
    assert!(catalog.field(pages.id, "summary").unwrap().preview_display);
}

#[tokio::test]
async fn test_category_threshold_boundaries() {
    init_tracing();
    let driver = one_table(vec![
        FieldDescription::new("status", BaseType::Char),
        FieldDescription::new("reference", BaseType::Char),
        FieldDescription::new("untouched", BaseType::Char),
    ]);
    let catalog = MemoryCatalog::new();
    catalog.set_distinct_count("status", 39);
    catalog.set_distinct_count("reference", 40);
    catalog.set_distinct_count("untouched", 0);

    run(&driver, &catalog).await;

    let pages = catalog.table(1, "pages").unwrap();
    assert_eq!(
        catalog.field(pages.id, "status").unwrap().special_type,
        Some(SpecialType::Category)
    );
    assert_eq!(
        catalog.field(pages.id, "reference").unwrap().special_type,
        None
    );
    assert_eq!(
        catalog.field(pages.id, "untouched").unwrap().special_type,
        None
    );
}

#[tokio::test]
async fn test_existing_special_type_is_never_replaced() {
    init_tracing();
    // "state" gets its special type from name inference at insert; a low
    // cardinality must not overwrite it with category.
    let driver = one_table(vec![FieldDescription::new("state", BaseType::Char)]);
    let catalog = MemoryCatalog::new();
    catalog.set_distinct_count("state", 5);

    run(&driver, &catalog).await;

    let pages = catalog.table(1, "pages").unwrap();
    assert_eq!(
        catalog.field(pages.id, "state").unwrap().special_type,
        Some(SpecialType::State)
    );
}

#[tokio::test]
async fn test_category_field_values_are_refreshed_on_later_runs() {
    init_tracing();
    let driver = one_table(vec![FieldDescription::new("status", BaseType::Char)]);
    let catalog = MemoryCatalog::new();
    catalog.set_distinct_count("status", 10);

    run(&driver, &catalog).await;
    // First run only discovers the category.
    assert!(catalog.refreshed_field_ids().is_empty());

    run(&driver, &catalog).await;
    let pages = catalog.table(1, "pages").unwrap();
    let status = catalog.field(pages.id, "status").unwrap();
    assert_eq!(status.special_type, Some(SpecialType::Category));
    assert_eq!(catalog.refreshed_field_ids(), vec![status.id]);
}

#[tokio::test]
async fn test_json_detection() {
    init_tracing();
    let driver = one_table(vec![
        FieldDescription::new("payload", BaseType::Text),
        FieldDescription::new("answers", BaseType::Text),
        FieldDescription::new("nulls", BaseType::Text),
        FieldDescription::new("sparse", BaseType::Text),
    ])
    .with_samples(
        "payload",
        vec![
            Some(r#"{"k":1}"#.to_string()),
            Some("[1,2]".to_string()),
            Some(String::new()),
        ],
    )
    .with_samples("answers", vec![Some("42".to_string())])
    .with_samples("nulls", vec![Some("null".to_string()), Some(String::new())])
    .with_samples("sparse", vec![Some(r#"{"a":1}"#.to_string()), None]);
    let catalog = MemoryCatalog::new();

    run(&driver, &catalog).await;

    let pages = catalog.table(1, "pages").unwrap();
    let payload = catalog.field(pages.id, "payload").unwrap();
    assert_eq!(payload.special_type, Some(SpecialType::Json));
    assert!(!payload.preview_display);

    assert_eq!(catalog.field(pages.id, "answers").unwrap().special_type, None);
    assert_eq!(catalog.field(pages.id, "nulls").unwrap().special_type, None);
    assert_eq!(
        catalog.field(pages.id, "sparse").unwrap().special_type,
        Some(SpecialType::Json)
    );
}

#[tokio::test]
async fn test_nested_fields_follow_the_document_shape() {
    init_tracing();
    let with_two_children = MockDriver::new()
        .with_feature(Capability::NestedFields)
        .with_table(
            TableIdent::new("events"),
            vec![FieldDescription::new("doc", BaseType::Dictionary)],
        )
        .with_nested("doc", &[("a", BaseType::Integer), ("b", BaseType::Char)]);
    let catalog = MemoryCatalog::new();

    run(&with_two_children, &catalog).await;

    let events_table = catalog.table(1, "events").unwrap();
    let doc = catalog.field(events_table.id, "doc").unwrap();
    let a = catalog.nested_field(doc.id, "a").unwrap();
    let b = catalog.nested_field(doc.id, "b").unwrap();
    assert!(a.active && b.active);
    assert_eq!(a.parent_id, Some(doc.id));
    assert_eq!(a.base_type, BaseType::Integer);
    assert_eq!(b.base_type, BaseType::Char);

    // A later run that no longer reports `b` deactivates it and leaves
    // `a` alone.
    let with_one_child = MockDriver::new()
        .with_feature(Capability::NestedFields)
        .with_table(
            TableIdent::new("events"),
            vec![FieldDescription::new("doc", BaseType::Dictionary)],
        )
        .with_nested("doc", &[("a", BaseType::Integer)]);

    run(&with_one_child, &catalog).await;

    let a_after = catalog.nested_field(doc.id, "a").unwrap();
    let b_after = catalog.nested_field(doc.id, "b").unwrap();
    assert_eq!(a_after, a);
    assert!(!b_after.active);
}

#[tokio::test]
async fn test_nested_children_get_name_inference() {
    init_tracing();
    let driver = MockDriver::new()
        .with_feature(Capability::NestedFields)
        .with_table(
            TableIdent::new("events"),
            vec![FieldDescription::new("doc", BaseType::Dictionary)],
        )
        .with_nested("doc", &[("url", BaseType::Char), ("count", BaseType::Integer)]);
    let catalog = MemoryCatalog::new();

    run(&driver, &catalog).await;

    let events_table = catalog.table(1, "events").unwrap();
    let doc = catalog.field(events_table.id, "doc").unwrap();
    assert_eq!(
        catalog.nested_field(doc.id, "url").unwrap().special_type,
        Some(SpecialType::Url)
    );
    assert_eq!(catalog.nested_field(doc.id, "count").unwrap().special_type, None);
}

#[tokio::test]
async fn test_nested_fields_need_the_capability() {
    init_tracing();
    // Same document column, but the driver does not advertise
    // nested-fields: no children appear.
    let driver = MockDriver::new()
        .with_table(
            TableIdent::new("events"),
            vec![FieldDescription::new("doc", BaseType::Dictionary)],
        )
        .with_nested("doc", &[("a", BaseType::Integer)]);
    let catalog = MemoryCatalog::new();

    run(&driver, &catalog).await;

    let events_table = catalog.table(1, "events").unwrap();
    let doc = catalog.field(events_table.id, "doc").unwrap();
    assert!(catalog.nested_field(doc.id, "a").is_none());
}
