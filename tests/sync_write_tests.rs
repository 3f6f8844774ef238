//! Resource Write Tests
//!
//! Covers create, update and delete through `ResourceSync`:
//! - Validation before any network traffic
//! - Connectivity checks and failure notices
//! - Scope refresh after an accepted write
//! - Delete confirmation
//! - Listing uploads and the availability sub-resource

mod common;

use common::{listing, Harness};
use rental_sync::client::ImageUpload;
use rental_sync::models::{Availability, Message, Property, Resource};
use rental_sync::sync::{ItemState, NoticeKind, ResourceSync};
use serde_json::json;

fn new_listing(owner: i64) -> Property {
    Property {
        user_id: Some(owner),
        title: Some("Garden studio".to_string()),
        address: Some("3 Rua Nova".to_string()),
        city: Some("Porto".to_string()),
        zip_code: Some("4000-001".to_string()),
        price_per_month: Some(700.0),
        num_bedrooms: Some(1),
        num_bathrooms: Some(1),
        property_type: Some(2),
        is_active: Some(true),
        ..Default::default()
    }
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_invalid_item_never_reaches_server() {
    let h = Harness::new().await;
    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();

    let mut property = new_listing(7);
    property.title = None;
    property.price_per_month = Some(0.0);

    let err = sync.create(Some(7), &property).await.unwrap_err();
    assert_eq!(err.problems.len(), 2);
    assert!(err.problems[0].starts_with("Title is required"));
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn test_message_to_self_is_rejected() {
    let h = Harness::new().await;
    let sync = ResourceSync::<Message>::new(h.ctx.clone()).unwrap();

    let message = Message {
        sender_id: Some(3),
        receiver_id: Some(3),
        text: Some("hello".to_string()),
        ..Default::default()
    };

    assert!(sync.create(Some(3), &message).await.is_err());
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn test_create_offline_is_not_attempted() {
    let h = Harness::new().await;
    h.go_offline();

    let mut notices = h.ctx.notices.subscribe();
    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();

    assert!(!sync.create(Some(7), &new_listing(7)).await.unwrap());
    assert!(h.remote.calls().is_empty());
    assert_eq!(notices.try_recv().unwrap().kind, NoticeKind::Offline);
}

#[tokio::test]
async fn test_create_refreshes_parent_collection() {
    let h = Harness::new().await;
    h.remote.respond("POST properties", json!({"Property_ID": 3}));
    h.remote
        .respond("GET users/7/properties", json!([listing(3, 7)]));

    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();
    assert!(sync.create(Some(7), &new_listing(7)).await.unwrap());

    assert_eq!(
        h.remote.calls(),
        vec!["POST properties".to_string(), "GET users/7/properties".to_string()]
    );
    assert_eq!(h.remote.bodies()[0]["Property_Title"], json!("Garden studio"));

    let owned = sync.items_by_parent(7).await;
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].id, Some(3));
    assert_eq!(h.count("properties").await, 1);
}

#[tokio::test]
async fn test_rejected_create_leaves_cache_untouched() {
    let h = Harness::new().await;
    h.remote.fail("POST properties", 422);

    let mut notices = h.ctx.notices.subscribe();
    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();

    assert!(!sync.create(Some(7), &new_listing(7)).await.unwrap());
    assert_eq!(h.remote.calls(), vec!["POST properties".to_string()]);
    assert_eq!(h.count("properties").await, 0);
    assert_eq!(notices.try_recv().unwrap().kind, NoticeKind::SyncFailed);
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_requires_id() {
    let h = Harness::new().await;
    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();

    assert!(sync.update(&new_listing(7), Some(7)).await.is_err());
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn test_update_refreshes_collection_and_item() {
    let h = Harness::new().await;
    let mut renamed = listing(3, 7);
    renamed["Property_Title"] = json!("Garden studio, renovated");
    h.remote.respond("PUT properties/3", json!({"message": "updated"}));
    h.remote.respond("GET users/7/properties", json!([renamed]));

    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();
    let mut property = new_listing(7);
    property.id = Some(3);

    assert!(sync.update(&property, Some(7)).await.unwrap());
    assert!(h.remote.called("PUT properties/3"));

    match sync.item(3).await {
        ItemState::Loaded(p) => assert_eq!(p.title.as_deref(), Some("Garden studio, renovated")),
        other => panic!("expected loaded item, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_without_parent_refreshes_full_collection() {
    let h = Harness::new().await;
    h.remote.respond("PUT properties/1", json!({}));
    h.remote.respond("GET properties", json!([listing(1, 7)]));

    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();
    let property: Property = serde_json::from_value(listing(1, 7)).unwrap();

    assert!(sync.update(&property, None).await.unwrap());
    assert!(h.remote.called("GET properties"));
    assert_eq!(sync.items().await.len(), 1);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_refused_delete_sends_nothing() {
    let h = Harness::new().await;
    h.ctx
        .upserter()
        .upsert("properties", &[listing(1, 7)])
        .await
        .unwrap();

    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();

    assert!(!sync.delete(1, Some(7)).await);
    assert!(h.remote.calls().is_empty());
    assert_eq!(h.count("properties").await, 1);
}

#[tokio::test]
async fn test_confirmed_delete_removes_item() {
    let h = Harness::confirming().await;
    h.ctx
        .upserter()
        .upsert("properties", &[listing(1, 7), listing(2, 7)])
        .await
        .unwrap();
    h.remote.respond("DELETE properties/1", json!({}));
    h.remote
        .respond("GET users/7/properties", json!([listing(2, 7)]));

    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();
    assert!(sync.delete(1, Some(7)).await);

    assert_eq!(
        h.remote.calls(),
        vec!["DELETE properties/1".to_string(), "GET users/7/properties".to_string()]
    );
    assert!(sync.item(1).await.is_absent());
    assert_eq!(h.count("properties").await, 1);

    let owned = sync.items_by_parent(7).await;
    assert_eq!(owned.iter().filter_map(|p| p.id()).collect::<Vec<_>>(), vec![2]);
}

#[tokio::test]
async fn test_failed_delete_keeps_local_row() {
    let h = Harness::confirming().await;
    h.ctx
        .upserter()
        .upsert("properties", &[listing(1, 7)])
        .await
        .unwrap();
    h.remote.fail("DELETE properties/1", 403);

    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();

    assert!(!sync.delete(1, Some(7)).await);
    assert_eq!(h.count("properties").await, 1);
}

// ============================================================================
// Listing uploads
// ============================================================================

#[tokio::test]
async fn test_create_with_images_stores_returned_listing() {
    let h = Harness::new().await;
    h.remote.respond(
        "POST createPropertyWithImages",
        json!({"message": "created", "property": listing(5, 7)}),
    );
    h.remote
        .respond("GET users/7/properties", json!([listing(5, 7)]));

    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();
    let images = vec![ImageUpload::file("front.jpg", "image/jpeg", vec![0xff, 0xd8])];
    let created = sync
        .create_with_images(&new_listing(7), images)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(created.id, Some(5));
    assert_eq!(h.count("images").await, 2);
    assert!(matches!(sync.item(5).await, ItemState::Loaded(_)));

    let form = &h.remote.forms()[0];
    assert_eq!(form.field("Property_Title"), Some("Garden studio"));
    assert_eq!(form.field("Property_Is_Active"), Some("1"));
    assert_eq!(form.images.len(), 1);
}

#[tokio::test]
async fn test_update_with_images_keeps_existing_urls() {
    let h = Harness::new().await;
    h.remote.respond(
        "POST updatePropertyWithImages/5",
        json!({"property": listing(5, 7)}),
    );
    h.remote
        .respond("GET users/7/properties", json!([listing(5, 7)]));

    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();
    let mut property = new_listing(7);
    property.id = Some(5);
    let images = vec![ImageUpload::Existing("https://cdn.example/a.jpg".to_string())];

    let updated = sync.update_with_images(&property, images).await.unwrap();
    assert_eq!(updated.and_then(|p| p.id), Some(5));
    assert_eq!(
        h.remote.forms()[0].images,
        vec![ImageUpload::Existing("https://cdn.example/a.jpg".to_string())]
    );
}

#[tokio::test]
async fn test_update_availability() {
    let h = Harness::new().await;
    let mut paused = listing(5, 7);
    paused["Property_Is_Active"] = json!(false);
    h.remote
        .respond("PUT properties/5/availability", json!({"property": paused.clone()}));
    h.remote
        .respond("GET users/7/properties", json!([paused]));

    let sync = ResourceSync::<Property>::new(h.ctx.clone()).unwrap();
    let availability = Availability {
        is_active: Some(false),
        ..Default::default()
    };
    let updated = sync.update_availability(5, &availability).await.unwrap();

    assert_eq!(updated.is_active, Some(false));
    assert_eq!(h.remote.bodies()[0], json!({"Property_Is_Active": false}));
    assert!(h.remote.called("GET users/7/properties"));
}
