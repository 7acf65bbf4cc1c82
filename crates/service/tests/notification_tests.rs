//! End-to-end notification flow: service → outbox → fan-out → delivery.

mod common;

use std::time::Duration;

use common::*;
use http::Method;
use serde_json::json;

use tmf_persistence::schema::ResourceType;
use tmf_service::RequestArgs;

const CREATED_CB: &str = "https://listener.example.com/created";
const REMOVED_CB: &str = "https://listener.example.com/removed";

// ============================================================================
// Fan-out
// ============================================================================

#[tokio::test]
async fn test_creation_hub_gets_one_delivery_per_create() {
    let b = TestBroker::start().await;
    b.subscribe(CREATED_CB, "eventType=ServiceCreationNotification").await;
    b.subscribe(REMOVED_CB, "eventType=ServiceRemoveNotification").await;

    let id = b.create_id(ResourceType::Service, json!({"name": "svc1"})).await;
    assert!(wait_for(|| b.transport.calls_to(CREATED_CB).len() == 1).await);

    let delivery = &b.transport.calls_to(CREATED_CB)[0];
    assert_eq!(delivery.body["eventType"], "ServiceCreationNotification");
    assert_eq!(delivery.body["event"]["service"]["name"], "svc1");
    assert_eq!(delivery.body["event"]["service"]["id"], json!(id));
    assert!(delivery.body["eventId"].is_string());
    assert!(delivery.body["eventTime"].is_string());
    assert!(delivery.body.get("id").is_none());

    let response = b
        .service
        .remove(
            &RequestArgs::for_id(&id),
            &ctx(ResourceType::Service, Method::DELETE),
        )
        .await
        .unwrap();
    assert_eq!(response.code.as_u16(), 204);

    assert!(wait_for(|| b.transport.calls_to(REMOVED_CB).len() == 1).await);
    let removal = &b.transport.calls_to(REMOVED_CB)[0];
    assert_eq!(removal.body["eventType"], "ServiceRemoveNotification");
    assert_eq!(removal.body["event"]["service"]["id"], json!(id));

    assert_eq!(b.transport.calls_to(CREATED_CB).len(), 1);
}

#[tokio::test]
async fn test_unparsable_filter_gets_nothing() {
    let b = TestBroker::start().await;
    let broken = "https://listener.example.com/broken";
    b.subscribe(broken, "eventType").await;
    b.subscribe(CREATED_CB, "eventType=ServiceCreationNotification").await;

    b.create(ResourceType::Service, json!({"name": "svc1"})).await;
    assert!(wait_for(|| b.transport.calls_to(CREATED_CB).len() == 1).await);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(b.transport.calls_to(broken).is_empty());
}

#[tokio::test]
async fn test_unknown_operator_filter_gets_nothing() {
    let b = TestBroker::start().await;
    let removals = "https://listener.example.com/removals";
    b.subscribe(
        removals,
        "eventType.like=ServiceRemoveNotification&event.service.name=svc1",
    )
    .await;
    b.subscribe(CREATED_CB, "eventType=ServiceCreationNotification").await;

    b.create(ResourceType::Service, json!({"name": "svc1"})).await;
    assert!(wait_for(|| b.transport.calls_to(CREATED_CB).len() == 1).await);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(b.transport.calls_to(removals).is_empty());
}

#[tokio::test]
async fn test_filter_on_event_content() {
    let b = TestBroker::start().await;
    b.subscribe(CREATED_CB, "event.service.state=active").await;

    b.create(ResourceType::Service, json!({"name": "off", "state": "inactive"}))
        .await;
    b.create(ResourceType::Service, json!({"name": "on", "state": "active"}))
        .await;

    assert!(wait_for(|| b.transport.calls_to(CREATED_CB).len() == 1).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let calls = b.transport.calls_to(CREATED_CB);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body["event"]["service"]["name"], "on");
}

#[tokio::test]
async fn test_state_change_classification() {
    let b = TestBroker::start().await;
    let state_cb = "https://listener.example.com/state";
    let attr_cb = "https://listener.example.com/attr";
    b.subscribe(state_cb, "eventType=ServiceStateChangeNotification").await;
    b.subscribe(attr_cb, "eventType=ServiceAttributeValueChangeNotification")
        .await;

    let id = b
        .create_id(ResourceType::Service, json!({"name": "svc", "state": "inactive"}))
        .await;
    let ctx = ctx(ResourceType::Service, Method::PATCH);

    b.service
        .patch(
            &RequestArgs::for_id(&id).with_body(json!({"name": "renamed"})),
            &ctx,
        )
        .await
        .unwrap();
    b.service
        .patch(
            &RequestArgs::for_id(&id).with_body(json!({"state": "active"})),
            &ctx,
        )
        .await
        .unwrap();

    assert!(wait_for(|| b.transport.calls_to(state_cb).len() == 1).await);
    assert!(wait_for(|| b.transport.calls_to(attr_cb).len() == 1).await);

    let state = &b.transport.calls_to(state_cb)[0];
    assert_eq!(state.body["event"]["service"]["state"], "active");
    assert_eq!(state.body["event"]["service"]["name"], "renamed");
}

#[tokio::test]
async fn test_reads_and_hubs_publish_nothing() {
    let b = TestBroker::start().await;
    let all_cb = "https://listener.example.com/all";
    b.subscribe(all_cb, "eventType=ServiceCreationNotification,HubCreationNotification")
        .await;

    let id = b.create_id(ResourceType::Service, json!({"name": "svc"})).await;
    b.service
        .show(&RequestArgs::for_id(&id), &ctx(ResourceType::Service, Method::GET))
        .await
        .unwrap();
    b.service
        .index(&RequestArgs::new(), &ctx(ResourceType::Service, Method::GET))
        .await
        .unwrap();
    b.subscribe("https://listener.example.com/other", "eventType=X").await;

    assert!(wait_for(|| b.transport.calls_to(all_cb).len() == 1).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(b.transport.calls().len(), 1);
}

// ============================================================================
// Async create
// ============================================================================

#[tokio::test]
async fn test_async_create_notifies_monitor_creation() {
    let b = TestBroker::start().await;
    let monitor_cb = "https://listener.example.com/monitor";
    let order_cb = "https://listener.example.com/order";
    b.subscribe(monitor_cb, "eventType=MonitorCreationNotification").await;
    b.subscribe(order_cb, "eventType=ServiceOrderCreationNotification").await;

    let response = b
        .service
        .create(
            &RequestArgs::new().with_body(json!({"serviceOrderItem": [{"id": "1"}]})),
            &async_ctx(ResourceType::ServiceOrder),
        )
        .await
        .unwrap();
    assert_eq!(response.code.as_u16(), 202);

    assert!(wait_for(|| b.transport.calls_to(monitor_cb).len() == 1).await);
    let monitor = &b.transport.calls_to(monitor_cb)[0].body["event"]["monitor"];
    assert_eq!(monitor["state"], "InProgress");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(b.transport.calls_to(order_cb).is_empty());
}

// ============================================================================
// Delivery and cleanup
// ============================================================================

#[tokio::test]
async fn test_failed_delivery_is_retried() {
    let b = TestBroker::start().await;
    b.subscribe(CREATED_CB, "eventType=ServiceCreationNotification").await;
    b.transport.fail(CREATED_CB, 2);

    b.create(ResourceType::Service, json!({"name": "svc"})).await;

    assert!(wait_for(|| b.transport.calls_to(CREATED_CB).len() == 3).await);
    let calls = b.transport.calls_to(CREATED_CB);
    assert_eq!(calls[0].body, calls[2].body);
    assert!(b.queue.dead_letters().is_empty());
}

#[tokio::test]
async fn test_exhausted_delivery_is_dead_lettered() {
    let b = TestBroker::start().await;
    b.subscribe(CREATED_CB, "eventType=ServiceCreationNotification").await;
    b.transport.fail(CREATED_CB, 100);

    let response = b.create(ResourceType::Service, json!({"name": "svc"})).await;
    assert_eq!(response.code.as_u16(), 201);

    assert!(wait_for(|| b.queue.dead_letters().len() == 1).await);
    assert_eq!(b.transport.calls_to(CREATED_CB).len(), 3);
}

#[tokio::test]
async fn test_slow_subscriber_does_not_block_others() {
    let b = TestBroker::start().await;
    let failing = "https://listener.example.com/failing";
    b.subscribe(failing, "eventType=ServiceCreationNotification").await;
    b.subscribe(CREATED_CB, "eventType=ServiceCreationNotification").await;
    b.transport.fail(failing, 100);

    b.create(ResourceType::Service, json!({"name": "a"})).await;
    b.create(ResourceType::Service, json!({"name": "b"})).await;

    assert!(wait_for(|| b.transport.calls_to(CREATED_CB).len() == 2).await);
}

#[tokio::test]
async fn test_event_documents_are_cleaned_up() {
    let b = TestBroker::start().await;
    b.subscribe(CREATED_CB, "eventType=ServiceCreationNotification").await;
    b.subscribe("https://listener.example.com/broken", "===").await;

    for i in 0..3 {
        b.create(ResourceType::Service, json!({"name": format!("svc-{}", i)}))
            .await;
    }

    assert!(wait_for(|| b.transport.calls_to(CREATED_CB).len() == 3).await);
    assert!(wait_for(|| b.store.len(ResourceType::Event) == 0).await);
}
