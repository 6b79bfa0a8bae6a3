mod support;

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use support::*;
use uc_store_engine::{
    db_types::{Activator, OrderStatus},
    events::{EventHandlers, EventHooks},
    sf_api::order_flow_api::Fulfillment,
    traits::ActivationOutcome,
    ActivationApi,
    StorefrontDatabase,
};

/// Creates a 720 UC order reserved from two 360 codes and returns it with its codes.
async fn reserved_uc_order(
    db: &uc_store_engine::SqliteDatabase,
    gateway: &MockGateway,
    tg_id: i64,
) -> (uc_store_engine::db_types::Order, Vec<String>) {
    let customer = customer_with_balance(db, tg_id, "20.00").await;
    db.add_uc_code(&format!("UC-{tg_id}-A"), 360, false).await.unwrap();
    db.add_uc_code(&format!("UC-{tg_id}-B"), 360, false).await.unwrap();
    let api = order_api(db, gateway);
    let (order, fulfillment) =
        api.create_order(customer.id, &uc_item(1, "9.50", 720), 1, Some("5551234".into())).await.unwrap();
    let Fulfillment::AwaitingActivation(codes) = fulfillment else { panic!("expected pending activation") };
    (order, codes)
}

#[tokio::test]
async fn all_codes_succeeding_completes_the_order() {
    let db = new_db().await;
    let gateway = MockGateway::new().support(Activator::UCodeium);
    db.upsert_activator_priority(Activator::UCodeium, 0, true).await.unwrap();
    let (order, codes) = reserved_uc_order(&db, &gateway, 2001).await;
    for code in &codes {
        gateway.script(Activator::UCodeium, code, ActivationOutcome::Success { status: "0".into() });
    }
    let api = activation_api(&db, &gateway);
    for code in &codes {
        api.activate_code(code).await.unwrap();
    }
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    for code in &codes {
        let uc = db.fetch_uc_code(code).await.unwrap().unwrap();
        assert!(uc.is_activated);
        assert_eq!(uc.is_success, Some(true));
        assert_eq!(uc.activator, Some(Activator::UCodeium));
    }
}

#[tokio::test]
async fn one_failing_code_fails_the_order_even_after_a_success() {
    let db = new_db().await;
    let gateway = MockGateway::new().support(Activator::UCodeium);
    db.upsert_activator_priority(Activator::UCodeium, 0, true).await.unwrap();
    let (order, codes) = reserved_uc_order(&db, &gateway, 2002).await;
    gateway.script(Activator::UCodeium, &codes[0], ActivationOutcome::Success { status: "0".into() });
    gateway.script(Activator::UCodeium, &codes[1], ActivationOutcome::Failure { status: "13:used".into() });
    let api = activation_api(&db, &gateway);
    for code in &codes {
        api.activate_code(code).await.unwrap();
    }
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Failed);
    let failed = db.fetch_uc_code(&codes[1]).await.unwrap().unwrap();
    assert_eq!(failed.is_success, Some(false));
    // the failed code is burned, not returned to stock
    assert_eq!(failed.order_id, Some(order.id));
}

#[tokio::test]
async fn providers_are_tried_in_priority_order_with_fallback() {
    let db = new_db().await;
    let gateway = MockGateway::new().support(Activator::UCodeium).support(Activator::Kokos);
    db.upsert_activator_priority(Activator::UCodeium, 0, true).await.unwrap();
    db.upsert_activator_priority(Activator::Kokos, 1, true).await.unwrap();
    // FARS is ranked but has no configured handler, so it must be skipped
    db.upsert_activator_priority(Activator::Fars, 2, true).await.unwrap();
    let (order, codes) = reserved_uc_order(&db, &gateway, 2003).await;
    let code = &codes[0];
    gateway.script(Activator::UCodeium, code, ActivationOutcome::Failure { status: "2:no balance".into() });
    gateway.script(Activator::Kokos, code, ActivationOutcome::Success { status: "0".into() });
    gateway.script(Activator::UCodeium, &codes[1], ActivationOutcome::Success { status: "0".into() });
    gateway.script(Activator::Kokos, &codes[1], ActivationOutcome::Success { status: "0".into() });

    let api = activation_api(&db, &gateway);
    for code in &codes {
        api.activate_code(code).await.unwrap();
    }
    let uc = db.fetch_uc_code(code).await.unwrap().unwrap();
    assert_eq!(uc.is_success, Some(true));
    assert_eq!(uc.activator, Some(Activator::Kokos));
    let calls = gateway.calls.lock().unwrap().clone();
    assert_eq!(calls[0], (Activator::UCodeium, code.clone()));
    assert_eq!(calls[1], (Activator::Kokos, code.clone()));
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
}

#[tokio::test]
async fn no_configured_priorities_is_a_fatal_configuration_error() {
    let db = new_db().await;
    let gateway = MockGateway::new().support(Activator::UCodeium);
    let (order, codes) = reserved_uc_order(&db, &gateway, 2004).await;
    let api = activation_api(&db, &gateway);
    api.activate_code(&codes[0]).await.unwrap();
    let uc = db.fetch_uc_code(&codes[0]).await.unwrap().unwrap();
    assert_eq!(uc.is_success, Some(false));
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Failed);
}

#[tokio::test]
async fn accepted_requests_wait_for_the_webhook() {
    let db = new_db().await;
    let gateway = MockGateway::new().support(Activator::Fars);
    db.upsert_activator_priority(Activator::Fars, 0, true).await.unwrap();
    let (order, codes) = reserved_uc_order(&db, &gateway, 2005).await;
    for code in &codes {
        gateway.script(Activator::Fars, code, ActivationOutcome::Accepted);
    }
    let api = activation_api(&db, &gateway);
    for code in &codes {
        api.activate_code(code).await.unwrap();
    }
    // nothing is resolved yet
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    for code in &codes {
        let uc = db.fetch_uc_code(code).await.unwrap().unwrap();
        assert!(!uc.is_activated);
        assert_eq!(uc.activator, Some(Activator::Fars));
        assert_eq!(uc.status.as_deref(), Some("ACCEPTED"));
    }

    // a transient status is persisted without resolving the code
    api.handle_webhook(&codes[0], "PROCESSING").await.unwrap();
    let uc = db.fetch_uc_code(&codes[0]).await.unwrap().unwrap();
    assert!(!uc.is_activated);
    assert_eq!(uc.status.as_deref(), Some("PROCESSING"));

    // terminal statuses resolve via the same path as synchronous providers
    api.handle_webhook(&codes[0], "REDEEMED").await.unwrap();
    api.handle_webhook(&codes[1], "REDEEMED").await.unwrap();
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
}

#[tokio::test]
async fn a_rejected_webhook_fails_the_order_and_replays_are_absorbed() {
    let db = new_db().await;
    let gateway = MockGateway::new().support(Activator::Fars);
    db.upsert_activator_priority(Activator::Fars, 0, true).await.unwrap();
    let (order, codes) = reserved_uc_order(&db, &gateway, 2006).await;
    for code in &codes {
        gateway.script(Activator::Fars, code, ActivationOutcome::Accepted);
    }

    // count failure notifications to prove the edge fires exactly once
    let failures = Arc::new(AtomicU64::new(0));
    let counter = failures.clone();
    let mut hooks = EventHooks::default();
    hooks.on_order_failed(move |_ev| {
        let counter = counter.clone();
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let api = ActivationApi::new(db.clone(), gateway.clone(), producers);

    for code in &codes {
        api.activate_code(code).await.unwrap();
    }
    let resolution = api.handle_webhook(&codes[0], "REJECTED").await.unwrap();
    assert!(resolution.is_some());
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Failed);

    // the replay is a no-op
    let replay = api.handle_webhook(&codes[0], "REJECTED").await.unwrap();
    assert!(replay.is_none());

    drop(api);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}
