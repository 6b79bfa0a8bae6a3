//! Endpoint tests against a real Sqlite backend and the default (provider-less) gateway.
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    web,
    App,
    Error,
};
use uc_store_engine::{
    db_types::NewCustomer,
    events::EventProducers,
    recipes::RecipeBook,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AccountManagement,
    ActivationApi,
    OrderFlowApi,
    SqliteDatabase,
    StorefrontDatabase,
    TopUpApi,
};
use uc_store_server::{catalog::Catalog, integrations::ActivatorRig, routes};
use ucs_common::Usdt;

const CATALOG: &str = r#"[
    {"id": 1, "title": "60 UC voucher", "category": "codes", "price": 5000, "amount": 60, "is_active": true}
]"#;

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

async fn test_app(
    db: SqliteDatabase,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    let catalog = Catalog::from_json(CATALOG).expect("Invalid test catalog");
    let gateway = ActivatorRig::default();
    let orders_api = OrderFlowApi::new(db.clone(), gateway.clone(), RecipeBook::standard(), EventProducers::default());
    let activation_api = ActivationApi::new(db.clone(), gateway, EventProducers::default());
    let topup_api = TopUpApi::new(db.clone(), Usdt::from_milli(30), 95.0);
    test::init_service(
        App::new()
            .app_data(web::Data::new(db))
            .app_data(web::Data::new(catalog))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(activation_api))
            .app_data(web::Data::new(topup_api))
            .service(routes::health)
            .service(
                web::scope("/api")
                    .service(routes::create_order)
                    .service(routes::get_order)
                    .service(routes::cancel_order)
                    .service(routes::set_order_message)
                    .service(routes::customer_orders)
                    .service(routes::upsert_customer)
                    .service(routes::get_customer)
                    .service(routes::redeem_points)
                    .service(routes::item_stock)
                    .service(routes::create_topup)
                    .service(routes::get_topup)
                    .service(routes::confirm_topup),
            )
            .service(web::scope("/webhook").service(routes::fars_webhook)),
    )
    .await
}

#[actix_web::test]
async fn health_check_works() {
    let db = new_db().await;
    let app = test_app(db).await;
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body = test::read_body(resp).await;
    assert_eq!(body, "👍️\n".as_bytes());
}

#[actix_web::test]
async fn a_stock_order_is_fulfilled_in_the_response() {
    let db = new_db().await;
    let customer = db.upsert_customer(NewCustomer::new(100)).await.unwrap();
    db.process_payment(customer.id, "10".parse().unwrap()).await.unwrap();
    db.add_stock_code("CODE-AAA", 60).await.unwrap();
    let app = test_app(db.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(serde_json::json!({ "customer_id": customer.id, "item_id": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["order"]["status"], "Completed");
    assert_eq!(body["fulfillment"]["status"], "delivered");
    assert_eq!(body["fulfillment"]["codes"], serde_json::json!(["CODE-AAA"]));

    let customer = db.fetch_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(customer.balance, "5".parse::<Usdt>().unwrap());
}

#[actix_web::test]
async fn ordering_an_unknown_item_is_a_404() {
    let db = new_db().await;
    let customer = db.upsert_customer(NewCustomer::new(101)).await.unwrap();
    let app = test_app(db).await;
    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(serde_json::json!({ "customer_id": customer.id, "item_id": 999 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn an_empty_balance_is_a_402() {
    let db = new_db().await;
    let customer = db.upsert_customer(NewCustomer::new(102)).await.unwrap();
    db.add_stock_code("CODE-BBB", 60).await.unwrap();
    let app = test_app(db).await;
    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(serde_json::json!({ "customer_id": customer.id, "item_id": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
}

#[actix_web::test]
async fn webhooks_with_unknown_codes_still_return_200() {
    let db = new_db().await;
    let app = test_app(db).await;
    let req = test::TestRequest::post()
        .uri("/webhook/fars")
        .set_json(serde_json::json!({
            "merchant_order_id": "1_5123456789",
            "codes": { "NO-SUCH-CODE": "REDEEMED" }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn the_webhook_batch_status_applies_to_every_code() {
    let db = new_db().await;
    db.add_uc_code("UC-W1", 60, false).await.unwrap();
    db.add_uc_code("UC-W2", 60, false).await.unwrap();
    let app = test_app(db.clone()).await;

    // The provider echoes the redemption map (code -> denomination) and reports one status for
    // the whole batch.
    let req = test::TestRequest::post()
        .uri("/webhook/fars")
        .set_json(serde_json::json!({
            "merchant_order_id": "7_5123456789",
            "status": "REDEEMED",
            "codes": { "UC-W1": 60, "UC-W2": 60 }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    for code in ["UC-W1", "UC-W2"] {
        let code = db.fetch_uc_code(code).await.unwrap().unwrap();
        assert!(code.is_activated);
        assert_eq!(code.is_success, Some(true));
        assert_eq!(code.status.as_deref(), Some("REDEEMED"));
    }
}

#[actix_web::test]
async fn a_topup_round_trip_credits_the_balance() {
    let db = new_db().await;
    let customer = db.upsert_customer(NewCustomer::new(103)).await.unwrap();
    let app = test_app(db.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/topups")
        .set_json(serde_json::json!({ "customer_id": customer.id, "amount": "25" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let topup: serde_json::Value = test::read_body_json(resp).await;
    let topup_id = topup["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/topups/{topup_id}/confirm"))
        .set_json(serde_json::json!({ "tx_id": "0xdeadbeef" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let customer = db.fetch_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(customer.balance, "25".parse::<Usdt>().unwrap());
}
