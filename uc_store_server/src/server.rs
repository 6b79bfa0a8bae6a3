use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use log::*;
use uc_store_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    recipes::RecipeBook,
    ActivationApi,
    OrderFlowApi,
    SqliteDatabase,
    TopUpApi,
};

use crate::{
    catalog::Catalog,
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::ActivatorRig,
    routes,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let catalog = Catalog::from_file(&config.catalog_path)?;
    let gateway = ActivatorRig::from_env();
    let handlers = EventHandlers::new(25, log_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let sweep_api = TopUpApi::new(db.clone(), config.min_commission, config.rub_usdt_rate);
    start_expiry_worker(sweep_api, config.topup_lifetime);
    let srv = create_server_instance(config, db, catalog, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    catalog: Catalog,
    gateway: ActivatorRig,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), gateway.clone(), RecipeBook::standard(), producers.clone());
        let activation_api = ActivationApi::new(db.clone(), gateway.clone(), producers.clone());
        let topup_api = TopUpApi::new(db.clone(), config.min_commission, config.rub_usdt_rate);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ucs::access_log"))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(catalog.clone()))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(activation_api))
            .app_data(web::Data::new(topup_api));
        let api_secret = config.api_secret.clone();
        let use_x_forwarded_for = config.use_x_forwarded_for;
        // The bot process is the only /api client. Everything in the scope, admin routes included,
        // is gated on the shared secret; the engine separately checks the admin flag for the
        // operator routes.
        let api_scope = web::scope("/api")
            .wrap_fn(move |req, srv| {
                let presented = req.headers().get("X-Api-Key").and_then(|v| v.to_str().ok());
                let authorized = presented.map(|key| key == api_secret.reveal()).unwrap_or(false);
                if authorized {
                    srv.call(req)
                } else {
                    let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
                    let peer = req
                        .headers()
                        .get("X-Forwarded-For")
                        .and_then(|v| use_x_forwarded_for.then(|| v.to_str().ok()).flatten())
                        .map(|s| s.to_string())
                        .or(peer_addr)
                        .unwrap_or_else(|| "unknown".to_string());
                    warn!("🔐️ Rejected an /api request from {peer}: missing or invalid API key");
                    ok(req.error_response(ServerError::InsufficientPermissions(
                        "Missing or invalid API key".to_string(),
                    )))
                    .boxed_local()
                }
            })
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
            .service(routes::confirm_topup)
            .service(routes::admin_complete_order)
            .service(routes::admin_cancel_order)
            .service(routes::set_activator_priority);
        let webhook_scope =
            web::scope("/webhook").service(routes::fars_webhook).service(routes::codeepay_webhook);
        app.service(routes::health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Default event hooks that write every storefront event to the log. A bot deployment replaces
/// these with hooks that deliver Telegram messages.
fn log_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_completed(|event| {
            Box::pin(async move {
                info!("📣️ Order #{} completed. {} codes delivered.", event.order.id, event.codes.len());
            })
        })
        .on_order_failed(|event| {
            Box::pin(async move {
                warn!("📣️ Order #{} failed: {}", event.order.id, event.reason);
            })
        })
        .on_order_cancelled(|event| {
            Box::pin(async move {
                info!("📣️ Order #{} cancelled and refunded.", event.order.id);
            })
        })
        .on_manual_order(|event| {
            Box::pin(async move {
                info!(
                    "📣️ Order #{} needs manual fulfillment (manager chat: {:?}).",
                    event.order.id, event.chat_id
                );
            })
        })
        .on_operator_alert(|event| {
            Box::pin(async move {
                warn!("🚨️ Operator alert (order {:?}): {}", event.order_id, event.message);
            })
        });
    hooks
}
