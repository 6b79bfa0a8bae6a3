//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into
//! a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are plain async functions: every route talks to the engine APIs through
//! `web::Data`-wrapped instances built once per worker in [`crate::server`].
use actix_web::{get, post, web, HttpResponse, Responder};
use log::*;
use uc_store_engine::{
    sf_api::order_flow_api::Fulfillment,
    AccountManagement,
    ActivationApi,
    OrderFlowApi,
    SqliteDatabase,
    StorefrontDatabase,
    StorefrontError,
    TopUpApi,
};
use ucs_common::Usdt;

use crate::{
    catalog::Catalog,
    data_objects::{
        ActivatorPriorityRequest,
        AdminOrderRequest,
        CancelOrderRequest,
        CodeepayWebhookPayload,
        ConfirmTopUpRequest,
        FarsWebhookPayload,
        JsonResponse,
        NewCustomerRequest,
        NewOrderRequest,
        NewTopUpRequest,
        OrderResult,
        SetMessageRequest,
    },
    errors::ServerError,
    integrations::ActivatorRig,
};

pub type OrderApi = OrderFlowApi<SqliteDatabase, ActivatorRig>;
pub type CodeActivationApi = ActivationApi<SqliteDatabase, ActivatorRig>;
pub type DepositApi = TopUpApi<SqliteDatabase>;

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// Route handler for placing a new order.
///
/// Synchronous categories come back fulfilled (or failed) in the response. UC code orders return
/// `awaiting_activation` and the reserved codes are activated on background tasks; the order
/// completes or fails later, announced through the event hooks and the provider webhook.
#[post("/orders")]
pub async fn create_order(
    req: web::Json<NewOrderRequest>,
    catalog: web::Data<Catalog>,
    orders: web::Data<OrderApi>,
    activations: web::Data<CodeActivationApi>,
) -> Result<HttpResponse, ServerError> {
    let req = req.into_inner();
    let item = catalog
        .item(req.item_id)
        .ok_or_else(|| ServerError::NoRecordFound(format!("Item #{} is not in the catalog", req.item_id)))?;
    let (order, fulfillment) = orders.create_order(req.customer_id, item, req.quantity, req.player_id).await?;
    if let Fulfillment::AwaitingActivation(codes) = &fulfillment {
        for code in codes.clone() {
            let api = activations.clone().into_inner();
            tokio::spawn(async move {
                if let Err(e) = api.activate_code(&code).await {
                    error!("🔑️ Background activation of code {code} failed: {e}");
                }
            });
        }
    }
    Ok(HttpResponse::Ok().json(OrderResult { order, fulfillment: fulfillment.into() }))
}

#[get("/orders/{order_id}")]
pub async fn get_order(
    path: web::Path<i64>,
    orders: web::Data<OrderApi>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let order = orders
        .fetch_order(order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order #{order_id}")))?;
    Ok(HttpResponse::Ok().json(order))
}

#[get("/customers/{customer_id}/orders")]
pub async fn customer_orders(
    path: web::Path<i64>,
    orders: web::Data<OrderApi>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = path.into_inner();
    let orders = orders.orders_for_customer(customer_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

/// Cancels a pending order with a full refund. A `customer_id` in the body restricts the
/// cancellation to the order's owner; the admin routes skip that check.
#[post("/orders/{order_id}/cancel")]
pub async fn cancel_order(
    path: web::Path<i64>,
    req: web::Json<CancelOrderRequest>,
    orders: web::Data<OrderApi>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    match orders.cancel_order(order_id, req.customer_id).await? {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => Ok(HttpResponse::Ok().json(JsonResponse::failure("Order has already been decided"))),
    }
}

/// Records the chat message id attached to the order so later notifications can edit the order
/// card in place.
#[post("/orders/{order_id}/message")]
pub async fn set_order_message(
    path: web::Path<i64>,
    req: web::Json<SetMessageRequest>,
    db: web::Data<SqliteDatabase>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    db.set_order_message_id(order_id, req.message_id).await.map_err(|e| match e {
        StorefrontError::OrderNotFound(id) => ServerError::NoRecordFound(format!("Order #{id}")),
        e => ServerError::BackendError(e.to_string()),
    })?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Message id recorded")))
}

#[post("/customers")]
pub async fn upsert_customer(
    req: web::Json<NewCustomerRequest>,
    db: web::Data<SqliteDatabase>,
) -> Result<HttpResponse, ServerError> {
    let customer = db.upsert_customer(req.into_inner().into()).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    Ok(HttpResponse::Ok().json(customer))
}

#[get("/customers/{tg_id}")]
pub async fn get_customer(
    path: web::Path<i64>,
    db: web::Data<SqliteDatabase>,
) -> Result<HttpResponse, ServerError> {
    let tg_id = path.into_inner();
    let customer = db
        .fetch_customer_by_tg_id(tg_id)
        .await
        .map_err(|e| ServerError::BackendError(e.to_string()))?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Customer with Telegram id {tg_id}")))?;
    Ok(HttpResponse::Ok().json(customer))
}

/// Converts every full block of loyalty points on the account into balance.
#[post("/customers/{customer_id}/redeem_points")]
pub async fn redeem_points(
    path: web::Path<i64>,
    db: web::Data<SqliteDatabase>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = path.into_inner();
    let redeemed =
        db.redeem_points(customer_id).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    let response = if redeemed {
        JsonResponse::success("Points redeemed")
    } else {
        JsonResponse::failure("Not enough points to redeem")
    };
    Ok(HttpResponse::Ok().json(response))
}

#[get("/items/{item_id}/stock")]
pub async fn item_stock(
    path: web::Path<i64>,
    catalog: web::Data<Catalog>,
    orders: web::Data<OrderApi>,
) -> Result<HttpResponse, ServerError> {
    let item_id = path.into_inner();
    let item = catalog
        .item(item_id)
        .ok_or_else(|| ServerError::NoRecordFound(format!("Item #{item_id} is not in the catalog")))?;
    let stock = orders.stock_amount(item).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "item_id": item_id, "stock": stock })))
}

#[post("/topups")]
pub async fn create_topup(
    req: web::Json<NewTopUpRequest>,
    topups: web::Data<DepositApi>,
) -> Result<HttpResponse, ServerError> {
    let req = req.into_inner();
    let amount = req
        .amount
        .parse::<Usdt>()
        .map_err(|e| ServerError::InvalidRequestBody(format!("{} is not a valid deposit amount. {e}", req.amount)))?;
    let topup = topups.create_topup(req.customer_id, amount, req.currency, req.payment_url).await?;
    Ok(HttpResponse::Ok().json(topup))
}

#[get("/topups/{topup_id}")]
pub async fn get_topup(
    path: web::Path<i64>,
    topups: web::Data<DepositApi>,
) -> Result<HttpResponse, ServerError> {
    let topup_id = path.into_inner();
    let topup = topups
        .fetch_topup(topup_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Top-up #{topup_id}")))?;
    Ok(HttpResponse::Ok().json(topup))
}

/// Marks a deposit as paid and credits the base amount. Replays are absorbed: a second
/// confirmation reports success without crediting again.
#[post("/topups/{topup_id}/confirm")]
pub async fn confirm_topup(
    path: web::Path<i64>,
    req: web::Json<ConfirmTopUpRequest>,
    topups: web::Data<DepositApi>,
) -> Result<HttpResponse, ServerError> {
    let topup_id = path.into_inner();
    match topups.confirm_payment(topup_id, req.tx_id.as_deref()).await? {
        Some(topup) => Ok(HttpResponse::Ok().json(topup)),
        None => Ok(HttpResponse::Ok().json(JsonResponse::success("Top-up has already been credited"))),
    }
}

#[post("/admin/orders/{order_id}/complete")]
pub async fn admin_complete_order(
    path: web::Path<i64>,
    req: web::Json<AdminOrderRequest>,
    orders: web::Data<OrderApi>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let order = orders.admin_complete_order(req.admin_tg_id, order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/admin/orders/{order_id}/cancel")]
pub async fn admin_cancel_order(
    path: web::Path<i64>,
    req: web::Json<AdminOrderRequest>,
    orders: web::Data<OrderApi>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    match orders.admin_cancel_order(req.admin_tg_id, order_id).await? {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => Ok(HttpResponse::Ok().json(JsonResponse::failure("Order has already been decided"))),
    }
}

/// Registers or re-ranks an activation provider. Takes effect on the next activation attempt; the
/// ranking is re-read from the database every time.
#[post("/admin/activators")]
pub async fn set_activator_priority(
    req: web::Json<ActivatorPriorityRequest>,
    activations: web::Data<CodeActivationApi>,
) -> Result<HttpResponse, ServerError> {
    let req = req.into_inner();
    activations.set_priority(req.name, req.priority, req.is_active).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} ranked at {}", req.name, req.priority))))
}

/// Route handler for the ruble gateway's payment callback.
///
/// Marks the deposit paid and credits the base amount. Replays and non-paid statuses are absorbed
/// with a 200 so the gateway stops retrying.
#[post("/codeepay")]
pub async fn codeepay_webhook(
    req: web::Json<CodeepayWebhookPayload>,
    topups: web::Data<DepositApi>,
) -> Result<HttpResponse, ServerError> {
    let payload = req.into_inner();
    let paid = payload
        .status
        .as_deref()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "paid" | "success"))
        .unwrap_or(true);
    if !paid {
        info!("📬️ Codeepay webhook for top-up #{} with status {:?}. Ignored.", payload.topup_id, payload.status);
        return Ok(HttpResponse::Ok().json(JsonResponse::success("Ignored")));
    }
    match topups.confirm_payment(payload.topup_id, payload.tx_id.as_deref()).await? {
        Some(topup) => {
            info!("📬️ Top-up #{} credited via the Codeepay callback", topup.id);
            Ok(HttpResponse::Ok().json(JsonResponse::success("Credited")))
        },
        None => Ok(HttpResponse::Ok().json(JsonResponse::success("Top-up has already been credited"))),
    }
}

/// Route handler for the asynchronous provider's terminal callbacks.
///
/// The batch-wide `status` is applied to every code in the payload through the shared resolution
/// path. Unknown codes and replays are absorbed with a 200 so the provider stops retrying;
/// transient statuses are recorded and left pending.
#[post("/fars")]
pub async fn fars_webhook(
    req: web::Json<FarsWebhookPayload>,
    activations: web::Data<CodeActivationApi>,
) -> Result<HttpResponse, ServerError> {
    let payload = req.into_inner();
    let order_ref = payload.merchant_order_id.as_deref().unwrap_or("-");
    info!("📬️ FARS webhook for order {order_ref} carrying {} codes", payload.codes.len());
    let mut resolved = 0usize;
    for (code, value) in &payload.codes {
        let Some(status) = payload.status.as_deref().or_else(|| value.as_str()) else {
            warn!("📬️ FARS webhook carried no status for code {code}. Skipping it.");
            continue;
        };
        match activations.handle_webhook(code, status).await {
            Ok(Some(_)) => resolved += 1,
            Ok(None) => {},
            Err(e) => {
                // A 200 is still returned for the other codes; this one will be retried.
                error!("📬️ Webhook resolution of code {code} failed: {e}");
            },
        }
    }
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{resolved} codes resolved"))))
}
