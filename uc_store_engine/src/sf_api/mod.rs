//! The public API surface for the storefront engine.
//!
//! * [`OrderFlowApi`](order_flow_api::OrderFlowApi) creates orders and dispatches fulfillment by
//!   catalog category.
//! * [`ActivationApi`](activation_api::ActivationApi) drives the provider priority loop for UC
//!   codes and applies webhook results.
//! * [`TopUpApi`](topup_api::TopUpApi) manages balance deposits.
//!
//! The APIs are generic over the database backend and the activation gateway, so tests can plug in
//! mock providers without touching the orchestration logic.
pub mod activation_api;
pub mod errors;
pub mod order_flow_api;
pub mod topup_api;

use crate::{
    db_types::Order,
    events::{
        EventProducers,
        ManualOrderEvent,
        OperatorAlertEvent,
        OrderCancelledEvent,
        OrderCompletedEvent,
        OrderFailedEvent,
    },
};

pub(crate) async fn publish_order_completed(producers: &EventProducers, order: &Order, codes: &[String]) {
    for producer in &producers.order_completed_producer {
        producer.publish_event(OrderCompletedEvent::new(order.clone(), codes.to_vec())).await;
    }
}

pub(crate) async fn publish_order_failed(producers: &EventProducers, order: &Order, reason: &str) {
    for producer in &producers.order_failed_producer {
        producer.publish_event(OrderFailedEvent::new(order.clone(), reason)).await;
    }
}

pub(crate) async fn publish_order_cancelled(producers: &EventProducers, order: &Order) {
    for producer in &producers.order_cancelled_producer {
        producer.publish_event(OrderCancelledEvent::new(order.clone())).await;
    }
}

pub(crate) async fn publish_manual_order(producers: &EventProducers, order: &Order, chat_id: Option<i64>) {
    for producer in &producers.manual_order_producer {
        producer.publish_event(ManualOrderEvent::new(order.clone(), chat_id)).await;
    }
}

pub(crate) async fn publish_operator_alert(producers: &EventProducers, order_id: Option<i64>, message: &str) {
    for producer in &producers.operator_alert_producer {
        producer.publish_event(OperatorAlertEvent::new(order_id, message)).await;
    }
}
