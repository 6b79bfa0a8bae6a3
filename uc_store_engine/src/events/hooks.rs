use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    ManualOrderEvent,
    OperatorAlertEvent,
    OrderCancelledEvent,
    OrderCompletedEvent,
    OrderFailedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_completed_producer: Vec<EventProducer<OrderCompletedEvent>>,
    pub order_failed_producer: Vec<EventProducer<OrderFailedEvent>>,
    pub order_cancelled_producer: Vec<EventProducer<OrderCancelledEvent>>,
    pub manual_order_producer: Vec<EventProducer<ManualOrderEvent>>,
    pub operator_alert_producer: Vec<EventProducer<OperatorAlertEvent>>,
}

pub struct EventHandlers {
    pub on_order_completed: Option<EventHandler<OrderCompletedEvent>>,
    pub on_order_failed: Option<EventHandler<OrderFailedEvent>>,
    pub on_order_cancelled: Option<EventHandler<OrderCancelledEvent>>,
    pub on_manual_order: Option<EventHandler<ManualOrderEvent>>,
    pub on_operator_alert: Option<EventHandler<OperatorAlertEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_completed = hooks.on_order_completed.map(|f| EventHandler::new(buffer_size, f));
        let on_order_failed = hooks.on_order_failed.map(|f| EventHandler::new(buffer_size, f));
        let on_order_cancelled = hooks.on_order_cancelled.map(|f| EventHandler::new(buffer_size, f));
        let on_manual_order = hooks.on_manual_order.map(|f| EventHandler::new(buffer_size, f));
        let on_operator_alert = hooks.on_operator_alert.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_completed, on_order_failed, on_order_cancelled, on_manual_order, on_operator_alert }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_completed {
            result.order_completed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_failed {
            result.order_failed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_cancelled {
            result.order_cancelled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_manual_order {
            result.manual_order_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_operator_alert {
            result.operator_alert_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_completed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_failed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_cancelled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_manual_order {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_operator_alert {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_completed: Option<Handler<OrderCompletedEvent>>,
    pub on_order_failed: Option<Handler<OrderFailedEvent>>,
    pub on_order_cancelled: Option<Handler<OrderCancelledEvent>>,
    pub on_manual_order: Option<Handler<ManualOrderEvent>>,
    pub on_operator_alert: Option<Handler<OperatorAlertEvent>>,
}

impl EventHooks {
    pub fn on_order_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_completed = Some(Arc::new(f));
        self
    }

    pub fn on_order_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderFailedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_failed = Some(Arc::new(f));
        self
    }

    pub fn on_order_cancelled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCancelledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_cancelled = Some(Arc::new(f));
        self
    }

    pub fn on_manual_order<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ManualOrderEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_manual_order = Some(Arc::new(f));
        self
    }

    pub fn on_operator_alert<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OperatorAlertEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_operator_alert = Some(Arc::new(f));
        self
    }
}
