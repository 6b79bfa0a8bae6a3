use crate::db_types::Order;

/// An order reached `Completed`. Carries the codes to deliver to the buyer, when the category
/// delivers codes.
#[derive(Debug, Clone)]
pub struct OrderCompletedEvent {
    pub order: Order,
    pub codes: Vec<String>,
}

impl OrderCompletedEvent {
    pub fn new(order: Order, codes: Vec<String>) -> Self {
        Self { order, codes }
    }
}

/// An order reached `Failed`. The debit is kept; operators reconcile from the reason.
#[derive(Debug, Clone)]
pub struct OrderFailedEvent {
    pub order: Order,
    pub reason: String,
}

impl OrderFailedEvent {
    pub fn new(order: Order, reason: impl Into<String>) -> Self {
        Self { order, reason: reason.into() }
    }
}

/// A pending order was cancelled and the buyer refunded.
#[derive(Debug, Clone)]
pub struct OrderCancelledEvent {
    pub order: Order,
}

impl OrderCancelledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An order in a manually-fulfilled category needs an operator to act. `chat_id` is the manager
/// channel configured on the catalog item, if any.
#[derive(Debug, Clone)]
pub struct ManualOrderEvent {
    pub order: Order,
    pub chat_id: Option<i64>,
}

impl ManualOrderEvent {
    pub fn new(order: Order, chat_id: Option<i64>) -> Self {
        Self { order, chat_id }
    }
}

/// Something went wrong that a human should look at: a provider misbehaving, an order stuck in a
/// state the automation cannot resolve, and the like.
#[derive(Debug, Clone)]
pub struct OperatorAlertEvent {
    pub order_id: Option<i64>,
    pub message: String,
}

impl OperatorAlertEvent {
    pub fn new(order_id: Option<i64>, message: impl Into<String>) -> Self {
        Self { order_id, message: message.into() }
    }
}
