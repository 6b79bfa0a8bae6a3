use crate::db_types::{Order, OrderStatus, UcCode};

/// The codes claimed for an order by a reservation call.
#[derive(Debug, Clone, Default)]
pub struct ReservedCodes {
    /// Redemption code strings, in claim order.
    pub codes: Vec<String>,
    /// True when the reservation was already satisfied and nothing new was claimed.
    pub already_reserved: bool,
}

/// The result of applying a terminal activation outcome to a code.
#[derive(Debug, Clone)]
pub struct ActivationResolution {
    pub code: UcCode,
    pub order: Order,
    /// Set when this application moved the order to a new status (the notification edge).
    pub order_transition: Option<OrderStatus>,
}

/// Result of a top-up expiry sweep.
#[derive(Debug, Clone, Default)]
pub struct TopUpSweepResult {
    pub deleted: u64,
}
