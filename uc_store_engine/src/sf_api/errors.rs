use thiserror::Error;
use ucs_common::Usdt;

use crate::traits::{AccountApiError, StorefrontError};

/// Errors surfaced by the order flow, activation and top-up APIs. The first block is user-visible
/// rejections raised before an order row is written; the rest are internal failures that callers
/// translate into generic error responses.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("This item is not available right now")]
    ItemNotActive,
    #[error("Insufficient balance: the order costs {needed}, but the balance is {available}")]
    InsufficientBalance { needed: Usdt, available: Usdt },
    #[error("Not enough stock: wanted {wanted}, only {available} available")]
    OutOfStock { wanted: i64, available: i64 },
    #[error("This item requires a player identifier")]
    MissingPlayerId,
    #[error("The top-up amount must be positive")]
    InvalidAmount,
    #[error("Customer {0} does not exist")]
    CustomerNotFound(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Code {0} was not found")]
    CodeNotFound(String),
    #[error("Item {item_id} is misconfigured: missing {field}")]
    MisconfiguredItem { item_id: i64, field: String },
    #[error("You are not authorized to perform this action")]
    NotAuthorized,
    #[error("{0}")]
    AccountError(#[from] AccountApiError),
    #[error("{0}")]
    StorefrontError(#[from] StorefrontError),
}
