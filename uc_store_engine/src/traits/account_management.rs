use thiserror::Error;
use ucs_common::Usdt;

use crate::db_types::{Customer, NewCustomer};

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("Customer {0} does not exist")]
    CustomerNotFound(i64),
    #[error("Balance can't be less than zero")]
    InsufficientFunds,
    #[error("Not enough points to redeem")]
    InsufficientPoints,
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}

/// Customer and balance management.
///
/// All balance mutations are serialized per customer inside a database transaction; a mutation
/// that would drive the balance negative is rejected without partial effect.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    async fn fetch_customer(&self, customer_id: i64) -> Result<Option<Customer>, AccountApiError>;

    async fn fetch_customer_by_tg_id(&self, tg_id: i64) -> Result<Option<Customer>, AccountApiError>;

    /// Creates the customer record if it does not exist yet, returning the stored record.
    async fn upsert_customer(&self, customer: NewCustomer) -> Result<Customer, AccountApiError>;

    /// Atomically adjusts the customer's balance by `amount` (negative = debit). Debits accrue
    /// loyalty points 1:1 with the whole-USDT amount spent. Returns the new balance.
    async fn process_payment(&self, customer_id: i64, amount: Usdt) -> Result<Usdt, AccountApiError>;

    /// Converts accumulated points into balance at [`crate::db_types::POINTS_RATIO`]. Returns
    /// `false` when the customer has too few points.
    async fn redeem_points(&self, customer_id: i64) -> Result<bool, AccountApiError>;
}
