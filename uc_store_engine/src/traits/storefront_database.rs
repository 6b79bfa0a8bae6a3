use chrono::Duration;
use thiserror::Error;
use ucs_common::Usdt;

use crate::{
    db_types::{
        Activator,
        ActivatorPriority,
        Item,
        NewOrder,
        NewTopUp,
        Order,
        OrderStatus,
        TopUp,
        UcCode,
    },
    recipes::RecipeBook,
    traits::{
        data_objects::{ActivationResolution, ReservedCodes, TopUpSweepResult},
        AccountApiError,
        AccountManagement,
    },
};

#[derive(Debug, Clone, Error)]
pub enum StorefrontError {
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("{0}")]
    AccountError(#[from] AccountApiError),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderNotFound(i64),
    #[error("Code {0} was not found in the inventory")]
    CodeNotFound(String),
    #[error("Race condition: Not enough codes of amount {amount} for order #{order_id}")]
    CodeClaimRace { amount: i64, order_id: i64 },
    #[error("Not enough stock for order #{order_id}: wanted {wanted}, short by {short}")]
    InsufficientStock { order_id: i64, wanted: i64, short: i64 },
    #[error("No recipe is configured for denomination {0}")]
    NoRecipeConfigured(i64),
    #[error("Illegal order status transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    #[error("Top-up {0} does not exist")]
    TopUpNotFound(i64),
    #[error("Cannot convert a ruble deposit at exchange rate {0}")]
    InvalidExchangeRate(f64),
    #[error("Order snapshot is corrupt: {0}")]
    SnapshotError(String),
}

impl From<sqlx::Error> for StorefrontError {
    fn from(e: sqlx::Error) -> Self {
        StorefrontError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for StorefrontError {
    fn from(e: serde_json::Error) -> Self {
        StorefrontError::SnapshotError(e.to_string())
    }
}

/// This trait defines the highest level of behaviour for backends supporting the storefront
/// engine:
/// * order creation with its atomic balance debit,
/// * code reservation for the three inventory kinds,
/// * the order lifecycle transitions with edge detection,
/// * activation result bookkeeping, and
/// * top-up management.
///
/// Reservation calls must be safe under concurrent order creation: a code row is claimed by at
/// most one order, ever. Claims and balance mutations happen inside database transactions;
/// external provider calls are never made while a claim transaction is open.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone + AccountManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// In a single atomic transaction, debits the buyer's balance by the order price (recording
    /// the balance immediately before the charge) and inserts the order in `Pending` state.
    /// A debit that would drive the balance negative aborts the transaction.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StorefrontError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, StorefrontError>;

    /// Orders for a customer, newest first.
    async fn fetch_orders_for_customer(&self, customer_id: i64) -> Result<Vec<Order>, StorefrontError>;

    /// Records the chat message that should be edited when the order is decided.
    async fn set_order_message_id(&self, order_id: i64, message_id: i64) -> Result<(), StorefrontError>;

    /// Moves the order to `new_status`, returning the previous status together with the updated
    /// record. Side effects (notifications) belong to the caller and must only fire when the
    /// returned previous status shows a real edge. Illegal transitions return
    /// [`StorefrontError::IllegalTransition`].
    async fn set_order_status(
        &self,
        order_id: i64,
        new_status: OrderStatus,
    ) -> Result<(OrderStatus, Order), StorefrontError>;

    /// Cancels a `Pending` order: refunds the debited price and moves the order to `Cancelled`,
    /// all in one transaction. Cancelling an already-decided order is a logged no-op returning
    /// `None`. Reserved inventory codes are *not* returned to stock.
    async fn cancel_order(&self, order_id: i64) -> Result<Option<Order>, StorefrontError>;

    /// How many units of `item` the inventory can currently satisfy, per the category rules.
    /// Returns `None` for categories without tracked stock.
    async fn stock_amount(&self, item: &Item, recipes: &RecipeBook) -> Result<Option<i64>, StorefrontError>;

    /// Claims unreserved stock codes of the item's denomination until the order holds
    /// `quantity` of them. Codes already held are counted, making the call idempotent.
    async fn reserve_stock_codes(&self, order: &Order) -> Result<ReservedCodes, StorefrontError>;

    /// Claims unreserved gift-card codes belonging to the order's specific catalog item.
    async fn reserve_giftcards(&self, order: &Order) -> Result<ReservedCodes, StorefrontError>;

    /// Reserves UC codes for the order according to the recipe book: selects a viable recipe and,
    /// inside one transaction, claims one unreserved non-activated code per unit per component
    /// nominal, preferring priority-use codes then oldest stock. Any missing candidate rolls the
    /// whole transaction back and surfaces [`StorefrontError::CodeClaimRace`]. A no-op when the
    /// already-reserved sum covers the order target.
    async fn reserve_uc_codes(&self, order: &Order, recipes: &RecipeBook) -> Result<ReservedCodes, StorefrontError>;

    async fn fetch_uc_code(&self, code: &str) -> Result<Option<UcCode>, StorefrontError>;

    /// Code strings linked to the order (any inventory kind), for display.
    async fn codes_for_order(&self, order: &Order) -> Result<Vec<String>, StorefrontError>;

    /// Records the provider that accepted or activated a code.
    async fn set_code_activator(&self, code: &str, activator: Activator) -> Result<(), StorefrontError>;

    /// Persists a transient (non-terminal) provider status string on a code, without resolving it.
    async fn set_code_status(&self, code: &str, status: &str) -> Result<(), StorefrontError>;

    /// Applies a terminal activation outcome to a code, idempotently:
    /// * an already-resolved code is left untouched and `None` is returned (webhook replays),
    /// * on failure the owning order is moved to `Failed`,
    /// * then the successfully-activated sum is recomputed and the order is moved to `Completed`
    ///   once it covers the order target.
    ///
    /// The returned resolution carries the order transition edge, if any, for notification.
    async fn apply_activation_result(
        &self,
        code: &str,
        success: bool,
        status: &str,
    ) -> Result<Option<ActivationResolution>, StorefrontError>;

    /// The active activator ranking, lowest priority value first. Read fresh on every activation
    /// attempt.
    async fn fetch_activator_priorities(&self) -> Result<Vec<ActivatorPriority>, StorefrontError>;

    /// Inserts or updates a ranking entry.
    async fn upsert_activator_priority(
        &self,
        name: Activator,
        priority: i64,
        is_active: bool,
    ) -> Result<(), StorefrontError>;

    /// Creates a top-up. Wallet (USDT) deposits get a uniqueness-disambiguating commission so
    /// concurrent deposits to the shared address can be told apart by amount.
    async fn insert_topup(&self, topup: NewTopUp, min_commission: Usdt) -> Result<TopUp, StorefrontError>;

    async fn fetch_topup(&self, topup_id: i64) -> Result<Option<TopUp>, StorefrontError>;

    /// Marks a top-up as paid, stamping `paid_at` on the first application.
    async fn mark_topup_paid(&self, topup_id: i64, tx_id: Option<&str>) -> Result<TopUp, StorefrontError>;

    /// Credits a paid top-up to the customer's balance. Guarded against double application:
    /// returns `None` when the top-up was already credited. `rub_usdt_rate` converts ruble
    /// deposits.
    async fn credit_topup(&self, topup_id: i64, rub_usdt_rate: f64) -> Result<Option<TopUp>, StorefrontError>;

    /// Deletes never-paid top-ups older than `lifetime`. This is a pure delete, not a
    /// cancellation.
    async fn delete_stale_topups(&self, lifetime: Duration) -> Result<TopUpSweepResult, StorefrontError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StorefrontError> {
        Ok(())
    }
}
