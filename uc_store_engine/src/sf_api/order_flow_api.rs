use log::*;

use crate::{
    db_types::{Category, Item, NewOrder, Order, OrderStatus},
    events::EventProducers,
    recipes::RecipeBook,
    sf_api::{
        errors::OrderFlowError,
        publish_manual_order,
        publish_operator_alert,
        publish_order_cancelled,
        publish_order_completed,
        publish_order_failed,
    },
    traits::{ActivationGateway, ExternalOrderRequest, StorefrontDatabase, StorefrontError},
};

/// What happened to a freshly created order, so the caller knows whether anything asynchronous is
/// still outstanding.
#[derive(Debug, Clone)]
pub enum Fulfillment {
    /// Codes were reserved and handed over; the order is `Completed`.
    Delivered(Vec<String>),
    /// UC codes were reserved; the order stays `Pending` until every code's activation resolves.
    /// The caller is responsible for driving [`super::activation_api::ActivationApi::activate_code`]
    /// for each code, typically on a background task.
    AwaitingActivation(Vec<String>),
    /// An operator was notified; the order stays `Pending` until an admin acts.
    Manual,
    /// The synchronous external order flow ran; `success` maps directly to the order status.
    External { success: bool, status: String },
    /// Fulfillment failed after the order was created; the order is `Failed`.
    Failed(String),
}

/// `OrderFlowApi` is the primary API for creating orders and driving them to fulfillment.
///
/// Order creation validates the purchase up front (active item, balance, stock), debits the
/// balance atomically with the insert, and then dispatches on the item category. All terminal
/// transitions publish notification events exactly once, on the transition edge.
#[derive(Clone)]
pub struct OrderFlowApi<B, G> {
    db: B,
    gateway: G,
    recipes: RecipeBook,
    producers: EventProducers,
}

impl<B, G> OrderFlowApi<B, G>
where
    B: StorefrontDatabase,
    G: ActivationGateway,
{
    pub fn new(db: B, gateway: G, recipes: RecipeBook, producers: EventProducers) -> Self {
        Self { db, gateway, recipes, producers }
    }

    pub fn recipes(&self) -> &RecipeBook {
        &self.recipes
    }

    /// How many units of the item can currently be sold. `None` means the category has no tracked
    /// stock (manual and external categories).
    pub async fn stock_amount(&self, item: &Item) -> Result<Option<i64>, OrderFlowError> {
        let amount = self.db.stock_amount(item, &self.recipes).await?;
        Ok(amount)
    }

    /// Creates an order and dispatches fulfillment.
    ///
    /// The user-visible rejections (`ItemNotActive`, `InsufficientBalance`, `OutOfStock`,
    /// `MissingPlayerId`) are all raised *before* any row is written. Failures after creation do
    /// not bubble up as errors: the order is marked `Failed`, operators are alerted, and the
    /// failed order is returned with [`Fulfillment::Failed`].
    pub async fn create_order(
        &self,
        customer_id: i64,
        item: &Item,
        quantity: i64,
        player_id: Option<String>,
    ) -> Result<(Order, Fulfillment), OrderFlowError> {
        if !item.is_active {
            return Err(OrderFlowError::ItemNotActive);
        }
        // Only stockable categories may be bought in bulk.
        let quantity = if item.category.is_stockable() { quantity.max(1) } else { 1 };
        if matches!(item.category, Category::PubgUc | Category::Diamond | Category::Stars) && player_id.is_none() {
            return Err(OrderFlowError::MissingPlayerId);
        }
        let customer = self
            .db
            .fetch_customer(customer_id)
            .await?
            .ok_or(OrderFlowError::CustomerNotFound(customer_id))?;
        let price = item.total_price(quantity);
        if customer.balance < price {
            return Err(OrderFlowError::InsufficientBalance { needed: price, available: customer.balance });
        }
        if let Some(available) = self.db.stock_amount(item, &self.recipes).await? {
            if available < quantity {
                return Err(OrderFlowError::OutOfStock { wanted: quantity, available });
            }
        }
        let mut new_order = NewOrder::for_item(customer_id, item, quantity).map_err(StorefrontError::from)?;
        if let Some(player_id) = player_id {
            new_order = new_order.with_player_id(player_id);
        }
        let order = self.db.insert_order(new_order).await?;
        info!("🛒️ Order #{} created: {} x{quantity} for customer {customer_id}", order.id, item.value());
        match self.fulfill(order.clone(), item).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("🛒️ Fulfillment of order #{} failed: {e}", order.id);
                let reason = e.to_string();
                let order = self.fail_order(order.id, &reason).await?;
                Ok((order, Fulfillment::Failed(reason)))
            },
        }
    }

    async fn fulfill(&self, order: Order, item: &Item) -> Result<(Order, Fulfillment), OrderFlowError> {
        match order.category {
            Category::Codes => {
                let reserved = self.db.reserve_stock_codes(&order).await?;
                let order = self.complete_order(order.id).await?;
                Ok((order, Fulfillment::Delivered(reserved.codes)))
            },
            Category::Giftcard => {
                let reserved = self.db.reserve_giftcards(&order).await?;
                let order = self.complete_order(order.id).await?;
                Ok((order, Fulfillment::Delivered(reserved.codes)))
            },
            Category::PubgUc => {
                let reserved = self.db.reserve_uc_codes(&order, &self.recipes).await?;
                debug!("🛒️ Order #{} is awaiting activation of {} codes", order.id, reserved.codes.len());
                Ok((order, Fulfillment::AwaitingActivation(reserved.codes)))
            },
            Category::Diamond => self.fulfill_external(order, item).await,
            _ => {
                publish_manual_order(&self.producers, &order, item.chat_id).await;
                debug!("🛒️ Order #{} handed to an operator for manual fulfillment", order.id);
                Ok((order, Fulfillment::Manual))
            },
        }
    }

    /// The synchronous external order flow. The provider's success flag maps directly to the
    /// order's terminal status.
    async fn fulfill_external(&self, order: Order, item: &Item) -> Result<(Order, Fulfillment), OrderFlowError> {
        let field = |name: &str| {
            item.data
                .as_ref()
                .and_then(|d| d.get(name))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| OrderFlowError::MisconfiguredItem { item_id: item.id, field: name.to_string() })
        };
        let product = field("product")?;
        let product_id = field("product_id")?;
        let player = order.player_id.clone().ok_or(OrderFlowError::MissingPlayerId)?;
        let (user_id, zone_id) = match player.split_once(' ') {
            Some((user, zone)) => (user.to_string(), Some(zone.to_string())),
            None => (player, None),
        };
        let request = ExternalOrderRequest { product, product_id, user_id, zone_id };
        match self.gateway.create_external_order(&request).await {
            Ok((true, status)) => {
                let order = self.complete_order(order.id).await?;
                Ok((order, Fulfillment::External { success: true, status }))
            },
            Ok((false, status)) => {
                warn!("🛒️ External order for #{} was declined: {status}", order.id);
                let order = self.fail_order(order.id, &status).await?;
                Ok((order, Fulfillment::External { success: false, status }))
            },
            Err(e) => {
                let status = e.to_string();
                let order = self.fail_order(order.id, &status).await?;
                Ok((order, Fulfillment::External { success: false, status }))
            },
        }
    }

    /// Moves the order to `Completed`, publishing the completion event only on the transition
    /// edge.
    pub async fn complete_order(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        let (previous, order) = self.db.set_order_status(order_id, OrderStatus::Completed).await?;
        if previous != order.status {
            let codes = self.db.codes_for_order(&order).await?;
            publish_order_completed(&self.producers, &order, &codes).await;
        }
        Ok(order)
    }

    /// Moves the order to `Failed`, publishing the failure and an operator alert only on the
    /// transition edge.
    pub async fn fail_order(&self, order_id: i64, reason: &str) -> Result<Order, OrderFlowError> {
        let (previous, order) = self.db.set_order_status(order_id, OrderStatus::Failed).await?;
        if previous != order.status {
            publish_order_failed(&self.producers, &order, reason).await;
            publish_operator_alert(&self.producers, Some(order_id), reason).await;
        }
        Ok(order)
    }

    /// Cancels a pending order, refunding the debit. Decided orders are a logged no-op returning
    /// `None`. When `customer_id` is given, the order must belong to that customer.
    pub async fn cancel_order(&self, order_id: i64, customer_id: Option<i64>) -> Result<Option<Order>, OrderFlowError> {
        if let Some(customer_id) = customer_id {
            let order =
                self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
            if order.customer_id != customer_id {
                return Err(OrderFlowError::NotAuthorized);
            }
        }
        let cancelled = self.db.cancel_order(order_id).await?;
        if let Some(order) = &cancelled {
            publish_order_cancelled(&self.producers, order).await;
        }
        Ok(cancelled)
    }

    /// Admin-only manual completion, for operator-fulfilled categories.
    pub async fn admin_complete_order(&self, admin_tg_id: i64, order_id: i64) -> Result<Order, OrderFlowError> {
        self.require_admin(admin_tg_id).await?;
        self.complete_order(order_id).await
    }

    /// Admin-only cancellation.
    pub async fn admin_cancel_order(&self, admin_tg_id: i64, order_id: i64) -> Result<Option<Order>, OrderFlowError> {
        self.require_admin(admin_tg_id).await?;
        self.cancel_order(order_id, None).await
    }

    pub async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?;
        Ok(order)
    }

    pub async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.fetch_orders_for_customer(customer_id).await?;
        Ok(orders)
    }

    pub async fn codes_for_order(&self, order: &Order) -> Result<Vec<String>, OrderFlowError> {
        let codes = self.db.codes_for_order(order).await?;
        Ok(codes)
    }

    async fn require_admin(&self, tg_id: i64) -> Result<(), OrderFlowError> {
        let customer = self.db.fetch_customer_by_tg_id(tg_id).await?;
        match customer {
            Some(customer) if customer.is_admin => Ok(()),
            _ => {
                warn!("🔐️ Rejected admin order action from telegram id {tg_id}");
                Err(OrderFlowError::NotAuthorized)
            },
        }
    }
}
