use chrono::{Duration, Utc};
use log::*;
use sqlx::SqlitePool;
use ucs_common::Usdt;

use crate::{
    db::sqlite::{activators, codes, customers, db_url, new_pool, orders, topups},
    db_types::{
        Activator,
        ActivatorPriority,
        Category,
        Customer,
        GiftcardCode,
        Item,
        NewCustomer,
        NewOrder,
        NewTopUp,
        Order,
        OrderStatus,
        StockCode,
        TopUp,
        UcCode,
    },
    recipes::RecipeBook,
    traits::{
        AccountApiError,
        AccountManagement,
        ActivationResolution,
        ReservedCodes,
        StorefrontDatabase,
        StorefrontError,
        TopUpSweepResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase").field("url", &self.url).finish()
    }
}

impl SqliteDatabase {
    /// Connects to the database given by the `UCS_DATABASE_URL` environment variable, creating the
    /// file if it does not exist yet.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Loads a UC code into the inventory.
    pub async fn add_uc_code(
        &self,
        code: &str,
        amount: i64,
        is_priority_use: bool,
    ) -> Result<UcCode, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let code = codes::insert_uc_code(code, amount, is_priority_use, &mut conn).await?;
        Ok(code)
    }

    /// Loads a flat stock code into the inventory.
    pub async fn add_stock_code(&self, code: &str, amount: i64) -> Result<StockCode, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let code = codes::insert_stock_code(code, amount, &mut conn).await?;
        Ok(code)
    }

    /// Loads a gift-card code for a specific catalog item into the inventory.
    pub async fn add_giftcard_code(&self, code: &str, item_id: i64) -> Result<GiftcardCode, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let code = codes::insert_giftcard_code(code, item_id, &mut conn).await?;
        Ok(code)
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_customer(&self, customer_id: i64) -> Result<Option<Customer>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        customers::fetch_customer(customer_id, &mut conn).await
    }

    async fn fetch_customer_by_tg_id(&self, tg_id: i64) -> Result<Option<Customer>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        customers::fetch_customer_by_tg_id(tg_id, &mut conn).await
    }

    async fn upsert_customer(&self, customer: NewCustomer) -> Result<Customer, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        customers::upsert_customer(customer, &mut conn).await
    }

    async fn process_payment(&self, customer_id: i64, amount: Usdt) -> Result<Usdt, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let balance = customers::adjust_balance(customer_id, amount, &mut tx).await?;
        tx.commit().await?;
        debug!("💰️ Customer {customer_id} balance adjusted by {amount}. New balance: {balance}");
        Ok(balance)
    }

    async fn redeem_points(&self, customer_id: i64) -> Result<bool, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let redeemed = customers::redeem_points(customer_id, &mut tx).await?;
        tx.commit().await?;
        Ok(redeemed)
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StorefrontError> {
        let price = order.price;
        let customer_id = order.customer_id;
        let mut tx = self.pool.begin().await?;
        let customer = customers::fetch_customer(customer_id, &mut tx)
            .await?
            .ok_or(AccountApiError::CustomerNotFound(customer_id))?;
        customers::adjust_balance(customer_id, -price, &mut tx).await?;
        let order = orders::insert_order(order, customer.balance, &mut tx).await?;
        tx.commit().await?;
        debug!("🛒️ Order #{} inserted for customer {customer_id}. Charged {price}", order.id);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_customer(&self, customer_id: i64) -> Result<Vec<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_customer(customer_id, &mut conn).await?;
        Ok(orders)
    }

    async fn set_order_message_id(&self, order_id: i64, message_id: i64) -> Result<(), StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_message_id(order_id, message_id, &mut conn).await
    }

    async fn set_order_status(
        &self,
        order_id: i64,
        new_status: OrderStatus,
    ) -> Result<(OrderStatus, Order), StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(StorefrontError::OrderNotFound(order_id))?;
        let previous = order.status;
        if previous == new_status {
            return Ok((previous, order));
        }
        if !previous.can_transition_to(new_status) {
            return Err(StorefrontError::IllegalTransition { from: previous, to: new_status });
        }
        let updated = orders::update_status(order_id, new_status, &mut tx).await?;
        tx.commit().await?;
        info!("🛒️ Order #{order_id} moved from {previous} to {new_status}");
        Ok((previous, updated))
    }

    async fn cancel_order(&self, order_id: i64) -> Result<Option<Order>, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(StorefrontError::OrderNotFound(order_id))?;
        if order.status.is_decided() {
            error!("🛒️ Tried to cancel order #{order_id}, but it is already {}", order.status);
            return Ok(None);
        }
        customers::adjust_balance(order.customer_id, order.price, &mut tx).await?;
        let updated = orders::update_status(order_id, OrderStatus::Cancelled, &mut tx).await?;
        tx.commit().await?;
        info!("🛒️ Order #{order_id} cancelled. Refunded {} to customer {}", order.price, order.customer_id);
        Ok(Some(updated))
    }

    async fn stock_amount(&self, item: &Item, recipes: &RecipeBook) -> Result<Option<i64>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let amount = match item.category {
            Category::Codes => match item.amount {
                Some(amount) => codes::count_stock_codes(amount, &mut conn).await?,
                None => 0,
            },
            Category::Giftcard => codes::count_giftcards(item.id, &mut conn).await?,
            Category::PubgUc => {
                let Some(target) = item.amount else { return Ok(Some(0)) };
                let components = recipes.components_for(target);
                let available = codes::available_uc_counts(&components, &mut conn).await?;
                recipes.stock_amount(target, &available)
            },
            _ => return Ok(None),
        };
        Ok(Some(amount))
    }

    async fn reserve_stock_codes(&self, order: &Order) -> Result<ReservedCodes, StorefrontError> {
        let amount = order.snapshot()?.amount.unwrap_or_default();
        let mut tx = self.pool.begin().await?;
        let mut claimed = codes::stock_codes_for_order(order.id, &mut tx).await?;
        let need = order.quantity - claimed.len() as i64;
        if need <= 0 {
            return Ok(ReservedCodes { codes: claimed, already_reserved: true });
        }
        for taken in 0..need {
            match codes::claim_stock_code(order.id, amount, &mut tx).await? {
                Some(code) => claimed.push(code),
                None => {
                    warn!("📦️ Ran out of stock codes of {amount} while reserving for order #{}", order.id);
                    return Err(StorefrontError::InsufficientStock {
                        order_id: order.id,
                        wanted: order.quantity,
                        short: need - taken,
                    });
                },
            }
        }
        tx.commit().await?;
        Ok(ReservedCodes { codes: claimed, already_reserved: false })
    }

    async fn reserve_giftcards(&self, order: &Order) -> Result<ReservedCodes, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let mut claimed = codes::giftcards_for_order(order.id, &mut tx).await?;
        let need = order.quantity - claimed.len() as i64;
        if need <= 0 {
            return Ok(ReservedCodes { codes: claimed, already_reserved: true });
        }
        for taken in 0..need {
            match codes::claim_giftcard(order.id, order.item_id, &mut tx).await? {
                Some(code) => claimed.push(code),
                None => {
                    warn!("📦️ Ran out of gift cards for item {} while reserving for order #{}", order.item_id, order.id);
                    return Err(StorefrontError::InsufficientStock {
                        order_id: order.id,
                        wanted: order.quantity,
                        short: need - taken,
                    });
                },
            }
        }
        tx.commit().await?;
        Ok(ReservedCodes { codes: claimed, already_reserved: false })
    }

    async fn reserve_uc_codes(&self, order: &Order, recipes: &RecipeBook) -> Result<ReservedCodes, StorefrontError> {
        let target = order.snapshot()?.amount.unwrap_or_default();
        let mut tx = self.pool.begin().await?;
        let reserved = codes::reserved_uc_sum(order.id, &mut tx).await?;
        if reserved >= target * order.quantity && reserved > 0 {
            let held = codes::uc_codes_for_order(order.id, &mut tx).await?;
            let codes = held.into_iter().map(|c| c.code).collect();
            return Ok(ReservedCodes { codes, already_reserved: true });
        }
        let components = recipes.components_for(target);
        if components.is_empty() {
            return Err(StorefrontError::NoRecipeConfigured(target));
        }
        let available = codes::available_uc_counts(&components, &mut tx).await?;
        let nominals = recipes.nominals_for(target, order.quantity, &available).ok_or_else(|| {
            warn!("📦️ No viable recipe for {target} x{} on order #{}", order.quantity, order.id);
            StorefrontError::InsufficientStock {
                order_id: order.id,
                wanted: order.quantity,
                short: order.quantity - recipes.stock_amount(target, &available),
            }
        })?;
        let mut claimed = Vec::with_capacity((nominals.len() as i64 * order.quantity) as usize);
        for _ in 0..order.quantity {
            for nominal in &nominals {
                match codes::claim_uc_code(order.id, *nominal, &mut tx).await? {
                    Some(code) => claimed.push(code),
                    // Someone else won this row between the count and the claim. Roll everything
                    // back so no codes are left dangling on a half-reserved order.
                    None => return Err(StorefrontError::CodeClaimRace { amount: *nominal, order_id: order.id }),
                }
            }
        }
        tx.commit().await?;
        debug!("📦️ Reserved {} UC codes for order #{}: recipe {nominals:?} x{}", claimed.len(), order.id, order.quantity);
        Ok(ReservedCodes { codes: claimed, already_reserved: false })
    }

    async fn fetch_uc_code(&self, code: &str) -> Result<Option<UcCode>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let code = codes::fetch_uc_code(code, &mut conn).await?;
        Ok(code)
    }

    async fn codes_for_order(&self, order: &Order) -> Result<Vec<String>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let codes = match order.category {
            Category::Codes => codes::stock_codes_for_order(order.id, &mut conn).await?,
            Category::Giftcard => codes::giftcards_for_order(order.id, &mut conn).await?,
            Category::PubgUc => {
                codes::uc_codes_for_order(order.id, &mut conn).await?.into_iter().map(|c| c.code).collect()
            },
            _ => Vec::new(),
        };
        Ok(codes)
    }

    async fn set_code_activator(&self, code: &str, activator: Activator) -> Result<(), StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        codes::set_activator(code, activator, &mut conn).await?;
        Ok(())
    }

    async fn set_code_status(&self, code: &str, status: &str) -> Result<(), StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        codes::set_transient_status(code, status, &mut conn).await?;
        Ok(())
    }

    async fn apply_activation_result(
        &self,
        code: &str,
        success: bool,
        status: &str,
    ) -> Result<Option<ActivationResolution>, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let existing =
            codes::fetch_uc_code(code, &mut tx).await?.ok_or_else(|| StorefrontError::CodeNotFound(code.into()))?;
        if existing.is_activated {
            debug!("🔑️ Code {code} is already resolved. Ignoring the replay.");
            return Ok(None);
        }
        codes::mark_resolved(code, success, status, &mut tx).await?;
        let Some(order_id) = existing.order_id else {
            // A code resolved outside any order. Record the outcome and move on.
            tx.commit().await?;
            warn!("🔑️ Code {code} was resolved without an owning order");
            return Ok(None);
        };
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(StorefrontError::OrderNotFound(order_id))?;
        let mut current = order.status;
        let mut transition = None;
        if !success && current.can_transition_to(OrderStatus::Failed) {
            orders::update_status(order_id, OrderStatus::Failed, &mut tx).await?;
            current = OrderStatus::Failed;
            transition = Some(OrderStatus::Failed);
        }
        let activated = codes::successful_uc_sum(order_id, &mut tx).await?;
        if activated >= order.target_amount() && current.can_transition_to(OrderStatus::Completed) {
            orders::update_status(order_id, OrderStatus::Completed, &mut tx).await?;
            transition = Some(OrderStatus::Completed);
        }
        let resolved =
            codes::fetch_uc_code(code, &mut tx).await?.ok_or_else(|| StorefrontError::CodeNotFound(code.into()))?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(StorefrontError::OrderNotFound(order_id))?;
        tx.commit().await?;
        info!(
            "🔑️ Code {code} resolved ({}) for order #{order_id}. Order is now {}",
            if success { "success" } else { "failure" },
            order.status
        );
        Ok(Some(ActivationResolution { code: resolved, order, order_transition: transition }))
    }

    async fn fetch_activator_priorities(&self) -> Result<Vec<ActivatorPriority>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let priorities = activators::fetch_active(&mut conn).await?;
        Ok(priorities)
    }

    async fn upsert_activator_priority(
        &self,
        name: Activator,
        priority: i64,
        is_active: bool,
    ) -> Result<(), StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        activators::upsert(name, priority, is_active, &mut conn).await?;
        Ok(())
    }

    async fn insert_topup(&self, topup: NewTopUp, min_commission: Usdt) -> Result<TopUp, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let topup = topups::insert_topup(topup, min_commission, &mut tx).await?;
        tx.commit().await?;
        debug!("💰️ Top-up #{} created for customer {}: pay {}", topup.id, topup.customer_id, topup.to_pay);
        Ok(topup)
    }

    async fn fetch_topup(&self, topup_id: i64) -> Result<Option<TopUp>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let topup = topups::fetch_topup(topup_id, &mut conn).await?;
        Ok(topup)
    }

    async fn mark_topup_paid(&self, topup_id: i64, tx_id: Option<&str>) -> Result<TopUp, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        topups::mark_paid(topup_id, tx_id, &mut conn).await
    }

    async fn credit_topup(&self, topup_id: i64, rub_usdt_rate: f64) -> Result<Option<TopUp>, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let topup =
            topups::fetch_topup(topup_id, &mut tx).await?.ok_or(StorefrontError::TopUpNotFound(topup_id))?;
        if !topups::mark_topped(topup_id, &mut tx).await? {
            debug!("💰️ Top-up #{topup_id} is not creditable (unpaid or already credited)");
            return Ok(None);
        }
        let credit = topup.to_usdt(rub_usdt_rate).ok_or(StorefrontError::InvalidExchangeRate(rub_usdt_rate))?;
        customers::adjust_balance(topup.customer_id, credit, &mut tx).await?;
        let topup =
            topups::fetch_topup(topup_id, &mut tx).await?.ok_or(StorefrontError::TopUpNotFound(topup_id))?;
        tx.commit().await?;
        info!("💰️ Top-up #{topup_id} credited {credit} to customer {}", topup.customer_id);
        Ok(Some(topup))
    }

    async fn delete_stale_topups(&self, lifetime: Duration) -> Result<TopUpSweepResult, StorefrontError> {
        let cutoff = Utc::now() - lifetime;
        let mut conn = self.pool.acquire().await?;
        let deleted = topups::delete_stale(cutoff, &mut conn).await?;
        if deleted > 0 {
            info!("💰️ Expiry sweep deleted {deleted} unpaid top-ups");
        }
        Ok(TopUpSweepResult { deleted })
    }

    async fn close(&mut self) -> Result<(), StorefrontError> {
        self.pool.close().await;
        Ok(())
    }
}
