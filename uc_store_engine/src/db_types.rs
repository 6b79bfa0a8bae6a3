use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use ucs_common::Usdt;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------     Activator       ---------------------------------------------------------
/// The set of external redemption providers a UC code can be activated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Activator {
    UCodeium,
    Kokos,
    Fars,
    SmileOne,
}

impl Display for Activator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Activator::UCodeium => write!(f, "ucodeium"),
            Activator::Kokos => write!(f, "kokos"),
            Activator::Fars => write!(f, "fars"),
            Activator::SmileOne => write!(f, "smileone"),
        }
    }
}

impl FromStr for Activator {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ucodeium" => Ok(Self::UCodeium),
            "kokos" => Ok(Self::Kokos),
            "fars" => Ok(Self::Fars),
            "smileone" => Ok(Self::SmileOne),
            s => Err(ConversionError(format!("Invalid activator name: {s}"))),
        }
    }
}

//--------------------------------------  ActivatorPriority  ---------------------------------------------------------
/// An operator-editable ranking entry over the activation providers. Lower `priority` is tried
/// first; inactive entries do not participate. The ranking is re-read on every activation attempt
/// so operator edits take effect without a restart.
#[derive(Debug, Clone, FromRow)]
pub struct ActivatorPriority {
    pub id: i64,
    pub name: Activator,
    pub priority: i64,
    pub is_active: bool,
}

//--------------------------------------      Category       ---------------------------------------------------------
/// Catalog item categories. The category selects the fulfillment strategy for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PubgUc,
    Codes,
    Giftcard,
    Popularity,
    HomeVote,
    Offers,
    Stars,
    Diamond,
    MorePubg,
}

impl Category {
    /// Categories backed by pre-loaded stock, which may be bought in quantities greater than one.
    pub fn is_stockable(&self) -> bool {
        matches!(self, Category::Codes | Category::Giftcard)
    }

    /// Categories fulfilled by an operator acting on a manager-channel notification.
    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            Category::Offers | Category::Popularity | Category::HomeVote | Category::Stars | Category::MorePubg
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::PubgUc => "PUBG UC",
            Category::Codes => "GIFTCARDS & CODES",
            Category::Giftcard => "Giftcard",
            Category::Popularity => "Popularity",
            Category::HomeVote => "HOME VOTE",
            Category::Offers => "Offers",
            Category::Stars => "Telegram Stars",
            Category::Diamond => "Mobilelegends diamond",
            Category::MorePubg => "More PUBG Services",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::PubgUc => "pubg_uc",
            Category::Codes => "codes",
            Category::Giftcard => "giftcard",
            Category::Popularity => "popularity",
            Category::HomeVote => "home_vote",
            Category::Offers => "offers",
            Category::Stars => "stars",
            Category::Diamond => "diamond",
            Category::MorePubg => "more_pubg",
        };
        write!(f, "{s}")
    }
}

//--------------------------------------     OrderStatus     ---------------------------------------------------------
/// The order lifecycle state machine.
///
/// | From \ To  | Completed | Failed | Cancelled |
/// |------------|-----------|--------|-----------|
/// | Pending    | ok        | ok     | ok        |
/// | Completed  | -         | ok*    | -         |
/// | Failed     | ok*       | -      | -         |
/// | Cancelled  | -         | -      | -         |
///
/// (*) A late activation result may flip a decided order between Completed and Failed; the last
/// writer wins. This mirrors the source system and is a documented sharp edge. Cancelled is
/// terminal, and cancellation itself is only legal from Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order has been created; no final decision has been made.
    Pending,
    /// The order has been fulfilled in full.
    Completed,
    /// Fulfillment failed. The buyer keeps the debit; operators reconcile manually.
    Failed,
    /// The order was explicitly cancelled while still pending; the debit has been refunded.
    Cancelled,
}

impl OrderStatus {
    pub fn is_decided(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    pub fn can_transition_to(&self, new: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, new),
            (Pending, Completed) | (Pending, Failed) | (Pending, Cancelled) | (Completed, Failed) | (Failed, Completed)
        )
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Completed => write!(f, "Completed"),
            OrderStatus::Failed => write!(f, "Failed"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Item         ---------------------------------------------------------
/// The catalog read model. Items live outside the engine (the admin panel owns them); the engine
/// only consumes this projection for pricing, stock queries and order snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub title: Option<String>,
    pub category: Category,
    /// Unit price.
    pub price: Usdt,
    /// Target denomination, for code-backed categories.
    pub amount: Option<i64>,
    pub is_active: bool,
    pub activator: Option<Activator>,
    /// Manager channel for operator notifications about this item.
    pub chat_id: Option<i64>,
    /// Provider-specific payload, e.g. the SmileOne product and product id for Diamond items.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl Item {
    /// The display value of the item, derived from the title or the denomination.
    pub fn value(&self) -> String {
        match self.category {
            Category::PubgUc | Category::Codes => self
                .title
                .clone()
                .unwrap_or_else(|| format!("{} UC", self.amount.unwrap_or_default())),
            Category::Popularity => self
                .title
                .clone()
                .unwrap_or_else(|| format!("{} Popularity", self.amount.unwrap_or_default())),
            _ => self.title.clone().unwrap_or_default(),
        }
    }

    pub fn total_price(&self, quantity: i64) -> Usdt {
        self.price * quantity
    }

    pub fn to_snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            title: self.title.clone(),
            value: self.value(),
            category: self.category,
            price: self.price,
            amount: self.amount,
            is_active: self.is_active,
            activator: self.activator,
        }
    }
}

/// Denormalized item data frozen into an order at creation time, so historical orders render
/// correctly regardless of later catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub title: Option<String>,
    pub value: String,
    pub category: Category,
    pub price: Usdt,
    pub amount: Option<i64>,
    pub is_active: bool,
    pub activator: Option<Activator>,
}

//--------------------------------------      Customer       ---------------------------------------------------------
/// The number of loyalty points that redeem into 1 USDT of balance.
pub const POINTS_RATIO: i64 = 1000;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Customer {
    pub id: i64,
    pub tg_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
    pub balance: Usdt,
    pub points: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub tg_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
}

impl NewCustomer {
    pub fn new(tg_id: i64) -> Self {
        Self { tg_id, ..Default::default() }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub item_id: i64,
    pub quantity: i64,
    /// JSON-serialized [`ItemSnapshot`].
    pub item_data: String,
    /// Total price charged for the order (unit price x quantity, snapshotted).
    pub price: Usdt,
    pub category: Category,
    /// Buyer-supplied redemption identifier: a PUBG player id, a username (Stars), or a
    /// `userid(zoneid)` pair (Diamond).
    pub player_id: Option<String>,
    pub status: OrderStatus,
    /// Chat message to edit when the final status is known.
    pub message_id: Option<i64>,
    pub balance_before: Usdt,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn snapshot(&self) -> Result<ItemSnapshot, serde_json::Error> {
        serde_json::from_str(&self.item_data)
    }

    /// Target denomination for the whole order (amount x quantity). Zero when the snapshot has no
    /// denomination.
    pub fn target_amount(&self) -> i64 {
        self.snapshot().ok().and_then(|s| s.amount).unwrap_or_default() * self.quantity
    }

    pub fn title(&self) -> String {
        let snapshot = self.snapshot().ok();
        match self.category {
            Category::PubgUc | Category::Codes => {
                let amount = snapshot.and_then(|s| s.amount).unwrap_or_default();
                format!("PUBG_UC_{amount}_{}", self.id)
            },
            _ => {
                let value = snapshot.map(|s| s.value).unwrap_or_default();
                format!("{value}_{}", self.id)
            },
        }
    }

    pub fn balance_after(&self) -> Usdt {
        self.balance_before - self.price
    }

    fn player_id_line(&self) -> String {
        match (&self.player_id, self.category) {
            (Some(id), Category::Stars) => format!("USERNAME: {id}\n"),
            (Some(id), Category::Diamond) => format!("USERID: {id}\n"),
            (Some(id), _) => format!("PUBG ID: {id}\n"),
            (None, _) => String::new(),
        }
    }

    fn codes_line(codes: &[String]) -> String {
        if codes.is_empty() {
            String::new()
        } else {
            format!("Code USED: {}\n", codes.join(" "))
        }
    }

    /// The buyer-facing order summary.
    pub fn user_str(&self, codes: &[String]) -> String {
        let status = match self.status {
            OrderStatus::Pending => "",
            OrderStatus::Completed => "completed ✅",
            OrderStatus::Cancelled => "cancelled ❌",
            OrderStatus::Failed => "failed ❌",
        };
        format!(
            "Order {status}\n{}\n{}Balance before order: {}$\nOrder Cost: {}$\nBalance after Order: {}$\n{}",
            self.title(),
            self.player_id_line(),
            self.balance_before,
            self.price,
            self.balance_after(),
            Self::codes_line(codes),
        )
    }

    /// The operator-facing order summary, prefixed with the buyer's telegram id.
    pub fn admin_str(&self, tg_id: i64, codes: &[String]) -> String {
        format!(
            "userid: {tg_id}\nOrder: {}\n{}Balance before order: {}$\nOrder Cost: {}$\nBalance after Order: {}$\n{}",
            self.title(),
            self.player_id_line(),
            self.balance_before,
            self.price,
            self.balance_after(),
            Self::codes_line(codes),
        )
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: i64,
    pub item_id: i64,
    pub quantity: i64,
    /// JSON-serialized [`ItemSnapshot`], see [`Item::to_snapshot`].
    pub item_data: String,
    /// Total price to charge.
    pub price: Usdt,
    pub category: Category,
    pub player_id: Option<String>,
}

impl NewOrder {
    pub fn for_item(customer_id: i64, item: &Item, quantity: i64) -> Result<Self, serde_json::Error> {
        Ok(Self {
            customer_id,
            item_id: item.id,
            quantity,
            item_data: serde_json::to_string(&item.to_snapshot())?,
            price: item.total_price(quantity),
            category: item.category,
            player_id: None,
        })
    }

    pub fn with_player_id(mut self, player_id: impl Into<String>) -> Self {
        self.player_id = Some(player_id.into());
        self
    }
}

//--------------------------------------       UcCode        ---------------------------------------------------------
/// A composable denomination code. Combined via recipes to reach a target amount, then redeemed
/// against an external provider. Once linked to an order the code is consumed; failed activations
/// keep the link (the code is burned, not returned to stock).
#[derive(Debug, Clone, FromRow)]
pub struct UcCode {
    pub id: i64,
    pub code: String,
    pub amount: i64,
    /// Free-text status from the provider, or a transient webhook status.
    pub status: Option<String>,
    /// Set once a terminal activation outcome has been recorded.
    pub is_activated: bool,
    /// Tri-state: `None` = not yet attempted, `Some(true)` = succeeded, `Some(false)` = failed.
    pub is_success: Option<bool>,
    /// The provider that ultimately activated (or accepted) this code.
    pub activator: Option<Activator>,
    /// Priority-use codes are consumed before ordinary stock of the same denomination.
    pub is_priority_use: bool,
    pub order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      StockCode      ---------------------------------------------------------
/// A flat, denomination-pooled stock code delivered to the buyer as-is.
#[derive(Debug, Clone, FromRow)]
pub struct StockCode {
    pub id: i64,
    pub code: String,
    pub amount: i64,
    pub order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    GiftcardCode     ---------------------------------------------------------
/// A gift-card code tied to a specific catalog item rather than a denomination pool.
#[derive(Debug, Clone, FromRow)]
pub struct GiftcardCode {
    pub id: i64,
    pub code: String,
    pub item_id: i64,
    pub order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Currency       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usdt,
    Rub,
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Usdt => write!(f, "USDT"),
            Currency::Rub => write!(f, "RUB"),
        }
    }
}

//--------------------------------------        TopUp        ---------------------------------------------------------
/// A pending balance deposit. `is_paid` and `is_topped` are independent: a deposit can be observed
/// as paid before the balance credit is applied, and crediting is guarded against double
/// application.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TopUp {
    pub id: i64,
    pub customer_id: i64,
    /// The base amount the customer asked to deposit.
    pub amount: Usdt,
    /// Uniqueness-disambiguating commission added on top of `amount` for wallet deposits.
    pub commission: Usdt,
    /// What the customer must actually transfer: `amount + commission`.
    pub to_pay: Usdt,
    pub tx_id: Option<String>,
    pub currency: Currency,
    /// Gateway payment URL, for ruble deposits.
    pub payment_url: Option<String>,
    pub is_paid: bool,
    pub is_topped: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TopUp {
    /// Converts the deposited amount to USDT. Ruble deposits use the configured exchange rate
    /// (RUB per USDT) and are quantized to 2 decimals.
    pub fn to_usdt(&self, rub_usdt_rate: f64) -> Option<Usdt> {
        match self.currency {
            Currency::Usdt => Some(self.amount),
            Currency::Rub => {
                if rub_usdt_rate <= 0.0 {
                    return None;
                }
                let usdt = self.amount.value() as f64 / rub_usdt_rate;
                Some(Usdt::from_milli(((usdt / 10.0).round() as i64) * 10))
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTopUp {
    pub customer_id: i64,
    pub amount: Usdt,
    pub currency: Currency,
    pub payment_url: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Completed));
        assert!(!Cancelled.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Cancelled));
        // last-writer-wins between the two decided activation outcomes
        assert!(Completed.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Completed));
    }

    #[test]
    fn rub_topups_convert_at_the_configured_rate() {
        let topup = TopUp {
            id: 1,
            customer_id: 1,
            amount: Usdt::from_whole(955),
            commission: Usdt::default(),
            to_pay: Usdt::from_whole(955),
            tx_id: None,
            currency: Currency::Rub,
            payment_url: None,
            is_paid: true,
            is_topped: false,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(topup.to_usdt(95.5), Some(Usdt::from_whole(10)));
        assert_eq!(topup.to_usdt(0.0), None);
    }

    #[test]
    fn balance_after_is_quantized_to_cents() {
        let item = Item {
            id: 7,
            title: None,
            category: Category::PubgUc,
            price: Usdt::from_milli(5_125),
            amount: Some(325),
            is_active: true,
            activator: None,
            chat_id: None,
            data: None,
        };
        let order = Order {
            id: 1,
            customer_id: 1,
            item_id: 7,
            quantity: 1,
            item_data: serde_json::to_string(&item.to_snapshot()).unwrap(),
            price: item.price,
            category: item.category,
            player_id: Some("5551234".into()),
            status: OrderStatus::Pending,
            message_id: None,
            balance_before: Usdt::from_whole(10),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(order.balance_after(), Usdt::from_milli(4_875));
        let text = order.user_str(&[]);
        assert!(text.contains("Balance after Order: 4.88$"), "{text}");
        assert!(text.contains("PUBG ID: 5551234"));
        assert_eq!(order.title(), "PUBG_UC_325_1");
    }
}
