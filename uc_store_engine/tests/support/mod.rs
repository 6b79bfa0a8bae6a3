#![allow(dead_code)]
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use uc_store_engine::{
    db_types::{Activator, Category, Customer, Item, NewCustomer},
    events::EventProducers,
    recipes::RecipeBook,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{
        ActivationGateway,
        ActivationGatewayError,
        ActivationOutcome,
        ActivationRequest,
        ExternalOrderRequest,
    },
    AccountManagement,
    ActivationApi,
    OrderFlowApi,
    SqliteDatabase,
    TopUpApi,
};
use ucs_common::Usdt;

pub async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn customer_with_balance(db: &SqliteDatabase, tg_id: i64, balance: &str) -> Customer {
    let customer = db.upsert_customer(NewCustomer::new(tg_id)).await.expect("Error creating customer");
    let balance: Usdt = balance.parse().expect("Invalid balance");
    if balance != Usdt::default() {
        db.process_payment(customer.id, balance).await.expect("Error crediting balance");
    }
    db.fetch_customer(customer.id).await.unwrap().unwrap()
}

pub async fn admin_customer(db: &SqliteDatabase, tg_id: i64) -> Customer {
    let customer = NewCustomer { tg_id, is_admin: true, ..Default::default() };
    db.upsert_customer(customer).await.expect("Error creating admin")
}

pub fn stock_item(id: i64, price: &str, amount: i64) -> Item {
    Item {
        id,
        title: None,
        category: Category::Codes,
        price: price.parse().unwrap(),
        amount: Some(amount),
        is_active: true,
        activator: None,
        chat_id: None,
        data: None,
    }
}

pub fn uc_item(id: i64, price: &str, target: i64) -> Item {
    Item {
        id,
        title: None,
        category: Category::PubgUc,
        price: price.parse().unwrap(),
        amount: Some(target),
        is_active: true,
        activator: None,
        chat_id: None,
        data: None,
    }
}

pub fn giftcard_item(id: i64, price: &str) -> Item {
    Item {
        id,
        title: Some(format!("Giftcard {id}")),
        category: Category::Giftcard,
        price: price.parse().unwrap(),
        amount: None,
        is_active: true,
        activator: None,
        chat_id: None,
        data: None,
    }
}

pub fn manual_item(id: i64, price: &str) -> Item {
    Item {
        id,
        title: Some("Home vote pack".into()),
        category: Category::HomeVote,
        price: price.parse().unwrap(),
        amount: None,
        is_active: true,
        activator: None,
        chat_id: Some(-1001),
        data: None,
    }
}

pub fn diamond_item(id: i64, price: &str) -> Item {
    Item {
        id,
        title: Some("86 diamonds".into()),
        category: Category::Diamond,
        price: price.parse().unwrap(),
        amount: None,
        is_active: true,
        activator: None,
        chat_id: None,
        data: Some(serde_json::json!({"product": "mobilelegends", "product_id": "13"})),
    }
}

/// A scripted activation gateway. Outcomes are keyed on (provider, code); anything unscripted is
/// a failure, so tests fail loudly instead of accidentally succeeding.
#[derive(Clone, Default)]
pub struct MockGateway {
    outcomes: Arc<Mutex<HashMap<(Activator, String), ActivationOutcome>>>,
    supported: Arc<Mutex<HashSet<Activator>>>,
    external: Arc<Mutex<Option<(bool, String)>>>,
    pub calls: Arc<Mutex<Vec<(Activator, String)>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn support(self, provider: Activator) -> Self {
        self.supported.lock().unwrap().insert(provider);
        self
    }

    pub fn script(&self, provider: Activator, code: &str, outcome: ActivationOutcome) {
        self.outcomes.lock().unwrap().insert((provider, code.to_string()), outcome);
    }

    pub fn script_external(&self, success: bool, status: &str) {
        *self.external.lock().unwrap() = Some((success, status.to_string()));
    }
}

impl ActivationGateway for MockGateway {
    fn supports(&self, provider: Activator) -> bool {
        self.supported.lock().unwrap().contains(&provider)
    }

    async fn redeem(
        &self,
        provider: Activator,
        request: &ActivationRequest,
    ) -> Result<ActivationOutcome, ActivationGatewayError> {
        self.calls.lock().unwrap().push((provider, request.code.clone()));
        let outcome = self.outcomes.lock().unwrap().get(&(provider, request.code.clone())).cloned();
        Ok(outcome.unwrap_or(ActivationOutcome::Failure { status: format!("unscripted for {provider}") }))
    }

    async fn create_external_order(
        &self,
        _request: &ExternalOrderRequest,
    ) -> Result<(bool, String), ActivationGatewayError> {
        let scripted = self.external.lock().unwrap().clone();
        scripted.ok_or_else(|| ActivationGatewayError::TransportError("no external order scripted".into()))
    }
}

pub fn order_api(db: &SqliteDatabase, gateway: &MockGateway) -> OrderFlowApi<SqliteDatabase, MockGateway> {
    OrderFlowApi::new(db.clone(), gateway.clone(), RecipeBook::standard(), EventProducers::default())
}

pub fn activation_api(db: &SqliteDatabase, gateway: &MockGateway) -> ActivationApi<SqliteDatabase, MockGateway> {
    ActivationApi::new(db.clone(), gateway.clone(), EventProducers::default())
}

pub fn topup_api(db: &SqliteDatabase, rub_usdt_rate: f64) -> TopUpApi<SqliteDatabase> {
    TopUpApi::new(db.clone(), "0.03".parse().unwrap(), rub_usdt_rate)
}
